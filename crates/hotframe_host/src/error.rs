//! # Host Error Types
//!
//! All errors that can occur while loading modules, reading configuration
//! or starting the host.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading or hot-swapping a module.
///
/// None of these stop the frame loop. The controller logs them and keeps
/// running in stub state.
#[derive(Error, Debug)]
pub enum LoadError {
    /// No module file at the resolved path.
    #[error("module file not found: {}", path.display())]
    NotFound {
        /// Path that was checked.
        path: PathBuf,
    },

    /// The dynamic loader refused the file.
    #[error("failed to open module {}: {source}", path.display())]
    Open {
        /// Path of the module.
        path: PathBuf,
        /// Loader error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A required entry point did not resolve.
    #[error("module is missing entry point `{0}`")]
    MissingEntryPoint(&'static str),

    /// Copying or deleting a file in the working area failed.
    #[error("file operation failed on {}: {source}", path.display())]
    Io {
        /// Path involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
}

impl LoadError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }
}

/// Errors raised while reading the host configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config {}: {source}", path.display())]
    Io {
        /// Path of the config file.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// The config file is not valid TOML for [`HostConfig`](crate::config::HostConfig).
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Errors that stop the host.
#[derive(Error, Debug)]
pub enum HostError {
    /// Neither the source directory nor the base location produced a module.
    #[error("no usable client module could be loaded")]
    NoUsableModule {
        /// Error from the last attempt.
        #[source]
        last: LoadError,
    },

    /// Configuration problem.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result type for module loading.
pub type LoadResult<T> = Result<T, LoadError>;

/// Result type for host operations.
pub type HostResult<T> = Result<T, HostError>;
