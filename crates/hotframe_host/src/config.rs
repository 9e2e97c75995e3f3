//! # Host Configuration
//!
//! Loaded once at startup from TOML. Every field has a default, so an empty
//! file (or no file at all) is a valid configuration.
//!
//! ```toml
//! [module]
//! base_name = "client"
//! source_dir = "client_build"
//! hot_reload = true
//!
//! [frame]
//! target_fps = 60
//! max_frames = 600
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default persistent memory: 68 kB.
pub const DEFAULT_PERSISTENT_MEMORY: usize = 68 * 1024;
/// Default frame-scoped memory: 16 kB.
pub const DEFAULT_FRAME_MEMORY: usize = 16 * 1024;
/// Default draw buffer per viewport.
pub const DEFAULT_DRAW_BUFFER: usize = 64_000;

/// Top-level configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HostConfig {
    /// Module locations and hot-reload.
    pub module: ModuleConfig,
    /// Frame pacing and memory.
    pub frame: FrameConfig,
    /// Input buffering.
    pub input: InputConfig,
    /// Viewport defaults.
    pub viewport: ViewportConfig,
}

/// Where the client module lives.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModuleConfig {
    /// Library base name; `client` resolves to `libclient.so`, `client.dll`, ...
    pub base_name: String,
    /// Directory holding the base build.
    pub base_dir: PathBuf,
    /// Directory the build tool writes new builds into.
    pub source_dir: PathBuf,
    /// Private directory for per-iteration copies. Wiped at startup and shutdown.
    pub working_dir: PathBuf,
    /// Whether to poll `source_dir` for newer builds.
    pub hot_reload: bool,
    /// Extension of the companion debug-symbol file, if the platform has one.
    pub debug_symbols_extension: Option<String>,
}

impl Default for ModuleConfig {
    fn default() -> Self {
        Self {
            base_name: "client".to_owned(),
            base_dir: PathBuf::from("."),
            source_dir: PathBuf::from("client_build"),
            working_dir: PathBuf::from("Temp"),
            hot_reload: true,
            debug_symbols_extension: cfg!(windows).then(|| "pdb".to_owned()),
        }
    }
}

/// Frame pacing and per-session memory sizes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FrameConfig {
    /// Frames per second the binary paces to.
    pub target_fps: u32,
    /// Bytes of persistent memory handed to the module.
    pub persistent_memory_bytes: usize,
    /// Bytes of frame-scoped memory handed to the module.
    pub frame_memory_bytes: usize,
    /// Stop after this many frames. Runs until killed when unset.
    pub max_frames: Option<u64>,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            target_fps: 60,
            persistent_memory_bytes: DEFAULT_PERSISTENT_MEMORY,
            frame_memory_bytes: DEFAULT_FRAME_MEMORY,
            max_frames: None,
        }
    }
}

impl FrameConfig {
    /// Fixed frame time derived from `target_fps`.
    #[must_use]
    pub fn frame_time(&self) -> Duration {
        Duration::from_nanos(1_000_000_000 / u64::from(self.target_fps.max(1)))
    }
}

/// Input buffering.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InputConfig {
    /// Events per buffer. Extra events in a frame are dropped.
    pub capacity: usize,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self { capacity: 64 }
    }
}

/// Viewport defaults.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ViewportConfig {
    /// Wire buffer size per viewport.
    pub draw_buffer_bytes: usize,
    /// Color every viewport is cleared to before drawing.
    pub clear_color: u32,
    /// Default viewport width reported to the module.
    pub width: u16,
    /// Default viewport height reported to the module.
    pub height: u16,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            draw_buffer_bytes: DEFAULT_DRAW_BUFFER,
            clear_color: 0xFF00_0000,
            width: 800,
            height: 600,
        }
    }
}

impl HostConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Parse`] on malformed TOML, [`ConfigError::Invalid`] on
    /// out-of-range values.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses `path`.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Io`] if the file cannot be read, otherwise as
    /// [`from_toml_str`](Self::from_toml_str).
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Invalid`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.module.base_name.trim().is_empty() {
            return Err(ConfigError::Invalid("module.base_name must not be empty".into()));
        }
        if self.frame.target_fps == 0 {
            return Err(ConfigError::Invalid("frame.target_fps must be at least 1".into()));
        }
        if self.input.capacity == 0 {
            return Err(ConfigError::Invalid("input.capacity must be at least 1".into()));
        }
        Ok(())
    }
}
