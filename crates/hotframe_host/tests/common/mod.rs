//! Shared fixtures: a temp directory laid out like a deployment, and a
//! binder that serves statically linked entry points instead of opening
//! real libraries.

#![allow(dead_code)]

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use hotframe_core::abi::ENTRY_POINTS;
use hotframe_host::module::{iteration_file_name, library_file_name};
use hotframe_host::{EntryPoints, HostConfig, LoadError, LoadResult, LoadedApi, ModuleBinder};
use tempfile::TempDir;

/// Entry points of the demo client.
pub fn demo_entries() -> EntryPoints {
    EntryPoints::new(client::hello, client::start, client::run_frame, client::shutdown)
}

/// Binds every file to `entries`, except files whose content is
/// `missing:<entry>`, which lack that entry point.
pub struct StaticBinder {
    pub entries: EntryPoints,
}

impl ModuleBinder for StaticBinder {
    fn bind(&self, path: &Path) -> LoadResult<LoadedApi> {
        let text = fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        if let Some(name) = text.trim().strip_prefix("missing:") {
            let name = ENTRY_POINTS
                .iter()
                .copied()
                .find(|entry| *entry == name)
                .unwrap_or("hello");
            return Err(LoadError::MissingEntryPoint(name));
        }
        Ok(LoadedApi::from_entries(self.entries))
    }
}

/// A deployment directory with `base/`, `build/` and `work/`.
pub struct Deployment {
    pub dir: TempDir,
    pub config: HostConfig,
}

impl Deployment {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mut config = HostConfig::default();
        config.module.base_dir = dir.path().join("base");
        config.module.source_dir = dir.path().join("build");
        config.module.working_dir = dir.path().join("work");
        fs::create_dir_all(&config.module.base_dir).unwrap();
        fs::create_dir_all(&config.module.source_dir).unwrap();
        Self { dir, config }
    }

    pub fn base_path(&self) -> PathBuf {
        self.config.module.base_dir.join(library_file_name(&self.config.module.base_name))
    }

    pub fn source_path(&self) -> PathBuf {
        self.config.module.source_dir.join(library_file_name(&self.config.module.base_name))
    }

    pub fn copy_path(&self, iteration: u32) -> PathBuf {
        self.config
            .module
            .working_dir
            .join(iteration_file_name(&self.config.module.base_name, iteration))
    }

    /// Writes the base build with the given modified time (seconds since the epoch).
    pub fn write_base(&self, content: &str, secs: u64) {
        write_with_mtime(&self.base_path(), content, secs);
    }

    /// Writes a new build into the source directory.
    pub fn write_source(&self, content: &str, secs: u64) {
        write_with_mtime(&self.source_path(), content, secs);
    }
}

pub fn write_with_mtime(path: &Path, content: &str, secs: u64) {
    fs::write(path, content).unwrap();
    let file = File::options().write(true).open(path).unwrap();
    file.set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(secs)).unwrap();
}
