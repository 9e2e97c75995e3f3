//! Platform side of module loading: binding a library file to typed entry
//! points, and the file naming and locking rules of the hot-reload layout.
//!
//! ```text
//!   source_dir/libclient.so          newest build, written by the build tool
//!   working_dir/libclient_1.so       copy loaded for iteration 1
//!   working_dir/libclient_2.so       copy loaded for iteration 2
//! ```

#![allow(unsafe_code)]

use std::env::consts::{DLL_PREFIX, DLL_SUFFIX};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use libloading::Library;
use tracing::{debug, error};

use hotframe_core::abi::{
    HelloFn, RunFrameFn, ShutdownFn, StartFn, ENTRY_HELLO, ENTRY_RUN_FRAME, ENTRY_SHUTDOWN,
    ENTRY_START,
};

use super::api::{EntryPoints, LoadedApi};
use crate::error::{LoadError, LoadResult};

/// Turns a module file into bound entry points.
///
/// Implementations must bind all four entry points or fail; a partially
/// bound module is never returned.
pub trait ModuleBinder {
    /// Opens `path` and resolves every entry point.
    ///
    /// # Errors
    ///
    /// [`LoadError::NotFound`], [`LoadError::Open`] or
    /// [`LoadError::MissingEntryPoint`] naming the first absent entry point.
    fn bind(&self, path: &Path) -> LoadResult<LoadedApi>;
}

/// Binds modules through the operating system's dynamic loader.
#[derive(Clone, Copy, Debug, Default)]
pub struct NativeBinder;

impl ModuleBinder for NativeBinder {
    fn bind(&self, path: &Path) -> LoadResult<LoadedApi> {
        if !path.is_file() {
            return Err(LoadError::NotFound { path: path.to_path_buf() });
        }

        // SAFETY: loading runs the library's initializers. Client modules are
        // trusted builds of the same workspace.
        let library = unsafe { Library::new(path) }.map_err(|e| LoadError::Open {
            path: path.to_path_buf(),
            source: Box::new(e),
        })?;

        let hello = resolve::<HelloFn>(&library, ENTRY_HELLO);
        let start = resolve::<StartFn>(&library, ENTRY_START);
        let run_frame = resolve::<RunFrameFn>(&library, ENTRY_RUN_FRAME);
        let shutdown = resolve::<ShutdownFn>(&library, ENTRY_SHUTDOWN);

        let (Some(hello), Some(start), Some(run_frame), Some(shutdown)) = (hello, start, run_frame, shutdown)
        else {
            let missing = [
                (ENTRY_HELLO, hello.is_some()),
                (ENTRY_START, start.is_some()),
                (ENTRY_RUN_FRAME, run_frame.is_some()),
                (ENTRY_SHUTDOWN, shutdown.is_some()),
            ]
            .into_iter()
            .find_map(|(name, bound)| (!bound).then_some(name))
            .unwrap_or(ENTRY_HELLO);
            return Err(LoadError::MissingEntryPoint(missing));
        };

        debug!(path = %path.display(), "bound all entry points");
        Ok(LoadedApi::from_library(
            EntryPoints::new(hello, start, run_frame, shutdown),
            library,
        ))
    }
}

/// Resolves `name` to a function the library itself defines.
///
/// The copied pointer is only stored next to `library` in a [`LoadedApi`].
fn resolve<T: Copy>(library: &Library, name: &'static str) -> Option<T> {
    if provided_by_dependency(library, name) {
        error!(entry = name, "entry point is not defined by the module");
        return None;
    }
    // SAFETY: `T` is the signature fixed by the module contract for `name`.
    match unsafe { library.get::<T>(name.as_bytes()) } {
        Ok(symbol) => Some(*symbol),
        Err(e) => {
            error!(entry = name, "failed to resolve entry point: {e}");
            None
        }
    }
}

/// `true` when looking `name` up in `library` falls through to a library it
/// depends on, e.g. libc's `shutdown`. The unix loader searches the whole
/// dependency tree of a handle, so a module missing an entry point would
/// otherwise bind an unrelated function of the same name.
#[cfg(unix)]
fn provided_by_dependency(library: &Library, name: &str) -> bool {
    use std::ffi::c_void;

    let process = libloading::os::unix::Library::this();
    // SAFETY: both lookups only read addresses; nothing is called.
    let (Ok(own), Ok(global)) = (unsafe { library.get::<*mut c_void>(name.as_bytes()) }, unsafe {
        process.get::<*mut c_void>(name.as_bytes())
    }) else {
        return false;
    };
    *own == *global
}

/// The Windows loader only searches the module's own export table.
#[cfg(not(unix))]
fn provided_by_dependency(_library: &Library, _name: &str) -> bool {
    false
}

/// Platform file name of a module, e.g. `libclient.so` or `client.dll`.
#[must_use]
pub fn library_file_name(base_name: &str) -> String {
    format!("{DLL_PREFIX}{base_name}{DLL_SUFFIX}")
}

/// File name of the copy loaded for `iteration`, e.g. `libclient_3.so`.
#[must_use]
pub fn iteration_file_name(base_name: &str, iteration: u32) -> String {
    format!("{DLL_PREFIX}{base_name}_{iteration}{DLL_SUFFIX}")
}

/// Companion debug-symbol file next to `library`, if `extension` is set.
#[must_use]
pub fn debug_symbols_path(library: &Path, extension: Option<&str>) -> Option<PathBuf> {
    extension.map(|ext| library.with_extension(ext))
}

/// Opens `path` for reading, refusing if another process holds it for writing.
///
/// On Windows the file is opened with no sharing, which fails while the
/// build tool still has it open. Unix has no mandatory locks and build tools
/// take no advisory ones, so there this is a plain read-open that only fails
/// for missing or unreadable files. A half-written build is instead caught by
/// the loader rejecting it, and the rejected build's modified time is
/// remembered so it is not retried until it changes again.
///
/// # Errors
///
/// Whatever the open call reports.
pub fn open_exclusive(path: &Path) -> io::Result<File> {
    #[cfg(windows)]
    {
        use std::os::windows::fs::OpenOptionsExt;
        fs::OpenOptions::new().read(true).share_mode(0).open(path)
    }
    #[cfg(not(windows))]
    {
        File::open(path)
    }
}

/// On-disk identity of a module file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileIdentity {
    /// Where it was found.
    pub path: PathBuf,
    /// Last write time.
    pub modified: SystemTime,
}

impl FileIdentity {
    /// Reads the identity of `path`.
    ///
    /// # Errors
    ///
    /// If the file's metadata cannot be read.
    pub fn of(path: &Path) -> io::Result<Self> {
        let modified = fs::metadata(path)?.modified()?;
        Ok(Self { path: path.to_path_buf(), modified })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_names() {
        let base = library_file_name("client");
        assert!(base.starts_with(DLL_PREFIX));
        assert!(base.ends_with(DLL_SUFFIX));
        assert!(base.contains("client"));

        let copy = iteration_file_name("client", 3);
        assert_eq!(copy, format!("{DLL_PREFIX}client_3{DLL_SUFFIX}"));
        assert_ne!(copy, iteration_file_name("client", 4));
    }

    #[test]
    fn test_debug_symbols_path() {
        let lib = Path::new("Temp").join(iteration_file_name("client", 1));
        assert_eq!(debug_symbols_path(&lib, None), None);
        let pdb = debug_symbols_path(&lib, Some("pdb")).unwrap();
        assert_eq!(pdb.extension().and_then(|e| e.to_str()), Some("pdb"));
        assert_eq!(pdb.parent(), lib.parent());
    }

    #[test]
    fn test_native_binder_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(library_file_name("absent"));
        assert!(matches!(NativeBinder.bind(&path), Err(LoadError::NotFound { .. })));
    }

    #[test]
    fn test_open_exclusive() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(library_file_name("client"));
        assert!(open_exclusive(&path).is_err());
        fs::write(&path, b"build").unwrap();
        assert!(open_exclusive(&path).is_ok());
    }

    #[test]
    fn test_native_binder_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(library_file_name("garbage"));
        fs::write(&path, b"not a shared object").unwrap();
        assert!(matches!(NativeBinder.bind(&path), Err(LoadError::Open { .. })));
    }
}
