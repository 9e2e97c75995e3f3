//! # Hot-Reload Controller
//!
//! Owns exactly one [`ActiveModule`] and moves it between states.
//!
//! ```text
//!              load()                 hot_swap() ok
//!   Unloaded ─────────> Loaded(0) ─────────────────> Loaded(n+1)
//!      ▲                    │                            │
//!      │    hot_swap() err  │                            │
//!      └────────────────────┴────────────────────────────┘
//!                    (stub, caller decides what next)
//! ```
//!
//! A failed swap never silently keeps the old module. Filesystem polling and
//! copying run synchronously on the frame thread; a locked or unchanged
//! source file is simply retried next frame.

use std::fs;
use std::io;
use std::mem;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::{debug, error, info, trace, warn};

use super::api::{ClientApi, StubApi};
use super::platform::{
    debug_symbols_path, iteration_file_name, library_file_name, open_exclusive, FileIdentity,
    ModuleBinder,
};
use crate::config::ModuleConfig;
use crate::error::{HostError, LoadError, LoadResult};

/// Where the active module was loaded from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModuleOrigin {
    /// Nothing bound; the stub API is active.
    Stub,
    /// The base build, loaded in place.
    Base,
    /// A per-iteration copy in the working directory.
    HotReload,
}

/// The currently bound code unit.
pub struct ActiveModule {
    api: Box<dyn ClientApi>,
    iteration: u32,
    identity: Option<FileIdentity>,
    origin: ModuleOrigin,
    files: Vec<PathBuf>,
}

impl ActiveModule {
    fn stub() -> Self {
        Self {
            api: Box::new(StubApi),
            iteration: 0,
            identity: None,
            origin: ModuleOrigin::Stub,
            files: Vec::new(),
        }
    }

    /// Entry points. The stub when nothing is loaded.
    #[must_use]
    pub fn api(&self) -> &dyn ClientApi {
        self.api.as_ref()
    }

    /// Iteration number, `None` in stub state.
    #[must_use]
    pub fn iteration(&self) -> Option<u32> {
        self.api.is_loaded().then_some(self.iteration)
    }

    /// File the module was loaded from.
    #[must_use]
    pub fn identity(&self) -> Option<&FileIdentity> {
        self.identity.as_ref()
    }

    /// Base build, hot-reload copy, or stub.
    #[must_use]
    pub fn origin(&self) -> ModuleOrigin {
        self.origin
    }

    /// Copies in the working directory owned by this module.
    #[must_use]
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }
}

impl std::fmt::Debug for ActiveModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActiveModule")
            .field("loaded", &self.api.is_loaded())
            .field("iteration", &self.iteration)
            .field("identity", &self.identity)
            .field("origin", &self.origin)
            .finish_non_exhaustive()
    }
}

/// Result of one hot-reload attempt.
#[derive(Debug)]
pub enum ReloadOutcome {
    /// No newer build, or it is still being written.
    Unchanged,
    /// The new build is active under this iteration.
    Reloaded(u32),
    /// The swap failed. The controller is in stub state unless the copy itself failed.
    Failed(LoadError),
}

/// Load, poll, swap and unload of the client module.
pub struct ModuleController<B: ModuleBinder> {
    binder: B,
    settings: ModuleConfig,
    active: ActiveModule,
    next_iteration: u32,
    last_rejected: Option<SystemTime>,
}

impl<B: ModuleBinder> ModuleController<B> {
    /// Creates a controller in stub state.
    pub fn new(binder: B, settings: ModuleConfig) -> Self {
        Self {
            binder,
            settings,
            active: ActiveModule::stub(),
            next_iteration: 1,
            last_rejected: None,
        }
    }

    /// Module settings.
    pub fn settings(&self) -> &ModuleConfig {
        &self.settings
    }

    /// The active module.
    pub fn active(&self) -> &ActiveModule {
        &self.active
    }

    /// Entry points of the active module.
    pub fn api(&self) -> &dyn ClientApi {
        self.active.api()
    }

    /// Whether a real module is bound.
    pub fn is_loaded(&self) -> bool {
        self.active.api.is_loaded()
    }

    /// Iteration of the active module, `None` in stub state.
    pub fn iteration(&self) -> Option<u32> {
        self.active.iteration()
    }

    /// Path of the base build.
    pub fn base_path(&self) -> PathBuf {
        self.settings.base_dir.join(library_file_name(&self.settings.base_name))
    }

    /// Path the build tool writes new builds to.
    pub fn source_path(&self) -> PathBuf {
        self.settings.source_dir.join(library_file_name(&self.settings.base_name))
    }

    /// Deletes and recreates the working directory.
    ///
    /// # Errors
    ///
    /// [`LoadError::Io`] if either step fails.
    pub fn reset_working_dir(&self) -> LoadResult<()> {
        let dir = &self.settings.working_dir;
        match fs::remove_dir_all(dir) {
            Ok(()) => debug!(dir = %dir.display(), "removed working directory"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(LoadError::io(dir, e)),
        }
        fs::create_dir_all(dir).map_err(|e| LoadError::io(dir, e))
    }

    /// Loads a module in place as iteration 0, replacing whatever is active.
    ///
    /// `path_hint` defaults to the base build.
    ///
    /// # Errors
    ///
    /// Any [`LoadError`] from resolving or binding the file. The controller
    /// is left in stub state.
    pub fn load(&mut self, path_hint: Option<&Path>) -> LoadResult<()> {
        let path = path_hint.map_or_else(|| self.base_path(), Path::to_path_buf);
        self.unload();

        let identity = FileIdentity::of(&path).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                LoadError::NotFound { path: path.clone() }
            } else {
                LoadError::io(&path, e)
            }
        })?;

        let api = self.binder.bind(&path).map_err(|e| {
            error!(path = %path.display(), "module load failed: {e}");
            e
        })?;

        self.active = ActiveModule {
            api: Box::new(api),
            iteration: 0,
            identity: Some(identity),
            origin: ModuleOrigin::Base,
            files: Vec::new(),
        };
        info!(path = %path.display(), "module loaded");
        Ok(())
    }

    /// Releases the active module and leaves the stub in place.
    ///
    /// Copies owned by a hot-reloaded module are deleted after the library
    /// is released.
    pub fn unload(&mut self) {
        let ActiveModule { api, iteration, origin, files, .. } =
            mem::replace(&mut self.active, ActiveModule::stub());

        let was_loaded = api.is_loaded();
        drop(api);

        if origin == ModuleOrigin::HotReload {
            for file in &files {
                match fs::remove_file(file) {
                    Ok(()) => trace!(file = %file.display(), "deleted module copy"),
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                    Err(e) => warn!(file = %file.display(), "failed to delete module copy: {e}"),
                }
            }
        }

        if was_loaded {
            debug!(iteration, "module unloaded");
        }
    }

    /// Looks for a build in the source directory newer than the active module.
    ///
    /// A candidate counts only if its modified time is strictly newer than
    /// the active module's, and newer than the last build that failed to
    /// bind. `force` skips both comparisons. A file that cannot be opened
    /// exclusively is still being written and is left for a later frame.
    pub fn poll_for_newer_version(&mut self, force: bool) -> Option<FileIdentity> {
        let path = self.source_path();
        let candidate = FileIdentity::of(&path).ok()?;

        if !force {
            if let Some(current) = &self.active.identity {
                if candidate.modified <= current.modified {
                    return None;
                }
            }
            if self.last_rejected.is_some_and(|rejected| candidate.modified <= rejected) {
                return None;
            }
        }

        if let Err(e) = open_exclusive(&path) {
            trace!(path = %path.display(), "candidate not ready: {e}");
            return None;
        }
        Some(candidate)
    }

    /// Copies `candidate` into the working directory under the next
    /// iteration number and binds the copy.
    ///
    /// # Errors
    ///
    /// [`LoadError::Io`] if the copy fails; the active module is untouched.
    /// Any binding error; the controller is then in stub state and the
    /// candidate is remembered as rejected.
    pub fn hot_swap(&mut self, candidate: &FileIdentity) -> LoadResult<u32> {
        let iteration = self.next_iteration;
        self.next_iteration += 1;

        let working = self.settings.working_dir.clone();
        fs::create_dir_all(&working).map_err(|e| LoadError::io(&working, e))?;

        let target = working.join(iteration_file_name(&self.settings.base_name, iteration));
        if let Err(e) = fs::copy(&candidate.path, &target) {
            // Best effort; the copy may not have been created at all.
            let _ = fs::remove_file(&target);
            return Err(LoadError::io(&candidate.path, e));
        }
        let mut files = vec![target.clone()];

        let extension = self.settings.debug_symbols_extension.as_deref();
        if let (Some(symbols), Some(symbols_target)) = (
            debug_symbols_path(&candidate.path, extension),
            debug_symbols_path(&target, extension),
        ) {
            if symbols.is_file() {
                match fs::copy(&symbols, &symbols_target) {
                    Ok(_) => files.push(symbols_target),
                    Err(e) => warn!(file = %symbols.display(), "failed to copy debug symbols: {e}"),
                }
            }
        }

        self.unload();

        match self.binder.bind(&target) {
            Ok(api) => {
                self.active = ActiveModule {
                    api: Box::new(api),
                    iteration,
                    identity: Some(candidate.clone()),
                    origin: ModuleOrigin::HotReload,
                    files,
                };
                self.last_rejected = None;
                info!(iteration, "hot-reloaded module");
                Ok(iteration)
            }
            Err(e) => {
                error!(iteration, "hot-reload failed, module unavailable: {e}");
                for file in &files {
                    let _ = fs::remove_file(file);
                }
                self.last_rejected = Some(candidate.modified);
                Err(e)
            }
        }
    }

    /// Polls and, if a candidate is ready, swaps it in.
    pub fn try_hot_reload(&mut self, force: bool) -> ReloadOutcome {
        let Some(candidate) = self.poll_for_newer_version(force) else {
            return ReloadOutcome::Unchanged;
        };
        match self.hot_swap(&candidate) {
            Ok(iteration) => ReloadOutcome::Reloaded(iteration),
            Err(e) => ReloadOutcome::Failed(e),
        }
    }

    /// Startup load: newest build from the source directory first (when hot
    /// reload is enabled), then the base build.
    ///
    /// # Errors
    ///
    /// [`HostError::NoUsableModule`] when neither produced a module.
    pub fn load_initial(&mut self) -> Result<(), HostError> {
        if let Err(e) = self.reset_working_dir() {
            warn!("failed to reset working directory: {e}");
        }

        if self.settings.hot_reload {
            match self.try_hot_reload(true) {
                ReloadOutcome::Reloaded(_) => return Ok(()),
                ReloadOutcome::Failed(e) => warn!("source build unusable, falling back to base: {e}"),
                ReloadOutcome::Unchanged => debug!("no build in source directory"),
            }
        }

        self.load(None).map_err(|last| {
            error!("no usable client module: {last}");
            HostError::NoUsableModule { last }
        })
    }

    /// Unloads and deletes the working directory.
    pub fn shutdown(&mut self) {
        self.unload();
        let dir = &self.settings.working_dir;
        match fs::remove_dir_all(dir) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(dir = %dir.display(), "failed to remove working directory: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs::File;
    use std::time::Duration;

    use hotframe_core::abi::ENTRY_POINTS;
    use hotframe_core::{FrameRequest, SessionContext};

    use super::*;
    use crate::module::{EntryPoints, LoadedApi};

    extern "C" fn noop_hello() {}
    extern "C" fn noop_start(_: &mut SessionContext) {}
    extern "C" fn noop_frame(_: &mut SessionContext, _: &mut FrameRequest) {}
    extern "C" fn noop_shutdown(_: &mut SessionContext) {}

    /// Binds by file content: `full` binds, `missing:<name>` lacks one entry point.
    struct FakeBinder;

    impl ModuleBinder for FakeBinder {
        fn bind(&self, path: &Path) -> LoadResult<LoadedApi> {
            let text = fs::read_to_string(path).map_err(|e| LoadError::io(path, e))?;
            let text = text.trim();
            if let Some(name) = text.strip_prefix("missing:") {
                let name = ENTRY_POINTS.iter().copied().find(|n| *n == name).unwrap_or("hello");
                return Err(LoadError::MissingEntryPoint(name));
            }
            Ok(LoadedApi::from_entries(EntryPoints::new(
                noop_hello,
                noop_start,
                noop_frame,
                noop_shutdown,
            )))
        }
    }

    struct Fixture {
        _dir: tempfile::TempDir,
        controller: ModuleController<FakeBinder>,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let settings = ModuleConfig {
                base_dir: dir.path().join("base"),
                source_dir: dir.path().join("build"),
                working_dir: dir.path().join("work"),
                debug_symbols_extension: Some("pdb".into()),
                ..ModuleConfig::default()
            };
            fs::create_dir_all(&settings.base_dir).unwrap();
            fs::create_dir_all(&settings.source_dir).unwrap();
            Self { _dir: dir, controller: ModuleController::new(FakeBinder, settings) }
        }

        fn write(path: &Path, content: &str, secs: u64) {
            fs::write(path, content).unwrap();
            let file = File::options().write(true).open(path).unwrap();
            file.set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(secs)).unwrap();
        }

        fn base(&self, content: &str, secs: u64) {
            Self::write(&self.controller.base_path(), content, secs);
        }

        fn source(&self, content: &str, secs: u64) {
            Self::write(&self.controller.source_path(), content, secs);
        }

        fn copy_path(&self, iteration: u32) -> PathBuf {
            let settings = self.controller.settings();
            settings.working_dir.join(iteration_file_name(&settings.base_name, iteration))
        }
    }

    #[test]
    fn test_load_base() {
        let mut fx = Fixture::new();
        fx.base("full", 1_000);
        fx.controller.load(None).unwrap();
        assert!(fx.controller.is_loaded());
        assert_eq!(fx.controller.iteration(), Some(0));
        assert_eq!(fx.controller.active().origin(), ModuleOrigin::Base);
    }

    #[test]
    fn test_missing_shutdown_rejects_whole_module() {
        let mut fx = Fixture::new();
        fx.base("missing:shutdown", 1_000);
        let err = fx.controller.load(None).unwrap_err();
        assert!(matches!(err, LoadError::MissingEntryPoint("shutdown")));
        assert!(!fx.controller.is_loaded());
        assert!(!fx.controller.api().is_loaded());
        assert_eq!(fx.controller.iteration(), None);
    }

    #[test]
    fn test_missing_base_file() {
        let mut fx = Fixture::new();
        assert!(matches!(fx.controller.load(None), Err(LoadError::NotFound { .. })));
    }

    #[test]
    fn test_poll_without_change_is_stable() {
        let mut fx = Fixture::new();
        fx.base("full", 1_000);
        fx.source("full", 2_000);
        fx.controller.load(None).unwrap();

        assert!(matches!(fx.controller.try_hot_reload(false), ReloadOutcome::Reloaded(1)));
        assert_eq!(fx.controller.poll_for_newer_version(false), None);
        assert_eq!(fx.controller.poll_for_newer_version(false), None);
        assert_eq!(fx.controller.iteration(), Some(1));
    }

    #[test]
    fn test_older_candidate_is_ignored() {
        let mut fx = Fixture::new();
        fx.base("full", 2_000);
        fx.source("full", 1_000);
        fx.controller.load(None).unwrap();
        assert_eq!(fx.controller.poll_for_newer_version(false), None);
        assert!(fx.controller.poll_for_newer_version(true).is_some());
    }

    #[test]
    fn test_no_source_file() {
        let mut fx = Fixture::new();
        assert_eq!(fx.controller.poll_for_newer_version(true), None);
        assert!(matches!(fx.controller.try_hot_reload(true), ReloadOutcome::Unchanged));
    }

    #[test]
    fn test_swap_replaces_previous_copy() {
        let mut fx = Fixture::new();
        fx.base("full", 1_000);
        fx.controller.load(None).unwrap();

        fx.source("full", 2_000);
        assert!(matches!(fx.controller.try_hot_reload(false), ReloadOutcome::Reloaded(1)));
        assert!(fx.copy_path(1).is_file());
        assert_eq!(fx.controller.active().origin(), ModuleOrigin::HotReload);

        fx.source("full", 3_000);
        assert!(matches!(fx.controller.try_hot_reload(false), ReloadOutcome::Reloaded(2)));
        assert!(!fx.copy_path(1).exists());
        assert!(fx.copy_path(2).is_file());
        assert!(fx.controller.base_path().is_file());
    }

    #[test]
    fn test_debug_symbols_follow_the_copy() {
        let mut fx = Fixture::new();
        let symbols = fx.controller.source_path().with_extension("pdb");
        fs::write(&symbols, "symbols").unwrap();
        fx.source("full", 2_000);

        assert!(matches!(fx.controller.try_hot_reload(false), ReloadOutcome::Reloaded(1)));
        let copied = fx.copy_path(1).with_extension("pdb");
        assert!(copied.is_file());
        assert_eq!(fx.controller.active().files().len(), 2);

        fx.controller.unload();
        assert!(!copied.exists());
        assert!(!fx.copy_path(1).exists());
    }

    #[test]
    fn test_failed_swap_leaves_stub() {
        let mut fx = Fixture::new();
        fx.base("full", 1_000);
        fx.controller.load(None).unwrap();

        fx.source("missing:run_frame", 2_000);
        let outcome = fx.controller.try_hot_reload(false);
        assert!(matches!(outcome, ReloadOutcome::Failed(LoadError::MissingEntryPoint("run_frame"))));
        assert!(!fx.controller.is_loaded());
        assert!(!fx.copy_path(1).exists());

        // The same broken build is not retried every frame.
        assert_eq!(fx.controller.poll_for_newer_version(false), None);

        fx.source("full", 3_000);
        assert!(matches!(fx.controller.try_hot_reload(false), ReloadOutcome::Reloaded(2)));
    }

    #[test]
    fn test_forced_reload_of_same_build() {
        let mut fx = Fixture::new();
        fx.source("full", 2_000);
        assert!(matches!(fx.controller.try_hot_reload(false), ReloadOutcome::Reloaded(1)));
        assert!(matches!(fx.controller.try_hot_reload(false), ReloadOutcome::Unchanged));
        assert!(matches!(fx.controller.try_hot_reload(true), ReloadOutcome::Reloaded(2)));
    }

    #[test]
    fn test_initial_load_prefers_source() {
        let mut fx = Fixture::new();
        fx.base("full", 1_000);
        fx.source("full", 500);
        fx.controller.load_initial().unwrap();
        assert_eq!(fx.controller.active().origin(), ModuleOrigin::HotReload);
        assert_eq!(fx.controller.iteration(), Some(1));
    }

    #[test]
    fn test_initial_load_falls_back_to_base() {
        let mut fx = Fixture::new();
        fx.base("full", 1_000);
        fx.source("missing:start", 2_000);
        fx.controller.load_initial().unwrap();
        assert_eq!(fx.controller.active().origin(), ModuleOrigin::Base);
        assert_eq!(fx.controller.iteration(), Some(0));
    }

    #[test]
    fn test_initial_load_without_any_module() {
        let mut fx = Fixture::new();
        fx.source("missing:hello", 2_000);
        assert!(matches!(fx.controller.load_initial(), Err(HostError::NoUsableModule { .. })));
    }

    #[test]
    fn test_shutdown_removes_working_dir() {
        let mut fx = Fixture::new();
        fx.source("full", 2_000);
        fx.controller.load_initial().unwrap();
        let working = fx.controller.settings().working_dir.clone();
        assert!(working.is_dir());

        fx.controller.shutdown();
        assert!(!working.exists());
        assert!(!fx.controller.is_loaded());
    }
}
