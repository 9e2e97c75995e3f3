//! The active module's entry points, behind a trait with a loaded and a stub
//! implementation. Callers never see a null or partially bound function.

use hotframe_core::abi::{HelloFn, RunFrameFn, ShutdownFn, StartFn};
use hotframe_core::{FrameRequest, SessionContext};

/// The four calls every client module provides.
pub trait ClientApi {
    /// `true` when backed by a real module, `false` for the stub.
    fn is_loaded(&self) -> bool;

    /// Diagnostic call.
    fn hello(&self);

    /// Session start.
    fn start(&self, ctx: &mut SessionContext);

    /// One frame.
    fn run_frame(&self, ctx: &mut SessionContext, request: &mut FrameRequest);

    /// Session end.
    fn shutdown(&self, ctx: &mut SessionContext);
}

/// No-op entry points used whenever no module is bound.
///
/// Holds no state, so calling it after an unload can never touch freed memory.
#[derive(Clone, Copy, Debug, Default)]
pub struct StubApi;

impl ClientApi for StubApi {
    fn is_loaded(&self) -> bool {
        false
    }

    fn hello(&self) {}

    fn start(&self, _ctx: &mut SessionContext) {}

    fn run_frame(&self, _ctx: &mut SessionContext, _request: &mut FrameRequest) {}

    fn shutdown(&self, _ctx: &mut SessionContext) {}
}

/// A complete set of resolved entry points.
///
/// Write-only: nothing bound into an [`EntryPoints`] can be read back out, so
/// a function resolved from a library never outlives the [`LoadedApi`] that
/// keeps the library mapped.
#[derive(Clone, Copy)]
pub struct EntryPoints {
    hello: HelloFn,
    start: StartFn,
    run_frame: RunFrameFn,
    shutdown: ShutdownFn,
}

impl EntryPoints {
    /// Groups entry points linked into this process.
    #[must_use]
    pub fn new(hello: HelloFn, start: StartFn, run_frame: RunFrameFn, shutdown: ShutdownFn) -> Self {
        Self { hello, start, run_frame, shutdown }
    }
}

impl std::fmt::Debug for EntryPoints {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntryPoints").finish_non_exhaustive()
    }
}

/// Entry points bound from a module, plus the library that keeps them valid.
///
/// The library is dropped together with the entry points, so they can never
/// outlive the code they point into. The only way to reach them is through
/// [`ClientApi`]:
///
/// ```compile_fail
/// # fn leak(api: &hotframe_host::LoadedApi) {
/// let entries = api.entries();
/// # }
/// ```
pub struct LoadedApi {
    entries: EntryPoints,
    _library: Option<libloading::Library>,
}

impl LoadedApi {
    /// Binds entry points owned by `library`.
    pub(crate) fn from_library(entries: EntryPoints, library: libloading::Library) -> Self {
        Self { entries, _library: Some(library) }
    }

    /// Binds entry points from code linked into this process.
    #[must_use]
    pub fn from_entries(entries: EntryPoints) -> Self {
        Self { entries, _library: None }
    }
}

impl std::fmt::Debug for LoadedApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedApi")
            .field("dynamic", &self._library.is_some())
            .finish_non_exhaustive()
    }
}

impl ClientApi for LoadedApi {
    fn is_loaded(&self) -> bool {
        true
    }

    fn hello(&self) {
        (self.entries.hello)();
    }

    fn start(&self, ctx: &mut SessionContext) {
        (self.entries.start)(ctx);
    }

    fn run_frame(&self, ctx: &mut SessionContext, request: &mut FrameRequest) {
        (self.entries.run_frame)(ctx, request);
    }

    fn shutdown(&self, ctx: &mut SessionContext) {
        (self.entries.shutdown)(ctx);
    }
}
