//! # Module Loader
//!
//! Dynamic loading and hot-reload of the client module.
//!
//! ## Layers
//!
//! ```text
//!   ModuleController      state machine, polling, versioned copies
//!          │
//!   ModuleBinder          file -> bound entry points (libloading, or a fake in tests)
//!          │
//!   ClientApi             LoadedApi | StubApi, what the frame loop calls
//! ```

mod api;
mod controller;
mod platform;

pub use api::{ClientApi, EntryPoints, LoadedApi, StubApi};
pub use controller::{ActiveModule, ModuleController, ModuleOrigin, ReloadOutcome};
pub use platform::{
    debug_symbols_path, iteration_file_name, library_file_name, open_exclusive, FileIdentity,
    ModuleBinder, NativeBinder,
};
