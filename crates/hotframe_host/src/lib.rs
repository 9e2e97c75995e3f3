//! # Hotframe Host
//!
//! Loads a separately built client module, drives it once per frame, and
//! swaps in newer builds without restarting.
//!
//! ## Architecture
//!
//! ```text
//!   OS input ──> InputTracker ──┐
//!                               ▼
//!   ModuleController ──> Host::run_frame ──> client run_frame
//!   (load / poll / swap)        │                  │
//!                               ▼                  ▼
//!   Renderer <── drain ── ViewportTable (one WireBuffer each)
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use hotframe_host::{CommandLog, Host, HostConfig, NativeBinder};
//!
//! let mut host = Host::start(HostConfig::default(), NativeBinder, CommandLog::new())?;
//! loop {
//!     let stats = host.run_frame();
//!     // pace, present, feed input...
//! }
//! ```

#![deny(unsafe_code)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

mod bridge;
pub mod config;
pub mod error;
pub mod frame;
pub mod input;
pub mod module;
pub mod render;
pub mod viewport;

pub use config::HostConfig;
pub use error::{ConfigError, HostError, HostResult, LoadError, LoadResult};
pub use frame::{FrameStats, Host, MAX_FRAME_DELTA};
pub use input::{Hotkeys, InputTracker};
pub use module::{
    ActiveModule, ClientApi, EntryPoints, LoadedApi, ModuleBinder, ModuleController, ModuleOrigin,
    NativeBinder, ReloadOutcome, StubApi,
};
pub use render::{CommandLog, RenderOp, Renderer};
pub use viewport::{Viewport, ViewportTable};
