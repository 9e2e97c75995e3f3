//! # Hotframe Core
//!
//! The per-frame data channels that cross the boundary between the host and
//! a hot-reloadable client module:
//! - a bounded, self-describing binary stream of draw commands
//! - a double-buffered queue of input events
//! - the `#[repr(C)]` session and frame values both sides agree on
//!
//! ## Architecture Rules
//!
//! 1. **No pointers in the wire format** - record boundaries come from the tag table
//! 2. **No allocation per frame** - every buffer is sized once and reused
//! 3. **Unsafe stays at the boundary** - only `abi` touches raw pointers
//!
//! ## Example
//!
//! ```rust
//! use hotframe_core::{Color, DrawCommand, DrawHeader, WireBuffer};
//!
//! let mut buffer = WireBuffer::new(64_000);
//! buffer.begin_write().unwrap();
//! buffer.push(&DrawCommand::rectangle(DrawHeader::at(10, 10, Color::WHITE), 50, 20)).unwrap();
//!
//! buffer.begin_read().unwrap();
//! let first = buffer.next().unwrap();
//! assert!(first.is_some());
//! ```

#![deny(unsafe_code)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod abi;
pub mod draw;
pub mod error;
pub mod input;
pub mod memory;
pub mod wire;

pub use abi::{
    Dimensions, DrawFactory, FrameRequest, InputSnapshot, MemoryRegion, PlatformApi, RawSlot,
    SessionContext, SessionState, ENTRY_POINTS,
};
pub use draw::{Color, DrawCommand, DrawHeader, DrawKind, Shape, HEADER_SIZE, MIN_RECORD_SIZE};
pub use error::{WireError, WireResult};
pub use input::{
    ActionKey, InputDoubleBuffer, InputEvent, Modifiers, Point, ViewportId, VIEWPORT_ERROR_ID,
};
pub use memory::{FrameArena, MemoryBlock};
pub use wire::{BufferMode, RecordSlot, WireBuffer, WriteStatus};
