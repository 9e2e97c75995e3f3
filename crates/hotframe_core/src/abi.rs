//! # Module Boundary
//!
//! `#[repr(C)]` values exchanged between the host and a dynamically loaded
//! client module, plus the safe helpers a module uses to talk to the host.
//!
//! ## Contract
//!
//! ```text
//!   host                                    module
//!   ────                                    ──────
//!   hello()                          ──>    diagnostic line
//!   start(&mut SessionContext)       ──>    allocate viewports, init state
//!   run_frame(&mut SessionContext,
//!             &mut FrameRequest)     ──>    read input, write draw records
//!   shutdown(&mut SessionContext)    ──>    release viewports
//! ```
//!
//! All four entry points must resolve by name for a module to be usable.
//!
//! ## Safety
//!
//! Every pointer in these structs is owned by the host and valid for the
//! duration of the call it is passed into. Modules never free or retain them.
//! The fields carrying pointers are private: a [`SessionContext`] or
//! [`FrameRequest`] that reaches host memory can only be built through an
//! `unsafe` constructor, so the safe helpers below never dereference a
//! pointer that safe code made up.

#![allow(unsafe_code)]

use std::ffi::c_void;
use std::ptr;
use std::slice;

use bytemuck::{Pod, Zeroable};

use crate::draw::{DrawCommand, DrawKind};
use crate::input::{InputEvent, Point, ViewportId, VIEWPORT_ERROR_ID};
use crate::wire::RecordSlot;

/// Exported name of the diagnostic entry point.
pub const ENTRY_HELLO: &str = "hello";
/// Exported name of the session-start entry point.
pub const ENTRY_START: &str = "start";
/// Exported name of the per-frame entry point.
pub const ENTRY_RUN_FRAME: &str = "run_frame";
/// Exported name of the shutdown entry point.
pub const ENTRY_SHUTDOWN: &str = "shutdown";

/// Every entry point a module must export, in resolution order.
pub const ENTRY_POINTS: [&str; 4] = [ENTRY_HELLO, ENTRY_START, ENTRY_RUN_FRAME, ENTRY_SHUTDOWN];

/// No-argument diagnostic call.
pub type HelloFn = extern "C" fn();
/// Session start.
pub type StartFn = extern "C" fn(&mut SessionContext);
/// One frame.
pub type RunFrameFn = extern "C" fn(&mut SessionContext, &mut FrameRequest);
/// Session end.
pub type ShutdownFn = extern "C" fn(&mut SessionContext);

/// Host callback creating a viewport. Returns [`VIEWPORT_ERROR_ID`] on failure.
pub type AllocateViewportFn =
    extern "C" fn(host: *mut c_void, name: *const u8, name_len: usize, dimensions: Dimensions) -> ViewportId;
/// Host callback requesting viewport destruction.
pub type DestroyViewportFn = extern "C" fn(host: *mut c_void, viewport: ViewportId);
/// Host callback reserving a draw record. Returns [`RawSlot::NULL`] on refusal.
pub type NewRecordFn = extern "C" fn(host: *mut c_void, viewport: ViewportId, tag: u8) -> RawSlot;

/// Pointer + length of a host-owned byte region.
#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct MemoryRegion {
    /// Start of the region.
    pub ptr: *mut u8,
    /// Length in bytes.
    pub len: usize,
}

impl MemoryRegion {
    /// No region.
    pub const EMPTY: Self = Self { ptr: ptr::null_mut(), len: 0 };

    /// Describes `bytes`. The caller keeps `bytes` alive while the region is in use.
    #[must_use]
    pub fn from_slice(bytes: &mut [u8]) -> Self {
        Self { ptr: bytes.as_mut_ptr(), len: bytes.len() }
    }

    /// # Safety
    ///
    /// `ptr` must be valid for `len` bytes and not aliased for `'a`.
    unsafe fn as_mut_slice<'a>(self) -> &'a mut [u8] {
        if self.ptr.is_null() || self.len == 0 {
            return &mut [];
        }
        slice::from_raw_parts_mut(self.ptr, self.len)
    }
}

/// Width and height in pixels.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct Dimensions {
    /// Width.
    pub width: u16,
    /// Height.
    pub height: u16,
}

impl Dimensions {
    /// Creates dimensions.
    #[must_use]
    pub const fn new(width: u16, height: u16) -> Self {
        Self { width, height }
    }
}

/// Capability table the host exposes to the module.
#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct PlatformApi {
    /// Opaque host state passed back into every callback.
    pub host: *mut c_void,
    /// Creates a viewport.
    pub allocate_viewport: Option<AllocateViewportFn>,
    /// Destroys a viewport at the end of the current frame.
    pub destroy_viewport: Option<DestroyViewportFn>,
}

impl PlatformApi {
    /// A table with no callbacks.
    pub const DETACHED: Self = Self {
        host: ptr::null_mut(),
        allocate_viewport: None,
        destroy_viewport: None,
    };
}

/// Session lifecycle.
#[repr(u32)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SessionState {
    /// Created, `start` not yet returned.
    #[default]
    Initialized = 0,
    /// Frames are running.
    Running = 1,
    /// `shutdown` was called.
    Ended = 2,
}

/// State shared with the module for the whole session.
#[repr(C)]
#[derive(Debug)]
pub struct SessionContext {
    /// Lifecycle state.
    pub state: SessionState,
    /// Region that survives across frames and reloads.
    persistent_memory: MemoryRegion,
    /// Default size for new viewports.
    pub viewport_size: Dimensions,
    /// Host capabilities.
    platform: PlatformApi,
}

impl SessionContext {
    /// A context with no persistent memory and no host callbacks.
    #[must_use]
    pub const fn detached(viewport_size: Dimensions) -> Self {
        Self {
            state: SessionState::Initialized,
            persistent_memory: MemoryRegion::EMPTY,
            viewport_size,
            platform: PlatformApi::DETACHED,
        }
    }

    /// Points the context at host memory and host callbacks.
    ///
    /// # Safety
    ///
    /// Until the next [`attach`](Self::attach) or [`detach`](Self::detach):
    /// `persistent_memory` must be valid for reads and writes and reached by
    /// nothing but this context, and both `platform` callbacks must accept
    /// `platform.host`.
    pub unsafe fn attach(&mut self, persistent_memory: MemoryRegion, platform: PlatformApi) {
        self.persistent_memory = persistent_memory;
        self.platform = platform;
    }

    /// Drops the persistent region and the host callbacks.
    pub fn detach(&mut self) {
        self.persistent_memory = MemoryRegion::EMPTY;
        self.platform = PlatformApi::DETACHED;
    }

    /// `true` while attached to host callbacks.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.platform.allocate_viewport.is_some()
    }

    /// The persistent region as bytes.
    pub fn persistent_memory(&mut self) -> &mut [u8] {
        // SAFETY: only `attach` sets the region, under its contract.
        unsafe { self.persistent_memory.as_mut_slice() }
    }

    /// Asks the host for a new viewport.
    pub fn allocate_viewport(&mut self, name: &str, dimensions: Dimensions) -> Option<ViewportId> {
        let allocate = self.platform.allocate_viewport?;
        let id = allocate(self.platform.host, name.as_ptr(), name.len(), dimensions);
        (id != VIEWPORT_ERROR_ID).then_some(id)
    }

    /// Asks the host to destroy a viewport at the end of the frame.
    pub fn destroy_viewport(&mut self, viewport: ViewportId) {
        if let Some(destroy) = self.platform.destroy_viewport {
            destroy(self.platform.host, viewport);
        }
    }
}

/// The current frame's input events.
#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct InputSnapshot {
    /// First event.
    pub events: *const InputEvent,
    /// Number of events.
    pub count: usize,
}

impl InputSnapshot {
    /// No events.
    pub const EMPTY: Self = Self { events: ptr::null(), count: 0 };

    /// Describes `events`. The caller keeps `events` alive for the frame.
    #[must_use]
    pub fn from_slice(events: &[InputEvent]) -> Self {
        Self { events: events.as_ptr(), count: events.len() }
    }
}

/// Raw record slot handed back by [`NewRecordFn`].
#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct RawSlot {
    /// Start of the slot, tag byte first.
    pub ptr: *mut u8,
    /// Slot length.
    pub len: usize,
}

impl RawSlot {
    /// Refused reservation.
    pub const NULL: Self = Self { ptr: ptr::null_mut(), len: 0 };
}

/// Draw-record factory keyed by viewport and kind.
#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct DrawFactory {
    /// Opaque host state.
    pub host: *mut c_void,
    /// Reserves a record.
    pub new_record: Option<NewRecordFn>,
}

impl DrawFactory {
    /// A factory that refuses everything.
    pub const DETACHED: Self = Self { host: ptr::null_mut(), new_record: None };
}

/// Everything the module gets for one frame.
///
/// Pointer-carrying fields cannot be set from outside:
///
/// ```compile_fail
/// use hotframe_core::{FrameRequest, InputSnapshot, Point};
///
/// let request = FrameRequest {
///     input: InputSnapshot::EMPTY,
///     ..FrameRequest::detached(1, 0.016, Point::default())
/// };
/// ```
#[repr(C)]
#[derive(Debug)]
pub struct FrameRequest {
    /// Frame counter, starting at 1.
    pub frame_number: u64,
    /// Seconds since the previous frame.
    pub frame_time: f32,
    /// Scratch region, zeroed after the frame.
    frame_memory: MemoryRegion,
    /// Input events for this frame.
    input: InputSnapshot,
    /// Pointer location at frame start.
    pub cursor: Point,
    /// Draw-record factory.
    draw: DrawFactory,
}

impl FrameRequest {
    /// A request with no scratch memory, no input and a factory that refuses
    /// every record.
    #[must_use]
    pub fn detached(frame_number: u64, frame_time: f32, cursor: Point) -> Self {
        Self {
            frame_number,
            frame_time,
            frame_memory: MemoryRegion::EMPTY,
            input: InputSnapshot::EMPTY,
            cursor,
            draw: DrawFactory::DETACHED,
        }
    }

    /// A request reaching host memory.
    ///
    /// # Safety
    ///
    /// For as long as the request is used: `frame_memory` must be valid for
    /// reads and writes and reached by nothing but this request, `input` must
    /// describe initialized events that are not written to, and
    /// `draw.new_record` must accept `draw.host` and return either
    /// [`RawSlot::NULL`] or a slot valid for writes that nothing else reaches
    /// until the next call.
    #[must_use]
    pub unsafe fn new(
        frame_number: u64,
        frame_time: f32,
        frame_memory: MemoryRegion,
        input: InputSnapshot,
        cursor: Point,
        draw: DrawFactory,
    ) -> Self {
        Self { frame_number, frame_time, frame_memory, input, cursor, draw }
    }

    /// Input events for this frame.
    #[must_use]
    pub fn events(&self) -> &[InputEvent] {
        if self.input.events.is_null() || self.input.count == 0 {
            return &[];
        }
        // SAFETY: only `new` sets the snapshot, under its contract.
        unsafe { slice::from_raw_parts(self.input.events, self.input.count) }
    }

    /// Frame-scoped scratch bytes.
    pub fn frame_memory(&mut self) -> &mut [u8] {
        // SAFETY: only `new` sets the region, under its contract.
        unsafe { self.frame_memory.as_mut_slice() }
    }

    /// Reserves a draw record of `kind` in `viewport`'s buffer.
    ///
    /// `None` if the host refused: unknown or closing viewport, or no space left.
    pub fn new_record(&mut self, viewport: ViewportId, kind: DrawKind) -> Option<RecordSlot<'_>> {
        let new_record = self.draw.new_record?;
        let raw = new_record(self.draw.host, viewport, kind.tag());
        if raw.ptr.is_null() {
            return None;
        }
        // SAFETY: only `new` sets the factory, whose non-null slots are
        // writable and unaliased per its contract.
        let bytes = unsafe { slice::from_raw_parts_mut(raw.ptr, raw.len) };
        RecordSlot::from_bytes(bytes)
    }

    /// Reserves and fills a record. Returns `false` if it was dropped.
    pub fn draw(&mut self, viewport: ViewportId, command: &DrawCommand) -> bool {
        self.new_record(viewport, command.kind())
            .is_some_and(|slot| slot.write(command).is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draw::{Color, DrawHeader};
    use crate::input::ActionKey;
    use crate::wire::WireBuffer;

    extern "C" fn reserve_in_buffer(host: *mut c_void, _viewport: ViewportId, tag: u8) -> RawSlot {
        // SAFETY: tests pass a live `WireBuffer`.
        let buffer = unsafe { &mut *host.cast::<WireBuffer>() };
        let Some(kind) = DrawKind::from_tag(tag) else {
            return RawSlot::NULL;
        };
        match buffer.new_record(kind) {
            Some(slot) => {
                let bytes = slot.into_bytes();
                RawSlot { ptr: bytes.as_mut_ptr(), len: bytes.len() }
            }
            None => RawSlot::NULL,
        }
    }

    fn request(draw: DrawFactory, input: &[InputEvent]) -> FrameRequest {
        // SAFETY: tests keep the buffer behind `draw` and `input` alive for the request.
        unsafe {
            FrameRequest::new(1, 0.016, MemoryRegion::EMPTY, InputSnapshot::from_slice(input), Point::default(), draw)
        }
    }

    #[test]
    fn test_draw_through_factory() {
        let mut buffer = WireBuffer::new(64);
        buffer.begin_write().unwrap();
        let factory = DrawFactory {
            host: ptr::addr_of_mut!(buffer).cast(),
            new_record: Some(reserve_in_buffer),
        };
        let command = DrawCommand::rectangle(DrawHeader::at(3, 4, Color::WHITE), 5, 6);
        let events = [InputEvent::press(0, ActionKey::ArrowLeft)];

        let mut req = request(factory, &events);
        assert!(req.draw(0, &command));
        assert_eq!(req.events(), &events);
        assert!(req.frame_memory().is_empty());

        buffer.begin_read().unwrap();
        assert_eq!(buffer.next(), Ok(Some(command)));
    }

    #[test]
    fn test_detached_factory_refuses() {
        let mut req = request(DrawFactory::DETACHED, &[]);
        assert!(req.new_record(0, DrawKind::Line).is_none());
    }

    #[test]
    fn test_detached_request_reaches_nothing() {
        let mut req = FrameRequest::detached(3, 0.016, Point { x: 1, y: 2 });
        assert_eq!(req.frame_number, 3);
        assert_eq!(req.cursor, Point { x: 1, y: 2 });
        assert!(req.events().is_empty());
        assert!(req.frame_memory().is_empty());
        assert!(!req.draw(0, &DrawCommand::rectangle(DrawHeader::at(0, 0, Color::WHITE), 1, 1)));
    }

    #[test]
    fn test_detached_platform() {
        let mut ctx = SessionContext::detached(Dimensions::new(800, 600));
        assert!(!ctx.is_attached());
        assert_eq!(ctx.allocate_viewport("main", ctx.viewport_size), None);
        ctx.destroy_viewport(0);
        assert!(ctx.persistent_memory().is_empty());
    }

    #[test]
    fn test_detach_drops_memory() {
        let mut bytes = [7u8; 16];
        let mut ctx = SessionContext::detached(Dimensions::new(800, 600));
        // SAFETY: `bytes` outlives the attachment and is reached only through `ctx`.
        unsafe { ctx.attach(MemoryRegion::from_slice(&mut bytes), PlatformApi::DETACHED) };
        assert_eq!(ctx.persistent_memory().len(), 16);
        ctx.persistent_memory()[0] = 1;

        ctx.detach();
        assert!(ctx.persistent_memory().is_empty());
        assert_eq!(bytes[0], 1);
    }
}
