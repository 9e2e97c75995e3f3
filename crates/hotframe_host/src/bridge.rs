//! C-ABI callbacks the module uses to reach the viewport table.
//!
//! The opaque `host` pointer in [`PlatformApi`] and [`DrawFactory`] is the
//! host's [`ViewportTable`]. Each call into the module takes one raw pointer
//! to the table, builds both capability tables from it, and detaches the
//! session again before the borrow of the table ends.

#![allow(unsafe_code)]

use std::ffi::c_void;
use std::slice;

use hotframe_core::{
    Dimensions, DrawFactory, DrawKind, FrameRequest, InputEvent, InputSnapshot, MemoryRegion,
    PlatformApi, Point, RawSlot, SessionContext, ViewportId, VIEWPORT_ERROR_ID,
};

use crate::viewport::ViewportTable;

/// Per-frame values handed to the module next to the session.
pub(crate) struct FrameView<'a> {
    pub number: u64,
    pub time: f32,
    pub memory: &'a mut [u8],
    pub events: &'a [InputEvent],
    pub cursor: Point,
}

/// Attaches `session` to `memory` and `table` for the duration of `call`.
pub(crate) fn with_session<T>(
    session: &mut SessionContext,
    memory: &mut [u8],
    table: &mut ViewportTable,
    call: impl FnOnce(&mut SessionContext) -> T,
) -> T {
    let host: *mut ViewportTable = table;
    // SAFETY: `memory` and `table` stay borrowed until the session is
    // detached below, and `host` is the only path to the table meanwhile.
    unsafe { session.attach(MemoryRegion::from_slice(memory), platform_api(host)) };
    let result = call(session);
    session.detach();
    result
}

/// Like [`with_session`], with a frame request whose draw factory shares the
/// session's table pointer.
pub(crate) fn with_frame<T>(
    session: &mut SessionContext,
    memory: &mut [u8],
    table: &mut ViewportTable,
    frame: FrameView<'_>,
    call: impl FnOnce(&mut SessionContext, &mut FrameRequest) -> T,
) -> T {
    let host: *mut ViewportTable = table;
    // SAFETY: as in `with_session`. Both tables hold the same `host`, so
    // neither call path invalidates the other.
    let mut request = unsafe {
        session.attach(MemoryRegion::from_slice(memory), platform_api(host));
        FrameRequest::new(
            frame.number,
            frame.time,
            MemoryRegion::from_slice(frame.memory),
            InputSnapshot::from_slice(frame.events),
            frame.cursor,
            draw_factory(host),
        )
    };
    let result = call(session, &mut request);
    session.detach();
    result
}

fn platform_api(host: *mut ViewportTable) -> PlatformApi {
    PlatformApi {
        host: host.cast(),
        allocate_viewport: Some(allocate_viewport),
        destroy_viewport: Some(destroy_viewport),
    }
}

fn draw_factory(host: *mut ViewportTable) -> DrawFactory {
    DrawFactory { host: host.cast(), new_record: Some(new_record) }
}

/// # Safety
///
/// `host` must come from [`with_session`] or [`with_frame`] during the call
/// it was made for.
unsafe fn table<'a>(host: *mut c_void) -> Option<&'a mut ViewportTable> {
    host.cast::<ViewportTable>().as_mut()
}

extern "C" fn allocate_viewport(
    host: *mut c_void,
    name: *const u8,
    name_len: usize,
    dimensions: Dimensions,
) -> ViewportId {
    // SAFETY: the host pointer was attached for this call.
    let Some(table) = (unsafe { table(host) }) else {
        return VIEWPORT_ERROR_ID;
    };
    let bytes = if name.is_null() {
        &[][..]
    } else {
        // SAFETY: the module passes a live `&str`'s pointer and length.
        unsafe { slice::from_raw_parts(name, name_len) }
    };
    table.allocate(&String::from_utf8_lossy(bytes), dimensions)
}

extern "C" fn destroy_viewport(host: *mut c_void, viewport: ViewportId) {
    // SAFETY: the host pointer was attached for this call.
    if let Some(table) = unsafe { table(host) } {
        table.request_destroy(viewport);
    }
}

extern "C" fn new_record(host: *mut c_void, viewport: ViewportId, tag: u8) -> RawSlot {
    // SAFETY: the host pointer was attached for this call.
    let Some(table) = (unsafe { table(host) }) else {
        return RawSlot::NULL;
    };
    let Some(kind) = DrawKind::from_tag(tag) else {
        return RawSlot::NULL;
    };
    match table.new_record(viewport, kind) {
        Some(slot) => {
            let bytes = slot.into_bytes();
            RawSlot { ptr: bytes.as_mut_ptr(), len: bytes.len() }
        }
        None => RawSlot::NULL,
    }
}
