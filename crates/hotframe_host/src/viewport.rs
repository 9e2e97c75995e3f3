//! # Viewports
//!
//! Host-owned drawable targets, created and destroyed at the module's
//! request. Each viewport owns one wire buffer, allocated at creation and
//! reused every frame.
//!
//! Ids are small integers. Freed slots are reused lowest-first, and
//! [`VIEWPORT_ERROR_ID`] is never handed out.

use hotframe_core::{Dimensions, DrawKind, RecordSlot, ViewportId, WireBuffer, WriteStatus, VIEWPORT_ERROR_ID};
use tracing::{debug, error, info, trace, warn};

/// One drawable target.
#[derive(Debug)]
pub struct Viewport {
    id: ViewportId,
    name: String,
    dimensions: Dimensions,
    draw_buffer: WireBuffer,
    drawing_enabled: bool,
    closing: bool,
}

impl Viewport {
    /// Id handed to the module.
    pub fn id(&self) -> ViewportId {
        self.id
    }

    /// Name requested by the module.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Requested size.
    pub fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    /// Whether this frame's draw buffer accepted write mode.
    pub fn drawing_enabled(&self) -> bool {
        self.drawing_enabled
    }

    /// Whether destruction was requested this frame.
    pub fn is_closing(&self) -> bool {
        self.closing
    }

    /// The draw buffer.
    pub fn draw_buffer(&self) -> &WireBuffer {
        &self.draw_buffer
    }

    /// The draw buffer, writable.
    pub fn draw_buffer_mut(&mut self) -> &mut WireBuffer {
        &mut self.draw_buffer
    }
}

/// Every live viewport, indexed by id.
#[derive(Debug)]
pub struct ViewportTable {
    slots: Vec<Option<Viewport>>,
    draw_buffer_bytes: usize,
    in_frame: bool,
    dropped_records: u64,
}

impl ViewportTable {
    /// Empty table. Each new viewport gets a buffer of `draw_buffer_bytes`.
    pub fn new(draw_buffer_bytes: usize) -> Self {
        Self {
            slots: Vec::new(),
            draw_buffer_bytes,
            in_frame: false,
            dropped_records: 0,
        }
    }

    /// Number of live viewports.
    pub fn len(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    /// Whether no viewport is live.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Looks up a viewport.
    pub fn get(&self, id: ViewportId) -> Option<&Viewport> {
        self.slots.get(usize::from(id))?.as_ref()
    }

    /// Looks up a viewport, writable.
    pub fn get_mut(&mut self, id: ViewportId) -> Option<&mut Viewport> {
        self.slots.get_mut(usize::from(id))?.as_mut()
    }

    /// Live viewports in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Viewport> {
        self.slots.iter().flatten()
    }

    /// Live viewports in id order, writable.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Viewport> {
        self.slots.iter_mut().flatten()
    }

    /// Creates a viewport in the lowest free slot.
    ///
    /// Returns [`VIEWPORT_ERROR_ID`] when every id is taken.
    pub fn allocate(&mut self, name: &str, dimensions: Dimensions) -> ViewportId {
        let index = self
            .slots
            .iter()
            .position(Option::is_none)
            .unwrap_or(self.slots.len());

        let Ok(id) = ViewportId::try_from(index) else {
            error!(name, "no free viewport id");
            return VIEWPORT_ERROR_ID;
        };
        if id == VIEWPORT_ERROR_ID {
            error!(name, "no free viewport id");
            return VIEWPORT_ERROR_ID;
        }

        let mut draw_buffer = WireBuffer::new(self.draw_buffer_bytes);
        // A viewport created mid-frame can be drawn to right away.
        let drawing_enabled = self.in_frame && draw_buffer.begin_write().is_ok();

        let viewport = Viewport {
            id,
            name: name.to_owned(),
            dimensions,
            draw_buffer,
            drawing_enabled,
            closing: false,
        };
        if index == self.slots.len() {
            self.slots.push(Some(viewport));
        } else {
            self.slots[index] = Some(viewport);
        }

        info!(id, name, width = dimensions.width, height = dimensions.height, "viewport created");
        id
    }

    /// Destroys a viewport.
    ///
    /// During a frame the viewport stops accepting records at once and is
    /// freed by [`end_frame`](Self::end_frame). Outside a frame it is freed
    /// immediately. Returns `false` for an unknown id.
    pub fn request_destroy(&mut self, id: ViewportId) -> bool {
        let in_frame = self.in_frame;
        let Some(slot) = self.slots.get_mut(usize::from(id)) else {
            warn!(id, "destroy requested for unknown viewport");
            return false;
        };
        let Some(viewport) = slot.as_mut() else {
            warn!(id, "destroy requested for unknown viewport");
            return false;
        };

        if in_frame {
            viewport.closing = true;
            viewport.drawing_enabled = false;
            debug!(id, "viewport closing at end of frame");
        } else {
            *slot = None;
            info!(id, "viewport destroyed");
        }
        true
    }

    /// Puts every viewport's buffer in write mode.
    ///
    /// A viewport whose buffer refuses is disabled for this frame only.
    /// Returns how many were disabled.
    pub fn begin_frame(&mut self) -> u32 {
        self.in_frame = true;
        let mut skipped = 0;
        for viewport in self.iter_mut() {
            match viewport.draw_buffer.begin_write() {
                Ok(WriteStatus::Ready | WriteStatus::Undersized { .. }) => viewport.drawing_enabled = true,
                Err(e) => {
                    error!(id = viewport.id, "drawing disabled for this frame: {e}");
                    viewport.drawing_enabled = false;
                    skipped += 1;
                }
            }
        }
        skipped
    }

    /// Reserves a record in `id`'s buffer.
    ///
    /// `None` for unknown, closing or disabled viewports, and when the buffer
    /// is out of space.
    pub fn new_record(&mut self, id: ViewportId, kind: DrawKind) -> Option<RecordSlot<'_>> {
        let Some(viewport) = self.slots.get_mut(usize::from(id)).and_then(Option::as_mut) else {
            trace!(id, "draw record refused: unknown viewport");
            return None;
        };
        if viewport.closing || !viewport.drawing_enabled {
            trace!(id, "draw record refused: viewport not drawable");
            return None;
        }
        let slot = viewport.draw_buffer.new_record(kind);
        if slot.is_none() {
            self.dropped_records += 1;
        }
        slot
    }

    /// Frees viewports whose destruction was requested during the frame.
    ///
    /// Returns their ids.
    pub fn end_frame(&mut self) -> Vec<ViewportId> {
        self.in_frame = false;
        let mut closed = Vec::new();
        for slot in &mut self.slots {
            if slot.as_ref().is_some_and(|v| v.closing) {
                if let Some(viewport) = slot.take() {
                    info!(id = viewport.id, "viewport destroyed");
                    closed.push(viewport.id);
                }
            }
        }
        closed
    }

    /// Records dropped since the last call.
    pub fn take_dropped_records(&mut self) -> u64 {
        std::mem::take(&mut self.dropped_records)
    }

    /// Destroys everything.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.in_frame = false;
    }
}
