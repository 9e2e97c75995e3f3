//! # Wire Buffer
//!
//! A fixed-capacity byte region carrying one frame's draw commands across
//! the module boundary. No pointers are stored in the region: record
//! boundaries come purely from the size table keyed on each tag.
//!
//! ## Frame Lifecycle
//!
//! ```text
//!   begin_write ──> new_record* ──> begin_read ──> next* ──> (next frame)
//!   (zero region)   (append only)   (tag check)    (in write order)
//! ```
//!
//! Write mode and read mode never overlap. At most one writer per frame.

use tracing::{error, warn};

use crate::draw::{
    decode_record, encode_header, encode_shape, DrawCommand, DrawHeader, DrawKind, Shape,
    MIN_RECORD_SIZE,
};
use crate::error::{WireError, WireResult};

/// Current phase of a [`WireBuffer`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BufferMode {
    /// Never prepared for writing or reading.
    Uninitialized,
    /// Accepting new records.
    Write,
    /// Being decoded. The region is not mutated.
    Read,
    /// A decode error was hit. Remaining records for this frame are abandoned.
    Poisoned,
}

/// Outcome of a successful [`WireBuffer::begin_write`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriteStatus {
    /// Region ready for records.
    Ready,
    /// Region ready but too small for any record. Every reservation will fail.
    Undersized {
        /// Capacity of the region in bytes.
        capacity: usize,
    },
}

/// Fixed-capacity draw command buffer with a single cursor.
#[derive(Debug)]
pub struct WireBuffer {
    region: Option<Box<[u8]>>,
    cursor: usize,
    mode: BufferMode,
}

impl WireBuffer {
    /// Allocates a zeroed region of `capacity` bytes.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self::from_bytes(vec![0u8; capacity])
    }

    /// Adopts an existing region as-is.
    #[must_use]
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self {
            region: Some(bytes.into_boxed_slice()),
            cursor: 0,
            mode: BufferMode::Uninitialized,
        }
    }

    /// A buffer with no backing region. Both modes refuse to start.
    #[must_use]
    pub const fn detached() -> Self {
        Self {
            region: None,
            cursor: 0,
            mode: BufferMode::Uninitialized,
        }
    }

    /// Capacity in bytes (zero when detached).
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.region.as_ref().map_or(0, |r| r.len())
    }

    /// Cursor position in bytes.
    #[inline]
    #[must_use]
    pub const fn cursor(&self) -> usize {
        self.cursor
    }

    /// Bytes left between the cursor and the end of the region.
    #[inline]
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.capacity() - self.cursor
    }

    /// Current mode.
    #[inline]
    #[must_use]
    pub const fn mode(&self) -> BufferMode {
        self.mode
    }

    /// The raw region.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.region.as_deref().unwrap_or(&[])
    }

    /// Puts the buffer in write mode: cursor to zero, region zeroed.
    ///
    /// A region smaller than the smallest record is accepted and reported
    /// as [`WriteStatus::Undersized`].
    ///
    /// # Errors
    ///
    /// [`WireError::Detached`] if there is no backing region.
    pub fn begin_write(&mut self) -> WireResult<WriteStatus> {
        let Some(region) = self.region.as_mut() else {
            error!("attempted to make a draw buffer writeable without a backing region");
            return Err(WireError::Detached);
        };

        region.fill(0);
        self.cursor = 0;
        self.mode = BufferMode::Write;

        let capacity = region.len();
        if capacity < MIN_RECORD_SIZE {
            warn!(capacity, "draw buffer is writeable but too small for any draw call");
            return Ok(WriteStatus::Undersized { capacity });
        }
        Ok(WriteStatus::Ready)
    }

    /// Reserves a record of `kind`, writes its tag and advances the cursor
    /// by the full record size.
    ///
    /// On failure nothing is written and the cursor does not move.
    ///
    /// # Errors
    ///
    /// [`WireError::OutOfSpace`] when `remaining() < kind.encoded_size()`,
    /// [`WireError::WrongMode`] outside write mode or for `DrawKind::Empty`.
    pub fn reserve(&mut self, kind: DrawKind) -> WireResult<RecordSlot<'_>> {
        if self.mode != BufferMode::Write || kind == DrawKind::Empty {
            return Err(WireError::WrongMode("write"));
        }
        let region = self.region.as_mut().ok_or(WireError::Detached)?;

        let required = kind.encoded_size();
        let available = region.len() - self.cursor;
        if required > available {
            return Err(WireError::OutOfSpace { kind, required, available });
        }

        let start = self.cursor;
        self.cursor += required;

        let bytes = &mut region[start..start + required];
        bytes[0] = kind.tag();
        Ok(RecordSlot { bytes, kind })
    }

    /// [`reserve`](Self::reserve), logging and discarding the error.
    ///
    /// `None` means this single draw call is dropped; the frame goes on.
    pub fn new_record(&mut self, kind: DrawKind) -> Option<RecordSlot<'_>> {
        match self.reserve(kind) {
            Ok(slot) => Some(slot),
            Err(e) => {
                warn!("dropping draw call: {e}");
                None
            }
        }
    }

    /// Reserves a slot for `command` and fills it in.
    ///
    /// # Errors
    ///
    /// Same as [`reserve`](Self::reserve).
    pub fn push(&mut self, command: &DrawCommand) -> WireResult<()> {
        self.reserve(command.kind())?.write(command)
    }

    /// Puts the buffer in read mode and checks the first tag.
    ///
    /// This is the buffer's one up-front corruption check; when it fails the
    /// buffer must not be iterated.
    ///
    /// # Errors
    ///
    /// [`WireError::Detached`], [`WireError::Undersized`], or
    /// [`WireError::UnknownTag`] when the first byte is not a known kind.
    pub fn begin_read(&mut self) -> WireResult<()> {
        let Some(region) = self.region.as_ref() else {
            error!("attempted to read a draw buffer without a backing region");
            return Err(WireError::Detached);
        };

        if region.len() < MIN_RECORD_SIZE {
            error!(capacity = region.len(), "attempted to read a draw buffer too small for any draw call");
            return Err(WireError::Undersized {
                capacity: region.len(),
                minimum: MIN_RECORD_SIZE,
            });
        }

        let tag = region[0];
        if DrawKind::from_tag(tag).is_none() {
            error!(tag, "draw buffer starts with an invalid tag, refusing to read faulty memory");
            self.mode = BufferMode::Poisoned;
            return Err(WireError::UnknownTag { offset: 0, tag });
        }

        self.cursor = 0;
        self.mode = BufferMode::Read;
        Ok(())
    }

    /// Decodes the next record.
    ///
    /// `Ok(None)` is the end of the sequence: the cursor reached capacity or
    /// hit an `Empty` tag. After a decode error the buffer is poisoned and
    /// keeps returning `Ok(None)` until the next `begin_write`.
    ///
    /// # Errors
    ///
    /// [`WireError::UnknownTag`] and [`WireError::Truncated`] are corruption;
    /// [`WireError::WrongMode`] if `begin_read` was not called.
    pub fn next(&mut self) -> WireResult<Option<DrawCommand>> {
        let capacity = self.capacity();
        if self.cursor == capacity {
            return Ok(None);
        }
        match self.mode {
            BufferMode::Read => {}
            BufferMode::Poisoned => return Ok(None),
            BufferMode::Write | BufferMode::Uninitialized => return Err(WireError::WrongMode("read")),
        }
        let Some(region) = self.region.as_ref() else {
            return Ok(None);
        };

        let offset = self.cursor;
        let tag = region[offset];
        let kind = match DrawKind::from_tag(tag) {
            Some(DrawKind::Empty) => return Ok(None),
            Some(kind) => kind,
            None => {
                self.mode = BufferMode::Poisoned;
                return Err(WireError::UnknownTag { offset, tag });
            }
        };

        let required = kind.encoded_size();
        let available = capacity - offset;
        if available < required {
            self.mode = BufferMode::Poisoned;
            return Err(WireError::Truncated { offset, kind, required, available });
        }

        let record = &region[offset..offset + required];
        let Some(command) = decode_record(kind, record) else {
            self.mode = BufferMode::Poisoned;
            return Err(WireError::Truncated { offset, kind, required, available });
        };

        self.cursor += required;
        Ok(Some(command))
    }

    /// Iterator over the remaining records. Yields at most one error, then stops.
    pub fn records(&mut self) -> Records<'_> {
        Records { buffer: self, done: false }
    }
}

/// Iterator returned by [`WireBuffer::records`].
pub struct Records<'a> {
    buffer: &'a mut WireBuffer,
    done: bool,
}

impl Iterator for Records<'_> {
    type Item = WireResult<DrawCommand>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.buffer.next() {
            Ok(Some(command)) => Some(Ok(command)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// A reserved, tagged record the caller fills in.
///
/// The slot is exactly `kind.encoded_size()` bytes and starts zeroed except
/// for the tag.
#[derive(Debug)]
pub struct RecordSlot<'a> {
    bytes: &'a mut [u8],
    kind: DrawKind,
}

impl<'a> RecordSlot<'a> {
    /// Wraps raw slot bytes handed over the module boundary.
    ///
    /// Returns `None` if the tag is not a drawable kind or the length does
    /// not match its encoded size.
    pub fn from_bytes(bytes: &'a mut [u8]) -> Option<Self> {
        let kind = DrawKind::from_tag(*bytes.first()?)?;
        if kind == DrawKind::Empty || bytes.len() != kind.encoded_size() {
            return None;
        }
        Some(Self { bytes, kind })
    }

    /// Kind the slot was reserved for.
    #[inline]
    #[must_use]
    pub const fn kind(&self) -> DrawKind {
        self.kind
    }

    /// Slot length in bytes.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Always false; a slot holds at least a header.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Writes the common header fields.
    pub fn set_header(&mut self, header: &DrawHeader) {
        encode_header(self.bytes, header);
    }

    /// Writes the payload.
    ///
    /// # Errors
    ///
    /// [`WireError::KindMismatch`] if `shape` is not of the reserved kind.
    pub fn set_shape(&mut self, shape: &Shape) -> WireResult<()> {
        if shape.kind() != self.kind {
            return Err(WireError::KindMismatch {
                expected: self.kind,
                actual: shape.kind(),
            });
        }
        encode_shape(self.bytes, shape);
        Ok(())
    }

    /// Writes a complete command.
    ///
    /// # Errors
    ///
    /// [`WireError::KindMismatch`] if `command` is not of the reserved kind.
    pub fn write(mut self, command: &DrawCommand) -> WireResult<()> {
        self.set_shape(&command.shape)?;
        self.set_header(&command.header);
        Ok(())
    }

    /// Gives back the underlying bytes.
    #[must_use]
    pub fn into_bytes(self) -> &'a mut [u8] {
        self.bytes
    }
}
