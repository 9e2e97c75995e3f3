//! # Draw Commands
//!
//! The typed side of the wire protocol. Every command is a common header
//! followed by a payload whose size is fixed by its kind.
//!
//! ## Record Layout
//!
//! ```text
//! ┌─────┬─────┬─────┬──────────┬───────────┬──────────────────────────┐
//! │ tag │  x  │  y  │ rotation │   color   │ payload (kind-specific)  │
//! │ u8  │ u16 │ u16 │   u16    │    u32    │                          │
//! └─────┴─────┴─────┴──────────┴───────────┴──────────────────────────┘
//!   Line      dest_x u16, dest_y u16, width u16            = 17 bytes
//!   Rectangle width u16, height u16                        = 15 bytes
//!   Ellipse   radius_x f32, radius_y f32                   = 19 bytes
//!   Bitmap    width u16, height u16, res_x u16, res_y u16  = 19 bytes
//! ```
//!
//! All fields are little-endian and unpadded.

use bytemuck::{Pod, Zeroable};

/// Size of the header shared by every record (tag included).
pub const HEADER_SIZE: usize = 11;

/// Smallest encoded record. Regions below this size can hold nothing.
pub const MIN_RECORD_SIZE: usize = DrawKind::Rectangle.encoded_size();

/// Packed RGBA color. Red lives in the low byte.
#[repr(transparent)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
pub struct Color(pub u32);

impl Color {
    /// Opaque black, the host's clear color.
    pub const BLACK: Self = Self::rgba(0, 0, 0, 255);
    /// Opaque white.
    pub const WHITE: Self = Self::rgba(255, 255, 255, 255);

    /// Packs four channels.
    #[must_use]
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self(u32::from_le_bytes([r, g, b, a]))
    }

    /// Returns the channels as `[r, g, b, a]`.
    #[must_use]
    pub const fn channels(self) -> [u8; 4] {
        self.0.to_le_bytes()
    }
}

impl From<u32> for Color {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

/// Tag byte of a record.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DrawKind {
    /// Zeroed memory. Marks the end of the written records.
    Empty = 0,
    /// Straight line from the origin to a destination point.
    Line = 1,
    /// Axis-aligned (before rotation) rectangle with its top-left at the origin.
    Rectangle = 2,
    /// Ellipse centered on the origin.
    Ellipse = 3,
    /// Rectangle filled with a bitmap of the given source resolution.
    Bitmap = 4,
}

impl DrawKind {
    /// Decodes a tag byte. Values past `Bitmap` are invalid.
    #[must_use]
    pub const fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::Empty),
            1 => Some(Self::Line),
            2 => Some(Self::Rectangle),
            3 => Some(Self::Ellipse),
            4 => Some(Self::Bitmap),
            _ => None,
        }
    }

    /// The tag byte for this kind.
    #[inline]
    #[must_use]
    pub const fn tag(self) -> u8 {
        self as u8
    }

    /// Full encoded size of a record of this kind, header included.
    ///
    /// `Empty` has no record and reports zero.
    #[must_use]
    pub const fn encoded_size(self) -> usize {
        match self {
            Self::Empty => 0,
            Self::Line => HEADER_SIZE + 6,
            Self::Rectangle => HEADER_SIZE + 4,
            Self::Ellipse | Self::Bitmap => HEADER_SIZE + 8,
        }
    }
}

/// Fields shared by every command.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DrawHeader {
    /// Origin x, interpreted per kind.
    pub x: u16,
    /// Origin y, interpreted per kind.
    pub y: u16,
    /// Rotation in degrees.
    pub rotation: u16,
    /// Fill color.
    pub color: Color,
}

impl DrawHeader {
    /// Header at `(x, y)` with no rotation.
    #[must_use]
    pub const fn at(x: u16, y: u16, color: Color) -> Self {
        Self { x, y, rotation: 0, color }
    }
}

/// Kind-specific payload.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Shape {
    /// Line to `(dest_x, dest_y)` of the given width.
    Line {
        /// Destination x.
        dest_x: u16,
        /// Destination y.
        dest_y: u16,
        /// Width in pixels along the main axis.
        width: u16,
    },
    /// Rectangle of `width` x `height`.
    Rectangle {
        /// Width in pixels.
        width: u16,
        /// Height in pixels.
        height: u16,
    },
    /// Ellipse with two radii.
    Ellipse {
        /// Radius along the rotated x axis.
        radius_x: f32,
        /// Radius along the rotated y axis.
        radius_y: f32,
    },
    /// Bitmap stretched into a `width` x `height` rectangle.
    Bitmap {
        /// Width in pixels.
        width: u16,
        /// Height in pixels.
        height: u16,
        /// Source resolution x.
        resolution_x: u16,
        /// Source resolution y.
        resolution_y: u16,
    },
}

impl Shape {
    /// The kind this payload encodes as.
    #[must_use]
    pub const fn kind(&self) -> DrawKind {
        match self {
            Self::Line { .. } => DrawKind::Line,
            Self::Rectangle { .. } => DrawKind::Rectangle,
            Self::Ellipse { .. } => DrawKind::Ellipse,
            Self::Bitmap { .. } => DrawKind::Bitmap,
        }
    }
}

/// One decoded draw command.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DrawCommand {
    /// Common fields.
    pub header: DrawHeader,
    /// Kind-specific fields.
    pub shape: Shape,
}

impl DrawCommand {
    /// Line from `header`'s origin to `(dest_x, dest_y)`.
    #[must_use]
    pub const fn line(header: DrawHeader, dest_x: u16, dest_y: u16, width: u16) -> Self {
        Self { header, shape: Shape::Line { dest_x, dest_y, width } }
    }

    /// Rectangle with its top-left corner at `header`'s origin.
    #[must_use]
    pub const fn rectangle(header: DrawHeader, width: u16, height: u16) -> Self {
        Self { header, shape: Shape::Rectangle { width, height } }
    }

    /// Ellipse centered at `header`'s origin.
    #[must_use]
    pub const fn ellipse(header: DrawHeader, radius_x: f32, radius_y: f32) -> Self {
        Self { header, shape: Shape::Ellipse { radius_x, radius_y } }
    }

    /// Kind of this command.
    #[inline]
    #[must_use]
    pub const fn kind(&self) -> DrawKind {
        self.shape.kind()
    }

    /// Encoded size of this command.
    #[inline]
    #[must_use]
    pub const fn encoded_size(&self) -> usize {
        self.kind().encoded_size()
    }
}

// ============================================================================
// BYTE CURSORS
// ============================================================================

/// Little-endian writer over a record slot. Slots are sized from the kind
/// table before a writer is created, so writes never run past the end.
pub(crate) struct FieldWriter<'a> {
    bytes: &'a mut [u8],
    position: usize,
}

impl<'a> FieldWriter<'a> {
    pub(crate) fn new(bytes: &'a mut [u8], position: usize) -> Self {
        Self { bytes, position }
    }

    #[inline]
    fn put(&mut self, value: &[u8]) {
        let end = self.position + value.len();
        self.bytes[self.position..end].copy_from_slice(value);
        self.position = end;
    }

    #[inline]
    pub(crate) fn write_u16(&mut self, value: u16) {
        self.put(&value.to_le_bytes());
    }

    #[inline]
    pub(crate) fn write_u32(&mut self, value: u32) {
        self.put(&value.to_le_bytes());
    }

    #[inline]
    pub(crate) fn write_f32(&mut self, value: f32) {
        self.put(&value.to_le_bytes());
    }
}

/// Little-endian reader over a record.
pub(crate) struct FieldReader<'a> {
    bytes: &'a [u8],
    position: usize,
}

impl<'a> FieldReader<'a> {
    pub(crate) fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, position: 0 }
    }

    #[inline]
    fn take<const N: usize>(&mut self) -> Option<[u8; N]> {
        let end = self.position + N;
        let chunk = self.bytes.get(self.position..end)?;
        self.position = end;
        chunk.try_into().ok()
    }

    #[inline]
    pub(crate) fn read_u8(&mut self) -> Option<u8> {
        self.take::<1>().map(|b| b[0])
    }

    #[inline]
    pub(crate) fn read_u16(&mut self) -> Option<u16> {
        self.take().map(u16::from_le_bytes)
    }

    #[inline]
    pub(crate) fn read_u32(&mut self) -> Option<u32> {
        self.take().map(u32::from_le_bytes)
    }

    #[inline]
    pub(crate) fn read_f32(&mut self) -> Option<f32> {
        self.take().map(f32::from_le_bytes)
    }
}

/// Writes the header fields (everything after the tag).
pub(crate) fn encode_header(bytes: &mut [u8], header: &DrawHeader) {
    let mut w = FieldWriter::new(bytes, 1);
    w.write_u16(header.x);
    w.write_u16(header.y);
    w.write_u16(header.rotation);
    w.write_u32(header.color.0);
}

/// Writes the payload fields after the header.
pub(crate) fn encode_shape(bytes: &mut [u8], shape: &Shape) {
    let mut w = FieldWriter::new(bytes, HEADER_SIZE);
    match *shape {
        Shape::Line { dest_x, dest_y, width } => {
            w.write_u16(dest_x);
            w.write_u16(dest_y);
            w.write_u16(width);
        }
        Shape::Rectangle { width, height } => {
            w.write_u16(width);
            w.write_u16(height);
        }
        Shape::Ellipse { radius_x, radius_y } => {
            w.write_f32(radius_x);
            w.write_f32(radius_y);
        }
        Shape::Bitmap { width, height, resolution_x, resolution_y } => {
            w.write_u16(width);
            w.write_u16(height);
            w.write_u16(resolution_x);
            w.write_u16(resolution_y);
        }
    }
}

/// Decodes one complete record. `bytes` must be exactly the record.
pub(crate) fn decode_record(kind: DrawKind, bytes: &[u8]) -> Option<DrawCommand> {
    let mut r = FieldReader::new(bytes);
    let _tag = r.read_u8()?;
    let header = DrawHeader {
        x: r.read_u16()?,
        y: r.read_u16()?,
        rotation: r.read_u16()?,
        color: Color(r.read_u32()?),
    };
    let shape = match kind {
        DrawKind::Empty => return None,
        DrawKind::Line => Shape::Line {
            dest_x: r.read_u16()?,
            dest_y: r.read_u16()?,
            width: r.read_u16()?,
        },
        DrawKind::Rectangle => Shape::Rectangle {
            width: r.read_u16()?,
            height: r.read_u16()?,
        },
        DrawKind::Ellipse => Shape::Ellipse {
            radius_x: r.read_f32()?,
            radius_y: r.read_f32()?,
        },
        DrawKind::Bitmap => Shape::Bitmap {
            width: r.read_u16()?,
            height: r.read_u16()?,
            resolution_x: r.read_u16()?,
            resolution_y: r.read_u16()?,
        },
    };
    Some(DrawCommand { header, shape })
}
