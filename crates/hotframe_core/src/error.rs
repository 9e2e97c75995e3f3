//! # Wire Buffer Error Types
//!
//! All errors that can occur while writing or reading a draw-command buffer.

use thiserror::Error;

use crate::draw::DrawKind;

/// Errors that can occur in the wire buffer codec.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WireError {
    /// The buffer has no backing region.
    #[error("draw buffer has no backing region")]
    Detached,

    /// The backing region cannot hold even the smallest record.
    #[error("draw buffer of {capacity} bytes is smaller than the minimum record size of {minimum} bytes")]
    Undersized {
        /// Capacity of the region in bytes.
        capacity: usize,
        /// Smallest encoded record size.
        minimum: usize,
    },

    /// Not enough room left for the requested record.
    #[error("out of space: {kind:?} record needs {required} bytes, {available} available")]
    OutOfSpace {
        /// The kind that was requested.
        kind: DrawKind,
        /// Encoded size of that kind.
        required: usize,
        /// Bytes left before the end of the region.
        available: usize,
    },

    /// A tag byte that maps to no known kind. The buffer is corrupt.
    #[error("unrecognized draw tag {tag} at offset {offset}")]
    UnknownTag {
        /// Byte offset of the tag.
        offset: usize,
        /// The raw tag value.
        tag: u8,
    },

    /// The tag declares more bytes than remain in the region.
    #[error("truncated {kind:?} record at offset {offset}: needs {required} bytes, {available} available")]
    Truncated {
        /// Byte offset of the record.
        offset: usize,
        /// Kind declared by the tag.
        kind: DrawKind,
        /// Encoded size of that kind.
        required: usize,
        /// Bytes left before the end of the region.
        available: usize,
    },

    /// A shape was written into a slot reserved for another kind.
    #[error("slot reserved for {expected:?} cannot hold a {actual:?} shape")]
    KindMismatch {
        /// Kind the slot was reserved for.
        expected: DrawKind,
        /// Kind of the shape supplied.
        actual: DrawKind,
    },

    /// The buffer is not in the mode the operation requires.
    #[error("draw buffer is not in {0} mode")]
    WrongMode(&'static str),
}

/// Result type for wire buffer operations.
pub type WireResult<T> = Result<T, WireError>;
