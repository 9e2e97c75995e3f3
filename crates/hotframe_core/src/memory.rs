//! # Memory Regions
//!
//! The host hands the module two raw byte regions: a persistent one that
//! lives for the whole session and a frame-scoped one that is zeroed after
//! every frame. [`MemoryBlock`] owns a region on the host side;
//! [`FrameArena`] carves typed values out of a borrowed region on the
//! module side.
//!
//! All memory is allocated once at startup. Nothing here allocates per frame.

use std::mem;

use bytemuck::Pod;

/// A zero-initialized, fixed-size byte region owned by the host.
pub struct MemoryBlock {
    storage: Box<[u8]>,
}

impl MemoryBlock {
    /// Allocates `size` zeroed bytes.
    #[must_use]
    pub fn new(size: usize) -> Self {
        Self {
            storage: vec![0u8; size].into_boxed_slice(),
        }
    }

    /// Size in bytes.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    /// Whether the region has zero size.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    /// The region, writable.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.storage
    }

    /// Zeroes the whole region.
    pub fn reset(&mut self) {
        self.storage.fill(0);
    }
}

/// A bump allocator over a borrowed byte region.
///
/// Allocation order is deterministic, so a module that carves the same
/// sequence of values out of the persistent region every frame gets the
/// same addresses back.
///
/// # Example
///
/// ```rust,ignore
/// let mut arena = FrameArena::new(ctx.persistent_memory());
/// let state: &mut GameState = arena.alloc_one()?;
/// let trail: &mut [Point] = arena.alloc_slice(64)?;
/// ```
pub struct FrameArena<'a> {
    remaining: &'a mut [u8],
    used: usize,
    capacity: usize,
}

impl<'a> FrameArena<'a> {
    /// Wraps `region`. Nothing is zeroed here; the host hands regions over zeroed.
    #[must_use]
    pub fn new(region: &'a mut [u8]) -> Self {
        let capacity = region.len();
        Self {
            remaining: region,
            used: 0,
            capacity,
        }
    }

    /// Total capacity in bytes.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes consumed so far, alignment padding included.
    #[inline]
    #[must_use]
    pub const fn used(&self) -> usize {
        self.used
    }

    /// Bytes still available before alignment.
    #[inline]
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.remaining.len()
    }

    /// Carves out `count` values of `T`, aligned for `T`.
    ///
    /// Returns `None` when the region cannot fit them.
    pub fn alloc_slice<T: Pod>(&mut self, count: usize) -> Option<&'a mut [T]> {
        let padding = self.remaining.as_ptr().align_offset(mem::align_of::<T>());
        let size = mem::size_of::<T>().checked_mul(count)?;
        let total = padding.checked_add(size)?;
        if total > self.remaining.len() {
            return None;
        }

        let region = mem::take(&mut self.remaining);
        let (head, tail) = region.split_at_mut(total);
        let (_, body) = head.split_at_mut(padding);
        self.remaining = tail;
        self.used += total;

        bytemuck::try_cast_slice_mut(body).ok()
    }

    /// Carves out a single `T`.
    pub fn alloc_one<T: Pod>(&mut self) -> Option<&'a mut T> {
        self.alloc_slice::<T>(1)?.first_mut()
    }
}
