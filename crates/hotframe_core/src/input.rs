//! # Frame Input
//!
//! Input events and the double buffer that hands each frame a consistent
//! snapshot of them.
//!
//! ## Architecture
//!
//! ```text
//!   OS events ──record()──> ┌──────────┐   swap()   ┌──────────┐
//!                           │   back   │ ─────────> │  front   │ ──> module
//!                           └──────────┘  (index^1) └──────────┘
//!                                 ▲                      │
//!                                 └── cleared after swap ┘
//! ```
//!
//! Single writer, single reader, one swap per frame boundary.

use bitflags::bitflags;
use bytemuck::{Pod, Zeroable};
use tracing::trace;

/// Viewport identifier handed out by the host.
pub type ViewportId = u8;

/// Returned by viewport allocation when no viewport could be created.
pub const VIEWPORT_ERROR_ID: ViewportId = u8::MAX;

/// Logical key or button. `None` marks an uninitialized event.
#[repr(u8)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum ActionKey {
    #[default]
    None = 0,
    Num0,
    Num1,
    Num2,
    Num3,
    Num4,
    Num5,
    Num6,
    Num7,
    Num8,
    Num9,
    A,
    B,
    C,
    D,
    E,
    F,
    G,
    H,
    I,
    J,
    K,
    L,
    M,
    N,
    O,
    P,
    Q,
    R,
    S,
    T,
    U,
    V,
    W,
    X,
    Y,
    Z,
    F1,
    F2,
    F3,
    F4,
    F5,
    F6,
    F7,
    F8,
    F9,
    F10,
    F11,
    F12,
    ArrowLeft,
    ArrowUp,
    ArrowRight,
    ArrowDown,
    Space,
    Ctrl,
    Shift,
    Alt,
    MouseLeft,
    MouseRight,
    MouseMiddle,
}

impl ActionKey {
    const ALL: [Self; 60] = [
        Self::None,
        Self::Num0,
        Self::Num1,
        Self::Num2,
        Self::Num3,
        Self::Num4,
        Self::Num5,
        Self::Num6,
        Self::Num7,
        Self::Num8,
        Self::Num9,
        Self::A,
        Self::B,
        Self::C,
        Self::D,
        Self::E,
        Self::F,
        Self::G,
        Self::H,
        Self::I,
        Self::J,
        Self::K,
        Self::L,
        Self::M,
        Self::N,
        Self::O,
        Self::P,
        Self::Q,
        Self::R,
        Self::S,
        Self::T,
        Self::U,
        Self::V,
        Self::W,
        Self::X,
        Self::Y,
        Self::Z,
        Self::F1,
        Self::F2,
        Self::F3,
        Self::F4,
        Self::F5,
        Self::F6,
        Self::F7,
        Self::F8,
        Self::F9,
        Self::F10,
        Self::F11,
        Self::F12,
        Self::ArrowLeft,
        Self::ArrowUp,
        Self::ArrowRight,
        Self::ArrowDown,
        Self::Space,
        Self::Ctrl,
        Self::Shift,
        Self::Alt,
        Self::MouseLeft,
        Self::MouseRight,
        Self::MouseMiddle,
    ];

    /// Decodes a raw key value.
    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        Self::ALL.get(usize::from(value)).copied()
    }

    /// Digit key `0..=9`.
    #[must_use]
    pub fn digit(n: u8) -> Option<Self> {
        if n > 9 {
            return None;
        }
        Self::from_u8(Self::Num0 as u8 + n)
    }

    /// Letter key, case-insensitive.
    #[must_use]
    pub fn letter(c: char) -> Option<Self> {
        let c = c.to_ascii_uppercase();
        if !c.is_ascii_uppercase() {
            return None;
        }
        Self::from_u8(Self::A as u8 + (c as u8 - b'A'))
    }

    /// Function key `F1..=F12`.
    #[must_use]
    pub fn function(n: u8) -> Option<Self> {
        if !(1..=12).contains(&n) {
            return None;
        }
        Self::from_u8(Self::F1 as u8 + n - 1)
    }

    /// Modifier bit carried by this key, if it is a modifier.
    #[must_use]
    pub const fn modifier(self) -> Option<Modifiers> {
        match self {
            Self::Ctrl => Some(Modifiers::CTRL),
            Self::Shift => Some(Modifiers::SHIFT),
            Self::Alt => Some(Modifiers::ALT),
            _ => None,
        }
    }
}

bitflags! {
    /// Modifier keys held when an event was recorded.
    #[repr(transparent)]
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Modifiers: u8 {
        /// Control.
        const CTRL = 1;
        /// Shift.
        const SHIFT = 1 << 1;
        /// Alt.
        const ALT = 1 << 2;
    }
}

/// Pixel position inside a viewport.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct Point {
    /// Horizontal position.
    pub x: u16,
    /// Vertical position.
    pub y: u16,
}

impl Point {
    /// Creates a point.
    #[must_use]
    pub const fn new(x: u16, y: u16) -> Self {
        Self { x, y }
    }
}

/// One key or button transition.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InputEvent {
    /// Position within the frame, `0.0` at frame start and `1.0` at its end.
    pub time_normalized: f32,
    /// Viewport that had focus.
    pub viewport: ViewportId,
    /// Key or button.
    pub key: ActionKey,
    /// `true` for a release, `false` for a press.
    pub release: bool,
    /// Modifiers held at the time.
    pub modifiers: Modifiers,
    /// Pointer position, meaningful when `has_cursor` is set.
    pub cursor: Point,
    /// Whether `cursor` carries a position.
    pub has_cursor: bool,
}

impl InputEvent {
    /// The zeroed, invalid event.
    pub const NONE: Self = Self {
        time_normalized: 0.0,
        viewport: 0,
        key: ActionKey::None,
        release: false,
        modifiers: Modifiers::empty(),
        cursor: Point { x: 0, y: 0 },
        has_cursor: false,
    };

    /// A key press in `viewport`.
    #[must_use]
    pub const fn press(viewport: ViewportId, key: ActionKey) -> Self {
        Self { viewport, key, ..Self::NONE }
    }

    /// A key release in `viewport`.
    #[must_use]
    pub const fn release(viewport: ViewportId, key: ActionKey) -> Self {
        Self { viewport, key, release: true, ..Self::NONE }
    }

    /// Attaches a pointer position.
    #[must_use]
    pub const fn with_cursor(mut self, cursor: Point) -> Self {
        self.cursor = cursor;
        self.has_cursor = true;
        self
    }

    /// Events with `ActionKey::None` are never surfaced.
    #[inline]
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.key != ActionKey::None
    }
}

impl Default for InputEvent {
    fn default() -> Self {
        Self::NONE
    }
}

/// Two fixed-capacity event arrays with a front/back designation.
///
/// The back buffer receives events; the front buffer is the snapshot the
/// current frame reads.
pub struct InputDoubleBuffer {
    buffers: [Box<[InputEvent]>; 2],
    counts: [usize; 2],
    /// Index of the back (write) buffer. Front is always `back_index ^ 1`.
    back_index: usize,
    frame_count: u64,
}

impl InputDoubleBuffer {
    /// Creates both buffers with room for `capacity` events each.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            buffers: [
                vec![InputEvent::NONE; capacity].into_boxed_slice(),
                vec![InputEvent::NONE; capacity].into_boxed_slice(),
            ],
            counts: [0, 0],
            back_index: 0,
            frame_count: 0,
        }
    }

    /// Events each buffer can hold.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.buffers[0].len()
    }

    /// Index of the current back buffer (0 or 1).
    #[inline]
    #[must_use]
    pub const fn back_index(&self) -> usize {
        self.back_index
    }

    /// Number of swaps performed.
    #[inline]
    #[must_use]
    pub const fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Events recorded since the last swap.
    #[inline]
    #[must_use]
    pub fn back_len(&self) -> usize {
        self.counts[self.back_index]
    }

    /// Appends to the back buffer.
    ///
    /// Returns `false` if the event was dropped: either it carries no key or
    /// the buffer is full.
    pub fn record(&mut self, event: InputEvent) -> bool {
        if !event.is_valid() {
            return false;
        }
        let back = self.back_index;
        let count = self.counts[back];
        if count >= self.buffers[back].len() {
            trace!(capacity = count, "input buffer full, dropping event");
            return false;
        }
        self.buffers[back][count] = event;
        self.counts[back] = count + 1;
        true
    }

    /// Exchanges front and back, then clears the new back buffer.
    pub fn swap(&mut self) {
        self.back_index ^= 1;
        let back = self.back_index;
        self.buffers[back].fill(InputEvent::NONE);
        self.counts[back] = 0;
        self.frame_count += 1;
    }

    /// The snapshot handed to the current frame.
    #[must_use]
    pub fn front(&self) -> &[InputEvent] {
        let front = self.back_index ^ 1;
        &self.buffers[front][..self.counts[front]]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_helpers() {
        assert_eq!(ActionKey::digit(0), Some(ActionKey::Num0));
        assert_eq!(ActionKey::digit(9), Some(ActionKey::Num9));
        assert_eq!(ActionKey::digit(10), None);
        assert_eq!(ActionKey::letter('q'), Some(ActionKey::Q));
        assert_eq!(ActionKey::letter('1'), None);
        assert_eq!(ActionKey::function(7), Some(ActionKey::F7));
        assert_eq!(ActionKey::function(13), None);
        assert_eq!(ActionKey::from_u8(ActionKey::MouseMiddle as u8), Some(ActionKey::MouseMiddle));
        assert_eq!(ActionKey::from_u8(200), None);
    }

    #[test]
    fn test_swap_publishes_recorded_events() {
        let mut input = InputDoubleBuffer::new(4);
        input.record(InputEvent::press(0, ActionKey::A));
        input.record(InputEvent::release(0, ActionKey::A));
        assert!(input.front().is_empty());

        input.swap();
        assert_eq!(input.front().len(), 2);
        assert_eq!(input.front()[0].key, ActionKey::A);
        assert!(input.front()[1].release);
        assert_eq!(input.back_len(), 0);
    }

    #[test]
    fn test_double_swap_restores_assignment() {
        let mut input = InputDoubleBuffer::new(4);
        let original = input.back_index();
        input.record(InputEvent::press(0, ActionKey::Space));

        input.swap();
        input.record(InputEvent::press(0, ActionKey::B));
        input.swap();

        assert_eq!(input.back_index(), original);
        assert_eq!(input.back_len(), 0);
        assert_eq!(input.front().len(), 1);
        assert_eq!(input.front()[0].key, ActionKey::B);
        assert_eq!(input.frame_count(), 2);
    }

    #[test]
    fn test_full_buffer_drops_silently() {
        let mut input = InputDoubleBuffer::new(2);
        assert!(input.record(InputEvent::press(0, ActionKey::A)));
        assert!(input.record(InputEvent::press(0, ActionKey::B)));
        assert!(!input.record(InputEvent::press(0, ActionKey::C)));
        input.swap();
        assert_eq!(input.front().len(), 2);
    }

    #[test]
    fn test_none_key_is_never_recorded() {
        let mut input = InputDoubleBuffer::new(2);
        assert!(!input.record(InputEvent::NONE));
        input.swap();
        assert!(input.front().is_empty());
    }
}
