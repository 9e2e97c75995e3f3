//! # Input Tracking
//!
//! Host side of the input double buffer. Stamps each event with the latent
//! modifier state, the last known pointer position and its time within the
//! frame, and watches for the host's own hotkeys.
//!
//! | Key | Effect |
//! |-----|--------|
//! | F1-F6 | client |
//! | F7 | force a hot-reload next frame |
//! | F8 | log host state next frame |
//!
//! Hotkey events are still delivered to the module.

use std::time::{Duration, Instant};

use hotframe_core::{ActionKey, InputDoubleBuffer, InputEvent, Modifiers, Point, ViewportId};

/// Host hotkeys seen since the last frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Hotkeys {
    /// F7 was pressed.
    pub force_reload: bool,
    /// F8 was pressed.
    pub log_state: bool,
}

/// Records OS input into the double buffer.
pub struct InputTracker {
    buffer: InputDoubleBuffer,
    modifiers: Modifiers,
    cursor: Point,
    has_cursor: bool,
    hotkeys: Hotkeys,
    frame_started: Instant,
    frame_time: Duration,
}

impl InputTracker {
    /// Buffers of `capacity` events; `frame_time` scales event timestamps.
    pub fn new(capacity: usize, frame_time: Duration) -> Self {
        Self {
            buffer: InputDoubleBuffer::new(capacity),
            modifiers: Modifiers::empty(),
            cursor: Point::default(),
            has_cursor: false,
            hotkeys: Hotkeys::default(),
            frame_started: Instant::now(),
            frame_time,
        }
    }

    /// Modifiers currently held.
    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    /// Last known pointer position.
    pub fn cursor(&self) -> Point {
        self.cursor
    }

    fn time_normalized(&self) -> f32 {
        if self.frame_time.is_zero() {
            return 0.0;
        }
        (self.frame_started.elapsed().as_secs_f32() / self.frame_time.as_secs_f32()).min(1.0)
    }

    /// A key or button transition. Returns `false` if the event was dropped.
    pub fn key(&mut self, viewport: ViewportId, key: ActionKey, release: bool) -> bool {
        if let Some(bit) = key.modifier() {
            self.modifiers.set(bit, !release);
        }
        if !release {
            match key {
                ActionKey::F7 => self.hotkeys.force_reload = true,
                ActionKey::F8 => self.hotkeys.log_state = true,
                _ => {}
            }
        }

        let event = InputEvent {
            time_normalized: self.time_normalized(),
            viewport,
            key,
            release,
            modifiers: self.modifiers,
            cursor: self.cursor,
            has_cursor: self.has_cursor,
        };
        self.buffer.record(event)
    }

    /// Pointer moved. Only updates the position stamped on later events.
    pub fn cursor_moved(&mut self, position: Point) {
        self.cursor = position;
        self.has_cursor = true;
    }

    /// Publishes the recorded events as the new frame's snapshot.
    pub fn swap(&mut self) {
        self.buffer.swap();
        self.frame_started = Instant::now();
    }

    /// The current frame's snapshot.
    pub fn front(&self) -> &[InputEvent] {
        self.buffer.front()
    }

    /// Returns and clears the pending hotkeys.
    pub fn take_hotkeys(&mut self) -> Hotkeys {
        std::mem::take(&mut self.hotkeys)
    }
}
