//! # Frame Orchestrator
//!
//! ```text
//! Frame N:
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │ 1. HOT-RELOAD POLL                                                  │
//! │    └─ forced when F7 was pressed during frame N-1                   │
//! │                                                                     │
//! │ 2. SWAP INPUT                                                       │
//! │    └─ events recorded during N-1 become this frame's snapshot       │
//! │                                                                     │
//! │ 3. BEGIN WRITE (every viewport)                                     │
//! │    └─ failure disables that viewport for this frame only            │
//! │                                                                     │
//! │ 4. MODULE FRAME                                                     │
//! │    └─ run_frame(session, request): input in, draw records out       │
//! │                                                                     │
//! │ 5. DRAIN (every viewport)                                           │
//! │    ├─ clear, begin_read, next* -> Renderer, present                 │
//! │    └─ corruption abandons the rest of that buffer                   │
//! │                                                                     │
//! │ 6. END FRAME                                                        │
//! │    ├─ free viewports destroyed during the frame                     │
//! │    └─ zero frame memory                                             │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Single-threaded. Write and read mode of a buffer never overlap.

use std::time::Instant;

use hotframe_core::{Color, Dimensions, MemoryBlock, SessionContext, SessionState, MIN_RECORD_SIZE};
use tracing::{error, info, warn};

use crate::bridge::{self, FrameView};
use crate::config::HostConfig;
use crate::error::HostResult;
use crate::input::InputTracker;
use crate::module::{ModuleBinder, ModuleController, ReloadOutcome};
use crate::render::Renderer;
use crate::viewport::ViewportTable;

/// Upper bound on the delta time handed to the module, in seconds.
pub const MAX_FRAME_DELTA: f32 = 0.1;

/// What happened during one frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Frame number, starting at 1.
    pub frame: u64,
    /// Iteration swapped in at the start of this frame.
    pub reloaded: Option<u32>,
    /// Events handed to the module.
    pub input_events: usize,
    /// Commands drained into the renderer.
    pub records_drawn: u32,
    /// Records the module asked for but that did not fit.
    pub dropped_records: u64,
    /// Buffers abandoned because of corruption.
    pub decode_errors: u32,
    /// Viewports whose buffer refused write mode.
    pub viewports_skipped: u32,
}

/// The host: owns the module, the session and every per-frame channel.
pub struct Host<B: ModuleBinder, R: Renderer> {
    config: HostConfig,
    modules: ModuleController<B>,
    input: InputTracker,
    viewports: ViewportTable,
    session: SessionContext,
    persistent_memory: MemoryBlock,
    frame_memory: MemoryBlock,
    renderer: R,
    clear_color: Color,
    frame_number: u64,
    last_frame: Instant,
}

impl<B: ModuleBinder, R: Renderer> Host<B, R> {
    /// Loads the module and starts the session.
    ///
    /// # Errors
    ///
    /// [`HostError::Config`](crate::HostError::Config) for an invalid
    /// configuration, [`HostError::NoUsableModule`](crate::HostError::NoUsableModule)
    /// if no module could be loaded.
    pub fn start(config: HostConfig, binder: B, renderer: R) -> HostResult<Self> {
        config.validate()?;

        let mut modules = ModuleController::new(binder, config.module.clone());
        modules.load_initial()?;
        modules.api().hello();

        let viewport_size = Dimensions::new(config.viewport.width, config.viewport.height);
        let mut host = Self {
            input: InputTracker::new(config.input.capacity, config.frame.frame_time()),
            viewports: ViewportTable::new(config.viewport.draw_buffer_bytes),
            session: SessionContext::detached(viewport_size),
            persistent_memory: MemoryBlock::new(config.frame.persistent_memory_bytes),
            frame_memory: MemoryBlock::new(config.frame.frame_memory_bytes),
            renderer,
            clear_color: Color(config.viewport.clear_color),
            frame_number: 0,
            last_frame: Instant::now(),
            modules,
            config,
        };

        let api = host.modules.api();
        bridge::with_session(
            &mut host.session,
            host.persistent_memory.as_mut_slice(),
            &mut host.viewports,
            |session| api.start(session),
        );
        host.session.state = SessionState::Running;
        info!(
            iteration = ?host.modules.iteration(),
            viewports = host.viewports.len(),
            "session started"
        );
        Ok(host)
    }

    /// Runs one frame.
    pub fn run_frame(&mut self) -> FrameStats {
        let now = Instant::now();
        let delta = now.duration_since(self.last_frame).as_secs_f32().min(MAX_FRAME_DELTA);
        self.last_frame = now;
        self.frame_number += 1;

        let mut stats = FrameStats { frame: self.frame_number, ..FrameStats::default() };

        // 1. Hot-reload
        let hotkeys = self.input.take_hotkeys();
        if hotkeys.log_state {
            self.log_state();
        }
        if self.config.module.hot_reload || hotkeys.force_reload {
            stats.reloaded = self.reload(hotkeys.force_reload);
        }

        // 2. Input
        self.input.swap();
        stats.input_events = self.input.front().len();

        // 3. Write mode
        stats.viewports_skipped = self.viewports.begin_frame();

        // 4. Module
        let api = self.modules.api();
        let frame = FrameView {
            number: self.frame_number,
            time: delta,
            memory: self.frame_memory.as_mut_slice(),
            events: self.input.front(),
            cursor: self.input.cursor(),
        };
        bridge::with_frame(
            &mut self.session,
            self.persistent_memory.as_mut_slice(),
            &mut self.viewports,
            frame,
            |session, request| api.run_frame(session, request),
        );

        // 5. Drain
        self.drain(&mut stats);

        // 6. End frame
        self.viewports.end_frame();
        self.frame_memory.reset();
        stats.dropped_records = self.viewports.take_dropped_records();
        stats
    }

    fn reload(&mut self, force: bool) -> Option<u32> {
        match self.modules.try_hot_reload(force) {
            ReloadOutcome::Unchanged => None,
            ReloadOutcome::Reloaded(iteration) => Some(iteration),
            ReloadOutcome::Failed(e) => {
                warn!("hot-reload failed: {e}");
                if !self.modules.is_loaded() {
                    if let Err(e) = self.modules.load(None) {
                        error!("base module unavailable, running without a module: {e}");
                    }
                }
                None
            }
        }
    }

    fn drain(&mut self, stats: &mut FrameStats) {
        let clear_color = self.clear_color;
        for viewport in self.viewports.iter_mut() {
            if viewport.is_closing() {
                continue;
            }
            let id = viewport.id();
            self.renderer.clear(id, clear_color);

            let readable = viewport.drawing_enabled() && viewport.draw_buffer().capacity() >= MIN_RECORD_SIZE;
            if readable {
                let buffer = viewport.draw_buffer_mut();
                match buffer.begin_read() {
                    Ok(()) => {
                        for record in buffer.records() {
                            match record {
                                Ok(command) => {
                                    self.renderer.draw(id, &command);
                                    stats.records_drawn += 1;
                                }
                                Err(e) => {
                                    error!(viewport = id, "abandoning draw buffer: {e}");
                                    stats.decode_errors += 1;
                                }
                            }
                        }
                    }
                    Err(e) => {
                        error!(viewport = id, "draw buffer rejected: {e}");
                        stats.decode_errors += 1;
                    }
                }
            }

            self.renderer.present(id);
        }
    }

    fn log_state(&self) {
        let cursor = self.input.cursor();
        info!(
            cursor_x = cursor.x,
            cursor_y = cursor.y,
            iteration = ?self.modules.iteration(),
            origin = ?self.modules.active().origin(),
            viewports = self.viewports.len(),
            frame = self.frame_number,
            "host state"
        );
    }

    /// Ends the session. Safe to call more than once.
    pub fn shutdown(&mut self) {
        if self.session.state == SessionState::Ended {
            return;
        }
        if self.modules.is_loaded() {
            let api = self.modules.api();
            bridge::with_session(
                &mut self.session,
                self.persistent_memory.as_mut_slice(),
                &mut self.viewports,
                |session| api.shutdown(session),
            );
        }
        self.session.state = SessionState::Ended;
        self.modules.shutdown();
        self.viewports.clear();
        info!(frames = self.frame_number, "session ended");
    }

    /// Configuration in use.
    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    /// The module controller.
    pub fn modules(&self) -> &ModuleController<B> {
        &self.modules
    }

    /// Input recorder. Events recorded here reach the module in the next [`run_frame`](Self::run_frame).
    pub fn input_mut(&mut self) -> &mut InputTracker {
        &mut self.input
    }

    /// Live viewports.
    pub fn viewports(&self) -> &ViewportTable {
        &self.viewports
    }

    /// The renderer.
    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// The renderer, writable.
    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    /// Session lifecycle state.
    pub fn session_state(&self) -> SessionState {
        self.session.state
    }

    /// Frames run so far.
    pub fn frame_number(&self) -> u64 {
        self.frame_number
    }
}

impl<B: ModuleBinder, R: Renderer> Drop for Host<B, R> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
