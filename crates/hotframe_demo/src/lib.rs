//! # Hotframe Demo Client
//!
//! A minimal client module. Arrow keys move a box, a left click pins a line
//! from the box to the click point, space clears it, and an ellipse follows
//! the pointer.
//!
//! All state lives in the session's persistent region, so it survives a
//! hot-reload of this module.

#![allow(unsafe_code)]

use bytemuck::{Pod, Zeroable};
use hotframe_core::{
    ActionKey, Color, Dimensions, DrawCommand, DrawHeader, FrameArena, FrameRequest,
    SessionContext, ViewportId, VIEWPORT_ERROR_ID,
};

/// Module version printed by [`hello`].
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Name of the viewport created in [`start`].
pub const VIEWPORT_NAME: &str = "Hotframe Demo";

/// Pixels moved per arrow key press.
pub const STEP: u16 = 10;

/// Size of the box.
pub const BOX_SIZE: Dimensions = Dimensions::new(50, 20);

const BOX_COLOR: Color = Color::rgba(0, 255, 0, 255);
const POINTER_COLOR: Color = Color::rgba(255, 200, 0, 255);

/// Client state kept at the start of the persistent region.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct DemoState {
    /// Non-zero once `start` ran.
    pub initialized: u32,
    /// Viewport id, or `VIEWPORT_ERROR_ID`.
    pub viewport: u32,
    /// Box origin x.
    pub box_x: u16,
    /// Box origin y.
    pub box_y: u16,
    /// Pinned line end x.
    pub target_x: u16,
    /// Pinned line end y.
    pub target_y: u16,
    /// Non-zero while a line is pinned.
    pub has_target: u32,
    /// Frames seen.
    pub frames: u32,
}

impl DemoState {
    fn viewport(&self) -> Option<ViewportId> {
        ViewportId::try_from(self.viewport)
            .ok()
            .filter(|&id| id != VIEWPORT_ERROR_ID)
    }
}

fn state(ctx: &mut SessionContext) -> Option<&mut DemoState> {
    FrameArena::new(ctx.persistent_memory()).alloc_one()
}

/// Diagnostic entry point.
#[no_mangle]
pub extern "C" fn hello() {
    println!("hotframe demo client v{VERSION}");
}

/// Creates the viewport and initializes state.
#[no_mangle]
pub extern "C" fn start(ctx: &mut SessionContext) {
    let size = ctx.viewport_size;
    let viewport = ctx.allocate_viewport(VIEWPORT_NAME, size);
    let Some(state) = state(ctx) else {
        return;
    };

    *state = DemoState {
        initialized: 1,
        viewport: u32::from(viewport.unwrap_or(VIEWPORT_ERROR_ID)),
        box_x: size.width / 2,
        box_y: size.height / 2,
        ..DemoState::default()
    };
}

/// Applies this frame's input and draws the scene.
#[no_mangle]
pub extern "C" fn run_frame(ctx: &mut SessionContext, request: &mut FrameRequest) {
    let bounds = ctx.viewport_size;
    let Some(state) = state(ctx) else {
        return;
    };
    if state.initialized == 0 {
        return;
    }
    let Some(viewport) = state.viewport() else {
        return;
    };

    for event in request.events() {
        if event.release || event.viewport != viewport {
            continue;
        }
        match event.key {
            ActionKey::ArrowLeft => state.box_x = state.box_x.saturating_sub(STEP),
            ActionKey::ArrowRight => {
                state.box_x = state.box_x.saturating_add(STEP).min(bounds.width.saturating_sub(BOX_SIZE.width));
            }
            ActionKey::ArrowUp => state.box_y = state.box_y.saturating_sub(STEP),
            ActionKey::ArrowDown => {
                state.box_y = state.box_y.saturating_add(STEP).min(bounds.height.saturating_sub(BOX_SIZE.height));
            }
            ActionKey::MouseLeft if event.has_cursor => {
                state.target_x = event.cursor.x;
                state.target_y = event.cursor.y;
                state.has_target = 1;
            }
            ActionKey::Space => state.has_target = 0,
            _ => {}
        }
    }
    state.frames = state.frames.wrapping_add(1);

    let origin = DrawHeader::at(state.box_x, state.box_y, BOX_COLOR);
    request.draw(viewport, &DrawCommand::rectangle(origin, BOX_SIZE.width, BOX_SIZE.height));

    if state.has_target != 0 {
        let header = DrawHeader { color: Color::WHITE, ..origin };
        request.draw(viewport, &DrawCommand::line(header, state.target_x, state.target_y, 2));
    }

    let pointer = DrawHeader {
        x: request.cursor.x,
        y: request.cursor.y,
        rotation: (state.frames % 360) as u16,
        color: POINTER_COLOR,
    };
    request.draw(viewport, &DrawCommand::ellipse(pointer, 8.0, 4.0));
}

/// Releases the viewport.
#[cfg_attr(not(feature = "without-shutdown"), no_mangle)]
pub extern "C" fn shutdown(ctx: &mut SessionContext) {
    let Some(state) = state(ctx) else {
        return;
    };
    let viewport = state.viewport();
    state.initialized = 0;
    if let Some(viewport) = viewport {
        ctx.destroy_viewport(viewport);
    }
}
