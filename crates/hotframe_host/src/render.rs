//! # Rendering Collaborator
//!
//! The host drains every viewport's draw buffer into a [`Renderer`] once per
//! frame. Rasterization and presentation live behind this trait.

use hotframe_core::{Color, DrawCommand, ViewportId};
use tracing::trace;

/// Receives decoded draw commands.
pub trait Renderer {
    /// Fills `viewport` with `color` before any command is drawn.
    fn clear(&mut self, viewport: ViewportId, color: Color);

    /// Draws one command.
    fn draw(&mut self, viewport: ViewportId, command: &DrawCommand);

    /// Shows the finished frame.
    fn present(&mut self, _viewport: ViewportId) {}
}

/// One call the renderer received.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RenderOp {
    /// `clear`
    Clear {
        /// Target.
        viewport: ViewportId,
        /// Fill color.
        color: Color,
    },
    /// `draw`
    Draw {
        /// Target.
        viewport: ViewportId,
        /// The command.
        command: DrawCommand,
    },
    /// `present`
    Present {
        /// Target.
        viewport: ViewportId,
    },
}

/// A renderer that records every call.
#[derive(Debug, Default)]
pub struct CommandLog {
    ops: Vec<RenderOp>,
}

impl CommandLog {
    /// Empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything recorded so far.
    pub fn ops(&self) -> &[RenderOp] {
        &self.ops
    }

    /// Commands drawn so far, in order.
    pub fn commands(&self) -> impl Iterator<Item = (ViewportId, &DrawCommand)> {
        self.ops.iter().filter_map(|op| match op {
            RenderOp::Draw { viewport, command } => Some((*viewport, command)),
            _ => None,
        })
    }

    /// Takes the recorded calls, leaving the log empty.
    pub fn drain(&mut self) -> Vec<RenderOp> {
        std::mem::take(&mut self.ops)
    }
}

impl Renderer for CommandLog {
    fn clear(&mut self, viewport: ViewportId, color: Color) {
        self.ops.push(RenderOp::Clear { viewport, color });
    }

    fn draw(&mut self, viewport: ViewportId, command: &DrawCommand) {
        trace!(viewport, ?command, "draw");
        self.ops.push(RenderOp::Draw { viewport, command: *command });
    }

    fn present(&mut self, viewport: ViewportId) {
        self.ops.push(RenderOp::Present { viewport });
    }
}
