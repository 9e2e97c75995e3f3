//! # Frame Loop Tests
//!
//! The demo client driven end to end through the host: input in, draw
//! commands out, viewports created and destroyed through the platform table.

mod common;

use common::{demo_entries, Deployment, StaticBinder};
use hotframe_core::{
    ActionKey, Color, Dimensions, DrawCommand, DrawHeader, DrawKind, FrameRequest, Point,
    SessionContext, SessionState, Shape,
};
use hotframe_host::{CommandLog, EntryPoints, Host, HostError, RenderOp};

fn start_demo(deployment: &Deployment) -> Host<StaticBinder, CommandLog> {
    deployment.write_base("demo", 1_000);
    Host::start(
        deployment.config.clone(),
        StaticBinder { entries: demo_entries() },
        CommandLog::new(),
    )
    .unwrap()
}

fn rectangles(log: &CommandLog) -> Vec<DrawHeader> {
    log.commands()
        .filter(|(_, c)| c.kind() == DrawKind::Rectangle)
        .map(|(_, c)| c.header)
        .collect()
}

#[test]
fn test_start_creates_viewport() {
    let deployment = Deployment::new();
    let host = start_demo(&deployment);

    assert_eq!(host.session_state(), SessionState::Running);
    assert_eq!(host.viewports().len(), 1);
    let viewport = host.viewports().get(0).unwrap();
    assert_eq!(viewport.name(), client::VIEWPORT_NAME);
    assert_eq!(viewport.dimensions(), Dimensions::new(800, 600));
}

#[test]
fn test_frame_draws_in_order() {
    let deployment = Deployment::new();
    let mut host = start_demo(&deployment);

    let stats = host.run_frame();
    assert_eq!(stats.frame, 1);
    assert_eq!(stats.records_drawn, 2);
    assert_eq!(stats.decode_errors, 0);

    let ops = host.renderer().ops();
    assert_eq!(ops.len(), 4);
    assert_eq!(ops[0], RenderOp::Clear { viewport: 0, color: Color::BLACK });
    assert!(matches!(
        ops[1],
        RenderOp::Draw { viewport: 0, command: DrawCommand { header: DrawHeader { x: 400, y: 300, .. }, shape: Shape::Rectangle { width: 50, height: 20 } } }
    ));
    assert!(matches!(ops[2], RenderOp::Draw { command: DrawCommand { shape: Shape::Ellipse { .. }, .. }, .. }));
    assert_eq!(ops[3], RenderOp::Present { viewport: 0 });
}

#[test]
fn test_input_recorded_between_frames_reaches_module() {
    let deployment = Deployment::new();
    let mut host = start_demo(&deployment);

    host.input_mut().key(0, ActionKey::ArrowRight, false);
    host.input_mut().key(0, ActionKey::ArrowRight, true);
    host.input_mut().key(0, ActionKey::ArrowDown, false);
    let stats = host.run_frame();
    assert_eq!(stats.input_events, 3);

    let boxes = rectangles(host.renderer());
    assert_eq!((boxes[0].x, boxes[0].y), (400 + client::STEP, 300 + client::STEP));

    // The snapshot is consumed; nothing new was recorded.
    let stats = host.run_frame();
    assert_eq!(stats.input_events, 0);
    let boxes = rectangles(host.renderer());
    assert_eq!((boxes[1].x, boxes[1].y), (410, 310));
}

#[test]
fn test_click_pins_line_to_cursor() {
    let deployment = Deployment::new();
    let mut host = start_demo(&deployment);

    host.input_mut().cursor_moved(Point::new(123, 45));
    host.input_mut().key(0, ActionKey::MouseLeft, false);
    let stats = host.run_frame();
    assert_eq!(stats.records_drawn, 3);

    let line = host
        .renderer()
        .commands()
        .find_map(|(_, c)| match c.shape {
            Shape::Line { dest_x, dest_y, .. } => Some((dest_x, dest_y)),
            _ => None,
        });
    assert_eq!(line, Some((123, 45)));
}

#[test]
fn test_small_draw_buffer_drops_calls_not_frames() {
    let mut deployment = Deployment::new();
    deployment.config.viewport.draw_buffer_bytes = DrawKind::Rectangle.encoded_size() + 4;
    let mut host = start_demo(&deployment);

    let stats = host.run_frame();
    assert_eq!(stats.records_drawn, 1);
    assert_eq!(stats.dropped_records, 1);
    assert_eq!(stats.decode_errors, 0);

    let stats = host.run_frame();
    assert_eq!(stats.records_drawn, 1);
}

#[test]
fn test_no_usable_module_is_fatal() {
    let deployment = Deployment::new();
    deployment.write_base("missing:run_frame", 1_000);
    let result = Host::start(
        deployment.config.clone(),
        StaticBinder { entries: demo_entries() },
        CommandLog::new(),
    );
    assert!(matches!(result, Err(HostError::NoUsableModule { .. })));
}

#[test]
fn test_invalid_config_is_rejected() {
    let mut deployment = Deployment::new();
    deployment.config.input.capacity = 0;
    deployment.write_base("demo", 1_000);
    let result = Host::start(
        deployment.config.clone(),
        StaticBinder { entries: demo_entries() },
        CommandLog::new(),
    );
    assert!(matches!(result, Err(HostError::Config(_))));
}

#[test]
fn test_shutdown_releases_everything() {
    let deployment = Deployment::new();
    let mut host = start_demo(&deployment);
    host.run_frame();
    assert!(deployment.config.module.working_dir.is_dir());

    host.shutdown();
    assert_eq!(host.session_state(), SessionState::Ended);
    assert!(host.viewports().is_empty());
    assert!(!host.modules().is_loaded());
    assert!(!deployment.config.module.working_dir.exists());

    // A second call is a no-op.
    host.shutdown();
}

// =============================================================================
// Hand-written modules for edge cases
// =============================================================================

extern "C" fn noop_hello() {}

extern "C" fn open_main(ctx: &mut SessionContext) {
    let size = ctx.viewport_size;
    ctx.allocate_viewport("main", size);
}

extern "C" fn noop_shutdown(_: &mut SessionContext) {}

extern "C" fn write_corrupt_record(_: &mut SessionContext, request: &mut FrameRequest) {
    if let Some(slot) = request.new_record(0, DrawKind::Rectangle) {
        slot.into_bytes()[0] = 200;
    }
}

extern "C" fn draw_then_close(ctx: &mut SessionContext, request: &mut FrameRequest) {
    request.draw(0, &DrawCommand::rectangle(DrawHeader::at(1, 1, Color::WHITE), 2, 2));
    ctx.destroy_viewport(0);
    // Refused: the viewport is closing.
    request.draw(0, &DrawCommand::rectangle(DrawHeader::at(3, 3, Color::WHITE), 2, 2));
}

fn start_custom(deployment: &Deployment, run_frame: hotframe_core::abi::RunFrameFn) -> Host<StaticBinder, CommandLog> {
    deployment.write_base("custom", 1_000);
    let entries = EntryPoints::new(noop_hello, open_main, run_frame, noop_shutdown);
    Host::start(deployment.config.clone(), StaticBinder { entries }, CommandLog::new()).unwrap()
}

#[test]
fn test_corrupt_buffer_leaves_viewport_cleared() {
    let deployment = Deployment::new();
    let mut host = start_custom(&deployment, write_corrupt_record);

    let stats = host.run_frame();
    assert_eq!(stats.decode_errors, 1);
    assert_eq!(stats.records_drawn, 0);
    assert_eq!(
        host.renderer().ops(),
        &[
            RenderOp::Clear { viewport: 0, color: Color::BLACK },
            RenderOp::Present { viewport: 0 },
        ]
    );

    // The next frame starts from a clean buffer.
    let stats = host.run_frame();
    assert_eq!(stats.decode_errors, 1);
    assert_eq!(host.viewports().len(), 1);
}

#[test]
fn test_destroy_during_frame_takes_effect_at_frame_end() {
    let deployment = Deployment::new();
    let mut host = start_custom(&deployment, draw_then_close);

    let stats = host.run_frame();
    assert_eq!(stats.records_drawn, 0);
    assert!(host.viewports().is_empty());
    assert!(host.renderer().ops().is_empty());

    // Later frames run against an empty table.
    let stats = host.run_frame();
    assert_eq!(stats.frame, 2);
    assert_eq!(stats.dropped_records, 0);
    assert!(host.renderer().ops().is_empty());
}
