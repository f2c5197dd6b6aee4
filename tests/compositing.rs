//! Whole frames through the engine, checked on a terminal model.

mod common;

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use common::Screen;
use spark_compositor::{
    BorderStyle, Engine, EngineConfig, Error, FrameOutcome, Insets, NodeId, NodeSpec, PaintContext, Panel, Renderable,
    Result, Rgba, TextBlock,
};

fn engine(width: u16, height: u16) -> Engine<Vec<u8>> {
    let config = EngineConfig::default().with_synchronized_output(false);
    Engine::new(Vec::new(), width, height, config)
}

/// Replay whatever the engine wrote since `mark`; return the new mark.
fn replay_since(screen: &mut Screen, engine: &Engine<Vec<u8>>, mark: usize) -> usize {
    screen.replay(&engine.output()[mark..]);
    engine.output().len()
}

#[test]
fn test_overlapping_panels_follow_z_order() {
    let mut engine = engine(8, 2);
    let root = NodeId::root();
    engine
        .add_node(&root, NodeSpec::new("top", Panel::new(Rgba::BLUE)).at(2, 0, 4, 2).with_z_index(1))
        .unwrap();
    engine.add_node(&root, NodeSpec::new("bottom", Panel::new(Rgba::RED)).at(0, 0, 4, 2)).unwrap();

    let mut screen = Screen::new(8, 2);
    engine.tick(Instant::now()).unwrap();
    replay_since(&mut screen, &engine, 0);

    assert_eq!(screen.cell(0, 0).style.bg, Rgba::RED);
    assert_eq!(screen.cell(1, 1).style.bg, Rgba::RED);
    assert_eq!(screen.cell(2, 0).style.bg, Rgba::BLUE);
    assert_eq!(screen.cell(5, 1).style.bg, Rgba::BLUE);
    assert_eq!(screen.cell(6, 0).style.bg, Rgba::TERMINAL_DEFAULT);
}

#[test]
fn test_bordered_panel_with_text() {
    let mut engine = engine(10, 3);
    let root = NodeId::root();
    let card = engine
        .add_node(
            &root,
            NodeSpec::new("card", Panel::transparent().with_border(BorderStyle::Single, Rgba::WHITE))
                .at(0, 0, 10, 3)
                .with_insets(Insets::all(1)),
        )
        .unwrap();
    engine
        .add_node(&card, NodeSpec::new("label", TextBlock::new("title text")).at(1, 1, 8, 1))
        .unwrap();

    let mut screen = Screen::new(10, 3);
    engine.tick(Instant::now()).unwrap();
    replay_since(&mut screen, &engine, 0);

    assert_eq!(screen.row_text(0), "┌────────┐");
    assert_eq!(screen.row_text(1), "│title te│");
    assert_eq!(screen.row_text(2), "└────────┘");
}

#[test]
fn test_moving_a_node_repaints_only_the_difference() {
    let mut engine = engine(12, 1);
    let root = NodeId::root();
    let label = engine.add_node(&root, NodeSpec::new("t", TextBlock::new("abc")).at(0, 0, 3, 1)).unwrap();

    let mut screen = Screen::new(12, 1);
    let start = Instant::now();
    engine.tick(start).unwrap();
    let mark = replay_since(&mut screen, &engine, 0);

    engine.tree_mut().set_position(&label, 5, 0);
    let outcome = engine.tick(start + Duration::from_secs(1)).unwrap();
    let FrameOutcome::Rendered(diff) = outcome else {
        panic!("expected a frame, got {outcome:?}");
    };
    assert!(!diff.full);
    assert_eq!(diff.cells_written, 6);

    replay_since(&mut screen, &engine, mark);
    assert_eq!(screen.row_text(0), "     abc    ");
}

#[test]
fn test_resize_redraws_every_cell() {
    let mut engine = engine(80, 24);
    let root = NodeId::root();
    engine
        .add_node(&root, NodeSpec::new("status", TextBlock::new("ready")).at(0, 0, 5, 1))
        .unwrap();

    let start = Instant::now();
    engine.tick(start).unwrap();
    let mark = engine.output().len();

    engine.resize(100, 30);
    let outcome = engine.tick(start + Duration::from_secs(1)).unwrap();
    assert!(matches!(outcome, FrameOutcome::Rendered(d) if d.full && d.cells_written == 3000));

    let mut screen = Screen::new(100, 30);
    replay_since(&mut screen, &engine, mark);
    assert!(screen.row_text(0).starts_with("ready "));
    assert_eq!(screen.row_text(29), " ".repeat(100));
}

struct Gate {
    open: Rc<Cell<bool>>,
}

impl Renderable for Gate {
    fn paint(&self, ctx: &mut PaintContext<'_>) -> Result<()> {
        if !self.open.get() {
            return Err(Error::paint(ctx.node, "gate closed"));
        }
        ctx.fill(Rgba::GREEN);
        Ok(())
    }
}

#[test]
fn test_failed_frame_leaves_screen_and_retries() {
    let mut engine = engine(6, 1);
    let root = NodeId::root();
    engine.add_node(&root, NodeSpec::new("t", TextBlock::new("old")).at(0, 0, 3, 1)).unwrap();

    let mut screen = Screen::new(6, 1);
    let start = Instant::now();
    engine.tick(start).unwrap();
    let mark = replay_since(&mut screen, &engine, 0);

    let open = Rc::new(Cell::new(false));
    engine
        .add_node(&root, NodeSpec::new("gate", Gate { open: Rc::clone(&open) }).at(4, 0, 2, 1))
        .unwrap();

    let second = start + Duration::from_secs(1);
    assert_eq!(engine.tick(second).unwrap(), FrameOutcome::Aborted);
    assert_eq!(engine.output().len(), mark);
    assert_eq!(screen.row_text(0), "old   ");

    open.set(true);
    assert!(matches!(
        engine.tick(second + Duration::from_secs(1)).unwrap(),
        FrameOutcome::Rendered(_)
    ));
    replay_since(&mut screen, &engine, mark);
    assert_eq!(screen.cell(4, 0).style.bg, Rgba::GREEN);
    assert_eq!(screen.cell(5, 0).style.bg, Rgba::GREEN);
    assert_eq!(engine.stats().frames_aborted, 1);
}

#[test]
fn test_translucent_overlay() {
    let mut engine = engine(4, 4);
    let root = NodeId::root();
    engine.add_node(&root, NodeSpec::new("under", Panel::new(Rgba::BLACK)).at(0, 0, 4, 4)).unwrap();
    engine
        .add_node(&root, NodeSpec::new("overlay", Panel::new(Rgba::WHITE)).at(1, 1, 2, 2).buffered(128))
        .unwrap();

    let mut screen = Screen::new(4, 4);
    engine.tick(Instant::now()).unwrap();
    replay_since(&mut screen, &engine, 0);

    assert_eq!(screen.cell(0, 0).style.bg, Rgba::BLACK);
    assert_eq!(screen.cell(1, 1).style.bg, Rgba::rgb(128, 128, 128));
    assert_eq!(screen.cell(2, 2).style.bg, Rgba::rgb(128, 128, 128));
    assert_eq!(screen.cell(3, 3).style.bg, Rgba::BLACK);
}

#[test]
fn test_synchronized_frames_are_bracketed() {
    let config = EngineConfig::default();
    assert!(config.synchronized_output);
    let mut engine = Engine::new(Vec::new(), 4, 1, config);
    engine.add_node(&NodeId::root(), NodeSpec::new("t", TextBlock::new("hi")).at(0, 0, 2, 1)).unwrap();
    engine.tick(Instant::now()).unwrap();

    let out = engine.output();
    assert!(out.starts_with(b"\x1b[?2026h"));
    assert!(out.ends_with(b"\x1b[?2026l"));

    let mut screen = Screen::new(4, 1);
    screen.replay(out);
    assert_eq!(screen.row_text(0), "hi  ");
}
