//! Pointer-driven selection through the engine.

mod common;

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Instant;

use common::Screen;
use proptest::prelude::*;
use spark_compositor::{
    Engine, EngineConfig, NodeEvent, NodeId, NodeSpec, Panel, PointerEvent, Rgba, TextBlock,
};

const SELECTION_BG: Rgba = Rgba::rgb(60, 90, 160);

fn engine(width: u16, height: u16) -> Engine<Vec<u8>> {
    let config = EngineConfig::default()
        .with_synchronized_output(false)
        .with_selection_colors(SELECTION_BG, Rgba::WHITE);
    Engine::new(Vec::new(), width, height, config)
}

fn text(engine: &mut Engine<Vec<u8>>, id: &str, body: &str, x: i32, y: i32) -> NodeId {
    let lines: Vec<&str> = body.split('\n').collect();
    let width = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0) as u16;
    engine
        .add_node(
            &NodeId::root(),
            NodeSpec::new(id, TextBlock::new(body)).at(x, y, width, lines.len() as u16),
        )
        .unwrap()
}

fn drag(engine: &mut Engine<Vec<u8>>, from: (u16, u16), to: (u16, u16)) {
    engine.handle_pointer(&PointerEvent::down(from.0, from.1));
    engine.handle_pointer(&PointerEvent::drag(to.0, to.1));
    engine.handle_pointer(&PointerEvent::up(to.0, to.1));
}

#[test]
fn test_drag_within_one_block() {
    let mut engine = engine(20, 5);
    text(&mut engine, "t", "Hello\nWorld\n!!!", 0, 0);
    drag(&mut engine, (2, 0), (3, 1));
    assert_eq!(engine.selected_text(), "llo\nWor");
}

#[test]
fn test_drag_across_blocks() {
    let mut engine = engine(20, 5);
    text(&mut engine, "a", "ABC", 0, 0);
    text(&mut engine, "b", "DEF", 0, 1);
    drag(&mut engine, (2, 0), (1, 1));
    assert_eq!(engine.selected_text(), "C\nD");
}

#[test]
fn test_selection_follows_document_order_not_z() {
    let mut engine = engine(20, 5);
    text(&mut engine, "a", "first", 0, 2);
    let b = text(&mut engine, "b", "second", 0, 0);
    engine.tree_mut().set_z_index(&b, 10);

    // "a" comes first in the tree even though it sits lower on screen.
    drag(&mut engine, (3, 0), (2, 2));
    assert_eq!(engine.selected_text(), "rst\nsec");
}

#[test]
fn test_panel_over_text_does_not_block_selection() {
    let mut engine = engine(20, 3);
    text(&mut engine, "t", "covered", 0, 0);
    engine
        .add_node(&NodeId::root(), NodeSpec::new("glass", Panel::transparent()).at(0, 0, 20, 3).with_z_index(5))
        .unwrap();
    drag(&mut engine, (0, 0), (3, 0));
    assert_eq!(engine.selected_text(), "cov");
}

#[test]
fn test_clear_is_idempotent() {
    let mut engine = engine(20, 2);
    let t = text(&mut engine, "t", "Hello", 0, 0);
    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&events);
    engine.tree_mut().on(&t, move |event| sink.borrow_mut().push(event.clone()));

    drag(&mut engine, (0, 0), (4, 0));
    let before = events.borrow().len();
    engine.clear_selection();
    assert_eq!(events.borrow().len(), before + 1);
    assert_eq!(events.borrow().last(), Some(&NodeEvent::SelectionChanged(None)));

    engine.clear_selection();
    assert_eq!(events.borrow().len(), before + 1);
    assert_eq!(engine.selected_text(), "");
}

#[test]
fn test_release_freezes_range() {
    let mut engine = engine(20, 2);
    text(&mut engine, "t", "Hello", 0, 0);
    drag(&mut engine, (0, 0), (2, 0));
    engine.handle_pointer(&PointerEvent::drag(5, 0));
    assert_eq!(engine.selected_text(), "He");
}

#[test]
fn test_highlight_reaches_the_terminal() {
    let mut engine = engine(10, 1);
    text(&mut engine, "t", "Hello", 0, 0);
    let mut screen = Screen::new(10, 1);

    engine.tick(Instant::now()).unwrap();
    screen.replay(engine.output());
    assert_eq!(screen.row_text(0), "Hello     ");
    assert_ne!(screen.cell(1, 0).style.bg, SELECTION_BG);

    drag(&mut engine, (1, 0), (4, 0));
    let mark = engine.output().len();
    engine.force_render().unwrap();
    screen.replay(&engine.output()[mark..]);

    for x in 1..4 {
        assert_eq!(screen.cell(x, 0).style.bg, SELECTION_BG, "column {x}");
        assert_eq!(screen.cell(x, 0).style.fg, Rgba::WHITE);
    }
    assert_ne!(screen.cell(0, 0).style.bg, SELECTION_BG);
    assert_ne!(screen.cell(4, 0).style.bg, SELECTION_BG);
    assert_eq!(screen.row_text(0), "Hello     ");
}

#[test]
fn test_removing_endpoint_clears_selection() {
    let mut engine = engine(20, 3);
    let a = text(&mut engine, "a", "ABC", 0, 0);
    text(&mut engine, "b", "DEF", 0, 1);
    drag(&mut engine, (0, 0), (2, 1));
    assert_eq!(engine.selected_text(), "ABC\nDE");

    engine.destroy(&a);
    assert!(engine.selection().is_none());
    assert_eq!(engine.selected_text(), "");
}

// Both ends land on text: a press that misses starts no selection at all.
proptest! {
    #[test]
    fn test_drag_direction_does_not_matter(
        ax in 0u16..5, ay in 0u16..4, bx in 0u16..5, by in 0u16..4,
    ) {
        let build = || {
            let mut engine = engine(8, 4);
            text(&mut engine, "a", "alpha\nbeta", 0, 0);
            text(&mut engine, "b", "gamma\ndelta", 0, 2);
            engine
        };
        let mut forward = build();
        drag(&mut forward, (ax, ay), (bx, by));
        let mut backward = build();
        drag(&mut backward, (bx, by), (ax, ay));
        prop_assert_eq!(forward.selected_text(), backward.selected_text());
    }
}
