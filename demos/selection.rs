//! Two bordered panes of selectable text.
//!
//! Drag with the left button to select across both panes, Tab / Shift+Tab
//! to move focus, Ctrl+C to quit. The selection is printed after the
//! terminal is restored.
//!
//! Set `SPARK_LOG` (e.g. `SPARK_LOG=spark_compositor=debug`) to write a
//! trace to `spark-compositor.log`.

use std::fs::File;
use std::sync::Mutex;

use spark_compositor::{
    BorderStyle, Direction, Engine, EngineConfig, FocusLevel, FocusScope, Focusable, FocusableOptions, Insets, NodeId,
    NodeSpec, PaintContext, Panel, Renderable, Result, Rgba, TaffyLayout, TextBlock,
};
use taffy::{Dimension, FlexDirection, LengthPercentage, Size, Style};
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "SPARK_LOG";
const LOG_FILE: &str = "spark-compositor.log";

const IDLE_BORDER: Rgba = Rgba::rgb(90, 90, 110);
const FOCUS_BORDER: Rgba = Rgba::rgb(240, 200, 80);

/// A bordered panel that lights up while it holds focus.
struct Pane {
    panel: Panel,
    focused: bool,
}

impl Pane {
    fn new() -> Self {
        Self {
            panel: Panel::new(Rgba::rgb(24, 24, 32)).with_border(BorderStyle::Rounded, IDLE_BORDER),
            focused: false,
        }
    }
}

impl Renderable for Pane {
    fn paint(&self, ctx: &mut PaintContext<'_>) -> Result<()> {
        let mut panel = self.panel.clone();
        if let Some(border) = panel.border.as_mut() {
            border.color = if self.focused { FOCUS_BORDER } else { IDLE_BORDER };
        }
        panel.paint(ctx)
    }

    fn as_focusable_mut(&mut self) -> Option<&mut dyn Focusable> {
        Some(self)
    }
}

impl Focusable for Pane {
    fn on_focus(&mut self, _level: FocusLevel) {
        self.focused = true;
    }

    fn on_blur(&mut self, _level: FocusLevel) {
        self.focused = false;
    }
}

fn init_logging() -> std::io::Result<()> {
    let Ok(directives) = std::env::var(LOG_ENV) else {
        return Ok(());
    };
    let file = File::create(LOG_FILE)?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(directives))
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn padding(n: f32) -> taffy::Rect<LengthPercentage> {
    taffy::Rect {
        left: LengthPercentage::Length(n),
        right: LengthPercentage::Length(n),
        top: LengthPercentage::Length(n),
        bottom: LengthPercentage::Length(n),
    }
}

fn pane_style() -> Style {
    Style {
        flex_direction: FlexDirection::Column,
        flex_grow: 1.0,
        flex_basis: Dimension::Length(0.0),
        padding: padding(1.0),
        gap: Size {
            width: LengthPercentage::Length(0.0),
            height: LengthPercentage::Length(1.0),
        },
        ..Default::default()
    }
}

fn build(engine: &mut Engine<std::io::Stdout>) -> Result<()> {
    let root = NodeId::root();
    let mut layout = TaffyLayout::new();
    layout.set_style(
        root.clone(),
        Style {
            flex_direction: FlexDirection::Row,
            padding: padding(1.0),
            gap: Size {
                width: LengthPercentage::Length(2.0),
                height: LengthPercentage::Length(0.0),
            },
            ..Default::default()
        },
    );

    engine.register_scope(FocusScope::new("app", FocusLevel::Container))?;
    engine.register_focusable(&root, FocusableOptions::new("app", FocusLevel::Container))?;

    let panes = [
        (
            "left",
            [
                ("left-title", "Selection"),
                ("left-body", "Drag across these lines.\nThe range may continue\ninto the other pane."),
            ],
        ),
        (
            "right",
            [
                ("right-title", "Focus"),
                ("right-body", "Tab or a click moves focus\nbetween the panes."),
            ],
        ),
    ];

    for (order, (pane, texts)) in panes.into_iter().enumerate() {
        let pane_id = engine.add_node(&root, NodeSpec::new(pane, Pane::new()).with_insets(Insets::all(1)))?;
        layout.set_style(pane_id.clone(), pane_style());
        engine.register_focusable(
            &pane_id,
            FocusableOptions::new("app", FocusLevel::Component).with_order(order as i32),
        )?;

        for (index, (id, body)) in texts.into_iter().enumerate() {
            let mut text = TextBlock::new(body).with_fg(Rgba::rgb(220, 220, 230));
            if index == 0 {
                text = text.with_fg(FOCUS_BORDER);
            }
            let text_id = engine.add_node(&pane_id, NodeSpec::new(id, text))?;
            layout.set_style(text_id, Style::default());
        }
    }

    engine.set_layout(layout);
    engine.enter_scope(&"app".into())?;
    engine.navigate(Direction::Next);
    Ok(())
}

fn main() -> Result<()> {
    init_logging()?;

    let mut engine = Engine::start(EngineConfig::default())?;
    build(&mut engine)?;
    engine.run()?;

    let selected = engine.selected_text();
    drop(engine);
    if !selected.is_empty() {
        println!("{selected}");
    }
    Ok(())
}
