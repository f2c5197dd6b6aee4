//! # spark-compositor
//!
//! Compositing terminal UI engine.
//!
//! ## Architecture
//!
//! Widgets live in an arena render tree keyed by string ids. Each frame the
//! compositor walks the tree in paint order and fills a cell grid; the diff
//! renderer compares it with the previous frame and writes only what
//! changed.
//!
//! ```text
//! input → Selection / Focus coordinators → RenderTree (dirty) → Compositor → DiffRenderer → terminal
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Core types (Rgba, Attr, Cell, Rect, BorderStyle)
//! - [`renderer`] - Cell grid, ANSI output, diff rendering
//! - [`tree`] - Render nodes, capability traits, bundled widgets
//! - [`state`] - Selection and focus coordinators
//! - [`pipeline`] - Compositor, frame scheduler, terminal guard, engine
//! - [`layout`] - Taffy flexbox bridge
//! - [`input`] - Key and pointer events from crossterm
//! - [`config`] - Engine settings
//! - [`error`] - Error type

pub mod config;
pub mod error;
pub mod input;
pub mod layout;
pub mod pipeline;
pub mod renderer;
pub mod state;
pub mod tree;
pub mod types;

// Re-export commonly used items
pub use types::*;

pub use config::EngineConfig;
pub use error::{Error, Result};

pub use input::{InputEvent, KeyEvent, Modifiers, PointerButton, PointerEvent, PointerKind, ScrollDirection};

pub use layout::TaffyLayout;

pub use pipeline::{Compositor, Engine, FrameOutcome, FrameScheduler, FrameStats, RenderHandle, TerminalGuard};

pub use renderer::{BorderSides, BoxStyle, DiffRenderer, DiffStats, FrameBuffer, OutputBuffer};

pub use state::{
    Direction, FocusChange, FocusCoordinator, FocusLevel, FocusScope, FocusTarget, FocusableOptions, KeyRouting,
    LocalRange, NavAction, ScopeId, Selection, SelectionCoordinator, SelectionPoint,
};

pub use tree::{
    Focusable, ListenerId, NodeEvent, NodeId, NodeSpec, PaintContext, Panel, RenderNode, RenderTree, Renderable,
    Selectable, TextBlock,
};
