//! State Module - Interaction state
//!
//! - **Selection** - Anchor/focus text range across node boundaries
//! - **Focus** - Nested scopes with simultaneous focus per level
//!
//! Both coordinators are plain values owned by the engine; they read the
//! render tree but never mutate it.

pub mod focus;
pub mod selection;

pub use focus::{
    Direction, FocusChange, FocusCoordinator, FocusLevel, FocusScope, FocusTarget, FocusableOptions,
    KeyRouting, NavAction, ScopeId,
};
pub use selection::{LocalRange, Selection, SelectionCoordinator, SelectionPoint};
