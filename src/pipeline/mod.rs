//! Pipeline - from tree to terminal.
//!
//! ```text
//! RenderTree → Compositor → FrameBuffer (back) → DiffRenderer → terminal
//!                  ↑
//!            FrameScheduler (coalesced, rate-limited ticks)
//! ```
//!
//! - [`compose`] - Tree walk, clipping, buffered surfaces, selection overlay
//! - [`scheduler`] - Request coalescing at a target frame rate
//! - [`terminal`] - Raw mode / alternate screen acquisition and restore
//! - [`engine`] - Owns everything and routes input

pub mod compose;
pub mod engine;
pub mod scheduler;
pub mod terminal;

pub use compose::{ComposeStats, Compositor};
pub use engine::{Engine, FrameOutcome, FrameStats, RenderHandle};
pub use scheduler::FrameScheduler;
pub use terminal::{restore_terminal, TerminalGuard};
