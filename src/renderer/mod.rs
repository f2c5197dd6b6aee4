//! Terminal renderer - the "blind" output layer.
//!
//! The renderer knows only about cells. It doesn't understand nodes,
//! selection, or focus. It takes a filled FrameBuffer and writes the
//! minimal ANSI byte stream that moves the terminal from the previous
//! frame to this one.

pub mod ansi;
pub mod buffer;
pub mod diff;
pub mod output;

// Re-exports for convenience
pub use buffer::{grapheme_width, string_width, BorderSides, BoxStyle, FrameBuffer};
pub use diff::{DiffRenderer, DiffStats};
pub use output::{OutputBuffer, StatefulCellRenderer};
