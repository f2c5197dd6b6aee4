//! Output buffering and stateful cell rendering.
//!
//! These components keep terminal output small by:
//! - Batching a whole frame into one write
//! - Tracking the terminal cursor so sequential cells skip cursor moves
//! - Emitting one combined SGR only when the style actually changes

use std::io::{self, Write};

use crate::types::{Cell, Style};

use super::ansi;
use super::buffer::grapheme_width;

// =============================================================================
// OutputBuffer
// =============================================================================

/// A buffer that accumulates output for batch writing.
///
/// Instead of many small writes to the terminal, everything for a frame is
/// accumulated and handed to the writer once.
#[derive(Debug, Default)]
pub struct OutputBuffer {
    data: Vec<u8>,
}

impl OutputBuffer {
    /// Create a new output buffer with default capacity.
    pub fn new() -> Self {
        Self::with_capacity(16384) // 16KB default
    }

    /// Create a buffer with specific capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Clear the buffer without deallocating.
    #[inline]
    pub fn clear(&mut self) {
        self.data.clear();
    }

    /// Drop everything after `len` bytes.
    #[inline]
    pub fn truncate(&mut self, len: usize) {
        self.data.truncate(len);
    }

    #[inline]
    pub fn write_str(&mut self, s: &str) {
        self.data.extend_from_slice(s.as_bytes());
    }

    /// Hand the accumulated bytes to a writer and flush it.
    ///
    /// Nothing is written (and the writer is not flushed) when empty.
    pub fn flush_to<W: Write>(&mut self, writer: &mut W) -> io::Result<usize> {
        if self.data.is_empty() {
            return Ok(0);
        }
        writer.write_all(&self.data)?;
        writer.flush()?;
        let written = self.data.len();
        self.data.clear();
        Ok(written)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Get the accumulated data as a string (lossy).
    pub fn as_str(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.data)
    }
}

impl Write for OutputBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.data.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(()) // Buffering only - real flush via flush_to
    }
}

// =============================================================================
// StatefulCellRenderer
// =============================================================================

/// Renders cells while tracking terminal state to minimize output.
///
/// Tracks where the terminal cursor is and which style is active. A cell
/// only costs a cursor move when it is not where the cursor already sits,
/// and only costs an SGR when its style differs from the active one.
#[derive(Debug, Default)]
pub struct StatefulCellRenderer {
    cursor: Option<(u16, u16)>,
    style: Option<Style>,
}

impl StatefulCellRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget all tracked state.
    ///
    /// Call at the start of each frame; the next cell re-establishes both
    /// cursor and style explicitly.
    pub fn reset(&mut self) {
        self.cursor = None;
        self.style = None;
    }

    /// Where the renderer believes the cursor is.
    pub fn cursor(&self) -> Option<(u16, u16)> {
        self.cursor
    }

    /// Render a single cell to the output buffer.
    ///
    /// Continuation cells produce no output: the wide glyph to their left
    /// already covered them.
    pub fn render_cell(&mut self, output: &mut OutputBuffer, x: u16, y: u16, cell: &Cell) -> io::Result<()> {
        if cell.is_continuation() {
            return Ok(());
        }

        if self.cursor != Some((x, y)) {
            ansi::cursor_to(output, x, y)?;
        }

        let style = cell.style();
        if self.style != Some(style) {
            ansi::style(output, style)?;
            self.style = Some(style);
        }

        // A zero-width grapheme would leave the cursor behind our tracking.
        let width = grapheme_width(&cell.ch);
        if width == 0 {
            output.write_str(" ");
        } else {
            output.write_str(&cell.ch);
        }

        self.cursor = Some((x + width.max(1) as u16, y));
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
