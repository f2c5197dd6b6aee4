//! Differential renderer.
//!
//! The DiffRenderer owns two frame buffers. The compositor paints into the
//! back buffer; `render` compares it against the front buffer (what the
//! terminal currently shows) and writes only the cells that differ.
//!
//! # Algorithm
//!
//! 1. Optionally open a synchronized-output block
//! 2. For each row: skip it whole if it equals the front row
//! 3. Otherwise walk its cells, rendering changed ones with StatefulCellRenderer
//! 4. Hand the frame to the writer in one write (nothing at all if unchanged)
//! 5. Swap the buffers: the frame just written becomes the front
//!
//! A resize or `invalidate` forgets the front buffer, so the next frame is
//! written in full.

use std::io::{self, Write};

use super::ansi;
use super::buffer::FrameBuffer;
use super::output::{OutputBuffer, StatefulCellRenderer};
use crate::types::Cell;

/// What one `render` call did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiffStats {
    /// A full frame was written (front buffer was invalid).
    pub full: bool,
    pub rows_changed: u16,
    pub cells_written: u32,
    pub bytes: usize,
}

/// Double-buffered differential renderer.
#[derive(Debug)]
pub struct DiffRenderer {
    front: FrameBuffer,
    back: FrameBuffer,
    front_valid: bool,
    synchronized: bool,
    output: OutputBuffer,
    cell_renderer: StatefulCellRenderer,
}

impl DiffRenderer {
    /// Create a renderer for a `width` x `height` terminal.
    ///
    /// The first frame is always written in full.
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            front: FrameBuffer::new(width, height),
            back: FrameBuffer::new(width, height),
            front_valid: false,
            synchronized: false,
            output: OutputBuffer::new(),
            cell_renderer: StatefulCellRenderer::new(),
        }
    }

    /// Wrap every non-empty frame in begin/end synchronized output.
    pub fn set_synchronized(&mut self, enabled: bool) {
        self.synchronized = enabled;
    }

    #[inline]
    pub fn width(&self) -> u16 {
        self.back.width()
    }

    #[inline]
    pub fn height(&self) -> u16 {
        self.back.height()
    }

    /// The buffer the next frame is painted into.
    ///
    /// After a `render` it holds an older frame; callers repaint it fully
    /// (the compositor clears it first).
    pub fn back_mut(&mut self) -> &mut FrameBuffer {
        &mut self.back
    }

    pub fn back(&self) -> &FrameBuffer {
        &self.back
    }

    /// What the terminal is showing, as far as we know.
    pub fn front(&self) -> &FrameBuffer {
        &self.front
    }

    /// Reallocate both buffers. The next frame is written in full.
    pub fn resize(&mut self, width: u16, height: u16) {
        self.front.resize(width, height);
        self.back.resize(width, height);
        self.front_valid = false;
    }

    /// Forget the front buffer. Next render will be a full redraw.
    ///
    /// Use this when the screen may have been disturbed from outside.
    pub fn invalidate(&mut self) {
        self.front_valid = false;
    }

    /// Check if we have a front frame to diff against.
    pub fn has_previous(&self) -> bool {
        self.front_valid
    }

    /// Diff back against front, write the changes, swap.
    pub fn render<W: Write>(&mut self, out: &mut W) -> io::Result<DiffStats> {
        let full = !self.front_valid;
        let mut stats = DiffStats {
            full,
            ..DiffStats::default()
        };

        self.output.clear();
        self.cell_renderer.reset();

        if self.synchronized {
            ansi::begin_sync(&mut self.output)?;
        }
        let prefix = self.output.len();

        if full {
            ansi::erase_screen(&mut self.output)?;
        }

        let (width, height) = (self.back.width(), self.back.height());
        for y in 0..height {
            let row = self.back.row(y);
            let prev = self.front.row(y);
            if !full && row == prev {
                continue;
            }
            stats.rows_changed += 1;

            for x in 0..width {
                let col = x as usize;
                if !full && !cell_changed(row, prev, col) {
                    continue;
                }
                let cell = &row[col];
                if cell.is_continuation() {
                    continue;
                }
                self.cell_renderer.render_cell(&mut self.output, x, y, cell)?;
                stats.cells_written += 1;
            }
        }

        if self.output.len() == prefix {
            // Nothing changed: not even the sync bracket goes out.
            self.output.clear();
        } else if self.synchronized {
            ansi::end_sync(&mut self.output)?;
        }

        stats.bytes = self.output.flush_to(out)?;

        std::mem::swap(&mut self.front, &mut self.back);
        self.front_valid = true;

        if stats.bytes > 0 {
            tracing::trace!(
                rows = stats.rows_changed,
                cells = stats.cells_written,
                bytes = stats.bytes,
                full,
                "frame written"
            );
        }
        Ok(stats)
    }
}

/// A cell needs output when it differs, or when it leads a wide glyph whose
/// continuation half changed style (the continuation itself is never sent).
#[inline]
fn cell_changed(row: &[Cell], prev: &[Cell], x: usize) -> bool {
    if row[x] != prev[x] {
        return true;
    }
    match row.get(x + 1) {
        Some(next) => next.is_continuation() && *next != prev[x + 1],
        None => false,
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Attr, Rgba};

    fn settle(renderer: &mut DiffRenderer) {
        let mut sink = Vec::new();
        renderer.render(&mut sink).unwrap();
        renderer.back_mut().clear(Rgba::TERMINAL_DEFAULT);
    }

    #[test]
    fn test_first_frame_is_full() {
        let mut renderer = DiffRenderer::new(3, 2);
        assert!(!renderer.has_previous());

        let mut sink = Vec::new();
        let stats = renderer.render(&mut sink).unwrap();
        assert!(stats.full);
        assert_eq!(stats.rows_changed, 2);
        assert_eq!(stats.cells_written, 6);
        assert!(renderer.has_previous());
    }

    #[test]
    fn test_unchanged_frame_writes_nothing() {
        let mut renderer = DiffRenderer::new(4, 2);
        renderer.set_synchronized(true);
        settle(&mut renderer);

        let mut sink = Vec::new();
        let stats = renderer.render(&mut sink).unwrap();
        assert_eq!(stats.bytes, 0);
        assert!(sink.is_empty());
    }

    #[test]
    fn test_single_cell_change() {
        let mut renderer = DiffRenderer::new(3, 1);
        settle(&mut renderer);

        renderer.back_mut().draw_text(1, 0, "x", Rgba::WHITE, None, Attr::NONE, None);
        let mut sink = Vec::new();
        let stats = renderer.render(&mut sink).unwrap();

        assert_eq!(stats.cells_written, 1);
        assert_eq!(
            String::from_utf8(sink).unwrap(),
            "\x1b[1;2H\x1b[0;38;2;255;255;255;49mx"
        );
    }

    #[test]
    fn test_run_shares_style_and_cursor() {
        let mut renderer = DiffRenderer::new(5, 1);
        settle(&mut renderer);

        renderer.back_mut().draw_text(0, 0, "abc", Rgba::RED, None, Attr::NONE, None);
        let mut sink = Vec::new();
        renderer.render(&mut sink).unwrap();

        let text = String::from_utf8(sink).unwrap();
        assert_eq!(text, "\x1b[1;1H\x1b[0;38;2;255;0;0;49mabc");
    }

    #[test]
    fn test_synchronized_wraps_changes() {
        let mut renderer = DiffRenderer::new(2, 1);
        renderer.set_synchronized(true);
        settle(&mut renderer);

        renderer.back_mut().draw_text(0, 0, "a", Rgba::WHITE, None, Attr::NONE, None);
        let mut sink = Vec::new();
        renderer.render(&mut sink).unwrap();

        let text = String::from_utf8(sink).unwrap();
        assert!(text.starts_with("\x1b[?2026h"));
        assert!(text.ends_with("\x1b[?2026l"));
    }

    #[test]
    fn test_buffers_swap() {
        let mut renderer = DiffRenderer::new(2, 1);
        renderer.back_mut().draw_text(0, 0, "q", Rgba::WHITE, None, Attr::NONE, None);
        renderer.render(&mut Vec::new()).unwrap();
        assert_eq!(renderer.front().get(0, 0).unwrap().ch.as_str(), "q");
    }

    #[test]
    fn test_resize_forces_full_frame() {
        let mut renderer = DiffRenderer::new(2, 1);
        settle(&mut renderer);

        renderer.resize(4, 2);
        assert!(!renderer.has_previous());
        let stats = renderer.render(&mut Vec::new()).unwrap();
        assert!(stats.full);
        assert_eq!(stats.cells_written, 8);
    }

    #[test]
    fn test_invalidate() {
        let mut renderer = DiffRenderer::new(2, 1);
        settle(&mut renderer);
        assert!(renderer.has_previous());

        renderer.invalidate();
        assert!(!renderer.has_previous());
    }

    #[test]
    fn test_continuation_restyle_reemits_lead() {
        let mut renderer = DiffRenderer::new(4, 1);
        renderer.back_mut().draw_text(0, 0, "中", Rgba::WHITE, None, Attr::NONE, None);
        renderer.render(&mut Vec::new()).unwrap();

        let back = renderer.back_mut();
        back.clear(Rgba::TERMINAL_DEFAULT);
        back.draw_text(0, 0, "中", Rgba::WHITE, None, Attr::NONE, None);
        back.blend_cell(1, 0, Rgba::WHITE, Rgba::RED, 255, None);

        let mut sink = Vec::new();
        let stats = renderer.render(&mut sink).unwrap();
        assert_eq!(stats.cells_written, 1);
        assert!(String::from_utf8(sink).unwrap().contains("中"));
    }
}
