//! Capability traits.
//!
//! A node's content is a `Box<dyn Renderable>`. Selection and focus look for
//! the optional capabilities through `as_selectable` / `as_focusable_mut`,
//! so a widget opts in by implementing the extra trait and returning itself.

use std::any::Any;

use unicode_segmentation::UnicodeSegmentation;

use crate::error::Result;
use crate::input::KeyEvent;
use crate::renderer::{grapheme_width, BoxStyle, FrameBuffer};
use crate::state::focus::FocusLevel;
use crate::state::selection::LocalRange;
use crate::types::{Attr, Rect, Rgba};

use super::NodeId;

// =============================================================================
// Renderable
// =============================================================================

/// Anything that can paint itself into a node's area.
pub trait Renderable {
    /// Paint into `ctx.buffer`. Writes are clipped to `ctx.clip` by the
    /// context helpers.
    fn paint(&self, ctx: &mut PaintContext<'_>) -> Result<()>;

    fn as_selectable(&self) -> Option<&dyn Selectable> {
        None
    }

    fn as_focusable_mut(&mut self) -> Option<&mut dyn Focusable> {
        None
    }

    /// Typed access for `RenderTree::content_mut`.
    fn as_any_mut(&mut self) -> Option<&mut dyn Any> {
        None
    }
}

// =============================================================================
// Selectable
// =============================================================================

/// Text a selection can reach into.
///
/// Columns are grapheme indices within a line, not display columns; the
/// default `global_to_local` converts between the two.
pub trait Selectable {
    fn line_count(&self) -> usize;

    fn line_text(&self, line: usize) -> &str;

    /// Number of graphemes on `line`.
    fn line_length(&self, line: usize) -> usize {
        self.line_text(line).graphemes(true).count()
    }

    /// Map a screen position to `(line, col)` inside `content`.
    ///
    /// Positions outside the content box clamp to the nearest line and to
    /// the start or end of that line. A point on either half of a wide
    /// glyph maps to that glyph.
    fn global_to_local(&self, content: Rect, x: i32, y: i32) -> (usize, usize) {
        let lines = self.line_count();
        if lines == 0 {
            return (0, 0);
        }
        let line = (y - content.y).clamp(0, lines as i32 - 1) as usize;
        let rel_x = x - content.x;
        if rel_x <= 0 {
            return (line, 0);
        }

        let mut start = 0i32;
        for (index, grapheme) in self.line_text(line).graphemes(true).enumerate() {
            let width = grapheme_width(grapheme) as i32;
            if rel_x < start + width {
                return (line, index);
            }
            start += width;
        }
        (line, self.line_length(line))
    }
}

// =============================================================================
// Focusable
// =============================================================================

/// Hooks for nodes registered with the focus coordinator.
pub trait Focusable {
    fn on_focus(&mut self, _level: FocusLevel) {}

    fn on_blur(&mut self, _level: FocusLevel) {}

    /// Return true when the key was consumed.
    fn handle_key(&mut self, _key: &KeyEvent) -> bool {
        false
    }
}

// =============================================================================
// PaintContext
// =============================================================================

/// Everything a node needs to paint one frame.
///
/// All rects are in the coordinates of `buffer`, which is either the
/// compositor's back buffer or a buffered ancestor's private buffer.
pub struct PaintContext<'a> {
    pub buffer: &'a mut FrameBuffer,
    pub node: &'a NodeId,
    /// The node's bounds.
    pub bounds: Rect,
    /// Bounds minus insets.
    pub content: Rect,
    /// Visible part of the node; never larger than `bounds`.
    pub clip: Rect,
    /// Highlighted range, when the node takes part in the selection.
    pub selection: Option<LocalRange>,
    pub selection_bg: Rgba,
    pub selection_fg: Rgba,
}

impl PaintContext<'_> {
    /// The clip restricted to the content box.
    pub fn content_clip(&self) -> Option<Rect> {
        self.content.intersect(&self.clip)
    }

    /// Fill the whole node with `bg`.
    pub fn fill(&mut self, bg: Rgba) {
        let clip = self.clip;
        self.buffer.fill_rect(self.bounds, bg, Some(&clip));
    }

    /// Draw a box on the node's bounds.
    pub fn draw_box(&mut self, style: &BoxStyle) {
        let clip = self.clip;
        self.buffer.draw_box(self.bounds, style, Some(&clip));
    }

    /// Draw text at (`col`, `row`) relative to the content box.
    pub fn draw_text(&mut self, col: i32, row: i32, text: &str, fg: Rgba, bg: Option<Rgba>, attrs: Attr) -> u16 {
        let Some(clip) = self.content_clip() else {
            return 0;
        };
        self.buffer.draw_text(
            self.content.x + col,
            self.content.y + row,
            text,
            fg,
            bg,
            attrs,
            Some(&clip),
        )
    }

    /// Recolor a run of cells relative to the content box with the
    /// selection colors.
    pub fn highlight(&mut self, col: i32, row: i32, width: u16) {
        let Some(clip) = self.content_clip() else {
            return;
        };
        let (fg, bg) = (self.selection_fg, self.selection_bg);
        let y = self.content.y + row;
        for dx in 0..width as i32 {
            self.buffer.blend_cell(self.content.x + col + dx, y, fg, bg, 255, Some(&clip));
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
