//! Bundled paintables.
//!
//! - [`Panel`] - background fill with an optional border
//! - [`TextBlock`] - multi-line styled text that takes part in selection

use std::any::Any;

use unicode_segmentation::UnicodeSegmentation;

use crate::error::Result;
use crate::renderer::{grapheme_width, BoxStyle};
use crate::types::{Attr, BorderStyle, Insets, Rgba};

use super::capabilities::{PaintContext, Renderable, Selectable};

// =============================================================================
// Panel
// =============================================================================

/// A filled box, optionally bordered.
#[derive(Debug, Clone, PartialEq)]
pub struct Panel {
    pub bg: Option<Rgba>,
    pub border: Option<BoxStyle>,
}

impl Panel {
    pub fn new(bg: Rgba) -> Self {
        Self {
            bg: Some(bg),
            border: None,
        }
    }

    /// A panel that paints nothing but its border (if any).
    pub fn transparent() -> Self {
        Self { bg: None, border: None }
    }

    pub fn with_border(mut self, border: BorderStyle, color: Rgba) -> Self {
        self.border = Some(BoxStyle::new(border, color));
        self
    }

    pub fn with_box_style(mut self, style: BoxStyle) -> Self {
        self.border = Some(style);
        self
    }

    /// Insets that keep children off the border.
    pub fn content_insets(&self) -> Insets {
        match &self.border {
            Some(style) if style.border != BorderStyle::None => Insets::all(1),
            _ => Insets::ZERO,
        }
    }
}

impl Renderable for Panel {
    fn paint(&self, ctx: &mut PaintContext<'_>) -> Result<()> {
        if let Some(bg) = self.bg {
            ctx.fill(bg);
        }
        if let Some(style) = &self.border {
            ctx.draw_box(style);
        }
        Ok(())
    }

    fn as_any_mut(&mut self) -> Option<&mut dyn Any> {
        Some(self)
    }
}

// =============================================================================
// TextBlock
// =============================================================================

/// Multi-line text. Lines are split on `\n`.
///
/// Paints the selection highlight over whatever range the compositor hands
/// it in `PaintContext::selection`.
#[derive(Debug, Clone, PartialEq)]
pub struct TextBlock {
    lines: Vec<String>,
    pub fg: Rgba,
    pub bg: Option<Rgba>,
    pub attrs: Attr,
}

impl TextBlock {
    pub fn new(text: impl AsRef<str>) -> Self {
        Self {
            lines: split_lines(text.as_ref()),
            fg: Rgba::TERMINAL_DEFAULT,
            bg: None,
            attrs: Attr::NONE,
        }
    }

    pub fn with_fg(mut self, fg: Rgba) -> Self {
        self.fg = fg;
        self
    }

    pub fn with_bg(mut self, bg: Rgba) -> Self {
        self.bg = Some(bg);
        self
    }

    pub fn with_attrs(mut self, attrs: Attr) -> Self {
        self.attrs = attrs;
        self
    }

    pub fn set_text(&mut self, text: impl AsRef<str>) {
        self.lines = split_lines(text.as_ref());
    }

    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }
}

fn split_lines(text: &str) -> Vec<String> {
    text.split('\n').map(|l| l.trim_end_matches('\r').to_string()).collect()
}

impl Renderable for TextBlock {
    fn paint(&self, ctx: &mut PaintContext<'_>) -> Result<()> {
        if let Some(bg) = self.bg {
            ctx.fill(bg);
        }
        let rows = ctx.content.height as usize;
        for (row, line) in self.lines.iter().take(rows).enumerate() {
            ctx.draw_text(0, row as i32, line, self.fg, self.bg, self.attrs);
        }

        let Some(range) = ctx.selection else {
            return Ok(());
        };
        if range.is_empty() {
            return Ok(());
        }
        let last = range.end_line.min(rows.saturating_sub(1)).min(self.lines.len().saturating_sub(1));
        for row in range.start_line..=last {
            let Some(line) = self.lines.get(row) else {
                break;
            };
            let len = line.graphemes(true).count();
            let (from, to) = range.columns_on(row, len);
            if from >= to {
                continue;
            }

            // Grapheme index -> display column
            let mut col = 0i32;
            let mut start = None;
            let mut width = 0u16;
            for (index, grapheme) in line.graphemes(true).enumerate() {
                if index == from {
                    start = Some(col);
                }
                if index >= from && index < to {
                    width = width.saturating_add(grapheme_width(grapheme) as u16);
                }
                col = col.saturating_add(grapheme_width(grapheme) as i32);
            }
            if let Some(start) = start {
                ctx.highlight(start, row as i32, width);
            }
        }
        Ok(())
    }

    fn as_selectable(&self) -> Option<&dyn Selectable> {
        Some(self)
    }

    fn as_any_mut(&mut self) -> Option<&mut dyn Any> {
        Some(self)
    }
}

impl Selectable for TextBlock {
    fn line_count(&self) -> usize {
        self.lines.len()
    }

    fn line_text(&self, line: usize) -> &str {
        self.lines.get(line).map(String::as_str).unwrap_or("")
    }
}

// =============================================================================
// Tests
// =============================================================================
