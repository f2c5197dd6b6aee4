//! FrameBuffer and drawing primitives.
//!
//! The FrameBuffer is a 2D grid of Cells that represents what should be displayed
//! on the terminal. All drawing operations work on this buffer.
//!
//! # Design Decisions
//!
//! - **Flat storage**: Uses `Vec<Cell>` with row-major indexing for cache efficiency.
//! - **Clipping**: Positions are signed; anything outside the buffer or the
//!   optional clip rect is dropped silently.
//! - **Alpha blending**: Transparent backgrounds blend with existing cells.
//! - **Wide characters**: Emoji and CJK glyphs reserve the next cell as a
//!   continuation placeholder (empty grapheme). Overwriting either half of a
//!   wide glyph blanks the other half so the grid never holds an orphan.

use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

use crate::types::{Attr, BorderStyle, Cell, Rect, Rgba};

// =============================================================================
// FrameBuffer
// =============================================================================

/// A 2D buffer of terminal cells.
///
/// Uses flat storage with row-major indexing: `index = y * width + x`
#[derive(Debug, Clone, PartialEq)]
pub struct FrameBuffer {
    width: u16,
    height: u16,
    cells: Vec<Cell>,
}

impl FrameBuffer {
    /// Create a new buffer filled with default cells.
    pub fn new(width: u16, height: u16) -> Self {
        let size = width as usize * height as usize;
        Self {
            width,
            height,
            cells: vec![Cell::default(); size],
        }
    }

    /// Create a new buffer with a specific background color.
    pub fn with_background(width: u16, height: u16, bg: Rgba) -> Self {
        let size = width as usize * height as usize;
        Self {
            width,
            height,
            cells: vec![Cell::blank(Rgba::TERMINAL_DEFAULT, bg); size],
        }
    }

    #[inline]
    pub fn width(&self) -> u16 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u16 {
        self.height
    }

    /// The full buffer bounds.
    #[inline]
    pub fn bounds(&self) -> Rect {
        Rect::new(0, 0, self.width, self.height)
    }

    #[inline]
    fn index(&self, x: u16, y: u16) -> usize {
        y as usize * self.width as usize + x as usize
    }

    /// Check if signed coordinates are in bounds.
    #[inline]
    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && x < self.width as i32 && y < self.height as i32
    }

    /// Get a cell reference (returns None if out of bounds).
    #[inline]
    pub fn get(&self, x: u16, y: u16) -> Option<&Cell> {
        if x < self.width && y < self.height {
            Some(&self.cells[self.index(x, y)])
        } else {
            None
        }
    }

    /// Get a mutable cell reference (returns None if out of bounds).
    #[inline]
    pub fn get_mut(&mut self, x: u16, y: u16) -> Option<&mut Cell> {
        if x < self.width && y < self.height {
            let idx = self.index(x, y);
            Some(&mut self.cells[idx])
        } else {
            None
        }
    }

    /// One row of cells. Empty slice past the last row.
    #[inline]
    pub fn row(&self, y: u16) -> &[Cell] {
        if y >= self.height {
            return &[];
        }
        let start = y as usize * self.width as usize;
        &self.cells[start..start + self.width as usize]
    }

    /// Iterate over rows top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[Cell]> {
        // chunks() panics on 0; an empty buffer has no rows anyway.
        self.cells.chunks(self.width.max(1) as usize)
    }

    /// Raw cells slice (row-major).
    #[inline]
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Reset every cell to a space on `bg`.
    pub fn clear(&mut self, bg: Rgba) {
        let blank = Cell::blank(Rgba::TERMINAL_DEFAULT, bg);
        for cell in &mut self.cells {
            cell.clone_from(&blank);
        }
    }

    /// Resize the buffer (clears content).
    pub fn resize(&mut self, width: u16, height: u16) {
        self.width = width;
        self.height = height;
        let size = width as usize * height as usize;
        self.cells.clear();
        self.cells.resize(size, Cell::default());
    }

    /// Write position check: buffer bounds plus the optional clip.
    #[inline]
    fn writable(&self, x: i32, y: i32, clip: Option<&Rect>) -> bool {
        self.in_bounds(x, y) && clip.map_or(true, |c| c.contains(x, y))
    }

    /// Blank the other half of any wide glyph touching (x, y).
    ///
    /// Called before (x, y) is overwritten.
    fn detach_wide(&mut self, x: u16, y: u16) {
        let idx = self.index(x, y);
        if self.cells[idx].is_continuation() && x > 0 {
            let lead = &mut self.cells[idx - 1];
            lead.ch = " ".into();
        }
        let next = x + 1;
        if next < self.width && !self.cells[idx].is_continuation() {
            let follower = &mut self.cells[idx + 1];
            if follower.is_continuation() {
                follower.ch = " ".into();
            }
        }
    }

    // =========================================================================
    // Drawing Primitives
    // =========================================================================

    /// Set a single cell with optional clipping.
    ///
    /// A non-opaque background is blended over the existing one.
    /// Returns true if the cell was set.
    pub fn set_cell(&mut self, x: i32, y: i32, cell: Cell, clip: Option<&Rect>) -> bool {
        if !self.writable(x, y, clip) {
            return false;
        }
        let (ux, uy) = (x as u16, y as u16);
        self.detach_wide(ux, uy);

        let idx = self.index(ux, uy);
        let target = &mut self.cells[idx];
        let bg = Rgba::blend(cell.bg, target.bg);
        *target = Cell { bg, ..cell };
        true
    }

    /// Fill a rectangle with a background color.
    ///
    /// Opaque fills erase glyphs; translucent fills only tint.
    pub fn fill_rect(&mut self, rect: Rect, bg: Rgba, clip: Option<&Rect>) {
        let mut area = match rect.intersect(&self.bounds()) {
            Some(area) => area,
            None => return,
        };
        if let Some(clip) = clip {
            area = match area.intersect(clip) {
                Some(area) => area,
                None => return,
            };
        }

        let erase = bg.is_opaque() || bg.is_terminal_default() || bg.is_ansi();
        for row in area.y..area.bottom() {
            for col in area.x..area.right() {
                let (ux, uy) = (col as u16, row as u16);
                if erase {
                    self.detach_wide(ux, uy);
                }
                let idx = self.index(ux, uy);
                let cell = &mut self.cells[idx];
                cell.bg = Rgba::blend(bg, cell.bg);
                if erase {
                    cell.ch = " ".into();
                    cell.attrs = Attr::NONE;
                }
            }
        }
    }

    /// Draw text at a position.
    ///
    /// `bg = None` keeps the existing background. Returns the number of
    /// columns advanced (wide glyphs count two).
    pub fn draw_text(
        &mut self,
        x: i32,
        y: i32,
        text: &str,
        fg: Rgba,
        bg: Option<Rgba>,
        attrs: Attr,
        clip: Option<&Rect>,
    ) -> u16 {
        let bg = bg.unwrap_or(Rgba::TRANSPARENT);
        let mut col = x;

        for grapheme in text.graphemes(true) {
            if col >= self.width as i32 {
                break;
            }
            let width = grapheme_width(grapheme);
            if width == 0 {
                continue;
            }

            if width == 2 {
                // Both halves must land, otherwise draw a blank placeholder.
                if self.writable(col + 1, y, clip) {
                    if self.set_cell(col, y, Cell::new(grapheme, fg, bg, attrs), clip) {
                        self.set_cell(col + 1, y, Cell::continuation(fg, bg, attrs), clip);
                    }
                } else {
                    self.set_cell(col, y, Cell::new(" ", fg, bg, attrs), clip);
                }
            } else {
                self.set_cell(col, y, Cell::new(grapheme, fg, bg, attrs), clip);
            }

            col += width as i32;
        }

        (col - x).max(0) as u16
    }

    /// Draw a box outline.
    pub fn draw_box(&mut self, rect: Rect, style: &BoxStyle, clip: Option<&Rect>) {
        if rect.width < 2 || rect.height < 2 || style.border == BorderStyle::None {
            return;
        }

        if let Some(fill) = style.fill {
            self.fill_rect(rect.inset(crate::types::Insets::all(1)), fill, clip);
        }

        let (horiz, vert, tl, tr, br, bl) = style.border.chars();
        let sides = style.sides;
        let (x1, y1) = (rect.x, rect.y);
        let (x2, y2) = (rect.right() - 1, rect.bottom() - 1);
        let put = |buf: &mut Self, x: i32, y: i32, glyph: &str| {
            buf.set_cell(x, y, Cell::new(glyph, style.color, style.bg, Attr::NONE), clip);
        };

        if sides.contains(BorderSides::TOP) {
            for col in (x1 + 1)..x2 {
                put(self, col, y1, horiz);
            }
        }
        if sides.contains(BorderSides::BOTTOM) {
            for col in (x1 + 1)..x2 {
                put(self, col, y2, horiz);
            }
        }
        if sides.contains(BorderSides::LEFT) {
            for row in (y1 + 1)..y2 {
                put(self, x1, row, vert);
            }
        }
        if sides.contains(BorderSides::RIGHT) {
            for row in (y1 + 1)..y2 {
                put(self, x2, row, vert);
            }
        }

        // Corner glyphs only where a horizontal and a vertical side meet;
        // a lone side runs straight through the corner cell.
        let corner = |h: BorderSides, v: BorderSides, glyph: &'static str| -> Option<&'static str> {
            match (sides.contains(h), sides.contains(v)) {
                (true, true) if style.corners => Some(glyph),
                (true, _) => Some(horiz),
                (false, true) => Some(vert),
                (false, false) => None,
            }
        };
        if let Some(glyph) = corner(BorderSides::TOP, BorderSides::LEFT, tl) {
            put(self, x1, y1, glyph);
        }
        if let Some(glyph) = corner(BorderSides::TOP, BorderSides::RIGHT, tr) {
            put(self, x2, y1, glyph);
        }
        if let Some(glyph) = corner(BorderSides::BOTTOM, BorderSides::RIGHT, br) {
            put(self, x2, y2, glyph);
        }
        if let Some(glyph) = corner(BorderSides::BOTTOM, BorderSides::LEFT, bl) {
            put(self, x1, y2, glyph);
        }
    }

    /// Blend colors into an existing cell, keeping its glyph.
    ///
    /// `result = src * alpha + dst * (1 - alpha)` for both fg and bg.
    pub fn blend_cell(&mut self, x: i32, y: i32, fg: Rgba, bg: Rgba, alpha: u8, clip: Option<&Rect>) -> bool {
        if !self.writable(x, y, clip) {
            return false;
        }
        let idx = self.index(x as u16, y as u16);
        let cell = &mut self.cells[idx];
        cell.fg = Rgba::blend_alpha(fg, cell.fg, alpha);
        cell.bg = Rgba::blend_alpha(bg, cell.bg, alpha);
        true
    }

    /// Composite another buffer with its top-left corner at (x, y).
    ///
    /// Blank cells with a fully transparent background leave the
    /// destination untouched. `opacity` scales the source's alpha.
    pub fn blit(&mut self, src: &FrameBuffer, x: i32, y: i32, clip: Option<&Rect>, opacity: u8) {
        if opacity == 0 {
            return;
        }
        for sy in 0..src.height {
            let dy = y + sy as i32;
            let mut lead_written = false;
            for sx in 0..src.width {
                let dx = x + sx as i32;
                let cell = &src.cells[src.index(sx, sy)];

                if cell.is_continuation() {
                    // Only meaningful right after its lead landed.
                    if lead_written && self.writable(dx, dy, clip) {
                        let idx = self.index(dx as u16, dy as u16);
                        let below = self.cells[idx].bg;
                        self.cells[idx] = Cell {
                            bg: Rgba::blend(cell.bg.with_opacity(opacity), below),
                            ..cell.clone()
                        };
                    }
                    lead_written = false;
                    continue;
                }
                lead_written = false;

                if cell.is_blank() && cell.bg.is_transparent() {
                    continue;
                }
                if !self.writable(dx, dy, clip) {
                    continue;
                }

                let is_wide = sx + 1 < src.width && src.cells[src.index(sx + 1, sy)].is_continuation();
                let fits = !is_wide || self.writable(dx + 1, dy, clip);

                let (ux, uy) = (dx as u16, dy as u16);
                self.detach_wide(ux, uy);
                let idx = self.index(ux, uy);
                let below = &self.cells[idx];
                let bg = Rgba::blend(cell.bg.with_opacity(opacity), below.bg);
                let fg = if opacity == 255 {
                    cell.fg
                } else {
                    Rgba::blend_alpha(cell.fg, bg, opacity)
                };
                let ch = if fits { cell.ch.clone() } else { " ".into() };
                self.cells[idx] = Cell {
                    ch,
                    fg,
                    bg,
                    attrs: cell.attrs,
                };
                lead_written = is_wide && fits;
            }
        }
    }
}

// =============================================================================
// Box Configuration
// =============================================================================

bitflags::bitflags! {
    /// Which sides of a box get a border.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BorderSides: u8 {
        const TOP = 1 << 0;
        const RIGHT = 1 << 1;
        const BOTTOM = 1 << 2;
        const LEFT = 1 << 3;
    }
}

impl Default for BorderSides {
    fn default() -> Self {
        Self::all()
    }
}

/// Everything `draw_box` needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoxStyle {
    pub border: BorderStyle,
    pub sides: BorderSides,
    /// Draw corner glyphs where two sides meet.
    pub corners: bool,
    pub color: Rgba,
    /// Background behind border glyphs (transparent keeps what is there).
    pub bg: Rgba,
    /// Optional fill for the interior.
    pub fill: Option<Rgba>,
}

impl BoxStyle {
    pub fn new(border: BorderStyle, color: Rgba) -> Self {
        Self {
            border,
            sides: BorderSides::all(),
            corners: true,
            color,
            bg: Rgba::TRANSPARENT,
            fill: None,
        }
    }
}

impl Default for BoxStyle {
    fn default() -> Self {
        Self::new(BorderStyle::Single, Rgba::TERMINAL_DEFAULT)
    }
}

// =============================================================================
// Text Width Utilities
// =============================================================================

/// Display width of one grapheme cluster: 0, 1 or 2 columns.
///
/// Control characters are zero-width; anything wider clamps to 2.
pub fn grapheme_width(grapheme: &str) -> usize {
    match grapheme.chars().next() {
        None => 0,
        Some(c) if c.is_control() => 0,
        Some(_) => UnicodeWidthStr::width(grapheme).min(2),
    }
}

/// Calculate the display width of a string.
pub fn string_width(s: &str) -> usize {
    s.graphemes(true).map(grapheme_width).sum()
}

// =============================================================================
// Tests
// =============================================================================
