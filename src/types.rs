//! Core types for spark-compositor.
//!
//! These types define the foundation that everything builds on.
//! They flow from the render tree through the compositor and define what the
//! diff renderer understands.

use compact_str::CompactString;

// =============================================================================
// Color
// =============================================================================

/// RGBA color with 8-bit channels (0-255).
///
/// Using integers for exact comparison - no floating point epsilon needed.
/// Alpha 255 = fully opaque, 0 = fully transparent.
/// Special value: r=-1 means "terminal default" (let terminal pick),
/// r=-2 means "ANSI palette" with the index stored in g.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rgba {
    pub r: i16,
    pub g: i16,
    pub b: i16,
    pub a: i16,
}

impl Rgba {
    /// Create a new RGBA color.
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self {
            r: r as i16,
            g: g as i16,
            b: b as i16,
            a: a as i16,
        }
    }

    /// Create an opaque RGB color.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    /// Terminal default color (let terminal decide).
    pub const TERMINAL_DEFAULT: Self = Self {
        r: -1,
        g: -1,
        b: -1,
        a: -1,
    };

    /// Transparent color.
    pub const TRANSPARENT: Self = Self {
        r: 0,
        g: 0,
        b: 0,
        a: 0,
    };

    // Standard colors
    pub const BLACK: Self = Self::rgb(0, 0, 0);
    pub const WHITE: Self = Self::rgb(255, 255, 255);
    pub const RED: Self = Self::rgb(255, 0, 0);
    pub const GREEN: Self = Self::rgb(0, 255, 0);
    pub const BLUE: Self = Self::rgb(0, 0, 255);
    pub const YELLOW: Self = Self::rgb(255, 255, 0);
    pub const CYAN: Self = Self::rgb(0, 255, 255);
    pub const MAGENTA: Self = Self::rgb(255, 0, 255);
    pub const GRAY: Self = Self::rgb(128, 128, 128);

    /// Create an ANSI palette color (0-255).
    ///
    /// - 0-7: Standard colors
    /// - 8-15: Bright colors
    /// - 16-231: 6x6x6 RGB cube
    /// - 232-255: Grayscale
    pub const fn ansi(index: u8) -> Self {
        Self {
            r: -2,
            g: index as i16,
            b: 0,
            a: 255,
        }
    }

    /// Create from 0xRRGGBB integer format.
    pub const fn from_rgb_int(rgb: u32) -> Self {
        Self::rgb(
            ((rgb >> 16) & 0xFF) as u8,
            ((rgb >> 8) & 0xFF) as u8,
            (rgb & 0xFF) as u8,
        )
    }

    /// Check if this is the terminal default color.
    #[inline]
    pub const fn is_terminal_default(&self) -> bool {
        self.r == -1
    }

    /// Check if this is an ANSI palette color.
    #[inline]
    pub const fn is_ansi(&self) -> bool {
        self.r == -2
    }

    /// Get ANSI palette index (only valid if is_ansi() returns true).
    #[inline]
    pub const fn ansi_index(&self) -> u8 {
        self.g as u8
    }

    /// Check if color is fully opaque.
    #[inline]
    pub const fn is_opaque(&self) -> bool {
        self.a == 255
    }

    /// Check if color is fully transparent.
    #[inline]
    pub const fn is_transparent(&self) -> bool {
        self.a == 0
    }

    /// Marker colors never blend; they overwrite.
    #[inline]
    const fn is_marker(&self) -> bool {
        self.is_terminal_default() || self.is_ansi()
    }

    /// Alpha blend src over dst (Porter-Duff "over" operation).
    ///
    /// Handles terminal default and ANSI colors by treating them as opaque.
    #[inline]
    pub fn blend(src: Self, dst: Self) -> Self {
        // Fast path: fully opaque source
        if src.is_opaque() || src.is_marker() {
            return src;
        }

        // Fast path: fully transparent source
        if src.is_transparent() {
            return dst;
        }

        // Special colors as dst are treated as opaque black
        let (dr, dg, db, da) = if dst.is_marker() {
            (0i16, 0i16, 0i16, 255i16)
        } else {
            (dst.r, dst.g, dst.b, dst.a)
        };

        let sa = src.a as i32;
        let inv_sa = 255 - sa;

        // out_a = src_a + dst_a * (1 - src_a)
        let out_a = sa + (da as i32 * inv_sa) / 255;

        if out_a == 0 {
            return Self::TRANSPARENT;
        }

        // out_rgb = (src_rgb * src_a + dst_rgb * dst_a * (1 - src_a)) / out_a
        let out_r = ((src.r as i32 * sa) + (dr as i32 * da as i32 * inv_sa / 255)) / out_a;
        let out_g = ((src.g as i32 * sa) + (dg as i32 * da as i32 * inv_sa / 255)) / out_a;
        let out_b = ((src.b as i32 * sa) + (db as i32 * da as i32 * inv_sa / 255)) / out_a;

        Self {
            r: out_r.clamp(0, 255) as i16,
            g: out_g.clamp(0, 255) as i16,
            b: out_b.clamp(0, 255) as i16,
            a: out_a.clamp(0, 255) as i16,
        }
    }

    /// Blend src over dst with an explicit coverage `alpha`.
    ///
    /// `result = src * alpha + dst * (1 - alpha)` per channel, in 8-bit.
    /// The source's own alpha is ignored; the result is opaque unless both
    /// inputs are transparent.
    pub fn blend_alpha(src: Self, dst: Self, alpha: u8) -> Self {
        match alpha {
            255 => return src,
            0 => return dst,
            _ => {}
        }
        // Marker colors can't be mixed; pick the dominant side.
        if src.is_marker() {
            return if alpha >= 128 { src } else { dst };
        }
        let (dr, dg, db) = if dst.is_marker() {
            (0i32, 0i32, 0i32)
        } else {
            (dst.r as i32, dst.g as i32, dst.b as i32)
        };

        let a = alpha as i32;
        let inv = 255 - a;
        let mix = |s: i16, d: i32| ((s as i32 * a + d * inv + 127) / 255).clamp(0, 255) as i16;

        Self {
            r: mix(src.r, dr),
            g: mix(src.g, dg),
            b: mix(src.b, db),
            a: 255,
        }
    }

    /// Scale this color's alpha by `opacity` (0-255).
    #[inline]
    pub fn with_opacity(self, opacity: u8) -> Self {
        if opacity == 255 || self.is_marker() {
            return self;
        }
        Self {
            a: (self.a as i32 * opacity as i32 / 255) as i16,
            ..self
        }
    }

    /// Parse hex color string (#RGB, #RRGGBB, #RRGGBBAA).
    ///
    /// Returns None for invalid format.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim().trim_start_matches('#');

        fn hex_digit(c: u8) -> Option<u8> {
            match c {
                b'0'..=b'9' => Some(c - b'0'),
                b'a'..=b'f' => Some(c - b'a' + 10),
                b'A'..=b'F' => Some(c - b'A' + 10),
                _ => None,
            }
        }

        fn hex_byte(s: &[u8], i: usize) -> Option<u8> {
            let high = hex_digit(s[i])?;
            let low = hex_digit(s[i + 1])?;
            Some((high << 4) | low)
        }

        let bytes = hex.as_bytes();
        match bytes.len() {
            // #RGB -> expand to #RRGGBB
            3 => {
                let r = hex_digit(bytes[0])?;
                let g = hex_digit(bytes[1])?;
                let b = hex_digit(bytes[2])?;
                Some(Self::rgb(r * 17, g * 17, b * 17))
            }
            6 => Some(Self::rgb(
                hex_byte(bytes, 0)?,
                hex_byte(bytes, 2)?,
                hex_byte(bytes, 4)?,
            )),
            8 => Some(Self::new(
                hex_byte(bytes, 0)?,
                hex_byte(bytes, 2)?,
                hex_byte(bytes, 4)?,
                hex_byte(bytes, 6)?,
            )),
            _ => None,
        }
    }
}

// =============================================================================
// Cell Attributes (bitflags)
// =============================================================================

bitflags::bitflags! {
    /// Text attributes as a bitfield for efficient storage and comparison.
    ///
    /// Combine with bitwise OR: `Attr::BOLD | Attr::ITALIC`
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Attr: u8 {
        const NONE = 0;
        const BOLD = 1 << 0;
        const DIM = 1 << 1;
        const ITALIC = 1 << 2;
        const UNDERLINE = 1 << 3;
        const BLINK = 1 << 4;
        const INVERSE = 1 << 5;
        const HIDDEN = 1 << 6;
        const STRIKETHROUGH = 1 << 7;
    }
}

// =============================================================================
// Style - the part of a cell that drives SGR output
// =============================================================================

/// Foreground, background and attributes of a cell.
///
/// Two cells with equal `Style` belong to the same styled run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Style {
    pub fg: Rgba,
    pub bg: Rgba,
    pub attrs: Attr,
}

impl Style {
    pub const fn new(fg: Rgba, bg: Rgba, attrs: Attr) -> Self {
        Self { fg, bg, attrs }
    }
}

impl Default for Style {
    fn default() -> Self {
        Self::new(Rgba::TERMINAL_DEFAULT, Rgba::TERMINAL_DEFAULT, Attr::NONE)
    }
}

// =============================================================================
// Cell - The atomic unit of terminal rendering
// =============================================================================

/// A single terminal cell.
///
/// `ch` holds one grapheme cluster. The empty grapheme marks the
/// continuation half of a wide glyph drawn in the cell to its left.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    pub ch: CompactString,
    pub fg: Rgba,
    pub bg: Rgba,
    pub attrs: Attr,
}

impl Cell {
    /// A space with the given style.
    pub fn blank(fg: Rgba, bg: Rgba) -> Self {
        Self {
            ch: CompactString::const_new(" "),
            fg,
            bg,
            attrs: Attr::NONE,
        }
    }

    /// A cell holding `grapheme`.
    pub fn new(grapheme: &str, fg: Rgba, bg: Rgba, attrs: Attr) -> Self {
        Self {
            ch: CompactString::new(grapheme),
            fg,
            bg,
            attrs,
        }
    }

    /// Placeholder for the right half of a wide glyph.
    pub fn continuation(fg: Rgba, bg: Rgba, attrs: Attr) -> Self {
        Self {
            ch: CompactString::const_new(""),
            fg,
            bg,
            attrs,
        }
    }

    /// Whether this is a wide-glyph continuation placeholder.
    #[inline]
    pub fn is_continuation(&self) -> bool {
        self.ch.is_empty()
    }

    /// Whether the glyph is a plain space.
    #[inline]
    pub fn is_blank(&self) -> bool {
        self.ch == " "
    }

    #[inline]
    pub fn style(&self) -> Style {
        Style::new(self.fg, self.bg, self.attrs)
    }
}

impl Default for Cell {
    fn default() -> Self {
        Self::blank(Rgba::TERMINAL_DEFAULT, Rgba::TERMINAL_DEFAULT)
    }
}

// =============================================================================
// Rect - bounds and clip regions
// =============================================================================

/// An axis-aligned rectangle in cell coordinates.
///
/// Positions are signed: nodes may sit partly off-screen after layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u16,
    pub height: u16,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: u16, height: u16) -> Self {
        Self { x, y, width, height }
    }

    #[inline]
    pub const fn right(&self) -> i32 {
        self.x + self.width as i32
    }

    #[inline]
    pub const fn bottom(&self) -> i32 {
        self.y + self.height as i32
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Check if a point is inside this rect.
    #[inline]
    pub const fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    /// Compute intersection of two rects.
    pub fn intersect(&self, other: &Rect) -> Option<Rect> {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = self.right().min(other.right());
        let y2 = self.bottom().min(other.bottom());

        if x2 > x1 && y2 > y1 {
            Some(Rect::new(x1, y1, (x2 - x1) as u16, (y2 - y1) as u16))
        } else {
            None
        }
    }

    /// The same rect moved by (dx, dy).
    #[inline]
    pub const fn translate(&self, dx: i32, dy: i32) -> Rect {
        Rect::new(self.x + dx, self.y + dy, self.width, self.height)
    }

    /// Shrink by insets. Collapses to zero size rather than underflowing.
    pub fn inset(&self, insets: Insets) -> Rect {
        let horiz = insets.left as i32 + insets.right as i32;
        let vert = insets.top as i32 + insets.bottom as i32;
        Rect::new(
            self.x + insets.left as i32,
            self.y + insets.top as i32,
            (self.width as i32 - horiz).max(0) as u16,
            (self.height as i32 - vert).max(0) as u16,
        )
    }

    /// Distance from a point to this rect as (rows, columns).
    ///
    /// Both components are zero when the point is inside.
    pub fn distance_to(&self, x: i32, y: i32) -> (u32, u32) {
        let axis = |v: i32, lo: i32, hi: i32| -> u32 {
            if v < lo {
                (lo - v) as u32
            } else if v >= hi {
                (v - hi + 1) as u32
            } else {
                0
            }
        };
        (axis(y, self.y, self.bottom()), axis(x, self.x, self.right()))
    }
}

/// Space between a node's bounds and its content box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Insets {
    pub top: u16,
    pub right: u16,
    pub bottom: u16,
    pub left: u16,
}

impl Insets {
    pub const ZERO: Self = Self::all(0);

    pub const fn all(n: u16) -> Self {
        Self {
            top: n,
            right: n,
            bottom: n,
            left: n,
        }
    }
}

// =============================================================================
// Border Styles
// =============================================================================

/// Border style constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum BorderStyle {
    #[default]
    None = 0,
    /// ─ │ ┌ ┐ └ ┘
    Single = 1,
    /// ═ ║ ╔ ╗ ╚ ╝
    Double = 2,
    /// ─ │ ╭ ╮ ╰ ╯
    Rounded = 3,
    /// ━ ┃ ┏ ┓ ┗ ┛
    Bold = 4,
    /// ┄ ┆ ┌ ┐ └ ┘
    Dashed = 5,
    /// - | + + + +
    Ascii = 6,
    /// █ █ █ █ █ █
    Block = 7,
}

impl BorderStyle {
    /// Get the border characters for this style.
    ///
    /// Returns: (horizontal, vertical, top_left, top_right, bottom_right, bottom_left)
    pub const fn chars(&self) -> (&'static str, &'static str, &'static str, &'static str, &'static str, &'static str) {
        match self {
            Self::None => (" ", " ", " ", " ", " ", " "),
            Self::Single => ("─", "│", "┌", "┐", "┘", "└"),
            Self::Double => ("═", "║", "╔", "╗", "╝", "╚"),
            Self::Rounded => ("─", "│", "╭", "╮", "╯", "╰"),
            Self::Bold => ("━", "┃", "┏", "┓", "┛", "┗"),
            Self::Dashed => ("┄", "┆", "┌", "┐", "┘", "└"),
            Self::Ascii => ("-", "|", "+", "+", "+", "+"),
            Self::Block => ("█", "█", "█", "█", "█", "█"),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
