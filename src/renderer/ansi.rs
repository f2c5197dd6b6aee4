//! ANSI escape sequences for terminal control.
//!
//! This module provides all the escape sequences needed for terminal rendering:
//! - Cursor movement, shape and visibility
//! - Screen clearing and the alternate screen
//! - Colors (ANSI 16, 256, and TrueColor)
//! - Text attributes (bold, italic, underline, etc.)
//! - Mouse tracking control
//! - Synchronized output for flicker-free rendering

use std::io::Write;

use crate::types::{Attr, Rgba, Style};

// =============================================================================
// Cursor
// =============================================================================

/// Move cursor to absolute position (0-indexed in, 1-indexed on the wire).
#[inline]
pub fn cursor_to<W: Write>(w: &mut W, x: u16, y: u16) -> std::io::Result<()> {
    write!(w, "\x1b[{};{}H", y as u32 + 1, x as u32 + 1)
}

/// Hide cursor.
#[inline]
pub fn cursor_hide<W: Write>(w: &mut W) -> std::io::Result<()> {
    write!(w, "\x1b[?25l")
}

/// Show cursor.
#[inline]
pub fn cursor_show<W: Write>(w: &mut W) -> std::io::Result<()> {
    write!(w, "\x1b[?25h")
}

/// Cursor shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorShape {
    Block,
    Underline,
    Bar,
}

/// Set cursor shape (DECSCUSR).
#[inline]
pub fn cursor_shape<W: Write>(w: &mut W, shape: CursorShape, blinking: bool) -> std::io::Result<()> {
    let n = match (shape, blinking) {
        (CursorShape::Block, true) => 1,
        (CursorShape::Block, false) => 2,
        (CursorShape::Underline, true) => 3,
        (CursorShape::Underline, false) => 4,
        (CursorShape::Bar, true) => 5,
        (CursorShape::Bar, false) => 6,
    };
    write!(w, "\x1b[{} q", n)
}

// =============================================================================
// Screen Control
// =============================================================================

/// Clear entire screen (viewport only).
#[inline]
pub fn erase_screen<W: Write>(w: &mut W) -> std::io::Result<()> {
    write!(w, "\x1b[2J")
}

/// Clear screen and scrollback buffer, cursor home.
#[inline]
pub fn clear_screen<W: Write>(w: &mut W) -> std::io::Result<()> {
    write!(w, "\x1b[2J\x1b[3J\x1b[H")
}

/// Enter alternate screen buffer (fullscreen mode).
#[inline]
pub fn enter_alt_screen<W: Write>(w: &mut W) -> std::io::Result<()> {
    write!(w, "\x1b[?1049h")
}

/// Exit alternate screen buffer.
#[inline]
pub fn exit_alt_screen<W: Write>(w: &mut W) -> std::io::Result<()> {
    write!(w, "\x1b[?1049l")
}

/// Set the terminal's default background color (OSC 11).
pub fn set_background<W: Write>(w: &mut W, color: Rgba) -> std::io::Result<()> {
    if color.is_terminal_default() || color.is_ansi() {
        return reset_background(w);
    }
    write!(
        w,
        "\x1b]11;#{:02x}{:02x}{:02x}\x07",
        color.r, color.g, color.b
    )
}

/// Restore the terminal's own default background (OSC 111).
#[inline]
pub fn reset_background<W: Write>(w: &mut W) -> std::io::Result<()> {
    write!(w, "\x1b]111\x07")
}

// =============================================================================
// Synchronized Output (Flicker Prevention)
// =============================================================================

/// Begin synchronized output (terminal buffers until end_sync).
#[inline]
pub fn begin_sync<W: Write>(w: &mut W) -> std::io::Result<()> {
    write!(w, "\x1b[?2026h")
}

/// End synchronized output (terminal flushes buffer).
#[inline]
pub fn end_sync<W: Write>(w: &mut W) -> std::io::Result<()> {
    write!(w, "\x1b[?2026l")
}

// =============================================================================
// Colors and Attributes
// =============================================================================

/// Reset all attributes and colors.
#[inline]
pub fn reset<W: Write>(w: &mut W) -> std::io::Result<()> {
    write!(w, "\x1b[0m")
}

/// Set foreground color.
#[inline]
pub fn fg<W: Write>(w: &mut W, color: Rgba) -> std::io::Result<()> {
    write!(w, "\x1b[")?;
    fg_params(w, color)?;
    write!(w, "m")
}

/// Set background color.
#[inline]
pub fn bg<W: Write>(w: &mut W, color: Rgba) -> std::io::Result<()> {
    write!(w, "\x1b[")?;
    bg_params(w, color)?;
    write!(w, "m")
}

/// Set text attributes from bitflags.
pub fn attrs<W: Write>(w: &mut W, attr: Attr) -> std::io::Result<()> {
    if attr.is_empty() {
        return Ok(());
    }
    write!(w, "\x1b[")?;
    attr_params(w, attr, true)?;
    write!(w, "m")
}

/// Emit a complete style as a single SGR sequence.
///
/// Starts with `0` so the result never depends on the previous state:
/// `ESC [ 0 ; attrs ; fg ; bg m`.
pub fn style<W: Write>(w: &mut W, style: Style) -> std::io::Result<()> {
    write!(w, "\x1b[0")?;
    attr_params(w, style.attrs, false)?;
    write!(w, ";")?;
    fg_params(w, style.fg)?;
    write!(w, ";")?;
    bg_params(w, style.bg)?;
    write!(w, "m")
}

fn fg_params<W: Write>(w: &mut W, color: Rgba) -> std::io::Result<()> {
    if color.is_terminal_default() {
        write!(w, "39")
    } else if color.is_ansi() {
        let index = color.ansi_index();
        if index < 8 {
            // Standard colors: 30-37
            write!(w, "{}", 30 + index)
        } else if index < 16 {
            // Bright colors: 90-97
            write!(w, "{}", 90 + index - 8)
        } else {
            write!(w, "38;5;{}", index)
        }
    } else {
        write!(w, "38;2;{};{};{}", color.r, color.g, color.b)
    }
}

fn bg_params<W: Write>(w: &mut W, color: Rgba) -> std::io::Result<()> {
    if color.is_terminal_default() {
        write!(w, "49")
    } else if color.is_ansi() {
        let index = color.ansi_index();
        if index < 8 {
            write!(w, "{}", 40 + index)
        } else if index < 16 {
            write!(w, "{}", 100 + index - 8)
        } else {
            write!(w, "48;5;{}", index)
        }
    } else {
        write!(w, "48;2;{};{};{}", color.r, color.g, color.b)
    }
}

fn attr_params<W: Write>(w: &mut W, attr: Attr, leading: bool) -> std::io::Result<()> {
    let mut first = leading;
    for (flag, code) in [
        (Attr::BOLD, 1),
        (Attr::DIM, 2),
        (Attr::ITALIC, 3),
        (Attr::UNDERLINE, 4),
        (Attr::BLINK, 5),
        (Attr::INVERSE, 7),
        (Attr::HIDDEN, 8),
        (Attr::STRIKETHROUGH, 9),
    ] {
        if attr.contains(flag) {
            if !first {
                write!(w, ";")?;
            }
            write!(w, "{}", code)?;
            first = false;
        }
    }
    Ok(())
}

// =============================================================================
// Mouse Support
// =============================================================================

/// Enable mouse tracking (button + drag events, SGR extended coordinates).
#[inline]
pub fn enable_mouse<W: Write>(w: &mut W) -> std::io::Result<()> {
    write!(w, "\x1b[?1000h\x1b[?1002h\x1b[?1006h")
}

/// Disable mouse tracking.
#[inline]
pub fn disable_mouse<W: Write>(w: &mut W) -> std::io::Result<()> {
    write!(w, "\x1b[?1006l\x1b[?1002l\x1b[?1000l")
}

// =============================================================================
// Tests
// =============================================================================
