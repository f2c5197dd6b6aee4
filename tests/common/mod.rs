//! Minimal terminal model for integration tests.
//!
//! Understands exactly what the diff renderer emits: CUP (`CSI r;c H`),
//! SGR (`CSI ... m`), erase display (`CSI 2 J`) and UTF-8 text. Private
//! modes (`CSI ? n h/l`) are accepted and ignored. Overwriting half of a
//! wide glyph blanks the other half, as real terminals do.

#![allow(dead_code)]

use spark_compositor::renderer::grapheme_width;
use spark_compositor::{Attr, FrameBuffer, Rgba, Style};
use unicode_segmentation::UnicodeSegmentation;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenCell {
    pub ch: String,
    pub style: Style,
}

impl ScreenCell {
    fn blank() -> Self {
        Self {
            ch: " ".to_string(),
            style: Style::default(),
        }
    }

    pub fn is_continuation(&self) -> bool {
        self.ch.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct Screen {
    pub width: u16,
    pub height: u16,
    cells: Vec<ScreenCell>,
    cursor: (u16, u16),
    style: Style,
}

impl Screen {
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            cells: vec![ScreenCell::blank(); width as usize * height as usize],
            cursor: (0, 0),
            style: Style::default(),
        }
    }

    pub fn cell(&self, x: u16, y: u16) -> &ScreenCell {
        &self.cells[y as usize * self.width as usize + x as usize]
    }

    pub fn row_text(&self, y: u16) -> String {
        (0..self.width).map(|x| self.cell(x, y).ch.as_str()).collect()
    }

    /// Feed raw output bytes.
    pub fn replay(&mut self, bytes: &[u8]) {
        let text = String::from_utf8_lossy(bytes);
        let mut rest: &str = &text;
        while !rest.is_empty() {
            if let Some(after) = rest.strip_prefix("\x1b[") {
                let end = after
                    .find(|c: char| ('\x40'..='\x7e').contains(&c))
                    .expect("unterminated CSI");
                let params = &after[..end];
                let command = after[end..].chars().next().unwrap_or(' ');
                self.csi(params, command);
                rest = &after[end + command.len_utf8()..];
            } else if let Some(after) = rest.strip_prefix("\x1b]") {
                // OSC: skip to BEL
                let end = after.find('\x07').expect("unterminated OSC");
                rest = &after[end + 1..];
            } else {
                let end = rest.find('\x1b').unwrap_or(rest.len());
                for grapheme in rest[..end].graphemes(true) {
                    self.print(grapheme);
                }
                rest = &rest[end..];
            }
        }
    }

    /// Whether the screen shows exactly `buffer`. Continuation cells are
    /// compared by kind only; their style is the lead glyph's.
    pub fn matches(&self, buffer: &FrameBuffer) -> Result<(), String> {
        for y in 0..self.height {
            for x in 0..self.width {
                let want = buffer.get(x, y).ok_or("buffer smaller than screen")?;
                let have = self.cell(x, y);
                if want.is_continuation() {
                    if !have.is_continuation() {
                        return Err(format!("({x},{y}): expected continuation, got {have:?}"));
                    }
                    continue;
                }
                let style = Style::new(opaque(want.fg), opaque(want.bg), want.attrs);
                if have.ch != want.ch.as_str() || have.style != style {
                    return Err(format!("({x},{y}): expected {want:?}, got {have:?}"));
                }
            }
        }
        Ok(())
    }

    fn csi(&mut self, params: &str, command: char) {
        if params.starts_with('?') {
            return;
        }
        match command {
            'H' => {
                let mut parts = params.split(';').map(|p| p.parse::<u16>().unwrap_or(1));
                let row = parts.next().unwrap_or(1).max(1);
                let col = parts.next().unwrap_or(1).max(1);
                self.cursor = (col - 1, row - 1);
            }
            'J' => {
                for cell in &mut self.cells {
                    *cell = ScreenCell::blank();
                }
            }
            'm' => self.sgr(params),
            _ => {}
        }
    }

    fn sgr(&mut self, params: &str) {
        let codes: Vec<u16> = if params.is_empty() {
            vec![0]
        } else {
            params.split(';').map(|p| p.parse().unwrap_or(0)).collect()
        };
        let mut i = 0;
        while i < codes.len() {
            match codes[i] {
                0 => self.style = Style::default(),
                1 => self.style.attrs |= Attr::BOLD,
                2 => self.style.attrs |= Attr::DIM,
                3 => self.style.attrs |= Attr::ITALIC,
                4 => self.style.attrs |= Attr::UNDERLINE,
                5 => self.style.attrs |= Attr::BLINK,
                7 => self.style.attrs |= Attr::INVERSE,
                8 => self.style.attrs |= Attr::HIDDEN,
                9 => self.style.attrs |= Attr::STRIKETHROUGH,
                n @ 30..=37 => self.style.fg = Rgba::ansi((n - 30) as u8),
                n @ 40..=47 => self.style.bg = Rgba::ansi((n - 40) as u8),
                n @ 90..=97 => self.style.fg = Rgba::ansi((n - 90 + 8) as u8),
                n @ 100..=107 => self.style.bg = Rgba::ansi((n - 100 + 8) as u8),
                39 => self.style.fg = Rgba::TERMINAL_DEFAULT,
                49 => self.style.bg = Rgba::TERMINAL_DEFAULT,
                n @ (38 | 48) => {
                    let color = match codes.get(i + 1) {
                        Some(2) => {
                            let c = Rgba::rgb(codes[i + 2] as u8, codes[i + 3] as u8, codes[i + 4] as u8);
                            i += 4;
                            c
                        }
                        Some(5) => {
                            let c = Rgba::ansi(codes[i + 2] as u8);
                            i += 2;
                            c
                        }
                        other => panic!("bad extended color {other:?}"),
                    };
                    if n == 38 {
                        self.style.fg = color;
                    } else {
                        self.style.bg = color;
                    }
                }
                _ => {}
            }
            i += 1;
        }
    }

    fn print(&mut self, grapheme: &str) {
        let (x, y) = self.cursor;
        let width = grapheme_width(grapheme).max(1) as u16;
        if y >= self.height || x >= self.width {
            self.cursor.0 = x.saturating_add(width);
            return;
        }
        let end = (x + width).min(self.width);
        self.detach(x, end);

        let index = y as usize * self.width as usize + x as usize;
        self.cells[index] = ScreenCell {
            ch: grapheme.to_string(),
            style: self.style,
        };
        if width == 2 && x + 1 < self.width {
            self.cells[index + 1] = ScreenCell {
                ch: String::new(),
                style: self.style,
            };
        }
        self.cursor.0 = x + width;
    }

    /// Blank the halves of wide glyphs that stick out of `[from, to)`.
    fn detach(&mut self, from: u16, to: u16) {
        let y = self.cursor.1 as usize;
        let row = y * self.width as usize;
        if self.cells[row + from as usize].is_continuation() && from > 0 {
            self.cells[row + from as usize - 1].ch = " ".to_string();
        }
        let last = to - 1;
        if last + 1 < self.width && self.cells[row + last as usize + 1].is_continuation() {
            self.cells[row + last as usize + 1].ch = " ".to_string();
        }
    }
}

/// Alpha is not sent over the wire.
fn opaque(color: Rgba) -> Rgba {
    if color.is_terminal_default() || color.is_ansi() {
        color
    } else {
        Rgba::rgb(color.r as u8, color.g as u8, color.b as u8)
    }
}
