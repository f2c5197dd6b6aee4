//! Input events and crossterm conversion.
//!
//! Bridges crossterm's event system with the engine. The engine only ever
//! sees [`InputEvent`]; crossterm types stop here.
//!
//! # API
//!
//! - `convert_event` - Convert any crossterm event
//! - `convert_key_event` / `convert_mouse_event` - Per-kind conversion
//! - `poll_event` - Event check with timeout
//! - `read_event` - Blocking event read

use std::time::Duration;

use crossterm::event::{
    poll, read, Event as CrosstermEvent, KeyCode, KeyEvent as CrosstermKeyEvent, KeyEventKind,
    KeyModifiers, MouseButton as CrosstermMouseButton, MouseEvent as CrosstermMouseEvent,
    MouseEventKind,
};

// =============================================================================
// Key Events
// =============================================================================

/// A decoded key press.
///
/// `name` is a lowercase key name (`"tab"`, `"escape"`, `"up"`, `"f5"`) or
/// the typed character itself. `sequence` is the text the key produces,
/// empty for non-printing keys.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KeyEvent {
    pub name: String,
    pub ctrl: bool,
    pub shift: bool,
    pub meta: bool,
    pub option: bool,
    pub sequence: String,
}

impl KeyEvent {
    /// Create a plain key press.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let sequence = if name.chars().count() == 1 {
            name.clone()
        } else {
            String::new()
        };
        Self {
            name,
            sequence,
            ..Self::default()
        }
    }

    pub fn with_ctrl(mut self) -> Self {
        self.ctrl = true;
        self
    }

    pub fn with_shift(mut self) -> Self {
        self.shift = true;
        self
    }

    pub fn with_meta(mut self) -> Self {
        self.meta = true;
        self
    }

    /// The lookup string for key bindings: `ctrl+`, `meta+`, `option+`,
    /// `shift+` prefixes (in that order) followed by the name.
    ///
    /// `KeyEvent::new("tab").with_shift().chord() == "shift+tab"`
    pub fn chord(&self) -> String {
        let mut chord = String::with_capacity(self.name.len() + 8);
        if self.ctrl {
            chord.push_str("ctrl+");
        }
        if self.meta {
            chord.push_str("meta+");
        }
        if self.option {
            chord.push_str("option+");
        }
        if self.shift {
            chord.push_str("shift+");
        }
        chord.push_str(&self.name);
        chord
    }

    /// Ctrl+C, the conventional exit chord.
    pub fn is_interrupt(&self) -> bool {
        self.ctrl && self.name == "c"
    }
}

// =============================================================================
// Pointer Events
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollDirection {
    Up,
    Down,
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerKind {
    Down,
    Drag,
    Up,
    Move,
    Scroll(ScrollDirection),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PointerButton {
    Left,
    Right,
    Middle,
    #[default]
    None,
}

/// Modifier keys held during a pointer event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub ctrl: bool,
    pub shift: bool,
    pub meta: bool,
    pub option: bool,
}

/// A pointer event in cell coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointerEvent {
    pub kind: PointerKind,
    pub x: u16,
    pub y: u16,
    pub button: PointerButton,
    pub modifiers: Modifiers,
}

impl PointerEvent {
    pub fn new(kind: PointerKind, x: u16, y: u16) -> Self {
        let button = match kind {
            PointerKind::Down | PointerKind::Drag | PointerKind::Up => PointerButton::Left,
            PointerKind::Move | PointerKind::Scroll(_) => PointerButton::None,
        };
        Self {
            kind,
            x,
            y,
            button,
            modifiers: Modifiers::default(),
        }
    }

    pub fn down(x: u16, y: u16) -> Self {
        Self::new(PointerKind::Down, x, y)
    }

    pub fn drag(x: u16, y: u16) -> Self {
        Self::new(PointerKind::Drag, x, y)
    }

    pub fn up(x: u16, y: u16) -> Self {
        Self::new(PointerKind::Up, x, y)
    }
}

// =============================================================================
// Input Event
// =============================================================================

/// Unified event type for the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    Key(KeyEvent),
    Pointer(PointerEvent),
    /// Terminal resize (new width, height)
    Resize(u16, u16),
    Paste(String),
    FocusGained,
    FocusLost,
    /// No event or unhandled event type
    None,
}

// =============================================================================
// Conversion
// =============================================================================

/// Convert any crossterm event.
pub fn convert_event(event: CrosstermEvent) -> InputEvent {
    match event {
        CrosstermEvent::Key(key) => match convert_key_event(key) {
            Some(key) => InputEvent::Key(key),
            None => InputEvent::None,
        },
        CrosstermEvent::Mouse(mouse) => InputEvent::Pointer(convert_mouse_event(mouse)),
        CrosstermEvent::Resize(w, h) => InputEvent::Resize(w, h),
        CrosstermEvent::Paste(text) => InputEvent::Paste(text),
        CrosstermEvent::FocusGained => InputEvent::FocusGained,
        CrosstermEvent::FocusLost => InputEvent::FocusLost,
    }
}

/// Convert a crossterm key event. Release events are dropped.
pub fn convert_key_event(event: CrosstermKeyEvent) -> Option<KeyEvent> {
    if event.kind == KeyEventKind::Release {
        return None;
    }

    let (name, sequence) = match event.code {
        KeyCode::Char(c) => (c.to_string(), c.to_string()),
        KeyCode::Enter => ("return".to_string(), "\r".to_string()),
        KeyCode::Tab => ("tab".to_string(), "\t".to_string()),
        KeyCode::BackTab => ("backtab".to_string(), String::new()),
        KeyCode::Backspace => ("backspace".to_string(), String::new()),
        KeyCode::Delete => ("delete".to_string(), String::new()),
        KeyCode::Esc => ("escape".to_string(), "\x1b".to_string()),
        KeyCode::Up => ("up".to_string(), String::new()),
        KeyCode::Down => ("down".to_string(), String::new()),
        KeyCode::Left => ("left".to_string(), String::new()),
        KeyCode::Right => ("right".to_string(), String::new()),
        KeyCode::Home => ("home".to_string(), String::new()),
        KeyCode::End => ("end".to_string(), String::new()),
        KeyCode::PageUp => ("pageup".to_string(), String::new()),
        KeyCode::PageDown => ("pagedown".to_string(), String::new()),
        KeyCode::Insert => ("insert".to_string(), String::new()),
        KeyCode::F(n) => (format!("f{}", n), String::new()),
        _ => return None,
    };

    let mods = convert_modifiers(event.modifiers);
    Some(KeyEvent {
        name,
        ctrl: mods.ctrl,
        shift: mods.shift,
        meta: mods.meta,
        option: mods.option,
        sequence,
    })
}

/// Convert a crossterm mouse event.
pub fn convert_mouse_event(event: CrosstermMouseEvent) -> PointerEvent {
    let (kind, button) = match event.kind {
        MouseEventKind::Down(btn) => (PointerKind::Down, convert_mouse_button(btn)),
        MouseEventKind::Up(btn) => (PointerKind::Up, convert_mouse_button(btn)),
        MouseEventKind::Drag(btn) => (PointerKind::Drag, convert_mouse_button(btn)),
        MouseEventKind::Moved => (PointerKind::Move, PointerButton::None),
        MouseEventKind::ScrollUp => (PointerKind::Scroll(ScrollDirection::Up), PointerButton::None),
        MouseEventKind::ScrollDown => (PointerKind::Scroll(ScrollDirection::Down), PointerButton::None),
        MouseEventKind::ScrollLeft => (PointerKind::Scroll(ScrollDirection::Left), PointerButton::None),
        MouseEventKind::ScrollRight => (PointerKind::Scroll(ScrollDirection::Right), PointerButton::None),
    };

    PointerEvent {
        kind,
        x: event.column,
        y: event.row,
        button,
        modifiers: convert_modifiers(event.modifiers),
    }
}

fn convert_mouse_button(btn: CrosstermMouseButton) -> PointerButton {
    match btn {
        CrosstermMouseButton::Left => PointerButton::Left,
        CrosstermMouseButton::Right => PointerButton::Right,
        CrosstermMouseButton::Middle => PointerButton::Middle,
    }
}

/// Terminals report Alt as the meta key; crossterm's META/SUPER bits
/// (kitty protocol only) become `option`.
fn convert_modifiers(mods: KeyModifiers) -> Modifiers {
    Modifiers {
        ctrl: mods.contains(KeyModifiers::CONTROL),
        shift: mods.contains(KeyModifiers::SHIFT),
        meta: mods.contains(KeyModifiers::ALT),
        option: mods.intersects(KeyModifiers::META | KeyModifiers::SUPER),
    }
}

// =============================================================================
// Event Polling
// =============================================================================

/// Poll for an event with timeout.
/// Returns None if no event within timeout.
pub fn poll_event(timeout: Duration) -> std::io::Result<Option<InputEvent>> {
    if poll(timeout)? {
        Ok(Some(read_event()?))
    } else {
        Ok(None)
    }
}

/// Read the next event (blocking).
pub fn read_event() -> std::io::Result<InputEvent> {
    Ok(convert_event(read()?))
}

// =============================================================================
// Tests
// =============================================================================
