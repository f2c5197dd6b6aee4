//! Terminal setup and teardown.
//!
//! [`TerminalGuard`] enters raw mode, the alternate screen and mouse
//! tracking, and restores all of it when released. Restoration runs
//! exactly once per acquisition, whichever exit path comes first:
//! `Engine::stop`, `Drop`, or a panic (through the installed panic hook).
//!
//! Raw mode goes through crossterm; everything else is our own ANSI
//! sequences from [`ansi`](crate::renderer::ansi).

use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Once;

use crossterm::terminal;

use crate::config::EngineConfig;
use crate::renderer::{ansi, OutputBuffer};

/// Set while the terminal is in engine mode.
static ACTIVE: AtomicBool = AtomicBool::new(false);
static ALT_SCREEN: AtomicBool = AtomicBool::new(false);
static MOUSE: AtomicBool = AtomicBool::new(false);
static PANIC_HOOK: Once = Once::new();

const BRACKETED_PASTE_ON: &str = "\x1b[?2004h";
const BRACKETED_PASTE_OFF: &str = "\x1b[?2004l";
const FOCUS_REPORTING_ON: &str = "\x1b[?1004h";
const FOCUS_REPORTING_OFF: &str = "\x1b[?1004l";

/// Scoped ownership of the terminal.
#[derive(Debug)]
pub struct TerminalGuard {
    released: bool,
}

impl TerminalGuard {
    /// Put the terminal into engine mode.
    pub fn acquire(config: &EngineConfig) -> io::Result<Self> {
        install_panic_hook();

        terminal::enable_raw_mode()?;
        ALT_SCREEN.store(config.alternate_screen, Ordering::SeqCst);
        MOUSE.store(config.mouse, Ordering::SeqCst);
        ACTIVE.store(true, Ordering::SeqCst);

        let mut out = setup_sequence(config.alternate_screen, config.mouse)?;
        if let Err(err) = out.flush_to(&mut io::stdout()) {
            let _ = restore_terminal();
            return Err(err);
        }

        tracing::debug!(
            alternate_screen = config.alternate_screen,
            mouse = config.mouse,
            "terminal acquired"
        );
        Ok(Self { released: false })
    }

    /// Restore the terminal now. Later calls (and `Drop`) do nothing.
    pub fn release(&mut self) -> io::Result<()> {
        if std::mem::replace(&mut self.released, true) {
            return Ok(());
        }
        restore_terminal()
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = self.release();
    }
}

/// Restore the terminal if it is still in engine mode.
///
/// Safe to call from any exit path; only the first call after an
/// acquisition writes anything.
pub fn restore_terminal() -> io::Result<()> {
    if !ACTIVE.swap(false, Ordering::SeqCst) {
        return Ok(());
    }
    let alt = ALT_SCREEN.load(Ordering::SeqCst);
    let mouse = MOUSE.load(Ordering::SeqCst);

    let mut out = restore_sequence(alt, mouse)?;
    let mut stdout = io::stdout();
    let written = out.flush_to(&mut stdout);
    let raw = terminal::disable_raw_mode();
    let _ = stdout.flush();
    tracing::debug!("terminal restored");
    written.and(raw)
}

fn install_panic_hook() {
    PANIC_HOOK.call_once(|| {
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            let _ = restore_terminal();
            previous(info);
        }));
    });
}

/// Bytes that put the terminal into engine mode.
pub fn setup_sequence(alternate_screen: bool, mouse: bool) -> io::Result<OutputBuffer> {
    let mut out = OutputBuffer::with_capacity(128);
    if alternate_screen {
        ansi::enter_alt_screen(&mut out)?;
    }
    ansi::cursor_hide(&mut out)?;
    ansi::clear_screen(&mut out)?;
    if mouse {
        ansi::enable_mouse(&mut out)?;
    }
    out.write_str(BRACKETED_PASTE_ON);
    out.write_str(FOCUS_REPORTING_ON);
    Ok(out)
}

/// Bytes that undo [`setup_sequence`], in reverse order.
pub fn restore_sequence(alternate_screen: bool, mouse: bool) -> io::Result<OutputBuffer> {
    let mut out = OutputBuffer::with_capacity(128);
    out.write_str(FOCUS_REPORTING_OFF);
    out.write_str(BRACKETED_PASTE_OFF);
    if mouse {
        ansi::disable_mouse(&mut out)?;
    }
    ansi::end_sync(&mut out)?;
    ansi::reset(&mut out)?;
    ansi::cursor_show(&mut out)?;
    if alternate_screen {
        ansi::exit_alt_screen(&mut out)?;
    }
    Ok(out)
}
