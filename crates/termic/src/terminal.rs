// SPDX-License-Identifier: MIT
//
// Terminal mode control: termios, alternate screen, reporting toggles.
//
// Safety: termios (tcgetattr, tcsetattr), ioctl (TIOCGWINSZ), isatty and
// the raw fd write in the panic hook are POSIX FFI calls. Each unsafe block
// wraps exactly one of them on memory owned by the caller.
#![allow(unsafe_code)]
//
// `Terminal::init` puts the terminal into the state a full-screen
// application needs: no echo, no line buffering, alternate screen, and the
// mouse/focus reports selected by `Options`. `restore` undoes it in reverse
// and runs on drop.
//
// A panic while the terminal is in this state would leave the user's shell
// without echo. The panic hook writes a fixed restore sequence straight to
// fd 1, bypassing the stdout lock (the panic may have happened while it
// was held), resets termios from a global backup, then hands over to the
// previous hook.

use std::io::{self, Write};
#[cfg(unix)]
use std::os::fd::RawFd;
#[cfg(unix)]
use std::sync::Mutex;
use std::sync::Once;

use bitflags::bitflags;

use crate::ansi;
use crate::error::{Error, Result};

pub use crate::buffer::Size;

// ─── Options ─────────────────────────────────────────────────────────────────

bitflags! {
    /// Terminal features switched on by [`Terminal::init`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct Options: u8 {
        /// Hide the text cursor while the application runs.
        const HIDE_CURSOR         = 0b0000_0001;
        /// Report button presses, releases and drags.
        const MOUSE_BUTTON_EVENTS = 0b0000_0010;
        /// Report pointer motion with no button held.
        const MOUSE_MOVE_EVENTS   = 0b0000_0100;
        const MOUSE_EVENTS        = Self::MOUSE_BUTTON_EVENTS.bits() | Self::MOUSE_MOVE_EVENTS.bits();
        /// Report focus gain and loss.
        const FOCUS_EVENTS        = 0b0000_1000;
        /// Leave ISIG off so Ctrl+C, Ctrl+Z and Ctrl+\ arrive as keys.
        const NO_SIGNAL_DECODE    = 0b0001_0000;
    }
}

// ─── Queries ─────────────────────────────────────────────────────────────────

/// Size of the terminal behind `fd` via `ioctl(TIOCGWINSZ)`.
///
/// Returns `{0, 0}` when `fd` is not a terminal or the query fails. Callers
/// treat that as "unknown".
#[cfg(unix)]
#[must_use]
pub fn terminal_size(fd: RawFd) -> Size {
    // SAFETY: winsize is plain old data, zero is a valid bit pattern.
    let mut ws: libc::winsize = unsafe { std::mem::zeroed() };
    // SAFETY: TIOCGWINSZ writes one winsize through the pointer.
    let rc = unsafe { libc::ioctl(fd, libc::TIOCGWINSZ, &raw mut ws) };
    if rc == 0 {
        Size::new(ws.ws_col, ws.ws_row)
    } else {
        Size::default()
    }
}

/// Whether standard input is attached to a terminal.
#[cfg(unix)]
#[must_use]
pub fn is_tty() -> bool {
    // SAFETY: isatty only inspects the descriptor.
    unsafe { libc::isatty(libc::STDIN_FILENO) != 0 }
}

#[cfg(not(unix))]
#[must_use]
pub fn is_tty() -> bool {
    false
}

// ─── Panic-Safe Restore ──────────────────────────────────────────────────────

/// Termios saved by [`Terminal::init`], for the panic hook.
#[cfg(unix)]
static TERMIOS_BACKUP: Mutex<Option<libc::termios>> = Mutex::new(None);

#[cfg(unix)]
fn restore_termios_from_backup() {
    if let Ok(guard) = TERMIOS_BACKUP.lock() {
        if let Some(ref original) = *guard {
            // SAFETY: `original` came from tcgetattr on the same descriptor.
            unsafe {
                let _ = libc::tcsetattr(libc::STDIN_FILENO, libc::TCSANOW, original);
            }
        }
    }
}

/// Everything [`Terminal::init`] may have switched on, switched off.
/// Leaving the alternate screen comes last.
#[rustfmt::skip]
const EMERGENCY_RESTORE: &[u8] = b"\
    \x1b[?2026l\
    \x1b[?1003l\
    \x1b[?1000l\x1b[?1002l\x1b[?1015l\x1b[?1006l\
    \x1b[?1004l\
    \x1b[0m\
    \x1b[?25h\
    \x1b[?1049l";

static PANIC_HOOK_INSTALLED: Once = Once::new();

fn install_panic_hook() {
    PANIC_HOOK_INSTALLED.call_once(|| {
        let original = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            emergency_restore();

            #[cfg(unix)]
            restore_termios_from_backup();

            original(info);
        }));
    });
}

fn emergency_restore() {
    #[cfg(unix)]
    // SAFETY: writes a static byte string to stdout's descriptor.
    unsafe {
        let _ = libc::write(
            libc::STDOUT_FILENO,
            EMERGENCY_RESTORE.as_ptr().cast::<libc::c_void>(),
            EMERGENCY_RESTORE.len(),
        );
    }

    #[cfg(not(unix))]
    {
        let _ = io::stdout().write_all(EMERGENCY_RESTORE);
        let _ = io::stdout().flush();
    }
}

// ─── Mode Sequences ──────────────────────────────────────────────────────────

fn write_enter(w: &mut impl Write, options: Options) -> io::Result<()> {
    ansi::enter_alt_screen(w)?;
    ansi::clear_screen(w)?;
    if options.contains(Options::HIDE_CURSOR) {
        ansi::cursor_hide(w)?;
    }
    if options.intersects(Options::MOUSE_EVENTS) {
        ansi::enable_mouse_buttons(w)?;
    }
    if options.contains(Options::MOUSE_MOVE_EVENTS) {
        ansi::enable_mouse_motion(w)?;
    }
    if options.contains(Options::FOCUS_EVENTS) {
        ansi::enable_focus_reporting(w)?;
    }
    Ok(())
}

fn write_leave(w: &mut impl Write, options: Options) -> io::Result<()> {
    ansi::end_sync(w)?;
    if options.contains(Options::FOCUS_EVENTS) {
        ansi::disable_focus_reporting(w)?;
    }
    if options.contains(Options::MOUSE_MOVE_EVENTS) {
        ansi::disable_mouse_motion(w)?;
    }
    if options.intersects(Options::MOUSE_EVENTS) {
        ansi::disable_mouse_buttons(w)?;
    }
    ansi::reset(w)?;
    if options.contains(Options::HIDE_CURSOR) {
        ansi::cursor_show(w)?;
    }
    ansi::exit_alt_screen(w)
}

// ─── Terminal ────────────────────────────────────────────────────────────────

/// The controlling terminal in application mode. Restored on drop.
///
/// ```no_run
/// use termic::terminal::{Options, Terminal};
///
/// let term = Terminal::init(Options::HIDE_CURSOR | Options::MOUSE_EVENTS)?;
/// // ... draw, read input ...
/// drop(term);
/// # Ok::<(), termic::Error>(())
/// ```
pub struct Terminal {
    options: Options,
    #[cfg(unix)]
    original_termios: Option<libc::termios>,
    active: bool,
}

impl Terminal {
    /// Switch the terminal into application mode.
    ///
    /// # Errors
    ///
    /// [`Error::NotATerminal`] if standard input is not a terminal, or the
    /// I/O error from termios or the mode sequences.
    pub fn init(options: Options) -> Result<Self> {
        if !is_tty() {
            return Err(Error::NotATerminal);
        }

        install_panic_hook();

        let mut term = Self {
            options,
            #[cfg(unix)]
            original_termios: None,
            active: false,
        };
        term.enable_raw_mode()?;
        term.active = true;

        let stdout = io::stdout();
        let mut lock = stdout.lock();
        write_enter(&mut lock, options)?;
        lock.flush()?;

        log::debug!("terminal initialized with {options:?}");
        Ok(term)
    }

    #[must_use]
    pub const fn options(&self) -> Options {
        self.options
    }

    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Undo [`init`](Self::init). A second call is a no-op.
    ///
    /// # Errors
    ///
    /// The I/O error from writing the mode sequences or from termios.
    pub fn restore(&mut self) -> io::Result<()> {
        if !self.active {
            return Ok(());
        }
        self.active = false;

        let stdout = io::stdout();
        let mut lock = stdout.lock();
        write_leave(&mut lock, self.options)?;
        lock.flush()?;
        drop(lock);

        self.disable_raw_mode()?;
        log::debug!("terminal restored");
        Ok(())
    }

    // ── termios ───────────────────────────────────────────────────────

    #[cfg(unix)]
    fn enable_raw_mode(&mut self) -> io::Result<()> {
        let fd = libc::STDIN_FILENO;

        // SAFETY: termios is plain old data and tcgetattr fills it in.
        let mut termios: libc::termios = unsafe { std::mem::zeroed() };
        // SAFETY: `termios` is a valid, writable termios.
        if unsafe { libc::tcgetattr(fd, &raw mut termios) } != 0 {
            return Err(io::Error::last_os_error());
        }

        self.original_termios = Some(termios);
        if let Ok(mut guard) = TERMIOS_BACKUP.lock() {
            *guard = Some(termios);
        }

        termios.c_lflag &= !(libc::ECHO | libc::ICANON);
        if self.options.contains(Options::NO_SIGNAL_DECODE) {
            termios.c_lflag &= !libc::ISIG;
        }
        termios.c_cc[libc::VMIN] = 1;
        termios.c_cc[libc::VTIME] = 0;

        // SAFETY: `termios` is a valid termios derived from tcgetattr.
        if unsafe { libc::tcsetattr(fd, libc::TCSAFLUSH, &raw const termios) } != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    #[cfg(not(unix))]
    fn enable_raw_mode(&mut self) -> io::Result<()> {
        Ok(())
    }

    #[cfg(unix)]
    fn disable_raw_mode(&mut self) -> io::Result<()> {
        if let Some(original) = self.original_termios.take() {
            // SAFETY: `original` came from tcgetattr on stdin.
            if unsafe { libc::tcsetattr(libc::STDIN_FILENO, libc::TCSAFLUSH, &raw const original) }
                != 0
            {
                return Err(io::Error::last_os_error());
            }
            if let Ok(mut guard) = TERMIOS_BACKUP.lock() {
                *guard = None;
            }
        }
        Ok(())
    }

    #[cfg(not(unix))]
    fn disable_raw_mode(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for Terminal {
    fn drop(&mut self) {
        if let Err(e) = self.restore() {
            log::warn!("terminal restore failed: {e}");
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
