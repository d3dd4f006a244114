// SPDX-License-Identifier: MIT
//
// ANSI escape sequence generation.
//
// Pure functions that write escape sequences to any `impl Write`. No state,
// no decisions about when to emit; that's the `CursorState`'s job. This
// module only knows the byte-level encoding of every terminal command.
//
// All cursor positions are 0-indexed in our API and converted to 1-indexed
// for the terminal.
//
// All functions return `io::Result` propagated from the underlying writer.
// In practice they never fail when writing to `OutputBuffer` (a Vec).

use std::io::{self, Write};

use crate::cell::Style;
use crate::color::Color;

// ─── Cursor ──────────────────────────────────────────────────────────────────

/// Move the cursor to `(x, y)` with CUP (Cursor Position).
#[inline]
pub fn cursor_to(w: &mut impl Write, x: u16, y: u16) -> io::Result<()> {
    write!(w, "\x1b[{};{}H", u32::from(y) + 1, u32::from(x) + 1)
}

/// CUU: `n` rows up.
#[inline]
pub fn cursor_up(w: &mut impl Write, n: u16) -> io::Result<()> {
    write!(w, "\x1b[{n}A")
}

/// CUD: `n` rows down.
#[inline]
pub fn cursor_down(w: &mut impl Write, n: u16) -> io::Result<()> {
    write!(w, "\x1b[{n}B")
}

/// CUF: `n` columns right.
#[inline]
pub fn cursor_forward(w: &mut impl Write, n: u16) -> io::Result<()> {
    write!(w, "\x1b[{n}C")
}

/// CUB: `n` columns left.
#[inline]
pub fn cursor_back(w: &mut impl Write, n: u16) -> io::Result<()> {
    write!(w, "\x1b[{n}D")
}

/// Hide the cursor (DECTCEM reset).
#[inline]
pub fn cursor_hide(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?25l")
}

/// Show the cursor (DECTCEM set).
#[inline]
pub fn cursor_show(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?25h")
}

// ─── Screen ──────────────────────────────────────────────────────────────────

/// Clear the entire screen (ED 2).
#[inline]
pub fn clear_screen(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[2J")
}

/// Reset all SGR attributes to terminal defaults (SGR 0).
///
/// The stateful renderer must invalidate its tracked state after this.
#[inline]
pub fn reset(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[0m")
}

// ─── Colors ──────────────────────────────────────────────────────────────────

/// Set the foreground color. `NoChange` writes nothing.
pub fn fg(w: &mut impl Write, color: Color) -> io::Result<()> {
    match color {
        Color::Default => w.write_all(b"\x1b[39m"),
        Color::Rgb(r, g, b) => write!(w, "\x1b[38;2;{r};{g};{b}m"),
        Color::NoChange => Ok(()),
    }
}

/// Set the background color. `NoChange` writes nothing.
pub fn bg(w: &mut impl Write, color: Color) -> io::Result<()> {
    match color {
        Color::Default => w.write_all(b"\x1b[49m"),
        Color::Rgb(r, g, b) => write!(w, "\x1b[48;2;{r};{g};{b}m"),
        Color::NoChange => Ok(()),
    }
}

// ─── Style ───────────────────────────────────────────────────────────────────

/// Emit the SGR fragments that turn style `from` into style `to`.
///
/// Only the bits that differ are touched, as one CSI sequence:
/// `\x1b[3;24m` sets italic and clears underline. Bold and dim share the
/// clear code 22, so switching directly between them emits `22;1` or
/// `22;2`. Nothing is written when the effective styles match.
///
/// With `from = None` (terminal state unknown) the sequence starts from a
/// full reset: `\x1b[0;1;4m`. A reset also drops colors, so the caller
/// must forget its cached colors.
pub fn style(w: &mut impl Write, from: Option<Style>, to: Style) -> io::Result<()> {
    let to = to.effective();

    let Some(from) = from.map(Style::effective) else {
        w.write_all(b"\x1b[0")?;
        for (flag, code) in SET_CODES {
            if to.contains(flag) {
                w.write_all(b";")?;
                w.write_all(code)?;
            }
        }
        return w.write_all(b"m");
    };

    if from == to {
        return Ok(());
    }

    let mut first = true;
    let mut put = |w: &mut dyn Write, code: &str| -> io::Result<()> {
        w.write_all(if first { "\x1b[" } else { ";" }.as_bytes())?;
        first = false;
        w.write_all(code.as_bytes())
    };

    let (was_bold, was_dim) = (from.contains(Style::BOLD), from.contains(Style::DIM));
    let (is_bold, is_dim) = (to.contains(Style::BOLD), to.contains(Style::DIM));
    if is_bold && !was_bold {
        put(w, if was_dim { "22;1" } else { "1" })?;
    } else if is_dim && !was_dim {
        put(w, if was_bold { "22;2" } else { "2" })?;
    } else if !is_bold && !is_dim && (was_bold || was_dim) {
        put(w, "22")?;
    }

    for (flag, set, clear) in TOGGLE_CODES {
        match (from.contains(flag), to.contains(flag)) {
            (false, true) => put(w, set)?,
            (true, false) => put(w, clear)?,
            _ => {}
        }
    }

    if first { Ok(()) } else { w.write_all(b"m") }
}

const SET_CODES: [(Style, &[u8]); 6] = [
    (Style::BOLD, b"1"),
    (Style::DIM, b"2"),
    (Style::ITALIC, b"3"),
    (Style::UNDERLINE, b"4"),
    (Style::STRIKETHROUGH, b"9"),
    (Style::INVERSE, b"7"),
];

const TOGGLE_CODES: [(Style, &str, &str); 4] = [
    (Style::ITALIC, "3", "23"),
    (Style::UNDERLINE, "4", "24"),
    (Style::STRIKETHROUGH, "9", "29"),
    (Style::INVERSE, "7", "27"),
];

// ─── Synchronized Output ─────────────────────────────────────────────────────

/// Begin synchronized output (DEC Private Mode 2026).
///
/// The terminal buffers everything until [`end_sync`], so a patch lands
/// as one frame.
#[inline]
pub fn begin_sync(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?2026h")
}

/// End synchronized output.
#[inline]
pub fn end_sync(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?2026l")
}

// ─── Alternate Screen ───────────────────────────────────────────────────────

/// Enter the alternate screen buffer (DEC Private Mode 1049).
#[inline]
pub fn enter_alt_screen(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?1049h")
}

/// Exit the alternate screen buffer and restore original content.
#[inline]
pub fn exit_alt_screen(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?1049l")
}

// ─── Mouse Reporting ────────────────────────────────────────────────────────

/// Report button presses, releases and drags in SGR encoding
/// (DEC 1000, 1002, 1015 and 1006).
pub fn enable_mouse_buttons(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?1000h\x1b[?1002h\x1b[?1015h\x1b[?1006h")
}

/// Undo [`enable_mouse_buttons`].
pub fn disable_mouse_buttons(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?1000l\x1b[?1002l\x1b[?1015l\x1b[?1006l")
}

/// Report pointer motion with no button held (DEC 1003).
#[inline]
pub fn enable_mouse_motion(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?1003h")
}

/// Undo [`enable_mouse_motion`].
#[inline]
pub fn disable_mouse_motion(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?1003l")
}

// ─── Focus Reporting ────────────────────────────────────────────────────────

/// Enable terminal focus reporting (DEC 1004).
///
/// The terminal sends `\x1b[I` on focus gain and `\x1b[O` on focus loss.
#[inline]
pub fn enable_focus_reporting(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?1004h")
}

/// Disable terminal focus reporting.
#[inline]
pub fn disable_focus_reporting(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?1004l")
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    /// Helper: run an ANSI function and return its output as a string.
    fn emit<F>(f: F) -> String
    where
        F: FnOnce(&mut Vec<u8>) -> io::Result<()>,
    {
        let mut buf = Vec::new();
        f(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    fn diff(from: Style, to: Style) -> String {
        emit(|w| style(w, Some(from), to))
    }

    // ── Cursor ──────────────────────────────────────────────────────────

    #[test]
    fn cursor_to_origin() {
        assert_eq!(emit(|w| cursor_to(w, 0, 0)), "\x1b[1;1H");
    }

    #[test]
    fn cursor_to_position() {
        assert_eq!(emit(|w| cursor_to(w, 10, 20)), "\x1b[21;11H");
    }

    #[test]
    fn cursor_to_max_does_not_overflow() {
        assert_eq!(emit(|w| cursor_to(w, u16::MAX, u16::MAX)), "\x1b[65536;65536H");
    }

    #[test]
    fn cursor_relative() {
        assert_eq!(emit(|w| cursor_up(w, 3)), "\x1b[3A");
        assert_eq!(emit(|w| cursor_down(w, 1)), "\x1b[1B");
        assert_eq!(emit(|w| cursor_forward(w, 12)), "\x1b[12C");
        assert_eq!(emit(|w| cursor_back(w, 7)), "\x1b[7D");
    }

    #[test]
    fn cursor_visibility() {
        assert_eq!(emit(|w| cursor_hide(w)), "\x1b[?25l");
        assert_eq!(emit(|w| cursor_show(w)), "\x1b[?25h");
    }

    // ── Colors ──────────────────────────────────────────────────────────

    #[test]
    fn fg_colors() {
        assert_eq!(emit(|w| fg(w, Color::Default)), "\x1b[39m");
        assert_eq!(emit(|w| fg(w, Color::rgb(255, 128, 0))), "\x1b[38;2;255;128;0m");
        assert_eq!(emit(|w| fg(w, Color::NoChange)), "");
    }

    #[test]
    fn bg_colors() {
        assert_eq!(emit(|w| bg(w, Color::Default)), "\x1b[49m");
        assert_eq!(emit(|w| bg(w, Color::rgb(0, 100, 200))), "\x1b[48;2;0;100;200m");
        assert_eq!(emit(|w| bg(w, Color::NoChange)), "");
    }

    // ── Style ───────────────────────────────────────────────────────────

    #[test]
    fn style_unchanged_emits_nothing() {
        assert_eq!(diff(Style::ITALIC, Style::ITALIC), "");
        // Dim under bold is invisible either way.
        assert_eq!(diff(Style::BOLD, Style::BOLD | Style::DIM), "");
    }

    #[test]
    fn style_set_single_bits() {
        assert_eq!(diff(Style::NORMAL, Style::BOLD), "\x1b[1m");
        assert_eq!(diff(Style::NORMAL, Style::DIM), "\x1b[2m");
        assert_eq!(diff(Style::NORMAL, Style::ITALIC), "\x1b[3m");
        assert_eq!(diff(Style::NORMAL, Style::UNDERLINE), "\x1b[4m");
        assert_eq!(diff(Style::NORMAL, Style::STRIKETHROUGH), "\x1b[9m");
        assert_eq!(diff(Style::NORMAL, Style::INVERSE), "\x1b[7m");
    }

    #[test]
    fn style_clear_single_bits() {
        assert_eq!(diff(Style::BOLD, Style::NORMAL), "\x1b[22m");
        assert_eq!(diff(Style::DIM, Style::NORMAL), "\x1b[22m");
        assert_eq!(diff(Style::ITALIC, Style::NORMAL), "\x1b[23m");
        assert_eq!(diff(Style::UNDERLINE, Style::NORMAL), "\x1b[24m");
        assert_eq!(diff(Style::STRIKETHROUGH, Style::NORMAL), "\x1b[29m");
        assert_eq!(diff(Style::INVERSE, Style::NORMAL), "\x1b[27m");
    }

    #[test]
    fn style_switch_between_bold_and_dim() {
        assert_eq!(diff(Style::DIM, Style::BOLD), "\x1b[22;1m");
        assert_eq!(diff(Style::BOLD, Style::DIM), "\x1b[22;2m");
    }

    #[test]
    fn style_mixed_set_and_clear() {
        assert_eq!(
            diff(Style::BOLD | Style::UNDERLINE, Style::ITALIC),
            "\x1b[22;3;24m"
        );
    }

    #[test]
    fn style_from_unknown_resets() {
        assert_eq!(emit(|w| style(w, None, Style::NORMAL)), "\x1b[0m");
        assert_eq!(
            emit(|w| style(w, None, Style::BOLD | Style::DIM | Style::UNDERLINE)),
            "\x1b[0;1;4m"
        );
    }

    // ── Modes ───────────────────────────────────────────────────────────

    #[test]
    fn sync_markers() {
        assert_eq!(emit(|w| begin_sync(w)), "\x1b[?2026h");
        assert_eq!(emit(|w| end_sync(w)), "\x1b[?2026l");
    }

    #[test]
    fn alt_screen() {
        assert_eq!(emit(|w| enter_alt_screen(w)), "\x1b[?1049h");
        assert_eq!(emit(|w| exit_alt_screen(w)), "\x1b[?1049l");
    }

    #[test]
    fn mouse_reporting() {
        assert_eq!(
            emit(|w| enable_mouse_buttons(w)),
            "\x1b[?1000h\x1b[?1002h\x1b[?1015h\x1b[?1006h"
        );
        assert_eq!(
            emit(|w| disable_mouse_buttons(w)),
            "\x1b[?1000l\x1b[?1002l\x1b[?1015l\x1b[?1006l"
        );
        assert_eq!(emit(|w| enable_mouse_motion(w)), "\x1b[?1003h");
        assert_eq!(emit(|w| disable_mouse_motion(w)), "\x1b[?1003l");
    }

    #[test]
    fn focus_reporting() {
        assert_eq!(emit(|w| enable_focus_reporting(w)), "\x1b[?1004h");
        assert_eq!(emit(|w| disable_focus_reporting(w)), "\x1b[?1004l");
    }

    #[test]
    fn sequences_compose() {
        let mut buf = Vec::new();
        cursor_to(&mut buf, 5, 3).unwrap();
        fg(&mut buf, Color::RED).unwrap();
        style(&mut buf, Some(Style::NORMAL), Style::BOLD).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "\x1b[4;6H\x1b[38;2;255;0;0m\x1b[1m"
        );
    }
}
