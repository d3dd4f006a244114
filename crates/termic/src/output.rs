// SPDX-License-Identifier: MIT
//
// Output buffering and terminal cursor state.
//
// Two components work together to minimize terminal I/O:
//
//   OutputBuffer — accumulates all escape bytes and glyphs of one update so
//   the patch reaches the terminal in a single write.
//
//   CursorState — what we believe the terminal currently has: cursor
//   position, colors, style. Every field is an Option; `None` means
//   "unknown" and forces the next emit to be absolute (CUP, full SGR).
//   Anything that touches the terminal behind the renderer's back must
//   call `invalidate()`.
//
// Cursor moves pick the shortest encoding: an absolute CUP or a pair of
// relative moves (CUU/CUD plus CUF/CUB), by emitted byte count.

use std::io::{self, Write};

use crate::ansi;
use crate::buffer::Pos;
use crate::cell::{Look, Style};
use crate::color::Color;

// ─── OutputBuffer ────────────────────────────────────────────────────────────

/// A byte buffer that accumulates one update's output for a single write.
pub struct OutputBuffer {
    buf: Vec<u8>,
}

const DEFAULT_CAPACITY: usize = 16_384;

impl OutputBuffer {
    /// Create an empty buffer with default capacity (16 KB).
    #[must_use]
    pub fn new() -> Self {
        Self {
            buf: Vec::with_capacity(DEFAULT_CAPACITY),
        }
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// The accumulated bytes.
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Append a glyph as UTF-8.
    #[inline]
    pub fn push_char(&mut self, ch: char) {
        let mut enc = [0u8; 4];
        self.buf.extend_from_slice(ch.encode_utf8(&mut enc).as_bytes());
    }

    /// Clear the buffer for reuse (keeps allocated capacity).
    #[inline]
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// Drop everything past the first `len` bytes.
    #[inline]
    pub fn truncate(&mut self, len: usize) {
        self.buf.truncate(len);
    }

    /// Reserve room for at least `additional` more bytes.
    #[inline]
    pub fn reserve(&mut self, additional: usize) {
        self.buf.reserve(additional);
    }

    /// Write everything to `w` in one call and clear the buffer.
    ///
    /// The buffer is cleared even when the write fails, so a failed patch
    /// is never replayed in front of the next one.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to `w` fails.
    pub fn flush_to(&mut self, w: &mut impl Write) -> io::Result<()> {
        if self.buf.is_empty() {
            return Ok(());
        }
        let result = w.write_all(&self.buf).and_then(|()| w.flush());
        self.buf.clear();
        result
    }
}

impl Write for OutputBuffer {
    #[inline]
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        // Real flushing goes through flush_to().
        Ok(())
    }
}

impl Default for OutputBuffer {
    fn default() -> Self {
        Self::new()
    }
}

// ─── CursorState ─────────────────────────────────────────────────────────────

/// The terminal's cursor position, colors and style as last emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CursorState {
    pos: Option<Pos>,
    fg: Option<Color>,
    bg: Option<Color>,
    style: Option<Style>,
}

impl CursorState {
    /// Nothing known.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            pos: None,
            fg: None,
            bg: None,
            style: None,
        }
    }

    /// Forget everything.
    #[allow(clippy::missing_const_for_fn)]
    pub fn invalidate(&mut self) {
        *self = Self::new();
    }

    /// Last known cursor position.
    #[inline]
    #[must_use]
    pub const fn position(&self) -> Option<Pos> {
        self.pos
    }

    /// Record a position the terminal was moved to by other means.
    #[inline]
    pub fn set_position(&mut self, pos: Pos) {
        self.pos = Some(pos);
    }

    /// The terminal advanced the cursor by `cols` after printing.
    ///
    /// The column may end up at or past the screen width. The terminal is
    /// then in its pending-wrap state and [`move_to`](Self::move_to) falls
    /// back to an absolute move.
    #[inline]
    pub fn advance(&mut self, cols: u16) {
        if let Some(p) = &mut self.pos {
            p.x = p.x.saturating_add(cols);
        }
    }

    /// Move the cursor to `to` using the shortest sequence.
    ///
    /// `width` is the screen width, used to detect the pending-wrap state.
    ///
    /// # Errors
    ///
    /// Propagates write errors from `out`.
    pub fn move_to(&mut self, out: &mut impl Write, to: Pos, width: u16) -> io::Result<()> {
        match self.pos {
            Some(from) if from == to => return Ok(()),
            Some(from) if from.x < width => {
                let dy = to.y.abs_diff(from.y);
                let dx = to.x.abs_diff(from.x);
                if relative_len(dy) + relative_len(dx) < absolute_len(to) {
                    if to.y < from.y {
                        ansi::cursor_up(out, dy)?;
                    } else if to.y > from.y {
                        ansi::cursor_down(out, dy)?;
                    }
                    if to.x < from.x {
                        ansi::cursor_back(out, dx)?;
                    } else if to.x > from.x {
                        ansi::cursor_forward(out, dx)?;
                    }
                } else {
                    ansi::cursor_to(out, to.x, to.y)?;
                }
            }
            _ => ansi::cursor_to(out, to.x, to.y)?,
        }
        self.pos = Some(to);
        Ok(())
    }

    /// Bring style and colors to `look`, emitting only what differs.
    ///
    /// Style goes first: an unknown style is re-established with a full
    /// reset, which also wipes the colors.
    ///
    /// # Errors
    ///
    /// Propagates write errors from `out`.
    pub fn apply(&mut self, out: &mut impl Write, look: Look) -> io::Result<()> {
        self.set_style(out, look.style)?;
        self.set_colors(out, look.fg, look.bg)
    }

    fn set_style(&mut self, out: &mut impl Write, style: Style) -> io::Result<()> {
        if style.is_no_change() {
            return Ok(());
        }
        if self.style.is_none() {
            self.fg = None;
            self.bg = None;
        }
        ansi::style(out, self.style, style)?;
        self.style = Some(style.effective());
        Ok(())
    }

    fn set_colors(&mut self, out: &mut impl Write, fg: Color, bg: Color) -> io::Result<()> {
        if !fg.is_no_change() && self.fg != Some(fg) {
            ansi::fg(out, fg)?;
            self.fg = Some(fg);
        }
        if !bg.is_no_change() && self.bg != Some(bg) {
            ansi::bg(out, bg)?;
            self.bg = Some(bg);
        }
        Ok(())
    }
}

/// Bytes in a decimal rendering of `n`.
const fn digits(mut n: u32) -> usize {
    let mut d = 1;
    while n >= 10 {
        n /= 10;
        d += 1;
    }
    d
}

/// Bytes of a CUU/CUD/CUF/CUB for `n` cells, 0 when no move is needed.
const fn relative_len(n: u16) -> usize {
    if n == 0 { 0 } else { 3 + digits(n as u32) }
}

/// Bytes of a CUP to `to`.
const fn absolute_len(to: Pos) -> usize {
    4 + digits(to.y as u32 + 1) + digits(to.x as u32 + 1)
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const WIDTH: u16 = 200;

    fn at(x: u16, y: u16) -> CursorState {
        let mut c = CursorState::new();
        c.set_position(Pos::new(x, y));
        c
    }

    /// Move from a known position and return what was emitted.
    fn mv(cursor: &mut CursorState, x: u16, y: u16) -> String {
        let mut out = OutputBuffer::new();
        cursor.move_to(&mut out, Pos::new(x, y), WIDTH).unwrap();
        String::from_utf8(out.as_bytes().to_vec()).unwrap()
    }

    fn apply(cursor: &mut CursorState, look: Look) -> String {
        let mut out = OutputBuffer::new();
        cursor.apply(&mut out, look).unwrap();
        String::from_utf8(out.as_bytes().to_vec()).unwrap()
    }

    // ── OutputBuffer ────────────────────────────────────────────────────

    #[test]
    fn output_buffer_new_is_empty() {
        let buf = OutputBuffer::new();
        assert!(buf.is_empty());
        assert_eq!(buf.len(), 0);
    }

    #[test]
    fn output_buffer_write_trait() {
        let mut buf = OutputBuffer::new();
        write!(buf, "hello {}", 42).unwrap();
        assert_eq!(buf.as_bytes(), b"hello 42");
    }

    #[test]
    fn output_buffer_push_char() {
        let mut buf = OutputBuffer::new();
        buf.push_char('A');
        buf.push_char('中');
        buf.push_char('🔥');
        assert_eq!(buf.as_bytes(), "A中🔥".as_bytes());
    }

    #[test]
    fn output_buffer_clear_keeps_capacity() {
        let mut buf = OutputBuffer::new();
        write!(buf, "some data").unwrap();
        let cap = buf.buf.capacity();
        buf.clear();
        assert!(buf.is_empty());
        assert_eq!(buf.buf.capacity(), cap);
    }

    #[test]
    fn output_buffer_flush_to() {
        let mut buf = OutputBuffer::new();
        write!(buf, "frame data").unwrap();

        let mut dest = Vec::new();
        buf.flush_to(&mut dest).unwrap();

        assert_eq!(dest, b"frame data");
        assert!(buf.is_empty());
    }

    #[test]
    fn output_buffer_flush_failure_still_clears() {
        struct Broken;
        impl Write for Broken {
            fn write(&mut self, _: &[u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::BrokenPipe, "gone"))
            }
            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let mut buf = OutputBuffer::new();
        write!(buf, "x").unwrap();
        assert!(buf.flush_to(&mut Broken).is_err());
        assert!(buf.is_empty());
    }

    #[test]
    fn output_buffer_truncate() {
        let mut buf = OutputBuffer::new();
        write!(buf, "keep").unwrap();
        let mark = buf.len();
        write!(buf, "drop").unwrap();
        buf.truncate(mark);
        assert_eq!(buf.as_bytes(), b"keep");
    }

    // ── Cursor moves ────────────────────────────────────────────────────

    #[test]
    fn unknown_position_uses_absolute() {
        let mut c = CursorState::new();
        assert_eq!(mv(&mut c, 3, 4), "\x1b[5;4H");
        assert_eq!(c.position(), Some(Pos::new(3, 4)));
    }

    #[test]
    fn same_position_emits_nothing() {
        let mut c = at(7, 2);
        assert_eq!(mv(&mut c, 7, 2), "");
    }

    #[test]
    fn short_horizontal_move_is_relative() {
        assert_eq!(mv(&mut at(10, 20), 15, 20), "\x1b[5C");
        assert_eq!(mv(&mut at(10, 20), 8, 20), "\x1b[2D");
    }

    #[test]
    fn short_vertical_move_is_relative() {
        assert_eq!(mv(&mut at(30, 40), 30, 37), "\x1b[3A");
        assert_eq!(mv(&mut at(30, 40), 30, 41), "\x1b[1B");
    }

    #[test]
    fn diagonal_move_combines_when_shorter() {
        // CUP would be "\x1b[102;32H" (9 bytes), relative is 4 + 4 bytes.
        assert_eq!(mv(&mut at(30, 100), 31, 101), "\x1b[1B\x1b[1C");
        // Equal length: CUP "\x1b[42;32H" vs "\x1b[1B\x1b[1C".
        assert_eq!(mv(&mut at(30, 40), 31, 41), "\x1b[42;32H");
    }

    #[test]
    fn absolute_wins_near_origin() {
        // "\x1b[1;1H" is 6 bytes, "\x1b[9A\x1b[9D" would be 8.
        assert_eq!(mv(&mut at(9, 9), 0, 0), "\x1b[1;1H");
    }

    #[test]
    fn shortest_encoding_by_length() {
        // CUP to (0, 0): 6 bytes. CUB by 50: 5 bytes. CUD 1 + CUB 50: 9.
        assert_eq!(mv(&mut at(50, 0), 0, 0), "\x1b[50D");
        assert_eq!(mv(&mut at(50, 0), 0, 1), "\x1b[2;1H");
        // Tie at 6 bytes goes to CUP.
        assert_eq!(mv(&mut at(100, 0), 0, 0), "\x1b[1;1H");
    }

    #[test]
    fn pending_wrap_forces_absolute() {
        let mut c = at(WIDTH - 1, 0);
        c.advance(1);
        assert_eq!(c.position(), Some(Pos::new(WIDTH, 0)));
        assert_eq!(mv(&mut c, WIDTH - 2, 0), "\x1b[1;199H");
    }

    #[test]
    fn advance_on_unknown_stays_unknown() {
        let mut c = CursorState::new();
        c.advance(3);
        assert_eq!(c.position(), None);
    }

    // ── Looks ───────────────────────────────────────────────────────────

    #[test]
    fn first_apply_resets_and_sets_colors() {
        let mut c = CursorState::new();
        assert_eq!(
            apply(&mut c, Look::new(Color::RED, Color::Default, Style::BOLD)),
            "\x1b[0;1m\x1b[38;2;255;0;0m\x1b[49m"
        );
    }

    #[test]
    fn same_look_emits_nothing() {
        let mut c = CursorState::new();
        let look = Look::new(Color::RED, Color::BLUE, Style::ITALIC);
        apply(&mut c, look);
        assert_eq!(apply(&mut c, look), "");
    }

    #[test]
    fn only_changed_parts_emitted() {
        let mut c = CursorState::new();
        apply(&mut c, Look::new(Color::RED, Color::BLUE, Style::ITALIC));
        assert_eq!(
            apply(&mut c, Look::new(Color::RED, Color::GREEN, Style::NORMAL)),
            "\x1b[23m\x1b[48;2;0;255;0m"
        );
    }

    #[test]
    fn sentinels_emit_nothing() {
        let mut c = CursorState::new();
        apply(&mut c, Look::PLAIN);
        assert_eq!(apply(&mut c, Look::UNCHANGED), "");
    }

    #[test]
    fn invalidate_forces_full_state() {
        let mut c = CursorState::new();
        apply(&mut c, Look::PLAIN);
        c.invalidate();
        assert_eq!(apply(&mut c, Look::PLAIN), "\x1b[0m\x1b[39m\x1b[49m");
    }
}
