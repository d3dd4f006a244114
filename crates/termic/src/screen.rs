// SPDX-License-Identifier: MIT
//
// Screen — double-buffered diff renderer.
//
// Draw calls write into the back buffer. `update()` walks the back buffer,
// compares every cell to the front buffer (what the terminal is believed
// to show), and emits only the changed cells:
//
//   1. Move the cursor there (shortest of CUP or relative moves).
//   2. Bring style and colors in line, touching only bits that differ.
//   3. Emit the glyph, or a space when the glyph is blank, a control, or a
//      wide glyph stuck in the last column.
//
// The cursor is put back where it was, the whole patch goes out in one
// write, and only after that write succeeds does front become a copy of
// back. A second update() with no draws in between emits nothing.
//
// Cursor, color and style caches live in `CursorState`. If anything else
// writes to the terminal (switching screens, a subprocess, a reset), call
// `invalidate()` or the next patch will be computed against stale state.

use std::io::{self, Write};
use std::time::Instant;

use crate::ansi;
use crate::buffer::{Pos, Rect, ScreenBuffer, Size};
use crate::cell::Look;
use crate::color::Color;
use crate::output::{CursorState, OutputBuffer};
use crate::text::{self, BreakMode};
use crate::utf8::{char_width, str_width};

/// Tab stops every 8 columns.
const TAB_WIDTH: u32 = 8;

// ─── Types ───────────────────────────────────────────────────────────────────

/// Where an aligned print's anchor column sits within the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Align {
    /// Anchor is the first column.
    #[default]
    Left,
    /// Anchor is the middle column, rounded left.
    Center,
    /// Anchor is the last column.
    Right,
}

/// What an [`Screen::update`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UpdateStats {
    /// Cells that differed and were redrawn.
    pub cells: usize,
    /// Bytes written to the terminal.
    pub bytes: usize,
}

// ─── Screen ──────────────────────────────────────────────────────────────────

/// The diff renderer. `W` is the terminal's output stream.
///
/// ```
/// use termic::buffer::{Pos, Size};
/// use termic::cell::Look;
/// use termic::screen::Screen;
///
/// let mut screen = Screen::new(Vec::new());
/// screen.set_size(Size::new(20, 2));
/// screen.print(Pos::new(0, 0), "hi", Look::DEFAULT);
///
/// let stats = screen.update().unwrap();
/// assert_eq!(stats.cells, 2);
/// assert_eq!(screen.update().unwrap().bytes, 0);
/// ```
pub struct Screen<W: Write> {
    out: W,
    back: ScreenBuffer,
    front: ScreenBuffer,
    cursor: CursorState,
    buf: OutputBuffer,
    /// Where `print_here` continues.
    client: Pos,
    synchronized: bool,
}

impl<W: Write> Screen<W> {
    /// A zero-sized screen writing to `out`.
    ///
    /// The first patch starts with a move to the origin, so the cursor
    /// position is known from then on.
    #[must_use]
    pub fn new(out: W) -> Self {
        let mut buf = OutputBuffer::new();
        let mut cursor = CursorState::new();
        // Writing into a Vec cannot fail.
        let _ = ansi::cursor_to(&mut buf, 0, 0);
        cursor.set_position(Pos::ORIGIN);

        Self {
            out,
            back: ScreenBuffer::default(),
            front: ScreenBuffer::default(),
            cursor,
            buf,
            client: Pos::ORIGIN,
            synchronized: false,
        }
    }

    #[inline]
    #[must_use]
    pub const fn size(&self) -> Size {
        self.back.size()
    }

    /// The buffer draw calls write to.
    #[inline]
    #[must_use]
    pub const fn back(&self) -> &ScreenBuffer {
        &self.back
    }

    /// What the terminal is believed to show.
    #[inline]
    #[must_use]
    pub const fn front(&self) -> &ScreenBuffer {
        &self.front
    }

    #[inline]
    pub const fn writer_mut(&mut self) -> &mut W {
        &mut self.out
    }

    /// Wrap each non-empty patch in synchronized-output markers.
    pub fn set_synchronized(&mut self, on: bool) {
        self.synchronized = on;
    }

    /// Resize both buffers.
    ///
    /// A narrower screen leaves stale glyphs beyond the new right edge that
    /// the diff would never revisit, so the front buffer is invalidated and
    /// the next update repaints every cell.
    pub fn set_size(&mut self, size: Size) {
        let old = self.back.size();
        if size == old {
            return;
        }

        self.buf.reserve(size.area() * 4);
        self.back.set_size(size);
        self.front.set_size(size);

        if size.width < old.width {
            self.front.invalidate();
        }
        log::debug!(
            "screen resize: {}x{} -> {}x{}",
            old.width,
            old.height,
            size.width,
            size.height
        );
    }

    /// Forget the cached cursor position, colors and style.
    pub fn invalidate(&mut self) {
        self.cursor.invalidate();
    }

    // ─── Drawing ─────────────────────────────────────────────────────────

    /// Clear the back buffer. `Color::NoChange` keeps that layer.
    pub fn clear(&mut self, bg: Color, fg: Color) {
        self.back.clear(bg, fg, true);
        self.client = Pos::ORIGIN;
    }

    /// Clear a rectangle of the back buffer.
    pub fn clear_rect(&mut self, rect: Rect, bg: Color, fg: Color) {
        self.back.clear_rect(rect, bg, fg, true);
        self.client = Pos::ORIGIN;
    }

    /// Write one cell of the back buffer.
    pub fn set_cell(&mut self, pos: Pos, glyph: Option<char>, width: u8, look: Look) {
        self.back.set_cell(pos, glyph, width, look);
    }

    /// Set where [`print_here`](Self::print_here) writes next.
    pub fn go_to(&mut self, pos: Pos) {
        self.client = pos;
    }

    /// Print at the position the previous print ended.
    pub fn print_here(&mut self, text: &str, look: Look) -> usize {
        self.print(self.client, text, look)
    }

    /// Print `text` starting at `pos` and return the total width printed.
    ///
    /// `\n` returns to `pos.x` on the next row, `\t` jumps to the next
    /// multiple of 8, `\v` moves down one row in the same column. Glyphs
    /// with no width (combining marks, other controls) are skipped. Text
    /// running past the right edge is dropped up to the next newline.
    pub fn print(&mut self, pos: Pos, text: &str, look: Look) -> usize {
        let Size { width, height } = self.back.size();
        let (width, height) = (u32::from(width), u32::from(height));

        let mut cx = u32::from(pos.x);
        let mut cy = u32::from(pos.y);
        let mut total = 0;

        for ch in text.chars() {
            if cy >= height {
                break;
            }
            match ch {
                '\n' => {
                    cx = u32::from(pos.x);
                    cy += 1;
                    continue;
                }
                '\t' => {
                    cx = (cx / TAB_WIDTH + 1) * TAB_WIDTH;
                    continue;
                }
                '\x0b' => {
                    cy += 1;
                    continue;
                }
                _ => {}
            }

            let w = char_width(ch);
            if w == 0 || cx >= width {
                continue;
            }

            let at = Pos::new(clamp_u16(cx), clamp_u16(cy));
            #[allow(clippy::cast_possible_truncation)] // width is 1 or 2
            self.back.set_cell(at, Some(ch), w as u8, look);
            if w == 2 && cx + 1 < width {
                self.back
                    .set_cell(Pos::new(at.x + 1, at.y), Some('\0'), 0, look);
            }

            total += w;
            cx += w as u32;
        }

        self.client = Pos::new(clamp_u16(cx), clamp_u16(cy));
        total
    }

    /// Print with `anchor` at the left, middle or right of the text.
    ///
    /// Positions left of column 0 are clamped to it.
    pub fn print_aligned(&mut self, align: Align, anchor: Pos, text: &str, look: Look) -> usize {
        let w = str_width(text);
        let shift = match align {
            Align::Left => 0,
            Align::Center => w / 2,
            Align::Right => w.saturating_sub(1),
        };
        let x = usize::from(anchor.x).saturating_sub(shift);
        self.print(Pos::new(clamp_u16(x as u32), anchor.y), text, look)
    }

    /// Wrap `text` at `wrap_width` columns and print one line per row.
    /// Returns the number of rows printed; lines past the bottom are
    /// dropped.
    pub fn print_wrapped(
        &mut self,
        pos: Pos,
        text: &str,
        look: Look,
        wrap_width: usize,
        mode: BreakMode,
    ) -> usize {
        let mut rows = 0;
        for (i, line) in text::wrap(text, wrap_width, mode).iter().enumerate() {
            let y = usize::from(pos.y) + i;
            if y >= usize::from(self.back.height()) {
                break;
            }
            self.print(Pos::new(pos.x, clamp_u16(y as u32)), line, look);
            rows += 1;
        }
        rows
    }

    /// Display width of `text` in columns.
    #[must_use]
    pub fn measure(text: &str) -> usize {
        str_width(text)
    }

    // ─── Update ──────────────────────────────────────────────────────────

    /// Send the difference between back and front to the terminal.
    ///
    /// # Errors
    ///
    /// Propagates the write error. The front buffer is left untouched and
    /// the cursor cache is forgotten, so the next update retries the whole
    /// patch against a known state.
    pub fn update(&mut self) -> io::Result<UpdateStats> {
        let started = Instant::now();
        let Size { width, height } = self.back.size();
        let start = self.cursor.position();
        let prefix = self.buf.len();

        if self.synchronized {
            ansi::begin_sync(&mut self.buf)?;
        }

        let mut cells = 0;
        for y in 0..height {
            let mut x = 0;
            while x < width {
                let pos = Pos::new(x, y);
                let back = *self.back.cell(pos);

                if back != *self.front.cell(pos) {
                    self.cursor.move_to(&mut self.buf, pos, width)?;
                    self.cursor.apply(&mut self.buf, back.look)?;

                    let stuck_wide = x == width - 1 && back.width > 1;
                    if back.ch <= ' ' || back.ch.is_control() || stuck_wide {
                        self.buf.push_char(' ');
                        self.cursor.advance(1);
                    } else {
                        self.buf.push_char(back.ch);
                        self.cursor.advance(u16::from(back.width));
                    }
                    cells += 1;
                }

                // Step over the continuation only when it really is one.
                let pair = back.width == 2
                    && x + 1 < width
                    && self.back.cell(Pos::new(x + 1, y)).is_continuation();
                x = x.saturating_add(if pair { 2 } else { 1 });
            }
        }

        if cells > 0 {
            if let Some(start) = start {
                self.cursor.move_to(&mut self.buf, start, width)?;
            }
            if self.synchronized {
                ansi::end_sync(&mut self.buf)?;
            }
        } else {
            self.buf.truncate(prefix);
        }

        let bytes = self.buf.len();
        if let Err(e) = self.buf.flush_to(&mut self.out) {
            self.cursor.invalidate();
            return Err(e);
        }

        if cells > 0 {
            self.front.copy_from(&self.back);
            log::debug!(
                "screen updated: {cells} cells, {bytes} bytes, {} µs",
                started.elapsed().as_micros()
            );
        }

        Ok(UpdateStats { cells, bytes })
    }
}

#[cfg(unix)]
impl<W: Write> Screen<W> {
    /// Size of the terminal behind `fd`, `{0, 0}` if it can't be queried.
    #[must_use]
    pub fn terminal_size(fd: std::os::fd::RawFd) -> Size {
        crate::terminal::terminal_size(fd)
    }
}

#[allow(clippy::cast_possible_truncation)]
const fn clamp_u16(v: u32) -> u16 {
    if v > u16::MAX as u32 { u16::MAX } else { v as u16 }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
