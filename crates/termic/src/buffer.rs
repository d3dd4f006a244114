// SPDX-License-Identifier: MIT
//
// ScreenBuffer — the 2D cell grid the renderer diffs.
//
// A flat `Vec<Cell>` in row-major order: `index = y * width + x`. The screen
// owns two of these (desired and last-known terminal state). This module is
// pure data: no I/O, no escape sequences.
//
// Resizing:
//
//   With `preserve_content` off (the default) a resize throws everything
//   away. With it on, the overlapping top-left rectangle survives. Because
//   the row stride changes with the width, rows are copied one at a time.
//   New rows and columns start as `Cell::EMPTY`.
//
// Writes outside the grid are dropped without error. Callers routinely
// paint wide glyphs and fills that straddle the right or bottom edge.

use crate::cell::{Cell, Look, Style};
use crate::color::Color;

// ─── Geometry ────────────────────────────────────────────────────────────────

/// A cell position, 0-based, column first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Pos {
    pub x: u16,
    pub y: u16,
}

impl Pos {
    pub const ORIGIN: Self = Self { x: 0, y: 0 };

    #[inline]
    #[must_use]
    pub const fn new(x: u16, y: u16) -> Self {
        Self { x, y }
    }
}

/// Width and height in cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Size {
    pub width: u16,
    pub height: u16,
}

impl Size {
    #[inline]
    #[must_use]
    pub const fn new(width: u16, height: u16) -> Self {
        Self { width, height }
    }

    /// Total number of cells.
    #[inline]
    #[must_use]
    pub const fn area(self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Whether either dimension is zero. A zero size from the OS means
    /// "unknown".
    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// An axis-aligned rectangle of cells.
///
/// ```
/// use termic::buffer::{Pos, Rect};
///
/// let r = Rect::new(2, 1, 3, 2);
/// assert!(r.contains(Pos::new(4, 2)));
/// assert!(!r.contains(Pos::new(5, 2)));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
}

impl Rect {
    #[inline]
    #[must_use]
    pub const fn new(x: u16, y: u16, width: u16, height: u16) -> Self {
        Self { x, y, width, height }
    }

    #[inline]
    #[must_use]
    pub const fn top_left(self) -> Pos {
        Pos::new(self.x, self.y)
    }

    /// One past the last column.
    #[inline]
    #[must_use]
    pub const fn right(self) -> u32 {
        self.x as u32 + self.width as u32
    }

    /// One past the last row.
    #[inline]
    #[must_use]
    pub const fn bottom(self) -> u32 {
        self.y as u32 + self.height as u32
    }

    #[inline]
    #[must_use]
    pub const fn contains(self, p: Pos) -> bool {
        p.x >= self.x && (p.x as u32) < self.right() && p.y >= self.y && (p.y as u32) < self.bottom()
    }
}

// ─── ScreenBuffer ────────────────────────────────────────────────────────────

/// A grid of [`Cell`]s.
///
/// ```
/// use termic::buffer::{Pos, ScreenBuffer, Size};
/// use termic::cell::Look;
///
/// let mut buf = ScreenBuffer::new(Size::new(10, 3));
/// buf.set_cell(Pos::new(2, 1), Some('x'), 1, Look::DEFAULT);
/// assert_eq!(buf.get(Pos::new(2, 1)).and_then(|c| c.glyph()), Some('x'));
///
/// // Off-grid writes are ignored.
/// buf.set_cell(Pos::new(10, 0), Some('y'), 1, Look::DEFAULT);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScreenBuffer {
    width: u16,
    height: u16,
    cells: Vec<Cell>,
    /// Keep the overlapping region across [`set_size`](Self::set_size).
    pub preserve_content: bool,
}

impl ScreenBuffer {
    /// A buffer of the given size filled with [`Cell::EMPTY`].
    #[must_use]
    pub fn new(size: Size) -> Self {
        Self {
            width: size.width,
            height: size.height,
            cells: vec![Cell::EMPTY; size.area()],
            preserve_content: false,
        }
    }

    #[inline]
    #[must_use]
    pub const fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    #[inline]
    #[must_use]
    pub const fn width(&self) -> u16 {
        self.width
    }

    #[inline]
    #[must_use]
    pub const fn height(&self) -> u16 {
        self.height
    }

    #[inline]
    const fn index(&self, pos: Pos) -> usize {
        pos.y as usize * self.width as usize + pos.x as usize
    }

    #[inline]
    const fn in_bounds(&self, pos: Pos) -> bool {
        pos.x < self.width && pos.y < self.height
    }

    // ─── Resize ──────────────────────────────────────────────────────────

    /// Change the grid dimensions. A no-op when the size is unchanged.
    pub fn set_size(&mut self, size: Size) {
        if size == self.size() {
            return;
        }

        log::debug!(
            "buffer resize: {}x{} -> {}x{}{}",
            self.width,
            self.height,
            size.width,
            size.height,
            if self.preserve_content { " (preserving)" } else { "" }
        );

        let mut cells = vec![Cell::EMPTY; size.area()];

        let had_content = self.width > 0 && self.height > 0;
        if self.preserve_content && had_content {
            let copy_len = usize::from(self.width.min(size.width));
            let rows = usize::from(self.height.min(size.height));
            let old_stride = usize::from(self.width);
            let new_stride = usize::from(size.width);

            for y in 0..rows {
                let src = &self.cells[y * old_stride..y * old_stride + copy_len];
                cells[y * new_stride..y * new_stride + copy_len].copy_from_slice(src);
            }
        }

        self.cells = cells;
        self.width = size.width;
        self.height = size.height;
    }

    // ─── Clear ───────────────────────────────────────────────────────────

    /// Reset every cell's style and colors.
    ///
    /// `Color::NoChange` leaves that layer alone. With `content` off the
    /// glyphs survive, which is what a cosmetic recolor wants.
    pub fn clear(&mut self, bg: Color, fg: Color, content: bool) {
        for cell in &mut self.cells {
            clear_cell(cell, bg, fg, content);
        }
    }

    /// Like [`clear`](Self::clear) but limited to `rect`, clipped to the
    /// grid. A zero-sized rect still clears one cell.
    pub fn clear_rect(&mut self, rect: Rect, bg: Color, fg: Color, content: bool) {
        let right = rect.x as u32 + u32::from(rect.width.max(1));
        let bottom = rect.y as u32 + u32::from(rect.height.max(1));
        let x_end = right.min(u32::from(self.width));
        let y_end = bottom.min(u32::from(self.height));
        let stride = usize::from(self.width);

        for y in u32::from(rect.y)..y_end {
            let row = y as usize * stride;
            for x in u32::from(rect.x)..x_end {
                clear_cell(&mut self.cells[row + x as usize], bg, fg, content);
            }
        }
    }

    // ─── Cell Access ─────────────────────────────────────────────────────

    /// Write one cell. Out-of-bounds positions are ignored.
    ///
    /// `glyph: None` keeps the cell's glyph. Each `look` field holding its
    /// sentinel keeps the cell's value. The width is always written.
    ///
    /// A wide glyph is always followed by its continuation cell. Writing
    /// over either half turns the other half into a blank.
    pub fn set_cell(&mut self, pos: Pos, glyph: Option<char>, width: u8, look: Look) {
        if !self.in_bounds(pos) {
            return;
        }
        let idx = self.index(pos);
        let old_width = self.cells[idx].width;

        if old_width == 0 && width != 0 && pos.x > 0 && self.cells[idx - 1].width == 2 {
            blank(&mut self.cells[idx - 1]);
        }
        if old_width == 2
            && width != 2
            && pos.x + 1 < self.width
            && self.cells[idx + 1].is_continuation()
        {
            blank(&mut self.cells[idx + 1]);
        }

        let cell = &mut self.cells[idx];

        if let Some(ch) = glyph {
            cell.ch = ch;
        }
        cell.width = width;
        cell.look = look.over(cell.look);
    }

    /// The cell at `pos`, or `None` outside the grid.
    #[inline]
    #[must_use]
    pub fn get(&self, pos: Pos) -> Option<&Cell> {
        if self.in_bounds(pos) {
            self.cells.get(self.index(pos))
        } else {
            None
        }
    }

    /// The cell at an already validated `pos`.
    ///
    /// # Panics
    ///
    /// If `pos` is outside the grid.
    #[inline]
    #[must_use]
    pub fn cell(&self, pos: Pos) -> &Cell {
        assert!(self.in_bounds(pos), "cell {pos:?} outside {:?}", self.size());
        &self.cells[self.index(pos)]
    }

    /// Mutable variant of [`cell`](Self::cell).
    ///
    /// # Panics
    ///
    /// If `pos` is outside the grid.
    #[inline]
    pub fn cell_mut(&mut self, pos: Pos) -> &mut Cell {
        assert!(self.in_bounds(pos), "cell {pos:?} outside {:?}", self.size());
        let idx = self.index(pos);
        &mut self.cells[idx]
    }

    /// One row of cells.
    ///
    /// # Panics
    ///
    /// If `y` is outside the grid.
    #[inline]
    #[must_use]
    pub fn row(&self, y: u16) -> &[Cell] {
        assert!(y < self.height, "row {y} outside height {}", self.height);
        let start = usize::from(y) * usize::from(self.width);
        &self.cells[start..start + usize::from(self.width)]
    }

    /// All cells, row-major.
    #[inline]
    #[must_use]
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Fill the grid with cells no draw call can produce, so that every
    /// position differs from any real content.
    pub fn invalidate(&mut self) {
        self.cells.fill(INVALID);
    }

    /// Overwrite every cell with `src`'s.
    ///
    /// # Panics
    ///
    /// If the two buffers differ in size.
    pub fn copy_from(&mut self, src: &Self) {
        assert_eq!(self.size(), src.size(), "buffer copy with mismatched sizes");
        self.cells.copy_from_slice(&src.cells);
    }
}

/// Half of a broken wide glyph: a space in the same colors.
const fn blank(cell: &mut Cell) {
    cell.ch = ' ';
    cell.width = 1;
}

/// Never stored by `set_cell`, which resolves sentinels against the cell.
const INVALID: Cell = Cell::new('\0', 1, Look::UNCHANGED);

fn clear_cell(cell: &mut Cell, bg: Color, fg: Color, content: bool) {
    if content {
        cell.ch = '\0';
        cell.width = 1;
    }
    if !fg.is_no_change() {
        cell.look.fg = fg;
    }
    if !bg.is_no_change() {
        cell.look.bg = bg;
    }
    cell.look.style = Style::NORMAL;
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn filled(w: u16, h: u16) -> ScreenBuffer {
        let mut buf = ScreenBuffer::new(Size::new(w, h));
        for y in 0..h {
            for x in 0..w {
                let ch = char::from(b'a' + ((y * w + x) % 26) as u8);
                buf.set_cell(Pos::new(x, y), Some(ch), 1, Look::PLAIN);
            }
        }
        buf
    }

    fn row_text(buf: &ScreenBuffer, y: u16) -> String {
        buf.row(y)
            .iter()
            .map(|c| c.glyph().unwrap_or('.'))
            .collect()
    }

    // ── Geometry ────────────────────────────────────────────────────────

    #[test]
    fn size_area_and_empty() {
        assert_eq!(Size::new(80, 24).area(), 1920);
        assert!(Size::new(0, 24).is_empty());
        assert!(!Size::new(1, 1).is_empty());
    }

    #[test]
    fn rect_edges_do_not_overflow() {
        let r = Rect::new(u16::MAX, u16::MAX, 10, 10);
        assert_eq!(r.right(), u32::from(u16::MAX) + 10);
        assert!(r.contains(Pos::new(u16::MAX, u16::MAX)));
    }

    // ── Resize ──────────────────────────────────────────────────────────

    #[test]
    fn new_buffer_is_empty_cells() {
        let buf = ScreenBuffer::new(Size::new(3, 2));
        assert_eq!(buf.cells().len(), 6);
        assert!(buf.cells().iter().all(|c| *c == Cell::EMPTY));
    }

    #[test]
    fn same_size_is_noop() {
        let mut buf = filled(4, 3);
        buf.preserve_content = false;
        let before = buf.clone();
        buf.set_size(Size::new(4, 3));
        assert_eq!(buf, before);
    }

    #[test]
    fn resize_without_preserve_resets() {
        let mut buf = filled(4, 3);
        buf.set_size(Size::new(5, 3));
        assert!(buf.cells().iter().all(|c| *c == Cell::EMPTY));
    }

    #[test]
    fn preserve_shrink_width_keeps_left_columns() {
        let mut buf = filled(10, 3);
        buf.preserve_content = true;
        let before: Vec<String> = (0..3).map(|y| row_text(&buf, y)).collect();

        buf.set_size(Size::new(5, 3));

        for y in 0..3 {
            assert_eq!(row_text(&buf, y), &before[y as usize][..5]);
        }
    }

    #[test]
    fn preserve_grow_fills_with_empty() {
        let mut buf = filled(3, 2);
        buf.preserve_content = true;
        buf.set_size(Size::new(5, 3));

        assert_eq!(row_text(&buf, 0), "abc..");
        assert_eq!(row_text(&buf, 1), "def..");
        assert_eq!(row_text(&buf, 2), ".....");
    }

    #[test]
    fn preserve_shrink_height_drops_rows() {
        let mut buf = filled(3, 3);
        buf.preserve_content = true;
        buf.set_size(Size::new(3, 1));
        assert_eq!(buf.cells().len(), 3);
        assert_eq!(row_text(&buf, 0), "abc");
    }

    #[test]
    fn preserve_from_zero_size() {
        let mut buf = ScreenBuffer::default();
        buf.preserve_content = true;
        buf.set_size(Size::new(2, 2));
        assert_eq!(buf.cells().len(), 4);
    }

    // ── Clear ───────────────────────────────────────────────────────────

    #[test]
    fn clear_content_and_colors() {
        let mut buf = filled(2, 2);
        buf.set_cell(Pos::new(0, 0), None, 1, Look::new(Color::RED, Color::RED, Style::BOLD));
        buf.clear(Color::BLUE, Color::WHITE, true);

        let c = buf.cell(Pos::new(0, 0));
        assert!(c.is_blank());
        assert_eq!(c.look, Look::new(Color::WHITE, Color::BLUE, Style::NORMAL));
    }

    #[test]
    fn clear_cosmetic_keeps_glyphs_and_unchanged_layer() {
        let mut buf = filled(2, 1);
        buf.set_cell(Pos::new(1, 0), None, 1, Look::new(Color::RED, Color::GREEN, Style::ITALIC));
        buf.clear(Color::NoChange, Color::GREY, false);

        let c = buf.cell(Pos::new(1, 0));
        assert_eq!(c.glyph(), Some('b'));
        assert_eq!(c.look, Look::new(Color::GREY, Color::GREEN, Style::NORMAL));
    }

    #[test]
    fn clear_rect_is_clipped() {
        let mut buf = filled(4, 3);
        buf.clear_rect(Rect::new(2, 1, 10, 10), Color::Default, Color::Default, true);

        assert_eq!(row_text(&buf, 0), "abcd");
        assert_eq!(row_text(&buf, 1), "ef..");
        assert_eq!(row_text(&buf, 2), "ij..");
    }

    #[test]
    fn clear_rect_zero_size_clears_one_cell() {
        let mut buf = filled(3, 1);
        buf.clear_rect(Rect::new(1, 0, 0, 0), Color::Default, Color::Default, true);
        assert_eq!(row_text(&buf, 0), "a.c");
    }

    // ── Cells ───────────────────────────────────────────────────────────

    #[test]
    fn set_cell_respects_sentinels() {
        let mut buf = ScreenBuffer::new(Size::new(1, 1));
        let p = Pos::ORIGIN;
        buf.set_cell(p, Some('x'), 1, Look::new(Color::RED, Color::GREEN, Style::BOLD));
        buf.set_cell(p, None, 1, Look::bg(Color::BLUE));

        let c = buf.cell(p);
        assert_eq!(c.glyph(), Some('x'));
        assert_eq!(c.look, Look::new(Color::RED, Color::BLUE, Style::BOLD));
    }

    #[test]
    fn set_cell_out_of_bounds_ignored() {
        let mut buf = ScreenBuffer::new(Size::new(2, 2));
        let before = buf.clone();
        buf.set_cell(Pos::new(2, 0), Some('x'), 1, Look::DEFAULT);
        buf.set_cell(Pos::new(0, 2), Some('x'), 1, Look::DEFAULT);
        assert_eq!(buf, before);
        assert_eq!(buf.get(Pos::new(2, 0)), None);
    }

    fn wide_at(buf: &mut ScreenBuffer, x: u16) {
        buf.set_cell(Pos::new(x, 0), Some('中'), 2, Look::PLAIN);
        buf.set_cell(Pos::new(x + 1, 0), Some('\0'), 0, Look::PLAIN);
    }

    #[test]
    fn narrow_over_continuation_blanks_owner() {
        let mut buf = ScreenBuffer::new(Size::new(4, 1));
        wide_at(&mut buf, 0);
        buf.set_cell(Pos::new(1, 0), Some('a'), 1, Look::PLAIN);

        assert_eq!(*buf.cell(Pos::new(0, 0)), Cell::new(' ', 1, Look::PLAIN));
        assert_eq!(*buf.cell(Pos::new(1, 0)), Cell::new('a', 1, Look::PLAIN));
    }

    #[test]
    fn narrow_over_owner_blanks_continuation() {
        let mut buf = ScreenBuffer::new(Size::new(4, 1));
        wide_at(&mut buf, 1);
        buf.set_cell(Pos::new(1, 0), Some('a'), 1, Look::PLAIN);

        assert_eq!(*buf.cell(Pos::new(1, 0)), Cell::new('a', 1, Look::PLAIN));
        assert_eq!(*buf.cell(Pos::new(2, 0)), Cell::new(' ', 1, Look::PLAIN));
    }

    #[test]
    fn wide_over_shifted_wide_keeps_pairs_whole() {
        let mut buf = ScreenBuffer::new(Size::new(4, 1));
        wide_at(&mut buf, 0);
        wide_at(&mut buf, 1);

        let widths: Vec<u8> = buf.row(0).iter().map(|c| c.width).collect();
        assert_eq!(widths, vec![1, 2, 0, 1]);
        assert_eq!(buf.cell(Pos::new(0, 0)).ch, ' ');
    }

    #[test]
    fn invalidated_cells_differ_from_any_drawn_cell() {
        let mut buf = filled(3, 1);
        let fresh = ScreenBuffer::new(Size::new(3, 1));
        buf.invalidate();
        for (a, b) in buf.cells().iter().zip(fresh.cells()) {
            assert_ne!(a, b);
        }
    }

    #[test]
    fn copy_from_same_size() {
        let src = filled(3, 2);
        let mut dst = ScreenBuffer::new(Size::new(3, 2));
        dst.copy_from(&src);
        assert_eq!(dst.cells(), src.cells());
    }

    #[test]
    #[should_panic(expected = "mismatched sizes")]
    fn copy_from_size_mismatch_panics() {
        let src = filled(3, 2);
        let mut dst = ScreenBuffer::new(Size::new(2, 2));
        dst.copy_from(&src);
    }

    #[test]
    #[should_panic(expected = "outside")]
    fn cell_out_of_bounds_panics() {
        let buf = ScreenBuffer::new(Size::new(2, 2));
        let _ = buf.cell(Pos::new(5, 5));
    }
}
