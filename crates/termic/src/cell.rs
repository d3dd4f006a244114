// SPDX-License-Identifier: MIT
//
// Cell — one character slot of the screen grid.
//
// A Cell holds a single codepoint, its display width, and the Look it is
// drawn with (foreground, background, style bits). The screen buffer is a
// flat grid of these and the renderer diffs them field by field.
//
// Wide characters (CJK, emoji) occupy two columns. The left cell holds the
// codepoint with width 2; the cell to its right is a continuation cell with
// width 0 and no glyph. The renderer emits nothing for continuation cells
// because the terminal already advanced past them.
//
// Sentinels:
//
//   Color::NoChange and Style::NO_CHANGE mean "keep what the cell has".
//   They are only honoured by ScreenBuffer::set_cell and never stored.

use std::fmt;

use crate::color::Color;

// ─── Style ───────────────────────────────────────────────────────────────────

bitflags::bitflags! {
    /// Text style bits, each mapping to an SGR set/clear pair.
    ///
    /// ```
    /// use termic::cell::Style;
    ///
    /// let s = Style::BOLD | Style::UNDERLINE;
    /// assert!(s.contains(Style::INTENSE));
    /// assert!(!s.contains(Style::ITALIC));
    /// ```
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct Style: u8 {
        /// SGR 1 / 22.
        const BOLD          = 1 << 0;
        /// SGR 2 / 22. Loses to `BOLD` when both are set.
        const DIM           = 1 << 1;
        /// SGR 3 / 23.
        const ITALIC        = 1 << 2;
        /// SGR 4 / 24.
        const UNDERLINE     = 1 << 3;
        /// SGR 9 / 29.
        const STRIKETHROUGH = 1 << 4;
        /// SGR 7 / 27.
        const INVERSE       = 1 << 5;
        /// Leave the cell's style as it is.
        const NO_CHANGE     = 1 << 7;

        const INTENSE       = Self::BOLD.bits();
        const FAINT         = Self::DIM.bits();
        const OVERSTRIKE    = Self::STRIKETHROUGH.bits();
        const REVERSE       = Self::INVERSE.bits();
    }
}

impl Style {
    /// No style bits.
    pub const NORMAL: Self = Self::empty();

    /// Whether this is the [`NO_CHANGE`](Self::NO_CHANGE) sentinel.
    #[inline]
    #[must_use]
    pub const fn is_no_change(self) -> bool {
        self.contains(Self::NO_CHANGE)
    }

    /// The style as it reaches the terminal: the sentinel bit is dropped
    /// and `DIM` is dropped when `BOLD` is present.
    #[inline]
    #[must_use]
    pub const fn effective(self) -> Self {
        let s = self.difference(Self::NO_CHANGE);
        if s.contains(Self::BOLD) {
            s.difference(Self::DIM)
        } else {
            s
        }
    }
}

// ─── Look ────────────────────────────────────────────────────────────────────

/// Colors and style a glyph is drawn with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Look {
    pub fg: Color,
    pub bg: Color,
    pub style: Style,
}

impl Look {
    /// Terminal default foreground over whatever background is already
    /// there, no style.
    pub const DEFAULT: Self = Self {
        fg: Color::Default,
        bg: Color::NoChange,
        style: Style::NORMAL,
    };

    /// Touch nothing.
    pub const UNCHANGED: Self = Self {
        fg: Color::NoChange,
        bg: Color::NoChange,
        style: Style::NO_CHANGE,
    };

    /// Default colors on both layers, no style. The look of a blank cell.
    pub const PLAIN: Self = Self {
        fg: Color::Default,
        bg: Color::Default,
        style: Style::NORMAL,
    };

    #[inline]
    #[must_use]
    pub const fn new(fg: Color, bg: Color, style: Style) -> Self {
        Self { fg, bg, style }
    }

    /// A look that only paints the background.
    ///
    /// ```
    /// use termic::cell::{Look, Style};
    /// use termic::color::Color;
    ///
    /// let look = Look::bg(Color::BLUE);
    /// assert_eq!(look.fg, Color::NoChange);
    /// assert!(look.style.is_no_change());
    /// ```
    #[inline]
    #[must_use]
    pub const fn bg(color: Color) -> Self {
        Self {
            fg: Color::NoChange,
            bg: color,
            style: Style::NO_CHANGE,
        }
    }

    /// Foreground color only, default background.
    #[inline]
    #[must_use]
    pub const fn fg(color: Color) -> Self {
        Self {
            fg: color,
            ..Self::DEFAULT
        }
    }

    #[inline]
    #[must_use]
    pub const fn with_style(self, style: Style) -> Self {
        Self { style, ..self }
    }

    /// Overlay `self` on `base`: every sentinel field keeps `base`'s value.
    #[must_use]
    pub const fn over(self, base: Self) -> Self {
        Self {
            fg: if self.fg.is_no_change() { base.fg } else { self.fg },
            bg: if self.bg.is_no_change() { base.bg } else { self.bg },
            style: if self.style.is_no_change() {
                base.style
            } else {
                self.style
            },
        }
    }
}

impl Default for Look {
    fn default() -> Self {
        Self::DEFAULT
    }
}

// ─── Cell ────────────────────────────────────────────────────────────────────

/// A single screen cell.
///
/// `ch == '\0'` means "no glyph": a blank cell when `width == 1`, or the
/// right half of a wide glyph when `width == 0`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cell {
    pub ch: char,
    pub width: u8,
    pub look: Look,
}

impl Cell {
    /// A blank cell in the terminal's default colors.
    pub const EMPTY: Self = Self {
        ch: '\0',
        width: 1,
        look: Look::PLAIN,
    };

    #[inline]
    #[must_use]
    pub const fn new(ch: char, width: u8, look: Look) -> Self {
        Self { ch, width, look }
    }

    /// The right half of a wide glyph.
    #[inline]
    #[must_use]
    pub const fn continuation(look: Look) -> Self {
        Self {
            ch: '\0',
            width: 0,
            look,
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_continuation(self) -> bool {
        self.width == 0
    }

    /// Whether the cell carries no glyph of its own.
    #[inline]
    #[must_use]
    pub const fn is_blank(self) -> bool {
        self.ch == '\0'
    }

    /// The glyph, or `None` for blank and continuation cells.
    #[inline]
    #[must_use]
    pub const fn glyph(self) -> Option<char> {
        if self.ch == '\0' { None } else { Some(self.ch) }
    }
}

impl Default for Cell {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl fmt::Debug for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let glyph = match (self.glyph(), self.width) {
            (_, 0) => "<cont>".to_owned(),
            (None, _) => "<blank>".to_owned(),
            (Some(c), _) => format!("{c:?}"),
        };
        write!(
            f,
            "Cell({glyph} w{} fg={:?} bg={:?} {:?})",
            self.width, self.look.fg, self.look.bg, self.look.style
        )
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    // ── Style ───────────────────────────────────────────────────────────

    #[test]
    fn style_aliases() {
        assert_eq!(Style::INTENSE, Style::BOLD);
        assert_eq!(Style::FAINT, Style::DIM);
        assert_eq!(Style::OVERSTRIKE, Style::STRIKETHROUGH);
        assert_eq!(Style::REVERSE, Style::INVERSE);
    }

    #[test]
    fn effective_style_prefers_bold() {
        let s = Style::BOLD | Style::DIM | Style::ITALIC;
        assert_eq!(s.effective(), Style::BOLD | Style::ITALIC);
        assert_eq!(Style::DIM.effective(), Style::DIM);
    }

    #[test]
    fn effective_style_drops_sentinel() {
        assert_eq!((Style::NO_CHANGE | Style::UNDERLINE).effective(), Style::UNDERLINE);
    }

    // ── Look ────────────────────────────────────────────────────────────

    #[test]
    fn default_look_keeps_background() {
        let look = Look::default();
        assert_eq!(look.fg, Color::Default);
        assert_eq!(look.bg, Color::NoChange);
        assert_eq!(look.style, Style::NORMAL);
    }

    #[test]
    fn over_fills_sentinels_from_base() {
        let base = Look::new(Color::RED, Color::GREEN, Style::ITALIC);
        let merged = Look::bg(Color::BLUE).over(base);
        assert_eq!(merged, Look::new(Color::RED, Color::BLUE, Style::ITALIC));
        assert_eq!(Look::UNCHANGED.over(base), base);
    }

    // ── Cell ────────────────────────────────────────────────────────────

    #[test]
    fn empty_cell() {
        let c = Cell::default();
        assert!(c.is_blank());
        assert!(!c.is_continuation());
        assert_eq!(c.glyph(), None);
        assert_eq!(c.look, Look::PLAIN);
    }

    #[test]
    fn continuation_cell() {
        let c = Cell::continuation(Look::PLAIN);
        assert!(c.is_continuation());
        assert!(c.is_blank());
    }

    #[test]
    fn equality_compares_every_field() {
        let a = Cell::new('x', 1, Look::PLAIN);
        assert_eq!(a, a);
        assert_ne!(a, Cell::new('y', 1, Look::PLAIN));
        assert_ne!(a, Cell::new('x', 1, Look::fg(Color::RED)));
    }

    #[test]
    fn debug_format() {
        let c = Cell::new('a', 1, Look::fg(Color::RED));
        let s = format!("{c:?}");
        assert!(s.starts_with("Cell('a' w1 fg=#ff0000 bg=NoChange"), "{s}");
        assert!(format!("{:?}", Cell::continuation(Look::PLAIN)).contains("<cont>"));
    }
}
