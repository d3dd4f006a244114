// SPDX-License-Identifier: MIT
//
// Word segmentation and greedy line wrapping.
//
// `words` cuts a string into width-annotated spans; `wrap` fills lines up to
// a column limit, hard-splitting (with a trailing hyphen) any word that is
// wider than a whole line. All splitting happens on codepoint boundaries,
// and in South-East Asian mode on grapheme boundaries.
//
// Break modes (loosely after UAX #14):
//
//   Western        — break at breaking whitespace and after '-'.
//   EastAsian      — additionally break after every wide codepoint.
//   SouthEastAsian — scripts without spaces (Thai, Lao, Khmer): break
//                    between any two grapheme clusters.

use unicode_segmentation::UnicodeSegmentation;

use crate::utf8::char_width;

/// Shown instead of any content when the limit is too small to wrap into.
pub const ELLIPSIS: &str = "…";

// ─── Words ───────────────────────────────────────────────────────────────────

/// Which break opportunities [`words`] recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BreakMode {
    #[default]
    Western,
    EastAsian,
    SouthEastAsian,
}

/// A span of the input between break opportunities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Word {
    /// Byte offset of the first codepoint.
    pub start: usize,
    /// Byte offset one past the last codepoint.
    pub end: usize,
    /// Display width in columns.
    pub width: usize,
    /// Ends with a '-' that was treated as a break.
    pub hyphenated: bool,
    /// The next word follows without a space in between.
    pub attached: bool,
}

impl Word {
    #[inline]
    #[must_use]
    pub fn text<'a>(&self, s: &'a str) -> &'a str {
        &s[self.start..self.end]
    }
}

/// Whitespace that permits a line break. No-break spaces are excluded.
///
/// ```
/// use termic::text::is_breaking_space;
///
/// assert!(is_breaking_space(' '));
/// assert!(is_breaking_space('\n'));
/// assert!(!is_breaking_space('\u{a0}'));
/// ```
#[must_use]
pub fn is_breaking_space(ch: char) -> bool {
    ch.is_whitespace() && !matches!(ch, '\u{a0}' | '\u{2007}' | '\u{202f}' | '\u{2060}' | '\u{feff}')
}

/// Segment `s` into words. Leading and repeated spaces are skipped.
///
/// `width` gives the column width of a codepoint.
pub fn words(s: &str, width: impl Fn(char) -> usize, mode: BreakMode) -> Vec<Word> {
    let mut out = Segmenter::default();

    if mode == BreakMode::SouthEastAsian {
        for (i, g) in s.grapheme_indices(true) {
            if g.chars().next().is_some_and(is_breaking_space) {
                out.space(i);
            } else {
                let w = g.chars().map(&width).sum();
                out.push_attached(i, i + g.len(), w);
            }
        }
        out.finish(s.len());
        return out.words;
    }

    for (i, ch) in s.char_indices() {
        let end = i + ch.len_utf8();
        let w = width(ch);

        if is_breaking_space(ch) {
            out.space(i);
        } else if mode == BreakMode::Western && ch == '-' {
            out.extend(i, w);
            out.close(end, true);
        } else if mode == BreakMode::EastAsian && w >= 2 {
            out.close(i, false);
            out.push_attached(i, end, w);
        } else {
            out.extend(i, w);
        }
    }
    out.finish(s.len());
    out.words
}

/// Accumulates the word currently being scanned.
#[derive(Default)]
struct Segmenter {
    words: Vec<Word>,
    start: Option<usize>,
    width: usize,
}

impl Segmenter {
    fn extend(&mut self, at: usize, w: usize) {
        self.start.get_or_insert(at);
        self.width += w;
    }

    /// Emit the pending word ending at `end` as glued to whatever follows.
    fn close(&mut self, end: usize, hyphenated: bool) {
        if let Some(start) = self.start.take() {
            self.words.push(Word {
                start,
                end,
                width: std::mem::take(&mut self.width),
                hyphenated,
                attached: true,
            });
        }
    }

    fn push_attached(&mut self, start: usize, end: usize, width: usize) {
        self.close(start, false);
        self.words.push(Word {
            start,
            end,
            width,
            hyphenated: false,
            attached: true,
        });
    }

    fn space(&mut self, at: usize) {
        if let Some(start) = self.start.take() {
            self.words.push(Word {
                start,
                end: at,
                width: std::mem::take(&mut self.width),
                hyphenated: false,
                attached: false,
            });
        } else if let Some(last) = self.words.last_mut() {
            // A word that was closed by a hyphen or a wide glyph and is
            // followed by a space keeps that space.
            if last.end == at {
                last.attached = false;
            }
        }
    }

    fn finish(&mut self, end: usize) {
        if let Some(start) = self.start.take() {
            self.words.push(Word {
                start,
                end,
                width: std::mem::take(&mut self.width),
                hyphenated: false,
                attached: false,
            });
        }
    }
}

// ─── Wrap ────────────────────────────────────────────────────────────────────

/// Longest prefix of `s` no wider than `limit` columns, and its width.
///
/// Zero-width codepoints that follow the last fitting glyph stay with it.
///
/// ```
/// use termic::text::part_upto_width;
///
/// assert_eq!(part_upto_width("abcdef", 4), ("abcd", 4));
/// assert_eq!(part_upto_width("中文字", 5), ("中文", 4));
/// ```
#[must_use]
pub fn part_upto_width(s: &str, limit: usize) -> (&str, usize) {
    let mut width = 0;
    let mut end = 0;
    for (i, ch) in s.char_indices() {
        let w = char_width(ch);
        if width + w > limit {
            break;
        }
        width += w;
        end = i + ch.len_utf8();
    }
    (&s[..end], width)
}

/// Greedy-fill `s` into lines at most `limit` columns wide.
///
/// Words wider than `limit` are split across lines with a trailing '-'.
/// A `limit` of 2 or less yields a single [`ELLIPSIS`] line.
///
/// ```
/// use termic::text::{wrap, BreakMode};
///
/// assert_eq!(wrap("hello world", 5, BreakMode::Western), ["hello", "world"]);
/// assert_eq!(wrap("superlongword", 5, BreakMode::Western), ["supe-", "rlon-", "gword"]);
/// ```
#[must_use]
pub fn wrap(s: &str, limit: usize, mode: BreakMode) -> Vec<String> {
    if limit <= 2 {
        return vec![ELLIPSIS.to_owned()];
    }

    let mut lines = Lines::new(limit);
    let mut glued = false;

    for word in words(s, char_width, mode) {
        let text = word.text(s);
        let sep = usize::from(!lines.line.is_empty() && !glued);

        if lines.width + sep + word.width <= limit {
            lines.append(text, word.width, sep == 1);
        } else if word.width <= limit {
            lines.flush();
            lines.append(text, word.width, false);
        } else {
            lines.hard_split(text, word.width, sep == 1);
        }
        glued = word.attached;
    }
    lines.flush();

    log::trace!("wrapped {} bytes at {limit} into {} lines", s.len(), lines.done.len());
    lines.done
}

struct Lines {
    limit: usize,
    done: Vec<String>,
    line: String,
    width: usize,
}

impl Lines {
    fn new(limit: usize) -> Self {
        Self {
            limit,
            done: Vec::new(),
            line: String::with_capacity(limit * 2),
            width: 0,
        }
    }

    fn append(&mut self, text: &str, width: usize, space: bool) {
        if space {
            self.line.push(' ');
            self.width += 1;
        }
        self.line.push_str(text);
        self.width += width;
    }

    fn flush(&mut self) {
        if !self.line.is_empty() {
            self.done.push(std::mem::take(&mut self.line));
        }
        self.width = 0;
    }

    fn room(&self, space: bool) -> usize {
        self.limit.saturating_sub(self.width + usize::from(space))
    }

    /// Spread a word wider than a line over as many lines as it needs.
    /// The last fragment stays on the open line.
    fn hard_split(&mut self, mut rest: &str, mut rest_width: usize, mut space: bool) {
        if self.room(space) < 2 {
            self.flush();
            space = false;
        }

        loop {
            let room = self.room(space);
            if rest_width <= room {
                self.append(rest, rest_width, space);
                return;
            }

            let (part, part_width) = part_upto_width(rest, room.saturating_sub(1));
            if part.is_empty() {
                if self.line.is_empty() {
                    // Nothing fits even on a fresh line.
                    self.append(rest, rest_width, false);
                    return;
                }
                self.flush();
                space = false;
                continue;
            }

            self.append(part, part_width, space);
            self.line.push('-');
            self.width += 1;
            self.flush();
            space = false;

            rest = &rest[part.len()..];
            rest_width = rest_width.saturating_sub(part_width);
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
