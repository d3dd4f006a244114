// SPDX-License-Identifier: MIT
//
// Codepoint and display-width utilities.
//
// The input decoder sees raw bytes and has to decide, one lead byte at a
// time, how long the next UTF-8 sequence is and whether it has arrived in
// full. The renderer and the wrapper need the terminal column width of
// every codepoint. Both live here so neither depends on the other.
//
// Width comes from `unicode-width` (East Asian Width + emoji presentation).
// Control characters have no width and count as 0.

use unicode_width::UnicodeWidthChar;

// ─── Sequence Length ─────────────────────────────────────────────────────────

/// Sequence length indexed by the top bits of a lead byte.
///
/// 0x00-0xBF map to 1 (ASCII, plus stray continuation bytes which are
/// rejected by [`decode`]), 0xC0-0xDF to 2, 0xE0-0xEF to 3, 0xF0-0xF7 to 4,
/// and the obsolete 5/6-byte leads are kept so their runs can be skipped
/// as a unit. 0xFE/0xFF are never valid.
#[rustfmt::skip]
const SEQUENCE_LEN: [u8; 64] = [
    // 0x00..=0x7F (ASCII) in blocks of 4
    1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1,
    1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1,
    // 0x80..=0xBF (continuation)
    1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1,
    // 0xC0..=0xDF, 0xE0..=0xEF, 0xF0..=0xF7, 0xF8..=0xFB, 0xFC..=0xFD, 0xFE..=0xFF
    2, 2, 2, 2, 2, 2, 2, 2, 3, 3, 3, 3, 4, 4, 5, 6,
];

/// Number of bytes in the UTF-8 sequence introduced by `lead`.
///
/// Indexed from a 64-entry table on `lead >> 2`. Returns 1 for ASCII and
/// for bytes that cannot start a sequence.
///
/// ```
/// use termic::utf8::sequence_len;
///
/// assert_eq!(sequence_len(b'a'), 1);
/// assert_eq!(sequence_len(0xC3), 2);
/// assert_eq!(sequence_len(0xE4), 3);
/// assert_eq!(sequence_len(0xF0), 4);
/// ```
#[inline]
#[must_use]
pub const fn sequence_len(lead: u8) -> usize {
    if lead >= 0xFE {
        return 1;
    }
    SEQUENCE_LEN[(lead >> 2) as usize] as usize
}

// ─── Decode ──────────────────────────────────────────────────────────────────

/// Outcome of decoding one codepoint from the front of a byte slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoded {
    /// A complete codepoint and the number of bytes it occupied.
    Char(char, usize),
    /// The lead byte announces more bytes than are available.
    Incomplete,
    /// Malformed input. The `usize` is how many bytes to drop so decoding
    /// can resume at the next plausible lead byte.
    Invalid(usize),
}

/// Decode the first codepoint in `bytes`.
///
/// An empty slice is reported as [`Decoded::Incomplete`].
///
/// ```
/// use termic::utf8::{decode, Decoded};
///
/// assert_eq!(decode("é!".as_bytes()), Decoded::Char('é', 2));
/// assert_eq!(decode(&[0xE4, 0xB8]), Decoded::Incomplete);
/// assert_eq!(decode(&[0x80, b'a']), Decoded::Invalid(1));
/// ```
#[must_use]
pub fn decode(bytes: &[u8]) -> Decoded {
    let Some(&lead) = bytes.first() else {
        return Decoded::Incomplete;
    };

    if lead < 0x80 {
        return Decoded::Char(char::from(lead), 1);
    }

    // Stray continuation byte, or an impossible lead: drop it together with
    // any continuation bytes that trail it.
    let len = sequence_len(lead);
    if (0x80..0xC0).contains(&lead) || lead >= 0xF8 {
        return Decoded::Invalid(continuation_run(bytes, 1).max(1));
    }

    if bytes.len() < len {
        // Bail early if what we have is already broken.
        if bytes[1..].iter().any(|&b| b & 0xC0 != 0x80) {
            return Decoded::Invalid(continuation_run(bytes, 1));
        }
        return Decoded::Incomplete;
    }

    let seq = &bytes[..len];
    if seq[1..].iter().any(|&b| b & 0xC0 != 0x80) {
        return Decoded::Invalid(continuation_run(bytes, 1));
    }

    std::str::from_utf8(seq)
        .ok()
        .and_then(|s| s.chars().next())
        .map_or(Decoded::Invalid(len), |ch| Decoded::Char(ch, len))
}

/// Index of the first byte at or after `from` that is not a continuation byte.
fn continuation_run(bytes: &[u8], from: usize) -> usize {
    let mut end = from;
    while end < bytes.len() && bytes[end] & 0xC0 == 0x80 {
        end += 1;
    }
    end
}

// ─── Display Width ───────────────────────────────────────────────────────────

/// Terminal column width of a codepoint: 0, 1 or 2.
///
/// Combining marks and control characters are 0, CJK ideographs and
/// emoji-presentation characters are 2.
///
/// ```
/// use termic::utf8::char_width;
///
/// assert_eq!(char_width('a'), 1);
/// assert_eq!(char_width('中'), 2);
/// assert_eq!(char_width('\u{0301}'), 0);
/// assert_eq!(char_width('\n'), 0);
/// ```
#[inline]
#[must_use]
pub fn char_width(ch: char) -> usize {
    ch.width().unwrap_or(0)
}

/// Display width of a string, summed over its codepoints.
#[must_use]
pub fn str_width(s: &str) -> usize {
    s.chars().map(char_width).sum()
}

/// Render bytes with control characters made visible, for log output.
///
/// ESC becomes `\e`, C0 controls become `^X`, everything else that is
/// valid UTF-8 passes through; invalid bytes become `\xNN`.
#[must_use]
pub fn escape_debug(bytes: &[u8]) -> String {
    use std::fmt::Write;

    let mut out = String::with_capacity(bytes.len() * 2);
    let mut rest = bytes;
    while !rest.is_empty() {
        match decode(rest) {
            Decoded::Char(ch, n) => {
                match ch {
                    '\x1b' => out.push_str("\\e"),
                    '\n' => out.push_str("\\n"),
                    '\r' => out.push_str("\\r"),
                    '\x01'..='\x1a' => {
                        out.push('^');
                        out.push(char::from(b'A' + (ch as u8) - 1));
                    }
                    c if (c as u32) < 0x20 || c == '\x7f' => {
                        let _ = write!(out, "\\x{:02x}", c as u32);
                    }
                    c => out.push(c),
                }
                rest = &rest[n..];
            }
            Decoded::Incomplete | Decoded::Invalid(_) => {
                let _ = write!(out, "\\x{:02x}", rest[0]);
                rest = &rest[1..];
            }
        }
    }
    out
}

/// Space-separated hex dump of `bytes`, for log output.
#[must_use]
pub fn hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(" ")
}

// ─── Tests ───────────────────────────────────────────────────────────────────
