// SPDX-License-Identifier: MIT
//
// Key sequence table.
//
// Terminals encode keys as short byte strings: `\x7f` for Backspace,
// `\x1b[A` for Up, `\x1b[1;5A` for Ctrl+Up, `\x1bx` for Alt+X. Many of
// them share prefixes (`\x1b` alone is Escape), so the decoder matches
// greedily: the table is sorted longest first and the first entry that
// is a prefix of the input wins.
//
// The built-in table is generated once, checked for two entries claiming
// the same bytes, and kept in a `static` for the life of the process.
//
// Modifier parameters follow xterm: `CSI 1;{m}X` and `CSI {n};{m}~` with
// m - 1 holding the shift (1), alt (2) and ctrl (4) bits.

use std::collections::HashMap;
use std::sync::LazyLock;

use crate::error::KeyTableError;
use crate::event::{Key, KeyEvent, Modifiers};
use crate::utf8;

// ─── Types ───────────────────────────────────────────────────────────────────

/// One byte string and the key it stands for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySequence {
    pub bytes: Vec<u8>,
    pub key: Key,
    pub modifiers: Modifiers,
}

impl KeySequence {
    #[must_use]
    pub fn new(bytes: impl Into<Vec<u8>>, key: Key, modifiers: Modifiers) -> Self {
        Self {
            bytes: bytes.into(),
            key,
            modifiers,
        }
    }

    #[must_use]
    pub const fn event(&self) -> KeyEvent {
        KeyEvent::new(self.key, self.modifiers)
    }
}

/// Key sequences sorted longest first, with no duplicate byte strings.
#[derive(Debug, Clone)]
pub struct KeyTable {
    entries: Vec<KeySequence>,
}

static BUILTIN: LazyLock<Result<KeyTable, KeyTableError>> =
    LazyLock::new(|| KeyTable::new(builtin_sequences()));

impl KeyTable {
    /// Validate and sort `entries`.
    ///
    /// # Errors
    ///
    /// [`KeyTableError`] naming both mappings if two entries share the
    /// same bytes, even when they map to the same key.
    pub fn new(mut entries: Vec<KeySequence>) -> Result<Self, KeyTableError> {
        let mut seen: HashMap<&[u8], usize> = HashMap::with_capacity(entries.len());
        for (idx, entry) in entries.iter().enumerate() {
            if let Some(&prev) = seen.get(entry.bytes.as_slice()) {
                return Err(KeyTableError {
                    sequence: utf8::escape_debug(&entry.bytes),
                    first: entries[prev].event().to_string(),
                    second: entry.event().to_string(),
                });
            }
            seen.insert(&entry.bytes, idx);
        }

        // Stable, so equal-length entries keep their listed order.
        entries.sort_by_key(|e| std::cmp::Reverse(e.bytes.len()));
        log::debug!("key table: {} sequences", entries.len());
        Ok(Self { entries })
    }

    /// The terminal key table shared by every decoder.
    ///
    /// # Errors
    ///
    /// A [`KeyTableError`] if the built-in list is inconsistent.
    pub fn builtin() -> Result<&'static Self, KeyTableError> {
        BUILTIN.as_ref().map_err(Clone::clone)
    }

    /// The longest entry that is a prefix of `input`.
    #[must_use]
    pub fn longest_prefix(&self, input: &[u8]) -> Option<&KeySequence> {
        self.entries.iter().find(|e| input.starts_with(&e.bytes))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &KeySequence> {
        self.entries.iter()
    }
}

// ─── Built-in Sequences ──────────────────────────────────────────────────────

/// Final bytes of `CSI X` / `CSI 1;{m}X` keys.
const CSI_LETTERS: [(u8, Key); 7] = [
    (b'A', Key::Up),
    (b'B', Key::Down),
    (b'C', Key::Right),
    (b'D', Key::Left),
    (b'H', Key::Home),
    (b'F', Key::End),
    (b'E', Key::Center),
];

/// SS3 keys: `ESC O X`. Also sent as `CSI 1;{m}X` when modified.
const SS3_FUNCTION: [(u8, Key); 4] = [
    (b'P', Key::F(1)),
    (b'Q', Key::F(2)),
    (b'R', Key::F(3)),
    (b'S', Key::F(4)),
];

/// Application-mode cursor keys.
const SS3_CURSOR: [(u8, Key); 6] = [
    (b'A', Key::Up),
    (b'B', Key::Down),
    (b'C', Key::Right),
    (b'D', Key::Left),
    (b'H', Key::Home),
    (b'F', Key::End),
];

/// `CSI {n}~` keys.
const TILDE: [(u8, Key); 14] = [
    (1, Key::Home),
    (2, Key::Insert),
    (3, Key::Delete),
    (4, Key::End),
    (5, Key::PageUp),
    (6, Key::PageDown),
    (15, Key::F(5)),
    (17, Key::F(6)),
    (18, Key::F(7)),
    (19, Key::F(8)),
    (20, Key::F(9)),
    (21, Key::F(10)),
    (23, Key::F(11)),
    (24, Key::F(12)),
];

fn builtin_sequences() -> Vec<KeySequence> {
    let none = Modifiers::NONE;
    let mut seqs = vec![
        KeySequence::new(*b"\x7f", Key::Backspace, none),
        KeySequence::new(*b"\t", Key::Tab, none),
        KeySequence::new(*b"\r", Key::Enter, none),
        KeySequence::new(*b"\x1b", Key::Escape, none),
        KeySequence::new(*b"\x1b[Z", Key::Tab, Modifiers::SHIFT),
    ];

    // Ctrl+letter is the letter's position in the alphabet. Tab (^I) and
    // Enter (^M) keep their own names.
    for byte in 0x01..=0x1a_u8 {
        let letter = Key::Char(char::from(b'a' + byte - 1));
        if byte != b'\t' && byte != b'\r' {
            seqs.push(KeySequence::new([byte], letter, Modifiers::CTRL));
        }
        seqs.push(KeySequence::new([0x1b, byte], letter, Modifiers::ALT | Modifiers::CTRL));
    }

    for lower in b'a'..=b'z' {
        let letter = Key::Char(char::from(lower));
        seqs.push(KeySequence::new([0x1b, lower], letter, Modifiers::ALT));
        seqs.push(KeySequence::new(
            [0x1b, lower.to_ascii_uppercase()],
            letter,
            Modifiers::ALT | Modifiers::SHIFT,
        ));
    }

    for (fin, key) in CSI_LETTERS {
        seqs.push(KeySequence::new([0x1b, b'[', fin], key, none));
    }
    for (fin, key) in SS3_FUNCTION {
        seqs.push(KeySequence::new([0x1b, b'O', fin], key, none));
    }
    for (fin, key) in SS3_CURSOR {
        seqs.push(KeySequence::new([0x1b, b'O', fin], key, none));
    }
    for (n, key) in TILDE {
        seqs.push(KeySequence::new(format!("\x1b[{n}~"), key, none));
    }

    for m in 2..=8_u8 {
        let Some(mods) = Modifiers::from_xterm(m) else {
            continue;
        };
        for (fin, key) in CSI_LETTERS.iter().chain(&SS3_FUNCTION) {
            let fin = char::from(*fin);
            seqs.push(KeySequence::new(format!("\x1b[1;{m}{fin}"), *key, mods));
        }
        for (n, key) in TILDE {
            seqs.push(KeySequence::new(format!("\x1b[{n};{m}~"), key, mods));
        }
    }

    seqs
}

// ─── Tests ───────────────────────────────────────────────────────────────────
