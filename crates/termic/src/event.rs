// SPDX-License-Identifier: MIT
//
// Input event types.
//
// Everything the decoder and the event loop hand to an application is an
// `Event`. The set is closed: keys, decoded text, three flavors of mouse
// report, terminal resize, and focus changes. A single read may produce
// several events. A typed letter yields both `Input('a')` and
// `Key(Char('a'))`, so consumers that want text and consumers that want
// key bindings both get what they need without re-decoding.

use std::fmt;

use bitflags::bitflags;

use crate::buffer::{Pos, Size};

// ─── Event ───────────────────────────────────────────────────────────────────

/// A decoded terminal event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// A key or key combination.
    Key(KeyEvent),
    /// A Unicode scalar typed or pasted by the user.
    Input(char),
    /// Pointer motion.
    MouseMove(MouseMove),
    /// Button press, release or double click.
    MouseButton(MouseButton),
    /// Scroll wheel step.
    MouseWheel(MouseWheel),
    /// The terminal changed size.
    Resize(Resize),
    /// The terminal gained (`true`) or lost (`false`) focus.
    Focus(bool),
}

impl Event {
    /// Shorthand for a `Key` event.
    #[must_use]
    pub const fn key(key: Key, modifiers: Modifiers) -> Self {
        Self::Key(KeyEvent { key, modifiers })
    }
}

/// A key with the modifiers held while it was pressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyEvent {
    pub key: Key,
    pub modifiers: Modifiers,
}

impl KeyEvent {
    #[must_use]
    pub const fn new(key: Key, modifiers: Modifiers) -> Self {
        Self { key, modifiers }
    }

    /// `key` with no modifiers held.
    #[must_use]
    pub const fn plain(key: Key) -> Self {
        Self {
            key,
            modifiers: Modifiers::empty(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MouseMove {
    pub pos: Pos,
    pub modifiers: Modifiers,
}

/// A mouse button report.
///
/// Exactly one of `pressed`, `released` and `double_clicked` is set. A
/// double click replaces what would have been the second press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MouseButton {
    /// 0 left, 1 middle, 2 right, 5 and up for extra buttons.
    pub button: u8,
    pub pressed: bool,
    pub released: bool,
    pub double_clicked: bool,
    pub pos: Pos,
    pub modifiers: Modifiers,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MouseWheel {
    /// +1 for a step up, -1 for a step down.
    pub delta: i8,
    pub pos: Pos,
    pub modifiers: Modifiers,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resize {
    pub size: Size,
    pub old_size: Size,
}

// ─── Key ─────────────────────────────────────────────────────────────────────

/// Identity of a key.
///
/// Letters are always reported lowercase. Shift is a modifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    /// A letter, digit, space or other printable key.
    Char(char),
    Backspace,
    Tab,
    Enter,
    Escape,
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    Insert,
    Delete,
    PageUp,
    PageDown,
    /// Keypad 5 with num lock off.
    Center,
    /// F1 through F12.
    F(u8),
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Char(' ') => "Space",
            Self::Char(c) => return write!(f, "{}", c.to_uppercase()),
            Self::F(n) => return write!(f, "F{n}"),
            Self::Backspace => "Backspace",
            Self::Tab => "Tab",
            Self::Enter => "Enter",
            Self::Escape => "Escape",
            Self::Up => "Up",
            Self::Down => "Down",
            Self::Left => "Left",
            Self::Right => "Right",
            Self::Home => "Home",
            Self::End => "End",
            Self::Insert => "Insert",
            Self::Delete => "Delete",
            Self::PageUp => "PageUp",
            Self::PageDown => "PageDown",
            Self::Center => "Center",
        };
        f.write_str(name)
    }
}

bitflags! {
    /// Modifier keys held during a key or mouse event.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct Modifiers: u8 {
        const SHIFT = 0b0001;
        const ALT   = 0b0010;
        const CTRL  = 0b0100;
    }
}

impl Modifiers {
    pub const NONE: Self = Self::empty();

    /// Decode the xterm modifier parameter (`CSI 1;{m}A`): `m - 1` holds
    /// the shift, alt and ctrl bits. Values outside 2..=8 yield `None`.
    #[must_use]
    pub const fn from_xterm(m: u8) -> Option<Self> {
        if m < 2 || m > 8 {
            return None;
        }
        Some(Self::from_bits_truncate(m - 1))
    }

    /// Inverse of [`from_xterm`](Self::from_xterm).
    #[must_use]
    pub const fn to_xterm(self) -> u8 {
        self.bits() + 1
    }
}

impl fmt::Display for Modifiers {
    /// `Ctrl+Alt+Shift` order, joined with `+`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (flag, name) in [(Self::CTRL, "Ctrl"), (Self::ALT, "Alt"), (Self::SHIFT, "Shift")] {
            if self.contains(flag) {
                if !first {
                    f.write_str("+")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }
        Ok(())
    }
}

impl fmt::Display for KeyEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.modifiers.is_empty() {
            write!(f, "{}", self.key)
        } else {
            write!(f, "{}+{}", self.modifiers, self.key)
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
