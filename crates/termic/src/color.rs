// SPDX-License-Identifier: MIT
//
// Cell colors.
//
// A color is either a concrete 24-bit RGB value or one of two sentinels:
//
//   Default  — the terminal's own foreground/background (SGR 39 / 49).
//   NoChange — "leave whatever the cell already has". Only meaningful as
//              an argument to a draw call; it never reaches a stored cell
//              and never reaches the terminal.
//
// Arithmetic (interpolation) only ever touches the RGB payload. The
// sentinels are resolved at the write boundary in `ansi.rs`.

use std::fmt;

// ─── Color ───────────────────────────────────────────────────────────────────

/// A foreground or background color.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Color {
    /// Terminal default color.
    #[default]
    Default,
    /// Keep the target cell's current color.
    NoChange,
    /// 24-bit RGB.
    Rgb(u8, u8, u8),
}

impl Color {
    pub const BLACK: Self = Self::hex(0x00_0000);
    pub const RED: Self = Self::hex(0xff_0000);
    pub const GREEN: Self = Self::hex(0x00_ff00);
    pub const BLUE: Self = Self::hex(0x00_00ff);
    pub const YELLOW: Self = Self::hex(0xff_ff00);
    pub const ORANGE: Self = Self::hex(0xff_8800);
    pub const CYAN: Self = Self::hex(0x00_ffff);
    pub const PURPLE: Self = Self::hex(0xcd_00e0);
    pub const PINK: Self = Self::hex(0xf7_97f8);
    pub const WHITE: Self = Self::hex(0xff_ffff);

    pub const GREY10: Self = Self::hex(0x19_1919);
    pub const GREY20: Self = Self::hex(0x32_3232);
    pub const GREY30: Self = Self::hex(0x4c_4c4c);
    pub const GREY40: Self = Self::hex(0x66_6666);
    pub const GREY50: Self = Self::hex(0x80_8080);
    pub const GREY60: Self = Self::hex(0x99_9999);
    pub const GREY70: Self = Self::hex(0xb3_b3b3);
    pub const GREY80: Self = Self::hex(0xcc_cccc);
    pub const GREY90: Self = Self::hex(0xe6_e6e6);
    pub const GREY: Self = Self::GREY50;
    pub const DARK_GREY: Self = Self::GREY20;
    pub const LIGHT_GREY: Self = Self::GREY80;

    /// Build an RGB color from its channels.
    #[inline]
    #[must_use]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::Rgb(r, g, b)
    }

    /// Build an RGB color from `0xRRGGBB`. Bits above 24 are ignored.
    ///
    /// ```
    /// use termic::color::Color;
    ///
    /// assert_eq!(Color::hex(0xff8800), Color::Rgb(255, 136, 0));
    /// ```
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)] // each channel is masked to 8 bits
    pub const fn hex(rgb: u32) -> Self {
        Self::Rgb(
            ((rgb >> 16) & 0xff) as u8,
            ((rgb >> 8) & 0xff) as u8,
            (rgb & 0xff) as u8,
        )
    }

    /// The RGB payload, or `None` for a sentinel.
    #[inline]
    #[must_use]
    pub const fn to_rgb(self) -> Option<(u8, u8, u8)> {
        match self {
            Self::Rgb(r, g, b) => Some((r, g, b)),
            Self::Default | Self::NoChange => None,
        }
    }

    /// Whether this is the [`NoChange`](Self::NoChange) sentinel.
    #[inline]
    #[must_use]
    pub const fn is_no_change(self) -> bool {
        matches!(self, Self::NoChange)
    }

    /// Linear interpolation from `self` (blend 0) to `other` (blend 1).
    ///
    /// `blend` must lie in `[0, 1]`; anything else is a caller bug, caught
    /// in debug builds and clamped in release. Sentinels cannot be mixed,
    /// so if either side is one the nearer endpoint is returned as-is.
    ///
    /// ```
    /// use termic::color::Color;
    ///
    /// let mid = Color::BLACK.lerp(Color::WHITE, 0.5);
    /// assert_eq!(mid, Color::Rgb(127, 127, 127));
    /// ```
    #[must_use]
    pub fn lerp(self, other: Self, blend: f32) -> Self {
        debug_assert!(
            (0.0..=1.0).contains(&blend),
            "blend factor out of range: {blend}"
        );
        let blend = blend.clamp(0.0, 1.0);

        match (self, other) {
            (Self::Rgb(ar, ag, ab), Self::Rgb(br, bg, bb)) => Self::Rgb(
                mix(ar, br, blend),
                mix(ag, bg, blend),
                mix(ab, bb, blend),
            ),
            _ if blend < 0.5 => self,
            _ => other,
        }
    }
}

/// One channel of [`Color::lerp`], truncating toward zero.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)] // result is always within the two u8 endpoints
fn mix(a: u8, b: u8, blend: f32) -> u8 {
    let a = f32::from(a);
    let b = f32::from(b);
    (a - blend * (a - b)) as u8
}

impl fmt::Debug for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => f.write_str("Default"),
            Self::NoChange => f.write_str("NoChange"),
            Self::Rgb(r, g, b) => write!(f, "#{r:02x}{g:02x}{b:02x}"),
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
