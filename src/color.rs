// Copyright (c) 2026 rezky_nightky

use crossterm::style::Color as TermColor;

/// An RGB triple. Channels are bytes, so every value is packable.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// A color stored as three decimal fields: `rrrgggbbb`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct PackedColor(u32);

pub const fn pack(c: Color) -> PackedColor {
    PackedColor(c.r as u32 * 1_000_000 + c.g as u32 * 1_000 + c.b as u32)
}

pub const fn unpack(p: PackedColor) -> Color {
    let v = p.0;
    Color {
        r: (v / 1_000_000) as u8,
        g: ((v / 1_000) % 1_000) as u8,
        b: (v % 1_000) as u8,
    }
}

impl From<Color> for PackedColor {
    fn from(c: Color) -> Self {
        pack(c)
    }
}

impl From<PackedColor> for Color {
    fn from(p: PackedColor) -> Self {
        unpack(p)
    }
}

const CONSOLE_PRIMARY_THRESHOLD: u8 = 128;
const CONSOLE_INTENSITY_THRESHOLD: u8 = 200;

/// Nearest of the 16 console colors.
///
/// Each channel above the primary threshold lights its bit; any channel
/// above the intensity threshold selects the bright variant.
pub fn nearest_console_color(c: Color) -> TermColor {
    let red = c.r > CONSOLE_PRIMARY_THRESHOLD;
    let green = c.g > CONSOLE_PRIMARY_THRESHOLD;
    let blue = c.b > CONSOLE_PRIMARY_THRESHOLD;
    let bright = c.r > CONSOLE_INTENSITY_THRESHOLD
        || c.g > CONSOLE_INTENSITY_THRESHOLD
        || c.b > CONSOLE_INTENSITY_THRESHOLD;

    match (red, green, blue, bright) {
        (false, false, false, false) => TermColor::Black,
        (true, false, false, false) => TermColor::DarkRed,
        (false, true, false, false) => TermColor::DarkGreen,
        (true, true, false, false) => TermColor::DarkYellow,
        (false, false, true, false) => TermColor::DarkBlue,
        (true, false, true, false) => TermColor::DarkMagenta,
        (false, true, true, false) => TermColor::DarkCyan,
        (true, true, true, false) => TermColor::Grey,
        (false, false, false, true) => TermColor::DarkGrey,
        (true, false, false, true) => TermColor::Red,
        (false, true, false, true) => TermColor::Green,
        (true, true, false, true) => TermColor::Yellow,
        (false, false, true, true) => TermColor::Blue,
        (true, false, true, true) => TermColor::Magenta,
        (false, true, true, true) => TermColor::Cyan,
        (true, true, true, true) => TermColor::White,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_uses_decimal_fields() {
        assert_eq!(pack(Color::rgb(255, 0, 0)), PackedColor(255_000_000));
        assert_eq!(pack(Color::rgb(1, 2, 3)), PackedColor(1_002_003));
        assert_eq!(pack(Color::BLACK), PackedColor(0));
    }

    #[test]
    fn unpack_inverts_pack_for_every_channel_value() {
        for v in 0..=255u8 {
            for c in [
                Color::rgb(v, 0, 0),
                Color::rgb(0, v, 0),
                Color::rgb(0, 0, v),
                Color::rgb(v, 255 - v, v / 2),
            ] {
                assert_eq!(unpack(pack(c)), c);
            }
        }
    }

    #[test]
    fn unpack_inverts_pack_on_a_channel_grid() {
        for r in (0..=255u8).step_by(17) {
            for g in (0..=255u8).step_by(15) {
                for b in (0..=255u8).step_by(5) {
                    let c = Color::rgb(r, g, b);
                    assert_eq!(Color::from(PackedColor::from(c)), c);
                }
            }
        }
    }

    #[test]
    fn console_color_thresholds() {
        assert_eq!(nearest_console_color(Color::BLACK), TermColor::Black);
        assert_eq!(nearest_console_color(Color::rgb(128, 0, 0)), TermColor::Black);
        assert_eq!(nearest_console_color(Color::rgb(129, 0, 0)), TermColor::DarkRed);
        assert_eq!(nearest_console_color(Color::rgb(255, 0, 0)), TermColor::Red);
        assert_eq!(nearest_console_color(Color::rgb(0, 201, 0)), TermColor::Green);
        assert_eq!(nearest_console_color(Color::rgb(150, 150, 150)), TermColor::Grey);
        assert_eq!(nearest_console_color(Color::rgb(255, 255, 255)), TermColor::White);
        assert_eq!(nearest_console_color(Color::rgb(0, 0, 210)), TermColor::Blue);
    }
}
