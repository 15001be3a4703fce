//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

use std::fmt::Write;

/// The eight basic ANSI colors.
///
/// Foreground codes are `30 + index`, background codes are `40 + index`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Color {
    /// Black (0)
    Black,
    /// Red (1)
    Red,
    /// Green (2)
    Green,
    /// Yellow (3)
    Yellow,
    /// Blue (4)
    Blue,
    /// Magenta (5)
    Magenta,
    /// Cyan (6)
    Cyan,
    /// White (7)
    White,
}

impl Color {
    /// Look up a color by its ANSI index (0-7).
    pub fn from_index(index: u8) -> Option<Color> {
        match index {
            0 => Some(Color::Black),
            1 => Some(Color::Red),
            2 => Some(Color::Green),
            3 => Some(Color::Yellow),
            4 => Some(Color::Blue),
            5 => Some(Color::Magenta),
            6 => Some(Color::Cyan),
            7 => Some(Color::White),
            _ => None,
        }
    }

    /// ANSI index of this color.
    pub fn index(self) -> u8 {
        self as u8
    }

    /// SGR parameter selecting this color as foreground.
    pub fn foreground(self) -> u8 {
        30 + self.index()
    }

    /// SGR parameter selecting this color as background.
    pub fn background(self) -> u8 {
        40 + self.index()
    }
}

/// Text attribute selected by the first digit of a color code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Attribute {
    /// No attribute
    None,
    /// Bold or increased intensity
    Bold,
    /// Faint or decreased intensity
    Faint,
    /// Italic
    Italic,
    /// Underline
    Underline,
    /// Slow blink
    Blink,
    /// Reverse video
    Negative,
}

impl Attribute {
    /// Look up an attribute by its markup digit, out of range digits select [`Attribute::None`].
    pub fn from_digit(digit: u8) -> Attribute {
        match digit {
            1 => Attribute::Bold,
            2 => Attribute::Faint,
            3 => Attribute::Italic,
            4 => Attribute::Underline,
            5 => Attribute::Blink,
            6 => Attribute::Negative,
            _ => Attribute::None,
        }
    }

    /// SGR parameter for this attribute, `None` for [`Attribute::None`].
    pub fn sgr(self) -> Option<u8> {
        match self {
            Attribute::None => None,
            Attribute::Bold => Some(1),
            Attribute::Faint => Some(2),
            Attribute::Italic => Some(3),
            Attribute::Underline => Some(4),
            Attribute::Blink => Some(5),
            Attribute::Negative => Some(7),
        }
    }
}

/// A resolved display style.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Style {
    /// Attributes in emission order, duplicates removed
    pub attributes: Vec<Attribute>,
    /// Foreground color
    pub foreground: Color,
    /// Background color
    pub background: Color,
}

impl Style {
    /// Light grey on black with no attributes.
    pub fn plain() -> Style {
        Style {
            attributes: Vec::new(),
            foreground: Color::White,
            background: Color::Black,
        }
    }

    /// Whether this style renders identically to [`Style::plain`].
    pub fn is_plain(&self) -> bool {
        self.attributes.is_empty()
            && self.foreground == Color::White
            && self.background == Color::Black
    }

    /// Append the SGR escape sequence selecting this style.
    pub fn write_sgr(&self, out: &mut String) {
        out.push_str("\x1b[");
        for attribute in &self.attributes {
            if let Some(code) = attribute.sgr() {
                let _ = write!(out, "{};", code);
            }
        }
        let _ = write!(
            out,
            "{};{}m",
            self.foreground.foreground(),
            self.background.background()
        );
    }

    /// Append the SGR reset sequence.
    pub fn write_reset(out: &mut String) {
        out.push_str("\x1b[0m");
    }
}

impl Default for Style {
    fn default() -> Self {
        Style::plain()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_codes() {
        assert_eq!(Color::Blue.foreground(), 34);
        assert_eq!(Color::Cyan.background(), 46);
        assert_eq!(Color::from_index(8), None);
    }

    #[test]
    fn sgr_sequence() {
        let style = Style {
            attributes: vec![Attribute::Underline, Attribute::Bold],
            foreground: Color::Red,
            background: Color::Blue,
        };
        let mut out = String::new();
        style.write_sgr(&mut out);
        assert_eq!(out, "\x1b[4;1;31;44m");
    }

    #[test]
    fn plain_style() {
        assert!(Style::plain().is_plain());
        assert!(Style::default().is_plain());
    }
}
