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

//! `$cSBFF` color markup.
//!
//! A code is `$c` (either case) followed by three digits and one more
//! non-whitespace character:
//!
//! - `S`: attribute digit (0 none, 1 bold, 2 faint, 3 italic, 4 underline, 5 blink, 6 negative)
//! - `B`: background color index, out of range falls back to black
//! - `FF`: foreground code, either `00`-`15` (08 and above are bold) or `0` plus a
//!   color letter (`X r g y b p c w`, with `x R G Y B P C W` the bold variants)
//!
//! Color never carries across a line break: the style resets at every CR/LF.

use crate::style::{Attribute, Color, Style};

/// Default markup code, light grey on black.
pub const DEFAULT_CODE: &str = "0007";

/// A parsed four character color code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ColorCode([u8; 4]);

impl ColorCode {
    /// Parse the four bytes following `$c`.
    pub fn parse(code: &[u8]) -> Option<ColorCode> {
        match code {
            [a, b, c, d, ..]
                if a.is_ascii_digit()
                    && b.is_ascii_digit()
                    && c.is_ascii_digit()
                    && d.is_ascii_graphic() =>
            {
                Some(ColorCode([*a, *b, *c, *d]))
            }
            _ => None,
        }
    }

    /// Resolve the code into a display style.
    pub fn style(&self) -> Style {
        let [attribute, background, fg0, fg1] = self.0;
        let base = Attribute::from_digit(attribute - b'0');
        let background = Color::from_index(background - b'0').unwrap_or(Color::Black);
        let (foreground, bold) = foreground(fg0, fg1);

        let attributes = match (base, bold) {
            (Attribute::Bold, false) | (Attribute::None, false) => Vec::new(),
            (Attribute::None, true) | (Attribute::Bold, true) => vec![Attribute::Bold],
            (other, false) => vec![other],
            (other, true) => vec![other, Attribute::Bold],
        };

        Style {
            attributes,
            foreground,
            background,
        }
    }
}

fn foreground(fg0: u8, fg1: u8) -> (Color, bool) {
    if fg1.is_ascii_digit() {
        let number = (fg0 - b'0') * 10 + (fg1 - b'0');
        return match number {
            0..=7 => (Color::from_index(number).unwrap_or(Color::White), false),
            8..=15 => (Color::from_index(number - 8).unwrap_or(Color::White), true),
            _ => (Color::White, false),
        };
    }
    if fg0 != b'0' {
        return (Color::White, false);
    }
    match fg1 {
        b'X' => (Color::Black, false),
        b'x' => (Color::Black, true),
        b'r' => (Color::Red, false),
        b'R' => (Color::Red, true),
        b'g' => (Color::Green, false),
        b'G' => (Color::Green, true),
        b'y' => (Color::Yellow, false),
        b'Y' => (Color::Yellow, true),
        b'b' => (Color::Blue, false),
        b'B' => (Color::Blue, true),
        b'p' => (Color::Magenta, false),
        b'P' => (Color::Magenta, true),
        b'c' => (Color::Cyan, false),
        b'C' => (Color::Cyan, true),
        b'w' => (Color::White, false),
        b'W' => (Color::White, true),
        _ => (Color::White, false),
    }
}

/// Convert color markup in `input`.
///
/// With `ansi` enabled each code becomes an SGR escape sequence, otherwise the
/// codes are removed. `$$` always yields a literal `$`.
pub fn render(input: &str, ansi: bool) -> String {
    let bytes = input.as_bytes();
    let mut output = String::with_capacity(input.len() + 16);
    let mut styled = false;
    let mut index = 0;
    let mut copied = 0;

    while index < bytes.len() {
        match bytes[index] {
            b'$' if bytes.get(index + 1) == Some(&b'$') => {
                output.push_str(&input[copied..index]);
                output.push('$');
                index += 2;
                copied = index;
            }
            b'$' if matches!(bytes.get(index + 1), Some(b'c' | b'C')) => {
                let Some(code) = ColorCode::parse(&bytes[index + 2..]) else {
                    index += 1;
                    continue;
                };
                output.push_str(&input[copied..index]);
                if ansi {
                    let style = code.style();
                    if style.is_plain() {
                        if styled {
                            Style::write_reset(&mut output);
                        }
                        styled = false;
                    } else {
                        style.write_sgr(&mut output);
                        styled = true;
                    }
                }
                index += 6;
                copied = index;
            }
            b'\r' | b'\n' if styled => {
                output.push_str(&input[copied..index]);
                Style::write_reset(&mut output);
                styled = false;
                copied = index;
                index += 1;
            }
            _ => index += 1,
        }
    }
    output.push_str(&input[copied..]);
    if styled {
        Style::write_reset(&mut output);
    }
    output
}

/// Remove color markup from `input`.
pub fn strip(input: &str) -> String {
    render(input, false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_numeric_codes() {
        let style = ColorCode::parse(b"0012").unwrap().style();
        assert_eq!(style.attributes, vec![Attribute::Bold]);
        assert_eq!(style.foreground, Color::Blue);
        assert_eq!(style.background, Color::Black);
    }

    #[test]
    fn parses_letter_codes() {
        let style = ColorCode::parse(b"040R").unwrap().style();
        assert_eq!(style.attributes, vec![Attribute::Underline, Attribute::Bold]);
        assert_eq!(style.foreground, Color::Red);
        let black = ColorCode::parse(b"000X").unwrap().style();
        assert!(black.attributes.is_empty());
        assert_eq!(black.foreground, Color::Black);
    }

    #[test]
    fn bold_attribute_without_bold_foreground_is_plain() {
        let style = ColorCode::parse(b"1002").unwrap().style();
        assert!(style.attributes.is_empty());
        assert_eq!(style.foreground, Color::Green);
    }

    #[test]
    fn out_of_range_background_is_black() {
        let style = ColorCode::parse(b"0904").unwrap().style();
        assert_eq!(style.background, Color::Black);
    }

    #[test]
    fn renders_ansi_banner() {
        let rendered = render("$c0012A$c0010N$c0011S$c0014I$c0007 colors enabled.\r\n", true);
        assert_eq!(
            rendered,
            "\x1b[1;34;40mA\x1b[1;32;40mN\x1b[1;33;40mS\x1b[1;36;40mI\x1b[0m colors enabled.\r\n"
        );
    }

    #[test]
    fn strips_codes_when_disabled() {
        assert_eq!(
            render("$c0012A$c0010N$c0011S$c0014I$c0007 colors enabled.", false),
            "ANSI colors enabled."
        );
        assert_eq!(strip("$C0009red"), "red");
    }

    #[test]
    fn style_resets_at_line_end() {
        assert_eq!(render("$c0009x\r\ny", true), "\x1b[1;31;40mx\x1b[0m\r\ny");
    }

    #[test]
    fn unterminated_style_is_reset() {
        assert_eq!(render("$c0001red", true), "\x1b[31;40mred\x1b[0m");
    }

    #[test]
    fn leaves_malformed_codes_alone() {
        assert_eq!(render("cost $c12 or $5", true), "cost $c12 or $5");
        assert_eq!(render("100$$", true), "100$");
    }

    #[test]
    fn keeps_multibyte_text() {
        assert_eq!(render("caf\u{e9} $c0002\u{2603}", false), "caf\u{e9} \u{2603}");
    }
}
