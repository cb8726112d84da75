//! Colour codes
//!
//! The guest selects colours with SGR codes. Only the reset code and the
//! sixteen foreground codes are recognised; everything else is rejected.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One of the sixteen terminal colours
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NamedColor {
    Black,
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
    White,
    BrightBlack,
    BrightRed,
    BrightGreen,
    BrightYellow,
    BrightBlue,
    BrightMagenta,
    BrightCyan,
    BrightWhite,
}

impl NamedColor {
    /// Position in a 16-entry ANSI palette
    pub fn ansi_index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            NamedColor::Black => "black",
            NamedColor::Red => "red",
            NamedColor::Green => "green",
            NamedColor::Yellow => "yellow",
            NamedColor::Blue => "blue",
            NamedColor::Magenta => "magenta",
            NamedColor::Cyan => "cyan",
            NamedColor::White => "white",
            NamedColor::BrightBlack => "bright-black",
            NamedColor::BrightRed => "bright-red",
            NamedColor::BrightGreen => "bright-green",
            NamedColor::BrightYellow => "bright-yellow",
            NamedColor::BrightBlue => "bright-blue",
            NamedColor::BrightMagenta => "bright-magenta",
            NamedColor::BrightCyan => "bright-cyan",
            NamedColor::BrightWhite => "bright-white",
        }
    }
}

impl fmt::Display for NamedColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A recognised SGR colour code
///
/// Construction goes through [`ColorCode::new`], so every value maps to a
/// [`NamedColor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct ColorCode(u8);

impl ColorCode {
    /// SGR 0: reset to the default foreground
    pub const RESET: ColorCode = ColorCode(0);
    /// SGR 37: the initial style
    pub const WHITE: ColorCode = ColorCode(37);

    /// Validate a numeric code
    pub fn new(code: u8) -> Option<Self> {
        lookup(code).map(|_| Self(code))
    }

    pub fn code(self) -> u8 {
        self.0
    }

    /// The colour this code selects
    pub fn named(self) -> NamedColor {
        // Unreachable fallback: `new` only admits codes with a table entry
        lookup(self.0).unwrap_or(NamedColor::White)
    }
}

impl TryFrom<u8> for ColorCode {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        ColorCode::new(code).ok_or_else(|| format!("unknown colour code {code}"))
    }
}

impl From<ColorCode> for u8 {
    fn from(code: ColorCode) -> u8 {
        code.0
    }
}

impl fmt::Display for ColorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn lookup(code: u8) -> Option<NamedColor> {
    let color = match code {
        0 => NamedColor::White,
        30 => NamedColor::Black,
        31 => NamedColor::Red,
        32 => NamedColor::Green,
        33 => NamedColor::Yellow,
        34 => NamedColor::Blue,
        35 => NamedColor::Magenta,
        36 => NamedColor::Cyan,
        37 => NamedColor::White,
        90 => NamedColor::BrightBlack,
        91 => NamedColor::BrightRed,
        92 => NamedColor::BrightGreen,
        93 => NamedColor::BrightYellow,
        94 => NamedColor::BrightBlue,
        95 => NamedColor::BrightMagenta,
        96 => NamedColor::BrightCyan,
        97 => NamedColor::BrightWhite,
        _ => return None,
    };
    Some(color)
}
