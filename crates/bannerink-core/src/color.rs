//! Colors and background fills.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors produced while parsing a color string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ColorParseError {
    #[error("Color must start with '#': {0:?}")]
    MissingHash(String),
    #[error("Color must have 3, 6 or 8 hex digits: {0:?}")]
    BadLength(String),
    #[error("Invalid hex digit in color: {0:?}")]
    BadDigit(String),
}

/// Straight-alpha RGBA8 color.
///
/// Serialized as a CSS hex string (`#rrggbb`, or `#rrggbbaa` when not opaque).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    pub const fn black() -> Self {
        Self::rgb(0, 0, 0)
    }

    pub const fn white() -> Self {
        Self::rgb(255, 255, 255)
    }

    /// Whether the color fully covers what is beneath it.
    pub fn is_opaque(&self) -> bool {
        self.a == 255
    }

    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// Parse `#rgb`, `#rrggbb` or `#rrggbbaa`.
    pub fn parse_hex(input: &str) -> Result<Self, ColorParseError> {
        let trimmed = input.trim();
        let hex = trimmed
            .strip_prefix('#')
            .ok_or_else(|| ColorParseError::MissingHash(input.to_string()))?;

        let digit = |s: &str| {
            u8::from_str_radix(s, 16).map_err(|_| ColorParseError::BadDigit(input.to_string()))
        };

        if !hex.is_ascii() {
            return Err(ColorParseError::BadDigit(input.to_string()));
        }

        match hex.len() {
            3 => {
                let expand = |i: usize| digit(&hex[i..i + 1]).map(|v| v * 17);
                Ok(Self::rgb(expand(0)?, expand(1)?, expand(2)?))
            }
            6 => Ok(Self::rgb(digit(&hex[0..2])?, digit(&hex[2..4])?, digit(&hex[4..6])?)),
            8 => Ok(Self::new(
                digit(&hex[0..2])?,
                digit(&hex[2..4])?,
                digit(&hex[4..6])?,
                digit(&hex[6..8])?,
            )),
            _ => Err(ColorParseError::BadLength(input.to_string())),
        }
    }

    /// Format as lowercase CSS hex.
    pub fn to_hex(&self) -> String {
        if self.is_opaque() {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }
}

impl fmt::Display for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Rgba {
    type Err = ColorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_hex(s)
    }
}

impl TryFrom<String> for Rgba {
    type Error = ColorParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse_hex(&value)
    }
}

impl From<Rgba> for String {
    fn from(color: Rgba) -> Self {
        color.to_hex()
    }
}

/// Keyword used on the wire for "no fill".
pub const TRANSPARENT: &str = "transparent";

/// A fill that is either a solid color or nothing at all.
///
/// Used for the banner background and for text box backgrounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Background {
    #[default]
    Transparent,
    Solid(Rgba),
}

impl Background {
    /// The fill color, if any.
    pub fn color(&self) -> Option<Rgba> {
        match self {
            Background::Transparent => None,
            Background::Solid(color) => Some(*color),
        }
    }

    pub fn is_transparent(&self) -> bool {
        matches!(self, Background::Transparent)
    }
}

impl From<Rgba> for Background {
    fn from(color: Rgba) -> Self {
        Background::Solid(color)
    }
}

impl FromStr for Background {
    type Err = ColorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case(TRANSPARENT) {
            Ok(Background::Transparent)
        } else {
            Rgba::parse_hex(s).map(Background::Solid)
        }
    }
}

impl TryFrom<String> for Background {
    type Error = ColorParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Background> for String {
    fn from(background: Background) -> Self {
        match background {
            Background::Transparent => TRANSPARENT.to_string(),
            Background::Solid(color) => color.to_hex(),
        }
    }
}

impl fmt::Display for Background {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from(*self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_forms() {
        assert_eq!(Rgba::parse_hex("#fff").unwrap(), Rgba::white());
        assert_eq!(Rgba::parse_hex("#FF0000").unwrap(), Rgba::rgb(255, 0, 0));
        assert_eq!(Rgba::parse_hex("#00ff0080").unwrap(), Rgba::new(0, 255, 0, 128));
    }

    #[test]
    fn test_parse_hex_errors() {
        assert!(matches!(Rgba::parse_hex("ffffff"), Err(ColorParseError::MissingHash(_))));
        assert!(matches!(Rgba::parse_hex("#ffff"), Err(ColorParseError::BadLength(_))));
        assert!(matches!(Rgba::parse_hex("#gggggg"), Err(ColorParseError::BadDigit(_))));
    }

    #[test]
    fn test_background_wire_form() {
        let solid: Background = serde_json::from_str("\"#3b82f6\"").unwrap();
        assert_eq!(solid, Background::Solid(Rgba::rgb(0x3b, 0x82, 0xf6)));
        assert_eq!(serde_json::to_string(&solid).unwrap(), "\"#3b82f6\"");

        let clear: Background = serde_json::from_str("\"transparent\"").unwrap();
        assert!(clear.is_transparent());
        assert_eq!(serde_json::to_string(&clear).unwrap(), "\"transparent\"");
    }

    #[test]
    fn test_translucent_hex_keeps_alpha() {
        let color = Rgba::new(16, 32, 48, 100);
        assert_eq!(color.to_hex(), "#10203064");
        assert_eq!(Rgba::parse_hex(&color.to_hex()).unwrap(), color);
    }
}
