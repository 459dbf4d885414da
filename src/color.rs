//! `#RRGGBB` colors

use std::str::FromStr;

use serde::Deserialize;

use crate::error::{Error, Result};

/// RGB color with components in 0.0..=1.0
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(try_from = "String")]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb { r: 0.0, g: 0.0, b: 0.0 };
    pub const WHITE: Rgb = Rgb { r: 1.0, g: 1.0, b: 1.0 };

    /// Parse `#RRGGBB` (the leading `#` is optional)
    pub fn from_hex(hex: &str) -> Result<Self> {
        let digits = hex.trim().trim_start_matches('#');
        if digits.len() != 6 || !digits.is_ascii() {
            return Err(invalid(hex));
        }
        let channel = |i: usize| {
            u8::from_str_radix(&digits[i..i + 2], 16)
                .map(|v| f32::from(v) / 255.0)
                .map_err(|_| invalid(hex))
        };
        Ok(Rgb {
            r: channel(0)?,
            g: channel(2)?,
            b: channel(4)?,
        })
    }
}

fn invalid(hex: &str) -> Error {
    Error::validation(format!("Invalid color '{hex}', expected #RRGGBB"))
}

impl Default for Rgb {
    fn default() -> Self {
        Rgb::BLACK
    }
}

impl FromStr for Rgb {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Rgb::from_hex(s)
    }
}

impl TryFrom<String> for Rgb {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Rgb::from_hex(&value)
    }
}
