//! Hex color decoding

use super::warning::{Resolved, Warning};
use crate::error::{Error, Result};
use schemars::JsonSchema;
use serde::Serialize;

/// RGB color with components in `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, JsonSchema)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0.0, 0.0, 0.0);
    pub const RED: Rgb = Rgb::new(1.0, 0.0, 0.0);

    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Fill color operator for a content stream (`r g b rg`)
    pub fn fill_op(&self) -> String {
        format!("{} {} {} rg", self.r, self.g, self.b)
    }
}

/// Decode `#RRGGBB` (the `#` is optional) into normalized RGB.
///
/// Anything other than six hex digits is rejected.
pub fn hex_to_rgb(hex: &str) -> Result<Rgb> {
    let digits = hex.trim();
    let digits = digits.strip_prefix('#').unwrap_or(digits);

    if digits.len() != 6 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(Error::InvalidColor {
            value: hex.to_string(),
        });
    }

    let channel = |range: std::ops::Range<usize>| -> Result<f32> {
        u8::from_str_radix(&digits[range], 16)
            .map(|v| f32::from(v) / 255.0)
            .map_err(|_| Error::InvalidColor {
                value: hex.to_string(),
            })
    };

    Ok(Rgb {
        r: channel(0..2)?,
        g: channel(2..4)?,
        b: channel(4..6)?,
    })
}

/// Decode a color, substituting `fallback` when it is malformed.
pub fn hex_to_rgb_or(hex: &str, fallback: Rgb) -> Resolved<Rgb> {
    match hex_to_rgb(hex) {
        Ok(rgb) => Resolved::clean(rgb),
        Err(_) => Resolved::with_warnings(
            fallback,
            vec![Warning::InvalidColor {
                value: hex.to_string(),
            }],
        ),
    }
}
