//! Packed RGBA colors (`0xRRGGBBAA`)
//!
//! Colors travel to the GPU as a single `u32` per vertex. On little-endian
//! hosts the bytes land as `[a, b, g, r]`, which is why the shaders read the
//! normalized attribute back with a `.abgr` / `.wzyx` swizzle.

use serde::{Deserialize, Serialize};

/// A color packed as `0xRRGGBBAA`.
///
/// Deserializes from a packed number or a hex string (`"#ff8800"`);
/// serializes as the packed number.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "ColorValue", into = "u32")]
pub struct PackedColor(pub u32);

/// Wire forms accepted for a color.
#[derive(Deserialize)]
#[serde(untagged)]
enum ColorValue {
    Packed(u32),
    Hex(String),
}

impl TryFrom<ColorValue> for PackedColor {
    type Error = String;

    fn try_from(value: ColorValue) -> Result<Self, Self::Error> {
        match value {
            ColorValue::Packed(v) => Ok(Self(v)),
            ColorValue::Hex(s) => {
                Self::from_hex_str(&s).ok_or_else(|| format!("invalid hex color {s:?}"))
            }
        }
    }
}

impl From<PackedColor> for u32 {
    fn from(color: PackedColor) -> Self {
        color.0
    }
}

impl PackedColor {
    /// Default link color (light grey, opaque)
    pub const LINK_DEFAULT: PackedColor = PackedColor(0xb3b3_b3ff);
    /// Default node color
    pub const NODE_DEFAULT: PackedColor = PackedColor(0x009e_e8ff);
    pub const WHITE: PackedColor = PackedColor(0xffff_ffff);
    pub const BLACK: PackedColor = PackedColor(0x0000_00ff);

    #[inline]
    pub const fn from_rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self(((r as u32) << 24) | ((g as u32) << 16) | ((b as u32) << 8) | a as u32)
    }

    /// Parse a hex color.
    ///
    /// Accepts `#rgb`, `#rrggbb`, `#rrggbbaa` (with or without `#` or `0x`).
    /// Colors without an alpha channel are opaque.
    pub fn from_hex_str(s: &str) -> Option<Self> {
        let hex = s.trim();
        let hex = hex
            .strip_prefix('#')
            .or_else(|| hex.strip_prefix("0x"))
            .unwrap_or(hex);

        match hex.len() {
            3 => {
                let mut expanded = String::with_capacity(8);
                for c in hex.chars() {
                    expanded.push(c);
                    expanded.push(c);
                }
                expanded.push_str("ff");
                u32::from_str_radix(&expanded, 16).ok().map(Self)
            }
            6 => u32::from_str_radix(hex, 16).ok().map(|rgb| Self((rgb << 8) | 0xff)),
            8 => u32::from_str_radix(hex, 16).ok().map(Self),
            _ => None,
        }
    }

    #[inline]
    pub const fn r(self) -> u8 {
        (self.0 >> 24) as u8
    }

    #[inline]
    pub const fn g(self) -> u8 {
        (self.0 >> 16) as u8
    }

    #[inline]
    pub const fn b(self) -> u8 {
        (self.0 >> 8) as u8
    }

    #[inline]
    pub const fn a(self) -> u8 {
        self.0 as u8
    }

    /// Normalized `[r, g, b, a]` in `0.0..=1.0`.
    pub fn to_f32_array(self) -> [f32; 4] {
        [
            self.r() as f32 / 255.0,
            self.g() as f32 / 255.0,
            self.b() as f32 / 255.0,
            self.a() as f32 / 255.0,
        ]
    }
}

impl Default for PackedColor {
    fn default() -> Self {
        Self::LINK_DEFAULT
    }
}

impl From<u32> for PackedColor {
    fn from(v: u32) -> Self {
        Self(v)
    }
}
