//! RGBA colors with the CSS-ish hex encoding used throughout style records.

use std::fmt;

/// A RGBA `Color`. Each component is a floating point value with a range
/// from 0 to 1. Serializes as a `#RRGGBBAA` hex string so style documents
/// stay readable.
#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    #[inline]
    pub fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Color { r, g, b, a }
    }

    pub fn white() -> Self {
        Color::new(1.0, 1.0, 1.0, 1.0)
    }

    pub fn black() -> Self {
        Color::new(0.0, 0.0, 0.0, 1.0)
    }

    pub fn red() -> Self {
        Color::new(1.0, 0.0, 0.0, 1.0)
    }

    pub fn green() -> Self {
        Color::new(0.0, 1.0, 0.0, 1.0)
    }

    pub fn blue() -> Self {
        Color::new(0.0, 0.0, 1.0, 1.0)
    }

    pub fn yellow() -> Self {
        Color::new(1.0, 1.0, 0.0, 1.0)
    }

    pub fn cyan() -> Self {
        Color::new(0.0, 1.0, 1.0, 1.0)
    }

    pub fn orange() -> Self {
        Color::new(1.0, 0.65, 0.0, 1.0)
    }

    pub fn transparent() -> Self {
        Color::new(0.0, 0.0, 0.0, 0.0)
    }

    /// Parses `#RGB`, `#RRGGBB` or `#RRGGBBAA` (leading `#` optional).
    pub fn from_hex(v: &str) -> Option<Color> {
        let v = v.trim().trim_start_matches('#');

        let parse = |s: &str| u8::from_str_radix(s, 16).ok();
        match v.len() {
            3 => {
                let r = parse(&v[0..1])? * 17;
                let g = parse(&v[1..2])? * 17;
                let b = parse(&v[2..3])? * 17;
                Some(Color::from_bytes([r, g, b, 255]))
            }
            6 => Some(Color::from_bytes([
                parse(&v[0..2])?,
                parse(&v[2..4])?,
                parse(&v[4..6])?,
                255,
            ])),
            8 => Some(Color::from_bytes([
                parse(&v[0..2])?,
                parse(&v[2..4])?,
                parse(&v[4..6])?,
                parse(&v[6..8])?,
            ])),
            _ => None,
        }
    }

    pub fn to_hex(self) -> String {
        let [r, g, b, a] = self.to_bytes();
        format!("#{:02x}{:02x}{:02x}{:02x}", r, g, b, a)
    }

    #[inline]
    pub fn from_bytes(v: [u8; 4]) -> Color {
        Color::new(
            f32::from(v[0]) / 255.0,
            f32::from(v[1]) / 255.0,
            f32::from(v[2]) / 255.0,
            f32::from(v[3]) / 255.0,
        )
    }

    pub fn to_bytes(self) -> [u8; 4] {
        let v = self.clip();
        [
            (v.r * 255.0).round() as u8,
            (v.g * 255.0).round() as u8,
            (v.b * 255.0).round() as u8,
            (v.a * 255.0).round() as u8,
        ]
    }

    /// Clips each component into `[0, 1]`.
    pub fn clip(self) -> Color {
        Color::new(
            self.r.max(0.0).min(1.0),
            self.g.max(0.0).min(1.0),
            self.b.max(0.0).min(1.0),
            self.a.max(0.0).min(1.0),
        )
    }

    /// Component-wise linear interpolation towards `rhs`.
    pub fn lerp(self, rhs: Color, t: f32) -> Color {
        Color::new(
            self.r + (rhs.r - self.r) * t,
            self.g + (rhs.g - self.g) * t,
            self.b + (rhs.b - self.b) * t,
            self.a + (rhs.a - self.a) * t,
        )
    }

    /// Returns a copy with the given alpha.
    #[inline]
    pub fn with_alpha(self, a: f32) -> Color {
        Color::new(self.r, self.g, self.b, a)
    }

    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

impl From<[f32; 4]> for Color {
    fn from(v: [f32; 4]) -> Self {
        Color::new(v[0], v[1], v[2], v[3])
    }
}

impl ::serde::Serialize for Color {
    fn serialize<S: ::serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> ::serde::Deserialize<'de> for Color {
    fn deserialize<D: ::serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct Visitor;

        impl<'de> ::serde::de::Visitor<'de> for Visitor {
            type Value = Color;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a hex color string or [r, g, b, a] array")
            }

            fn visit_str<E: ::serde::de::Error>(self, v: &str) -> Result<Color, E> {
                Color::from_hex(v)
                    .ok_or_else(|| E::custom(format!("invalid color literal: {}", v)))
            }

            fn visit_seq<A: ::serde::de::SeqAccess<'de>>(self, mut seq: A) -> Result<Color, A::Error> {
                let r = seq.next_element::<f32>()?.unwrap_or(0.0);
                let g = seq.next_element::<f32>()?.unwrap_or(0.0);
                let b = seq.next_element::<f32>()?.unwrap_or(0.0);
                let a = seq.next_element::<f32>()?.unwrap_or(1.0);
                Ok(Color::new(r, g, b, a))
            }
        }

        deserializer.deserialize_any(Visitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_round_trip() {
        let v = Color::from_hex("#ff8000").unwrap();
        assert_eq!(v.to_hex(), "#ff8000ff");
        assert_eq!(Color::from_hex(v.to_hex().as_str()), Some(v));
        assert_eq!(Color::from_hex("fff"), Some(Color::white()));
        assert_eq!(Color::from_hex("#bogus"), None);
    }

    #[test]
    fn lerp_and_clip() {
        let mid = Color::black().lerp(Color::white(), 0.5);
        assert!((mid.r - 0.5).abs() < 1e-6);

        let wild = Color::new(2.0, -1.0, 0.5, 1.5).clip();
        assert_eq!(wild.to_array(), [1.0, 0.0, 0.5, 1.0]);
    }
}
