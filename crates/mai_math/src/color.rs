use serde::{Deserialize, Serialize};

/// A vertex color as stored in a color set.
///
/// Color sets are written with either three (RGB) or four (RGBA) channels
/// per entry. Three-channel colors are opaque.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Default for Color {
    fn default() -> Self {
        Self::BLACK
    }
}

impl Color {
    pub const BLACK: Color = Color { r: 0.0, g: 0.0, b: 0.0, a: 1.0 };
    pub const WHITE: Color = Color { r: 1.0, g: 1.0, b: 1.0, a: 1.0 };

    /// Create an opaque RGB color.
    pub fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Create an RGBA color.
    pub fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Build a color from a 3- or 4-channel slice.
    ///
    /// Returns `None` for any other channel count.
    pub fn from_channels(channels: &[f32]) -> Option<Self> {
        match *channels {
            [r, g, b] => Some(Self::rgb(r, g, b)),
            [r, g, b, a] => Some(Self::rgba(r, g, b, a)),
            _ => None,
        }
    }

    /// Split a flat channel stream into colors of `channel_count` channels.
    ///
    /// A trailing partial color is ignored.
    pub fn unpack(values: &[f32], channel_count: usize) -> Vec<Color> {
        if !(3..=4).contains(&channel_count) {
            return Vec::new();
        }
        values
            .chunks_exact(channel_count)
            .filter_map(Color::from_channels)
            .collect()
    }
}
