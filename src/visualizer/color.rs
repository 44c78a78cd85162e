// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use image::Rgb;

/// Color type for visualization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color(pub u8, pub u8, pub u8);

impl Color {
    /// Green color.
    pub const GREEN: Color = Color(0, 255, 0);
    /// White color.
    pub const WHITE: Color = Color(255, 255, 255);

    /// Create a new color from RGB values.
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self(r, g, b)
    }

    /// Convert to an `image` pixel.
    pub const fn to_rgb(self) -> Rgb<u8> {
        Rgb([self.0, self.1, self.2])
    }
}

impl From<Color> for Rgb<u8> {
    fn from(color: Color) -> Self {
        color.to_rgb()
    }
}
