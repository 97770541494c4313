/// Linear RGB colour with `f64` channels in [0, 1]
use std::ops::Mul;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Color {
    pub const BLACK: Color = Color::new(0.0, 0.0, 0.0);
    pub const WHITE: Color = Color::new(1.0, 1.0, 1.0);
    pub const GREY: Color = Color::new(0.5, 0.5, 0.5);
    pub const CYAN: Color = Color::new(0.0, 1.0, 1.0);
    pub const ORANGE: Color = Color::new(1.0, 0.6, 0.2);

    pub const fn new(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b }
    }

    /// Every channel clamped to [0, 1]; NaN becomes 0.
    pub fn clamped(self) -> Self {
        let clamp = |c: f64| if c.is_nan() { 0.0 } else { c.clamp(0.0, 1.0) };
        Self::new(clamp(self.r), clamp(self.g), clamp(self.b))
    }

    pub fn to_rgb8(self) -> [u8; 3] {
        let c = self.clamped();
        [
            (c.r * 255.0).round() as u8,
            (c.g * 255.0).round() as u8,
            (c.b * 255.0).round() as u8,
        ]
    }

    /// Channel-wise product.
    pub fn modulate(self, other: Color) -> Self {
        Self::new(self.r * other.r, self.g * other.g, self.b * other.b)
    }

    pub fn lerp(self, other: Color, t: f64) -> Self {
        let mix = |a: f64, b: f64| a + (b - a) * t;
        Self::new(mix(self.r, other.r), mix(self.g, other.g), mix(self.b, other.b))
    }

    /// Perceived brightness (Rec. 601 weights).
    pub fn luminance(self) -> f64 {
        0.299 * self.r + 0.587 * self.g + 0.114 * self.b
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::BLACK
    }
}

impl Mul<f64> for Color {
    type Output = Color;

    fn mul(self, rhs: f64) -> Color {
        Color::new(self.r * rhs, self.g * rhs, self.b * rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamping() {
        let c = Color::new(1.5, -0.2, f64::NAN).clamped();
        assert_eq!(c, Color::new(1.0, 0.0, 0.0));
        assert_eq!(Color::new(2.0, 0.5, 0.0).to_rgb8(), [255, 128, 0]);
    }

    #[test]
    fn test_lerp_and_modulate() {
        let mid = Color::BLACK.lerp(Color::WHITE, 0.25);
        assert!((mid.g - 0.25).abs() < 1e-12);
        assert_eq!(Color::WHITE.modulate(Color::ORANGE), Color::ORANGE);
    }
}
