/// Decoded texture sampling
use crate::color::Color;
use crate::error::RenderError;

/// An already-decoded image, sampled by normalized UV coordinates.
///
/// `v = 0` is the bottom row, `v = 1` the top row.
#[derive(Debug, Clone, PartialEq)]
pub struct Texture {
    width: usize,
    height: usize,
    pixels: Vec<Color>,
}

impl Texture {
    pub fn new(width: usize, height: usize, pixels: Vec<Color>) -> Result<Self, RenderError> {
        if width == 0 || height == 0 || pixels.len() != width * height {
            return Err(RenderError::InvalidTexture {
                width,
                height,
                pixels: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn from_fn(
        width: usize,
        height: usize,
        mut f: impl FnMut(usize, usize) -> Color,
    ) -> Result<Self, RenderError> {
        let pixels = (0..height)
            .flat_map(|y| (0..width).map(move |x| (x, y)))
            .map(|(x, y)| f(x, y))
            .collect();
        Self::new(width, height, pixels)
    }

    /// Two-colour checkerboard with `cells` squares per side.
    pub fn checkerboard(size: usize, cells: usize, a: Color, b: Color) -> Result<Self, RenderError> {
        let cell = (size / cells.max(1)).max(1);
        Self::from_fn(size, size, |x, y| {
            if (x / cell + y / cell) % 2 == 0 {
                a
            } else {
                b
            }
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    fn texel(&self, x: usize, y: usize) -> Color {
        self.pixels[y * self.width + x]
    }

    /// Continuous texel coordinates for a clamped UV pair.
    fn texel_coords(&self, u: f64, v: f64) -> (f64, f64) {
        let clamp = |c: f64| if c.is_nan() { 0.0 } else { c.clamp(0.0, 1.0) };
        let x = clamp(u) * (self.width - 1) as f64;
        let y = (1.0 - clamp(v)) * (self.height - 1) as f64;
        (x, y)
    }

    /// Nearest-neighbour sample
    pub fn get_pixel(&self, u: f64, v: f64) -> Color {
        let (x, y) = self.texel_coords(u, v);
        self.texel(x.round() as usize, y.round() as usize)
    }

    /// Bilinear blend of the four surrounding texels
    pub fn get_pixel_bilinear(&self, u: f64, v: f64) -> Color {
        let (x, y) = self.texel_coords(u, v);
        let (x0, y0) = (x.floor() as usize, y.floor() as usize);
        let x1 = (x0 + 1).min(self.width - 1);
        let y1 = (y0 + 1).min(self.height - 1);
        let (tx, ty) = (x - x0 as f64, y - y0 as f64);

        let top = self.texel(x0, y0).lerp(self.texel(x1, y0), tx);
        let bottom = self.texel(x0, y1).lerp(self.texel(x1, y1), tx);
        top.lerp(bottom, ty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient() -> Texture {
        // Two by two: black, white on the top row; red, blue on the bottom.
        Texture::new(
            2,
            2,
            vec![
                Color::BLACK,
                Color::WHITE,
                Color::new(1.0, 0.0, 0.0),
                Color::new(0.0, 0.0, 1.0),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_rejects_bad_dimensions() {
        assert!(Texture::new(2, 2, vec![Color::BLACK; 3]).is_err());
        assert!(Texture::new(0, 0, Vec::new()).is_err());
    }

    #[test]
    fn test_nearest_sampling_with_clamping() {
        let texture = gradient();
        assert_eq!(texture.get_pixel(0.0, 1.0), Color::BLACK);
        assert_eq!(texture.get_pixel(1.0, 1.0), Color::WHITE);
        assert_eq!(texture.get_pixel(0.0, 0.0), Color::new(1.0, 0.0, 0.0));
        assert_eq!(texture.get_pixel(-3.0, 7.0), Color::BLACK);
        assert_eq!(texture.get_pixel(5.0, -1.0), Color::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn test_bilinear_sampling() {
        let texture = gradient();
        let top_middle = texture.get_pixel_bilinear(0.5, 1.0);
        assert!((top_middle.r - 0.5).abs() < 1e-12);
        let center = texture.get_pixel_bilinear(0.5, 0.5);
        assert!((center.r - 0.5).abs() < 1e-12);
        assert!((center.b - 0.5).abs() < 1e-12);
        assert_eq!(texture.get_pixel_bilinear(1.0, 0.0), Color::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn test_checkerboard() {
        let texture = Texture::checkerboard(8, 2, Color::WHITE, Color::BLACK).unwrap();
        assert_eq!(texture.get_pixel(0.0, 1.0), Color::WHITE);
        assert_eq!(texture.get_pixel(1.0, 1.0), Color::BLACK);
    }
}
