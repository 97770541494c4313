/// Render targets and the in-memory framebuffer
use crate::color::Color;

/// A 2D surface the renderer can write pixels into.
pub trait RenderTarget {
    fn width(&self) -> usize;
    fn height(&self) -> usize;

    /// Write one pixel. Callers stay within `width() x height()`.
    fn set_pixel(&mut self, x: usize, y: usize, color: Color);

    /// Fill the whole surface with `color`.
    fn clear(&mut self, color: Color) {
        for y in 0..self.height() {
            for x in 0..self.width() {
                self.set_pixel(x, y, color);
            }
        }
    }
}

/// Row-major colour buffer
#[derive(Debug, Clone, PartialEq)]
pub struct Framebuffer {
    width: usize,
    height: usize,
    pixels: Vec<Color>,
}

impl Framebuffer {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![Color::BLACK; width * height],
        }
    }

    pub fn get_pixel(&self, x: usize, y: usize) -> Option<Color> {
        if x < self.width && y < self.height {
            Some(self.pixels[y * self.width + x])
        } else {
            None
        }
    }

    pub fn pixels(&self) -> &[Color] {
        &self.pixels
    }

    /// Packed 8-bit RGB rows, e.g. for handing to an image encoder.
    pub fn to_rgb8(&self) -> Vec<u8> {
        self.pixels.iter().flat_map(|c| c.to_rgb8()).collect()
    }
}

impl RenderTarget for Framebuffer {
    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn set_pixel(&mut self, x: usize, y: usize, color: Color) {
        if x < self.width && y < self.height {
            self.pixels[y * self.width + x] = color;
        }
    }

    fn clear(&mut self, color: Color) {
        self.pixels.fill(color);
    }
}
