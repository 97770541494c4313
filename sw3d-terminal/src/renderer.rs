/// Character-cell render target for terminal output
use crossterm::{
    style::{Color as TermColor, Print, ResetColor, SetForegroundColor},
    QueueableCommand,
};
use std::io::Write;
use sw3d_core::{Color, RenderTarget};

/// Character luminosity ramp for shading (darkest to lightest)
const LUMINOSITY_RAMP: &[char] = &[' ', '.', ':', '-', '=', '+', '*', '#', '%', '@'];

/// One colour per terminal cell, written by the core renderer.
pub struct TerminalSurface {
    width: usize,
    height: usize,
    cells: Vec<Color>,
}

impl TerminalSurface {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![Color::BLACK; width * height],
        }
    }

    pub fn resize(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
        self.cells.clear();
        self.cells.resize(width * height, Color::BLACK);
    }

    pub fn cell(&self, x: usize, y: usize) -> Option<Color> {
        if x < self.width && y < self.height {
            Some(self.cells[y * self.width + x])
        } else {
            None
        }
    }

    /// Emit every cell as a shaded character in its own colour.
    pub fn draw<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        let mut current = None;
        for (y, row) in self.cells.chunks(self.width.max(1)).enumerate() {
            for &color in row {
                let [r, g, b] = color.to_rgb8();
                let term_color = TermColor::Rgb { r, g, b };
                if current != Some(term_color) {
                    writer.queue(SetForegroundColor(term_color))?;
                    current = Some(term_color);
                }
                writer.queue(Print(shade_char(color)))?;
            }
            if y + 1 < self.height {
                writer.queue(Print("\r\n"))?;
            }
        }
        writer.queue(ResetColor)?;
        Ok(())
    }
}

impl RenderTarget for TerminalSurface {
    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn set_pixel(&mut self, x: usize, y: usize, color: Color) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = color;
        }
    }

    fn clear(&mut self, color: Color) {
        self.cells.fill(color);
    }
}

/// Map a colour's luminance onto the ramp.
pub fn shade_char(color: Color) -> char {
    let luminance = color.clamped().luminance();
    let index = (luminance * (LUMINOSITY_RAMP.len() - 1) as f64).round() as usize;
    LUMINOSITY_RAMP[index.min(LUMINOSITY_RAMP.len() - 1)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shade_char_ends() {
        assert_eq!(shade_char(Color::BLACK), ' ');
        assert_eq!(shade_char(Color::WHITE), '@');
        assert_eq!(shade_char(Color::new(5.0, 5.0, 5.0)), '@');
        assert_eq!(shade_char(Color::new(0.45, 0.45, 0.45)), '=');
    }

    #[test]
    fn test_surface_is_a_render_target() {
        let mut surface = TerminalSurface::new(4, 2);
        surface.set_pixel(1, 1, Color::WHITE);
        surface.set_pixel(9, 9, Color::WHITE);
        assert_eq!(surface.cell(1, 1), Some(Color::WHITE));
        assert_eq!(surface.cell(9, 9), None);

        surface.clear(Color::CYAN);
        assert_eq!(surface.cell(1, 1), Some(Color::CYAN));

        surface.resize(2, 2);
        assert_eq!(surface.width(), 2);
        assert_eq!(surface.cell(1, 1), Some(Color::BLACK));
    }

    #[test]
    fn test_draw_writes_every_cell() {
        let mut surface = TerminalSurface::new(3, 2);
        surface.set_pixel(0, 0, Color::WHITE);

        let mut out = Vec::new();
        surface.draw(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains('@'));
        assert_eq!(text.matches("\r\n").count(), 1);
    }
}
