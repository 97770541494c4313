/// Scanline triangle rasterizer and line drawer
///
/// Triangles are filled row by row. The three edges are walked with an
/// integer Bresenham stepper that records, for every row, the leftmost and
/// rightmost pixel together with the attributes interpolated along the edge.
/// Each row is then filled either by linear interpolation between those two
/// ends (fast) or by recomputing barycentric weights per pixel (precise).

use crate::color::Color;
use crate::framebuffer::RenderTarget;
use crate::math::{Vec2, Vec3};
use crate::texture::Texture;
use crate::zbuffer::ZBuffer;

/// |double signed area| below which a triangle is drawn as a line.
pub const DEGENERATE_AREA: f64 = 1e-8;

/// Vertices further off-screen than this many viewport sizes are rejected.
const MAX_COORDINATE_FACTOR: f64 = 16.0;

/// Upper bound on either side of a clipped bounding box.
const MAX_BOX_DIMENSION: i32 = 16_384;

/// Rows at least this long are filled in fast mode.
const FAST_SPAN_LENGTH: i32 = 32;

/// Triangles covering more than this share of the viewport use fast mode.
const LARGE_TRIANGLE_FRACTION: f64 = 0.1;

/// Steps without movement before a walk is abandoned.
const STUCK_LIMIT: u32 = 10;

/// A vertex in screen space: pixel x/y, normalized depth, colour and UV.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenVertex {
    pub position: Vec3,
    pub color: Color,
    pub uv: Vec2,
}

impl ScreenVertex {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self {
            position: Vec3::new(x, y, z),
            color: Color::WHITE,
            uv: Vec2::zeros(),
        }
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    pub fn with_uv(mut self, uv: Vec2) -> Self {
        self.uv = uv;
        self
    }

    fn is_finite(&self) -> bool {
        self.position.iter().all(|c| c.is_finite())
    }

    fn pixel(&self) -> (i32, i32) {
        (self.position.x.round() as i32, self.position.y.round() as i32)
    }
}

/// What a fill call ended up drawing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coverage {
    /// Filled as a triangle; pixels written.
    Filled(usize),
    /// Degenerate triangle drawn as its longest edge; pixels written.
    Line(usize),
    /// Nothing drawn (off-screen or unusable coordinates).
    Rejected,
}

impl Coverage {
    pub fn pixels(&self) -> usize {
        match self {
            Coverage::Filled(n) | Coverage::Line(n) => *n,
            Coverage::Rejected => 0,
        }
    }
}

/// Attributes interpolated at one pixel.
#[derive(Debug, Clone, Copy)]
struct Fragment {
    x: i32,
    z: f64,
    color: Color,
    uv: Vec2,
}

impl Fragment {
    fn along(from: &ScreenVertex, to: &ScreenVertex, t: f64, x: i32) -> Self {
        Self {
            x,
            z: from.position.z + (to.position.z - from.position.z) * t,
            color: from.color.lerp(to.color, t),
            uv: from.uv.lerp(&to.uv, t),
        }
    }

    fn between(left: &Fragment, right: &Fragment, x: i32) -> Self {
        let length = right.x - left.x;
        let t = if length > 0 {
            (x - left.x) as f64 / length as f64
        } else {
            0.0
        };
        Self {
            x,
            z: left.z + (right.z - left.z) * t,
            color: left.color.lerp(right.color, t),
            uv: left.uv.lerp(&right.uv, t),
        }
    }

    fn barycentric(vertices: &[ScreenVertex; 3], weights: [f64; 3], x: i32) -> Self {
        let [a, b, c] = vertices;
        let [_, wb, wc] = weights;
        // Offsets from `a` keep constant attributes exact.
        let mix = |a: f64, b: f64, c: f64| a + (b - a) * wb + (c - a) * wc;
        Self {
            x,
            z: mix(a.position.z, b.position.z, c.position.z),
            color: Color::new(
                mix(a.color.r, b.color.r, c.color.r),
                mix(a.color.g, b.color.g, c.color.g),
                mix(a.color.b, b.color.b, c.color.b),
            ),
            uv: a.uv + (b.uv - a.uv) * wb + (c.uv - a.uv) * wc,
        }
    }
}

/// Integer line walk with an iteration cap and stuck detection.
///
/// Yields every pixel from start to end inclusive, with the fraction of the
/// line covered so far.
struct Bresenham {
    x: i32,
    y: i32,
    start: (i32, i32),
    end: (i32, i32),
    dx: i32,
    dy: i32,
    sx: i32,
    sy: i32,
    err: i32,
    remaining: u64,
    stuck: u32,
    done: bool,
}

impl Bresenham {
    fn new(start: (i32, i32), end: (i32, i32)) -> Self {
        let dx = (end.0 - start.0).abs();
        let dy = -(end.1 - start.1).abs();
        Self {
            x: start.0,
            y: start.1,
            start,
            end,
            dx,
            dy,
            sx: if start.0 < end.0 { 1 } else { -1 },
            sy: if start.1 < end.1 { 1 } else { -1 },
            err: dx + dy,
            remaining: dx as u64 + (-dy) as u64 + 2,
            stuck: 0,
            done: false,
        }
    }

    fn progress(&self) -> f64 {
        let total = self.dx.max(-self.dy);
        if total == 0 {
            return 0.0;
        }
        let travelled = if self.dx >= -self.dy {
            (self.x - self.start.0).abs()
        } else {
            (self.y - self.start.1).abs()
        };
        travelled as f64 / total as f64
    }
}

impl Iterator for Bresenham {
    type Item = (i32, i32, f64);

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        let item = (self.x, self.y, self.progress());
        if (self.x, self.y) == self.end {
            self.done = true;
            return Some(item);
        }

        let before = (self.x, self.y);
        let e2 = 2 * self.err;
        if e2 >= self.dy {
            self.err += self.dy;
            self.x += self.sx;
        }
        if e2 <= self.dx {
            self.err += self.dx;
            self.y += self.sy;
        }

        if (self.x, self.y) == before {
            self.stuck += 1;
            if self.stuck > STUCK_LIMIT {
                log::trace!("line walk stuck at {:?}, giving up", before);
                self.done = true;
            }
        } else {
            self.stuck = 0;
        }

        Some(item)
    }
}

/// Twice the signed area of `a, b, p`.
fn edge_function(a: &Vec3, b: &Vec3, p: (f64, f64)) -> f64 {
    (b.x - a.x) * (p.1 - a.y) - (b.y - a.y) * (p.0 - a.x)
}

/// The two vertices furthest apart.
fn longest_edge(vertices: &[ScreenVertex; 3]) -> (&ScreenVertex, &ScreenVertex) {
    let [a, b, c] = vertices;
    let length = |p: &ScreenVertex, q: &ScreenVertex| (p.position.xy() - q.position.xy()).norm_squared();
    [(a, b), (b, c), (c, a)]
        .into_iter()
        .max_by(|(p0, q0), (p1, q1)| length(*p0, *q0).total_cmp(&length(*p1, *q1)))
        .unwrap_or((a, b))
}

/// Triangle and line rasterizer for a fixed viewport size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriangleRasterizer {
    width: usize,
    height: usize,
}

impl TriangleRasterizer {
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    fn in_plausible_range(&self, vertex: &ScreenVertex) -> bool {
        let limit_x = self.width.max(1) as f64 * MAX_COORDINATE_FACTOR;
        let limit_y = self.height.max(1) as f64 * MAX_COORDINATE_FACTOR;
        vertex.is_finite()
            && vertex.position.x.abs() <= limit_x
            && vertex.position.y.abs() <= limit_y
    }

    /// Fill a triangle, depth-tested against `zbuffer` when one is given.
    pub fn fill_triangle<T: RenderTarget + ?Sized>(
        &self,
        target: &mut T,
        zbuffer: Option<&mut ZBuffer>,
        vertices: &[ScreenVertex; 3],
        texture: Option<&Texture>,
    ) -> Coverage {
        self.fill(target, zbuffer, vertices, texture, None)
    }

    fn fill<T: RenderTarget + ?Sized>(
        &self,
        target: &mut T,
        mut zbuffer: Option<&mut ZBuffer>,
        vertices: &[ScreenVertex; 3],
        texture: Option<&Texture>,
        force_fast: Option<bool>,
    ) -> Coverage {
        if self.width == 0 || self.height == 0 {
            return Coverage::Rejected;
        }
        if !vertices.iter().all(|v| self.in_plausible_range(v)) {
            log::trace!("rejecting triangle with unusable coordinates: {:?}", vertices);
            return Coverage::Rejected;
        }

        let [a, b, c] = vertices;
        let area = edge_function(&a.position, &b.position, (c.position.x, c.position.y));
        if area.abs() < DEGENERATE_AREA {
            let (from, to) = longest_edge(vertices);
            return Coverage::Line(self.draw_line(target, zbuffer, from, to));
        }

        let min_x = vertices.iter().map(|v| v.position.x).fold(f64::INFINITY, f64::min);
        let max_x = vertices.iter().map(|v| v.position.x).fold(f64::NEG_INFINITY, f64::max);
        let min_y = vertices.iter().map(|v| v.position.y).fold(f64::INFINITY, f64::min);
        let max_y = vertices.iter().map(|v| v.position.y).fold(f64::NEG_INFINITY, f64::max);

        let min_x = (min_x.floor() as i32).max(0);
        let max_x = (max_x.ceil() as i32).min(self.width as i32 - 1);
        let min_y = (min_y.floor() as i32).max(0);
        let max_y = (max_y.ceil() as i32).min(self.height as i32 - 1);
        if min_x > max_x || min_y > max_y {
            return Coverage::Rejected;
        }
        if max_x - min_x >= MAX_BOX_DIMENSION || max_y - min_y >= MAX_BOX_DIMENSION {
            log::trace!("rejecting oversized triangle bounding box");
            return Coverage::Rejected;
        }

        let mut spans: Vec<Option<(Fragment, Fragment)>> = vec![None; (max_y - min_y + 1) as usize];
        for (from, to) in [(a, b), (b, c), (c, a)] {
            walk_edge(from, to, min_y, &mut spans);
        }

        let viewport_area = (self.width * self.height) as f64;
        let large = area.abs() / 2.0 > LARGE_TRIANGLE_FRACTION * viewport_area;
        let inverse_area = 1.0 / area;
        let row_limit = (max_x - min_x + 1) as usize;
        let mut written = 0;

        for (row, span) in spans.iter().enumerate() {
            let Some((left, right)) = span else {
                continue;
            };
            let y = min_y + row as i32;
            let fast = force_fast.unwrap_or(large || right.x - left.x >= FAST_SPAN_LENGTH);

            for (step, x) in (left.x.max(min_x)..=right.x.min(max_x)).enumerate() {
                if step >= row_limit {
                    break;
                }
                let fragment = if fast {
                    Fragment::between(left, right, x)
                } else {
                    let p = (x as f64, y as f64);
                    let weights = [
                        edge_function(&b.position, &c.position, p) * inverse_area,
                        edge_function(&c.position, &a.position, p) * inverse_area,
                        edge_function(&a.position, &b.position, p) * inverse_area,
                    ];
                    Fragment::barycentric(vertices, clamp_weights(weights), x)
                };

                if self.shade(target, zbuffer.as_deref_mut(), y, &fragment, texture) {
                    written += 1;
                }
            }
        }

        Coverage::Filled(written)
    }

    /// Draw a line with depth and colour interpolated between its ends.
    ///
    /// Returns the number of pixels written. A zero-length line is a point.
    pub fn draw_line<T: RenderTarget + ?Sized>(
        &self,
        target: &mut T,
        mut zbuffer: Option<&mut ZBuffer>,
        from: &ScreenVertex,
        to: &ScreenVertex,
    ) -> usize {
        if !self.in_plausible_range(from) || !self.in_plausible_range(to) {
            return 0;
        }

        Bresenham::new(from.pixel(), to.pixel())
            .filter(|&(x, y, t)| {
                let fragment = Fragment::along(from, to, t, x);
                self.shade(target, zbuffer.as_deref_mut(), y, &fragment, None)
            })
            .count()
    }

    /// Depth test and write one fragment. Returns true if the pixel was set.
    fn shade<T: RenderTarget + ?Sized>(
        &self,
        target: &mut T,
        zbuffer: Option<&mut ZBuffer>,
        y: i32,
        fragment: &Fragment,
        texture: Option<&Texture>,
    ) -> bool {
        let x = fragment.x;
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return false;
        }
        if let Some(zbuffer) = zbuffer {
            if !fragment.z.is_finite() || !zbuffer.test_and_set(x, y, fragment.z) {
                return false;
            }
        }

        let color = match texture {
            Some(texture) => texture
                .get_pixel(fragment.uv.x, fragment.uv.y)
                .modulate(fragment.color),
            None => fragment.color,
        };
        target.set_pixel(x as usize, y as usize, color.clamped());
        true
    }
}

/// Record the pixels of one edge in the per-row span table.
fn walk_edge(
    from: &ScreenVertex,
    to: &ScreenVertex,
    min_y: i32,
    spans: &mut [Option<(Fragment, Fragment)>],
) {
    for (x, y, t) in Bresenham::new(from.pixel(), to.pixel()) {
        let row = y - min_y;
        if row < 0 || row as usize >= spans.len() {
            continue;
        }
        let fragment = Fragment::along(from, to, t, x);
        let slot = &mut spans[row as usize];
        *slot = Some(match *slot {
            None => (fragment, fragment),
            Some((left, right)) => (
                if x < left.x { fragment } else { left },
                if x > right.x { fragment } else { right },
            ),
        });
    }
}

/// Clamp barycentric weights of edge pixels back onto the triangle.
fn clamp_weights(weights: [f64; 3]) -> [f64; 3] {
    let clamped = weights.map(|w| w.clamp(0.0, 1.0));
    let sum: f64 = clamped.iter().sum();
    if sum > 0.0 {
        clamped.map(|w| w / sum)
    } else {
        [1.0 / 3.0; 3]
    }
}
