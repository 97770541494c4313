/// Per-frame render orchestration
use crate::camera::{project_to_ndc, vertex_to_screen, Camera};
use crate::error::{RenderError, Result};
use crate::framebuffer::RenderTarget;
use crate::math::{signed_double_area, Mat4, Matrix4Ext, Vec2, Vec3, VectorExt, EPSILON};
use crate::mesh::{IndexKind, Mesh, MeshError, Polygon};
use crate::normals::face_normal;
use crate::rasterizer::{Coverage, ScreenVertex, TriangleRasterizer};
use crate::settings::RenderSettings;
use crate::transform::{AffineTransform, ModelMatrixBuilder, ModelTransform};
use crate::triangulation::{triangulate_or_fan, Triangulator, TriangulatorKind};
use crate::zbuffer::ZBuffer;

/// Depth offset toward the camera for wireframe outlines.
const WIREFRAME_DEPTH_BIAS: f64 = 1e-4;

/// Counters for one `render_model` call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub polygons_drawn: usize,
    pub polygons_culled: usize,
    /// Polygons with a vertex behind the eye or closer than the near plane.
    pub polygons_clipped: usize,
    /// Malformed polygons, logged and left out.
    pub polygons_skipped: usize,
    pub triangles_filled: usize,
    pub pixels_written: usize,
}

enum PolygonOutcome {
    Drawn { triangles: usize, pixels: usize },
    Culled,
    Clipped,
}

/// Everything fixed for the duration of one `render_model` call.
struct Frame<'a> {
    camera: &'a Camera,
    mesh: &'a Mesh,
    settings: &'a RenderSettings,
    model: Mat4,
    mvp: Mat4,
    rasterizer: TriangleRasterizer,
}

/// Owns the per-frame raster state and draws meshes into a render target.
pub struct RenderEngine {
    triangulator: Box<dyn Triangulator>,
    zbuffer: ZBuffer,
    viewport: (usize, usize),
}

impl RenderEngine {
    pub fn new(triangulator: Box<dyn Triangulator>) -> Self {
        Self {
            triangulator,
            zbuffer: ZBuffer::new(0, 0),
            viewport: (0, 0),
        }
    }

    pub fn with_kind(kind: TriangulatorKind) -> Self {
        Self::new(kind.build())
    }

    pub fn set_triangulator(&mut self, triangulator: Box<dyn Triangulator>) {
        self.triangulator = triangulator;
    }

    pub fn zbuffer(&self) -> &ZBuffer {
        &self.zbuffer
    }

    /// Size of the current frame, `(0, 0)` before the first `begin_frame`.
    pub fn viewport(&self) -> (usize, usize) {
        self.viewport
    }

    /// Start a frame: clear the target to the background colour and reset
    /// the depth buffer.
    pub fn begin_frame<T: RenderTarget + ?Sized>(
        &mut self,
        target: &mut T,
        width: usize,
        height: usize,
        settings: &RenderSettings,
    ) -> Result<()> {
        if width == 0 || height == 0 || width > target.width() || height > target.height() {
            return Err(RenderError::InvalidViewport {
                width,
                height,
                target_width: target.width(),
                target_height: target.height(),
            });
        }

        target.clear(settings.background_color);
        if self.zbuffer.width() != width || self.zbuffer.height() != height {
            self.zbuffer.resize(width, height);
        }
        self.zbuffer.clear();
        self.viewport = (width, height);
        Ok(())
    }

    /// Draw one model into the current frame.
    ///
    /// Malformed polygons are logged and skipped; only a missing frame is an
    /// error.
    pub fn render_model<T: RenderTarget + ?Sized>(
        &mut self,
        target: &mut T,
        camera: &Camera,
        mesh: &Mesh,
        transform: Option<&ModelTransform>,
        settings: &RenderSettings,
    ) -> Result<RenderStats> {
        let (width, height) = self.viewport;
        if width == 0 || height == 0 || width > target.width() || height > target.height() {
            return Err(RenderError::InvalidViewport {
                width,
                height,
                target_width: target.width(),
                target_height: target.height(),
            });
        }

        let model = ModelMatrixBuilder::from_transform(transform);
        let frame = Frame {
            camera,
            mesh,
            settings,
            model,
            mvp: AffineTransform::mvp_matrix(
                &model,
                &camera.view_matrix(),
                &camera.projection_matrix(),
            ),
            rasterizer: TriangleRasterizer::new(width, height),
        };

        let mut stats = RenderStats::default();
        for (index, polygon) in mesh.polygons.iter().enumerate() {
            let outcome = polygon
                .validate(mesh)
                .map_err(RenderError::from)
                .and_then(|()| self.draw_polygon(target, &frame, polygon));

            match outcome {
                Ok(PolygonOutcome::Drawn { triangles, pixels }) => {
                    stats.polygons_drawn += 1;
                    stats.triangles_filled += triangles;
                    stats.pixels_written += pixels;
                }
                Ok(PolygonOutcome::Culled) => stats.polygons_culled += 1,
                Ok(PolygonOutcome::Clipped) => stats.polygons_clipped += 1,
                Err(err) => {
                    log::warn!("skipping polygon {}: {}", index, err);
                    stats.polygons_skipped += 1;
                }
            }
        }

        log::debug!("rendered model: {:?}", stats);
        Ok(stats)
    }

    /// Render a single model as a complete frame.
    #[allow(clippy::too_many_arguments)]
    pub fn render<T: RenderTarget + ?Sized>(
        &mut self,
        target: &mut T,
        camera: &Camera,
        mesh: &Mesh,
        transform: Option<&ModelTransform>,
        width: usize,
        height: usize,
        settings: &RenderSettings,
    ) -> Result<RenderStats> {
        self.begin_frame(target, width, height, settings)?;
        self.render_model(target, camera, mesh, transform, settings)
    }

    fn draw_polygon<T: RenderTarget + ?Sized>(
        &mut self,
        target: &mut T,
        frame: &Frame<'_>,
        polygon: &Polygon,
    ) -> Result<PolygonOutcome> {
        let settings = frame.settings;
        let (width, height) = (frame.rasterizer.width(), frame.rasterizer.height());
        let positions = frame.mesh.polygon_vertices(polygon)?;

        let mut screen = Vec::with_capacity(positions.len());
        for position in &positions {
            let (ndc, w) = project_to_ndc(&frame.mvp, position);
            if w <= EPSILON || ndc.z > 1.0 || !ndc.iter().all(|c| c.is_finite()) {
                return Ok(PolygonOutcome::Clipped);
            }
            let xy = vertex_to_screen(&ndc, width, height);
            screen.push(Vec3::new(xy.x, xy.y, ndc.z));
        }

        // Counter-clockwise front faces come out clockwise once y points down.
        if settings.backface_culling {
            let outline: Vec<Vec2> = screen.iter().map(|p| p.xy()).collect();
            if signed_double_area(&outline) >= 0.0 {
                return Ok(PolygonOutcome::Culled);
            }
        }

        let world: Vec<Vec3> = positions
            .iter()
            .map(|p| frame.model.mul_point(p).xyz())
            .collect();
        let color = settings.fill_color * flat_intensity(settings, frame.camera, &world);

        let mut vertices = Vec::with_capacity(screen.len());
        for (corner, position) in screen.iter().enumerate() {
            let mut vertex = ScreenVertex::new(position.x, position.y, position.z).with_color(color);
            if let Some(&uv_index) = polygon.texture_vertex_indices.get(corner) {
                vertex.uv = frame.mesh.texture_vertex(uv_index)?;
            }
            vertices.push(vertex);
        }

        let triangles = if !settings.filled || !settings.rasterization {
            None
        } else if polygon.vertex_count() == 3 {
            Some(vec![polygon.clone()])
        } else if settings.triangulation {
            Some(self.triangulate(frame.mesh, polygon)?)
        } else {
            None
        };

        let mut filled = 0;
        let mut pixels = 0;
        for triangle in triangles.iter().flatten() {
            let corners = triangle_corners(frame.mesh, polygon, triangle, &vertices)?;
            let zbuffer = settings.z_buffer.then_some(&mut self.zbuffer);
            let coverage =
                frame
                    .rasterizer
                    .fill_triangle(target, zbuffer, &corners, settings.active_texture());
            if coverage != Coverage::Rejected {
                filled += 1;
                pixels += coverage.pixels();
            }
        }

        if settings.wireframe || (settings.filled && triangles.is_none()) {
            pixels += self.draw_outline(target, frame, &vertices);
        }

        Ok(PolygonOutcome::Drawn {
            triangles: filled,
            pixels,
        })
    }

    fn triangulate(&self, mesh: &Mesh, polygon: &Polygon) -> Result<Vec<Polygon>> {
        Ok(triangulate_or_fan(self.triangulator.as_ref(), mesh, polygon)?)
    }

    fn draw_outline<T: RenderTarget + ?Sized>(
        &mut self,
        target: &mut T,
        frame: &Frame<'_>,
        vertices: &[ScreenVertex],
    ) -> usize {
        let settings = frame.settings;
        let outline: Vec<ScreenVertex> = vertices
            .iter()
            .map(|v| {
                ScreenVertex::new(v.position.x, v.position.y, v.position.z + WIREFRAME_DEPTH_BIAS)
                    .with_color(settings.wireframe_color)
            })
            .collect();

        let mut pixels = 0;
        for (i, from) in outline.iter().enumerate() {
            let to = &outline[(i + 1) % outline.len()];
            let zbuffer = settings.z_buffer.then_some(&mut self.zbuffer);
            pixels += frame.rasterizer.draw_line(target, zbuffer, from, to);
        }
        pixels
    }
}

impl Default for RenderEngine {
    fn default() -> Self {
        Self::with_kind(TriangulatorKind::default())
    }
}

/// ambient + (1 - ambient) * max(0, n . l), with l pointing at the camera.
fn flat_intensity(settings: &RenderSettings, camera: &Camera, world: &[Vec3]) -> f64 {
    if !settings.lighting || world.len() < 3 {
        return 1.0;
    }
    let normal = face_normal(&world[0], &world[1], &world[2]);
    let centroid = world.iter().fold(Vec3::zeros(), |sum, p| sum + p) / world.len() as f64;
    match (camera.position - centroid).checked_normalize() {
        Ok(to_camera) => {
            settings.ambient + (1.0 - settings.ambient) * normal.dot(&to_camera).max(0.0)
        }
        Err(_) => 1.0,
    }
}

/// Screen vertices for the corners of `triangle`, a piece of `polygon`.
fn triangle_corners(
    mesh: &Mesh,
    polygon: &Polygon,
    triangle: &Polygon,
    vertices: &[ScreenVertex],
) -> Result<[ScreenVertex; 3]> {
    if triangle.vertex_count() != 3 {
        return Err(MeshError::TooFewVertices {
            count: triangle.vertex_count(),
        }
        .into());
    }

    let mut corners = [ScreenVertex::new(0.0, 0.0, 0.0); 3];
    for (k, corner) in corners.iter_mut().enumerate() {
        let index = triangle.vertex_indices[k];
        let local = polygon
            .vertex_indices
            .iter()
            .position(|&v| v == index)
            .ok_or(MeshError::IndexOutOfRange {
                kind: IndexKind::Vertex,
                index,
                len: mesh.vertices.len(),
            })?;
        *corner = vertices[local];
        if let Some(&uv_index) = triangle.texture_vertex_indices.get(k) {
            corner.uv = mesh.texture_vertex(uv_index)?;
        }
    }
    Ok(corners)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;
    use crate::framebuffer::Framebuffer;

    fn unlit() -> RenderSettings {
        RenderSettings::default()
            .with_lighting(false)
            .with_fill_color(Color::WHITE)
    }

    #[test]
    fn test_render_requires_a_frame() {
        let mut engine = RenderEngine::default();
        let mut fb = Framebuffer::new(32, 32);
        let camera = Camera::new(32, 32);
        let result = engine.render_model(&mut fb, &camera, &Mesh::cube(2.0), None, &unlit());
        assert!(matches!(result, Err(RenderError::InvalidViewport { .. })));
    }

    #[test]
    fn test_viewport_must_fit_the_target() {
        let mut engine = RenderEngine::default();
        let mut fb = Framebuffer::new(32, 32);
        let settings = unlit();
        assert!(engine.begin_frame(&mut fb, 0, 32, &settings).is_err());
        assert!(engine.begin_frame(&mut fb, 64, 32, &settings).is_err());
        assert!(engine.begin_frame(&mut fb, 32, 16, &settings).is_ok());
        assert_eq!(engine.viewport(), (32, 16));
        assert_eq!(engine.zbuffer().height(), 16);
    }

    #[test]
    fn test_cube_culls_back_faces() {
        let mut engine = RenderEngine::default();
        let mut fb = Framebuffer::new(32, 32);
        let camera = Camera::new(32, 32);
        let stats = engine
            .render(&mut fb, &camera, &Mesh::cube(2.0), None, 32, 32, &unlit())
            .unwrap();

        // Looking straight down -z only the front face is visible.
        assert_eq!(stats.polygons_drawn, 1);
        assert_eq!(stats.polygons_culled, 5);
        assert_eq!(stats.triangles_filled, 2);
        assert_eq!(fb.get_pixel(16, 16), Some(Color::WHITE));
        assert_eq!(fb.get_pixel(0, 0), Some(Color::BLACK));
    }

    #[test]
    fn test_malformed_polygons_are_skipped() {
        let mut mesh = Mesh::cube(2.0);
        mesh.add_polygon(Polygon::new(vec![0, 1, 99]));
        mesh.add_polygon(Polygon::new(vec![0, 0, 1]));

        let mut engine = RenderEngine::default();
        let mut fb = Framebuffer::new(32, 32);
        let camera = Camera::new(32, 32);
        let stats = engine
            .render(&mut fb, &camera, &mesh, None, 32, 32, &unlit())
            .unwrap();
        assert_eq!(stats.polygons_skipped, 2);
        assert_eq!(stats.polygons_drawn, 1);
    }

    #[test]
    fn test_polygons_behind_the_camera_are_clipped() {
        let mut engine = RenderEngine::default();
        let mut fb = Framebuffer::new(32, 32);
        let camera = Camera::new(32, 32);
        let behind = ModelTransform::new(
            Vec3::new(0.0, 0.0, 10.0),
            Vec3::zeros(),
            Vec3::new(1.0, 1.0, 1.0),
        );
        let stats = engine
            .render(&mut fb, &camera, &Mesh::cube(2.0), Some(&behind), 32, 32, &unlit())
            .unwrap();
        assert_eq!(stats.polygons_drawn, 0);
        assert_eq!(stats.polygons_clipped, 6);
        assert!(fb.pixels().iter().all(|&c| c == Color::BLACK));
    }

    #[test]
    fn test_flat_lighting() {
        let camera = Camera::new(32, 32);
        let settings = RenderSettings::default().with_ambient(0.2);
        let facing = [
            Vec3::new(-1.0, -1.0, 0.0),
            Vec3::new(1.0, -1.0, 0.0),
            Vec3::new(0.0, 2.0, 0.0),
        ];
        assert!((flat_intensity(&settings, &camera, &facing) - 1.0).abs() < 1e-12);

        let away = [facing[0], facing[2], facing[1]];
        assert!((flat_intensity(&settings, &camera, &away) - 0.2).abs() < 1e-12);

        let unlit = settings.with_lighting(false);
        assert_eq!(flat_intensity(&unlit, &camera, &away), 1.0);
    }

    #[test]
    fn test_untriangulated_quads_are_outlined() {
        let mut engine = RenderEngine::default();
        let mut fb = Framebuffer::new(32, 32);
        let camera = Camera::new(32, 32);
        let settings = unlit()
            .with_triangulation(false)
            .with_wireframe_color(Color::CYAN);
        let stats = engine
            .render(&mut fb, &camera, &Mesh::cube(2.0), None, 32, 32, &settings)
            .unwrap();

        assert_eq!(stats.triangles_filled, 0);
        assert!(stats.pixels_written > 0);
        assert!(fb.pixels().contains(&Color::CYAN));
        // The interior stays empty.
        assert_eq!(fb.get_pixel(16, 16), Some(Color::BLACK));
    }

    #[test]
    fn test_polygon_with_coincident_corners_is_filled() {
        let mut mesh = Mesh::new();
        let indices = [
            (-1.0, -1.0),
            (1.0, -1.0),
            (1.0, 1.0),
            (1.0, 1.0),
            (-1.0, 1.0),
        ]
        .iter()
        .map(|&(x, y)| mesh.add_vertex(Vec3::new(x, y, 0.0)))
        .collect();
        mesh.add_polygon(Polygon::new(indices));

        let mut engine = RenderEngine::default();
        let mut fb = Framebuffer::new(32, 32);
        let camera = Camera::new(32, 32);
        let stats = engine
            .render(&mut fb, &camera, &mesh, None, 32, 32, &unlit())
            .unwrap();

        assert_eq!(stats.polygons_skipped, 0);
        assert_eq!(stats.polygons_drawn, 1);
        assert_eq!(fb.get_pixel(16, 16), Some(Color::WHITE));
    }

    #[test]
    fn test_diagonal_quad_is_filled() {
        // Square in the plane x == z, turned to face the camera.
        let mut mesh = Mesh::new();
        let indices = [
            (-1.0, -1.0, -1.0),
            (1.0, -1.0, 1.0),
            (1.0, 1.0, 1.0),
            (-1.0, 1.0, -1.0),
        ]
        .iter()
        .map(|&(x, y, z)| mesh.add_vertex(Vec3::new(x, y, z)))
        .collect();
        mesh.add_polygon(Polygon::new(indices));
        let facing = ModelTransform::new(
            Vec3::zeros(),
            Vec3::new(0.0, 45.0, 0.0),
            Vec3::new(1.0, 1.0, 1.0),
        );

        let mut fb = Framebuffer::new(32, 32);
        let camera = Camera::new(32, 32);
        let settings = unlit().with_backface_culling(false);
        for kind in [TriangulatorKind::EarCutting, TriangulatorKind::Fan] {
            let stats = RenderEngine::with_kind(kind)
                .render(&mut fb, &camera, &mesh, Some(&facing), 32, 32, &settings)
                .unwrap();
            assert_eq!(stats.polygons_skipped, 0);
            assert_eq!(stats.triangles_filled, 2);
            assert_eq!(fb.get_pixel(16, 16), Some(Color::WHITE));
        }
    }

    #[test]
    fn test_wireframe_draws_over_fill() {
        let mut engine = RenderEngine::default();
        let mut fb = Framebuffer::new(32, 32);
        let camera = Camera::new(32, 32);
        let settings = unlit()
            .with_wireframe(true)
            .with_wireframe_color(Color::ORANGE);
        engine
            .render(&mut fb, &camera, &Mesh::cube(2.0), None, 32, 32, &settings)
            .unwrap();

        assert!(fb.pixels().contains(&Color::ORANGE));
        assert!(fb.pixels().contains(&Color::WHITE));
    }
}
