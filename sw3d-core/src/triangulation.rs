/// Polygon triangulation strategies
///
/// Both strategies are stateless and work on mesh indices: the triangles they
/// return reference the same vertex, texture-vertex and normal entries as the
/// source polygon, so per-corner attributes survive the split.
use std::fmt;

use crate::math::{signed_double_area, turn_direction, Vec2, Vec3, VectorExt, EPSILON};
use crate::mesh::{Mesh, MeshError, Polygon};

/// Hard cap on ear-cutting window moves.
pub const MAX_EAR_CUTTING_ITERATIONS: usize = 1_000_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriangulationError {
    Mesh(MeshError),
    /// A whole pass over the remaining vertices found no ear.
    NoEarFound { remaining: usize },
    IterationLimitExceeded { limit: usize },
}

impl fmt::Display for TriangulationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriangulationError::Mesh(err) => write!(f, "invalid polygon: {}", err),
            TriangulationError::NoEarFound { remaining } => write!(
                f,
                "cannot triangulate: no ear among {} remaining vertices, try fallback",
                remaining
            ),
            TriangulationError::IterationLimitExceeded { limit } => write!(
                f,
                "cannot triangulate within {} iterations, try fallback",
                limit
            ),
        }
    }
}

impl std::error::Error for TriangulationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TriangulationError::Mesh(err) => Some(err),
            _ => None,
        }
    }
}

impl From<MeshError> for TriangulationError {
    fn from(err: MeshError) -> Self {
        TriangulationError::Mesh(err)
    }
}

impl TriangulationError {
    /// True for failures a simpler triangulator may still handle.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, TriangulationError::Mesh(_))
    }
}

/// Splits a polygon into triangles.
///
/// Polygons with three or fewer vertices come back as a single copy.
pub trait Triangulator {
    fn triangulate(&self, mesh: &Mesh, polygon: &Polygon)
        -> Result<Vec<Polygon>, TriangulationError>;
}

/// Configuration-level choice of triangulator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TriangulatorKind {
    Fan,
    #[default]
    EarCutting,
}

impl TriangulatorKind {
    pub fn build(self) -> Box<dyn Triangulator> {
        match self {
            TriangulatorKind::Fan => Box::new(FanTriangulator),
            TriangulatorKind::EarCutting => Box::new(EarCuttingTriangulator::new()),
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            TriangulatorKind::Fan => TriangulatorKind::EarCutting,
            TriangulatorKind::EarCutting => TriangulatorKind::Fan,
        }
    }
}

/// Triangle made of the polygon corners at local positions `corners`.
fn sub_polygon(polygon: &Polygon, corners: [usize; 3]) -> Polygon {
    let pick = |list: &[usize]| -> Vec<usize> {
        if list.is_empty() {
            Vec::new()
        } else {
            corners.iter().map(|&corner| list[corner]).collect()
        }
    };

    Polygon {
        vertex_indices: pick(&polygon.vertex_indices),
        texture_vertex_indices: pick(&polygon.texture_vertex_indices),
        normal_indices: pick(&polygon.normal_indices),
    }
}

/// Emits `(v0, v1, v2), (v0, v2, v3), ...`.
///
/// Only correct for convex, planar polygons. Concave input is not detected
/// and produces overlapping triangles.
#[derive(Debug, Clone, Copy, Default)]
pub struct FanTriangulator;

impl Triangulator for FanTriangulator {
    fn triangulate(
        &self,
        _mesh: &Mesh,
        polygon: &Polygon,
    ) -> Result<Vec<Polygon>, TriangulationError> {
        let count = polygon.vertex_count();
        if count <= 3 {
            return Ok(vec![polygon.clone()]);
        }
        polygon.check_index_lists()?;

        Ok((1..count - 1)
            .map(|i| sub_polygon(polygon, [0, i, i + 1]))
            .collect())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Winding {
    Clockwise,
    CounterClockwise,
}

impl Winding {
    fn of(turn: f64) -> Option<Self> {
        if turn > EPSILON {
            Some(Winding::CounterClockwise)
        } else if turn < -EPSILON {
            Some(Winding::Clockwise)
        } else {
            None
        }
    }
}

/// Ear-cutting triangulator for simple (possibly concave) planar polygons
#[derive(Debug, Clone, Copy)]
pub struct EarCuttingTriangulator {
    max_iterations: usize,
}

impl EarCuttingTriangulator {
    pub fn new() -> Self {
        Self {
            max_iterations: MAX_EAR_CUTTING_ITERATIONS,
        }
    }

    pub fn with_iteration_limit(max_iterations: usize) -> Self {
        Self { max_iterations }
    }

    fn is_ear(&self, points: &[Vec2], remaining: &[usize], corners: [usize; 3], winding: Winding) -> bool {
        let [l, m, r] = corners;
        let (a, b, c) = (&points[l], &points[m], &points[r]);

        if Winding::of(turn_direction(a, b, c)) != Some(winding) {
            return false;
        }

        !remaining
            .iter()
            .filter(|&&i| i != l && i != m && i != r)
            .any(|&i| point_in_triangle(&points[i], a, b, c))
    }
}

impl Default for EarCuttingTriangulator {
    fn default() -> Self {
        Self::new()
    }
}

impl Triangulator for EarCuttingTriangulator {
    fn triangulate(
        &self,
        mesh: &Mesh,
        polygon: &Polygon,
    ) -> Result<Vec<Polygon>, TriangulationError> {
        let count = polygon.vertex_count();
        if count <= 3 {
            return Ok(vec![polygon.clone()]);
        }
        polygon.check_index_lists()?;
        let positions = mesh.polygon_vertices(polygon)?;

        if has_coincident_vertices(&positions) {
            log::debug!("polygon has coincident vertices, leaving it unsplit");
            return Ok(vec![polygon.clone()]);
        }

        let Some((first_axis, second_axis)) = projection_axes(&positions) else {
            log::debug!("polygon is collinear, leaving it unsplit");
            return Ok(vec![polygon.clone()]);
        };
        let points: Vec<Vec2> = positions
            .iter()
            .map(|p| Vec2::new(p[first_axis], p[second_axis]))
            .collect();

        let Some(winding) = winding_direction(&points) else {
            log::debug!("polygon has no area in its projection, leaving it unsplit");
            return Ok(vec![polygon.clone()]);
        };

        let mut remaining: Vec<usize> = (0..count).collect();
        let mut triangles = Vec::with_capacity(count - 2);
        let mut cursor = 0;
        let mut misses = 0;
        let mut iterations = 0;

        while remaining.len() > 3 {
            iterations += 1;
            if iterations > self.max_iterations {
                return Err(TriangulationError::IterationLimitExceeded {
                    limit: self.max_iterations,
                });
            }

            let len = remaining.len();
            let middle = (cursor + 1) % len;
            let corners = [remaining[cursor], remaining[middle], remaining[(cursor + 2) % len]];

            if self.is_ear(&points, &remaining, corners, winding) {
                triangles.push(sub_polygon(polygon, corners));
                remaining.remove(middle);
                if middle < cursor {
                    cursor -= 1;
                }
                cursor %= remaining.len();
                misses = 0;
            } else {
                misses += 1;
                if misses > len {
                    return Err(TriangulationError::NoEarFound { remaining: len });
                }
                cursor = (cursor + 1) % len;
            }
        }

        triangles.push(sub_polygon(polygon, [remaining[0], remaining[1], remaining[2]]));
        Ok(triangles)
    }
}

fn has_coincident_vertices(positions: &[Vec3]) -> bool {
    positions.iter().enumerate().any(|(i, a)| {
        positions[i + 1..].iter().any(|b| a.approx_eq(b))
    })
}

/// The coordinate plane the polygon covers most, as an ascending axis pair.
///
/// The axis dropped is the dominant component of the Newell normal, so a
/// tilted polygon never collapses onto a line. `None` if the polygon has no
/// area at all.
fn projection_axes(positions: &[Vec3]) -> Option<(usize, usize)> {
    let n = positions.len();
    let normal = (0..n).fold(Vec3::zeros(), |sum, i| {
        let (p, q) = (&positions[i], &positions[(i + 1) % n]);
        sum + Vec3::new(
            (p.y - q.y) * (p.z + q.z),
            (p.z - q.z) * (p.x + q.x),
            (p.x - q.x) * (p.y + q.y),
        )
    });

    let dropped = (0..3).max_by(|&a, &b| normal[a].abs().total_cmp(&normal[b].abs()))?;
    if normal[dropped].abs() <= EPSILON {
        return None;
    }
    match dropped {
        0 => Some((1, 2)),
        1 => Some((0, 2)),
        _ => Some((0, 1)),
    }
}

/// Winding from the corner at the lowest-leftmost vertex, falling back to
/// the sign of the polygon area when that corner is flat.
fn winding_direction(points: &[Vec2]) -> Option<Winding> {
    let n = points.len();
    let lowest = (0..n).min_by(|&i, &j| {
        let (a, b) = (&points[i], &points[j]);
        a.y.total_cmp(&b.y).then(a.x.total_cmp(&b.x))
    })?;

    let previous = &points[(lowest + n - 1) % n];
    let next = &points[(lowest + 1) % n];

    Winding::of(turn_direction(previous, &points[lowest], next))
        .or_else(|| Winding::of(signed_double_area(points)))
}

/// Barycentric containment test, boundary included.
fn point_in_triangle(p: &Vec2, a: &Vec2, b: &Vec2, c: &Vec2) -> bool {
    let edge = |from: &Vec2, to: &Vec2| (to.x - from.x) * (p.y - from.y) - (to.y - from.y) * (p.x - from.x);
    let area = (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x);
    if area.abs() < EPSILON {
        return false;
    }

    let alpha = edge(b, c) / area;
    let beta = edge(c, a) / area;
    let gamma = edge(a, b) / area;

    let in_unit = |w: f64| (-EPSILON..=1.0 + EPSILON).contains(&w);
    in_unit(alpha) && in_unit(beta) && in_unit(gamma) && (alpha + beta + gamma - 1.0).abs() <= EPSILON
}

/// Split `polygon` with `triangulator`, using the fan triangulator when it
/// gives up or hands back a piece that is not a triangle.
///
/// Only mesh errors are returned; everything else ends in a fan.
pub fn triangulate_or_fan(
    triangulator: &dyn Triangulator,
    mesh: &Mesh,
    polygon: &Polygon,
) -> Result<Vec<Polygon>, MeshError> {
    let reason = match triangulator.triangulate(mesh, polygon) {
        Ok(triangles) if triangles.iter().all(|t| t.vertex_count() == 3) => return Ok(triangles),
        Ok(_) => "polygon left unsplit".to_string(),
        Err(TriangulationError::Mesh(err)) => return Err(err),
        Err(err) => err.to_string(),
    };

    log::warn!("{}; using fan triangulation", reason);
    FanTriangulator
        .triangulate(mesh, polygon)
        .map_err(|err| match err {
            TriangulationError::Mesh(err) => err,
            _ => MeshError::TooFewVertices {
                count: polygon.vertex_count(),
            },
        })
}

/// Triangulate every polygon of `mesh`.
///
/// Polygons the given triangulator gives up on are split with the fan
/// triangulator instead.
pub fn triangulate_mesh(mesh: &Mesh, triangulator: &dyn Triangulator) -> Result<Mesh, MeshError> {
    let mut polygons = Vec::with_capacity(mesh.triangle_count());
    for polygon in &mesh.polygons {
        polygons.extend(triangulate_or_fan(triangulator, mesh, polygon)?);
    }

    Ok(Mesh {
        vertices: mesh.vertices.clone(),
        texture_vertices: mesh.texture_vertices.clone(),
        normals: mesh.normals.clone(),
        polygons,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn mesh_from(points: &[(f64, f64, f64)]) -> (Mesh, Polygon) {
        let mut mesh = Mesh::new();
        let indices = points
            .iter()
            .map(|&(x, y, z)| mesh.add_vertex(Vec3::new(x, y, z)))
            .collect();
        let polygon = Polygon::new(indices);
        mesh.add_polygon(polygon.clone());
        (mesh, polygon)
    }

    fn regular_polygon(sides: usize, radius: f64) -> (Mesh, Polygon) {
        let points: Vec<(f64, f64, f64)> = (0..sides)
            .map(|i| {
                let angle = i as f64 * std::f64::consts::TAU / sides as f64;
                (radius * angle.cos(), 0.5, radius * angle.sin())
            })
            .collect();
        mesh_from(&points)
    }

    fn triangle_area(mesh: &Mesh, triangle: &Polygon) -> f64 {
        let p = mesh.polygon_vertices(triangle).unwrap();
        (p[1] - p[0]).cross(&(p[2] - p[0])).norm() / 2.0
    }

    #[test]
    fn test_triangle_is_returned_unchanged() {
        let (mesh, triangle) = mesh_from(&[(0.0, 0.0, 0.0), (1.0, 0.0, 0.0), (0.0, 1.0, 0.0)]);
        for kind in [TriangulatorKind::Fan, TriangulatorKind::EarCutting] {
            let result = kind.build().triangulate(&mesh, &triangle).unwrap();
            assert_eq!(result, vec![triangle.clone()]);
        }
    }

    #[test]
    fn test_fan_order() {
        let polygon = Polygon::new(vec![10, 11, 12, 13, 14]).with_texture_indices(vec![0, 1, 2, 3, 4]);
        let triangles = FanTriangulator.triangulate(&Mesh::new(), &polygon).unwrap();
        let vertices: Vec<Vec<usize>> = triangles.iter().map(|t| t.vertex_indices.clone()).collect();
        assert_eq!(vertices, vec![vec![10, 11, 12], vec![10, 12, 13], vec![10, 13, 14]]);
        assert_eq!(triangles[2].texture_vertex_indices, vec![0, 3, 4]);
    }

    #[test]
    fn test_convex_polygon_area_is_preserved() {
        for sides in 4..10 {
            let (mesh, polygon) = regular_polygon(sides, 2.0);
            let triangles = EarCuttingTriangulator::new().triangulate(&mesh, &polygon).unwrap();
            assert_eq!(triangles.len(), sides - 2);

            let total: f64 = triangles.iter().map(|t| triangle_area(&mesh, t)).sum();
            let expected = 0.5 * sides as f64 * 4.0 * (std::f64::consts::TAU / sides as f64).sin();
            assert_relative_eq!(total, expected, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_concave_polygon() {
        // An arrow head pointing up, concave at (0, 1).
        let (mesh, polygon) = mesh_from(&[
            (0.0, 0.0, 0.0),
            (2.0, 0.0, 0.0),
            (2.0, 2.0, 0.0),
            (1.0, 1.0, 0.0),
            (0.0, 2.0, 0.0),
        ]);
        let triangles = EarCuttingTriangulator::new().triangulate(&mesh, &polygon).unwrap();
        assert_eq!(triangles.len(), 3);
        let total: f64 = triangles.iter().map(|t| triangle_area(&mesh, t)).sum();
        assert_relative_eq!(total, 3.0, epsilon = 1e-9);

        // No triangle may cover the notch above the reflex vertex.
        let notch = Vec2::new(1.0, 1.5);
        for triangle in &triangles {
            let p = mesh.polygon_vertices(triangle).unwrap();
            let (a, b, c) = (p[0].xy(), p[1].xy(), p[2].xy());
            assert!(!point_in_triangle(&notch, &a, &b, &c));
        }
    }

    #[test]
    fn test_clockwise_polygon() {
        let (mesh, polygon) = mesh_from(&[
            (0.0, 0.0, 0.0),
            (0.0, 1.0, 0.0),
            (1.0, 1.0, 0.0),
            (1.0, 0.0, 0.0),
        ]);
        let triangles = EarCuttingTriangulator::new().triangulate(&mesh, &polygon).unwrap();
        assert_eq!(triangles.len(), 2);
    }

    #[test]
    fn test_attributes_follow_their_vertices() {
        let (mut mesh, polygon) = regular_polygon(6, 1.0);
        mesh.texture_vertices = (0..6).map(|i| Vec2::new(i as f64, 0.0)).collect();
        let polygon = polygon.with_texture_indices(vec![0, 1, 2, 3, 4, 5]);

        let triangles = EarCuttingTriangulator::new().triangulate(&mesh, &polygon).unwrap();
        for triangle in &triangles {
            assert_eq!(triangle.vertex_indices, triangle.texture_vertex_indices);
        }
    }

    #[test]
    fn test_coincident_vertices_fall_back_to_unsplit() {
        let (mesh, polygon) = mesh_from(&[
            (0.0, 0.0, 0.0),
            (1.0, 0.0, 0.0),
            (1.0, 1.0, 0.0),
            (1.0, 0.0, 0.0),
        ]);
        let triangles = EarCuttingTriangulator::new().triangulate(&mesh, &polygon).unwrap();
        assert_eq!(triangles, vec![polygon]);
    }

    #[test]
    fn test_vertical_polygon_uses_other_plane() {
        // Lies in the YZ plane: X has no spread.
        let (mesh, polygon) = mesh_from(&[
            (3.0, 0.0, 0.0),
            (3.0, 0.0, 1.0),
            (3.0, 1.0, 1.0),
            (3.0, 1.0, 0.0),
        ]);
        assert_eq!(projection_axes(&mesh.vertices), Some((1, 2)));
        let triangles = EarCuttingTriangulator::new().triangulate(&mesh, &polygon).unwrap();
        assert_eq!(triangles.len(), 2);
    }

    #[test]
    fn test_diagonal_plane_quad() {
        // Lies in the plane x == z; X and Z have the largest spreads.
        let points = [
            (-1.0, -0.25, -1.0),
            (1.0, -0.25, 1.0),
            (1.0, 0.25, 1.0),
            (-1.0, 0.25, -1.0),
        ];
        let (mesh, polygon) = mesh_from(&points);
        assert_ne!(projection_axes(&mesh.vertices), Some((0, 2)));

        let triangles = EarCuttingTriangulator::new().triangulate(&mesh, &polygon).unwrap();
        assert_eq!(triangles.len(), 2);
        let total: f64 = triangles.iter().map(|t| triangle_area(&mesh, t)).sum();
        assert_relative_eq!(total, 0.5 * 8.0_f64.sqrt(), epsilon = 1e-9);

        let reversed: Vec<_> = points.iter().rev().copied().collect();
        let (mesh, polygon) = mesh_from(&reversed);
        let triangles = EarCuttingTriangulator::new().triangulate(&mesh, &polygon).unwrap();
        assert_eq!(triangles.len(), 2);
    }

    #[test]
    fn test_tilted_polygons_keep_their_area() {
        // Regular N-gons in the XZ plane, tipped about X then Y.
        let tilt = nalgebra::Rotation3::from_euler_angles(0.7, 0.0, 0.0)
            * nalgebra::Rotation3::from_euler_angles(0.0, 1.1, 0.0);
        for sides in 4..10 {
            let (mut mesh, polygon) = regular_polygon(sides, 2.0);
            for vertex in &mut mesh.vertices {
                *vertex = tilt * *vertex;
            }

            let triangles = EarCuttingTriangulator::new().triangulate(&mesh, &polygon).unwrap();
            assert_eq!(triangles.len(), sides - 2);
            let total: f64 = triangles.iter().map(|t| triangle_area(&mesh, t)).sum();
            let expected = 0.5 * sides as f64 * 4.0 * (std::f64::consts::TAU / sides as f64).sin();
            assert_relative_eq!(total, expected, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_unsplit_polygons_fall_back_to_fan() {
        let (mesh, polygon) = mesh_from(&[
            (-1.0, -1.0, 0.0),
            (1.0, -1.0, 0.0),
            (1.0, 1.0, 0.0),
            (1.0, 1.0, 0.0),
            (-1.0, 1.0, 0.0),
        ]);
        let triangles =
            triangulate_or_fan(&EarCuttingTriangulator::new(), &mesh, &polygon).unwrap();
        assert_eq!(triangles.len(), 3);
        assert!(triangles.iter().all(|t| t.vertex_count() == 3));

        let triangulated = triangulate_mesh(&mesh, &EarCuttingTriangulator::new()).unwrap();
        assert_eq!(triangulated.polygons.len(), 3);
    }

    #[test]
    fn test_iteration_limit() {
        let (mesh, polygon) = regular_polygon(8, 1.0);
        let result = EarCuttingTriangulator::with_iteration_limit(2).triangulate(&mesh, &polygon);
        assert_eq!(
            result,
            Err(TriangulationError::IterationLimitExceeded { limit: 2 })
        );
    }

    #[test]
    fn test_self_intersecting_polygon_terminates() {
        // A bow tie: no consistent winding, no valid ear sequence.
        let (mesh, polygon) = mesh_from(&[
            (0.0, 0.0, 0.0),
            (2.0, 2.0, 0.0),
            (2.0, 0.0, 0.0),
            (1.0, 1.5, 0.0),
            (0.0, 2.0, 0.0),
        ]);
        match EarCuttingTriangulator::new().triangulate(&mesh, &polygon) {
            Ok(triangles) => assert!(!triangles.is_empty()),
            Err(err) => assert!(err.is_recoverable()),
        }
    }

    #[test]
    fn test_triangulate_mesh() {
        let cube = Mesh::cube(2.0);
        let triangulated = triangulate_mesh(&cube, &EarCuttingTriangulator::new()).unwrap();
        assert_eq!(triangulated.polygons.len(), 12);
        assert!(triangulated.polygons.iter().all(|p| p.vertex_count() == 3));
        assert!(triangulated.validate().is_ok());
    }

    #[test]
    fn test_out_of_range_index_is_an_error() {
        let mesh = Mesh::cube(1.0);
        let polygon = Polygon::new(vec![0, 1, 2, 99]);
        let err = EarCuttingTriangulator::new().triangulate(&mesh, &polygon).unwrap_err();
        assert!(!err.is_recoverable());
    }
}
