/// Screen-space polygon and vertex picking
use crate::camera::{project_point, Camera};
use crate::error::{RenderError, Result};
use crate::math::{Vec2, Vec3, EPSILON};
use crate::mesh::Mesh;
use crate::transform::{AffineTransform, ModelMatrixBuilder, ModelTransform};

/// Maximum distance in pixels between the cursor and a picked element.
pub const PICK_TOLERANCE: f64 = 10.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PickResult {
    pub polygon_index: Option<usize>,
    pub vertex_index: Option<usize>,
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    index: usize,
    distance: f64,
    depth: f64,
}

impl Candidate {
    /// Closer to the cursor wins; on a tie the one nearer the camera.
    fn beats(&self, other: &Candidate) -> bool {
        if (self.distance - other.distance).abs() > EPSILON {
            self.distance < other.distance
        } else {
            self.depth > other.depth
        }
    }
}

fn closest(candidates: impl Iterator<Item = Candidate>) -> Option<usize> {
    candidates
        .filter(|c| c.distance <= PICK_TOLERANCE)
        .fold(None, |best: Option<Candidate>, c| match best {
            Some(best) if !c.beats(&best) => Some(best),
            _ => Some(c),
        })
        .map(|c| c.index)
}

/// Even-odd ray casting test.
pub fn point_in_polygon(point: &Vec2, outline: &[Vec2]) -> bool {
    let mut inside = false;
    let mut j = outline.len().wrapping_sub(1);
    for (i, a) in outline.iter().enumerate() {
        let b = outline[j];
        if (a.y > point.y) != (b.y > point.y)
            && point.x < (b.x - a.x) * (point.y - a.y) / (b.y - a.y) + a.x
        {
            inside = !inside;
        }
        j = i;
    }
    inside
}

pub fn distance_to_segment(point: &Vec2, a: &Vec2, b: &Vec2) -> f64 {
    let ab = b - a;
    let length_squared = ab.norm_squared();
    if length_squared < EPSILON {
        return (point - a).norm();
    }
    let t = ((point - a).dot(&ab) / length_squared).clamp(0.0, 1.0);
    (point - (a + ab * t)).norm()
}

/// Find the polygon and vertex under a screen position.
///
/// Every vertex is projected with the same matrices the renderer uses.
/// A polygon counts as distance zero when the cursor is inside its
/// projection, otherwise the distance to its nearest edge. Polygons with a
/// vertex behind the eye or a bad index are ignored.
pub fn pick(
    mesh: &Mesh,
    transform: Option<&ModelTransform>,
    camera: &Camera,
    screen_x: f64,
    screen_y: f64,
    width: usize,
    height: usize,
) -> Result<PickResult> {
    if width == 0 || height == 0 {
        return Err(RenderError::InvalidViewport {
            width,
            height,
            target_width: width,
            target_height: height,
        });
    }

    let model = ModelMatrixBuilder::from_transform(transform);
    let mvp =
        AffineTransform::mvp_matrix(&model, &camera.view_matrix(), &camera.projection_matrix());
    let projected: Vec<Option<Vec3>> = mesh
        .vertices
        .iter()
        .map(|v| project_point(&mvp, v, width, height))
        .collect();
    let cursor = Vec2::new(screen_x, screen_y);

    let vertex_index = closest(projected.iter().enumerate().filter_map(|(index, p)| {
        p.map(|p| Candidate {
            index,
            distance: (p.xy() - cursor).norm(),
            depth: p.z,
        })
    }));

    let polygon_index = closest(mesh.polygons.iter().enumerate().filter_map(|(index, polygon)| {
        let corners = polygon
            .vertex_indices
            .iter()
            .map(|&i| projected.get(i).copied().flatten())
            .collect::<Option<Vec<Vec3>>>()?;
        if corners.len() < 3 {
            return None;
        }

        let outline: Vec<Vec2> = corners.iter().map(|p| p.xy()).collect();
        let distance = if point_in_polygon(&cursor, &outline) {
            0.0
        } else {
            (0..outline.len())
                .map(|i| distance_to_segment(&cursor, &outline[i], &outline[(i + 1) % outline.len()]))
                .fold(f64::INFINITY, f64::min)
        };
        let depth = corners.iter().map(|p| p.z).sum::<f64>() / corners.len() as f64;

        Some(Candidate {
            index,
            distance,
            depth,
        })
    }));

    Ok(PickResult {
        polygon_index,
        vertex_index,
    })
}
