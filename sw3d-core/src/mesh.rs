/// Indexed polygon mesh
use std::fmt;

use crate::math::{Vec2, Vec3};

/// Which attribute array an index points into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    Vertex,
    TextureVertex,
    Normal,
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IndexKind::Vertex => "vertex",
            IndexKind::TextureVertex => "texture vertex",
            IndexKind::Normal => "normal",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MeshError {
    /// Fewer than three distinct vertices.
    TooFewVertices { count: usize },
    IndexOutOfRange {
        kind: IndexKind,
        index: usize,
        len: usize,
    },
    /// An optional index list whose length differs from the vertex list.
    MismatchedIndexCount {
        kind: IndexKind,
        expected: usize,
        found: usize,
    },
}

impl fmt::Display for MeshError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MeshError::TooFewVertices { count } => {
                write!(f, "polygon needs at least 3 distinct vertices, got {}", count)
            }
            MeshError::IndexOutOfRange { kind, index, len } => {
                write!(f, "{} index {} out of range (len {})", kind, index, len)
            }
            MeshError::MismatchedIndexCount {
                kind,
                expected,
                found,
            } => write!(
                f,
                "{} index list has {} entries, expected {}",
                kind, found, expected
            ),
        }
    }
}

impl std::error::Error for MeshError {}

/// One face of a mesh, as parallel index lists into the mesh arrays.
///
/// `texture_vertex_indices` and `normal_indices` are either empty or exactly
/// as long as `vertex_indices`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Polygon {
    pub vertex_indices: Vec<usize>,
    pub texture_vertex_indices: Vec<usize>,
    pub normal_indices: Vec<usize>,
}

impl Polygon {
    pub fn new(vertex_indices: Vec<usize>) -> Self {
        Self {
            vertex_indices,
            texture_vertex_indices: Vec::new(),
            normal_indices: Vec::new(),
        }
    }

    pub fn with_texture_indices(mut self, indices: Vec<usize>) -> Self {
        self.texture_vertex_indices = indices;
        self
    }

    pub fn with_normal_indices(mut self, indices: Vec<usize>) -> Self {
        self.normal_indices = indices;
        self
    }

    pub fn vertex_count(&self) -> usize {
        self.vertex_indices.len()
    }

    pub fn has_texture(&self) -> bool {
        !self.texture_vertex_indices.is_empty()
    }

    pub fn has_normals(&self) -> bool {
        !self.normal_indices.is_empty()
    }

    /// Check that the optional index lists line up with the vertex list.
    pub fn check_index_lists(&self) -> Result<(), MeshError> {
        let expected = self.vertex_indices.len();
        for (kind, list) in [
            (IndexKind::TextureVertex, &self.texture_vertex_indices),
            (IndexKind::Normal, &self.normal_indices),
        ] {
            if !list.is_empty() && list.len() != expected {
                return Err(MeshError::MismatchedIndexCount {
                    kind,
                    expected,
                    found: list.len(),
                });
            }
        }
        Ok(())
    }

    /// Full validation against the arrays of `mesh`.
    pub fn validate(&self, mesh: &Mesh) -> Result<(), MeshError> {
        self.check_index_lists()?;
        check_range(IndexKind::Vertex, &self.vertex_indices, mesh.vertices.len())?;
        check_range(
            IndexKind::TextureVertex,
            &self.texture_vertex_indices,
            mesh.texture_vertices.len(),
        )?;
        check_range(IndexKind::Normal, &self.normal_indices, mesh.normals.len())?;

        let mut distinct = self.vertex_indices.clone();
        distinct.sort_unstable();
        distinct.dedup();
        if distinct.len() < 3 {
            return Err(MeshError::TooFewVertices {
                count: distinct.len(),
            });
        }
        Ok(())
    }
}

fn check_range(kind: IndexKind, indices: &[usize], len: usize) -> Result<(), MeshError> {
    match indices.iter().find(|&&index| index >= len) {
        Some(&index) => Err(MeshError::IndexOutOfRange { kind, index, len }),
        None => Ok(()),
    }
}

/// A polygon mesh stored as flat attribute arrays plus index-based faces
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    pub vertices: Vec<Vec3>,
    pub texture_vertices: Vec<Vec2>,
    pub normals: Vec<Vec3>,
    pub polygons: Vec<Polygon>,
}

impl Mesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_vertex(&mut self, position: Vec3) -> usize {
        self.vertices.push(position);
        self.vertices.len() - 1
    }

    pub fn add_texture_vertex(&mut self, uv: Vec2) -> usize {
        self.texture_vertices.push(uv);
        self.texture_vertices.len() - 1
    }

    pub fn add_polygon(&mut self, polygon: Polygon) {
        self.polygons.push(polygon);
    }

    pub fn vertex(&self, index: usize) -> Result<Vec3, MeshError> {
        self.vertices
            .get(index)
            .copied()
            .ok_or(MeshError::IndexOutOfRange {
                kind: IndexKind::Vertex,
                index,
                len: self.vertices.len(),
            })
    }

    pub fn texture_vertex(&self, index: usize) -> Result<Vec2, MeshError> {
        self.texture_vertices
            .get(index)
            .copied()
            .ok_or(MeshError::IndexOutOfRange {
                kind: IndexKind::TextureVertex,
                index,
                len: self.texture_vertices.len(),
            })
    }

    /// Positions of a polygon's vertices, in polygon order.
    pub fn polygon_vertices(&self, polygon: &Polygon) -> Result<Vec<Vec3>, MeshError> {
        polygon
            .vertex_indices
            .iter()
            .map(|&index| self.vertex(index))
            .collect()
    }

    /// Validate every polygon, reporting the first problem.
    pub fn validate(&self) -> Result<(), MeshError> {
        self.polygons
            .iter()
            .try_for_each(|polygon| polygon.validate(self))
    }

    pub fn triangle_count(&self) -> usize {
        self.polygons
            .iter()
            .map(|p| p.vertex_count().saturating_sub(2))
            .sum()
    }

    /// Create a cube centred on the origin, made of six counter-clockwise quads
    pub fn cube(size: f64) -> Self {
        let half = size / 2.0;
        let mut mesh = Self::new();

        for (x, y, z) in [
            (-half, -half, half),
            (half, -half, half),
            (half, half, half),
            (-half, half, half),
            (-half, -half, -half),
            (half, -half, -half),
            (half, half, -half),
            (-half, half, -half),
        ] {
            mesh.add_vertex(Vec3::new(x, y, z));
        }

        for (u, v) in [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)] {
            mesh.add_texture_vertex(Vec2::new(u, v));
        }

        let faces = [
            [0, 1, 2, 3], // front
            [5, 4, 7, 6], // back
            [1, 5, 6, 2], // right
            [4, 0, 3, 7], // left
            [3, 2, 6, 7], // top
            [4, 5, 1, 0], // bottom
        ];
        for face in faces {
            mesh.add_polygon(Polygon::new(face.to_vec()).with_texture_indices(vec![0, 1, 2, 3]));
        }

        mesh
    }
}
