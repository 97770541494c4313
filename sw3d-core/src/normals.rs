/// Face and vertex normal calculation
use crate::math::{Vec3, VectorExt};
use crate::mesh::{IndexKind, Mesh, MeshError, Polygon};

/// Normal used for faces without a usable area.
pub fn default_normal() -> Vec3 {
    Vec3::z()
}

/// Unit normal of the triangle `a, b, c` (counter-clockwise front face).
pub fn face_normal(a: &Vec3, b: &Vec3, c: &Vec3) -> Vec3 {
    (b - a)
        .cross(&(c - a))
        .checked_normalize()
        .unwrap_or_else(|_| default_normal())
}

/// Normal of a polygon from its first three vertices.
pub fn polygon_normal(mesh: &Mesh, polygon: &Polygon) -> Result<Vec3, MeshError> {
    if polygon.vertex_count() < 3 {
        return Err(MeshError::TooFewVertices {
            count: polygon.vertex_count(),
        });
    }
    let a = mesh.vertex(polygon.vertex_indices[0])?;
    let b = mesh.vertex(polygon.vertex_indices[1])?;
    let c = mesh.vertex(polygon.vertex_indices[2])?;
    Ok(face_normal(&a, &b, &c))
}

/// Rebuild the mesh normals for flat shading.
///
/// The normal list is replaced by one entry per polygon, and every corner of
/// a polygon points at its face normal. Polygons with fewer than three
/// vertices get no normal indices. The mesh is left untouched on error.
pub fn recalculate_normals(mesh: &mut Mesh) -> Result<(), MeshError> {
    let source: &Mesh = mesh;
    let face_normals = source
        .polygons
        .iter()
        .map(|polygon| {
            if polygon.vertex_count() < 3 {
                Ok(None)
            } else {
                polygon_normal(source, polygon).map(Some)
            }
        })
        .collect::<Result<Vec<_>, _>>()?;

    mesh.normals.clear();
    for (polygon, normal) in mesh.polygons.iter_mut().zip(face_normals) {
        polygon.normal_indices.clear();
        if let Some(normal) = normal {
            mesh.normals.push(normal);
            let index = mesh.normals.len() - 1;
            polygon.normal_indices = vec![index; polygon.vertex_count()];
        }
    }
    Ok(())
}

/// Per-vertex normals: the normalized sum of the face normals of every
/// polygon using the vertex.
///
/// Not used by the flat-shaded render path.
pub fn vertex_normals(mesh: &Mesh) -> Result<Vec<Vec3>, MeshError> {
    let mut sums = vec![Vec3::zeros(); mesh.vertices.len()];

    for polygon in mesh.polygons.iter().filter(|p| p.vertex_count() >= 3) {
        let normal = polygon_normal(mesh, polygon)?;
        for &index in &polygon.vertex_indices {
            let sum = sums.get_mut(index).ok_or(MeshError::IndexOutOfRange {
                kind: IndexKind::Vertex,
                index,
                len: mesh.vertices.len(),
            })?;
            *sum += normal;
        }
    }

    Ok(sums
        .into_iter()
        .map(|sum| sum.checked_normalize().unwrap_or_else(|_| default_normal()))
        .collect())
}
