/// Wavefront OBJ reader (positions, texture coordinates, normals, faces)
use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{char, i64 as integer, space0, space1},
    combinator::{map, opt},
    multi::separated_list1,
    number::complete::double,
    sequence::{pair, preceded, terminated, tuple},
    IResult,
};
use std::fs;
use std::io;
use std::path::Path;
use sw3d_core::{Mesh, Polygon, Vec2, Vec3};

/// Statements that are valid OBJ but carry nothing the renderer uses.
const IGNORED_KEYWORDS: &[&str] = &["o", "g", "s", "l", "p", "vp", "mtllib", "usemtl"];

/// One `v/vt/vn` reference of a face, as written (1-based or negative).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Corner {
    vertex: i64,
    texture: Option<i64>,
    normal: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
enum Statement {
    Vertex(Vec3),
    TextureVertex(Vec2),
    Normal(Vec3),
    Face(Vec<Corner>),
}

/// Parse OBJ source text into a mesh
pub fn parse_obj(input: &str) -> Result<Mesh, String> {
    let mut mesh = Mesh::new();

    for (number, raw) in input.lines().enumerate() {
        let line_number = number + 1;
        let line = raw.split('#').next().unwrap_or_default().trim();
        let keyword = line.split_whitespace().next().unwrap_or_default();
        if keyword.is_empty() {
            continue;
        }
        if !matches!(keyword, "v" | "vt" | "vn" | "f") {
            if !IGNORED_KEYWORDS.contains(&keyword) {
                log::debug!("line {}: skipping unsupported statement '{}'", line_number, keyword);
            }
            continue;
        }

        let statement = match terminated(parse_statement, space0)(line) {
            Ok(("", statement)) => statement,
            Ok((rest, _)) => {
                return Err(format!(
                    "line {}: unexpected trailing input '{}'",
                    line_number, rest
                ))
            }
            Err(e) => {
                return Err(format!(
                    "line {}: malformed '{}' statement: {:?}",
                    line_number, keyword, e
                ))
            }
        };

        match statement {
            Statement::Vertex(position) => {
                mesh.add_vertex(position);
            }
            Statement::TextureVertex(uv) => {
                mesh.add_texture_vertex(uv);
            }
            Statement::Normal(normal) => mesh.normals.push(normal),
            Statement::Face(corners) => {
                let polygon = build_polygon(&mesh, &corners)
                    .map_err(|e| format!("line {}: {}", line_number, e))?;
                mesh.add_polygon(polygon);
            }
        }
    }

    Ok(mesh)
}

/// Read and parse an OBJ file
pub fn load_obj<P: AsRef<Path>>(path: P) -> io::Result<Mesh> {
    let text = fs::read_to_string(path.as_ref()).map_err(|e| {
        io::Error::new(
            e.kind(),
            format!("Failed to read {}: {}", path.as_ref().display(), e),
        )
    })?;
    parse_obj(&text).map_err(|e| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Failed to parse OBJ: {}", e),
        )
    })
}

fn parse_statement(input: &str) -> IResult<&str, Statement> {
    alt((
        map(parse_vertex, Statement::Vertex),
        map(parse_texture_vertex, Statement::TextureVertex),
        map(parse_normal, Statement::Normal),
        map(parse_face, Statement::Face),
    ))(input)
}

fn parse_vertex(input: &str) -> IResult<&str, Vec3> {
    let (input, position) = preceded(pair(tag("v"), space1), parse_vector3)(input)?;
    // Optional w component
    let (input, _) = opt(preceded(space1, double))(input)?;
    Ok((input, position))
}

fn parse_texture_vertex(input: &str) -> IResult<&str, Vec2> {
    let (input, _) = pair(tag("vt"), space1)(input)?;
    let (input, u) = double(input)?;
    let (input, v) = opt(preceded(space1, double))(input)?;
    let (input, _) = opt(preceded(space1, double))(input)?;
    Ok((input, Vec2::new(u, v.unwrap_or(0.0))))
}

fn parse_normal(input: &str) -> IResult<&str, Vec3> {
    preceded(pair(tag("vn"), space1), parse_vector3)(input)
}

fn parse_face(input: &str) -> IResult<&str, Vec<Corner>> {
    preceded(pair(tag("f"), space1), separated_list1(space1, parse_corner))(input)
}

/// `v`, `v/vt`, `v//vn` or `v/vt/vn`
fn parse_corner(input: &str) -> IResult<&str, Corner> {
    let (input, vertex) = integer(input)?;
    let (input, rest) = opt(preceded(
        char('/'),
        pair(opt(integer), opt(preceded(char('/'), integer))),
    ))(input)?;
    let (texture, normal) = rest.unwrap_or((None, None));
    Ok((
        input,
        Corner {
            vertex,
            texture,
            normal,
        },
    ))
}

fn parse_vector3(input: &str) -> IResult<&str, Vec3> {
    let (input, (x, y, z)) = tuple((
        double,
        preceded(space1, double),
        preceded(space1, double),
    ))(input)?;
    Ok((input, Vec3::new(x, y, z)))
}

/// Turn a 1-based or negative (relative) index into a 0-based one.
fn resolve_index(index: i64, len: usize, kind: &str) -> Result<usize, String> {
    let resolved = match index {
        0 => return Err(format!("{} index 0 is not valid", kind)),
        i if i > 0 => i - 1,
        i => len as i64 + i,
    };
    if resolved < 0 || resolved as usize >= len {
        return Err(format!(
            "{} index {} out of range ({} defined)",
            kind, index, len
        ));
    }
    Ok(resolved as usize)
}

/// Resolve an optional attribute column: all corners or none.
fn resolve_optional(indices: &[Option<i64>], len: usize, kind: &str) -> Result<Vec<usize>, String> {
    if indices.iter().all(Option::is_none) {
        return Ok(Vec::new());
    }
    indices
        .iter()
        .map(|index| match index {
            Some(index) => resolve_index(*index, len, kind),
            None => Err(format!("{} indices given for only some corners", kind)),
        })
        .collect()
}

fn build_polygon(mesh: &Mesh, corners: &[Corner]) -> Result<Polygon, String> {
    if corners.len() < 3 {
        return Err(format!("face needs at least 3 vertices, got {}", corners.len()));
    }

    let vertex_indices = corners
        .iter()
        .map(|c| resolve_index(c.vertex, mesh.vertices.len(), "vertex"))
        .collect::<Result<Vec<_>, _>>()?;
    let texture: Vec<Option<i64>> = corners.iter().map(|c| c.texture).collect();
    let normals: Vec<Option<i64>> = corners.iter().map(|c| c.normal).collect();

    Ok(Polygon::new(vertex_indices)
        .with_texture_indices(resolve_optional(
            &texture,
            mesh.texture_vertices.len(),
            "texture",
        )?)
        .with_normal_indices(resolve_optional(&normals, mesh.normals.len(), "normal")?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const QUAD: &str = "\
# a unit quad
o quad
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0 1.0
vt 0 0
vt 1 0
vt 1 1
vt 0 1
vn 0 0 1
s off
f 1/1/1 2/2/1 3/3/1 4/4/1
";

    #[test]
    fn test_parse_full_corners() {
        let mesh = parse_obj(QUAD).unwrap();
        assert_eq!(mesh.vertices.len(), 4);
        assert_eq!(mesh.texture_vertices.len(), 4);
        assert_eq!(mesh.normals.len(), 1);
        assert_eq!(mesh.polygons.len(), 1);

        let polygon = &mesh.polygons[0];
        assert_eq!(polygon.vertex_indices, vec![0, 1, 2, 3]);
        assert_eq!(polygon.texture_vertex_indices, vec![0, 1, 2, 3]);
        assert_eq!(polygon.normal_indices, vec![0; 4]);
        assert_relative_eq!(mesh.vertices[2], Vec3::new(1.0, 1.0, 0.0));
        assert!(mesh.validate().is_ok());
    }

    #[test]
    fn test_parse_corner_forms() {
        let source = "\
v 0 0 0
v 1 0 0
v 0 1 0
vt 0.5 0.5
vn 0 0 1
f 1 2 3
f 1//1 2//1 3//1
f 1/1 2/1 3/1
";
        let mesh = parse_obj(source).unwrap();
        assert_eq!(mesh.polygons.len(), 3);

        assert!(!mesh.polygons[0].has_texture());
        assert!(!mesh.polygons[0].has_normals());

        assert!(!mesh.polygons[1].has_texture());
        assert_eq!(mesh.polygons[1].normal_indices, vec![0, 0, 0]);

        assert_eq!(mesh.polygons[2].texture_vertex_indices, vec![0, 0, 0]);
        assert!(!mesh.polygons[2].has_normals());
    }

    #[test]
    fn test_negative_indices_are_relative() {
        let source = "\
v 0 0 0
v 1 0 0
v 0 1 0
f -3 -2 -1
v 5 5 5
f 1 -2 -1
";
        let mesh = parse_obj(source).unwrap();
        assert_eq!(mesh.polygons[0].vertex_indices, vec![0, 1, 2]);
        assert_eq!(mesh.polygons[1].vertex_indices, vec![0, 2, 3]);
    }

    #[test]
    fn test_comments_and_blank_lines() {
        let source = "\n   \n# only a comment\nv 1 2 3 # trailing comment\n\tv 4 5 6\n";
        let mesh = parse_obj(source).unwrap();
        assert_eq!(mesh.vertices, vec![Vec3::new(1.0, 2.0, 3.0), Vec3::new(4.0, 5.0, 6.0)]);
    }

    #[test]
    fn test_texture_vertex_without_v() {
        let mesh = parse_obj("vt 0.25\n").unwrap();
        assert_eq!(mesh.texture_vertices, vec![Vec2::new(0.25, 0.0)]);
    }

    #[test]
    fn test_errors_name_the_line() {
        let err = parse_obj("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 9\n").unwrap_err();
        assert!(err.starts_with("line 4:"), "{}", err);
        assert!(err.contains("out of range"), "{}", err);

        let err = parse_obj("v 0 0 0\nf 0 1 1\n").unwrap_err();
        assert!(err.contains("index 0"), "{}", err);

        let err = parse_obj("v 1 two 3\n").unwrap_err();
        assert!(err.starts_with("line 1:"), "{}", err);

        let err = parse_obj("v 0 0 0\nv 1 0 0\nf 1 2\n").unwrap_err();
        assert!(err.contains("at least 3"), "{}", err);
    }

    #[test]
    fn test_partial_texture_column_is_rejected() {
        let source = "v 0 0 0\nv 1 0 0\nv 0 1 0\nvt 0 0\nf 1/1 2 3\n";
        let err = parse_obj(source).unwrap_err();
        assert!(err.contains("only some corners"), "{}", err);
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_obj("/nonexistent/model.obj").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
