/// Error type shared by the rendering entry points
use std::fmt;

use crate::math::MathError;
use crate::mesh::MeshError;
use crate::triangulation::TriangulationError;

#[derive(Debug, Clone, PartialEq)]
pub enum RenderError {
    Math(MathError),
    Mesh(MeshError),
    Triangulation(TriangulationError),
    /// The requested viewport is empty or larger than the render target.
    InvalidViewport {
        width: usize,
        height: usize,
        target_width: usize,
        target_height: usize,
    },
    /// Texture dimensions that do not match the pixel data.
    InvalidTexture {
        width: usize,
        height: usize,
        pixels: usize,
    },
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::Math(err) => write!(f, "math error: {}", err),
            RenderError::Mesh(err) => write!(f, "mesh error: {}", err),
            RenderError::Triangulation(err) => write!(f, "triangulation error: {}", err),
            RenderError::InvalidViewport {
                width,
                height,
                target_width,
                target_height,
            } => write!(
                f,
                "invalid viewport {}x{} for a {}x{} render target",
                width, height, target_width, target_height
            ),
            RenderError::InvalidTexture {
                width,
                height,
                pixels,
            } => write!(
                f,
                "texture of {}x{} cannot hold {} pixels",
                width, height, pixels
            ),
        }
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RenderError::Math(err) => Some(err),
            RenderError::Mesh(err) => Some(err),
            RenderError::Triangulation(err) => Some(err),
            _ => None,
        }
    }
}

impl From<MathError> for RenderError {
    fn from(err: MathError) -> Self {
        RenderError::Math(err)
    }
}

impl From<MeshError> for RenderError {
    fn from(err: MeshError) -> Self {
        RenderError::Mesh(err)
    }
}

impl From<TriangulationError> for RenderError {
    fn from(err: TriangulationError) -> Self {
        match err {
            TriangulationError::Mesh(err) => RenderError::Mesh(err),
            other => RenderError::Triangulation(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, RenderError>;
