/// SW3D Core Library - CPU software rendering pipeline
///
/// This library provides the renderer-agnostic core: linear algebra,
/// transforms, camera and orbit controller, polygon meshes, triangulation,
/// normals, depth buffering, triangle rasterization, per-frame orchestration
/// and screen-space picking. Output goes to anything implementing
/// `RenderTarget`.

pub mod camera;
pub mod color;
pub mod error;
pub mod framebuffer;
pub mod math;
pub mod mesh;
pub mod normals;
pub mod picking;
pub mod rasterizer;
pub mod render;
pub mod settings;
pub mod texture;
pub mod transform;
pub mod triangulation;
pub mod zbuffer;

// Re-export commonly used types
pub use camera::{Camera, CameraMove, OrbitController};
pub use color::Color;
pub use error::{RenderError, Result};
pub use framebuffer::{Framebuffer, RenderTarget};
pub use math::{Mat3, Mat4, Vec2, Vec3, Vec4};
pub use mesh::{Mesh, MeshError, Polygon};
pub use picking::{pick, PickResult};
pub use render::{RenderEngine, RenderStats};
pub use settings::RenderSettings;
pub use texture::Texture;
pub use transform::{ModelMatrixBuilder, ModelTransform};
pub use triangulation::{EarCuttingTriangulator, FanTriangulator, Triangulator, TriangulatorKind};
pub use zbuffer::ZBuffer;
