/// Per-frame render configuration
use std::sync::Arc;

use crate::color::Color;
use crate::texture::Texture;

/// What to draw and how; read once per frame by the render engine.
#[derive(Debug, Clone)]
pub struct RenderSettings {
    pub wireframe: bool,
    pub filled: bool,
    pub wireframe_color: Color,
    pub fill_color: Color,
    pub background_color: Color,
    pub z_buffer: bool,
    pub backface_culling: bool,
    pub texture_enabled: bool,
    pub texture: Option<Arc<Texture>>,
    /// Split polygons with more than three vertices before filling.
    pub triangulation: bool,
    /// Fill triangles at all. With this off only outlines are drawn.
    pub rasterization: bool,
    pub lighting: bool,
    /// Intensity of faces turned away from the camera, in [0, 1].
    pub ambient: f64,
}

impl RenderSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_wireframe(mut self, wireframe: bool) -> Self {
        self.wireframe = wireframe;
        self
    }

    pub fn with_filled(mut self, filled: bool) -> Self {
        self.filled = filled;
        self
    }

    pub fn with_wireframe_color(mut self, color: Color) -> Self {
        self.wireframe_color = color;
        self
    }

    pub fn with_fill_color(mut self, color: Color) -> Self {
        self.fill_color = color;
        self
    }

    pub fn with_background_color(mut self, color: Color) -> Self {
        self.background_color = color;
        self
    }

    pub fn with_z_buffer(mut self, enabled: bool) -> Self {
        self.z_buffer = enabled;
        self
    }

    pub fn with_backface_culling(mut self, enabled: bool) -> Self {
        self.backface_culling = enabled;
        self
    }

    /// Attach a texture and turn texturing on.
    pub fn with_texture(mut self, texture: Arc<Texture>) -> Self {
        self.texture = Some(texture);
        self.texture_enabled = true;
        self
    }

    pub fn with_triangulation(mut self, enabled: bool) -> Self {
        self.triangulation = enabled;
        self
    }

    pub fn with_rasterization(mut self, enabled: bool) -> Self {
        self.rasterization = enabled;
        self
    }

    pub fn with_lighting(mut self, enabled: bool) -> Self {
        self.lighting = enabled;
        self
    }

    pub fn with_ambient(mut self, ambient: f64) -> Self {
        self.ambient = ambient.clamp(0.0, 1.0);
        self
    }

    /// The texture to sample, if texturing is on and one is attached.
    pub fn active_texture(&self) -> Option<&Texture> {
        if self.texture_enabled {
            self.texture.as_deref()
        } else {
            None
        }
    }
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            wireframe: false,
            filled: true,
            wireframe_color: Color::WHITE,
            fill_color: Color::GREY,
            background_color: Color::BLACK,
            z_buffer: true,
            backface_culling: true,
            texture_enabled: false,
            texture: None,
            triangulation: true,
            rasterization: true,
            lighting: true,
            ambient: 0.25,
        }
    }
}
