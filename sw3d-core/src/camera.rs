/// Camera, view/projection construction and the orbit controller
use crate::math::{Mat4, Matrix4Ext, Vec2, Vec3, Vec4, VectorExt, EPSILON};
use crate::transform::AffineTransform;

/// Length below which a basis vector is considered degenerate.
const BASIS_EPSILON: f64 = 1e-6;

/// Build a right-handed view matrix looking from `eye` toward `target`.
///
/// Degenerate configurations (eye on top of target, or no usable up vector
/// even after trying the alternate one) yield the identity matrix.
pub fn look_at(eye: &Vec3, target: &Vec3, up: &Vec3) -> Mat4 {
    let forward = target - eye;
    if forward.norm() < BASIS_EPSILON {
        return Mat4::identity();
    }
    let forward = forward.normalize();

    let mut right = forward.cross(up);
    if right.norm() < BASIS_EPSILON {
        let alternate_up = if forward.y >= 0.0 {
            Vec3::new(0.0, 0.0, -1.0)
        } else {
            Vec3::new(0.0, 0.0, 1.0)
        };
        right = forward.cross(&alternate_up);
        if right.norm() < BASIS_EPSILON {
            return Mat4::identity();
        }
    }
    let right = right.normalize();
    let corrected_up = right.cross(&forward);

    let rotation = Mat4::new(
        right.x, right.y, right.z, 0.0, //
        corrected_up.x, corrected_up.y, corrected_up.z, 0.0, //
        -forward.x, -forward.y, -forward.z, 0.0, //
        0.0, 0.0, 0.0, 1.0,
    );

    rotation * AffineTransform::translation_matrix(&-eye)
}

/// Symmetric perspective projection.
///
/// After the divide by w, the near plane lands on z = +1 and the far plane on
/// z = -1: larger depth values are nearer the camera. Invalid frustum
/// parameters yield the identity matrix.
pub fn perspective(fov: f64, aspect: f64, near: f64, far: f64) -> Mat4 {
    let half_tan = (fov / 2.0).tan();
    if !half_tan.is_finite()
        || half_tan < EPSILON
        || aspect < EPSILON
        || (far - near).abs() < EPSILON
    {
        log::warn!(
            "degenerate frustum (fov={}, aspect={}, near={}, far={}), using identity",
            fov,
            aspect,
            near,
            far
        );
        return Mat4::identity();
    }

    let focal = 1.0 / half_tan;
    let depth_scale = (far + near) / (far - near);
    let depth_offset = 2.0 * near * far / (far - near);

    Mat4::new(
        focal / aspect, 0.0, 0.0, 0.0, //
        0.0, focal, 0.0, 0.0, //
        0.0, 0.0, depth_scale, depth_offset, //
        0.0, 0.0, -1.0, 0.0,
    )
}

/// Transform a point to clip space and divide by w.
///
/// The divide is skipped when `|w| <= EPSILON`. Returns the normalized
/// coordinates together with the clip-space w.
pub fn project_to_ndc(mvp: &Mat4, point: &Vec3) -> (Vec3, f64) {
    let clip: Vec4 = mvp.mul_point(point);
    let w = clip.w;
    let ndc = if w.abs() > EPSILON {
        clip.xyz() / w
    } else {
        clip.xyz()
    };
    (ndc, w)
}

/// Map normalized device coordinates to pixel coordinates (Y grows down).
pub fn vertex_to_screen(ndc: &Vec3, width: usize, height: usize) -> Vec2 {
    let half_width = width as f64 / 2.0;
    let half_height = height as f64 / 2.0;
    Vec2::new(ndc.x * half_width + half_width, -ndc.y * half_height + half_height)
}

/// Project a point all the way to the screen.
///
/// Returns `(x, y, depth)` or `None` when the point is behind the eye.
pub fn project_point(mvp: &Mat4, point: &Vec3, width: usize, height: usize) -> Option<Vec3> {
    let (ndc, w) = project_to_ndc(mvp, point);
    if w <= EPSILON || !ndc.iter().all(|c| c.is_finite()) {
        return None;
    }
    let screen = vertex_to_screen(&ndc, width, height);
    Some(Vec3::new(screen.x, screen.y, ndc.z))
}

/// Camera configuration for 3D rendering
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    pub target: Vec3,
    pub fov: f64,
    pub aspect: f64,
    pub near: f64,
    pub far: f64,
}

impl Camera {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 5.0),
            target: Vec3::zeros(),
            fov: std::f64::consts::FRAC_PI_4, // 45 degrees
            aspect: width as f64 / height.max(1) as f64,
            near: 0.1,
            far: 100.0,
        }
    }

    pub fn position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    pub fn target(mut self, target: Vec3) -> Self {
        self.target = target;
        self
    }

    /// Set the field of view in degrees.
    pub fn fov_degrees(mut self, fov: f64) -> Self {
        self.fov = fov.to_radians();
        self
    }

    pub fn clip_planes(mut self, near: f64, far: f64) -> Self {
        self.near = near;
        self.far = far;
        self
    }

    pub fn set_aspect_ratio(&mut self, aspect: f64) {
        self.aspect = aspect;
    }

    /// Keep the aspect ratio in sync with a render target.
    pub fn fit_viewport(&mut self, width: usize, height: usize) {
        if width > 0 && height > 0 {
            self.aspect = width as f64 / height as f64;
        }
    }

    /// Unit vector from the eye toward the target (-Z when they coincide).
    pub fn forward(&self) -> Vec3 {
        (self.target - self.position)
            .checked_normalize()
            .unwrap_or_else(|_| Vec3::new(0.0, 0.0, -1.0))
    }

    pub fn distance_to_target(&self) -> f64 {
        (self.target - self.position).norm()
    }

    /// Create the view matrix (camera transformation)
    pub fn view_matrix(&self) -> Mat4 {
        look_at(&self.position, &self.target, &Vec3::y())
    }

    /// Create the projection matrix
    pub fn projection_matrix(&self) -> Mat4 {
        perspective(self.fov, self.aspect, self.near, self.far)
    }

    /// Project a 3D point to 2D screen space
    pub fn project_to_screen(
        &self,
        point: &Vec3,
        model_matrix: &Mat4,
        width: usize,
        height: usize,
    ) -> Option<Vec3> {
        let mvp = AffineTransform::mvp_matrix(
            model_matrix,
            &self.view_matrix(),
            &self.projection_matrix(),
        );
        project_point(&mvp, point, width, height)
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(800, 600)
    }
}

/// Keyboard-driven camera translation, independent of any windowing toolkit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraMove {
    Forward,
    Backward,
    Left,
    Right,
    Up,
    Down,
}

/// Orbit controller: drag rotates the eye around the target, scroll changes
/// the orbit radius, keys pan eye and target together.
///
/// The controller keeps no copy of the camera pose besides the one captured
/// at construction for [`OrbitController::reset`]; angles are re-derived from
/// the camera on every event.
#[derive(Debug, Clone)]
pub struct OrbitController {
    initial_position: Vec3,
    initial_target: Vec3,
    last_mouse: Option<(f64, f64)>,
    /// Radians of rotation per pixel of mouse movement.
    pub sensitivity: f64,
    /// Radius change per scroll step.
    pub zoom_sensitivity: f64,
    /// World units moved per key press.
    pub move_speed: f64,
    pub min_distance: f64,
    pub max_distance: f64,
}

/// Elevation stays this far from the poles.
const POLE_MARGIN: f64 = 0.01;

impl OrbitController {
    pub fn new(camera: &Camera) -> Self {
        Self {
            initial_position: camera.position,
            initial_target: camera.target,
            last_mouse: None,
            sensitivity: 0.01,
            zoom_sensitivity: 0.5,
            move_speed: 0.25,
            min_distance: 0.5,
            max_distance: 100.0,
        }
    }

    pub fn sensitivity(mut self, sensitivity: f64) -> Self {
        self.sensitivity = sensitivity;
        self
    }

    pub fn zoom_sensitivity(mut self, sensitivity: f64) -> Self {
        self.zoom_sensitivity = sensitivity;
        self
    }

    pub fn move_speed(mut self, speed: f64) -> Self {
        self.move_speed = speed;
        self
    }

    /// Set distance limits.
    pub fn distance_limits(mut self, min: f64, max: f64) -> Self {
        self.min_distance = min;
        self.max_distance = max.max(min);
        self
    }

    pub fn mouse_pressed(&mut self, x: f64, y: f64) {
        self.last_mouse = Some((x, y));
    }

    pub fn mouse_released(&mut self) {
        self.last_mouse = None;
    }

    /// Rotate the eye by the pixel delta since the last mouse event.
    pub fn mouse_dragged(&mut self, x: f64, y: f64, camera: &mut Camera) {
        let Some((last_x, last_y)) = self.last_mouse.replace((x, y)) else {
            return;
        };
        let (dx, dy) = (x - last_x, y - last_y);
        if dx == 0.0 && dy == 0.0 {
            return;
        }

        let (azimuth, elevation, distance) = self.spherical(camera);
        let azimuth = azimuth - dx * self.sensitivity;
        let elevation = clamp_elevation(elevation + dy * self.sensitivity);
        self.place_eye(camera, azimuth, elevation, distance);
    }

    /// Positive `delta` moves toward the target.
    pub fn scroll(&mut self, delta: f64, camera: &mut Camera) {
        let (azimuth, elevation, distance) = self.spherical(camera);
        let distance =
            (distance - delta * self.zoom_sensitivity).clamp(self.min_distance, self.max_distance);
        self.place_eye(camera, azimuth, elevation, distance);
    }

    /// Translate eye and target together along camera-local axes.
    pub fn move_camera(&mut self, direction: CameraMove, camera: &mut Camera) {
        let forward = camera.forward();
        let right = forward
            .cross(&Vec3::y())
            .checked_normalize()
            .unwrap_or_else(|_| Vec3::x());
        let up = right.cross(&forward);

        let offset = match direction {
            CameraMove::Forward => forward,
            CameraMove::Backward => -forward,
            CameraMove::Right => right,
            CameraMove::Left => -right,
            CameraMove::Up => up,
            CameraMove::Down => -up,
        } * self.move_speed;

        camera.position += offset;
        camera.target += offset;
    }

    /// Restore the eye and target captured at construction.
    pub fn reset(&mut self, camera: &mut Camera) {
        camera.position = self.initial_position;
        camera.target = self.initial_target;
        self.last_mouse = None;
    }

    /// (azimuth, elevation, distance) of the eye relative to the target.
    fn spherical(&self, camera: &Camera) -> (f64, f64, f64) {
        let offset = camera.position - camera.target;
        let distance = offset.norm();
        if distance < EPSILON {
            return (0.0, 0.0, self.min_distance);
        }
        let elevation = clamp_elevation((offset.y / distance).clamp(-1.0, 1.0).asin());
        let azimuth = offset.x.atan2(offset.z);
        (azimuth, elevation, distance.max(self.min_distance))
    }

    fn place_eye(&self, camera: &mut Camera, azimuth: f64, elevation: f64, distance: f64) {
        // Spherical to Cartesian conversion
        let offset = Vec3::new(
            distance * elevation.cos() * azimuth.sin(),
            distance * elevation.sin(),
            distance * elevation.cos() * azimuth.cos(),
        );
        camera.position = camera.target + offset;
    }
}

fn clamp_elevation(elevation: f64) -> f64 {
    let limit = std::f64::consts::FRAC_PI_2 - POLE_MARGIN;
    elevation.clamp(-limit, limit)
}
