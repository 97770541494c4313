/// Affine transformation matrices and per-model transform state
use crate::math::{Mat4, Vec3};

/// Builder for the individual affine transforms.
///
/// All matrices follow the column-vector convention: a point is transformed
/// with `matrix * point`, so the right-most factor of a product acts first.
pub struct AffineTransform;

impl AffineTransform {
    /// Create a translation matrix
    pub fn translation_matrix(offset: &Vec3) -> Mat4 {
        Mat4::new_translation(offset)
    }

    /// Rotation around the X axis (radians)
    pub fn rotation_x_matrix(angle: f64) -> Mat4 {
        let (s, c) = angle.sin_cos();
        Mat4::new(
            1.0, 0.0, 0.0, 0.0, //
            0.0, c, -s, 0.0, //
            0.0, s, c, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        )
    }

    /// Rotation around the Y axis (radians)
    pub fn rotation_y_matrix(angle: f64) -> Mat4 {
        let (s, c) = angle.sin_cos();
        Mat4::new(
            c, 0.0, s, 0.0, //
            0.0, 1.0, 0.0, 0.0, //
            -s, 0.0, c, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        )
    }

    /// Rotation around the Z axis (radians)
    pub fn rotation_z_matrix(angle: f64) -> Mat4 {
        let (s, c) = angle.sin_cos();
        Mat4::new(
            c, -s, 0.0, 0.0, //
            s, c, 0.0, 0.0, //
            0.0, 0.0, 1.0, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        )
    }

    /// Create a rotation matrix from per-axis angles in degrees.
    ///
    /// The result is `RotX * RotY * RotZ`.
    pub fn rotation_matrix(degrees: &Vec3) -> Mat4 {
        let rx = Self::rotation_x_matrix(degrees.x.to_radians());
        let ry = Self::rotation_y_matrix(degrees.y.to_radians());
        let rz = Self::rotation_z_matrix(degrees.z.to_radians());

        rx * ry * rz
    }

    /// Create a (possibly non-uniform) scale matrix
    pub fn scale_matrix(scale: &Vec3) -> Mat4 {
        Mat4::new_nonuniform_scaling(scale)
    }

    /// Create a model-view-projection matrix
    pub fn mvp_matrix(model: &Mat4, view: &Mat4, projection: &Mat4) -> Mat4 {
        projection * view * model
    }
}

/// Position, rotation (degrees) and scale of one model.
///
/// Setters replace the stored vector as a whole; there is no way to borrow a
/// component mutably.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelTransform {
    position: Vec3,
    rotation: Vec3,
    scale: Vec3,
}

impl ModelTransform {
    pub fn new(position: Vec3, rotation: Vec3, scale: Vec3) -> Self {
        Self {
            position,
            rotation,
            scale,
        }
    }

    pub fn identity() -> Self {
        Self::new(Vec3::zeros(), Vec3::zeros(), Vec3::repeat(1.0))
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn rotation(&self) -> Vec3 {
        self.rotation
    }

    pub fn scale(&self) -> Vec3 {
        self.scale
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    pub fn set_rotation(&mut self, rotation: Vec3) {
        self.rotation = rotation;
    }

    pub fn set_scale(&mut self, scale: Vec3) {
        self.scale = scale;
    }

    pub fn translate_by(&mut self, delta: Vec3) {
        self.set_position(self.position + delta);
    }

    /// Rotate by delta amounts (in degrees)
    pub fn rotate_by(&mut self, delta: Vec3) {
        self.set_rotation(self.rotation + delta);
    }

    pub fn scale_by(&mut self, factors: Vec3) {
        self.set_scale(self.scale.component_mul(&factors));
    }

    pub fn reset(&mut self) {
        *self = Self::identity();
    }
}

impl Default for ModelTransform {
    fn default() -> Self {
        Self::identity()
    }
}

/// Composes the model matrix `T * R * S` (scale first, translation last).
pub struct ModelMatrixBuilder;

impl ModelMatrixBuilder {
    pub fn build(position: &Vec3, rotation_degrees: &Vec3, scale: &Vec3) -> Mat4 {
        let translation = AffineTransform::translation_matrix(position);
        let rotation = AffineTransform::rotation_matrix(rotation_degrees);
        let scale = AffineTransform::scale_matrix(scale);

        translation * rotation * scale
    }

    /// Model matrix for an optional transform; `None` means identity.
    pub fn from_transform(transform: Option<&ModelTransform>) -> Mat4 {
        match transform {
            Some(t) => Self::build(&t.position, &t.rotation, &t.scale),
            None => Mat4::identity(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{Matrix4Ext, VectorExt};
    use approx::assert_relative_eq;

    #[test]
    fn test_transform_state() {
        let mut transform = ModelTransform::default();
        assert_eq!(transform.scale(), Vec3::repeat(1.0));

        transform.rotate_by(Vec3::new(10.0, 20.0, 30.0));
        transform.translate_by(Vec3::new(1.0, 0.0, 0.0));
        transform.scale_by(Vec3::new(2.0, 3.0, 4.0));
        assert!((transform.rotation() - Vec3::new(10.0, 20.0, 30.0)).norm() < 1e-12);
        assert_eq!(transform.position(), Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(transform.scale(), Vec3::new(2.0, 3.0, 4.0));

        transform.reset();
        assert_eq!(transform, ModelTransform::identity());
    }

    #[test]
    fn test_identity_rotation() {
        let matrix = AffineTransform::rotation_matrix(&Vec3::zeros());
        assert!(matrix.approx_eq(&Mat4::identity()));
    }

    #[test]
    fn test_rotation_inverse_per_axis() {
        for angle in [-3.0, -1.2, 0.0, 0.4, 1.25, 2.9] {
            for build in [
                AffineTransform::rotation_x_matrix,
                AffineTransform::rotation_y_matrix,
                AffineTransform::rotation_z_matrix,
            ] {
                assert!((build(angle) * build(-angle)).approx_eq(&Mat4::identity()));
            }
        }
    }

    #[test]
    fn test_rotation_direction() {
        let rotated = AffineTransform::rotation_matrix(&Vec3::new(0.0, 0.0, 90.0))
            .mul_point(&Vec3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(rotated.xyz(), Vec3::new(0.0, 1.0, 0.0), epsilon = 1e-12);

        let rotated = AffineTransform::rotation_matrix(&Vec3::new(90.0, 0.0, 0.0))
            .mul_point(&Vec3::new(0.0, 1.0, 0.0));
        assert_relative_eq!(rotated.xyz(), Vec3::new(0.0, 0.0, 1.0), epsilon = 1e-12);
    }

    #[test]
    fn test_scale_applies_before_translation() {
        let model = ModelMatrixBuilder::build(
            &Vec3::new(10.0, 0.0, 0.0),
            &Vec3::zeros(),
            &Vec3::new(2.0, 1.0, 1.0),
        );
        let point = model.mul_point(&Vec3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(point.xyz(), Vec3::new(12.0, 0.0, 0.0), epsilon = 1e-12);
        assert!((point.xyz() - Vec3::new(22.0, 0.0, 0.0)).norm() > 1.0);
    }

    #[test]
    fn test_missing_transform_is_identity() {
        assert!(ModelMatrixBuilder::from_transform(None).approx_eq(&Mat4::identity()));

        let transform = ModelTransform::new(
            Vec3::new(1.0, 2.0, 3.0),
            Vec3::new(0.0, 90.0, 0.0),
            Vec3::repeat(2.0),
        );
        let model = ModelMatrixBuilder::from_transform(Some(&transform));
        let inverse = model.adjugate_inverse().unwrap();
        let v = Vec3::new(0.3, -0.7, 1.1);
        let restored = inverse.mul_point(&model.mul_point(&v).xyz());
        assert!(restored.xyz().approx_eq(&v));
    }

    #[test]
    fn test_mvp_order() {
        let model = AffineTransform::translation_matrix(&Vec3::new(1.0, 0.0, 0.0));
        let view = AffineTransform::scale_matrix(&Vec3::repeat(2.0));
        let projection = Mat4::identity();
        let mvp = AffineTransform::mvp_matrix(&model, &view, &projection);
        // Translate first, then scale.
        let p = mvp.mul_point(&Vec3::zeros());
        assert_relative_eq!(p.xyz(), Vec3::new(2.0, 0.0, 0.0));
    }
}
