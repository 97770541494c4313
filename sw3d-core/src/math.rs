/// Linear algebra primitives shared by the whole pipeline
///
/// Vectors and matrices are nalgebra types over `f64`. The checked helpers in
/// this module add the failure conditions the renderer relies on: division by
/// a near-zero scalar, normalizing a near-zero vector, and inverting a
/// near-singular matrix all report a [`MathError`] instead of producing NaN.
use std::fmt;

use approx::AbsDiffEq;
use nalgebra::SVector;

pub type Vec2 = nalgebra::Vector2<f64>;
pub type Vec3 = nalgebra::Vector3<f64>;
pub type Vec4 = nalgebra::Vector4<f64>;
pub type Mat3 = nalgebra::Matrix3<f64>;
pub type Mat4 = nalgebra::Matrix4<f64>;

/// Tolerance used for equality, division and singularity checks.
pub const EPSILON: f64 = 1e-7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MathError {
    DivisionByZero,
    ZeroLengthVector,
    SingularMatrix,
    IndexOutOfBounds { row: usize, col: usize },
}

impl fmt::Display for MathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MathError::DivisionByZero => write!(f, "division by zero"),
            MathError::ZeroLengthVector => write!(f, "cannot normalize a zero-length vector"),
            MathError::SingularMatrix => write!(f, "singular matrix has no inverse"),
            MathError::IndexOutOfBounds { row, col } => {
                write!(f, "matrix index ({}, {}) is out of bounds", row, col)
            }
        }
    }
}

impl std::error::Error for MathError {}

/// Checked operations for fixed-size `f64` vectors
pub trait VectorExt: Sized {
    /// Divide every component by `scalar`, failing when `|scalar| < EPSILON`.
    fn checked_div(&self, scalar: f64) -> Result<Self, MathError>;

    /// Unit vector in the same direction, failing for near-zero length.
    fn checked_normalize(&self) -> Result<Self, MathError>;

    /// Component-wise equality within [`EPSILON`].
    fn approx_eq(&self, other: &Self) -> bool;
}

impl<const D: usize> VectorExt for SVector<f64, D> {
    fn checked_div(&self, scalar: f64) -> Result<Self, MathError> {
        if scalar.abs() < EPSILON {
            return Err(MathError::DivisionByZero);
        }
        Ok(self.unscale(scalar))
    }

    fn checked_normalize(&self) -> Result<Self, MathError> {
        let length = self.norm();
        if length < EPSILON {
            return Err(MathError::ZeroLengthVector);
        }
        Ok(self.unscale(length))
    }

    fn approx_eq(&self, other: &Self) -> bool {
        self.abs_diff_eq(other, EPSILON)
    }
}

/// Element access and the classical determinant/inverse for 4x4 matrices
pub trait Matrix4Ext: Sized {
    fn element(&self, row: usize, col: usize) -> Result<f64, MathError>;
    fn set_element(&mut self, row: usize, col: usize, value: f64) -> Result<(), MathError>;

    /// The 3x3 matrix left after removing `row` and `col`.
    fn minor(&self, row: usize, col: usize) -> Mat3;

    /// Determinant by first-row Laplace expansion over 3x3 minors.
    fn laplace_determinant(&self) -> f64;

    /// Inverse computed as adjugate / determinant.
    fn adjugate_inverse(&self) -> Result<Self, MathError>;

    /// Transform a point (w = 1) into homogeneous coordinates.
    fn mul_point(&self, point: &Vec3) -> Vec4;

    fn approx_eq(&self, other: &Self) -> bool;
}

impl Matrix4Ext for Mat4 {
    fn element(&self, row: usize, col: usize) -> Result<f64, MathError> {
        self.get((row, col))
            .copied()
            .ok_or(MathError::IndexOutOfBounds { row, col })
    }

    fn set_element(&mut self, row: usize, col: usize, value: f64) -> Result<(), MathError> {
        let cell = self
            .get_mut((row, col))
            .ok_or(MathError::IndexOutOfBounds { row, col })?;
        *cell = value;
        Ok(())
    }

    fn minor(&self, row: usize, col: usize) -> Mat3 {
        Mat3::from_fn(|r, c| {
            let source_row = if r < row { r } else { r + 1 };
            let source_col = if c < col { c } else { c + 1 };
            self[(source_row, source_col)]
        })
    }

    fn laplace_determinant(&self) -> f64 {
        (0..4)
            .map(|col| {
                let sign = if col % 2 == 0 { 1.0 } else { -1.0 };
                sign * self[(0, col)] * self.minor(0, col).determinant()
            })
            .sum()
    }

    fn adjugate_inverse(&self) -> Result<Self, MathError> {
        let determinant = self.laplace_determinant();
        if determinant.abs() < EPSILON {
            return Err(MathError::SingularMatrix);
        }

        let cofactors = Mat4::from_fn(|row, col| {
            let sign = if (row + col) % 2 == 0 { 1.0 } else { -1.0 };
            sign * self.minor(row, col).determinant()
        });

        Ok(cofactors.transpose() / determinant)
    }

    fn mul_point(&self, point: &Vec3) -> Vec4 {
        self * point.push(1.0)
    }

    fn approx_eq(&self, other: &Self) -> bool {
        self.abs_diff_eq(other, EPSILON)
    }
}

/// z-component of the 2D cross product `(b - a) x (c - b)`.
///
/// Positive when `a -> b -> c` turns counter-clockwise in a y-up plane.
pub fn turn_direction(a: &Vec2, b: &Vec2, c: &Vec2) -> f64 {
    let ab = b - a;
    let bc = c - b;
    ab.x * bc.y - ab.y * bc.x
}

/// Twice the signed area of a closed 2D polygon (shoelace formula).
pub fn signed_double_area(points: &[Vec2]) -> f64 {
    let n = points.len();
    (0..n)
        .map(|i| {
            let a = points[i];
            let b = points[(i + 1) % n];
            a.x * b.y - b.x * a.y
        })
        .sum()
}
