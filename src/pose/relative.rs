//!
//! Marker-to-reference rotations and their Euler decomposition
//!

use nalgebra::{Rotation3, Vector3};

/// Past this, `y` is at ±90° and `x`/`z` can't be told apart
const GIMBAL_LOCK: f64 = 0.9999999;

/// Rotation of `marker` as seen from `reference`
///
/// Rotations are orthonormal, so the transpose is the inverse.
#[inline]
pub fn relative_rotation(reference: &Rotation3<f64>, marker: &Rotation3<f64>) -> Rotation3<f64> {
    reference.transpose() * marker
}

/// Intrinsic X-Y-Z Euler angles, in radians
///
/// `R = Rx(x) · Ry(y) · Rz(z)`
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EulerXyz {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}
impl EulerXyz {
    pub fn from_rotation(rot: &Rotation3<f64>) -> Self {
        let m = rot.matrix();
        let m13 = m[(0, 2)].clamp(-1.0, 1.0);

        let y = m13.asin();
        let (x, z) = if m13.abs() < GIMBAL_LOCK {
            (
                f64::atan2(-m[(1, 2)], m[(2, 2)]),
                f64::atan2(-m[(0, 1)], m[(0, 0)]),
            )
        } else {
            (f64::atan2(m[(2, 1)], m[(1, 1)]), 0.0)
        };

        Self { x, y, z }
    }

    pub fn to_rotation(&self) -> Rotation3<f64> {
        Rotation3::from_axis_angle(&Vector3::x_axis(), self.x)
            * Rotation3::from_axis_angle(&Vector3::y_axis(), self.y)
            * Rotation3::from_axis_angle(&Vector3::z_axis(), self.z)
    }

    /// Component about `axis`
    pub fn get(&self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}
