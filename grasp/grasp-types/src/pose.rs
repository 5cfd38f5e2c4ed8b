//! Rigid-body pose.

use nalgebra::{Isometry3, Point3, UnitQuaternion, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A rigid pose: rotation as a unit quaternion plus a translation.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Pose {
    /// Position in world coordinates.
    pub position: Point3<f64>,
    /// Orientation as a unit quaternion.
    pub rotation: UnitQuaternion<f64>,
}

impl Default for Pose {
    fn default() -> Self {
        Self::identity()
    }
}

impl Pose {
    /// Identity pose (origin, no rotation).
    #[must_use]
    pub fn identity() -> Self {
        Self {
            position: Point3::origin(),
            rotation: UnitQuaternion::identity(),
        }
    }

    /// Pose from position only (identity rotation).
    #[must_use]
    pub fn from_position(position: Point3<f64>) -> Self {
        Self {
            position,
            rotation: UnitQuaternion::identity(),
        }
    }

    /// Pose from position and rotation.
    #[must_use]
    pub const fn from_position_rotation(
        position: Point3<f64>,
        rotation: UnitQuaternion<f64>,
    ) -> Self {
        Self { position, rotation }
    }

    /// Convert to an isometry.
    #[must_use]
    pub fn to_isometry(&self) -> Isometry3<f64> {
        Isometry3::from_parts(self.position.coords.into(), self.rotation)
    }

    /// Pose from an isometry.
    #[must_use]
    pub fn from_isometry(iso: &Isometry3<f64>) -> Self {
        Self {
            position: Point3::from(iso.translation.vector),
            rotation: iso.rotation,
        }
    }

    /// Transform a point from local to world coordinates.
    #[must_use]
    pub fn transform_point(&self, local: &Point3<f64>) -> Point3<f64> {
        self.position + self.rotation * local.coords
    }

    /// Rotate a vector from local to world coordinates.
    #[must_use]
    pub fn transform_vector(&self, local: &Vector3<f64>) -> Vector3<f64> {
        self.rotation * local
    }

    /// Inverse pose.
    #[must_use]
    pub fn inverse(&self) -> Self {
        let inv_rotation = self.rotation.inverse();
        Self {
            position: Point3::from(-(inv_rotation * self.position.coords)),
            rotation: inv_rotation,
        }
    }

    /// Compose two poses: `self` then `other` in `self`'s frame.
    #[must_use]
    pub fn compose(&self, other: &Self) -> Self {
        Self {
            position: self.transform_point(&other.position),
            rotation: self.rotation * other.rotation,
        }
    }

    /// Interpolate between two poses (linear position, slerp rotation).
    ///
    /// Falls back to the nearer endpoint's rotation when the rotations are
    /// antipodal and slerp is undefined.
    #[must_use]
    pub fn interpolate(&self, other: &Self, t: f64) -> Self {
        let rotation = self
            .rotation
            .try_slerp(&other.rotation, t, 1e-9)
            .unwrap_or(if t < 0.5 { self.rotation } else { other.rotation });
        Self {
            position: Point3::from(self.position.coords.lerp(&other.position.coords, t)),
            rotation,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn transform_point_round_trip() {
        let pose = Pose::from_position_rotation(
            Point3::new(1.0, 2.0, 3.0),
            UnitQuaternion::from_axis_angle(&Vector3::z_axis(), FRAC_PI_2),
        );
        let p = Point3::new(0.5, -0.25, 0.75);
        let back = pose.inverse().transform_point(&pose.transform_point(&p));
        assert_relative_eq!(back, p, epsilon = 1e-12);
    }

    #[test]
    fn compose_matches_isometry_product() {
        let a = Pose::from_position_rotation(
            Point3::new(0.1, 0.2, 0.3),
            UnitQuaternion::from_axis_angle(&Vector3::x_axis(), 0.4),
        );
        let b = Pose::from_position_rotation(
            Point3::new(-0.5, 0.0, 1.0),
            UnitQuaternion::from_axis_angle(&Vector3::y_axis(), -0.7),
        );
        let composed = a.compose(&b);
        let iso = a.to_isometry() * b.to_isometry();
        assert_relative_eq!(
            composed.position.coords,
            iso.translation.vector,
            epsilon = 1e-12
        );
    }

    #[test]
    fn interpolate_endpoints() {
        let a = Pose::from_position(Point3::new(0.0, 0.0, 0.0));
        let b = Pose::from_position(Point3::new(2.0, 0.0, 0.0));
        assert_relative_eq!(a.interpolate(&b, 0.0).position.x, 0.0);
        assert_relative_eq!(a.interpolate(&b, 1.0).position.x, 2.0);
        assert_relative_eq!(a.interpolate(&b, 0.5).position.x, 1.0);
    }
}
