//! Direction sampling and local frames.

use std::f64::consts::{PI, TAU};

use nalgebra::{UnitQuaternion, Vector3};
use rand::Rng;

/// Draw a direction uniformly distributed on the unit sphere.
#[must_use]
pub fn uniform_sphere_direction<R: Rng + ?Sized>(rng: &mut R) -> Vector3<f64> {
    let z = 2.0 * rng.gen::<f64>() - 1.0;
    let r = (1.0 - z * z).max(0.0).sqrt();
    let phi = TAU * rng.gen::<f64>();
    Vector3::new(r * phi.cos(), r * phi.sin(), z)
}

/// Draw a direction uniformly distributed inside the cone of half-angle
/// `half_angle` around the unit axis `axis`.
#[must_use]
pub fn cone_direction<R: Rng + ?Sized>(
    rng: &mut R,
    axis: &Vector3<f64>,
    half_angle: f64,
) -> Vector3<f64> {
    let cos_theta = half_angle.cos();
    let cos_a = cos_theta + (1.0 - cos_theta) * rng.gen::<f64>();
    let sin_a = (1.0 - cos_a * cos_a).max(0.0).sqrt();
    let phi = TAU * rng.gen::<f64>();
    let (right, up) = orthogonal_frame(axis);
    cos_a * axis + sin_a * (phi.cos() * right + phi.sin() * up)
}

/// Build a right-handed frame `(right, up)` orthogonal to the unit vector
/// `n`, with `up = n × right`.
///
/// The seed axis is `(1,0,0)` unless `n` is nearly parallel to it, in
/// which case `(0,1,0)` is used before projection.
#[must_use]
pub fn orthogonal_frame(n: &Vector3<f64>) -> (Vector3<f64>, Vector3<f64>) {
    let mut right = Vector3::x();
    if n.x.abs() > 0.9 {
        right.y = 1.0;
    }
    right -= n * right.dot(n);
    let right = right.normalize();
    let up = n.cross(&right);
    (right, up)
}

/// Frame around a contact normal via the quaternion rotating `(0,0,1)`
/// onto it: the returned `(right, up)` are the first and second columns of
/// the rotation matrix.
///
/// When the normal is antiparallel to z, a π rotation about x is used.
#[must_use]
pub fn contact_frame(norm: &Vector3<f64>) -> (Vector3<f64>, Vector3<f64>) {
    let rotation = UnitQuaternion::rotation_between(&Vector3::z(), norm)
        .unwrap_or_else(|| UnitQuaternion::from_axis_angle(&Vector3::x_axis(), PI));
    let m = rotation.to_rotation_matrix();
    (
        m.matrix().column(0).into_owned(),
        m.matrix().column(1).into_owned(),
    )
}
