//! Per-contact clearance evaluation.

use std::f64::consts::PI;

use grasp_types::{Contact, Ray};
use grasp_world::{with_collision_options, CollisionOptions, CollisionReport, Environment};
use rand::Rng;
use tracing::debug;

use grasp_geometry::cone_direction;

/// Ray length multiplier; the direction magnitude caps the query distance.
const RAY_SCALE: f64 = 1000.0;

/// For every contact, measure the minimum clearance seen by rays cast
/// inside a cone of half-angle `cone_half_angle` about its normal, and
/// store it in the contact's `depth`.
///
/// A clearance of `max_range` means no obstacle was found within range.
/// The sample count scales with the cone width: 64 rays at a half-angle
/// of π/12, a single axis ray below 0.01 rad.
pub fn compute_distance_map<E, R>(
    env: &mut E,
    contacts: &mut [Contact],
    cone_half_angle: f64,
    max_range: f64,
    rng: &mut R,
) where
    E: Environment + ?Sized,
    R: Rng + ?Sized,
{
    let samples = if cone_half_angle < 0.01 {
        1
    } else {
        (cone_half_angle * 64.0 / (PI / 12.0)).ceil() as usize
    };
    debug!(
        "distance map over {} contacts, {samples} rays each",
        contacts.len()
    );

    with_collision_options(env, CollisionOptions::DISTANCE, |env| {
        let mut report = CollisionReport::new();
        for contact in contacts.iter_mut() {
            let mut min_dist = max_range;
            for _ in 0..samples {
                let dir = cone_direction(rng, &contact.norm, cone_half_angle);
                let ray = Ray::new(contact.pos, dir * RAY_SCALE);
                if env.cast_ray(&ray, None, &mut report) && report.min_distance < min_dist {
                    min_dist = report.min_distance;
                }
            }
            contact.depth = min_dist;
        }
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::box_sample;
    use approx::assert_relative_eq;
    use grasp_world::testing::{FixtureBody, FixtureWorld};
    use grasp_world::Environment;
    use nalgebra::Point3;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn surface_points_of_enabled_body_have_zero_clearance() {
        // Sample a sphere, then evaluate the map with the sphere still
        // enabled: every cone ray starts on the surface pointing inward,
        // so the measured clearance is the surface distance, ~0.
        let mut world = FixtureWorld::new();
        let ball = world.add_body(FixtureBody::sphere("ball", Point3::origin(), 0.3));
        let mut contacts = box_sample(&mut world, ball, 600, Point3::origin());
        assert!(!contacts.is_empty());

        let mut rng = StdRng::seed_from_u64(5);
        compute_distance_map(&mut world, &mut contacts, PI / 12.0, 2.0, &mut rng);

        for c in &contacts {
            assert!(c.depth >= 0.0);
            assert!(c.depth < 1e-6, "expected surface clearance, got {}", c.depth);
            assert_relative_eq!(c.pos.coords.norm(), 0.3, epsilon = 1e-3);
        }
    }

    #[test]
    fn empty_space_reports_max_range() {
        let mut world = FixtureWorld::new();
        let ball = world.add_body(FixtureBody::sphere("ball", Point3::origin(), 0.3));
        let mut contacts = box_sample(&mut world, ball, 600, Point3::origin());
        world.set_body_enabled(ball, false);

        let mut rng = StdRng::seed_from_u64(6);
        compute_distance_map(&mut world, &mut contacts, PI / 4.0, 2.0, &mut rng);
        for c in &contacts {
            assert_relative_eq!(c.depth, 2.0);
        }
    }

    #[test]
    fn narrow_cone_uses_single_axis_ray() {
        // A contact aimed at an obstacle measures the gap along its normal.
        let mut world = FixtureWorld::new();
        world.add_body(FixtureBody::sphere("wall", Point3::new(0.0, 0.0, 1.0), 0.25));
        let mut contacts = vec![Contact::new(Point3::origin(), nalgebra::Vector3::z())];

        let mut rng = StdRng::seed_from_u64(7);
        compute_distance_map(&mut world, &mut contacts, 0.001, 2.0, &mut rng);
        assert_relative_eq!(contacts[0].depth, 0.75, epsilon = 1e-9);
    }

    #[test]
    fn restores_collision_options() {
        let mut world = FixtureWorld::new();
        world.set_collision_options(CollisionOptions::CONTACTS);
        let mut rng = StdRng::seed_from_u64(8);
        let mut contacts = vec![];
        compute_distance_map(&mut world, &mut contacts, 0.5, 2.0, &mut rng);
        assert_eq!(world.collision_options(), CollisionOptions::CONTACTS);
    }
}
