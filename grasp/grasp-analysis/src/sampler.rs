//! Candidate contact-point samplers.
//!
//! All three samplers cast rays at a target body and record the hit
//! points. Ray misses are advisory, never fatal; the random sampler alone
//! carries a budget so a never-hit target cannot loop forever.

use grasp_types::{BodyId, Contact, Ray};
use grasp_world::{with_collision_options, CollisionOptions, CollisionReport, Environment};
use nalgebra::{Point3, Vector3};
use rand::Rng;
use tracing::debug;

use crate::AnalysisError;

use grasp_geometry::{sphere_triangulation, uniform_sphere_direction};

/// Side length of the sampling cube and the ray standoff distance.
const FFAR: f64 = 1.0;
/// Ray length multiplier; the direction magnitude caps the query distance.
const RAY_SCALE: f64 = 1000.0;
/// Outward extrusion applied to sampled surface points.
const EXTRUDE: f64 = 0.001;

/// Sample the target surface with rays cast inward from the six faces of
/// an axis-aligned cube of side [`FFAR`] centered on `center`.
///
/// The per-face grid step targets roughly `num_samples` rays in total.
/// Each hit yields a contact whose normal is flipped to point into the
/// body and whose depth is zero.
pub fn box_sample<E: Environment + ?Sized>(
    env: &mut E,
    target: BodyId,
    num_samples: usize,
    center: Point3<f64>,
) -> Vec<Contact> {
    let step = FFAR / ((num_samples as f64) / 12.0).sqrt();
    let mut contacts = Vec::with_capacity(num_samples);

    with_collision_options(
        env,
        CollisionOptions::CONTACTS | CollisionOptions::DISTANCE,
        |env| {
            let mut report = CollisionReport::new();
            for k in 0..6 {
                let mut i = -FFAR / 2.0;
                while i < FFAR / 2.0 {
                    let mut j = -FFAR / 2.0;
                    while j < FFAR / 2.0 {
                        let ray = cube_face_ray(k, center, i, j);
                        if env.cast_ray(&ray, Some(target), &mut report) {
                            if let Some(hit) = report.contacts.first() {
                                contacts.push(Contact {
                                    pos: hit.pos,
                                    norm: -hit.norm,
                                    depth: 0.0,
                                });
                            }
                        }
                        j += step;
                    }
                    i += step;
                }
            }
        },
    );

    debug!(
        "box sampling produced {} contacts for target {target}",
        contacts.len()
    );
    contacts
}

fn cube_face_ray(face: usize, c: Point3<f64>, i: f64, j: f64) -> Ray {
    match face {
        0 => Ray::new(
            Point3::new(c.x - FFAR, c.y + i, c.z + j),
            Vector3::new(RAY_SCALE, 0.0, 0.0),
        ),
        1 => Ray::new(
            Point3::new(c.x + FFAR, c.y + i, c.z + j),
            Vector3::new(-RAY_SCALE, 0.0, 0.0),
        ),
        2 => Ray::new(
            Point3::new(c.x + i, c.y - FFAR, c.z + j),
            Vector3::new(0.0, RAY_SCALE, 0.0),
        ),
        3 => Ray::new(
            Point3::new(c.x + i, c.y + FFAR, c.z + j),
            Vector3::new(0.0, -RAY_SCALE, 0.0),
        ),
        4 => Ray::new(
            Point3::new(c.x + i, c.y + j, c.z - FFAR),
            Vector3::new(0.0, 0.0, RAY_SCALE),
        ),
        _ => Ray::new(
            Point3::new(c.x + i, c.y + j, c.z + FFAR),
            Vector3::new(0.0, 0.0, -RAY_SCALE),
        ),
    }
}

/// Sample the target surface along the triangle centroids of a geodesic
/// sphere around `center`.
///
/// The higher `levels`, the denser the sampling (`20·4^levels` rays).
/// Hits are flipped to point into the body and extruded 1 mm outward.
pub fn deterministic_sample<E: Environment + ?Sized>(
    env: &mut E,
    target: BodyId,
    levels: u32,
    center: Point3<f64>,
) -> Vec<Contact> {
    let mesh = sphere_triangulation(levels);
    let mut contacts = Vec::with_capacity(mesh.triangle_count());

    with_collision_options(
        env,
        CollisionOptions::CONTACTS | CollisionOptions::DISTANCE,
        |env| {
            let mut report = CollisionReport::new();
            for t in 0..mesh.triangle_count() {
                let [a, b, c] = mesh.triangle(t);
                let dir = ((a.coords + b.coords + c.coords) / 3.0).normalize();
                let ray = Ray::new(center - 10.0 * dir, dir * RAY_SCALE);
                if env.cast_ray(&ray, Some(target), &mut report) {
                    if let Some(hit) = report.contacts.first() {
                        let norm = -hit.norm;
                        contacts.push(Contact {
                            pos: hit.pos + EXTRUDE * norm,
                            norm,
                            depth: 0.0,
                        });
                    }
                }
            }
        },
    );

    contacts
}

/// Sample the target surface with `num_samples` rays in uniformly random
/// directions toward `center`.
///
/// Misses are skipped until the requested number of hits is collected.
///
/// # Errors
///
/// Returns [`AnalysisError::SamplingExhausted`] when the ray budget runs
/// out before `num_samples` hits are found.
pub fn random_sample<E, R>(
    env: &mut E,
    target: BodyId,
    num_samples: usize,
    center: Point3<f64>,
    rng: &mut R,
) -> Result<Vec<Contact>, AnalysisError>
where
    E: Environment + ?Sized,
    R: Rng + ?Sized,
{
    let mut contacts = Vec::with_capacity(num_samples);
    let budget = num_samples.saturating_mul(1000).max(1000);

    with_collision_options(
        env,
        CollisionOptions::CONTACTS | CollisionOptions::DISTANCE,
        |env| {
            let mut report = CollisionReport::new();
            for _ in 0..budget {
                if contacts.len() == num_samples {
                    break;
                }
                let dir = uniform_sphere_direction(rng);
                let ray = Ray::new(center - 10.0 * dir, dir * RAY_SCALE);
                if env.cast_ray(&ray, Some(target), &mut report) {
                    if let Some(hit) = report.contacts.first() {
                        contacts.push(Contact {
                            pos: hit.pos + EXTRUDE * hit.norm,
                            norm: hit.norm,
                            depth: 0.0,
                        });
                    }
                }
            }
        },
    );

    if contacts.len() < num_samples {
        return Err(AnalysisError::SamplingExhausted {
            requested: num_samples,
            collected: contacts.len(),
        });
    }
    Ok(contacts)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use grasp_world::testing::{FixtureBody, FixtureWorld};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn unit_sphere_world() -> (FixtureWorld, BodyId) {
        let mut world = FixtureWorld::new();
        let ball = world.add_body(FixtureBody::sphere("ball", Point3::origin(), 0.3));
        (world, ball)
    }

    #[test]
    fn box_sample_hits_lie_on_surface_with_inward_normals() {
        let (mut world, ball) = unit_sphere_world();
        let contacts = box_sample(&mut world, ball, 600, Point3::origin());
        assert!(!contacts.is_empty());
        for c in &contacts {
            assert_relative_eq!(c.pos.coords.norm(), 0.3, epsilon = 1e-9);
            // Flipped normal points back toward the body center.
            assert!(c.norm.dot(&c.pos.coords) < 0.0);
            assert_relative_eq!(c.depth, 0.0);
        }
    }

    #[test]
    fn box_sample_restores_collision_options() {
        let (mut world, ball) = unit_sphere_world();
        use grasp_world::Environment;
        world.set_collision_options(CollisionOptions::NONE);
        let _ = box_sample(&mut world, ball, 60, Point3::origin());
        assert_eq!(world.collision_options(), CollisionOptions::NONE);
    }

    #[test]
    fn deterministic_sample_covers_the_sphere() {
        let (mut world, ball) = unit_sphere_world();
        let contacts = deterministic_sample(&mut world, ball, 1, Point3::origin());
        // All 80 centroid rays hit a sphere centered on the grasp center.
        assert_eq!(contacts.len(), 80);
        for c in &contacts {
            // Extruded 1 mm inward of the ray, i.e. along the flipped normal.
            assert_relative_eq!(c.pos.coords.norm(), 0.3 - EXTRUDE, epsilon = 1e-9);
        }
    }

    #[test]
    fn random_sample_collects_requested_count() {
        let (mut world, ball) = unit_sphere_world();
        let mut rng = StdRng::seed_from_u64(3);
        let contacts = random_sample(&mut world, ball, 50, Point3::origin(), &mut rng).unwrap();
        assert_eq!(contacts.len(), 50);
        for c in &contacts {
            // Unflipped ray normal faces outward; extrusion is outward too.
            assert_relative_eq!(c.pos.coords.norm(), 0.3 + EXTRUDE, epsilon = 1e-9);
            assert!(c.norm.dot(&c.pos.coords) > 0.0);
        }
    }

    #[test]
    fn random_sample_errors_when_target_unhittable() {
        let mut world = FixtureWorld::new();
        let ghost = world.add_body(FixtureBody::new("ghost"));
        let mut rng = StdRng::seed_from_u64(4);
        let result = random_sample(&mut world, ghost, 5, Point3::origin(), &mut rng);
        assert!(matches!(
            result,
            Err(AnalysisError::SamplingExhausted { requested: 5, .. })
        ));
    }
}
