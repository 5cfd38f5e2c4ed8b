//! Stable-contact filtering under a finger-closing motion.

use grasp_types::{BodyId, Contact, TaggedContact};
use grasp_world::{
    with_collision_options, CollisionOptions, CollisionReport, RobotEnvironment,
};
use nalgebra::{DVector, Vector3};
use tracing::{debug, error, warn};

use crate::AnalysisError;

/// Threshold below which a Jacobian-propagated closing velocity is treated
/// as degenerate.
const MIN_CLOSING_SPEED_SQ: f64 = 1e-7;

/// Collect the robot's environment contacts that are *stable* under the
/// manipulators' closing motion and Coulomb friction `mu`.
///
/// For every contact on every link, the closing joint pattern is pushed
/// through the link's translational Jacobian to get the contact-point
/// closing velocity; the contact is kept when that velocity lies inside
/// the friction cone of half-angle `arctan(mu)` around the contact normal
/// (oriented away from the link). Base links, the active manipulator's
/// base, and links with no induced motion fall back to the supplied
/// world-frame `direction`.
///
/// Returns an empty set (with an error log) when the robot is not in
/// contact at all.
///
/// # Errors
///
/// Returns [`AnalysisError::InvalidFriction`] when `mu` is not positive.
pub fn stable_contacts<E: RobotEnvironment + ?Sized>(
    env: &mut E,
    robot: BodyId,
    direction: &Vector3<f64>,
    mu: f64,
) -> Result<Vec<TaggedContact>, AnalysisError> {
    if mu <= 0.0 {
        return Err(AnalysisError::InvalidFriction(mu));
    }
    debug!("collecting stable contacts for robot {robot}, mu {mu}");

    let mut report = CollisionReport::new();
    if !env.check_body_collision(robot, &mut report) {
        error!("robot {robot} is not colliding with the target");
        return Ok(Vec::new());
    }

    // Per-DOF closing pattern: each manipulator writes its closing
    // direction into its gripper joint slots.
    let dof = env.dof_values(robot).len();
    let mut closing = DVector::zeros(dof);
    for manip in env.manipulators(robot) {
        for (&gripper, &dir) in manip.gripper_indices.iter().zip(&manip.closing_direction) {
            closing[gripper] = dir;
        }
    }

    let manip_base = env.active_manipulator(robot).map(|m| m.base_link);
    let mut contacts = Vec::new();

    with_collision_options(env, CollisionOptions::CONTACTS, |env| {
        for link in 0..env.link_count(robot) {
            if !env.check_link_collision(robot, link, None, &mut report) {
                continue;
            }
            for reported in report.contacts.clone() {
                // Orient the normal away from the link, into the object.
                let norm = if report.query_is_first {
                    reported.norm
                } else {
                    -reported.norm
                };

                let mut delta = if link == 0 || Some(link) == manip_base {
                    *direction
                } else {
                    let jac = env.jacobian_position(robot, link, &reported.pos);
                    let v = &jac * &closing;
                    Vector3::new(v[0], v[1], v[2])
                };

                if delta.norm_squared() < MIN_CLOSING_SPEED_SQ {
                    warn!("degenerate closing motion at link {link}, using approach direction");
                    delta = *direction;
                }
                let delta = delta.normalize();

                // Inside the Coulomb cone: angle to the closing motion
                // under arctan(mu), on the closing side.
                let cos = norm.dot(&delta);
                let sin_sq = norm.cross(&delta).norm_squared();
                if cos > 0.0 && sin_sq <= cos * cos * mu * mu {
                    contacts.push(TaggedContact {
                        contact: Contact {
                            pos: reported.pos,
                            norm,
                            depth: reported.depth,
                        },
                        link,
                    });
                }
            }
        }
    });

    debug!("{} stable contacts", contacts.len());
    Ok(contacts)
}
