//! 3-D force-closure analysis over the 6-dimensional wrench hull.

use std::f64::consts::TAU;

use grasp_geometry::contact_frame;
use grasp_hull::convex_hull;
use grasp_types::{Contact, GraspAnalysis};
use tracing::debug;

use crate::AnalysisError;

/// Offsets this close to zero mean the origin sits on a hull facet.
const ORIGIN_EPS: f64 = 1e-15;

/// Analyze a contact set for 3-D force closure.
///
/// With `mu > 0` each contact is replaced by `cone_points` contacts whose
/// normals discretize its Coulomb friction cone. Every contact then
/// contributes the unit wrench `(f; pos × f)` with `f = norm`, and the
/// convex hull of the wrench cloud is computed in 6 dimensions. Closure
/// holds exactly when the origin is strictly interior: the returned
/// `mindist` is then the distance from the origin to the nearest facet,
/// otherwise 0.
///
/// # Errors
///
/// Returns [`AnalysisError::TooFewWrenches`] for fewer than 7 wrenches
/// (the minimum for 3-D force closure) and propagates hull failures,
/// including degenerate wrench clouds that span fewer than 6 dimensions.
pub fn analyze_contacts_3d(
    contacts: &[Contact],
    mu: f64,
    cone_points: usize,
) -> Result<GraspAnalysis, AnalysisError> {
    let cone: Vec<Contact>;
    let effective = if mu == 0.0 {
        contacts
    } else {
        cone = discretize_cones(contacts, mu, cone_points);
        &cone
    };

    if effective.len() < 7 {
        return Err(AnalysisError::TooFewWrenches {
            got: effective.len(),
        });
    }

    let mut wrenches = Vec::with_capacity(effective.len() * 6);
    for c in effective {
        let torque = c.pos.coords.cross(&c.norm);
        wrenches.extend_from_slice(&[
            c.norm.x, c.norm.y, c.norm.z, torque.x, torque.y, torque.z,
        ]);
    }

    let hull = convex_hull(&wrenches, 6)?;
    debug!(
        "wrench hull: {} faces, volume {}",
        hull.faces.len(),
        hull.volume
    );

    // The origin evaluates every facet plane to its offset. With outward
    // normals, strict interiority means every offset is negative.
    let mut mindist = f64::INFINITY;
    for face in &hull.faces {
        if face.offset > 0.0 || face.offset.abs() < ORIGIN_EPS {
            return Ok(GraspAnalysis {
                mindist: 0.0,
                volume: hull.volume,
            });
        }
        mindist = mindist.min(-face.offset);
    }

    Ok(GraspAnalysis {
        mindist,
        volume: hull.volume,
    })
}

/// Replace each contact with `cone_points` contacts whose normals sweep
/// its friction cone.
fn discretize_cones(contacts: &[Contact], mu: f64, cone_points: usize) -> Vec<Contact> {
    let mut out = Vec::with_capacity(contacts.len() * cone_points);
    for c in contacts {
        let (right, up) = contact_frame(&c.norm);
        for k in 0..cone_points {
            let phi = TAU * (k as f64) / (cone_points as f64);
            let norm = (c.norm + mu * phi.sin() * right + mu * phi.cos() * up).normalize();
            out.push(Contact {
                pos: c.pos,
                norm,
                depth: 0.0,
            });
        }
    }
    out
}
