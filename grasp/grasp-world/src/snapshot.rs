//! Body state snapshots.

use grasp_types::{BodyId, Pose};
use nalgebra::DVector;
use tracing::warn;

use crate::Environment;

/// A captured body state: pose, joint values, and enable flag.
///
/// Commands capture the robot and target at entry and restore on every
/// exit path, so no request leaves the environment mutated. Restoring the
/// same snapshot more than once is harmless.
#[derive(Debug, Clone)]
pub struct BodySnapshot {
    body: BodyId,
    pose: Pose,
    dofs: DVector<f64>,
    enabled: bool,
}

impl BodySnapshot {
    /// Capture the current state of `body`.
    #[must_use]
    pub fn capture<E: Environment + ?Sized>(env: &E, body: BodyId) -> Self {
        Self {
            body,
            pose: env.body_pose(body),
            dofs: env.dof_values(body),
            enabled: env.body_enabled(body),
        }
    }

    /// Restore the captured state.
    pub fn restore<E: Environment + ?Sized>(&self, env: &mut E) {
        env.set_body_pose(self.body, &self.pose);
        if let Err(err) = env.set_dof_values(self.body, &self.dofs) {
            warn!("failed to restore DOF values of body {}: {err}", self.body);
        }
        env.set_body_enabled(self.body, self.enabled);
    }
}
