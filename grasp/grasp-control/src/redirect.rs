//! Forwarding controller for mirrored bodies.

use grasp_types::{BodyId, Pose, Trajectory};
use grasp_world::Environment;
use nalgebra::DVector;
use tracing::warn;

use crate::{ControlError, Controller};

/// Redirects all commands to an inner controller and mirrors the inner
/// controller's body onto its own.
///
/// Used when a cloned environment must track a robot driven elsewhere:
/// the clone's body follows the source body's pose and joint values after
/// every forwarded call while auto-sync is enabled.
#[derive(Debug)]
pub struct RedirectController<C> {
    inner: C,
    /// Body driven by the inner controller.
    source: BodyId,
    /// Mirrored body owned by this controller.
    target: BodyId,
    auto_sync: bool,
    sync_done: bool,
}

impl<C: Controller> RedirectController<C> {
    /// Create a redirect from `source` (driven by `inner`) onto `target`.
    #[must_use]
    pub fn new(inner: C, source: BodyId, target: BodyId) -> Self {
        Self {
            inner,
            source,
            target,
            auto_sync: true,
            sync_done: true,
        }
    }

    /// Enable or disable automatic mirroring; enabling syncs immediately
    /// on the next forwarded call.
    pub fn set_auto_sync(&mut self, auto_sync: bool) {
        self.auto_sync = auto_sync;
    }

    /// The wrapped controller.
    #[must_use]
    pub fn inner(&self) -> &C {
        &self.inner
    }

    /// Mirror the source body's state onto the target body.
    pub fn sync<E: Environment + ?Sized>(&mut self, env: &mut E) {
        let pose = env.body_pose(self.source);
        env.set_body_pose(self.target, &pose);
        let dofs = env.dof_values(self.source);
        if let Err(err) = env.set_dof_values(self.target, &dofs) {
            warn!("redirect sync failed for body {}: {err}", self.target);
        }
        self.sync_done = self.inner.is_done();
    }

    fn maybe_sync<E: Environment + ?Sized>(&mut self, env: &mut E) {
        if self.auto_sync {
            self.sync(env);
        }
    }
}

impl<C: Controller> Controller for RedirectController<C> {
    fn set_desired<E: Environment + ?Sized>(
        &mut self,
        env: &mut E,
        values: &DVector<f64>,
        pose: Option<Pose>,
    ) -> Result<(), ControlError> {
        self.inner.set_desired(env, values, pose)?;
        self.maybe_sync(env);
        Ok(())
    }

    fn set_path(&mut self, trajectory: Option<Trajectory>) -> Result<(), ControlError> {
        self.inner.set_path(trajectory)
    }

    fn simulation_step<E: Environment + ?Sized>(&mut self, env: &mut E, dt: f64) {
        self.inner.simulation_step(env, dt);
        self.maybe_sync(env);
    }

    fn is_done(&self) -> bool {
        if self.auto_sync {
            self.sync_done && self.inner.is_done()
        } else {
            self.inner.is_done()
        }
    }

    fn time(&self) -> f64 {
        self.inner.time()
    }

    fn reset(&mut self) {
        // Deliberately leaves the inner controller untouched; it may be
        // shared with the environment that owns it.
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::IdealController;
    use approx::assert_relative_eq;
    use grasp_types::{Pose as GraspPose, TrajectoryPoint};
    use grasp_world::testing::{FixtureBody, FixtureJoint, FixtureLink, FixtureWorld};
    use nalgebra::{dvector, Vector3};

    fn one_dof_body(name: &str) -> FixtureBody {
        FixtureBody::new(name).with_link(FixtureLink {
            offset: GraspPose::identity(),
            joint: Some(FixtureJoint::Slide { axis: Vector3::x() }),
            shape: None,
        })
    }

    #[test]
    fn mirrors_source_onto_target() {
        let mut world = FixtureWorld::new();
        let source = world.add_body(one_dof_body("real"));
        let target = world.add_body(one_dof_body("clone"));

        let inner = IdealController::new(&world, source, vec![0], false);
        let mut redirect = RedirectController::new(inner, source, target);

        redirect
            .set_desired(&mut world, &dvector![0.7], None)
            .unwrap();
        assert_relative_eq!(world.body(source).dofs[0], 0.7);
        assert_relative_eq!(world.body(target).dofs[0], 0.7);
    }

    #[test]
    fn trajectory_playback_is_mirrored() {
        let mut world = FixtureWorld::new();
        let source = world.add_body(one_dof_body("real"));
        let target = world.add_body(one_dof_body("clone"));

        let inner = IdealController::new(&world, source, vec![0], false);
        let mut redirect = RedirectController::new(inner, source, target);

        let traj = Trajectory::new(vec![
            TrajectoryPoint {
                time: 0.0,
                q: dvector![0.0],
                pose: GraspPose::identity(),
            },
            TrajectoryPoint {
                time: 0.5,
                q: dvector![1.0],
                pose: GraspPose::identity(),
            },
        ]);
        redirect.set_path(Some(traj)).unwrap();
        for _ in 0..15 {
            redirect.simulation_step(&mut world, 0.05);
        }
        assert!(redirect.is_done());
        assert_relative_eq!(world.body(target).dofs[0], 1.0, epsilon = 1e-9);
    }

    #[test]
    fn disabled_auto_sync_leaves_target_alone() {
        let mut world = FixtureWorld::new();
        let source = world.add_body(one_dof_body("real"));
        let target = world.add_body(one_dof_body("clone"));

        let inner = IdealController::new(&world, source, vec![0], false);
        let mut redirect = RedirectController::new(inner, source, target);
        redirect.set_auto_sync(false);

        redirect
            .set_desired(&mut world, &dvector![0.7], None)
            .unwrap();
        assert_relative_eq!(world.body(source).dofs[0], 0.7);
        assert_relative_eq!(world.body(target).dofs[0], 0.0);
    }
}
