//! The ideal (exact-position) controller.

use grasp_types::{BodyId, Pose, Trajectory};
use grasp_world::Environment;
use nalgebra::DVector;
use tracing::{debug, warn};

use crate::{ControlError, Controller};

/// Slack beyond a joint limit before a violation warning is emitted.
const LIMIT_SLACK: f64 = 5e-5;

/// Forces exact robot positions along a trajectory or at a setpoint.
///
/// The controller owns its DOF index set and whether it also drives the
/// base transform. Joint limits are cached and refreshed through the
/// environment's limit revision counter, so the environment never holds a
/// reference back to the controller.
#[derive(Debug)]
pub struct IdealController {
    robot: BodyId,
    dof_indices: Vec<usize>,
    control_transformation: bool,
    speed: f64,
    time: f64,
    paused: bool,
    done: bool,
    trajectory: Option<Trajectory>,
    desired: Option<DVector<f64>>,
    desired_pose: Option<Pose>,
    lower: DVector<f64>,
    upper: DVector<f64>,
    limits_revision: u64,
}

impl IdealController {
    /// Create a controller for `robot` driving `dof_indices`; when
    /// `control_transformation` is set it also drives the base pose.
    #[must_use]
    pub fn new<E: Environment + ?Sized>(
        env: &E,
        robot: BodyId,
        dof_indices: Vec<usize>,
        control_transformation: bool,
    ) -> Self {
        let (lower, upper) = env.dof_limits(robot);
        Self {
            robot,
            dof_indices,
            control_transformation,
            speed: 1.0,
            time: 0.0,
            paused: false,
            done: true,
            trajectory: None,
            desired: None,
            desired_pose: None,
            lower,
            upper,
            limits_revision: env.limits_revision(robot),
        }
    }

    /// The controlled DOF indices.
    #[must_use]
    pub fn dof_indices(&self) -> &[usize] {
        &self.dof_indices
    }

    /// Whether the controller drives the base transform.
    #[must_use]
    pub fn controls_transformation(&self) -> bool {
        self.control_transformation
    }

    /// Pause or resume the controller.
    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    /// Playback speed multiplier.
    pub fn set_speed(&mut self, speed: f64) {
        self.speed = speed;
    }

    fn refresh_limits<E: Environment + ?Sized>(&mut self, env: &E) {
        let revision = env.limits_revision(self.robot);
        if revision != self.limits_revision {
            let (lower, upper) = env.dof_limits(self.robot);
            self.lower = lower;
            self.upper = upper;
            self.limits_revision = revision;
        }
    }

    /// Overwrite the controlled DOFs (zeroing their velocities) and
    /// optionally the base pose, warning on joint-limit violations.
    fn set_dof_values<E: Environment + ?Sized>(
        &mut self,
        env: &mut E,
        values: &DVector<f64>,
        pose: Option<&Pose>,
    ) -> Result<(), ControlError> {
        self.refresh_limits(env);

        let mut current = env.dof_values(self.robot);
        let mut velocities = env.dof_velocities(self.robot);
        for (i, &index) in self.dof_indices.iter().enumerate() {
            current[index] = values[i];
            velocities[index] = 0.0;
        }

        for i in 0..current.len().min(self.lower.len()) {
            if current[i] < self.lower[i] - LIMIT_SLACK {
                warn!(
                    "robot {} dof {i} violates lower limit: {} < {}",
                    self.robot, current[i], self.lower[i]
                );
            }
            if current[i] > self.upper[i] + LIMIT_SLACK {
                warn!(
                    "robot {} dof {i} violates upper limit: {} > {}",
                    self.robot, current[i], self.upper[i]
                );
            }
        }

        if let Some(pose) = pose {
            env.set_body_pose(self.robot, pose);
        }
        env.set_dof_values(self.robot, &current)?;
        env.set_dof_velocities(self.robot, &velocities)?;
        Ok(())
    }
}

impl Controller for IdealController {
    fn set_desired<E: Environment + ?Sized>(
        &mut self,
        env: &mut E,
        values: &DVector<f64>,
        pose: Option<Pose>,
    ) -> Result<(), ControlError> {
        if values.len() != self.dof_indices.len() {
            return Err(ControlError::DofMismatch {
                expected: self.dof_indices.len(),
                got: values.len(),
            });
        }
        self.time = 0.0;
        self.trajectory = None;
        if !self.paused {
            let pose = if self.control_transformation {
                Some(pose.unwrap_or_else(|| env.body_pose(self.robot)))
            } else {
                None
            };
            self.desired = Some(values.clone());
            self.desired_pose = pose;
            self.set_dof_values(env, values, pose.as_ref())?;
            // Completion is reported by the next simulation step, the
            // same way trajectories complete.
            self.done = false;
        }
        Ok(())
    }

    fn set_path(&mut self, trajectory: Option<Trajectory>) -> Result<(), ControlError> {
        if self.paused {
            debug!("ideal controller cannot play trajectories when paused");
            self.trajectory = None;
            self.done = true;
            return Err(ControlError::Paused);
        }
        if let Some(traj) = &trajectory {
            if traj.dof() != self.dof_indices.len() {
                return Err(ControlError::DofMismatch {
                    expected: self.dof_indices.len(),
                    got: traj.dof(),
                });
            }
        }
        self.done = trajectory.is_none();
        self.trajectory = trajectory;
        self.time = 0.0;
        self.desired = None;
        self.desired_pose = None;
        Ok(())
    }

    fn simulation_step<E: Environment + ?Sized>(&mut self, env: &mut E, dt: f64) {
        if self.paused {
            return;
        }

        if let Some(traj) = self.trajectory.clone() {
            if let Some(point) = traj.sample(self.time) {
                let pose = self.control_transformation.then_some(point.pose);
                if let Err(err) = self.set_dof_values(env, &point.q, pose.as_ref()) {
                    warn!("trajectory step rejected: {err}");
                }
            }
            if self.time > traj.duration() {
                self.time = traj.duration();
                self.done = true;
            }
            self.time += self.speed * dt;
        }

        if let Some(desired) = self.desired.clone() {
            let pose = self.desired_pose;
            if let Err(err) = self.set_dof_values(env, &desired, pose.as_ref()) {
                warn!("setpoint step rejected: {err}");
            }
            self.done = true;
        }
    }

    fn is_done(&self) -> bool {
        self.done
    }

    fn time(&self) -> f64 {
        self.time
    }

    fn reset(&mut self) {
        self.trajectory = None;
        self.desired = None;
        self.desired_pose = None;
        self.time = 0.0;
        self.done = true;
    }
}
