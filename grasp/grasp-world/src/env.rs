//! Environment and robot query traits.

use grasp_types::{BodyId, LinkIndex, Pose, Ray, Trajectory};
use nalgebra::{DMatrix, DVector, Point3};

use crate::{CollisionOptions, CollisionReport, WorldError};

/// A manipulator attached to a robot: its base link, the links of its
/// end-effector, and the gripper joints with their closing pattern.
#[derive(Debug, Clone, PartialEq)]
pub struct Manipulator {
    /// Link the manipulator chain is rooted at.
    pub base_link: LinkIndex,
    /// End-effector links, used for direct contact collection.
    pub child_links: Vec<LinkIndex>,
    /// Robot DOF indices of the gripper joints, in manipulator order.
    pub gripper_indices: Vec<usize>,
    /// Signed per-joint closing velocity pattern, parallel to
    /// `gripper_indices`.
    pub closing_direction: Vec<f64>,
}

/// Kinematic environment: bodies, their state, and collision/ray queries.
///
/// Implementations are single-threaded per environment; callers serialize
/// command execution by holding exclusive access for the duration of a
/// request.
pub trait Environment {
    /// Resolve a body by name.
    fn body_id(&self, name: &str) -> Option<BodyId>;
    /// Number of bodies in the environment.
    fn body_count(&self) -> usize;

    /// Whether the body participates in collision queries.
    fn body_enabled(&self, body: BodyId) -> bool;
    /// Enable or disable a body for collision queries.
    fn set_body_enabled(&mut self, body: BodyId, enabled: bool);
    /// Base pose of a body.
    fn body_pose(&self, body: BodyId) -> Pose;
    /// Set the base pose of a body.
    fn set_body_pose(&mut self, body: BodyId, pose: &Pose);

    /// Joint values of a body.
    fn dof_values(&self, body: BodyId) -> DVector<f64>;
    /// Set the joint values of a body.
    fn set_dof_values(&mut self, body: BodyId, values: &DVector<f64>) -> Result<(), WorldError>;
    /// Joint velocities of a body.
    fn dof_velocities(&self, body: BodyId) -> DVector<f64>;
    /// Set the joint velocities of a body.
    fn set_dof_velocities(
        &mut self,
        body: BodyId,
        velocities: &DVector<f64>,
    ) -> Result<(), WorldError>;
    /// Lower and upper joint limits of a body.
    fn dof_limits(&self, body: BodyId) -> (DVector<f64>, DVector<f64>);
    /// Monotonic counter bumped whenever the body's joint limits change.
    ///
    /// Controllers cache limits and refresh when the counter moves; the
    /// environment holds no reference back to them.
    fn limits_revision(&self, body: BodyId) -> u64;
    /// Number of links of a body.
    fn link_count(&self, body: BodyId) -> usize;

    /// Current collision-checker option mask.
    fn collision_options(&self) -> CollisionOptions;
    /// Replace the collision-checker option mask.
    fn set_collision_options(&mut self, options: CollisionOptions);
    /// Name of the active collision checker.
    fn collision_checker(&self) -> String;
    /// Switch the active collision checker.
    fn set_collision_checker(&mut self, name: &str) -> Result<(), WorldError>;

    /// Check a whole body against the rest of the environment.
    fn check_body_collision(&self, body: BodyId, report: &mut CollisionReport) -> bool;
    /// Check one link against the environment, or against `target` only.
    fn check_link_collision(
        &self,
        body: BodyId,
        link: LinkIndex,
        target: Option<BodyId>,
        report: &mut CollisionReport,
    ) -> bool;
    /// Cast a ray against the environment, or against `target` only.
    /// The ray direction's magnitude is the maximum query distance.
    fn cast_ray(&self, ray: &Ray, target: Option<BodyId>, report: &mut CollisionReport) -> bool;
}

/// Robot-specific queries layered over [`Environment`].
pub trait RobotEnvironment: Environment {
    /// Number of active DOFs of the robot.
    fn active_dof_count(&self, robot: BodyId) -> usize;
    /// Active-DOF values of the robot.
    fn active_dof_values(&self, robot: BodyId) -> DVector<f64>;
    /// Set the active-DOF values of the robot.
    fn set_active_dof_values(
        &mut self,
        robot: BodyId,
        values: &DVector<f64>,
    ) -> Result<(), WorldError>;

    /// All manipulators of the robot.
    fn manipulators(&self, robot: BodyId) -> Vec<Manipulator>;
    /// The robot's active manipulator, if one is selected.
    fn active_manipulator(&self, robot: BodyId) -> Option<Manipulator>;

    /// Translational Jacobian (3×DOF, row-major semantics) of a world-frame
    /// point rigidly attached to `link`.
    fn jacobian_position(
        &self,
        robot: BodyId,
        link: LinkIndex,
        point: &Point3<f64>,
    ) -> DMatrix<f64>;

    /// Hand a trajectory to the robot's motion sink for execution.
    fn set_motion(&mut self, robot: BodyId, trajectory: &Trajectory);
}

/// Run `f` with the collision options replaced by `options`, restoring the
/// prior mask on every exit path.
pub fn with_collision_options<E, T>(
    env: &mut E,
    options: CollisionOptions,
    f: impl FnOnce(&mut E) -> T,
) -> T
where
    E: Environment + ?Sized,
{
    let prior = env.collision_options();
    env.set_collision_options(options);
    let out = f(env);
    env.set_collision_options(prior);
    out
}
