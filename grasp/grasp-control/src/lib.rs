//! Pure-kinematic controllers.
//!
//! [`IdealController`] forces exact robot positions along a trajectory or
//! at a setpoint, for planning and non-physics simulation. It is the
//! follower the grasp planner produces trajectories against: the planner
//! emits a time-parameterized path over the controlled DOF indices, and
//! the simulation loop ticks the controller until it reports done.
//! [`RedirectController`] forwards to another controller and mirrors the
//! controlled body, so cloned environments can share one real follower.

#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]
#![allow(clippy::missing_const_for_fn)]

mod error;
mod ideal;
mod redirect;

pub use error::ControlError;
pub use ideal::IdealController;
pub use redirect::RedirectController;

use grasp_types::{Pose, Trajectory};
use grasp_world::Environment;
use nalgebra::DVector;

/// A kinematic controller driving a subset of a body's DOFs.
pub trait Controller {
    /// Command a desired DOF setpoint, optionally with a base pose when
    /// the controller owns the base transform.
    ///
    /// # Errors
    ///
    /// Returns an error when the value count does not match the
    /// controlled DOF indices.
    fn set_desired<E: Environment + ?Sized>(
        &mut self,
        env: &mut E,
        values: &DVector<f64>,
        pose: Option<Pose>,
    ) -> Result<(), ControlError>;

    /// Command a trajectory to follow; `None` clears it.
    ///
    /// # Errors
    ///
    /// Returns an error when paused or when the trajectory DOF width does
    /// not match the controlled indices.
    fn set_path(&mut self, trajectory: Option<Trajectory>) -> Result<(), ControlError>;

    /// Advance the controller by `dt` seconds of simulation time.
    fn simulation_step<E: Environment + ?Sized>(&mut self, env: &mut E, dt: f64);

    /// Whether the current command has completed.
    fn is_done(&self) -> bool;

    /// Time along the current command, seconds.
    fn time(&self) -> f64;

    /// Drop any trajectory and setpoint.
    fn reset(&mut self);
}
