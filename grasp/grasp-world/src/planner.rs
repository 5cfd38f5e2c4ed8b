//! Planner seam.

use grasp_types::{BodyId, GraspParameters, Trajectory};

use crate::{RobotEnvironment, WorldError};

/// The external grasp planner, consumed as a black box.
///
/// The orchestrator calls [`Planner::init_plan`] with the assembled
/// parameters and then [`Planner::plan_path`] to obtain the finger-closing
/// trajectory. Both run while the caller holds exclusive environment
/// access.
pub trait Planner<E: RobotEnvironment + ?Sized> {
    /// Initialize a plan for `robot` with the given parameters.
    fn init_plan(
        &mut self,
        env: &mut E,
        robot: BodyId,
        params: &GraspParameters,
    ) -> Result<(), WorldError>;

    /// Produce the planned trajectory.
    fn plan_path(&mut self, env: &mut E, robot: BodyId) -> Result<Trajectory, WorldError>;
}
