//! Error type for controller operations.

use grasp_world::WorldError;
use thiserror::Error;

/// Errors reported by controllers.
#[derive(Debug, Error)]
pub enum ControlError {
    /// A command's DOF width does not match the controlled indices.
    #[error("wrong desired dimensions {got} != {expected}")]
    DofMismatch {
        /// Number of controlled DOF indices.
        expected: usize,
        /// Width of the supplied command.
        got: usize,
    },

    /// Trajectory commands are rejected while paused.
    #[error("controller cannot play trajectories while paused")]
    Paused,

    /// The environment rejected a state write.
    #[error(transparent)]
    World(#[from] WorldError),
}
