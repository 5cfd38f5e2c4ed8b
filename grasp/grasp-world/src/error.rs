//! Error type for environment and planner operations.

use thiserror::Error;

/// Errors reported by environment and planner implementations.
#[derive(Debug, Error)]
pub enum WorldError {
    /// A body id did not resolve to a body.
    #[error("unknown body id {0}")]
    UnknownBody(usize),

    /// A DOF vector had the wrong width.
    #[error("wrong DOF vector width {got}, body has {expected}")]
    DofMismatch {
        /// DOF count of the body.
        expected: usize,
        /// Width of the supplied vector.
        got: usize,
    },

    /// The requested collision checker is not available.
    #[error("unknown collision checker {0:?}")]
    UnknownChecker(String),

    /// The planner could not initialize a plan.
    #[error("planner initialization failed: {0}")]
    PlanInit(String),

    /// The planner failed to produce a path.
    #[error("planning failed: {0}")]
    PlanPath(String),
}
