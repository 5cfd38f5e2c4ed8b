//! Error type for analysis operations.

use grasp_hull::HullError;
use thiserror::Error;

/// Errors reported by the analysis layer.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Friction coefficient outside the valid range.
    #[error("friction coefficient must be positive, got {0}")]
    InvalidFriction(f64),

    /// Not enough contact wrenches for 3-D force closure.
    #[error("need at least 7 contact wrenches to have force closure in 3D, got {got}")]
    TooFewWrenches {
        /// Number of wrenches available.
        got: usize,
    },

    /// The wrench hull computation failed.
    #[error(transparent)]
    Hull(#[from] HullError),

    /// Random surface sampling ran out of attempts before collecting the
    /// requested number of hits.
    #[error("surface sampling exhausted its ray budget: {collected}/{requested} hits")]
    SamplingExhausted {
        /// Requested number of samples.
        requested: usize,
        /// Hits collected before giving up.
        collected: usize,
    },
}
