//! Error type for hull computation.

use thiserror::Error;

/// Errors reported by the convex-hull service.
#[derive(Debug, Error)]
pub enum HullError {
    /// Hull dimension outside the supported 2..=6 range.
    #[error("unsupported hull dimension {0} (supported: 2..=6)")]
    UnsupportedDimension(usize),

    /// The flat point array length is not a multiple of the dimension.
    #[error("point array length {len} is not a multiple of dimension {dim}")]
    LengthMismatch {
        /// Length of the flat point array.
        len: usize,
        /// Requested dimension.
        dim: usize,
    },

    /// Fewer points than a d-simplex requires.
    #[error("need at least {needed} points for a {dim}-dimensional hull, got {got}")]
    TooFewPoints {
        /// Minimum point count (`dim + 1`).
        needed: usize,
        /// Requested dimension.
        dim: usize,
        /// Supplied point count.
        got: usize,
    },

    /// The point set does not span the full dimension.
    #[error("degenerate input: points do not span {0} dimensions")]
    Degenerate(usize),

    /// Face triangulation requested for a non-3-dimensional hull.
    #[error("cannot triangulate convex hulls of dimension {0}")]
    TriangulationDimension(usize),
}
