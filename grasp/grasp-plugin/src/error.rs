//! Error type for command execution.

use grasp_analysis::AnalysisError;
use grasp_hull::HullError;
use grasp_world::WorldError;
use thiserror::Error;

/// Errors reported by the command surface.
#[derive(Debug, Error)]
pub enum CommandError {
    /// An unrecognized keyword in the command stream.
    #[error("unrecognized command keyword {0:?}")]
    UnknownKeyword(String),

    /// A keyword was not followed by its argument.
    #[error("missing argument for keyword {keyword:?}")]
    MissingArgument {
        /// The keyword whose argument is missing.
        keyword: String,
    },

    /// A keyword argument failed to parse.
    #[error("invalid argument {value:?} for keyword {keyword:?}")]
    InvalidArgument {
        /// The keyword being parsed.
        keyword: String,
        /// The offending token.
        value: String,
    },

    /// A command that requires a target body was given none.
    #[error("no target body specified")]
    MissingTarget,

    /// The planner returned an empty trajectory.
    #[error("planner returned an empty trajectory")]
    EmptyPlan,

    /// The environment lock was poisoned by a panicking holder.
    #[error("environment lock poisoned")]
    EnvironmentPoisoned,

    /// Environment or planner failure.
    #[error(transparent)]
    World(#[from] WorldError),

    /// Hull computation failure.
    #[error(transparent)]
    Hull(#[from] HullError),

    /// Analysis failure.
    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    /// Trajectory file output failure.
    #[error("failed to write trajectory: {0}")]
    Io(#[from] std::io::Error),

    /// Output stream failure.
    #[error(transparent)]
    Format(#[from] std::fmt::Error),
}
