use crate::validator::ConstraintViolation;
use goalshift_league::{LeagueError, Round, TeamId};
use thiserror::Error;

/// Raised by a [`PriorityPolicy`](crate::policy::PriorityPolicy) that cannot rank a target.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    #[error("round {round}: {available} finalised rounds available, {required} required")]
    InsufficientHistory {
        round: Round,
        available: usize,
        required: usize,
    },

    #[error("no average rank recorded for team {0}")]
    MissingRank(TeamId),
}

/// Why a reallocation left the original match set in place.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FallbackReason {
    #[error("no surplus goals to reallocate")]
    EmptyPool,

    #[error("reallocation changed no fixture")]
    NoImprovement,

    #[error("candidate rejected: {0}")]
    Violation(#[from] ConstraintViolation),

    #[error("priority policy failed: {0}")]
    Policy(#[from] PolicyError),

    #[error("inconsistent match data: {0}")]
    League(#[from] LeagueError),
}
