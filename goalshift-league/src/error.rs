use crate::id::{Round, TeamId};
use thiserror::Error;

/// Errors raised while constructing or extending league data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LeagueError {
    #[error("goal count {goals} against team {opponent} exceeds the maximum of {max}")]
    GoalsOutOfRange { opponent: TeamId, goals: u32, max: u32 },

    #[error("duplicate fixture against team {0} in match set")]
    DuplicateOpponent(TeamId),

    #[error("no fixture against team {0} in match set")]
    UnknownOpponent(TeamId),

    #[error("history expected round {expected} but received round {received}")]
    RoundOutOfOrder { expected: Round, received: Round },

    #[error("no average rank recorded for team {team} in round {round}")]
    MissingRank { team: TeamId, round: Round },
}
