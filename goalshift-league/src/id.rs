//! Identifier newtypes shared across the league.

use derive_more::{Constructor, Display, From};
use serde::{Deserialize, Serialize};

/// Stable identity of a team, unique within a league and constant across rounds.
#[derive(
    Copy,
    Clone,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Hash,
    Debug,
    Display,
    From,
    Constructor,
    Deserialize,
    Serialize,
)]
#[serde(transparent)]
pub struct TeamId(pub u32);

/// 1-indexed round number.
#[derive(
    Copy,
    Clone,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Hash,
    Debug,
    Display,
    From,
    Constructor,
    Deserialize,
    Serialize,
)]
#[serde(transparent)]
pub struct Round(pub u32);

impl Round {
    /// The opening round of a league.
    pub const FIRST: Round = Round(1);

    /// Whether this is the opening round, where no prior observations exist.
    pub fn is_first(&self) -> bool {
        self.0 <= 1
    }

    /// The round before this one, if any.
    pub fn previous(&self) -> Option<Round> {
        (self.0 > 1).then(|| Round(self.0 - 1))
    }

    /// The round after this one.
    pub fn next(&self) -> Round {
        Round(self.0 + 1)
    }
}

impl Default for Round {
    fn default() -> Self {
        Self::FIRST
    }
}
