//! A single fixture between a team and one opponent in one round.

use crate::{
    error::LeagueError,
    id::TeamId,
};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Upper bound on the goals either side may hold in a single fixture.
pub const MAX_GOAL_THRESHOLD: u32 = 8;

/// Result of a fixture from the owning team's perspective.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Win,
    Draw,
    Loss,
}

impl Outcome {
    /// Classify a fixture by the sign of its goal margin.
    pub fn from_goals(player_goals: u32, opponent_goals: u32) -> Self {
        match player_goals.cmp(&opponent_goals) {
            Ordering::Greater => Outcome::Win,
            Ordering::Equal => Outcome::Draw,
            Ordering::Less => Outcome::Loss,
        }
    }

    /// Outcome seen by the other side of the fixture.
    pub fn inverse(&self) -> Self {
        match self {
            Outcome::Win => Outcome::Loss,
            Outcome::Draw => Outcome::Draw,
            Outcome::Loss => Outcome::Win,
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Win => write!(f, "win"),
            Outcome::Draw => write!(f, "draw"),
            Outcome::Loss => write!(f, "loss"),
        }
    }
}

/// One fixture of a team against `opponent`.
///
/// A `Match` is an immutable snapshot: rewriting the team's goals produces a new value via
/// [`Match::with_player_goals`], and `opponent_goals` never changes once recorded.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Deserialize, Serialize)]
pub struct Match {
    pub opponent: TeamId,
    pub player_goals: u32,
    pub opponent_goals: u32,
}

impl Match {
    /// Construct a fixture, rejecting goal counts above [`MAX_GOAL_THRESHOLD`].
    pub fn new(
        opponent: impl Into<TeamId>,
        player_goals: u32,
        opponent_goals: u32,
    ) -> Result<Self, LeagueError> {
        let opponent = opponent.into();
        for goals in [player_goals, opponent_goals] {
            if goals > MAX_GOAL_THRESHOLD {
                return Err(LeagueError::GoalsOutOfRange {
                    opponent,
                    goals,
                    max: MAX_GOAL_THRESHOLD,
                });
            }
        }

        Ok(Self {
            opponent,
            player_goals,
            opponent_goals,
        })
    }

    pub fn outcome(&self) -> Outcome {
        Outcome::from_goals(self.player_goals, self.opponent_goals)
    }

    /// Signed goal difference, positive when the team is ahead.
    pub fn margin(&self) -> i32 {
        self.player_goals as i32 - self.opponent_goals as i32
    }

    /// Most goals that may be removed from this fixture in one reallocation.
    pub fn half_player_goals(&self) -> u32 {
        self.player_goals / 2
    }

    /// Goals the team must add to win: the margin plus one for a loss, one for a draw.
    pub fn goals_to_win(&self) -> u32 {
        (self.opponent_goals + 1).saturating_sub(self.player_goals)
    }

    pub fn is_win(&self) -> bool {
        self.player_goals > self.opponent_goals
    }

    pub fn is_draw(&self) -> bool {
        self.player_goals == self.opponent_goals
    }

    pub fn is_loss(&self) -> bool {
        self.player_goals < self.opponent_goals
    }

    /// Same fixture with the team's goals replaced. Opponent goals are carried unchanged.
    pub fn with_player_goals(&self, player_goals: u32) -> Self {
        Self {
            player_goals,
            ..*self
        }
    }

    /// The same fixture seen by the opponent, whose own opponent is `team`.
    pub fn mirrored(&self, team: TeamId) -> Self {
        Self {
            opponent: team,
            player_goals: self.opponent_goals,
            opponent_goals: self.player_goals,
        }
    }
}

impl std::fmt::Display for Match {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "vs {}: {}-{}",
            self.opponent, self.player_goals, self.opponent_goals
        )
    }
}
