//! A team's fixtures for one round.

use crate::{
    error::LeagueError,
    fixture::{Match, Outcome},
    id::TeamId,
};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Ordered collection of a team's [`Match`]es for one round, one per opponent.
///
/// Insertion order is preserved and is the order every consumer iterates in.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(try_from = "Vec<Match>", into = "Vec<Match>")]
pub struct MatchSet {
    matches: IndexMap<TeamId, Match>,
}

impl MatchSet {
    /// Build a match set, rejecting a second fixture against the same opponent.
    pub fn new(matches: impl IntoIterator<Item = Match>) -> Result<Self, LeagueError> {
        let mut indexed = IndexMap::new();
        for fixture in matches {
            if indexed.insert(fixture.opponent, fixture).is_some() {
                return Err(LeagueError::DuplicateOpponent(fixture.opponent));
            }
        }
        Ok(Self { matches: indexed })
    }

    /// Build a match set from `(opponent, player_goals, opponent_goals)` triples.
    pub fn from_scores(
        scores: impl IntoIterator<Item = (u32, u32, u32)>,
    ) -> Result<Self, LeagueError> {
        let matches = scores
            .into_iter()
            .map(|(opponent, player, against)| Match::new(opponent, player, against))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(matches)
    }

    pub fn get(&self, opponent: &TeamId) -> Option<&Match> {
        self.matches.get(opponent)
    }

    pub fn contains(&self, opponent: &TeamId) -> bool {
        self.matches.contains_key(opponent)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Match> {
        self.matches.values()
    }

    pub fn opponents(&self) -> impl Iterator<Item = &TeamId> {
        self.matches.keys()
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    /// Sum of the team's own goals across every fixture.
    pub fn total_player_goals(&self) -> u32 {
        self.iter().map(|fixture| fixture.player_goals).sum()
    }

    /// Split fixtures into wins, draws and losses, preserving order within each bucket.
    pub fn partition(&self) -> Partition {
        let mut partition = Partition::default();
        for fixture in self.iter() {
            match fixture.outcome() {
                Outcome::Win => partition.wins.push(*fixture),
                Outcome::Draw => partition.draws.push(*fixture),
                Outcome::Loss => partition.losses.push(*fixture),
            }
        }
        partition
    }

    /// New match set with the team's goals against `opponent` replaced.
    pub fn with_player_goals(&self, opponent: TeamId, goals: u32) -> Result<Self, LeagueError> {
        let fixture = self
            .get(&opponent)
            .ok_or(LeagueError::UnknownOpponent(opponent))?;

        let mut matches = self.matches.clone();
        matches.insert(opponent, fixture.with_player_goals(goals));
        Ok(Self { matches })
    }
}

impl TryFrom<Vec<Match>> for MatchSet {
    type Error = LeagueError;

    fn try_from(matches: Vec<Match>) -> Result<Self, Self::Error> {
        Self::new(matches)
    }
}

impl From<MatchSet> for Vec<Match> {
    fn from(set: MatchSet) -> Self {
        set.matches.into_values().collect()
    }
}

impl<'a> IntoIterator for &'a MatchSet {
    type Item = &'a Match;
    type IntoIter = indexmap::map::Values<'a, TeamId, Match>;

    fn into_iter(self) -> Self::IntoIter {
        self.matches.values()
    }
}

/// Fixtures of a [`MatchSet`] grouped by [`Outcome`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Partition {
    pub wins: Vec<Match>,
    pub draws: Vec<Match>,
    pub losses: Vec<Match>,
}

impl Partition {
    pub fn bucket(&self, outcome: Outcome) -> &[Match] {
        match outcome {
            Outcome::Win => &self.wins,
            Outcome::Draw => &self.draws,
            Outcome::Loss => &self.losses,
        }
    }
}
