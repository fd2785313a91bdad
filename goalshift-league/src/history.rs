//! Append-only record of every finalised round.

use crate::{
    error::LeagueError,
    match_set::MatchSet,
    ranking::RankingTable,
    id::{Round, TeamId},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Each team's own [`MatchSet`] for a round, keyed by team.
pub type OpponentMatchSets = BTreeMap<TeamId, MatchSet>;

/// Snapshot of one finalised round: every team's published matches and the average
/// rank table computed by the round driver afterwards.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct RoundRecord {
    pub round: Round,
    pub match_sets: BTreeMap<TeamId, MatchSet>,
    pub average_ranks: RankingTable,
}

impl RoundRecord {
    pub fn new(
        round: Round,
        match_sets: BTreeMap<TeamId, MatchSet>,
        average_ranks: BTreeMap<TeamId, f64>,
    ) -> Self {
        Self {
            round,
            match_sets,
            average_ranks: RankingTable::new(average_ranks),
        }
    }
}

/// Cumulative league history, owned by the round driver.
///
/// Rounds can only be appended in order; strategies receive it by shared reference.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct History {
    rounds: Vec<RoundRecord>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the next finalised round.
    pub fn push(&mut self, record: RoundRecord) -> Result<(), LeagueError> {
        let expected = Round(self.rounds.len() as u32 + 1);
        if record.round != expected {
            return Err(LeagueError::RoundOutOfOrder {
                expected,
                received: record.round,
            });
        }
        self.rounds.push(record);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.rounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rounds.is_empty()
    }

    pub fn latest(&self) -> Option<&RoundRecord> {
        self.rounds.last()
    }

    pub fn get(&self, round: Round) -> Option<&RoundRecord> {
        let index = usize::try_from(round.0).ok()?.checked_sub(1)?;
        self.rounds.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RoundRecord> {
        self.rounds.iter()
    }

    pub fn match_set(&self, round: Round, team: &TeamId) -> Option<&MatchSet> {
        self.get(round)?.match_sets.get(team)
    }

    pub fn average_rank(&self, round: Round, team: &TeamId) -> Result<f64, LeagueError> {
        self.get(round)
            .and_then(|record| record.average_ranks.average_rank(team))
            .ok_or(LeagueError::MissingRank { team: *team, round })
    }

    pub fn ranking_table(&self, round: Round) -> Option<&RankingTable> {
        self.get(round).map(|record| &record.average_ranks)
    }

    /// Consecutive `(earlier, later)` match sets of `team`, oldest first. Used to mine how a
    /// team rewrites its goals from one round to the next.
    pub fn transitions<'a>(
        &'a self,
        team: &'a TeamId,
    ) -> impl Iterator<Item = (&'a MatchSet, &'a MatchSet)> + 'a {
        self.rounds
            .windows(2)
            .filter_map(move |pair| Some((pair[0].match_sets.get(team)?, pair[1].match_sets.get(team)?)))
    }
}
