//! Average-rank tables and the rank arithmetic strategies use to pick rivals.

use crate::id::TeamId;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Average league rank per team after a round. Lower is better; 1.0 is a team that has
/// topped every round so far.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct RankingTable {
    average_ranks: BTreeMap<TeamId, f64>,
}

impl RankingTable {
    pub fn new(average_ranks: BTreeMap<TeamId, f64>) -> Self {
        Self { average_ranks }
    }

    pub fn average_rank(&self, team: &TeamId) -> Option<f64> {
        self.average_ranks.get(team).copied()
    }

    pub fn len(&self) -> usize {
        self.average_ranks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.average_ranks.is_empty()
    }

    /// Teams ordered best first. Equal averages are ordered by team id.
    pub fn ordered(&self) -> Vec<TeamId> {
        self.average_ranks
            .iter()
            .sorted_by(|(a_id, a), (b_id, b)| a.total_cmp(b).then(a_id.cmp(b_id)))
            .map(|(id, _)| *id)
            .collect()
    }

    /// Zero-based league position of `team`, 0 being the leader.
    pub fn position(&self, team: &TeamId) -> Option<usize> {
        self.ordered().iter().position(|id| id == team)
    }

    /// Absolute difference between two teams' average ranks.
    pub fn ranking_distance(&self, a: &TeamId, b: &TeamId) -> Option<f64> {
        Some((self.average_rank(a)? - self.average_rank(b)?).abs())
    }

    /// Teams within `window` league places of `team`, split into those ranked above and below.
    pub fn neighbours(&self, team: &TeamId, window: usize) -> Option<RankWindow> {
        let ordered = self.ordered();
        let position = ordered.iter().position(|id| id == team)?;

        let better = ordered[position.saturating_sub(window)..position].to_vec();
        let worse = ordered
            .iter()
            .skip(position + 1)
            .take(window)
            .copied()
            .collect();

        Some(RankWindow { better, worse })
    }
}

/// Rivals adjacent to a team in the league table.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RankWindow {
    /// Teams ranked above, best first.
    pub better: Vec<TeamId>,
    /// Teams ranked below, best first.
    pub worse: Vec<TeamId>,
}

impl RankWindow {
    pub fn contains(&self, team: &TeamId) -> bool {
        self.better.contains(team) || self.worse.contains(team)
    }
}
