//! Expected next-round score per opponent, keyed by rank relation and prior score.

use super::{Baseline, OpponentModel};
use fnv::FnvHashMap;
use goalshift_league::{History, Match, OpponentMatchSets, RankingTable, Round, TeamId};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use tracing::debug;

/// Whether a team is ranked strictly better than its rival in a fixture.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RankRelation {
    Above,
    NotAbove,
}

impl RankRelation {
    /// Lower average rank is better. Unknown ranks count as [`RankRelation::NotAbove`].
    pub fn between(ranks: &RankingTable, team: &TeamId, rival: &TeamId) -> Self {
        match (ranks.average_rank(team), ranks.average_rank(rival)) {
            (Some(own), Some(other)) if own < other => Self::Above,
            _ => Self::NotAbove,
        }
    }
}

/// Situation a fixture was in before the opponent's next move.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Deserialize, Serialize)]
pub struct ExpectationKey {
    pub relation: RankRelation,
    pub own_goals: u32,
    pub rival_goals: u32,
}

impl ExpectationKey {
    fn of(ranks: &RankingTable, team: &TeamId, fixture: &Match) -> Self {
        Self {
            relation: RankRelation::between(ranks, team, &fixture.opponent),
            own_goals: fixture.player_goals,
            rival_goals: fixture.opponent_goals,
        }
    }
}

/// Remembers which own-goal counts each opponent published after every situation, and
/// expects the most frequent one.
#[derive(Clone, Debug, Default)]
pub struct ScoreExpectationModel {
    baseline: Baseline,
    ranks: RankingTable,
    outcomes: FnvHashMap<TeamId, FnvHashMap<ExpectationKey, Vec<u32>>>,
}

impl ScoreExpectationModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Most frequently observed next-round goals of `opponent` in `fixture`'s situation.
    /// Ties resolve to the smaller goal count.
    pub fn expected_goals(&self, opponent: &TeamId, fixture: &Match) -> Option<u32> {
        let key = ExpectationKey::of(&self.ranks, opponent, fixture);
        self.outcomes
            .get(opponent)?
            .get(&key)?
            .iter()
            .counts()
            .into_iter()
            .max_by_key(|(goals, count)| (*count, Reverse(**goals)))
            .map(|(goals, _)| *goals)
    }
}

impl OpponentModel for ScoreExpectationModel {
    fn name(&self) -> &'static str {
        "score_expectation"
    }

    fn observe(&mut self, round: Round, opponents: &OpponentMatchSets, history: &History) {
        let Some(transitions) = self.baseline.advance(round, opponents) else {
            return;
        };

        for transition in &transitions {
            let key = ExpectationKey::of(&self.ranks, &transition.team, &transition.prior);
            self.outcomes
                .entry(transition.team)
                .or_default()
                .entry(key)
                .or_default()
                .push(transition.current.player_goals);
        }

        debug!(%round, samples = transitions.len(), "score expectations updated");

        self.ranks = history
            .latest()
            .map(|record| record.average_ranks.clone())
            .unwrap_or_default();
    }

    fn expected_shift(&self, opponent: &TeamId, fixture: &Match) -> f64 {
        self.expected_goals(opponent, fixture)
            .map(|goals| f64::from(goals) - f64::from(fixture.player_goals))
            .unwrap_or_default()
    }

    fn observed_rounds(&self) -> usize {
        self.baseline.rounds()
    }
}
