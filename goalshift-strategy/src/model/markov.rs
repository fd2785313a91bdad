//! Discrete Markov model of opponent goal moves.
//!
//! For every opponent a [`MoveTable`] holds, per goal differential, the probability that
//! the opponent increases, keeps or decreases its own goals in the next round. Cells start
//! from outcome priors and are pulled halfway towards the cumulative observed frequencies
//! each round they are touched.

use super::{Baseline, OpponentModel};
use fnv::FnvHashMap;
use goalshift_league::{History, MAX_GOAL_THRESHOLD, Match, OpponentMatchSets, Round, TeamId};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use tracing::debug;

/// Direction of an opponent's own goals in a fixture between two rounds.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Move {
    Increase,
    NoChange,
    Decrease,
}

impl Move {
    /// Tie-break order when two moves are equally likely.
    const PREFERENCE: [Move; 3] = [Move::NoChange, Move::Increase, Move::Decrease];

    pub fn classify(before: u32, after: u32) -> Self {
        match after.cmp(&before) {
            std::cmp::Ordering::Greater => Move::Increase,
            std::cmp::Ordering::Equal => Move::NoChange,
            std::cmp::Ordering::Less => Move::Decrease,
        }
    }

    fn index(self) -> usize {
        match self {
            Move::Increase => 0,
            Move::NoChange => 1,
            Move::Decrease => 2,
        }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Move::Increase => write!(f, "increase"),
            Move::NoChange => write!(f, "no_change"),
            Move::Decrease => write!(f, "decrease"),
        }
    }
}

/// Probability of each [`Move`] for one goal differential.
#[derive(Copy, Clone, PartialEq, Debug, Deserialize, Serialize)]
pub struct MoveProbabilities {
    pub increase: f64,
    pub no_change: f64,
    pub decrease: f64,
}

impl MoveProbabilities {
    /// Prior for a differential: losing teams add or hold, winning teams hold or shed,
    /// drawing teams are undecided.
    pub fn prior(differential: i32) -> Self {
        match differential.signum() {
            -1 => Self::new(0.5, 0.5, 0.0),
            1 => Self::new(0.0, 0.5, 0.5),
            _ => Self::new(1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0),
        }
    }

    pub fn new(increase: f64, no_change: f64, decrease: f64) -> Self {
        Self {
            increase,
            no_change,
            decrease,
        }
    }

    pub fn get(&self, kind: Move) -> f64 {
        match kind {
            Move::Increase => self.increase,
            Move::NoChange => self.no_change,
            Move::Decrease => self.decrease,
        }
    }

    pub fn sum(&self) -> f64 {
        self.increase + self.no_change + self.decrease
    }

    pub fn most_probable(&self) -> Move {
        Move::PREFERENCE
            .into_iter()
            .fold(Move::NoChange, |best, candidate| {
                if self.get(candidate) > self.get(best) {
                    candidate
                } else {
                    best
                }
            })
    }

    /// `P(increase) − P(decrease)`.
    pub fn expected_shift(&self) -> f64 {
        self.increase - self.decrease
    }

    fn blend(&self, counts: [u32; 3]) -> Self {
        let total = counts.iter().sum::<u32>();
        if total == 0 {
            return *self;
        }
        let frequency = |kind: Move| f64::from(counts[kind.index()]) / f64::from(total);

        let blended = Self::new(
            (self.increase + frequency(Move::Increase)) / 2.0,
            (self.no_change + frequency(Move::NoChange)) / 2.0,
            (self.decrease + frequency(Move::Decrease)) / 2.0,
        );
        let sum = blended.sum();
        Self::new(blended.increase / sum, blended.no_change / sum, blended.decrease / sum)
    }
}

/// Move probabilities and cumulative move counters for every differential in
/// `-threshold..=threshold`.
#[derive(Clone, PartialEq, Debug, Deserialize, Serialize)]
pub struct MoveTable {
    threshold: u32,
    cells: Vec<MoveProbabilities>,
    counts: Vec<[u32; 3]>,
}

impl MoveTable {
    pub fn new(threshold: u32) -> Self {
        let span = threshold as i32;
        Self {
            threshold,
            cells: (-span..=span).map(MoveProbabilities::prior).collect(),
            counts: vec![[0; 3]; (2 * threshold + 1) as usize],
        }
    }

    fn index(&self, differential: i32) -> Option<usize> {
        let shifted = differential + self.threshold as i32;
        usize::try_from(shifted).ok().filter(|index| *index < self.cells.len())
    }

    /// Current probabilities, or the prior for a differential outside the table.
    pub fn probabilities(&self, differential: i32) -> MoveProbabilities {
        self.index(differential)
            .map(|index| self.cells[index])
            .unwrap_or_else(|| MoveProbabilities::prior(differential))
    }

    /// Times `kind` followed `differential` so far.
    pub fn count(&self, differential: i32, kind: Move) -> u32 {
        self.index(differential)
            .map(|index| self.counts[index][kind.index()])
            .unwrap_or_default()
    }

    fn record(&mut self, differential: i32, kind: Move) -> bool {
        match self.index(differential) {
            Some(index) => {
                self.counts[index][kind.index()] += 1;
                true
            }
            None => false,
        }
    }

    fn refresh(&mut self, differential: i32) {
        if let Some(index) = self.index(differential) {
            self.cells[index] = self.cells[index].blend(self.counts[index]);
        }
    }
}

#[derive(Clone, Debug)]
struct MarkovProfile {
    table: MoveTable,
    predictions: u32,
    correct: u32,
    updates: u32,
}

impl MarkovProfile {
    fn new(threshold: u32) -> Self {
        Self {
            table: MoveTable::new(threshold),
            predictions: 0,
            correct: 0,
            updates: 0,
        }
    }

    fn accuracy(&self) -> Option<f64> {
        (self.predictions > 0).then(|| f64::from(self.correct) / f64::from(self.predictions))
    }
}

/// Markov move model over goal differentials, one [`MoveTable`] per opponent.
#[derive(Clone, Debug)]
pub struct MarkovMoveModel {
    threshold: u32,
    baseline: Baseline,
    profiles: FnvHashMap<TeamId, MarkovProfile>,
}

impl Default for MarkovMoveModel {
    fn default() -> Self {
        Self::new(MAX_GOAL_THRESHOLD)
    }
}

impl MarkovMoveModel {
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold,
            baseline: Baseline::default(),
            profiles: FnvHashMap::default(),
        }
    }

    /// Move probabilities of `opponent` for `fixture` (opponent's perspective).
    pub fn move_probabilities(&self, opponent: &TeamId, fixture: &Match) -> MoveProbabilities {
        self.profiles
            .get(opponent)
            .map(|profile| profile.table.probabilities(fixture.margin()))
            .unwrap_or_else(|| MoveProbabilities::prior(fixture.margin()))
    }

    pub fn most_probable_move(&self, opponent: &TeamId, fixture: &Match) -> Move {
        self.move_probabilities(opponent, fixture).most_probable()
    }

    pub fn table(&self, opponent: &TeamId) -> Option<&MoveTable> {
        self.profiles.get(opponent).map(|profile| &profile.table)
    }

    /// Fraction of correct most-probable-move predictions, `None` before any were scored.
    pub fn accuracy(&self, opponent: &TeamId) -> Option<f64> {
        self.profiles.get(opponent)?.accuracy()
    }

    /// Scored opponents, most predictable first. Ties are ordered by team id.
    pub fn opponents_by_accuracy(&self) -> Vec<(TeamId, f64)> {
        self.profiles
            .iter()
            .filter_map(|(team, profile)| Some((*team, profile.accuracy()?)))
            .sorted_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)))
            .collect()
    }
}

impl OpponentModel for MarkovMoveModel {
    fn name(&self) -> &'static str {
        "markov"
    }

    fn observe(&mut self, round: Round, opponents: &OpponentMatchSets, _: &History) {
        let Some(transitions) = self.baseline.advance(round, opponents) else {
            return;
        };

        let threshold = self.threshold;
        let mut touched: FnvHashMap<TeamId, BTreeSet<i32>> = FnvHashMap::default();

        for transition in &transitions {
            let profile = self
                .profiles
                .entry(transition.team)
                .or_insert_with(|| MarkovProfile::new(threshold));

            let differential = transition.prior.margin();
            let observed = Move::classify(transition.prior.player_goals, transition.current.player_goals);

            // Score against the table as it stood before this round
            profile.predictions += 1;
            if profile.table.probabilities(differential).most_probable() == observed {
                profile.correct += 1;
            }

            if profile.table.record(differential, observed) {
                touched.entry(transition.team).or_default().insert(differential);
            }
        }

        for (team, differentials) in touched {
            if let Some(profile) = self.profiles.get_mut(&team) {
                for differential in &differentials {
                    profile.table.refresh(*differential);
                }
                profile.updates += 1;
                debug!(
                    %round,
                    opponent = %team,
                    cells = differentials.len(),
                    accuracy = ?profile.accuracy(),
                    "markov move table updated"
                );
            }
        }
    }

    fn expected_shift(&self, opponent: &TeamId, fixture: &Match) -> f64 {
        match self.profiles.get(opponent) {
            Some(profile) if profile.updates > 0 => {
                profile.table.probabilities(fixture.margin()).expected_shift()
            }
            _ => 0.0,
        }
    }

    fn observed_rounds(&self) -> usize {
        self.baseline.rounds()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::tests::opponents;

    fn assert_normalised(probabilities: MoveProbabilities) {
        assert!((probabilities.sum() - 1.0).abs() < 1e-9, "{probabilities:?}");
    }

    #[test]
    fn test_priors_by_outcome() {
        assert_eq!(MoveProbabilities::prior(-3), MoveProbabilities::new(0.5, 0.5, 0.0));
        assert_eq!(MoveProbabilities::prior(2), MoveProbabilities::new(0.0, 0.5, 0.5));
        assert_normalised(MoveProbabilities::prior(0));

        let table = MoveTable::new(8);
        for differential in -8..=8 {
            assert_normalised(table.probabilities(differential));
        }
    }

    #[test]
    fn test_most_probable_prefers_no_change_on_ties() {
        assert_eq!(MoveProbabilities::prior(4).most_probable(), Move::NoChange);
        assert_eq!(MoveProbabilities::prior(0).most_probable(), Move::NoChange);
        assert_eq!(
            MoveProbabilities::new(0.2, 0.3, 0.5).most_probable(),
            Move::Decrease
        );
    }

    #[test]
    fn test_first_round_is_baseline_only() {
        let mut model = MarkovMoveModel::default();
        model.observe(Round(1), &opponents([(7, [(1, 5, 1)])]), &History::new());

        let fixture = Match::new(TeamId(1), 5, 1).unwrap();
        assert_eq!(model.observed_rounds(), 1);
        assert_eq!(model.expected_shift(&TeamId(7), &fixture), 0.0);
        assert_eq!(
            model.move_probabilities(&TeamId(7), &fixture),
            MoveProbabilities::prior(4)
        );
        assert_eq!(model.accuracy(&TeamId(7)), None);
    }

    #[test]
    fn test_update_blends_prior_with_frequency() {
        let mut model = MarkovMoveModel::default();
        let history = History::new();
        model.observe(Round(1), &opponents([(7, [(1, 5, 1)])]), &history);
        model.observe(Round(2), &opponents([(7, [(1, 5, 1)])]), &history);

        let probabilities = model.move_probabilities(&TeamId(7), &Match::new(TeamId(1), 5, 1).unwrap());
        assert!((probabilities.no_change - 0.75).abs() < 1e-9);
        assert!((probabilities.decrease - 0.25).abs() < 1e-9);
        assert_eq!(probabilities.increase, 0.0);
        assert_eq!(model.table(&TeamId(7)).unwrap().count(4, Move::NoChange), 1);
    }

    #[test]
    fn test_accuracy_ranking() {
        let mut model = MarkovMoveModel::default();
        let history = History::new();
        // Team 7 holds its winning score (predicted), team 9 sheds goals (not predicted)
        model.observe(Round(1), &opponents([(7, [(1, 5, 1)]), (9, [(1, 5, 1)])]), &history);
        model.observe(Round(2), &opponents([(7, [(1, 5, 1)]), (9, [(1, 3, 1)])]), &history);

        assert_eq!(model.accuracy(&TeamId(7)), Some(1.0));
        assert_eq!(model.accuracy(&TeamId(9)), Some(0.0));
        assert_eq!(
            model.opponents_by_accuracy(),
            vec![(TeamId(7), 1.0), (TeamId(9), 0.0)]
        );
    }

    #[test]
    fn test_out_of_table_differential_uses_prior() {
        let table = MoveTable::new(2);
        assert_eq!(table.probabilities(5), MoveProbabilities::prior(5));
        assert_eq!(table.count(-5, Move::Increase), 0);
    }
}
