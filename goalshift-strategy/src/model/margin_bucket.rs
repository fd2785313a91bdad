//! Exponential moving average of opponent adjustments per margin bucket.

use super::{Baseline, OpponentModel};
use crate::config::ModelConfig;
use fnv::FnvHashMap;
use goalshift_league::{History, Match, OpponentMatchSets, Outcome, Round, TeamId};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Coarse class of a decided fixture by its margin. Draws have no bucket.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MarginBucket {
    HighWin,
    LowWin,
    LowLoss,
    HighLoss,
}

impl MarginBucket {
    pub fn classify(fixture: &Match, config: &ModelConfig) -> Option<Self> {
        let margin = fixture.margin().unsigned_abs();
        match fixture.outcome() {
            Outcome::Win if margin > config.win_margin_boundary => Some(Self::HighWin),
            Outcome::Win => Some(Self::LowWin),
            Outcome::Loss if margin > config.loss_margin_boundary => Some(Self::HighLoss),
            Outcome::Loss => Some(Self::LowLoss),
            Outcome::Draw => None,
        }
    }
}

/// Tracks, per opponent and [`MarginBucket`], the smoothed change an opponent applies to its
/// own goals in fixtures of that bucket.
#[derive(Clone, Debug, Default)]
pub struct MarginBucketModel {
    config: ModelConfig,
    baseline: Baseline,
    adjustments: FnvHashMap<TeamId, FnvHashMap<MarginBucket, f64>>,
}

impl MarginBucketModel {
    pub fn new(config: ModelConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Smoothed adjustment `opponent` applies in `bucket`, `None` until observed.
    pub fn expected_adjustment(&self, opponent: &TeamId, bucket: MarginBucket) -> Option<f64> {
        self.adjustments.get(opponent)?.get(&bucket).copied()
    }
}

impl OpponentModel for MarginBucketModel {
    fn name(&self) -> &'static str {
        "margin_bucket"
    }

    fn observe(&mut self, round: Round, opponents: &OpponentMatchSets, _: &History) {
        let Some(transitions) = self.baseline.advance(round, opponents) else {
            return;
        };

        let observed = transitions
            .iter()
            .filter_map(|transition| {
                let bucket = MarginBucket::classify(&transition.prior, &self.config)?;
                let adjustment =
                    f64::from(transition.current.player_goals) - f64::from(transition.prior.player_goals);
                Some(((transition.team, bucket), adjustment))
            })
            .into_group_map();

        let smoothing = 2.0 / (f64::from(round.0) + 1.0);

        for ((team, bucket), samples) in observed {
            let average = samples.iter().sum::<f64>() / samples.len() as f64;
            let value = self
                .adjustments
                .entry(team)
                .or_default()
                .entry(bucket)
                .and_modify(|old| *old = smoothing * *old + (1.0 - smoothing) * average)
                .or_insert(average);

            debug!(
                %round,
                opponent = %team,
                ?bucket,
                observed = average,
                smoothed = *value,
                "margin bucket adjustment updated"
            );
        }
    }

    fn expected_shift(&self, opponent: &TeamId, fixture: &Match) -> f64 {
        MarginBucket::classify(fixture, &self.config)
            .and_then(|bucket| self.expected_adjustment(opponent, bucket))
            .unwrap_or_default()
    }

    fn observed_rounds(&self) -> usize {
        self.baseline.rounds()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::tests::opponents;

    #[test]
    fn test_classify_buckets() {
        let config = ModelConfig::default();
        let classify = |player, opponent| MarginBucket::classify(&Match::new(TeamId(1), player, opponent).unwrap(), &config);

        assert_eq!(classify(5, 1), Some(MarginBucket::HighWin));
        assert_eq!(classify(3, 1), Some(MarginBucket::LowWin));
        assert_eq!(classify(2, 2), None);
        assert_eq!(classify(1, 2), Some(MarginBucket::LowLoss));
        assert_eq!(classify(0, 6), Some(MarginBucket::HighLoss));
    }

    #[test]
    fn test_first_observation_seeds_then_smooths() {
        let mut model = MarginBucketModel::default();
        let history = History::new();

        model.observe(Round(1), &opponents([(7, [(1, 6, 1), (2, 1, 2)])]), &history);
        assert_eq!(model.expected_adjustment(&TeamId(7), MarginBucket::HighWin), None);

        // Round 2: high win 6 -> 4, low loss 1 -> 2
        model.observe(Round(2), &opponents([(7, [(1, 4, 1), (2, 2, 2)])]), &history);
        assert_eq!(model.expected_adjustment(&TeamId(7), MarginBucket::HighWin), Some(-2.0));
        assert_eq!(model.expected_adjustment(&TeamId(7), MarginBucket::LowLoss), Some(1.0));

        // Round 3: k = 2 / 4, high win 4 -> 4 observed 0
        model.observe(Round(3), &opponents([(7, [(1, 4, 1), (2, 2, 2)])]), &history);
        let smoothed = model.expected_adjustment(&TeamId(7), MarginBucket::HighWin).unwrap();
        assert!((smoothed - (-1.0)).abs() < 1e-9);
        assert_eq!(model.observed_rounds(), 3);
    }

    #[test]
    fn test_averages_fixtures_sharing_a_bucket() {
        let mut model = MarginBucketModel::default();
        let history = History::new();

        model.observe(Round(1), &opponents([(7, [(1, 6, 1), (2, 7, 0)])]), &history);
        model.observe(Round(2), &opponents([(7, [(1, 5, 1), (2, 4, 0)])]), &history);

        assert_eq!(model.expected_adjustment(&TeamId(7), MarginBucket::HighWin), Some(-2.0));
        assert_eq!(model.expected_shift(&TeamId(7), &Match::new(TeamId(3), 8, 2).unwrap()), -2.0);
        assert_eq!(model.expected_shift(&TeamId(7), &Match::new(TeamId(3), 2, 2).unwrap()), 0.0);
    }
}
