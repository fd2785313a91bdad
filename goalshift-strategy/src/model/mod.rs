//! Online models of how opponents rewrite their own goals between rounds.
//!
//! Every model is owned by exactly one team strategy and fed once per round with the
//! opponents' match sets. The first observation only records a baseline; estimates start
//! moving once a second round has been seen. Fixtures are always paired across rounds by
//! opponent id.

use goalshift_league::{History, Match, OpponentMatchSets, Round, TeamId};
use tracing::warn;

pub mod expectation;
pub mod margin_bucket;
pub mod markov;

pub use expectation::{ExpectationKey, RankRelation, ScoreExpectationModel};
pub use margin_bucket::{MarginBucket, MarginBucketModel};
pub use markov::{MarkovMoveModel, Move, MoveProbabilities, MoveTable};

/// Per-opponent behaviour model consulted by predictive priority policies.
pub trait OpponentModel {
    /// Short label used in diagnostics.
    fn name(&self) -> &'static str;

    /// Feed the opponents' match sets for `round`. `history` holds every round finalised
    /// before it.
    fn observe(&mut self, round: Round, opponents: &OpponentMatchSets, history: &History);

    /// Expected change of `opponent`'s own goals in `fixture`, seen from the opponent's side.
    /// Zero when nothing is known.
    fn expected_shift(&self, opponent: &TeamId, fixture: &Match) -> f64;

    /// Number of rounds observed so far.
    fn observed_rounds(&self) -> usize;
}

impl<M> OpponentModel for Box<M>
where
    M: OpponentModel + ?Sized,
{
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn observe(&mut self, round: Round, opponents: &OpponentMatchSets, history: &History) {
        (**self).observe(round, opponents, history)
    }

    fn expected_shift(&self, opponent: &TeamId, fixture: &Match) -> f64 {
        (**self).expected_shift(opponent, fixture)
    }

    fn observed_rounds(&self) -> usize {
        (**self).observed_rounds()
    }
}

/// Model that learns nothing and always predicts no change.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeutralModel {
    rounds: usize,
}

impl OpponentModel for NeutralModel {
    fn name(&self) -> &'static str {
        "neutral"
    }

    fn observe(&mut self, _: Round, _: &OpponentMatchSets, _: &History) {
        self.rounds += 1;
    }

    fn expected_shift(&self, _: &TeamId, _: &Match) -> f64 {
        0.0
    }

    fn observed_rounds(&self) -> usize {
        self.rounds
    }
}

/// How one opponent's fixture against the same rival changed between observed rounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Transition {
    pub team: TeamId,
    pub prior: Match,
    pub current: Match,
}

/// Snapshot of the last observed opponent match sets.
#[derive(Debug, Clone, Default)]
pub(crate) struct Baseline {
    snapshot: OpponentMatchSets,
    last_round: Option<Round>,
    rounds: usize,
}

impl Baseline {
    pub fn rounds(&self) -> usize {
        self.rounds
    }

    /// Replace the snapshot with `opponents`, returning the transitions since the previous
    /// one. Empty on the first observation; `None` if `round` was already observed.
    pub fn advance(&mut self, round: Round, opponents: &OpponentMatchSets) -> Option<Vec<Transition>> {
        if let Some(last) = self.last_round {
            if round <= last {
                warn!(%round, %last, "ignoring opponent observation for a past round");
                return None;
            }
        }

        let transitions = if self.rounds == 0 {
            Vec::new()
        } else {
            self.transitions(round, opponents)
        };

        self.snapshot = opponents.clone();
        self.last_round = Some(round);
        self.rounds += 1;
        Some(transitions)
    }

    fn transitions(&self, round: Round, opponents: &OpponentMatchSets) -> Vec<Transition> {
        let mut transitions = Vec::new();

        for (team, current_set) in opponents {
            let Some(prior_set) = self.snapshot.get(team) else {
                continue;
            };

            for current in current_set {
                match prior_set.get(&current.opponent) {
                    Some(prior) => transitions.push(Transition {
                        team: *team,
                        prior: *prior,
                        current: *current,
                    }),
                    None => warn!(
                        %round,
                        team = %team,
                        opponent = %current.opponent,
                        "fixture missing from previous snapshot, skipping"
                    ),
                }
            }
        }

        transitions
    }
}
