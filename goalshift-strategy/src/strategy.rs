//! Per-team strategy tying an engine, a priority policy and an opponent model together.

use crate::{
    config::StrategyConfig,
    engine::{Reallocation, ReallocationEngine, RoundContext},
    model::{MarginBucketModel, MarkovMoveModel, NeutralModel, OpponentModel, ScoreExpectationModel},
    policy::{MarginPolicy, PredictedTargetPolicy, PriorityPolicy, RankDistancePolicy, RegressionPolicy},
    regression::OrdinaryLeastSquares,
};
use goalshift_league::{History, MatchSet, OpponentMatchSets, Round, TeamId};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

/// Type-erased policy used by [`TeamStrategy::from_kind`].
pub type BoxedPolicy = Box<dyn PriorityPolicy + Send>;

/// Type-erased model used by [`TeamStrategy::from_kind`].
pub type BoxedModel = Box<dyn OpponentModel + Send>;

/// Ready-made policy and model pairings.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Cheapest losses first, no opponent modelling.
    Margin,
    /// Closest rivals in the table first.
    RankDistance,
    /// Better-ranked rivals within a window of league places first.
    RankWindow { window: usize },
    /// Transfers sized by the Markov move model.
    MarkovPredicted,
    /// Transfers sized by the margin bucket model.
    MarginBucketPredicted,
    /// Transfers sized by the score expectation model.
    ExpectationPredicted,
    /// Most predictable opponents first, by least-squares fit on history.
    Regression,
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyKind::Margin => write!(f, "margin"),
            StrategyKind::RankDistance => write!(f, "rank_distance"),
            StrategyKind::RankWindow { window } => write!(f, "rank_window({window})"),
            StrategyKind::MarkovPredicted => write!(f, "markov_predicted"),
            StrategyKind::MarginBucketPredicted => write!(f, "margin_bucket_predicted"),
            StrategyKind::ExpectationPredicted => write!(f, "expectation_predicted"),
            StrategyKind::Regression => write!(f, "regression"),
        }
    }
}

/// One team's reallocation strategy.
///
/// Owns its opponent model exclusively: strategies of different teams share no state and
/// can be driven independently.
#[derive(Debug, Clone)]
pub struct TeamStrategy<Policy = BoxedPolicy, Model = BoxedModel> {
    team: TeamId,
    engine: ReallocationEngine,
    policy: Policy,
    model: Model,
}

impl<Policy, Model> TeamStrategy<Policy, Model>
where
    Policy: PriorityPolicy,
    Model: OpponentModel,
{
    pub fn new(team: impl Into<TeamId>, engine: ReallocationEngine, policy: Policy, model: Model) -> Self {
        Self {
            team: team.into(),
            engine,
            policy,
            model,
        }
    }

    pub fn team(&self) -> TeamId {
        self.team
    }

    pub fn engine(&self) -> &ReallocationEngine {
        &self.engine
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    /// Read-only view of the opponent model, for diagnostics.
    pub fn model(&self) -> &Model {
        &self.model
    }

    /// Handle a round: update the opponent model, then reallocate `match_set`.
    ///
    /// The first round always uses [`MarginPolicy`], since no behaviour has been observed yet.
    pub fn on_round(
        &mut self,
        round: Round,
        history: &History,
        opponents: &OpponentMatchSets,
        match_set: &MatchSet,
    ) -> Reallocation {
        self.model.observe(round, opponents, history);
        debug!(
            %round,
            team = %self.team,
            model = self.model.name(),
            observed_rounds = self.model.observed_rounds(),
            "opponent model updated"
        );

        let ctx = RoundContext::new(round, self.team, history, opponents).with_model(&self.model);
        let reallocation = if round.is_first() {
            self.engine.reallocate(&ctx, match_set, &MarginPolicy)
        } else {
            self.engine.reallocate(&ctx, match_set, &self.policy)
        };

        if let Some(reason) = reallocation.reason() {
            debug!(%round, team = %self.team, policy = self.policy.name(), %reason, "publishing original match set");
        }
        reallocation
    }
}

impl TeamStrategy {
    /// Build a boxed strategy of the given kind from `config`.
    pub fn from_kind(team: impl Into<TeamId>, kind: StrategyKind, config: &StrategyConfig) -> Self {
        let team = team.into();
        let threshold = config.engine.max_goal_threshold;
        let policy: BoxedPolicy = match kind {
            StrategyKind::Margin => Box::new(MarginPolicy),
            StrategyKind::RankDistance => Box::new(RankDistancePolicy::new()),
            StrategyKind::RankWindow { window } => Box::new(RankDistancePolicy::with_window(window)),
            StrategyKind::MarkovPredicted
            | StrategyKind::MarginBucketPredicted
            | StrategyKind::ExpectationPredicted => Box::new(PredictedTargetPolicy),
            StrategyKind::Regression => {
                Box::new(RegressionPolicy::new(OrdinaryLeastSquares, config.regression.clone()))
            }
        };

        let model: BoxedModel = match kind {
            StrategyKind::MarkovPredicted => Box::new(MarkovMoveModel::new(threshold)),
            StrategyKind::MarginBucketPredicted => Box::new(MarginBucketModel::new(config.model.clone())),
            StrategyKind::ExpectationPredicted => Box::new(ScoreExpectationModel::new()),
            StrategyKind::Margin
            | StrategyKind::RankDistance
            | StrategyKind::RankWindow { .. }
            | StrategyKind::Regression => Box::new(NeutralModel::default()),
        };

        info!(%team, %kind, "team strategy created");
        Self::new(team, ReallocationEngine::new(config.engine.clone()), policy, model)
    }
}

impl fmt::Debug for dyn PriorityPolicy + Send {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PriorityPolicy({})", self.name())
    }
}

impl fmt::Debug for dyn OpponentModel + Send {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OpponentModel({}, rounds: {})", self.name(), self.observed_rounds())
    }
}
