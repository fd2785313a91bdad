//! Goal Reallocation Strategies for the Goalshift League
//!
//! After a round's real results are recorded, each team may privately redistribute its own
//! goals across that round's fixtures before results are published. This crate provides
//! the engine that performs the redistribution, the validator guarding its fairness rules,
//! and the opponent models predictive strategies consult.
//!
//! # Architecture
//!
//! A round driver (outside this crate) owns the [`History`](goalshift_league::History) and
//! one [`TeamStrategy`] per team. Every round it calls [`TeamStrategy::on_round`], which
//! feeds the [`OpponentModel`] and asks the [`ReallocationEngine`] for a [`Reallocation`].
//! The engine never fails: a candidate that would break a rule is replaced by the original
//! match set together with a [`FallbackReason`].
//!
//! # Key Components
//!
//! - [`ReallocationEngine`]: harvest, rank, distribute, spill and validate in one pass
//! - [`ConstraintValidator`]: the six fairness rules between original and candidate
//! - [`PriorityPolicy`]: pluggable target ordering ([`MarginPolicy`], [`RankDistancePolicy`],
//!   [`PredictedTargetPolicy`], [`RegressionPolicy`])
//! - [`OpponentModel`]: per-opponent behaviour models ([`MarkovMoveModel`],
//!   [`MarginBucketModel`], [`ScoreExpectationModel`])
//! - [`RegressionService`]: linear fits consumed by the regression policy
//! - [`StrategyConfig`]: serde configuration with defaults
//!
//! # Example
//!
//! ```rust,ignore
//! use goalshift_league::{History, MatchSet, OpponentMatchSets, Round, TeamId};
//! use goalshift_strategy::{StrategyConfig, StrategyKind, TeamStrategy};
//!
//! let config = StrategyConfig::default();
//! let mut strategy = TeamStrategy::from_kind(TeamId(0), StrategyKind::MarkovPredicted, &config);
//!
//! let match_set = MatchSet::from_scores([(1, 5, 1), (2, 2, 2), (3, 0, 3)])?;
//! let published = strategy
//!     .on_round(Round(1), &History::new(), &OpponentMatchSets::new(), &match_set)
//!     .into_match_set();
//!
//! // 5-1, 2-2, 0-3 becomes 3-1, 1-2, 3-3: one more draw, no fewer wins
//! ```
//!
//! # Fairness Rules
//!
//! For every fixture, compared with the original:
//!
//! 1. goals stay within `0..=max_goal_threshold`
//! 2. the opponent's goals never change
//! 3. a won fixture never gains goals
//! 4. a won or drawn fixture keeps at least `goals - goals / 2`
//! 5. a lost fixture never loses goals
//! 6. the team's total goals for the round are conserved

pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod policy;
pub mod regression;
pub mod strategy;
pub mod validator;

// Re-exports for convenience
pub use config::{ConfigError, EngineConfig, ModelConfig, RegressionConfig, StrategyConfig};
pub use engine::{Reallocation, ReallocationEngine, RoundContext, SpillOrder};
pub use error::{FallbackReason, PolicyError};
pub use model::{
    MarginBucket, MarginBucketModel, MarkovMoveModel, Move, MoveProbabilities, MoveTable, NeutralModel,
    OpponentModel, RankRelation, ScoreExpectationModel,
};
pub use policy::{
    Assessment, MarginPolicy, PredictedTargetPolicy, PriorityPolicy, RankDistancePolicy, RegressionPolicy,
};
pub use regression::{FittedModel, LinearFit, OrdinaryLeastSquares, RegressionError, RegressionService};
pub use strategy::{BoxedModel, BoxedPolicy, StrategyKind, TeamStrategy};
pub use validator::{ConstraintValidator, ConstraintViolation};
