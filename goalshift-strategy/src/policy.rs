//! Priority policies that decide which lost fixtures receive pooled goals first.
//!
//! A policy maps each target fixture to a priority key (lower is served first) and to the
//! goals it needs. The engine breaks ties on goals needed, then opponent id.

use crate::{
    config::RegressionConfig,
    engine::RoundContext,
    error::PolicyError,
    regression::{FittedModel, OrdinaryLeastSquares, RegressionError, RegressionService},
};
use goalshift_league::{History, Match, Outcome, TeamId};
use tracing::{debug, warn};

/// Round a predicted goal count half-up and clamp it to `0..=max`. Non-finite values map to
/// `fallback`.
pub fn round_half_up(value: f64, max: u32, fallback: u32) -> u32 {
    if !value.is_finite() {
        return fallback;
    }
    (value + 0.5).floor().clamp(0.0, f64::from(max)) as u32
}

/// Orders target fixtures for the [`ReallocationEngine`](crate::engine::ReallocationEngine).
pub trait PriorityPolicy {
    /// Short label used in diagnostics.
    fn name(&self) -> &'static str;

    /// Priority key for `target`. Lower keys are served first.
    fn priority(&self, target: &Match, ctx: &RoundContext<'_>) -> Result<f64, PolicyError>;

    /// Goals `target` needs to be won. Targets needing none are skipped.
    fn goals_needed(&self, target: &Match, _ctx: &RoundContext<'_>) -> Result<u32, PolicyError> {
        Ok(target.goals_to_win())
    }

    /// Priority key and goals needed in one evaluation. Override when both derive from the
    /// same costly estimate.
    fn assess(&self, target: &Match, ctx: &RoundContext<'_>) -> Result<Assessment, PolicyError> {
        Ok(Assessment {
            priority: self.priority(target, ctx)?,
            goals_needed: self.goals_needed(target, ctx)?,
        })
    }
}

/// A target fixture as judged by a [`PriorityPolicy`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Assessment {
    pub priority: f64,
    pub goals_needed: u32,
}

impl<P> PriorityPolicy for Box<P>
where
    P: PriorityPolicy + ?Sized,
{
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn priority(&self, target: &Match, ctx: &RoundContext<'_>) -> Result<f64, PolicyError> {
        (**self).priority(target, ctx)
    }

    fn goals_needed(&self, target: &Match, ctx: &RoundContext<'_>) -> Result<u32, PolicyError> {
        (**self).goals_needed(target, ctx)
    }

    fn assess(&self, target: &Match, ctx: &RoundContext<'_>) -> Result<Assessment, PolicyError> {
        (**self).assess(target, ctx)
    }
}

/// Cheapest targets first. Never fails, so it doubles as the fallback ordering.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarginPolicy;

impl PriorityPolicy for MarginPolicy {
    fn name(&self) -> &'static str {
        "margin"
    }

    fn priority(&self, target: &Match, _: &RoundContext<'_>) -> Result<f64, PolicyError> {
        Ok(f64::from(target.goals_to_win()))
    }
}

/// Closest rivals in the latest average-rank table first.
///
/// With a `window`, only rivals ranked above the team and at most `window` league places
/// away keep their distance as key; every other rival is pushed behind them.
#[derive(Debug, Clone, Copy, Default)]
pub struct RankDistancePolicy {
    pub window: Option<usize>,
}

impl RankDistancePolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_window(window: usize) -> Self {
        Self {
            window: Some(window),
        }
    }
}

impl PriorityPolicy for RankDistancePolicy {
    fn name(&self) -> &'static str {
        "rank_distance"
    }

    fn priority(&self, target: &Match, ctx: &RoundContext<'_>) -> Result<f64, PolicyError> {
        let table = &ctx
            .history
            .latest()
            .ok_or(PolicyError::InsufficientHistory {
                round: ctx.round,
                available: 0,
                required: 1,
            })?
            .average_ranks;

        if table.average_rank(&ctx.team).is_none() {
            return Err(PolicyError::MissingRank(ctx.team));
        }

        let Some(distance) = table.ranking_distance(&ctx.team, &target.opponent) else {
            warn!(round = %ctx.round, opponent = %target.opponent, "rival has no average rank, ranking it last");
            return Ok(f64::MAX);
        };

        let Some(window) = self.window else {
            return Ok(distance);
        };

        let promoted = table
            .neighbours(&ctx.team, window)
            .is_some_and(|neighbours| neighbours.better.contains(&target.opponent));

        Ok(if promoted {
            distance
        } else {
            distance + table.len() as f64
        })
    }
}

/// Sizes each transfer from the opponent's predicted goals, as estimated by the
/// [`OpponentModel`](crate::model::OpponentModel) in the round context. Predictions are
/// clamped to the context's goal threshold.
#[derive(Debug, Clone, Copy, Default)]
pub struct PredictedTargetPolicy;

impl PredictedTargetPolicy {
    /// Opponent goals in `target` after the opponent's own expected reallocation.
    pub fn predicted_opponent_goals(&self, target: &Match, ctx: &RoundContext<'_>) -> u32 {
        let shift = ctx
            .model
            .map(|model| model.expected_shift(&target.opponent, &target.mirrored(ctx.team)))
            .unwrap_or_default();

        round_half_up(
            f64::from(target.opponent_goals) + shift,
            ctx.max_goal_threshold,
            target.opponent_goals,
        )
    }
}

impl PriorityPolicy for PredictedTargetPolicy {
    fn name(&self) -> &'static str {
        "predicted_target"
    }

    fn priority(&self, target: &Match, ctx: &RoundContext<'_>) -> Result<f64, PolicyError> {
        self.goals_needed(target, ctx).map(f64::from)
    }

    fn goals_needed(&self, target: &Match, ctx: &RoundContext<'_>) -> Result<u32, PolicyError> {
        let predicted = self.predicted_opponent_goals(target, ctx);
        Ok((predicted + 1).saturating_sub(target.player_goals))
    }

    fn assess(&self, target: &Match, ctx: &RoundContext<'_>) -> Result<Assessment, PolicyError> {
        let goals_needed = self.goals_needed(target, ctx)?;
        Ok(Assessment {
            priority: f64::from(goals_needed),
            goals_needed,
        })
    }
}

/// Fits a per-opponent linear model of next-round goals on the league history and serves
/// the most predictable opponents first.
///
/// Design row of a fixture, from the owning team's side: intercept, own goals, rival
/// goals and outcome class (loss 0, draw 1, win 3).
#[derive(Debug, Clone)]
pub struct RegressionPolicy<R = OrdinaryLeastSquares> {
    service: R,
    config: RegressionConfig,
}

impl<R> Default for RegressionPolicy<R>
where
    R: RegressionService + Default,
{
    fn default() -> Self {
        Self::new(R::default(), RegressionConfig::default())
    }
}

/// Fit quality and prediction for one target fixture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegressionEstimate {
    pub r_squared: f64,
    pub predicted_opponent_goals: u32,
}

impl<R> RegressionPolicy<R>
where
    R: RegressionService,
{
    pub fn new(service: R, config: RegressionConfig) -> Self {
        Self { service, config }
    }

    pub fn features(fixture: &Match) -> Vec<f64> {
        let outcome_class = match fixture.outcome() {
            Outcome::Loss => 0.0,
            Outcome::Draw => 1.0,
            Outcome::Win => 3.0,
        };
        vec![
            1.0,
            f64::from(fixture.player_goals),
            f64::from(fixture.opponent_goals),
            outcome_class,
        ]
    }

    /// Fit `opponent`'s next-round goals on every consecutive pair of finalised rounds.
    pub fn fit(&self, history: &History, opponent: &TeamId) -> Result<R::Model, RegressionError> {
        let (design, targets): (Vec<Vec<f64>>, Vec<f64>) = history
            .transitions(opponent)
            .flat_map(|(earlier, later)| {
                earlier.iter().filter_map(move |fixture| {
                    let next = later.get(&fixture.opponent)?;
                    Some((Self::features(fixture), f64::from(next.player_goals)))
                })
            })
            .unzip();

        self.service.fit(&design, &targets)
    }

    /// Estimate for `target`, or `None` when the fit failed or is too weak to trust.
    pub fn estimate(
        &self,
        target: &Match,
        ctx: &RoundContext<'_>,
    ) -> Result<Option<RegressionEstimate>, PolicyError> {
        let available = ctx.history.len();
        if available < self.config.min_rounds {
            return Err(PolicyError::InsufficientHistory {
                round: ctx.round,
                available,
                required: self.config.min_rounds,
            });
        }

        let model = match self.fit(ctx.history, &target.opponent) {
            Ok(model) => model,
            Err(error) => {
                debug!(round = %ctx.round, opponent = %target.opponent, %error, "regression fit failed, using margin estimate");
                return Ok(None);
            }
        };

        let r_squared = model.r_squared();
        if r_squared < self.config.min_r_squared {
            debug!(round = %ctx.round, opponent = %target.opponent, r_squared, "regression fit too weak, using margin estimate");
            return Ok(None);
        }

        let row = Self::features(&target.mirrored(ctx.team));
        Ok(model.predict(&row).map(|prediction| RegressionEstimate {
            r_squared,
            predicted_opponent_goals: round_half_up(prediction, ctx.max_goal_threshold, target.opponent_goals),
        }))
    }
}

impl<R> PriorityPolicy for RegressionPolicy<R>
where
    R: RegressionService,
{
    fn name(&self) -> &'static str {
        "regression"
    }

    fn priority(&self, target: &Match, ctx: &RoundContext<'_>) -> Result<f64, PolicyError> {
        self.assess(target, ctx).map(|assessment| assessment.priority)
    }

    fn goals_needed(&self, target: &Match, ctx: &RoundContext<'_>) -> Result<u32, PolicyError> {
        self.assess(target, ctx).map(|assessment| assessment.goals_needed)
    }

    /// Fits once per target: most reliable fits first, sized by the predicted opponent goals.
    fn assess(&self, target: &Match, ctx: &RoundContext<'_>) -> Result<Assessment, PolicyError> {
        Ok(match self.estimate(target, ctx)? {
            Some(estimate) => Assessment {
                priority: -estimate.r_squared,
                goals_needed: (estimate.predicted_opponent_goals + 1).saturating_sub(target.player_goals),
            },
            None => Assessment {
                priority: 0.0,
                goals_needed: target.goals_to_win(),
            },
        })
    }
}
