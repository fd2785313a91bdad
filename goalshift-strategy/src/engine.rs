//! Goal reallocation engine.
//!
//! One call rewrites a single team's match set for the current round:
//!
//! 1. partition the fixtures by outcome
//! 2. harvest surplus goals from comfortable wins (and draws) into a pool
//! 3. rank the lost fixtures (and unharvested draws) with a [`PriorityPolicy`]
//! 4. spend the pool on the ranked targets
//! 5. spill any leftover pool back into fixtures with spare capacity
//! 6. validate the candidate, reverting to the original if any rule breaks
//!
//! The engine is stateless between calls and never fails: every outcome is reported as a
//! [`Reallocation`].

use crate::{
    config::EngineConfig,
    error::{FallbackReason, PolicyError},
    model::OpponentModel,
    policy::{MarginPolicy, PriorityPolicy},
    validator::ConstraintValidator,
};
use goalshift_league::{
    History, LeagueError, MAX_GOAL_THRESHOLD, Match, MatchSet, OpponentMatchSets, Outcome, Partition, Round,
    TeamId,
};
use indexmap::IndexMap;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Everything a reallocation may consult besides the team's own match set.
#[derive(Clone, Copy)]
pub struct RoundContext<'a> {
    pub round: Round,
    /// Team whose match set is being reallocated.
    pub team: TeamId,
    /// Rounds finalised before `round`.
    pub history: &'a History,
    /// Every opponent's own match set for `round`, before reallocation.
    pub opponents: &'a OpponentMatchSets,
    pub model: Option<&'a dyn OpponentModel>,
    /// Highest goal count predictions are clamped to. The engine overwrites it with its own
    /// configured threshold.
    pub max_goal_threshold: u32,
}

impl<'a> RoundContext<'a> {
    pub fn new(
        round: Round,
        team: TeamId,
        history: &'a History,
        opponents: &'a OpponentMatchSets,
    ) -> Self {
        Self {
            round,
            team,
            history,
            opponents,
            model: None,
            max_goal_threshold: MAX_GOAL_THRESHOLD,
        }
    }

    pub fn with_model(self, model: &'a dyn OpponentModel) -> Self {
        Self {
            model: Some(model),
            ..self
        }
    }

    pub fn with_max_goal_threshold(self, max_goal_threshold: u32) -> Self {
        Self {
            max_goal_threshold,
            ..self
        }
    }
}

/// Order in which outcome groups receive spilled goals.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct SpillOrder(Vec<Outcome>);

impl Default for SpillOrder {
    fn default() -> Self {
        Self(vec![Outcome::Draw, Outcome::Win, Outcome::Loss])
    }
}

impl SpillOrder {
    /// Outcomes left out of `groups` never receive spilled goals.
    pub fn new(groups: impl IntoIterator<Item = Outcome>) -> Self {
        Self(groups.into_iter().collect())
    }

    pub fn groups(&self) -> &[Outcome] {
        &self.0
    }

    pub fn has_duplicates(&self) -> bool {
        !self.0.iter().all_unique()
    }
}

/// Result of one reallocation.
#[derive(Debug, Clone, PartialEq)]
pub enum Reallocation {
    /// A valid candidate that differs from the original.
    Applied(MatchSet),
    /// The original match set, kept for `reason`.
    Unchanged {
        original: MatchSet,
        reason: FallbackReason,
    },
}

impl Reallocation {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }

    pub fn match_set(&self) -> &MatchSet {
        match self {
            Self::Applied(match_set) => match_set,
            Self::Unchanged { original, .. } => original,
        }
    }

    pub fn reason(&self) -> Option<&FallbackReason> {
        match self {
            Self::Applied(_) => None,
            Self::Unchanged { reason, .. } => Some(reason),
        }
    }

    /// The match set the round driver should publish.
    pub fn into_match_set(self) -> MatchSet {
        match self {
            Self::Applied(match_set) => match_set,
            Self::Unchanged { original, .. } => original,
        }
    }
}

/// A lost fixture ranked for receiving pooled goals.
#[derive(Debug, Clone, Copy)]
struct Target {
    opponent: TeamId,
    priority: f64,
    needed: u32,
}

/// Working goal counts of one reallocation pass.
#[derive(Debug)]
struct Ledger<'a> {
    original: &'a MatchSet,
    goals: IndexMap<TeamId, u32>,
    pool: u32,
}

impl<'a> Ledger<'a> {
    fn new(original: &'a MatchSet) -> Self {
        Self {
            original,
            goals: original
                .iter()
                .map(|fixture| (fixture.opponent, fixture.player_goals))
                .collect(),
            pool: 0,
        }
    }

    fn current(&self, fixture: &Match) -> Match {
        fixture.with_player_goals(self.goals(&fixture.opponent))
    }

    fn goals(&self, opponent: &TeamId) -> u32 {
        self.goals.get(opponent).copied().unwrap_or_default()
    }

    fn take(&mut self, opponent: TeamId, amount: u32) {
        if let Some(goals) = self.goals.get_mut(&opponent) {
            *goals -= amount;
            self.pool += amount;
        }
    }

    fn give(&mut self, opponent: TeamId, amount: u32) {
        if let Some(goals) = self.goals.get_mut(&opponent) {
            *goals += amount;
            self.pool -= amount;
        }
    }

    /// Goals `fixture` may still receive while spilling: wins only get back what they gave.
    fn spare_capacity(&self, fixture: &Match, max_goal_threshold: u32) -> u32 {
        let goals = self.goals(&fixture.opponent);
        match fixture.outcome() {
            Outcome::Win => fixture.player_goals.saturating_sub(goals),
            Outcome::Draw | Outcome::Loss => max_goal_threshold.saturating_sub(goals),
        }
    }

    fn into_match_set(self) -> Result<MatchSet, LeagueError> {
        MatchSet::new(self.original.iter().map(|fixture| {
            let goals = self.goals.get(&fixture.opponent).copied().unwrap_or(fixture.player_goals);
            fixture.with_player_goals(goals)
        }))
    }
}

/// Stateless goal reallocation engine, configured once per team.
#[derive(Debug, Clone, Default)]
pub struct ReallocationEngine {
    config: EngineConfig,
    validator: ConstraintValidator,
}

impl ReallocationEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            validator: ConstraintValidator::new(config.max_goal_threshold),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn validator(&self) -> &ConstraintValidator {
        &self.validator
    }

    /// Reallocate `match_set` for `ctx.team`, ordering targets with `policy`.
    ///
    /// If the policy fails on any target the pass is repeated with [`MarginPolicy`].
    pub fn reallocate<P>(&self, ctx: &RoundContext<'_>, match_set: &MatchSet, policy: &P) -> Reallocation
    where
        P: PriorityPolicy + ?Sized,
    {
        let ctx = &ctx.with_max_goal_threshold(self.config.max_goal_threshold);
        let candidate = match self.plan(ctx, match_set, policy) {
            Err(FallbackReason::Policy(error)) => {
                warn!(
                    round = %ctx.round,
                    team = %ctx.team,
                    policy = policy.name(),
                    %error,
                    "priority policy failed, falling back to margin ordering"
                );
                self.plan(ctx, match_set, &MarginPolicy)
            }
            other => other,
        };

        match candidate {
            Ok(candidate) => self.finalise(ctx, match_set, candidate),
            Err(reason) => {
                debug!(round = %ctx.round, team = %ctx.team, %reason, "match set left unchanged");
                Reallocation::Unchanged {
                    original: match_set.clone(),
                    reason,
                }
            }
        }
    }

    /// Goals a fixture contributes to the pool.
    pub fn harvestable(&self, fixture: &Match) -> u32 {
        match fixture.outcome() {
            Outcome::Win => {
                let surplus = fixture.margin().unsigned_abs().saturating_sub(self.config.buffer_margin);
                surplus.min(fixture.half_player_goals())
            }
            Outcome::Draw if self.config.harvest_draws => fixture.half_player_goals(),
            Outcome::Draw | Outcome::Loss => 0,
        }
    }

    /// Whether a one-goal win may be given up: only with a `narrow_win_window` configured,
    /// and only against a rival not ranked above the team within that window.
    pub fn concedes_narrow_win(&self, ctx: &RoundContext<'_>, fixture: &Match) -> bool {
        let Some(window) = self.config.narrow_win_window else {
            return false;
        };
        if fixture.margin() != 1 {
            return false;
        }

        ctx.history
            .latest()
            .and_then(|record| record.average_ranks.neighbours(&ctx.team, window))
            .is_some_and(|neighbours| !neighbours.better.contains(&fixture.opponent))
    }

    fn plan<P>(&self, ctx: &RoundContext<'_>, match_set: &MatchSet, policy: &P) -> Result<MatchSet, FallbackReason>
    where
        P: PriorityPolicy + ?Sized,
    {
        let partition = match_set.partition();
        let mut ledger = Ledger::new(match_set);

        for fixture in partition.wins.iter().chain(&partition.draws) {
            let mut amount = self.harvestable(fixture);
            if self.concedes_narrow_win(ctx, fixture) {
                amount = amount.max(fixture.half_player_goals());
            }
            if amount > 0 {
                ledger.take(fixture.opponent, amount);
                debug!(round = %ctx.round, opponent = %fixture.opponent, amount, "harvested goals");
            }
        }

        if ledger.pool == 0 {
            return Err(FallbackReason::EmptyPool);
        }
        debug!(round = %ctx.round, team = %ctx.team, pool = ledger.pool, "goal pool harvested");

        let targets = self.rank_targets(ctx, &partition, policy)?;
        self.distribute(ctx, &mut ledger, &targets);
        self.spill(ctx, &mut ledger, &partition);

        ledger.into_match_set().map_err(FallbackReason::from)
    }

    fn rank_targets<P>(
        &self,
        ctx: &RoundContext<'_>,
        partition: &Partition,
        policy: &P,
    ) -> Result<Vec<Target>, PolicyError>
    where
        P: PriorityPolicy + ?Sized,
    {
        let draws: &[Match] = if self.config.harvest_draws {
            &[]
        } else {
            &partition.draws
        };

        let mut targets = Vec::new();
        for fixture in partition.losses.iter().chain(draws) {
            let assessment = policy.assess(fixture, ctx)?;
            if assessment.goals_needed == 0 {
                debug!(round = %ctx.round, opponent = %fixture.opponent, "target needs no goals, skipping");
                continue;
            }
            targets.push(Target {
                opponent: fixture.opponent,
                priority: assessment.priority,
                needed: assessment.goals_needed,
            });
        }

        targets.sort_by(|a, b| {
            a.priority
                .total_cmp(&b.priority)
                .then(a.needed.cmp(&b.needed))
                .then(a.opponent.cmp(&b.opponent))
        });
        Ok(targets)
    }

    fn distribute(&self, ctx: &RoundContext<'_>, ledger: &mut Ledger<'_>, targets: &[Target]) {
        for target in targets {
            if ledger.pool == 0 {
                break;
            }

            let capacity = self.config.max_goal_threshold.saturating_sub(ledger.goals(&target.opponent));
            let amount = if ledger.pool >= target.needed && target.needed <= capacity {
                target.needed
            } else {
                ledger.pool.min(capacity)
            };
            if amount == 0 {
                continue;
            }

            ledger.give(target.opponent, amount);
            debug!(
                round = %ctx.round,
                opponent = %target.opponent,
                priority = target.priority,
                needed = target.needed,
                amount,
                remaining = ledger.pool,
                "goals transferred to target"
            );
        }
    }

    fn spill(&self, ctx: &RoundContext<'_>, ledger: &mut Ledger<'_>, partition: &Partition) {
        if ledger.pool == 0 {
            return;
        }

        let order: Vec<Match> = self
            .config
            .spill_order
            .groups()
            .iter()
            .flat_map(|outcome| {
                partition
                    .bucket(*outcome)
                    .iter()
                    .sorted_by(|a, b| {
                        ledger
                            .current(b)
                            .margin()
                            .cmp(&ledger.current(a).margin())
                            .then(a.opponent.cmp(&b.opponent))
                    })
                    .copied()
            })
            .collect();

        while ledger.pool > 0 {
            let mut progressed = false;
            for fixture in &order {
                if ledger.pool == 0 {
                    break;
                }
                if ledger.spare_capacity(fixture, self.config.max_goal_threshold) > 0 {
                    ledger.give(fixture.opponent, 1);
                    progressed = true;
                }
            }

            if !progressed {
                warn!(round = %ctx.round, team = %ctx.team, pool = ledger.pool, "no spare capacity left for spilled goals");
                break;
            }
        }
    }

    fn finalise(&self, ctx: &RoundContext<'_>, original: &MatchSet, candidate: MatchSet) -> Reallocation {
        if let Err(violation) = self.validator.validate(original, &candidate) {
            warn!(round = %ctx.round, team = %ctx.team, %violation, "candidate rejected, keeping original");
            return Reallocation::Unchanged {
                original: original.clone(),
                reason: FallbackReason::Violation(violation),
            };
        }

        if candidate == *original {
            return Reallocation::Unchanged {
                original: original.clone(),
                reason: FallbackReason::NoImprovement,
            };
        }

        info!(
            round = %ctx.round,
            team = %ctx.team,
            wins_before = original.partition().wins.len(),
            wins_after = candidate.partition().wins.len(),
            "reallocation applied"
        );
        Reallocation::Applied(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use goalshift_league::RoundRecord;
    use std::{cell::Cell, collections::BTreeMap};

    fn scores(scores: &[(u32, u32, u32)]) -> MatchSet {
        MatchSet::from_scores(scores.iter().copied()).unwrap()
    }

    fn run(engine: &ReallocationEngine, match_set: &MatchSet) -> Reallocation {
        let history = History::new();
        let opponents = OpponentMatchSets::new();
        let ctx = RoundContext::new(Round(1), TeamId(0), &history, &opponents);
        engine.reallocate(&ctx, match_set, &MarginPolicy)
    }

    /// Ranks targets by descending opponent id.
    struct ReverseIdPolicy;

    impl PriorityPolicy for ReverseIdPolicy {
        fn name(&self) -> &'static str {
            "reverse_id"
        }

        fn priority(&self, target: &Match, _: &RoundContext<'_>) -> Result<f64, PolicyError> {
            Ok(-f64::from(target.opponent.0))
        }
    }

    struct FailingPolicy;

    /// Margin ordering that remembers the goal threshold it was handed.
    #[derive(Default)]
    struct RecordingPolicy {
        threshold: Cell<u32>,
    }

    impl PriorityPolicy for RecordingPolicy {
        fn name(&self) -> &'static str {
            "recording"
        }

        fn priority(&self, target: &Match, ctx: &RoundContext<'_>) -> Result<f64, PolicyError> {
            self.threshold.set(ctx.max_goal_threshold);
            MarginPolicy.priority(target, ctx)
        }
    }

    /// Team 1 above team 0, team 2 below, team 3 last.
    fn ranked_history() -> History {
        let mut history = History::new();
        history
            .push(RoundRecord::new(
                Round(1),
                BTreeMap::new(),
                BTreeMap::from([
                    (TeamId(0), 2.0),
                    (TeamId(1), 1.0),
                    (TeamId(2), 3.0),
                    (TeamId(3), 4.0),
                ]),
            ))
            .unwrap();
        history
    }

    impl PriorityPolicy for FailingPolicy {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn priority(&self, target: &Match, _: &RoundContext<'_>) -> Result<f64, PolicyError> {
            Err(PolicyError::MissingRank(target.opponent))
        }
    }

    #[test]
    fn test_harvestable() {
        let engine = ReallocationEngine::default();
        let harvest = |player, opponent| engine.harvestable(&Match::new(TeamId(1), player, opponent).unwrap());

        assert_eq!(harvest(5, 1), 2);
        assert_eq!(harvest(8, 0), 4);
        assert_eq!(harvest(3, 1), 0);
        assert_eq!(harvest(3, 3), 1);
        assert_eq!(harvest(0, 3), 0);

        let engine = ReallocationEngine::new(EngineConfig {
            harvest_draws: false,
            ..EngineConfig::default()
        });
        assert_eq!(engine.harvestable(&Match::new(TeamId(1), 3, 3).unwrap()), 0);
    }

    #[test]
    fn test_reference_scenario() {
        let original = scores(&[(1, 5, 1), (2, 2, 2), (3, 0, 3)]);

        let result = run(&ReallocationEngine::default(), &original);

        assert_eq!(result, Reallocation::Applied(scores(&[(1, 3, 1), (2, 1, 2), (3, 3, 3)])));
    }

    #[test]
    fn test_empty_pool_is_unchanged() {
        let original = scores(&[(1, 3, 2), (2, 1, 1), (3, 0, 4)]);

        let result = run(&ReallocationEngine::default(), &original);

        assert_eq!(result.reason(), Some(&FallbackReason::EmptyPool));
        assert_eq!(result.into_match_set(), original);
    }

    #[test]
    fn test_surplus_without_targets_returns_to_source() {
        let original = scores(&[(1, 6, 0)]);

        let result = run(&ReallocationEngine::default(), &original);

        assert_eq!(result.reason(), Some(&FallbackReason::NoImprovement));
        assert_eq!(result.match_set(), &original);
    }

    #[test]
    fn test_surplus_without_losses_spills_into_draw() {
        // Pool of 5 shared round-robin, draw first: the draw turns into a win
        let original = scores(&[(1, 6, 0), (2, 4, 4)]);

        let result = run(&ReallocationEngine::default(), &original);

        assert_eq!(result, Reallocation::Applied(scores(&[(1, 5, 0), (2, 5, 4)])));
    }

    #[test]
    fn test_flips_cheapest_loss_first() {
        let original = scores(&[(1, 7, 0), (2, 0, 4), (3, 1, 2)]);

        let result = run(&ReallocationEngine::default(), &original);

        // Pool of 3: 1-2 flips to 3-2, the last goal goes to the next target
        assert_eq!(result, Reallocation::Applied(scores(&[(1, 4, 0), (2, 1, 4), (3, 3, 2)])));
    }

    #[test]
    fn test_partial_transfer_when_pool_short() {
        let original = scores(&[(1, 6, 1), (2, 0, 6)]);

        let result = run(&ReallocationEngine::default(), &original);

        assert_eq!(result, Reallocation::Applied(scores(&[(1, 3, 1), (2, 3, 6)])));
    }

    #[test]
    fn test_custom_policy_order() {
        let original = scores(&[(1, 5, 1), (2, 1, 2), (3, 1, 2)]);
        let history = History::new();
        let opponents = OpponentMatchSets::new();
        let ctx = RoundContext::new(Round(2), TeamId(0), &history, &opponents);

        // Pool of 2 covers one flip; reverse id order picks team 3
        let result = ReallocationEngine::default().reallocate(&ctx, &original, &ReverseIdPolicy);
        assert_eq!(result, Reallocation::Applied(scores(&[(1, 3, 1), (2, 1, 2), (3, 3, 2)])));

        // Margin order breaks the tie on opponent id
        let result = ReallocationEngine::default().reallocate(&ctx, &original, &MarginPolicy);
        assert_eq!(result, Reallocation::Applied(scores(&[(1, 3, 1), (2, 3, 2), (3, 1, 2)])));
    }

    #[test]
    fn test_policy_error_falls_back_to_margin() {
        let original = scores(&[(1, 5, 1), (2, 2, 2), (3, 0, 3)]);
        let history = History::new();
        let opponents = OpponentMatchSets::new();
        let ctx = RoundContext::new(Round(4), TeamId(0), &history, &opponents);

        let result = ReallocationEngine::default().reallocate(&ctx, &original, &FailingPolicy);

        assert_eq!(result, Reallocation::Applied(scores(&[(1, 3, 1), (2, 1, 2), (3, 3, 3)])));
    }

    #[test]
    fn test_draws_become_targets_when_not_harvested() {
        let engine = ReallocationEngine::new(EngineConfig {
            harvest_draws: false,
            ..EngineConfig::default()
        });
        let original = scores(&[(1, 6, 1), (2, 2, 2)]);

        let result = run(&engine, &original);

        // Pool of 3: the draw needs one goal, the other two alternate between draw and win
        assert_eq!(result, Reallocation::Applied(scores(&[(1, 4, 1), (2, 4, 2)])));
    }

    #[test]
    fn test_spill_order_groups() {
        // Pool of 3 and no losses: whichever group spills first ends up with two goals
        let original = scores(&[(1, 5, 1), (2, 2, 2)]);

        let result = run(&ReallocationEngine::default(), &original);
        assert_eq!(result, Reallocation::Applied(scores(&[(1, 4, 1), (2, 3, 2)])));

        let wins_first = ReallocationEngine::new(EngineConfig {
            spill_order: SpillOrder::new([Outcome::Win, Outcome::Draw]),
            ..EngineConfig::default()
        });
        let result = run(&wins_first, &original);
        assert_eq!(result.reason(), Some(&FallbackReason::NoImprovement));
    }

    #[test]
    fn test_spill_prefers_largest_current_margin() {
        let engine = ReallocationEngine::new(EngineConfig {
            buffer_margin: 0,
            spill_order: SpillOrder::new([Outcome::Draw]),
            ..EngineConfig::default()
        });
        // Draws give 2 + 1; the loss needs 3 but only has room for 2
        let original = scores(&[(1, 4, 4), (2, 2, 2), (3, 6, 8)]);

        let result = run(&engine, &original);

        // The last goal goes to 1-2 (margin -1) ahead of 2-4 (margin -2)
        assert_eq!(result, Reallocation::Applied(scores(&[(1, 2, 4), (2, 2, 2), (3, 8, 8)])));
    }

    #[test]
    fn test_policies_see_engine_threshold() {
        let engine = ReallocationEngine::new(EngineConfig {
            max_goal_threshold: 5,
            ..EngineConfig::default()
        });
        let history = History::new();
        let opponents = OpponentMatchSets::new();
        let ctx = RoundContext::new(Round(2), TeamId(0), &history, &opponents);
        let policy = RecordingPolicy::default();

        engine.reallocate(&ctx, &scores(&[(1, 5, 0), (2, 0, 2)]), &policy);

        assert_eq!(ctx.max_goal_threshold, MAX_GOAL_THRESHOLD);
        assert_eq!(policy.threshold.get(), 5);
    }

    #[test]
    fn test_narrow_win_conceded_only_outside_better_window() {
        let engine = ReallocationEngine::new(EngineConfig {
            narrow_win_window: Some(1),
            ..EngineConfig::default()
        });
        let history = ranked_history();
        let opponents = OpponentMatchSets::new();
        let ctx = RoundContext::new(Round(2), TeamId(0), &history, &opponents);

        let narrow = |opponent: u32| Match::new(TeamId(opponent), 3, 2).unwrap();
        assert!(!engine.concedes_narrow_win(&ctx, &narrow(1)));
        assert!(engine.concedes_narrow_win(&ctx, &narrow(2)));
        assert!(!engine.concedes_narrow_win(&ctx, &Match::new(TeamId(2), 4, 2).unwrap()));

        // 3-2 against team 2 gives up one goal, which goes to the loss against team 3
        let original = scores(&[(1, 3, 2), (2, 3, 2), (3, 0, 1)]);
        let result = engine.reallocate(&ctx, &original, &MarginPolicy);
        assert_eq!(result, Reallocation::Applied(scores(&[(1, 3, 2), (2, 2, 2), (3, 1, 1)])));

        // Without the window nothing is harvestable
        let result = ReallocationEngine::default().reallocate(&ctx, &original, &MarginPolicy);
        assert_eq!(result.reason(), Some(&FallbackReason::EmptyPool));
    }

    #[test]
    fn test_narrow_win_kept_without_ranks() {
        let engine = ReallocationEngine::new(EngineConfig {
            narrow_win_window: Some(3),
            ..EngineConfig::default()
        });
        let original = scores(&[(1, 3, 2), (2, 0, 1)]);

        assert_eq!(run(&engine, &original).reason(), Some(&FallbackReason::EmptyPool));
    }
}
