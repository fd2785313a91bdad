//! Seeded league simulation.
//!
//! Plays a full round-robin league for a handful of rounds. Every team runs a different
//! strategy, reallocates its real goals before publishing, and the published results
//! decide the table.
//!
//! Usage:
//!   RUST_LOG=goalshift_strategy=debug cargo run -p goalshift-strategy --example simulate_league
//!
//! Optional environment variables:
//!   GOALSHIFT_CONFIG=./strategy.json   # StrategyConfig as JSON (default: built-in defaults)

use goalshift_league::{History, Match, MatchSet, OpponentMatchSets, Outcome, Round, RoundRecord, TeamId};
use goalshift_strategy::{StrategyConfig, StrategyKind, TeamStrategy};
use rand::{Rng, SeedableRng, rngs::StdRng};
use std::collections::BTreeMap;
use tracing::{error, info};

const SEED: u64 = 42;
const ROUNDS: u32 = 10;

const STRATEGIES: [StrategyKind; 6] = [
    StrategyKind::Margin,
    StrategyKind::RankDistance,
    StrategyKind::RankWindow { window: 2 },
    StrategyKind::MarkovPredicted,
    StrategyKind::MarginBucketPredicted,
    StrategyKind::Regression,
];

fn main() {
    init_logging();

    let config = match StrategyConfig::from_env() {
        Ok(config) => config.unwrap_or_default(),
        Err(error) => {
            error!(%error, "failed to load strategy config");
            return;
        }
    };

    let mut strategies = STRATEGIES
        .iter()
        .zip(0u32..)
        .map(|(kind, team)| TeamStrategy::from_kind(TeamId(team), *kind, &config))
        .collect::<Vec<_>>();

    let mut rng = StdRng::seed_from_u64(SEED);
    let mut history = History::new();
    let mut points = BTreeMap::<TeamId, u32>::new();

    for round in (1..=ROUNDS).map(Round) {
        let raw = play_round(&mut rng, strategies.len() as u32, config.engine.max_goal_threshold);

        let mut published = BTreeMap::new();
        let mut applied = 0;
        for strategy in &mut strategies {
            let team = strategy.team();
            let Some(original) = raw.get(&team) else {
                continue;
            };
            let opponents: OpponentMatchSets = raw
                .iter()
                .filter(|(other, _)| **other != team)
                .map(|(other, set)| (*other, set.clone()))
                .collect();

            let reallocation = strategy.on_round(round, &history, &opponents, original);
            if reallocation.is_applied() {
                applied += 1;
            }
            published.insert(team, reallocation.into_match_set());
        }

        for (team, set) in &published {
            *points.entry(*team).or_default() += league_points(set);
        }

        let ranks = average_ranks(&history, &points);
        info!(%round, applied, teams = published.len(), "round published");

        if let Err(error) = history.push(RoundRecord::new(round, published, ranks)) {
            error!(%error, "failed to record round");
            return;
        }
    }

    let Some(table) = history.latest().map(|record| &record.average_ranks) else {
        return;
    };
    for team in table.ordered() {
        let kind = STRATEGIES[team.0 as usize];
        info!(
            %team,
            %kind,
            points = points.get(&team).copied().unwrap_or_default(),
            average_rank = table.average_rank(&team).unwrap_or_default(),
            "final standing"
        );
    }
}

/// Every pair of teams meets once with uniformly drawn real scores.
fn play_round(rng: &mut StdRng, teams: u32, max_goals: u32) -> BTreeMap<TeamId, MatchSet> {
    let mut fixtures = BTreeMap::<TeamId, Vec<Match>>::new();

    for home in 0..teams {
        for away in (home + 1)..teams {
            let home_goals = rng.random_range(0..=max_goals.min(5));
            let away_goals = rng.random_range(0..=max_goals.min(5));
            let (Ok(home_fixture), Ok(away_fixture)) = (
                Match::new(TeamId(away), home_goals, away_goals),
                Match::new(TeamId(home), away_goals, home_goals),
            ) else {
                continue;
            };
            fixtures.entry(TeamId(home)).or_default().push(home_fixture);
            fixtures.entry(TeamId(away)).or_default().push(away_fixture);
        }
    }

    fixtures
        .into_iter()
        .filter_map(|(team, matches)| MatchSet::new(matches).ok().map(|set| (team, set)))
        .collect()
}

fn league_points(set: &MatchSet) -> u32 {
    set.iter()
        .map(|fixture| match fixture.outcome() {
            Outcome::Win => 3,
            Outcome::Draw => 1,
            Outcome::Loss => 0,
        })
        .sum()
}

/// Rank by points (ties share the better place), averaged with every previous round.
fn average_ranks(history: &History, points: &BTreeMap<TeamId, u32>) -> BTreeMap<TeamId, f64> {
    let played = history.len() as f64;
    let previous = history.latest().map(|record| &record.average_ranks);

    points
        .iter()
        .map(|(team, own)| {
            let rank = points.values().filter(|other| *other > own).count() as f64 + 1.0;
            let average = previous
                .and_then(|table| table.average_rank(team))
                .map(|old| (old * played + rank) / (played + 1.0))
                .unwrap_or(rank);
            (*team, average)
        })
        .collect()
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::filter::EnvFilter::builder()
                .with_default_directive(tracing_subscriber::filter::LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with_ansi(cfg!(debug_assertions))
        .init()
}
