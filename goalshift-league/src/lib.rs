//! League data model for the goalshift reallocation workspace.
//!
//! A league is played in rounds. In every round each team plays one [`Match`] against every
//! other team; a team's fixtures for a round form its [`MatchSet`]. Once a round is
//! finalised the round driver appends a [`RoundRecord`] to the [`History`], including the
//! average-rank [`RankingTable`] strategies use to choose which rivals to target.
//!
//! # Key Components
//!
//! - [`Match`]: immutable snapshot of one fixture, with derived [`Outcome`] and margin
//! - [`MatchSet`]: ordered, duplicate-free fixtures of one team for one round
//! - [`History`]: append-only round records
//! - [`RankingTable`]: average ranks, ranking distance and rank windows

pub mod error;
pub mod fixture;
pub mod history;
pub mod id;
pub mod match_set;
pub mod ranking;

pub use error::LeagueError;
pub use fixture::{MAX_GOAL_THRESHOLD, Match, Outcome};
pub use history::{History, OpponentMatchSets, RoundRecord};
pub use id::{Round, TeamId};
pub use match_set::{MatchSet, Partition};
pub use ranking::{RankWindow, RankingTable};
