//! Fairness checks between a team's original and reallocated match sets.
//!
//! A candidate is accepted only as a whole. Per-fixture rules run first, in the original
//! set's order, and goal conservation is checked last.

use goalshift_league::{MAX_GOAL_THRESHOLD, MatchSet, Outcome, TeamId};
use thiserror::Error;

/// First rule a candidate match set breaks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConstraintViolation {
    #[error("candidate does not cover the same opponents as the original")]
    OpponentsChanged,

    #[error("goals against team {opponent} out of range: {goals} > {max}")]
    GoalsOutOfRange { opponent: TeamId, goals: u32, max: u32 },

    #[error("opponent goals against team {opponent} changed from {original} to {candidate}")]
    OpponentGoalsChanged {
        opponent: TeamId,
        original: u32,
        candidate: u32,
    },

    #[error("win against team {opponent} inflated from {original} to {candidate} goals")]
    WinInflated {
        opponent: TeamId,
        original: u32,
        candidate: u32,
    },

    #[error("goals against team {opponent} fell to {candidate}, below floor {floor}")]
    BelowFloor {
        opponent: TeamId,
        floor: u32,
        candidate: u32,
    },

    #[error("loss against team {opponent} deflated from {original} to {candidate} goals")]
    LossDeflated {
        opponent: TeamId,
        original: u32,
        candidate: u32,
    },

    #[error("total goals not conserved: original {original}, candidate {candidate}")]
    GoalsNotConserved { original: u32, candidate: u32 },
}

impl ConstraintViolation {
    /// Opponent of the offending fixture, if the violation concerns a single fixture.
    pub fn opponent(&self) -> Option<TeamId> {
        match self {
            Self::GoalsOutOfRange { opponent, .. }
            | Self::OpponentGoalsChanged { opponent, .. }
            | Self::WinInflated { opponent, .. }
            | Self::BelowFloor { opponent, .. }
            | Self::LossDeflated { opponent, .. } => Some(*opponent),
            Self::OpponentsChanged | Self::GoalsNotConserved { .. } => None,
        }
    }
}

/// Pure validator of the six fairness rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstraintValidator {
    /// Highest goal count a candidate fixture may hold.
    pub max_goal_threshold: u32,
}

impl Default for ConstraintValidator {
    fn default() -> Self {
        Self {
            max_goal_threshold: MAX_GOAL_THRESHOLD,
        }
    }
}

impl ConstraintValidator {
    pub fn new(max_goal_threshold: u32) -> Self {
        Self { max_goal_threshold }
    }

    pub fn is_valid(&self, original: &MatchSet, candidate: &MatchSet) -> bool {
        self.validate(original, candidate).is_ok()
    }

    /// Check `candidate` against `original`, returning the first violated rule.
    pub fn validate(
        &self,
        original: &MatchSet,
        candidate: &MatchSet,
    ) -> Result<(), ConstraintViolation> {
        if original.len() != candidate.len()
            || original.opponents().any(|opponent| !candidate.contains(opponent))
        {
            return Err(ConstraintViolation::OpponentsChanged);
        }

        for before in original {
            let Some(after) = candidate.get(&before.opponent) else {
                continue;
            };
            let opponent = before.opponent;

            if after.player_goals > self.max_goal_threshold {
                return Err(ConstraintViolation::GoalsOutOfRange {
                    opponent,
                    goals: after.player_goals,
                    max: self.max_goal_threshold,
                });
            }

            if after.opponent_goals != before.opponent_goals {
                return Err(ConstraintViolation::OpponentGoalsChanged {
                    opponent,
                    original: before.opponent_goals,
                    candidate: after.opponent_goals,
                });
            }

            let outcome = before.outcome();
            if outcome == Outcome::Win && after.player_goals > before.player_goals {
                return Err(ConstraintViolation::WinInflated {
                    opponent,
                    original: before.player_goals,
                    candidate: after.player_goals,
                });
            }

            let floor = before.player_goals - before.half_player_goals();
            if outcome != Outcome::Loss && after.player_goals < floor {
                return Err(ConstraintViolation::BelowFloor {
                    opponent,
                    floor,
                    candidate: after.player_goals,
                });
            }

            if outcome == Outcome::Loss && after.player_goals < before.player_goals {
                return Err(ConstraintViolation::LossDeflated {
                    opponent,
                    original: before.player_goals,
                    candidate: after.player_goals,
                });
            }
        }

        let (total_before, total_after) = (original.total_player_goals(), candidate.total_player_goals());
        if total_before != total_after {
            return Err(ConstraintViolation::GoalsNotConserved {
                original: total_before,
                candidate: total_after,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn original() -> MatchSet {
        MatchSet::from_scores([(1, 5, 1), (2, 2, 2), (3, 0, 3)]).unwrap()
    }

    #[test]
    fn test_accepts_identity_and_valid_shift() {
        let validator = ConstraintValidator::default();
        assert!(validator.is_valid(&original(), &original()));

        let candidate = MatchSet::from_scores([(1, 3, 1), (2, 1, 2), (3, 3, 3)]).unwrap();
        assert_eq!(validator.validate(&original(), &candidate), Ok(()));
    }

    #[test]
    fn test_rejects_goals_out_of_range() {
        let validator = ConstraintValidator::new(4);
        let original = MatchSet::from_scores([(1, 5, 1), (2, 0, 3)]).unwrap();
        let candidate = MatchSet::from_scores([(1, 5, 1), (2, 5, 3)]).unwrap();

        assert_eq!(
            validator.validate(&original, &candidate),
            Err(ConstraintViolation::GoalsOutOfRange {
                opponent: TeamId(1),
                goals: 5,
                max: 4
            })
        );
    }

    #[test]
    fn test_rejects_changed_opponent_goals() {
        let candidate = MatchSet::from_scores([(1, 5, 1), (2, 2, 1), (3, 0, 3)]).unwrap();
        let violation = ConstraintValidator::default()
            .validate(&original(), &candidate)
            .unwrap_err();

        assert_eq!(violation.opponent(), Some(TeamId(2)));
        assert!(matches!(violation, ConstraintViolation::OpponentGoalsChanged { .. }));
    }

    #[test]
    fn test_rejects_win_inflation() {
        let original = MatchSet::from_scores([(1, 3, 1), (2, 4, 4)]).unwrap();
        let candidate = MatchSet::from_scores([(1, 4, 1), (2, 3, 4)]).unwrap();

        assert_eq!(
            ConstraintValidator::default().validate(&original, &candidate),
            Err(ConstraintViolation::WinInflated {
                opponent: TeamId(1),
                original: 3,
                candidate: 4
            })
        );
    }

    #[test]
    fn test_rejects_below_floor() {
        // 5 goals may lose at most 2, so the floor is 3
        let candidate = MatchSet::from_scores([(1, 2, 1), (2, 2, 2), (3, 1, 3)]).unwrap();

        assert_eq!(
            ConstraintValidator::default().validate(&original(), &candidate),
            Err(ConstraintViolation::BelowFloor {
                opponent: TeamId(1),
                floor: 3,
                candidate: 2
            })
        );
    }

    #[test]
    fn test_rejects_loss_deflation() {
        let original = MatchSet::from_scores([(1, 2, 4), (2, 1, 4)]).unwrap();
        let candidate = MatchSet::from_scores([(1, 1, 4), (2, 2, 4)]).unwrap();

        assert!(matches!(
            ConstraintValidator::default().validate(&original, &candidate),
            Err(ConstraintViolation::LossDeflated { opponent: TeamId(1), .. })
        ));
    }

    #[test]
    fn test_rejects_unconserved_total_last() {
        let candidate = MatchSet::from_scores([(1, 4, 1), (2, 2, 2), (3, 0, 3)]).unwrap();

        assert_eq!(
            ConstraintValidator::default().validate(&original(), &candidate),
            Err(ConstraintViolation::GoalsNotConserved {
                original: 7,
                candidate: 6
            })
        );
    }

    #[test]
    fn test_rejects_different_opponents() {
        let candidate = MatchSet::from_scores([(1, 5, 1), (2, 2, 2), (4, 0, 3)]).unwrap();

        assert_eq!(
            ConstraintValidator::default().validate(&original(), &candidate),
            Err(ConstraintViolation::OpponentsChanged)
        );
    }
}
