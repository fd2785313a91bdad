//! Configuration types for goal reallocation strategies.

use crate::engine::SpillOrder;
use goalshift_league::MAX_GOAL_THRESHOLD;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Environment variable naming a JSON file with a [`StrategyConfig`].
pub const CONFIG_ENV_VAR: &str = "GOALSHIFT_CONFIG";

/// Errors raised while loading or checking a [`StrategyConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Parameters of the [`ReallocationEngine`](crate::engine::ReallocationEngine).
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Highest goal count a fixture may hold after reallocation
    pub max_goal_threshold: u32,
    /// Winning margin kept untouched when harvesting surplus from a win
    pub buffer_margin: u32,
    /// Harvest half the goals of drawn fixtures into the pool
    pub harvest_draws: bool,
    /// Order in which leftover goals are spilled back into fixtures
    pub spill_order: SpillOrder,
    /// When set, one-goal wins against rivals not ranked above within this many places
    /// also give up half their goals
    pub narrow_win_window: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_goal_threshold: MAX_GOAL_THRESHOLD,
            buffer_margin: 2,
            harvest_draws: true,
            spill_order: SpillOrder::default(),
            narrow_win_window: None,
        }
    }
}

/// Boundaries used by the margin bucket opponent model.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Wins by more than this many goals count as high-margin wins
    pub win_margin_boundary: u32,
    /// Losses by more than this many goals count as high-margin losses
    pub loss_margin_boundary: u32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            win_margin_boundary: 2,
            loss_margin_boundary: 2,
        }
    }
}

/// Thresholds of the regression-driven priority policy.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RegressionConfig {
    /// Fits with a lower coefficient of determination are ignored (e.g., 0.25 = 25%)
    pub min_r_squared: f64,
    /// Finalised rounds required before the policy is consulted
    pub min_rounds: usize,
}

impl Default for RegressionConfig {
    fn default() -> Self {
        Self {
            min_r_squared: 0.25,
            min_rounds: 3,
        }
    }
}

/// Complete configuration for one team strategy.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct StrategyConfig {
    pub engine: EngineConfig,
    pub model: ModelConfig,
    pub regression: RegressionConfig,
}

impl StrategyConfig {
    /// Parse and validate a JSON document. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate the JSON file at `path`.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Load the file named by `GOALSHIFT_CONFIG`, or `None` when the variable is unset.
    pub fn from_env() -> Result<Option<Self>, ConfigError> {
        match std::env::var(CONFIG_ENV_VAR) {
            Ok(path) if !path.trim().is_empty() => Self::from_path(path.trim()).map(Some),
            _ => Ok(None),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let engine = &self.engine;
        if engine.max_goal_threshold == 0 || engine.max_goal_threshold > MAX_GOAL_THRESHOLD {
            return Err(ConfigError::Invalid(format!(
                "max_goal_threshold must be within 1..={MAX_GOAL_THRESHOLD}, got {}",
                engine.max_goal_threshold
            )));
        }

        if engine.spill_order.has_duplicates() {
            return Err(ConfigError::Invalid(format!(
                "spill_order lists an outcome more than once: {:?}",
                engine.spill_order
            )));
        }

        let min_r_squared = self.regression.min_r_squared;
        if !(0.0..=1.0).contains(&min_r_squared) {
            return Err(ConfigError::Invalid(format!(
                "min_r_squared must be within 0..=1, got {min_r_squared}"
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use goalshift_league::Outcome;

    #[test]
    fn test_default_config() {
        let config = StrategyConfig::default();
        assert_eq!(config.engine.max_goal_threshold, 8);
        assert_eq!(config.engine.buffer_margin, 2);
        assert!(config.engine.harvest_draws);
        assert_eq!(config.engine.narrow_win_window, None);
        assert_eq!(
            config.engine.spill_order.groups(),
            &[Outcome::Draw, Outcome::Win, Outcome::Loss]
        );
        assert_eq!(config.model.win_margin_boundary, 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_json_partial_document() {
        let config = StrategyConfig::from_json(
            r#"{ "engine": { "buffer_margin": 3, "spill_order": ["loss", "draw"], "narrow_win_window": 2 } }"#,
        )
        .unwrap();

        assert_eq!(config.engine.buffer_margin, 3);
        assert_eq!(config.engine.max_goal_threshold, 8);
        assert_eq!(config.engine.spill_order.groups(), &[Outcome::Loss, Outcome::Draw]);
        assert_eq!(config.engine.narrow_win_window, Some(2));
        assert_eq!(config.regression, RegressionConfig::default());
    }

    #[test]
    fn test_from_json_rejects_invalid_values() {
        let threshold = StrategyConfig::from_json(r#"{ "engine": { "max_goal_threshold": 12 } }"#);
        assert!(matches!(threshold, Err(ConfigError::Invalid(_))));

        let r_squared = StrategyConfig::from_json(r#"{ "regression": { "min_r_squared": 1.5 } }"#);
        assert!(matches!(r_squared, Err(ConfigError::Invalid(_))));

        let duplicated =
            StrategyConfig::from_json(r#"{ "engine": { "spill_order": ["win", "win"] } }"#);
        assert!(matches!(duplicated, Err(ConfigError::Invalid(_))));

        let malformed = StrategyConfig::from_json("{ engine: ");
        assert!(matches!(malformed, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_from_path_missing_file() {
        let result = StrategyConfig::from_path("/nonexistent/goalshift.json");
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
