//! Training configuration
//!
//! Everything a run needs besides the environment itself, loadable from a
//! JSON document. Missing fields fall back to their defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use tilerl_core::{RLError, Result};

use crate::sarsa::SarsaConfig;
use crate::schedule::ScheduleConfig;
use crate::tile_coding::TileCoding;

/// A group of identical tilings over the masked dimensions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TilingSpec {
    /// Dimensions taking part
    pub dimension_mask: Vec<bool>,
    /// Tile width per dimension
    pub widths: Vec<f64>,
    /// Number of randomly offset copies
    #[serde(default = "default_count")]
    pub count: usize,
}

fn default_count() -> usize {
    1
}

impl TilingSpec {
    /// Tiling group over every dimension with the same width
    pub fn uniform(dims: usize, width: f64, count: usize) -> Self {
        Self {
            dimension_mask: vec![true; dims],
            widths: vec![width; dims],
            count,
        }
    }

    /// Add this group to `tile_coding`
    pub fn apply(&self, tile_coding: &mut TileCoding) -> Result<()> {
        tile_coding.add_tiling(&self.dimension_mask, &self.widths, self.count)
    }
}

/// Build a tile coding from a list of tiling groups
pub fn build_tile_coding(specs: &[TilingSpec], seed: Option<u64>) -> Result<TileCoding> {
    let mut tc = match seed {
        Some(seed) => TileCoding::with_seed(seed),
        None => TileCoding::new(),
    };
    for spec in specs {
        spec.apply(&mut tc)?;
    }
    Ok(tc)
}

/// Full description of a training run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Number of learning episodes
    pub episodes: usize,
    /// Step budget per episode; `None` runs until termination
    pub max_steps: Option<usize>,
    /// Log a summary every this many episodes
    pub log_interval: usize,
    /// Seed for tiling offsets and exploration
    pub seed: Option<u64>,
    /// Exploration rate per episode
    pub epsilon_schedule: ScheduleConfig,
    /// Learner hyperparameters
    pub sarsa: SarsaConfig,
    /// Tiling groups; empty means the environment preset
    pub tilings: Vec<TilingSpec>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            episodes: 100,
            max_steps: Some(10_000),
            log_interval: 10,
            seed: None,
            epsilon_schedule: ScheduleConfig::default(),
            sarsa: SarsaConfig::default(),
            tilings: Vec::new(),
        }
    }
}

impl TrainingConfig {
    /// Read a configuration from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        info!("Loaded training config from {:?}", path);
        Ok(config)
    }

    /// Check the run parameters and the learner hyperparameters
    pub fn validate(&self) -> Result<()> {
        if self.log_interval == 0 {
            return Err(RLError::InvalidConfig("log_interval must be at least 1".into()));
        }
        if let ScheduleConfig::Exponential { decay, .. } = self.epsilon_schedule {
            if !(decay > 0.0 && decay <= 1.0) {
                return Err(RLError::InvalidConfig(format!(
                    "exponential decay must lie in (0, 1], got {decay}"
                )));
            }
        }
        self.sarsa.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let cfg: TrainingConfig = serde_json::from_str(
            r#"{
                "episodes": 50,
                "sarsa": { "alpha": 0.05 },
                "tilings": [ { "dimension_mask": [true, false], "widths": [0.5, 1.0], "count": 8 } ]
            }"#,
        )
        .unwrap();
        assert_eq!(cfg.episodes, 50);
        assert_eq!(cfg.max_steps, Some(10_000));
        assert!((cfg.sarsa.alpha - 0.05).abs() < f64::EPSILON);
        assert!((cfg.sarsa.gamma - 0.95).abs() < f64::EPSILON);
        assert_eq!(cfg.tilings[0].count, 8);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_build_tile_coding() {
        let specs = vec![TilingSpec::uniform(2, 0.5, 3), TilingSpec {
            dimension_mask: vec![false, true],
            widths: vec![1.0, 0.25],
            count: 2,
        }];
        let tc = build_tile_coding(&specs, Some(5)).unwrap();
        assert_eq!(tc.num_tilings(), 5);

        let bad = vec![TilingSpec::uniform(2, 0.5, 1), TilingSpec::uniform(3, 0.5, 1)];
        assert!(build_tile_coding(&bad, Some(5)).is_err());
    }

    #[test]
    fn test_validate_rejects_zero_log_interval() {
        let cfg = TrainingConfig {
            log_interval: 0,
            ..TrainingConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(RLError::InvalidConfig(_))));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("train.json");
        std::fs::write(&path, r#"{ "episodes": 3, "seed": 7 }"#).unwrap();
        let cfg = TrainingConfig::from_file(&path).unwrap();
        assert_eq!(cfg.episodes, 3);
        assert_eq!(cfg.seed, Some(7));
    }
}
