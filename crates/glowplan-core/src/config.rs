//! TOML-based application configuration.
//!
//! Holds the tunable product constants:
//! - scoring deltas and clamps
//! - the achievement level table
//! - the materialization horizon
//! - the activity-edit conflict retry budget
//!
//! Every field defaults to the shipped value, so an empty or partial
//! file is valid. Paths are explicit; callers decide where the file
//! lives (the CLI resolves it from a flag or `GLOWPLAN_CONFIG`).

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::activity_store::DEFAULT_RETRY_BUDGET;
use crate::error::ConfigError;
use crate::materializer::DEFAULT_HORIZON_DAYS;
use crate::scoring::achievements::{LevelCfg, LevelTable};
use crate::scoring::ScoringConfig;

/// Scheduling configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulingConfig {
    /// Days ahead of today to materialize pending occurrences.
    #[serde(default = "default_horizon_days")]
    pub horizon_days: u32,
    /// Retries allowed on an activity-list revision conflict.
    #[serde(default = "default_retry_budget")]
    pub retry_budget: u32,
}

fn default_horizon_days() -> u32 {
    DEFAULT_HORIZON_DAYS
}
fn default_retry_budget() -> u32 {
    DEFAULT_RETRY_BUDGET
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            horizon_days: default_horizon_days(),
            retry_budget: default_retry_budget(),
        }
    }
}

/// Application configuration, serialized to and from TOML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub scheduling: SchedulingConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
    /// Achievement thresholds; omitted rows fall back to the shipped table.
    #[serde(default = "default_levels")]
    pub levels: Vec<LevelCfg>,
}

fn default_levels() -> Vec<LevelCfg> {
    LevelTable::default().rows().to_vec()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scheduling: SchedulingConfig::default(),
            scoring: ScoringConfig::default(),
            levels: default_levels(),
        }
    }
}

impl Config {
    /// Load from `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::LoadFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        toml::from_str(&raw)
            .map_err(|e| ConfigError::ParseFailed(format!("{}: {e}", path.display())))
    }

    /// Persist to `path`, creating parent directories as needed.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let raw = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::SaveFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        }
        std::fs::write(path, raw).map_err(|e| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// The level table described by this configuration.
    pub fn level_table(&self) -> LevelTable {
        LevelTable::new(self.levels.clone())
    }
}
