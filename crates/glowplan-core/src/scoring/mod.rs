//! Scoring pipeline: the composite wellness score (BMS) time series and
//! achievement leveling.
//!
//! Both outputs are pure derivations of the reconciled occurrence
//! history and can be recomputed from scratch at any time. Callers may
//! cache the last series value but must not assume incremental-only
//! updates.

pub mod achievements;

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::task::{TaskRecord, TaskStatus};

/// Product constants of the BMS fold. These are configuration, not law —
/// the defaults mirror the shipped values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Per completed occurrence.
    #[serde(default = "default_completed_delta")]
    pub completed_delta: f64,
    /// Per skipped occurrence (negative).
    #[serde(default = "default_skipped_delta")]
    pub skipped_delta: f64,
    /// Absolute bound on one day's delta.
    #[serde(default = "default_daily_clamp")]
    pub daily_clamp: f64,
    /// Base value the fold starts from when the user has no recorded one.
    #[serde(default = "default_base")]
    pub default_base: f64,
}

fn default_completed_delta() -> f64 {
    0.002
}
fn default_skipped_delta() -> f64 {
    -0.003
}
fn default_daily_clamp() -> f64 {
    0.02
}
fn default_base() -> f64 {
    7.0
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            completed_delta: default_completed_delta(),
            skipped_delta: default_skipped_delta(),
            daily_clamp: default_daily_clamp(),
            default_base: default_base(),
        }
    }
}

/// The value scale is fixed: a score always lives in [0, 10].
pub const SCORE_MIN: f64 = 0.0;
pub const SCORE_MAX: f64 = 10.0;

/// One point of the BMS series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScorePoint {
    pub date: NaiveDate,
    /// The day's clamped delta.
    pub delta: f64,
    /// Running value after applying the delta, clamped to [0, 10].
    pub value: f64,
}

/// Fold the occurrence history into the BMS series.
///
/// Occurrences are grouped by date and dates processed in ascending
/// order as a strict left fold from `base`. Completed and skipped
/// entries move the score; missed and deleted contribute nothing.
pub fn bms_series(base: f64, history: &[TaskRecord], cfg: &ScoringConfig) -> Vec<ScorePoint> {
    let mut by_date: BTreeMap<NaiveDate, (usize, usize)> = BTreeMap::new();
    for rec in history {
        let entry = by_date.entry(rec.date).or_default();
        match rec.status {
            TaskStatus::Completed => entry.0 += 1,
            TaskStatus::Skipped => entry.1 += 1,
            _ => {}
        }
    }

    let mut prev = base.clamp(SCORE_MIN, SCORE_MAX);
    let mut series = Vec::with_capacity(by_date.len());
    for (date, (completed, skipped)) in by_date {
        let raw = completed as f64 * cfg.completed_delta + skipped as f64 * cfg.skipped_delta;
        let delta = raw.clamp(-cfg.daily_clamp, cfg.daily_clamp);
        let value = (prev + delta).clamp(SCORE_MIN, SCORE_MAX);
        series.push(ScorePoint { date, delta, value });
        prev = value;
    }
    series
}

/// The current score: the last series value, or `base` with no history.
pub fn current_score(base: f64, history: &[TaskRecord], cfg: &ScoringConfig) -> f64 {
    bms_series(base, history, cfg)
        .last()
        .map(|p| p.value)
        .unwrap_or_else(|| base.clamp(SCORE_MIN, SCORE_MAX))
}
