//! Achievement leveling over the lifetime completed counter.
//!
//! The level table is configuration. `current_level` is the highest
//! level whose threshold the counter has reached (level 1 when none
//! has). Unlock events are de-duplicated through the `last_seen_level`
//! watermark: one event per crossing, for the level actually reached,
//! and the watermark advances straight to it — never level by level.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::task::{TaskRecord, TaskStatus};

/// One row of the level table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelCfg {
    pub level: u32,
    /// Lifetime completed occurrences required to hold this level.
    pub required: u64,
}

/// Ascending level thresholds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelTable(Vec<LevelCfg>);

impl Default for LevelTable {
    /// The shipped product table.
    fn default() -> Self {
        Self(vec![
            LevelCfg { level: 1, required: 0 },
            LevelCfg { level: 2, required: 5 },
            LevelCfg { level: 3, required: 15 },
            LevelCfg { level: 4, required: 30 },
            LevelCfg { level: 5, required: 60 },
            LevelCfg { level: 6, required: 100 },
            LevelCfg { level: 7, required: 150 },
            LevelCfg { level: 8, required: 220 },
            LevelCfg { level: 9, required: 300 },
        ])
    }
}

impl LevelTable {
    /// Build a table from rows, sorting by threshold.
    pub fn new(mut rows: Vec<LevelCfg>) -> Self {
        rows.sort_by_key(|r| (r.required, r.level));
        Self(rows)
    }

    pub fn rows(&self) -> &[LevelCfg] {
        &self.0
    }

    /// Highest level whose threshold is within `completed`; level 1 when
    /// the counter hasn't reached any threshold.
    pub fn current_level(&self, completed: u64) -> u32 {
        self.0
            .iter()
            .rev()
            .find(|row| completed >= row.required)
            .map(|row| row.level)
            .unwrap_or(1)
    }

    /// Threshold for `level`; clamps past the table's ends.
    pub fn threshold(&self, level: u32) -> u64 {
        if level == 0 {
            return 0;
        }
        self.0
            .iter()
            .find(|row| row.level == level)
            .or_else(|| self.0.last())
            .map(|row| row.required)
            .unwrap_or(0)
    }

    /// Fractional progress from the current level's threshold to the
    /// next, clamped to [0, 1]. Reports 1 at the top of the table.
    pub fn progress_to_next(&self, completed: u64) -> f64 {
        let current = self.current_level(completed);
        let current_threshold = self.threshold(current);
        let next_threshold = self.threshold(current + 1);
        if next_threshold == current_threshold {
            return 1.0;
        }
        let progress = (completed as f64 - current_threshold as f64)
            / (next_threshold as f64 - current_threshold as f64);
        progress.clamp(0.0, 1.0)
    }
}

/// Lifetime completed occurrences in `history`. Monotonic as long as
/// completed entries are never erased — and they never are, statuses
/// only transition.
pub fn completed_count(history: &[TaskRecord]) -> u64 {
    history
        .iter()
        .filter(|r| r.status == TaskStatus::Completed)
        .count() as u64
}

/// A level crossing the user has not been shown yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelUnlock {
    pub level: u32,
    pub at: DateTime<Utc>,
}

/// Persisted achievement state. Everything except `last_seen_level` is a
/// pure derivation; the watermark is the one independently stored field
/// (written through [`AchievementProgress::take_unlock`] or the external
/// acknowledge).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AchievementProgress {
    pub total_completed: u64,
    pub current_level: u32,
    /// Unlock watermark: the last level the user has been shown.
    pub last_seen_level: u32,
    /// When each level was first reached.
    pub level_unlock_dates: BTreeMap<u32, DateTime<Utc>>,
    pub last_updated: DateTime<Utc>,
}

impl AchievementProgress {
    /// Recompute the derived fields from `history`, carrying the
    /// watermark and unlock dates over from `prev`.
    pub fn recompute(
        history: &[TaskRecord],
        table: &LevelTable,
        prev: Option<&AchievementProgress>,
        now: DateTime<Utc>,
    ) -> Self {
        let total_completed = completed_count(history);
        let current_level = table.current_level(total_completed);
        let mut level_unlock_dates = prev
            .map(|p| p.level_unlock_dates.clone())
            .unwrap_or_default();
        level_unlock_dates.entry(current_level).or_insert(now);
        Self {
            total_completed,
            current_level,
            last_seen_level: prev.map(|p| p.last_seen_level).unwrap_or(0),
            level_unlock_dates,
            last_updated: now,
        }
    }

    /// Fire the pending unlock event, if any, and advance the watermark.
    ///
    /// Returns at most one event no matter how many thresholds were
    /// crossed since the watermark — the event names the level actually
    /// reached, and the watermark jumps straight to it.
    pub fn take_unlock(&mut self, now: DateTime<Utc>) -> Option<LevelUnlock> {
        if self.current_level > self.last_seen_level {
            self.last_seen_level = self.current_level;
            Some(LevelUnlock {
                level: self.current_level,
                at: now,
            })
        } else {
            None
        }
    }

    /// External acknowledgement: the reporting UI has shown the current
    /// level. The only externally writable scoring field.
    pub fn acknowledge(&mut self) {
        self.last_seen_level = self.current_level;
    }

    pub fn progress_to_next(&self, table: &LevelTable) -> f64 {
        table.progress_to_next(self.total_completed)
    }
}
