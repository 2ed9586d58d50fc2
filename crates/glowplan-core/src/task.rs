//! Task occurrences: one dated instantiation of an activity.
//!
//! Occurrence identity is deterministic: the same `(activity, date,
//! time)` always produces the same id, which is what makes horizon
//! re-materialization and status writes idempotent — writing twice at
//! the same id merges instead of duplicating.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::activity::{Activity, ActivityTime};

/// Lifecycle status of an occurrence. Occurrences are never hard-deleted,
/// only status-transitioned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Completed,
    Skipped,
    Missed,
    Deleted,
}

impl TaskStatus {
    /// Terminal statuses are user (or tombstone) decisions and must never
    /// be overwritten by the sweeper or a later pending write.
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Skipped | TaskStatus::Deleted)
    }

    /// Merge strength: when several ledger entries collapse onto one
    /// occurrence key, the stronger status wins regardless of timestamps.
    pub fn rank(self) -> u8 {
        match self {
            TaskStatus::Completed | TaskStatus::Skipped => 3,
            TaskStatus::Missed => 2,
            TaskStatus::Pending => 1,
            TaskStatus::Deleted => 0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Completed => "completed",
            TaskStatus::Skipped => "skipped",
            TaskStatus::Missed => "missed",
            TaskStatus::Deleted => "deleted",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(TaskStatus::Pending),
            "completed" => Ok(TaskStatus::Completed),
            "skipped" => Ok(TaskStatus::Skipped),
            "missed" => Ok(TaskStatus::Missed),
            "deleted" => Ok(TaskStatus::Deleted),
            other => Err(format!("unknown status '{other}'")),
        }
    }
}

/// A single materialized/persisted occurrence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    /// Deterministic composite id, see [`build_task_id`].
    pub id: String,
    #[serde(rename = "activityId")]
    pub activity_id: String,
    /// Civil date (stored as YYYY-MM-DD on the wire).
    pub date: NaiveDate,
    pub status: TaskStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<ActivityTime>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

/// Build the deterministic occurrence id:
/// `{activityId}-{YYYY-MM-DD}` with `-{HHMM}` appended when timed.
pub fn build_task_id(activity_id: &str, date: NaiveDate, time: Option<ActivityTime>) -> String {
    match time {
        Some(t) => format!("{}-{}-{:02}{:02}", activity_id, date.format("%Y-%m-%d"), t.hour, t.minute),
        None => format!("{}-{}", activity_id, date.format("%Y-%m-%d")),
    }
}

impl TaskRecord {
    /// A fresh pending stub for `activity` on `date`.
    pub fn stub(activity: &Activity, date: NaiveDate, now: DateTime<Utc>) -> Self {
        Self {
            id: build_task_id(&activity.id, date, activity.time),
            activity_id: activity.id.clone(),
            date,
            status: TaskStatus::Pending,
            time: activity.time,
            updated_at: now,
        }
    }

    /// Occurrence key including the time component.
    pub fn merge_key(&self) -> String {
        match self.time {
            Some(t) => format!("{}|{}|{:02}{:02}", self.activity_id, self.date, t.hour, t.minute),
            None => self.merge_key_dateonly(),
        }
    }

    /// Time-less occurrence key. Legacy ledger entries were written
    /// without a time even for timed activities; this key lets them
    /// still land on the timed stub.
    pub fn merge_key_dateonly(&self) -> String {
        format!("{}|{}|", self.activity_id, self.date)
    }

    /// Sort key for display ordering: ascending (hour, minute), with
    /// time-less occurrences last.
    pub fn time_sort_key(&self) -> (u32, u32) {
        match self.time {
            Some(t) => (t.hour, t.minute),
            None => (24, 0),
        }
    }
}
