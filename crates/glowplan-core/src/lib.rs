//! # Glowplan Core Library
//!
//! Core business logic for the Glowplan wellness habit tracker. All
//! operations are available through the standalone `glowplan` CLI; any
//! GUI would be a thin layer over this same library.
//!
//! ## Architecture
//!
//! - **Recurrence**: pure calendar matcher deciding whether an activity
//!   recurs on a given date (daily, weekly, explicit weekdays under two
//!   historical encodings, week-interval gating, month-day filters)
//! - **Materializer**: turns active activities into pending occurrence
//!   stubs over a forward horizon, with deterministic occurrence ids
//! - **Ledger**: persisted status overrides keyed by occurrence id,
//!   queried under both historical field casings and normalized once at
//!   the read boundary
//! - **Reconciler**: merges generated stubs with ledger overrides into
//!   the day view, and carries the status write path
//! - **Sweeper**: stale pending occurrences become missed
//! - **Scoring**: the BMS score series and achievement leveling, both
//!   pure derivations of the reconciled history
//! - **Storage**: SQLite persistence and TOML configuration
//!
//! ## Key Components
//!
//! - [`Activity`]: a recurring habit definition
//! - [`Reconciler`]: day views, history and status writes
//! - [`Database`]: durable ledger and activity-list persistence
//! - [`Config`]: tunable product constants

pub mod activity;
pub mod activity_store;
pub mod config;
pub mod error;
pub mod ledger;
pub mod materializer;
pub mod reconcile;
pub mod recurrence;
pub mod scoring;
pub mod storage;
pub mod sweeper;
pub mod task;

pub use activity::{Activity, ActivityTime};
pub use activity_store::{ActivityList, ActivityStore, MemoryActivityStore};
pub use config::Config;
pub use error::{ConfigError, CoreError, LedgerError, StoreError};
pub use ledger::{FieldCasing, LedgerDoc, LedgerStore, MemoryLedger};
pub use materializer::{ensure_upcoming, materialize, DEFAULT_HORIZON_DAYS};
pub use reconcile::Reconciler;
pub use scoring::achievements::{AchievementProgress, LevelTable, LevelUnlock};
pub use scoring::{bms_series, current_score, ScorePoint, ScoringConfig};
pub use storage::Database;
pub use sweeper::{sweep, SweepSummary};
pub use task::{build_task_id, TaskRecord, TaskStatus};
