//! The activity list and its read-modify-write transaction.
//!
//! A user's activities are stored as one document (the whole list plus a
//! tombstone list for removed activities). Concurrent editors could
//! silently clobber each other, so every edit goes through
//! [`edit_activities`]: load with a revision token, apply the closure,
//! save conditional on the revision. Conflicts retry a bounded number
//! of times; exhaustion is fatal and nothing is partially applied.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

use crate::activity::Activity;
use crate::error::{CoreError, StoreError};

/// Default conflict retry budget.
pub const DEFAULT_RETRY_BUDGET: u32 = 3;

/// The owner's full activity list at a known revision.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActivityList {
    pub revision: u64,
    pub activities: Vec<Activity>,
    /// Removed activities are tombstoned here, never hard-deleted.
    pub deleted_activities: Vec<Activity>,
}

/// Versioned storage for the activity list.
#[async_trait]
pub trait ActivityStore: Send + Sync {
    async fn load(&self) -> Result<ActivityList, StoreError>;

    /// Save `list` only if the stored revision still equals
    /// `list.revision`; bumps the revision on success.
    async fn save(&self, list: ActivityList) -> Result<(), StoreError>;
}

/// Apply `edit` to the activity list under the optimistic transaction.
///
/// Retries up to `retry_budget` additional times on revision conflict,
/// reloading fresh state each attempt. Exhaustion surfaces as
/// [`CoreError::ConflictExhausted`].
pub async fn edit_activities<S, F>(
    store: &S,
    retry_budget: u32,
    mut edit: F,
) -> Result<(), CoreError>
where
    S: ActivityStore + ?Sized,
    F: FnMut(&mut ActivityList),
{
    for attempt in 0..=retry_budget {
        let mut list = store.load().await?;
        edit(&mut list);
        match store.save(list).await {
            Ok(()) => return Ok(()),
            Err(StoreError::Conflict { .. }) if attempt < retry_budget => {
                tracing::warn!(attempt, "activity list revision conflict, retrying");
            }
            Err(e) => return Err(e.into()),
        }
    }
    Err(CoreError::ConflictExhausted {
        attempts: retry_budget + 1,
    })
}

/// Insert or replace one activity, stamping `last_modified_at`.
pub async fn upsert_activity<S: ActivityStore + ?Sized>(
    store: &S,
    retry_budget: u32,
    activity: Activity,
    now: DateTime<Utc>,
) -> Result<(), CoreError> {
    edit_activities(store, retry_budget, |list| {
        let mut fresh = activity.clone();
        fresh.last_modified_at = Some(now);
        match list.activities.iter_mut().find(|a| a.id == fresh.id) {
            Some(slot) => *slot = fresh,
            None => list.activities.push(fresh),
        }
    })
    .await
}

/// Remove an activity, tombstoning it into `deleted_activities`.
pub async fn remove_activity<S: ActivityStore + ?Sized>(
    store: &S,
    retry_budget: u32,
    activity_id: &str,
) -> Result<(), CoreError> {
    edit_activities(store, retry_budget, |list| {
        let (removed, remaining): (Vec<Activity>, Vec<Activity>) = list
            .activities
            .drain(..)
            .partition(|a| a.id == activity_id);
        list.activities = remaining;
        list.deleted_activities.extend(removed);
    })
    .await
}

/// Reactivate every activity: clear end-before constraints and re-anchor
/// the recurrence origin at `now`.
pub async fn restart_all_activities<S: ActivityStore + ?Sized>(
    store: &S,
    retry_budget: u32,
    now: DateTime<Utc>,
) -> Result<(), CoreError> {
    edit_activities(store, retry_budget, |list| {
        for a in &mut list.activities {
            a.active_status = true;
            a.selected_end_before_date = None;
            a.enabled_at = Some(now);
            a.last_modified_at = Some(now);
        }
    })
    .await
}

/// In-memory activity store.
#[derive(Debug, Default)]
pub struct MemoryActivityStore {
    state: Mutex<ActivityList>,
}

impl MemoryActivityStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ActivityStore for MemoryActivityStore {
    async fn load(&self) -> Result<ActivityList, StoreError> {
        Ok(self.state.lock().expect("activity lock").clone())
    }

    async fn save(&self, list: ActivityList) -> Result<(), StoreError> {
        let mut state = self.state.lock().expect("activity lock");
        if state.revision != list.revision {
            return Err(StoreError::Conflict {
                expected: list.revision,
                found: state.revision,
            });
        }
        *state = ActivityList {
            revision: list.revision + 1,
            ..list
        };
        Ok(())
    }
}
