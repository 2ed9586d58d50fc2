//! Reconciliation: the authoritative occurrence view.
//!
//! Reads fan out both casing-variant ledger queries concurrently and
//! merge the results into a map keyed by document id, so a document
//! that answers under both naming schemes collapses to one entry.
//! Either variant failing fails the whole call — a silently partial
//! merge is worse than an error the caller can retry.
//!
//! The day view merges materialized stubs with the latest ledger
//! overrides per occurrence key. Status strength beats timestamps:
//! a completed or skipped entry is never downgraded by a later pending
//! write (see [`TaskStatus::rank`]).

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, NaiveDate, Utc};

use crate::activity::Activity;
use crate::error::LedgerError;
use crate::ledger::{record, FieldCasing, LedgerDoc, LedgerStore};
use crate::materializer;
use crate::task::{build_task_id, TaskRecord, TaskStatus};

/// Read/write facade over a [`LedgerStore`].
#[derive(Debug)]
pub struct Reconciler<L> {
    ledger: L,
}

impl<L: LedgerStore> Reconciler<L> {
    pub fn new(ledger: L) -> Self {
        Self { ledger }
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Occurrences updated after `since`, ascending by update time.
    pub async fn updates_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<TaskRecord>, LedgerError> {
        let (lower, pascal) = tokio::try_join!(
            self.ledger.fetch_since(FieldCasing::Lower, since),
            self.ledger.fetch_since(FieldCasing::Pascal, since),
        )?;
        let mut items = dedup_by_id(lower, pascal);
        items.sort_by_key(|r| r.updated_at);
        Ok(items)
    }

    /// Occurrences dated within `from..=to`, ascending by calendar date
    /// (then update time).
    pub async fn updates_in_range(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<TaskRecord>, LedgerError> {
        let (lower, pascal) = tokio::try_join!(
            self.ledger.fetch_range(FieldCasing::Lower, from, to),
            self.ledger.fetch_range(FieldCasing::Pascal, from, to),
        )?;
        let mut items = dedup_by_id(lower, pascal);
        items.sort_by_key(|r| (r.date, r.updated_at));
        Ok(items)
    }

    /// The full normalized occurrence history.
    pub async fn history(&self) -> Result<Vec<TaskRecord>, LedgerError> {
        let docs = self.ledger.fetch_all().await?;
        let mut items: Vec<TaskRecord> = docs
            .iter()
            .filter_map(|d| record::normalize(&d.id, &d.doc))
            .collect();
        items.sort_by_key(|r| (r.date, r.updated_at));
        Ok(items)
    }

    /// The authoritative occurrence list for one day: materialized stubs
    /// merged with that day's ledger overrides.
    pub async fn day_view(
        &self,
        activities: &[Activity],
        date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<Vec<TaskRecord>, LedgerError> {
        let scheduled = materializer::materialize(activities, date, now);
        let updates = self.updates_in_range(date, date).await?;
        Ok(merge_day_view(scheduled, &updates, activities))
    }

    /// Write path: record `status` for an occurrence as a single-document
    /// merge upsert at the deterministic id. The pending stub need not
    /// pre-exist.
    pub async fn set_status(
        &self,
        task: &TaskRecord,
        status: TaskStatus,
        now: DateTime<Utc>,
    ) -> Result<TaskRecord, LedgerError> {
        let mut rec = task.clone();
        if rec.id.is_empty() {
            rec.id = build_task_id(&rec.activity_id, rec.date, rec.time);
        }
        rec.status = status;
        rec.updated_at = now;
        self.ledger.upsert(&rec).await?;
        tracing::debug!(id = %rec.id, ?status, "status recorded");
        Ok(rec)
    }

    pub async fn complete(
        &self,
        task: &TaskRecord,
        now: DateTime<Utc>,
    ) -> Result<TaskRecord, LedgerError> {
        self.set_status(task, TaskStatus::Completed, now).await
    }

    pub async fn skip(
        &self,
        task: &TaskRecord,
        now: DateTime<Utc>,
    ) -> Result<TaskRecord, LedgerError> {
        self.set_status(task, TaskStatus::Skipped, now).await
    }

    /// Tombstone the still-pending occurrences of a removed activity from
    /// `from` onward. Terminal statuses are left as history.
    pub async fn tombstone_activity(
        &self,
        activity_id: &str,
        from: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<usize, LedgerError> {
        let history = self.history().await?;
        let mut tombstoned = 0;
        for rec in history {
            if rec.activity_id == activity_id && rec.date >= from && rec.status == TaskStatus::Pending
            {
                self.set_status(&rec, TaskStatus::Deleted, now).await?;
                tombstoned += 1;
            }
        }
        tracing::debug!(activity_id, tombstoned, "activity occurrences tombstoned");
        Ok(tombstoned)
    }
}

fn dedup_by_id(lower: Vec<LedgerDoc>, pascal: Vec<LedgerDoc>) -> Vec<TaskRecord> {
    let mut map = BTreeMap::new();
    for d in lower.into_iter().chain(pascal) {
        if let Some(rec) = record::normalize(&d.id, &d.doc) {
            map.insert(d.id, rec);
        }
    }
    map.into_values().collect()
}

/// Keep only the strongest/latest override per occurrence key.
///
/// Strength first ([`TaskStatus::rank`]), update time as the tiebreaker.
/// A completed entry therefore survives a later pending re-write.
pub fn pick_latest(updates: &[TaskRecord]) -> HashMap<String, TaskRecord> {
    let mut map: HashMap<String, TaskRecord> = HashMap::new();
    for u in updates {
        let key = u.merge_key();
        match map.get(&key) {
            None => {
                map.insert(key, u.clone());
            }
            Some(prev) => {
                let (pr, cr) = (prev.status.rank(), u.status.rank());
                if cr > pr || (cr == pr && u.updated_at >= prev.updated_at) {
                    map.insert(key, u.clone());
                }
            }
        }
    }
    map
}

/// Merge materialized stubs with ledger overrides into the day's
/// authoritative list.
///
/// - A stub adopts the strongest override for its key; legacy time-less
///   overrides match timed stubs through the date-only key.
/// - Overrides with no matching stub (one-time entries) are appended.
/// - Orphan pending entries whose activity no longer exists are dropped.
/// - Output is ordered by time, time-less entries last.
pub fn merge_day_view(
    scheduled: Vec<TaskRecord>,
    updates: &[TaskRecord],
    activities: &[Activity],
) -> Vec<TaskRecord> {
    let latest = pick_latest(updates);
    let known_ids: HashSet<&str> = activities.iter().map(|a| a.id.as_str()).collect();

    let mut out: Vec<TaskRecord> = Vec::with_capacity(scheduled.len());
    let mut seen_keys: HashSet<String> = HashSet::new();

    for stub in scheduled {
        seen_keys.insert(stub.merge_key());
        seen_keys.insert(stub.merge_key_dateonly());
        let upd = latest
            .get(&stub.merge_key())
            .or_else(|| latest.get(&stub.merge_key_dateonly()));
        out.push(match upd {
            Some(u) => TaskRecord {
                id: u.id.clone(),
                status: u.status,
                updated_at: u.updated_at,
                time: u.time.or(stub.time),
                ..stub
            },
            None => stub,
        });
    }

    for u in updates {
        if seen_keys.contains(&u.merge_key()) || seen_keys.contains(&u.merge_key_dateonly()) {
            continue;
        }
        seen_keys.insert(u.merge_key());
        seen_keys.insert(u.merge_key_dateonly());
        out.push(u.clone());
    }

    out.retain(|t| t.status != TaskStatus::Pending || known_ids.contains(t.activity_id.as_str()));
    out.sort_by_key(TaskRecord::time_sort_key);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::ActivityTime;
    use crate::ledger::MemoryLedger;
    use chrono::TimeZone;
    use serde_json::json;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn ts(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(ms).unwrap()
    }

    fn task(id: &str, activity: &str, d: &str, status: TaskStatus, at: i64) -> TaskRecord {
        TaskRecord {
            id: id.into(),
            activity_id: activity.into(),
            date: date(d),
            status,
            time: None,
            updated_at: ts(at),
        }
    }

    fn activity(id: &str) -> Activity {
        Activity {
            id: id.into(),
            active_status: true,
            ..Activity::default()
        }
    }

    #[test]
    fn keeps_latest_status_for_same_key() {
        let scheduled = vec![task("A-2025-10-31", "A", "2025-10-31", TaskStatus::Pending, 0)];
        let older = task("random-1", "A", "2025-10-31", TaskStatus::Pending, 1);
        let newer = task("random-2", "A", "2025-10-31", TaskStatus::Completed, 2);
        let merged = merge_day_view(scheduled, &[older, newer], &[activity("A")]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].status, TaskStatus::Completed);
    }

    #[test]
    fn adds_one_time_updates_without_stub() {
        let upd = task("one-1", "B", "2025-10-31", TaskStatus::Completed, 5);
        let merged = merge_day_view(vec![], &[upd], &[]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].id, "one-1");
    }

    #[test]
    fn timeless_legacy_update_matches_timed_stub() {
        let mut stub = task("A-2025-10-31-0600", "A", "2025-10-31", TaskStatus::Pending, 0);
        stub.time = Some(ActivityTime { hour: 6, minute: 0 });
        let upd = task("random-3", "A", "2025-10-31", TaskStatus::Completed, 10);
        let merged = merge_day_view(vec![stub], &[upd], &[activity("A")]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].status, TaskStatus::Completed);
        // Stub's time survives the time-less override.
        assert_eq!(merged[0].time, Some(ActivityTime { hour: 6, minute: 0 }));
    }

    #[test]
    fn completed_beats_later_pending() {
        let scheduled = vec![task("A-2025-10-31", "A", "2025-10-31", TaskStatus::Pending, 0)];
        let completed = task("u1", "A", "2025-10-31", TaskStatus::Completed, 1000);
        let later_pending = task("u2", "A", "2025-10-31", TaskStatus::Pending, 2000);
        let merged = merge_day_view(scheduled, &[completed, later_pending], &[activity("A")]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].status, TaskStatus::Completed);
    }

    #[test]
    fn orphan_pending_updates_are_dropped() {
        let upd = task("u1", "ghost", "2025-10-31", TaskStatus::Pending, 10);
        let done = task("u2", "ghost2", "2025-10-31", TaskStatus::Completed, 10);
        let merged = merge_day_view(vec![], &[upd, done], &[]);
        // Pending orphan vanishes; completed history is kept.
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].id, "u2");
    }

    #[tokio::test]
    async fn dual_schema_document_collapses_to_one_entry() {
        let ledger = MemoryLedger::new();
        // One logical occurrence written once by each schema generation,
        // both landing at the shared deterministic id.
        ledger.insert_raw(
            "A-2024-06-01",
            json!({
                "date": "2024-06-01",
                "Date": "2024-06-01",
                "status": "completed",
                "Status": "completed",
                "activityId": "A",
            }),
        );
        let rec = Reconciler::new(ledger);
        let items = rec
            .updates_in_range(date("2024-06-01"), date("2024-06-01"))
            .await
            .unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, "A-2024-06-01");
        assert_eq!(items[0].status, TaskStatus::Completed);
    }

    #[tokio::test]
    async fn range_query_sees_both_casings() {
        let ledger = MemoryLedger::new();
        ledger.insert_raw("new-doc", json!({ "date": "2024-06-01", "status": "completed" }));
        ledger.insert_raw("old-doc", json!({ "Date": "2024-06-01", "Status": "skipped" }));
        let rec = Reconciler::new(ledger);
        let items = rec
            .updates_in_range(date("2024-06-01"), date("2024-06-01"))
            .await
            .unwrap();
        assert_eq!(items.len(), 2);
    }

    #[tokio::test]
    async fn since_query_orders_by_update_time() {
        let ledger = MemoryLedger::new();
        ledger.insert_raw(
            "b",
            json!({ "date": "2024-06-02", "status": "completed", "updatedAt": "2024-06-02T10:00:00Z" }),
        );
        ledger.insert_raw(
            "a",
            json!({ "Date": "2024-06-01", "Status": "completed", "UpdatedAt": "2024-06-01T10:00:00Z" }),
        );
        let rec = Reconciler::new(ledger);
        let items = rec.updates_since(ts(0)).await.unwrap();
        assert_eq!(items.len(), 2);
        assert!(items[0].updated_at < items[1].updated_at);
    }

    #[tokio::test]
    async fn write_path_needs_no_preexisting_stub() {
        let ledger = MemoryLedger::new();
        let rec = Reconciler::new(ledger);
        let task = TaskRecord {
            id: String::new(),
            activity_id: "A".into(),
            date: date("2024-06-01"),
            status: TaskStatus::Pending,
            time: None,
            updated_at: ts(0),
        };
        let written = rec.complete(&task, ts(500)).await.unwrap();
        assert_eq!(written.id, "A-2024-06-01");
        let items = rec
            .updates_in_range(date("2024-06-01"), date("2024-06-01"))
            .await
            .unwrap();
        assert_eq!(items[0].status, TaskStatus::Completed);
        assert_eq!(items[0].updated_at, ts(500));
    }

    #[tokio::test]
    async fn tombstone_leaves_terminal_history() {
        let ledger = MemoryLedger::new();
        let rec = Reconciler::new(ledger);
        let mk = |d: &str, status| TaskRecord {
            id: format!("A-{d}"),
            activity_id: "A".into(),
            date: date(d),
            status,
            time: None,
            updated_at: ts(0),
        };
        rec.ledger().upsert(&mk("2024-06-01", TaskStatus::Completed)).await.unwrap();
        rec.ledger().upsert(&mk("2024-06-02", TaskStatus::Pending)).await.unwrap();
        rec.ledger().upsert(&mk("2024-06-03", TaskStatus::Pending)).await.unwrap();

        let n = rec.tombstone_activity("A", date("2024-06-02"), ts(10)).await.unwrap();
        assert_eq!(n, 2);
        let all = rec.history().await.unwrap();
        assert_eq!(all[0].status, TaskStatus::Completed);
        assert_eq!(all[1].status, TaskStatus::Deleted);
        assert_eq!(all[2].status, TaskStatus::Deleted);
    }
}
