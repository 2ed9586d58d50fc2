//! Missed-task sweep: stale pending occurrences become missed.
//!
//! Contract:
//! - any occurrence whose date has fully elapsed and whose status is
//!   still pending transitions to missed;
//! - idempotent — a second sweep over the same ledger is a no-op;
//! - terminal statuses (completed, skipped, deleted) are never touched;
//! - runs before horizon materialization, so the day's view never shows
//!   stale pending entries from the past.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;
use crate::ledger::{record, FieldCasing, LedgerStore};
use crate::task::TaskStatus;

/// Outcome of one sweep pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepSummary {
    /// Stale pending candidates found across both schema casings.
    pub examined: usize,
    /// Occurrences actually transitioned to missed.
    pub marked_missed: usize,
    pub swept_at: DateTime<Utc>,
}

impl SweepSummary {
    pub fn swept_any(&self) -> bool {
        self.marked_missed > 0
    }
}

/// Transition every pending occurrence dated before `today` to missed.
pub async fn sweep<L: LedgerStore + ?Sized>(
    ledger: &L,
    today: NaiveDate,
    now: DateTime<Utc>,
) -> Result<SweepSummary, LedgerError> {
    let (lower, pascal) = tokio::try_join!(
        ledger.fetch_pending_before(FieldCasing::Lower, today),
        ledger.fetch_pending_before(FieldCasing::Pascal, today),
    )?;

    let mut summary = SweepSummary {
        examined: 0,
        marked_missed: 0,
        swept_at: now,
    };

    let mut seen = std::collections::HashSet::new();
    for doc in lower.into_iter().chain(pascal) {
        if !seen.insert(doc.id.clone()) {
            continue;
        }
        summary.examined += 1;
        let Some(rec) = record::normalize(&doc.id, &doc.doc) else {
            continue;
        };
        // Re-check after normalization: a document can be pending under
        // one casing and terminal under the other; the canonical record
        // decides.
        if rec.status != TaskStatus::Pending {
            continue;
        }
        let mut missed = rec;
        missed.status = TaskStatus::Missed;
        missed.updated_at = now;
        ledger.upsert(&missed).await?;
        summary.marked_missed += 1;
    }

    tracing::debug!(
        examined = summary.examined,
        marked_missed = summary.marked_missed,
        %today,
        "missed-task sweep"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::MemoryLedger;
    use crate::task::{build_task_id, TaskRecord};
    use serde_json::json;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn rec(activity: &str, d: &str, status: TaskStatus) -> TaskRecord {
        TaskRecord {
            id: build_task_id(activity, date(d), None),
            activity_id: activity.into(),
            date: date(d),
            status,
            time: None,
            updated_at: Utc::now(),
        }
    }

    async fn statuses(ledger: &MemoryLedger) -> Vec<(String, TaskStatus)> {
        let mut out: Vec<(String, TaskStatus)> = ledger
            .fetch_all()
            .await
            .unwrap()
            .iter()
            .filter_map(|d| record::normalize(&d.id, &d.doc))
            .map(|r| (r.id, r.status))
            .collect();
        out.sort();
        out
    }

    #[tokio::test]
    async fn stale_pending_becomes_missed() {
        let ledger = MemoryLedger::new();
        ledger.upsert(&rec("a", "2024-05-01", TaskStatus::Pending)).await.unwrap();
        ledger.upsert(&rec("b", "2024-05-03", TaskStatus::Pending)).await.unwrap();

        let summary = sweep(&ledger, date("2024-05-03"), Utc::now()).await.unwrap();
        assert_eq!(summary.marked_missed, 1);

        let st = statuses(&ledger).await;
        assert_eq!(st[0].1, TaskStatus::Missed); // 05-01 elapsed
        assert_eq!(st[1].1, TaskStatus::Pending); // 05-03 is today
    }

    #[tokio::test]
    async fn terminal_statuses_are_never_overwritten() {
        let ledger = MemoryLedger::new();
        ledger.upsert(&rec("a", "2024-05-01", TaskStatus::Completed)).await.unwrap();
        ledger.upsert(&rec("b", "2024-05-01", TaskStatus::Skipped)).await.unwrap();
        ledger.upsert(&rec("c", "2024-05-01", TaskStatus::Deleted)).await.unwrap();

        let summary = sweep(&ledger, date("2024-06-01"), Utc::now()).await.unwrap();
        assert_eq!(summary.marked_missed, 0);
        for (_, status) in statuses(&ledger).await {
            assert!(status.is_terminal());
        }
    }

    #[tokio::test]
    async fn sweep_is_idempotent() {
        let ledger = MemoryLedger::new();
        ledger.upsert(&rec("a", "2024-05-01", TaskStatus::Pending)).await.unwrap();

        let first = sweep(&ledger, date("2024-06-01"), Utc::now()).await.unwrap();
        let second = sweep(&ledger, date("2024-06-01"), Utc::now()).await.unwrap();
        assert_eq!(first.marked_missed, 1);
        assert_eq!(second.marked_missed, 0);
        assert!(!second.swept_any());
    }

    #[tokio::test]
    async fn legacy_pascal_case_documents_are_swept() {
        let ledger = MemoryLedger::new();
        ledger.insert_raw(
            "legacy-1",
            json!({ "ActivityId": "a", "Date": "2024-05-01", "Status": "pending" }),
        );
        let summary = sweep(&ledger, date("2024-06-01"), Utc::now()).await.unwrap();
        assert_eq!(summary.marked_missed, 1);
        let st = statuses(&ledger).await;
        assert_eq!(st[0].1, TaskStatus::Missed);
    }
}
