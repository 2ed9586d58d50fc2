//! Materialization: expanding recurrence rules into dated occurrence stubs.
//!
//! [`materialize`] is pure and total: identical inputs always produce an
//! identical, identically-ordered list. The ordering (ascending by time,
//! time-less last) is a user-facing contract — "today's plan" must not
//! reorder on refresh.
//!
//! [`ensure_upcoming`] is the rolling-horizon driver: it walks a
//! lookahead window (default 14 days) and inserts any missing stubs.
//! Writes use insert-if-absent semantics, so re-running it over already
//! processed days is always safe and never touches a recorded status.

use chrono::{DateTime, Duration, NaiveDate, Utc};

use crate::activity::Activity;
use crate::error::LedgerError;
use crate::ledger::LedgerStore;
use crate::recurrence;
use crate::task::TaskRecord;

/// Default lookahead window, in days.
pub const DEFAULT_HORIZON_DAYS: u32 = 14;

/// Expand `activities` into the ordered pending stubs for `date`.
///
/// Only active activities passing the recurrence matcher are emitted.
/// `now` stamps the stubs' `updated_at`; it does not influence matching.
pub fn materialize(activities: &[Activity], date: NaiveDate, now: DateTime<Utc>) -> Vec<TaskRecord> {
    let mut stubs: Vec<TaskRecord> = activities
        .iter()
        .filter(|a| a.active_status)
        .filter(|a| recurrence::matches(a, date))
        .map(|a| TaskRecord::stub(a, date, now))
        .collect();
    // Stable sort: equal times keep the incoming activity order.
    stubs.sort_by_key(TaskRecord::time_sort_key);
    stubs
}

/// Materialize `today..=today+days_forward` into `ledger`, inserting any
/// stubs not yet present. Returns how many documents were inserted.
pub async fn ensure_upcoming<L: LedgerStore + ?Sized>(
    ledger: &L,
    activities: &[Activity],
    today: NaiveDate,
    days_forward: u32,
    now: DateTime<Utc>,
) -> Result<usize, LedgerError> {
    let mut inserted = 0;
    for offset in 0..=days_forward as i64 {
        let date = today + Duration::days(offset);
        for stub in materialize(activities, date, now) {
            if ledger.ensure(&stub).await? {
                inserted += 1;
            }
        }
    }
    tracing::debug!(inserted, days_forward, %today, "horizon materialization pass");
    Ok(inserted)
}
