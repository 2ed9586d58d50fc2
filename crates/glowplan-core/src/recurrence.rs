//! Recurrence matching: does an activity occur on a given civil date?
//!
//! Evaluation is an ordered sequence of vetoes and fallbacks. The order
//! is load-bearing and mirrors how stored schedules have always been
//! interpreted:
//!
//! 1. end-before cutoff
//! 2. month-day filter
//! 3. week-interval gating (Monday-aligned week starts)
//! 4. daily frequency
//! 5. explicit weekday selection (both historical encodings)
//! 6. weekly fallback to the anchor's weekday
//!
//! A non-empty weekday selection is authoritative; the fallback only
//! applies when the selection is empty. Legacy records that would
//! satisfy both are resolved by that order, not re-interpreted. An
//! activity with a weekly-like frequency but neither explicit days nor
//! an anchor never matches — a valid, permanently-dormant state, not an
//! error.

use chrono::{Datelike, Duration, NaiveDate};

use crate::activity::Activity;

/// Monday-aligned start of the week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

/// Number of whole weeks between the week-starts of `from` and `to`.
///
/// Comparing week-starts rather than raw day deltas keeps an every-N-weeks
/// cadence stable across month and year boundaries. Negative when `to`
/// precedes `from`'s week.
pub fn weeks_between(from: NaiveDate, to: NaiveDate) -> i64 {
    (week_start(to) - week_start(from)).num_days().div_euclid(7)
}

/// Pure recurrence predicate: does `activity` occur on `date`?
pub fn matches(activity: &Activity, date: NaiveDate) -> bool {
    // End-before cutoff only applies to the "date" constraint flavor.
    if activity.end_before_type.eq_ignore_ascii_case("date") {
        if let Some(cutoff) = activity.selected_end_before_date {
            if date > cutoff.date_naive() {
                return false;
            }
        }
    }

    if !activity.selected_month_days.is_empty()
        && !activity.selected_month_days.contains(&date.day())
    {
        return false;
    }

    // Every-N-weeks gate. Without an anchor the gate is skipped entirely.
    if activity.weeks_interval > 1 {
        if let Some(anchor) = activity.enabled_at {
            let delta = weeks_between(anchor.date_naive(), date);
            if delta % activity.weeks_interval as i64 != 0 {
                return false;
            }
        }
    }

    let freq = activity.frequency.to_lowercase();
    if freq.contains("daily") {
        return true;
    }

    if !activity.selected_days.is_empty() {
        // Mobile wrote Mon=1..Sun=7, web wrote Sun=0..Sat=6. Honor both.
        let mon_based = date.weekday().number_from_monday() as u8;
        let sun_based = date.weekday().num_days_from_sunday() as u8;
        return activity.selected_days.contains(&mon_based)
            || activity.selected_days.contains(&sun_based);
    }

    if freq.contains("week") {
        if let Some(anchor) = activity.enabled_at {
            return date.weekday() == anchor.date_naive().weekday();
        }
    }

    false
}
