//! Activity: the user-defined recurring task template.
//!
//! Activities arrive from the activity-management UI with PascalCase
//! field names (the legacy mobile app wrote `Name`, `ActiveStatus`, ...).
//! Serde aliases accept the lowercase spellings too, so normalization
//! happens once at this boundary. Serialization keeps the PascalCase
//! wire form the rest of the fleet still expects.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Fixed brand default applied when the wire record carries no color.
pub const DEFAULT_COLOR: &str = "#FF7C4DFF";

/// Civil time-of-day attached to an activity (and its occurrences).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityTime {
    #[serde(rename = "hour", alias = "Hour")]
    pub hour: u32,
    #[serde(rename = "minute", alias = "Minute")]
    pub minute: u32,
}

/// A recurring activity template.
///
/// Most fields are optional on the wire; missing fields fall back to the
/// documented defaults (inactive, weekly interval 1, empty frequency,
/// brand color), so a single malformed record degrades to an inert
/// activity instead of aborting the batch it came in with.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Activity {
    #[serde(rename = "Id", alias = "id")]
    pub id: String,
    #[serde(rename = "Name", alias = "name")]
    pub name: String,
    #[serde(rename = "Category", alias = "category")]
    pub category: String,
    #[serde(rename = "Note", alias = "note")]
    pub note: String,
    #[serde(rename = "IsRecommended", alias = "isRecommended")]
    pub is_recommended: bool,
    /// "regular", "one_time", "calendar", ... free-form.
    #[serde(rename = "Type", alias = "type")]
    pub kind: String,
    #[serde(rename = "ActiveStatus", alias = "activeStatus")]
    pub active_status: bool,
    #[serde(rename = "Time", alias = "time")]
    pub time: Option<ActivityTime>,
    /// Free-form cadence tag; effectively "daily", "weekly" or other.
    #[serde(rename = "Frequency", alias = "frequency")]
    pub frequency: String,
    /// Weekday numbers. Two historical encodings coexist in stored data:
    /// Monday=1..Sunday=7 (mobile) and Sunday=0..Saturday=6 (web).
    #[serde(rename = "SelectedDays", alias = "selectedDays")]
    pub selected_days: Vec<u8>,
    /// Cadence in weeks; >1 only has an effect when `enabled_at` is set.
    #[serde(rename = "WeeksInterval", alias = "weeksInterval")]
    pub weeks_interval: u32,
    /// Day-of-month numbers for monthly selections.
    #[serde(rename = "SelectedMonthDays", alias = "selectedMonthDays")]
    pub selected_month_days: Vec<u32>,
    #[serde(rename = "Color", alias = "color")]
    pub color: String,
    /// Recurrence origin. Week-interval gating and the weekly fallback
    /// both anchor on this timestamp's civil date.
    #[serde(rename = "EnabledAt", alias = "enabledAt")]
    pub enabled_at: Option<DateTime<Utc>>,
    #[serde(rename = "LastModifiedAt", alias = "lastModifiedAt")]
    pub last_modified_at: Option<DateTime<Utc>>,
    /// "date" (cutoff in `selected_end_before_date`) or "days".
    #[serde(rename = "EndBeforeType", alias = "endBeforeType")]
    pub end_before_type: String,
    #[serde(rename = "EndBeforeUnit", alias = "endBeforeUnit")]
    pub end_before_unit: Option<String>,
    #[serde(rename = "SelectedEndBeforeDate", alias = "selectedEndBeforeDate")]
    pub selected_end_before_date: Option<DateTime<Utc>>,
}

impl Default for Activity {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            category: String::new(),
            note: String::new(),
            is_recommended: false,
            kind: "regular".to_string(),
            active_status: false,
            time: None,
            frequency: String::new(),
            selected_days: Vec::new(),
            weeks_interval: 1,
            selected_month_days: Vec::new(),
            color: DEFAULT_COLOR.to_string(),
            enabled_at: None,
            last_modified_at: None,
            end_before_type: "date".to_string(),
            end_before_unit: None,
            selected_end_before_date: None,
        }
    }
}

impl Activity {
    /// Create a fresh active activity anchored at `now`.
    pub fn new(name: impl Into<String>, frequency: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            frequency: frequency.into(),
            active_status: true,
            enabled_at: Some(now),
            last_modified_at: Some(now),
            ..Self::default()
        }
    }

    /// Parse an activity from a raw wire document.
    ///
    /// Never fails: a document that doesn't deserialize yields the
    /// inactive default, which the materializer then skips.
    pub fn from_doc(doc: &serde_json::Value) -> Self {
        serde_json::from_value(doc.clone()).unwrap_or_default()
    }

    /// Whether the weekly interval gate can apply at all.
    /// An interval >1 without an anchor is treated as always-pass.
    pub fn has_week_gate(&self) -> bool {
        self.weeks_interval > 1 && self.enabled_at.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_pascal_case_wire_record() {
        let doc = json!({
            "Id": "act-1",
            "Name": "Morning serum",
            "ActiveStatus": true,
            "Frequency": "daily",
            "Time": { "Hour": 8, "Minute": 30 },
            "WeeksInterval": 2,
            "EnabledAt": "2024-01-01T06:00:00Z",
        });
        let a = Activity::from_doc(&doc);
        assert_eq!(a.id, "act-1");
        assert!(a.active_status);
        assert_eq!(a.time, Some(ActivityTime { hour: 8, minute: 30 }));
        assert_eq!(a.weeks_interval, 2);
        assert!(a.enabled_at.is_some());
    }

    #[test]
    fn parses_lowercase_wire_record() {
        let doc = json!({
            "id": "act-2",
            "name": "Yoga",
            "activeStatus": true,
            "frequency": "weekly",
            "selectedDays": [1, 3, 5],
            "time": { "hour": 19, "minute": 0 },
        });
        let a = Activity::from_doc(&doc);
        assert_eq!(a.id, "act-2");
        assert_eq!(a.selected_days, vec![1, 3, 5]);
        assert_eq!(a.time.unwrap().hour, 19);
    }

    #[test]
    fn missing_fields_take_documented_defaults() {
        let a = Activity::from_doc(&json!({ "Id": "bare" }));
        assert!(!a.active_status);
        assert_eq!(a.weeks_interval, 1);
        assert_eq!(a.frequency, "");
        assert_eq!(a.color, DEFAULT_COLOR);
        assert_eq!(a.end_before_type, "date");
    }

    #[test]
    fn malformed_record_degrades_to_inactive_default() {
        let a = Activity::from_doc(&json!("not an object"));
        assert!(!a.active_status);
        assert!(a.id.is_empty());
    }

    #[test]
    fn serializes_pascal_case() {
        let a = Activity::new("Cleanse", "daily", Utc::now());
        let v = serde_json::to_value(&a).unwrap();
        assert!(v.get("Name").is_some());
        assert!(v.get("ActiveStatus").is_some());
        assert!(v.get("name").is_none());
    }

    #[test]
    fn week_gate_requires_anchor() {
        let mut a = Activity::default();
        a.weeks_interval = 3;
        assert!(!a.has_week_gate());
        a.enabled_at = Some(Utc::now());
        assert!(a.has_week_gate());
    }
}
