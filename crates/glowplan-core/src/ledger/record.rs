//! Dual-schema normalization adapter.
//!
//! Every raw ledger document passes through here exactly once, at the
//! read boundary, and comes out as a canonical [`TaskRecord`] no matter
//! which historical field casing wrote it. Business logic never sees a
//! raw document.
//!
//! Degradation rules for malformed data: an unusable date makes the
//! document invisible (skipped, never an abort); an unknown status
//! reads as pending; a missing timestamp reads as the UNIX epoch so the
//! entry sorts before anything genuinely stamped.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde_json::Value;

use crate::activity::ActivityTime;
use crate::ledger::FieldCasing;
use crate::task::{TaskRecord, TaskStatus};

/// Parse a stored date string. Tolerates legacy separators ("2024/1/5")
/// by rebuilding from the numeric parts.
pub fn parse_date_str(s: &str) -> Option<NaiveDate> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(d) = trimmed.parse::<NaiveDate>() {
        return Some(d);
    }
    let parts: Vec<u32> = trimmed
        .split(|c: char| !c.is_ascii_digit())
        .filter(|p| !p.is_empty())
        .filter_map(|p| p.parse().ok())
        .collect();
    if let [y, m, d] = parts[..] {
        return NaiveDate::from_ymd_opt(y as i32, m, d);
    }
    None
}

/// Read the date field under one specific casing.
pub fn doc_date(doc: &Value, casing: FieldCasing) -> Option<NaiveDate> {
    doc.get(casing.date_field())
        .and_then(Value::as_str)
        .and_then(parse_date_str)
}

/// Read the status field under one specific casing.
pub fn doc_status(doc: &Value, casing: FieldCasing) -> Option<TaskStatus> {
    doc.get(casing.status_field())
        .and_then(Value::as_str)
        .and_then(parse_status)
}

/// Read the updated-at field under one specific casing. Accepts RFC 3339
/// strings and epoch milliseconds, the two forms old writers produced.
pub fn doc_updated_at(doc: &Value, casing: FieldCasing) -> Option<DateTime<Utc>> {
    parse_timestamp(doc.get(casing.updated_at_field())?)
}

fn parse_status(s: &str) -> Option<TaskStatus> {
    match s.to_ascii_lowercase().as_str() {
        "pending" => Some(TaskStatus::Pending),
        "completed" => Some(TaskStatus::Completed),
        "skipped" => Some(TaskStatus::Skipped),
        "missed" => Some(TaskStatus::Missed),
        "deleted" => Some(TaskStatus::Deleted),
        _ => None,
    }
}

fn parse_timestamp(v: &Value) -> Option<DateTime<Utc>> {
    match v {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        Value::Number(n) => n.as_i64().and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
        _ => None,
    }
}

fn parse_time(v: &Value) -> Option<ActivityTime> {
    let obj = v.as_object()?;
    let hour = obj.get("hour").or_else(|| obj.get("Hour"))?.as_u64()? as u32;
    let minute = obj.get("minute").or_else(|| obj.get("Minute"))?.as_u64()? as u32;
    Some(ActivityTime { hour, minute })
}

fn field<'a>(doc: &'a Value, lower: &str, pascal: &str) -> Option<&'a Value> {
    doc.get(lower).or_else(|| doc.get(pascal))
}

/// Normalize one raw document into a canonical record.
///
/// Returns `None` only when no usable date exists under either casing —
/// such a document cannot be placed on any day and is skipped.
pub fn normalize(id: &str, doc: &Value) -> Option<TaskRecord> {
    let date = doc_date(doc, FieldCasing::Lower).or_else(|| doc_date(doc, FieldCasing::Pascal))?;
    let activity_id = field(doc, "activityId", "ActivityId")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let status = field(doc, "status", "Status")
        .and_then(Value::as_str)
        .and_then(parse_status)
        .unwrap_or(TaskStatus::Pending);
    let time = field(doc, "time", "Time").and_then(parse_time);
    let updated_at = field(doc, "updatedAt", "UpdatedAt")
        .and_then(parse_timestamp)
        .unwrap_or(DateTime::UNIX_EPOCH);
    Some(TaskRecord {
        id: id.to_string(),
        activity_id,
        date,
        status,
        time,
        updated_at,
    })
}

/// Canonical (lowercase) document form for new writes.
pub fn to_doc(record: &TaskRecord) -> Value {
    let mut obj = serde_json::Map::new();
    obj.insert("id".into(), Value::String(record.id.clone()));
    obj.insert("activityId".into(), Value::String(record.activity_id.clone()));
    obj.insert(
        "date".into(),
        Value::String(record.date.format("%Y-%m-%d").to_string()),
    );
    obj.insert(
        "status".into(),
        serde_json::to_value(record.status).expect("status serializes"),
    );
    if let Some(t) = record.time {
        obj.insert(
            "time".into(),
            serde_json::json!({ "hour": t.hour, "minute": t.minute }),
        );
    }
    obj.insert(
        "updatedAt".into(),
        Value::String(record.updated_at.to_rfc3339()),
    );
    Value::Object(obj)
}

/// Overlay the canonical fields of `record` onto an existing document,
/// preserving any fields an older writer left behind (merge semantics).
pub fn merge_into(existing: &Value, record: &TaskRecord) -> Value {
    let mut base = match existing {
        Value::Object(map) => map.clone(),
        _ => serde_json::Map::new(),
    };
    if let Value::Object(fresh) = to_doc(record) {
        for (k, v) in fresh {
            base.insert(k, v);
        }
    }
    Value::Object(base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_messy_legacy_dates() {
        assert_eq!(parse_date_str("2024-03-05"), Some(NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()));
        assert_eq!(parse_date_str("2024/3/5"), Some(NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()));
        assert_eq!(parse_date_str(" 2024.03.05 "), Some(NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()));
        assert_eq!(parse_date_str(""), None);
        assert_eq!(parse_date_str("soon"), None);
    }

    #[test]
    fn normalizes_lowercase_document() {
        let doc = json!({
            "activityId": "a1",
            "date": "2024-05-01",
            "status": "completed",
            "time": { "hour": 9, "minute": 15 },
            "updatedAt": "2024-05-01T09:20:00Z",
        });
        let rec = normalize("a1-2024-05-01-0915", &doc).unwrap();
        assert_eq!(rec.activity_id, "a1");
        assert_eq!(rec.status, TaskStatus::Completed);
        assert_eq!(rec.time, Some(ActivityTime { hour: 9, minute: 15 }));
    }

    #[test]
    fn normalizes_pascal_case_document() {
        let doc = json!({
            "ActivityId": "a1",
            "Date": "2024-05-01",
            "Status": "skipped",
            "Time": { "Hour": 7, "Minute": 0 },
            "UpdatedAt": "2024-05-01T07:05:00Z",
        });
        let rec = normalize("a1-2024-05-01-0700", &doc).unwrap();
        assert_eq!(rec.activity_id, "a1");
        assert_eq!(rec.status, TaskStatus::Skipped);
        assert_eq!(rec.time, Some(ActivityTime { hour: 7, minute: 0 }));
    }

    #[test]
    fn unknown_status_reads_as_pending() {
        let doc = json!({ "date": "2024-05-01", "status": "archived" });
        assert_eq!(normalize("x", &doc).unwrap().status, TaskStatus::Pending);
    }

    #[test]
    fn epoch_millis_timestamp_accepted() {
        let doc = json!({ "date": "2024-05-01", "updatedAt": 1714554000000i64 });
        let rec = normalize("x", &doc).unwrap();
        assert_eq!(rec.updated_at, Utc.timestamp_millis_opt(1714554000000).unwrap());
    }

    #[test]
    fn missing_timestamp_sorts_first() {
        let doc = json!({ "date": "2024-05-01" });
        assert_eq!(normalize("x", &doc).unwrap().updated_at, DateTime::UNIX_EPOCH);
    }

    #[test]
    fn dateless_document_is_invisible() {
        assert!(normalize("x", &json!({ "status": "completed" })).is_none());
        assert!(normalize("x", &json!({ "date": "" })).is_none());
    }

    #[test]
    fn merge_preserves_foreign_fields() {
        let existing = json!({ "Date": "2024-05-01", "Status": "pending", "Origin": "mobile" });
        let rec = normalize("id-1", &existing).unwrap();
        let mut updated = rec.clone();
        updated.status = TaskStatus::Completed;
        let merged = merge_into(&existing, &updated);
        assert_eq!(merged["Origin"], "mobile");
        assert_eq!(merged["status"], "completed");
        // Canonical lowercase fields now present alongside the legacy ones.
        assert_eq!(merged["date"], "2024-05-01");
    }
}
