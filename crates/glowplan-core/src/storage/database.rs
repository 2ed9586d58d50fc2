//! SQLite-backed durable storage.
//!
//! One database file holds both halves of the model:
//! - `updates` — the update ledger, one raw JSON document per
//!   occurrence id, stored exactly as written (legacy PascalCase
//!   documents included);
//! - `activity_list` — a single versioned row with the whole activity
//!   list, the revision column backing the optimistic transaction.
//!
//! Query filtering runs through the same field helpers as the in-memory
//! backend, so both backends see legacy documents identically.

use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use indoc::indoc;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;

use crate::activity_store::{ActivityList, ActivityStore};
use crate::error::{LedgerError, StoreError};
use crate::ledger::{record, FieldCasing, LedgerDoc, LedgerStore};
use crate::task::{TaskRecord, TaskStatus};

const SCHEMA: &str = indoc! {"
    CREATE TABLE IF NOT EXISTS updates (
        id  TEXT PRIMARY KEY,
        doc TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS activity_list (
        id       INTEGER PRIMARY KEY CHECK (id = 1),
        revision INTEGER NOT NULL,
        doc      TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS kv (
        key   TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );
"};

/// SQLite database implementing both [`LedgerStore`] and [`ActivityStore`].
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open the database at `path`, creating file and schema as needed.
    pub fn open(path: &Path) -> Result<Self, LedgerError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| LedgerError::QueryFailed(e.to_string()))?;
        }
        let conn = Connection::open(path)?;
        Self::from_conn(conn)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self, LedgerError> {
        Self::from_conn(Connection::open_in_memory()?)
    }

    fn from_conn(conn: Connection) -> Result<Self, LedgerError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Seed a raw ledger document, bypassing canonicalization.
    pub fn insert_raw(&self, id: &str, doc: &Value) -> Result<(), LedgerError> {
        let conn = self.conn.lock().expect("db lock");
        conn.execute(
            "INSERT OR REPLACE INTO updates (id, doc) VALUES (?1, ?2)",
            params![id, doc.to_string()],
        )?;
        Ok(())
    }

    /// Read a value from the application key-value store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>, LedgerError> {
        let conn = self.conn.lock().expect("db lock");
        let value = conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    /// Write a value to the application key-value store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<(), LedgerError> {
        let conn = self.conn.lock().expect("db lock");
        conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    fn filtered<F>(&self, keep: F) -> Result<Vec<LedgerDoc>, LedgerError>
    where
        F: Fn(&Value) -> bool,
    {
        let conn = self.conn.lock().expect("db lock");
        let mut stmt = conn.prepare("SELECT id, doc FROM updates ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut out = Vec::new();
        for row in rows {
            let (id, raw) = row?;
            let doc: Value =
                serde_json::from_str(&raw).map_err(|e| LedgerError::CorruptDocument {
                    id: id.clone(),
                    message: e.to_string(),
                })?;
            if keep(&doc) {
                out.push(LedgerDoc { id, doc });
            }
        }
        Ok(out)
    }
}

#[async_trait]
impl LedgerStore for Database {
    async fn fetch_range(
        &self,
        casing: FieldCasing,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<LedgerDoc>, LedgerError> {
        self.filtered(|doc| record::doc_date(doc, casing).is_some_and(|d| d >= from && d <= to))
    }

    async fn fetch_since(
        &self,
        casing: FieldCasing,
        since: DateTime<Utc>,
    ) -> Result<Vec<LedgerDoc>, LedgerError> {
        self.filtered(|doc| record::doc_updated_at(doc, casing).is_some_and(|ts| ts > since))
    }

    async fn fetch_pending_before(
        &self,
        casing: FieldCasing,
        before: NaiveDate,
    ) -> Result<Vec<LedgerDoc>, LedgerError> {
        self.filtered(|doc| {
            record::doc_date(doc, casing).is_some_and(|d| d < before)
                && record::doc_status(doc, casing) == Some(TaskStatus::Pending)
        })
    }

    async fn fetch_all(&self) -> Result<Vec<LedgerDoc>, LedgerError> {
        self.filtered(|_| true)
    }

    async fn ensure(&self, rec: &TaskRecord) -> Result<bool, LedgerError> {
        let conn = self.conn.lock().expect("db lock");
        let inserted = conn
            .execute(
                "INSERT OR IGNORE INTO updates (id, doc) VALUES (?1, ?2)",
                params![rec.id, record::to_doc(rec).to_string()],
            )
            .map_err(|e| LedgerError::WriteFailed {
                id: rec.id.clone(),
                message: e.to_string(),
            })?;
        Ok(inserted > 0)
    }

    async fn upsert(&self, rec: &TaskRecord) -> Result<(), LedgerError> {
        let mut conn = self.conn.lock().expect("db lock");
        let tx = conn.transaction()?;
        let existing: Option<String> = tx
            .query_row(
                "SELECT doc FROM updates WHERE id = ?1",
                params![rec.id],
                |row| row.get(0),
            )
            .optional()?;
        let doc = match existing {
            Some(raw) => {
                let old: Value =
                    serde_json::from_str(&raw).map_err(|e| LedgerError::CorruptDocument {
                        id: rec.id.clone(),
                        message: e.to_string(),
                    })?;
                record::merge_into(&old, rec)
            }
            None => record::to_doc(rec),
        };
        tx.execute(
            "INSERT OR REPLACE INTO updates (id, doc) VALUES (?1, ?2)",
            params![rec.id, doc.to_string()],
        )
        .map_err(|e| LedgerError::WriteFailed {
            id: rec.id.clone(),
            message: e.to_string(),
        })?;
        tx.commit()?;
        Ok(())
    }
}

#[async_trait]
impl ActivityStore for Database {
    async fn load(&self) -> Result<ActivityList, StoreError> {
        let conn = self.conn.lock().expect("db lock");
        let row: Option<(u64, String)> = conn
            .query_row(
                "SELECT revision, doc FROM activity_list WHERE id = 1",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        match row {
            Some((revision, raw)) => {
                let mut list: ActivityList = serde_json::from_str(&raw)
                    .map_err(|e| StoreError::Backend(e.to_string()))?;
                // The column is authoritative.
                list.revision = revision;
                Ok(list)
            }
            None => Ok(ActivityList::default()),
        }
    }

    async fn save(&self, list: ActivityList) -> Result<(), StoreError> {
        let mut conn = self.conn.lock().expect("db lock");
        let tx = conn.transaction()?;
        let stored: u64 = tx
            .query_row(
                "SELECT revision FROM activity_list WHERE id = 1",
                [],
                |row| row.get(0),
            )
            .optional()?
            .unwrap_or(0);
        if stored != list.revision {
            return Err(StoreError::Conflict {
                expected: list.revision,
                found: stored,
            });
        }
        let doc = serde_json::to_string(&list).map_err(|e| StoreError::Backend(e.to_string()))?;
        tx.execute(
            "INSERT OR REPLACE INTO activity_list (id, revision, doc) VALUES (1, ?1, ?2)",
            params![list.revision + 1, doc],
        )?;
        tx.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::Activity;
    use crate::task::build_task_id;
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

    #[tokio::test]
    async fn ensure_then_upsert_round_trip() {
        let db = Database::open_memory().unwrap();
        let pending = rec("a", "2024-04-01", TaskStatus::Pending);
        assert!(db.ensure(&pending).await.unwrap());
        assert!(!db.ensure(&pending).await.unwrap());

        let done = rec("a", "2024-04-01", TaskStatus::Completed);
        db.upsert(&done).await.unwrap();
        assert!(!db.ensure(&pending).await.unwrap());

        let all = db.fetch_all().await.unwrap();
        assert_eq!(all.len(), 1);
        let kept = record::normalize(&all[0].id, &all[0].doc).unwrap();
        assert_eq!(kept.status, TaskStatus::Completed);
    }

    #[tokio::test]
    async fn range_query_honors_casing() {
        let db = Database::open_memory().unwrap();
        db.insert_raw(
            "legacy-1",
            &json!({ "ActivityId": "a", "Date": "2024-04-02", "Status": "pending" }),
        )
        .unwrap();
        db.upsert(&rec("b", "2024-04-02", TaskStatus::Pending)).await.unwrap();

        let lower = db
            .fetch_range(FieldCasing::Lower, date("2024-04-01"), date("2024-04-03"))
            .await
            .unwrap();
        assert_eq!(lower.len(), 1);
        let pascal = db
            .fetch_range(FieldCasing::Pascal, date("2024-04-01"), date("2024-04-03"))
            .await
            .unwrap();
        assert_eq!(pascal.len(), 1);
        assert_eq!(pascal[0].id, "legacy-1");
    }

    #[tokio::test]
    async fn upsert_preserves_foreign_fields() {
        let db = Database::open_memory().unwrap();
        db.insert_raw(
            "a-2024-04-01",
            &json!({
                "activityId": "a",
                "date": "2024-04-01",
                "status": "pending",
                "clientNote": "keep me"
            }),
        )
        .unwrap();
        db.upsert(&rec("a", "2024-04-01", TaskStatus::Completed)).await.unwrap();
        let all = db.fetch_all().await.unwrap();
        assert_eq!(all[0].doc["clientNote"], "keep me");
        assert_eq!(all[0].doc["status"], "completed");
    }

    #[tokio::test]
    async fn activity_list_save_bumps_revision() {
        let db = Database::open_memory().unwrap();
        let mut list = db.load().await.unwrap();
        assert_eq!(list.revision, 0);
        list.activities.push(Activity::new("Cleanse", "daily", Utc::now()));
        db.save(list).await.unwrap();

        let list = db.load().await.unwrap();
        assert_eq!(list.revision, 1);
        assert_eq!(list.activities.len(), 1);
    }

    #[tokio::test]
    async fn stale_revision_is_rejected() {
        let db = Database::open_memory().unwrap();
        let fresh = db.load().await.unwrap();
        let stale = fresh.clone();
        db.save(fresh).await.unwrap();
        let err = db.save(stale).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict { expected: 0, found: 1 }));
    }

    #[test]
    fn kv_store_overwrites_in_place() {
        let db = Database::open_memory().unwrap();
        assert_eq!(db.kv_get("achievements").unwrap(), None);
        db.kv_set("achievements", "{}").unwrap();
        db.kv_set("achievements", r#"{"lastSeenLevel":3}"#).unwrap();
        assert_eq!(
            db.kv_get("achievements").unwrap().as_deref(),
            Some(r#"{"lastSeenLevel":3}"#)
        );
    }

    #[tokio::test]
    async fn corrupt_document_is_reported_not_skipped() {
        let db = Database::open_memory().unwrap();
        {
            let conn = db.conn.lock().unwrap();
            conn.execute(
                "INSERT INTO updates (id, doc) VALUES ('bad', 'not json')",
                [],
            )
            .unwrap();
        }
        let err = db.fetch_all().await.unwrap_err();
        assert!(matches!(err, LedgerError::CorruptDocument { .. }));
    }
}
