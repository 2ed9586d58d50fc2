//! In-memory ledger backend.
//!
//! The default backend for tests and ephemeral sessions. Documents are
//! held exactly as written, so legacy PascalCase documents seeded via
//! [`MemoryLedger::insert_raw`] behave the same way they do in the
//! durable store.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;

use crate::error::LedgerError;
use crate::ledger::{record, FieldCasing, LedgerDoc, LedgerStore};
use crate::task::{TaskRecord, TaskStatus};

/// Keyed JSON-document store guarded by a mutex.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    docs: Mutex<BTreeMap<String, Value>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a raw document, bypassing canonicalization. This is how
    /// tests reproduce historical dual-casing data.
    pub fn insert_raw(&self, id: impl Into<String>, doc: Value) {
        self.docs.lock().expect("ledger lock").insert(id.into(), doc);
    }

    /// Number of stored documents.
    pub fn len(&self) -> usize {
        self.docs.lock().expect("ledger lock").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn filtered<F>(&self, keep: F) -> Vec<LedgerDoc>
    where
        F: Fn(&Value) -> bool,
    {
        self.docs
            .lock()
            .expect("ledger lock")
            .iter()
            .filter(|(_, doc)| keep(doc))
            .map(|(id, doc)| LedgerDoc {
                id: id.clone(),
                doc: doc.clone(),
            })
            .collect()
    }
}

#[async_trait]
impl LedgerStore for MemoryLedger {
    async fn fetch_range(
        &self,
        casing: FieldCasing,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<LedgerDoc>, LedgerError> {
        Ok(self.filtered(|doc| {
            record::doc_date(doc, casing).is_some_and(|d| d >= from && d <= to)
        }))
    }

    async fn fetch_since(
        &self,
        casing: FieldCasing,
        since: DateTime<Utc>,
    ) -> Result<Vec<LedgerDoc>, LedgerError> {
        Ok(self.filtered(|doc| {
            record::doc_updated_at(doc, casing).is_some_and(|ts| ts > since)
        }))
    }

    async fn fetch_pending_before(
        &self,
        casing: FieldCasing,
        before: NaiveDate,
    ) -> Result<Vec<LedgerDoc>, LedgerError> {
        Ok(self.filtered(|doc| {
            record::doc_date(doc, casing).is_some_and(|d| d < before)
                && record::doc_status(doc, casing) == Some(TaskStatus::Pending)
        }))
    }

    async fn fetch_all(&self) -> Result<Vec<LedgerDoc>, LedgerError> {
        Ok(self.filtered(|_| true))
    }

    async fn ensure(&self, rec: &TaskRecord) -> Result<bool, LedgerError> {
        let mut docs = self.docs.lock().expect("ledger lock");
        if docs.contains_key(&rec.id) {
            return Ok(false);
        }
        docs.insert(rec.id.clone(), record::to_doc(rec));
        Ok(true)
    }

    async fn upsert(&self, rec: &TaskRecord) -> Result<(), LedgerError> {
        let mut docs = self.docs.lock().expect("ledger lock");
        let merged = match docs.get(&rec.id) {
            Some(existing) => record::merge_into(existing, rec),
            None => record::to_doc(rec),
        };
        docs.insert(rec.id.clone(), merged);
        Ok(())
    }
}
