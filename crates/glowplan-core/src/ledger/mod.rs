//! The update ledger: persisted status overrides for occurrences.
//!
//! The ledger is a keyed document store, one JSON document per
//! deterministic occurrence id. Historical data carries two field-name
//! casings for the same schema ("date" vs "Date", "status" vs "Status",
//! ...), a schema-evolution artifact of the mobile-to-web migration.
//! Queries are therefore parameterized by [`FieldCasing`]: a range or
//! since query must be issued under both casings and merged by document
//! id before any business logic runs — see the reconciler.
//!
//! Writes come in two flavors with different idempotency contracts:
//! [`LedgerStore::ensure`] (horizon materialization, insert-if-absent —
//! never downgrades a recorded status) and [`LedgerStore::upsert`]
//! (status writes, merge at the deterministic id). New writes
//! standardize on lowercase field names; reads keep accepting both.

pub mod memory;
pub mod record;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::error::LedgerError;
use crate::task::TaskRecord;

pub use memory::MemoryLedger;

/// Which historical field-name casing a query inspects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldCasing {
    /// Lowercase/camelCase fields: `date`, `status`, `updatedAt`.
    Lower,
    /// PascalCase fields: `Date`, `Status`, `UpdatedAt`.
    Pascal,
}

impl FieldCasing {
    /// Both variants, in the order new-data-first.
    pub const BOTH: [FieldCasing; 2] = [FieldCasing::Lower, FieldCasing::Pascal];

    pub fn date_field(self) -> &'static str {
        match self {
            FieldCasing::Lower => "date",
            FieldCasing::Pascal => "Date",
        }
    }

    pub fn status_field(self) -> &'static str {
        match self {
            FieldCasing::Lower => "status",
            FieldCasing::Pascal => "Status",
        }
    }

    pub fn updated_at_field(self) -> &'static str {
        match self {
            FieldCasing::Lower => "updatedAt",
            FieldCasing::Pascal => "UpdatedAt",
        }
    }
}

/// A raw ledger document, exactly as stored.
#[derive(Debug, Clone)]
pub struct LedgerDoc {
    pub id: String,
    pub doc: serde_json::Value,
}

/// Storage abstraction for the update ledger.
///
/// Implementations only filter on the requested casing's fields; they
/// never normalize. Normalization is the adapter's job ([`record`]),
/// applied once at the read boundary.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Documents whose `casing` date field falls in `from..=to`.
    async fn fetch_range(
        &self,
        casing: FieldCasing,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<LedgerDoc>, LedgerError>;

    /// Documents whose `casing` updated-at field is strictly after `since`.
    async fn fetch_since(
        &self,
        casing: FieldCasing,
        since: DateTime<Utc>,
    ) -> Result<Vec<LedgerDoc>, LedgerError>;

    /// Documents still pending (under `casing`) dated strictly before `before`.
    async fn fetch_pending_before(
        &self,
        casing: FieldCasing,
        before: NaiveDate,
    ) -> Result<Vec<LedgerDoc>, LedgerError>;

    /// Every document in the ledger.
    async fn fetch_all(&self) -> Result<Vec<LedgerDoc>, LedgerError>;

    /// Insert `record` if no document exists at its id. Returns whether
    /// an insert happened. Existing documents are left untouched, which
    /// is what makes repeated horizon materialization a no-op.
    async fn ensure(&self, record: &TaskRecord) -> Result<bool, LedgerError>;

    /// Merge-write `record` at its deterministic id. Unknown fields an
    /// older writer left in the document are preserved. The pending stub
    /// need not pre-exist.
    async fn upsert(&self, record: &TaskRecord) -> Result<(), LedgerError>;
}

#[async_trait]
impl<T: LedgerStore + ?Sized> LedgerStore for &T {
    async fn fetch_range(
        &self,
        casing: FieldCasing,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<LedgerDoc>, LedgerError> {
        (**self).fetch_range(casing, from, to).await
    }

    async fn fetch_since(
        &self,
        casing: FieldCasing,
        since: DateTime<Utc>,
    ) -> Result<Vec<LedgerDoc>, LedgerError> {
        (**self).fetch_since(casing, since).await
    }

    async fn fetch_pending_before(
        &self,
        casing: FieldCasing,
        before: NaiveDate,
    ) -> Result<Vec<LedgerDoc>, LedgerError> {
        (**self).fetch_pending_before(casing, before).await
    }

    async fn fetch_all(&self) -> Result<Vec<LedgerDoc>, LedgerError> {
        (**self).fetch_all().await
    }

    async fn ensure(&self, record: &TaskRecord) -> Result<bool, LedgerError> {
        (**self).ensure(record).await
    }

    async fn upsert(&self, record: &TaskRecord) -> Result<(), LedgerError> {
        (**self).upsert(record).await
    }
}
