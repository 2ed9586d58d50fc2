//! Core error types for glowplan-core.
//!
//! This module defines the error hierarchy using thiserror. Ledger
//! failures are retryable from the caller's point of view; an exhausted
//! activity-list transaction is fatal and never partially applied.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for glowplan-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Update-ledger errors
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// Activity-store errors
    #[error("Activity store error: {0}")]
    Store(#[from] StoreError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The activity-list transaction kept conflicting past the retry budget.
    /// Nothing was written.
    #[error("Activity list edit aborted after {attempts} conflicting attempts")]
    ConflictExhausted { attempts: u32 },

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors with context
    #[error("{0}")]
    Custom(String),
}

/// Update-ledger errors. Both casing-variant queries of a reconciliation
/// fan-out surface here; either one failing fails the whole call.
#[derive(Error, Debug)]
pub enum LedgerError {
    /// Query execution failed
    #[error("Ledger query failed: {0}")]
    QueryFailed(String),

    /// Write (ensure/upsert) failed
    #[error("Ledger write failed for '{id}': {message}")]
    WriteFailed { id: String, message: String },

    /// Stored document is not valid JSON
    #[error("Ledger document '{id}' is corrupt: {message}")]
    CorruptDocument { id: String, message: String },
}

/// Activity-store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Optimistic-concurrency check failed: someone else saved first.
    #[error("Activity list revision conflict: expected {expected}, found {found}")]
    Conflict { expected: u64, found: u64 },

    /// Backend failure
    #[error("Activity store backend error: {0}")]
    Backend(String),
}

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

impl From<rusqlite::Error> for LedgerError {
    fn from(err: rusqlite::Error) -> Self {
        LedgerError::QueryFailed(err.to_string())
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
