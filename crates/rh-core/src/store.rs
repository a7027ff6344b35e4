//! The catalog and session store boundary.
//!
//! Everything durable lives behind [`Store`]: catalog items, sessions and
//! per-item log records. The composer only ever talks to the store through
//! this trait, so the SQLite and HTTP backends are interchangeable.

use chrono::NaiveDate;
use thiserror::Error;

use crate::types::{CatalogItem, LogId, LogRecord, LogUpdate, NewLog, SessionId, SessionRecord};

/// Errors surfaced by any store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Credentials were rejected.
    #[error("not authorized: {0}")]
    Unauthorized(String),
    /// The referenced record does not exist (or was already removed).
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },
    /// The backend returned data that could not be interpreted.
    #[error("invalid store data: {0}")]
    InvalidData(String),
    /// Any other backend or transport failure.
    #[error("store unavailable: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl StoreError {
    /// Wraps a backend-specific error.
    pub fn backend(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Backend(Box::new(err))
    }
}

/// Read and write access to catalog items, sessions and log records.
///
/// Calls are asynchronous and never retried by the caller.
#[expect(
    async_fn_in_trait,
    reason = "the composer runs on a single-threaded runtime and never needs Send futures"
)]
pub trait Store {
    /// Lists every catalog item.
    async fn list_catalog_items(&self) -> Result<Vec<CatalogItem>, StoreError>;

    /// Lists sessions, most recent date first.
    async fn list_sessions(&self) -> Result<Vec<SessionRecord>, StoreError>;

    /// Lists the live log records of one session.
    async fn list_logs_for_session(
        &self,
        session_id: &SessionId,
    ) -> Result<Vec<LogRecord>, StoreError>;

    /// Creates a session record.
    async fn create_session(
        &self,
        label: &str,
        date: NaiveDate,
    ) -> Result<SessionRecord, StoreError>;

    /// Creates a log record and returns its id.
    async fn create_log(&self, log: &NewLog) -> Result<LogId, StoreError>;

    /// Applies a partial update to a log record.
    async fn update_log(&self, log_id: &LogId, update: &LogUpdate) -> Result<(), StoreError>;

    /// Removes a log record. Backends may archive instead of deleting.
    async fn delete_log(&self, log_id: &LogId) -> Result<(), StoreError>;
}
