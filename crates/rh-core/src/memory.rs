//! In-memory [`Store`] that records every call.
//!
//! Used by tests to assert exactly which remote operations a save issued, and
//! usable as a throwaway backend. Failures can be injected per operation.

use std::cell::RefCell;

use chrono::{NaiveDate, Utc};

use crate::store::{Store, StoreError};
use crate::types::{
    CatalogItem, ItemId, LogId, LogRecord, LogUpdate, NewLog, SessionId, SessionRecord,
};

/// Kinds of store operations, used for call counting and failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ListCatalogItems,
    ListSessions,
    ListLogs,
    CreateSession,
    CreateLog,
    UpdateLog,
    DeleteLog,
}

impl Operation {
    /// True for operations that modify the store.
    pub const fn is_write(self) -> bool {
        matches!(
            self,
            Self::CreateSession | Self::CreateLog | Self::UpdateLog | Self::DeleteLog
        )
    }
}

/// One recorded store call with its arguments.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreCall {
    ListCatalogItems,
    ListSessions,
    ListLogs(SessionId),
    CreateSession { label: String, date: NaiveDate },
    CreateLog(NewLog),
    UpdateLog(LogId, LogUpdate),
    DeleteLog(LogId),
}

impl StoreCall {
    pub const fn operation(&self) -> Operation {
        match self {
            Self::ListCatalogItems => Operation::ListCatalogItems,
            Self::ListSessions => Operation::ListSessions,
            Self::ListLogs(_) => Operation::ListLogs,
            Self::CreateSession { .. } => Operation::CreateSession,
            Self::CreateLog(_) => Operation::CreateLog,
            Self::UpdateLog(..) => Operation::UpdateLog,
            Self::DeleteLog(_) => Operation::DeleteLog,
        }
    }
}

#[derive(Debug, Clone)]
struct StoredLog {
    record: LogRecord,
    archived: bool,
}

#[derive(Debug, Default)]
struct Inner {
    catalog: Vec<CatalogItem>,
    sessions: Vec<SessionRecord>,
    logs: Vec<StoredLog>,
    calls: Vec<StoreCall>,
    /// Pending failures: operation and how many calls may still succeed first.
    failures: Vec<(Operation, usize)>,
    next_id: u64,
}

impl Inner {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-{}", self.next_id)
    }

    fn record(&mut self, call: StoreCall) -> Result<(), StoreError> {
        let operation = call.operation();
        self.calls.push(call);
        if let Some(pos) = self.failures.iter().position(|(op, _)| *op == operation) {
            let remaining = &mut self.failures[pos].1;
            if *remaining == 0 {
                self.failures.remove(pos);
                return Err(StoreError::InvalidData(format!(
                    "injected failure for {operation:?}"
                )));
            }
            *remaining -= 1;
        }
        Ok(())
    }

    fn live_log_mut(&mut self, log_id: &LogId) -> Result<&mut StoredLog, StoreError> {
        self.logs
            .iter_mut()
            .find(|log| !log.archived && &log.record.id == log_id)
            .ok_or_else(|| StoreError::NotFound {
                kind: "log",
                id: log_id.to_string(),
            })
    }
}

/// A [`Store`] held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RefCell<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with catalog items.
    pub fn with_catalog(items: impl IntoIterator<Item = CatalogItem>) -> Self {
        let store = Self::new();
        store.inner.borrow_mut().catalog.extend(items);
        store
    }

    /// Adds a catalog item without recording a call.
    pub fn add_catalog_item(&self, item: CatalogItem) {
        self.inner.borrow_mut().catalog.push(item);
    }

    /// Removes a catalog item, leaving any logs that reference it dangling.
    pub fn remove_catalog_item(&self, item_id: &ItemId) {
        self.inner
            .borrow_mut()
            .catalog
            .retain(|item| &item.id != item_id);
    }

    /// Adds a session directly, without recording a call.
    pub fn insert_session(&self, session: SessionRecord) {
        self.inner.borrow_mut().sessions.push(session);
    }

    /// Adds a log record directly, without recording a call.
    pub fn insert_log(&self, record: LogRecord) {
        self.inner.borrow_mut().logs.push(StoredLog {
            record,
            archived: false,
        });
    }

    /// Makes the next call of `operation` fail after `succeed_first` successes.
    pub fn fail_on(&self, operation: Operation, succeed_first: usize) {
        self.inner
            .borrow_mut()
            .failures
            .push((operation, succeed_first));
    }

    /// All calls recorded so far, in order.
    pub fn calls(&self) -> Vec<StoreCall> {
        self.inner.borrow().calls.clone()
    }

    /// Only the calls that modify the store.
    pub fn write_calls(&self) -> Vec<StoreCall> {
        self.inner
            .borrow()
            .calls
            .iter()
            .filter(|call| call.operation().is_write())
            .cloned()
            .collect()
    }

    /// Number of recorded calls of one operation.
    pub fn count(&self, operation: Operation) -> usize {
        self.inner
            .borrow()
            .calls
            .iter()
            .filter(|call| call.operation() == operation)
            .count()
    }

    pub fn clear_calls(&self) {
        self.inner.borrow_mut().calls.clear();
    }

    /// Live logs of a session as currently stored, ordered by position.
    pub fn logs(&self, session_id: &SessionId) -> Vec<LogRecord> {
        let inner = self.inner.borrow();
        let mut logs: Vec<LogRecord> = inner
            .logs
            .iter()
            .filter(|log| !log.archived && &log.record.session_id == session_id)
            .map(|log| log.record.clone())
            .collect();
        logs.sort_by(|a, b| a.position.cmp(&b.position).then_with(|| a.id.cmp(&b.id)));
        logs
    }

    /// Current state of a catalog item.
    pub fn catalog_item(&self, item_id: &ItemId) -> Option<CatalogItem> {
        self.inner
            .borrow()
            .catalog
            .iter()
            .find(|item| &item.id == item_id)
            .cloned()
    }
}

impl Store for MemoryStore {
    async fn list_catalog_items(&self) -> Result<Vec<CatalogItem>, StoreError> {
        let mut inner = self.inner.borrow_mut();
        inner.record(StoreCall::ListCatalogItems)?;
        Ok(inner.catalog.clone())
    }

    async fn list_sessions(&self) -> Result<Vec<SessionRecord>, StoreError> {
        let mut inner = self.inner.borrow_mut();
        inner.record(StoreCall::ListSessions)?;
        let mut sessions = inner.sessions.clone();
        sessions.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.label.cmp(&b.label)));
        Ok(sessions)
    }

    async fn list_logs_for_session(
        &self,
        session_id: &SessionId,
    ) -> Result<Vec<LogRecord>, StoreError> {
        self.inner
            .borrow_mut()
            .record(StoreCall::ListLogs(session_id.clone()))?;
        Ok(self.logs(session_id))
    }

    async fn create_session(
        &self,
        label: &str,
        date: NaiveDate,
    ) -> Result<SessionRecord, StoreError> {
        let mut inner = self.inner.borrow_mut();
        inner.record(StoreCall::CreateSession {
            label: label.to_string(),
            date,
        })?;
        let id = SessionId::new(inner.next_id("session"))
            .map_err(|err| StoreError::InvalidData(err.to_string()))?;
        let session = SessionRecord {
            id,
            label: label.to_string(),
            date,
        };
        inner.sessions.push(session.clone());
        Ok(session)
    }

    async fn create_log(&self, log: &NewLog) -> Result<LogId, StoreError> {
        let mut inner = self.inner.borrow_mut();
        inner.record(StoreCall::CreateLog(log.clone()))?;
        if !inner.sessions.iter().any(|s| s.id == log.session_id) {
            return Err(StoreError::NotFound {
                kind: "session",
                id: log.session_id.to_string(),
            });
        }
        let id = LogId::new(inner.next_id("log"))
            .map_err(|err| StoreError::InvalidData(err.to_string()))?;
        inner.logs.push(StoredLog {
            record: LogRecord {
                id: id.clone(),
                item_id: log.item_id.clone(),
                session_id: log.session_id.clone(),
                planned_minutes: log.planned_minutes,
                actual_minutes: None,
                position: log.position,
            },
            archived: false,
        });
        Ok(id)
    }

    async fn update_log(&self, log_id: &LogId, update: &LogUpdate) -> Result<(), StoreError> {
        let mut inner = self.inner.borrow_mut();
        inner.record(StoreCall::UpdateLog(log_id.clone(), update.clone()))?;
        let log = inner.live_log_mut(log_id)?;
        if let Some(planned) = update.planned_minutes {
            log.record.planned_minutes = planned;
        }
        if let Some(position) = update.position {
            log.record.position = position;
        }
        let touched_item = update.actual_minutes.map(|actual| {
            log.record.actual_minutes = Some(actual);
            log.record.item_id.clone()
        });
        if let Some(item_id) = touched_item {
            if let Some(item) = inner.catalog.iter_mut().find(|item| item.id == item_id) {
                item.usage_count = Some(item.usage_count.unwrap_or(0) + 1);
                item.last_used_at = Some(Utc::now());
            }
        }
        Ok(())
    }

    async fn delete_log(&self, log_id: &LogId) -> Result<(), StoreError> {
        let mut inner = self.inner.borrow_mut();
        inner.record(StoreCall::DeleteLog(log_id.clone()))?;
        inner.live_log_mut(log_id)?.archived = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, day).unwrap()
    }

    #[tokio::test]
    async fn sessions_are_listed_most_recent_first() {
        let store = MemoryStore::new();
        store.create_session("old", date(1)).await.unwrap();
        store.create_session("new", date(9)).await.unwrap();

        let labels: Vec<String> = store
            .list_sessions()
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.label)
            .collect();
        assert_eq!(labels, vec!["new", "old"]);
    }

    #[tokio::test]
    async fn deleted_logs_are_hidden() {
        let store = MemoryStore::new();
        let session = store.create_session("s", date(1)).await.unwrap();
        let log_id = store
            .create_log(&NewLog {
                session_id: session.id.clone(),
                item_id: ItemId::new("item-1").unwrap(),
                planned_minutes: 5,
                position: 0,
            })
            .await
            .unwrap();

        store.delete_log(&log_id).await.unwrap();

        assert!(store.list_logs_for_session(&session.id).await.unwrap().is_empty());
        let err = store.delete_log(&log_id).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { kind: "log", .. }));
    }

    #[tokio::test]
    async fn injected_failure_fires_once_after_successes() {
        let store = MemoryStore::new();
        store.fail_on(Operation::ListSessions, 1);

        assert!(store.list_sessions().await.is_ok());
        assert!(store.list_sessions().await.is_err());
        assert!(store.list_sessions().await.is_ok());
        assert_eq!(store.count(Operation::ListSessions), 3);
    }

    #[tokio::test]
    async fn recording_actual_minutes_bumps_usage() {
        let item = CatalogItem::new(ItemId::new("item-1").unwrap(), "Scales");
        let store = MemoryStore::with_catalog([item.clone()]);
        let session = store.create_session("s", date(1)).await.unwrap();
        let log_id = store
            .create_log(&NewLog {
                session_id: session.id,
                item_id: item.id.clone(),
                planned_minutes: 5,
                position: 0,
            })
            .await
            .unwrap();

        let update = LogUpdate {
            actual_minutes: Some(4.5),
            ..LogUpdate::default()
        };
        store.update_log(&log_id, &update).await.unwrap();

        let stored = store.catalog_item(&item.id).unwrap();
        assert_eq!(stored.usage_count, Some(1));
        assert!(stored.last_used_at.is_some());
    }
}
