//! SQLite storage for rehearse.
//!
//! Implements [`rh_core::Store`] on top of `rusqlite`.
//!
//! # Thread Safety
//!
//! [`Database`] wraps a `rusqlite::Connection`, which is `Send` but not `Sync`.
//! The composer drives it from a single-threaded runtime; other callers
//! should keep one `Database` per thread.
//!
//! # Schema
//!
//! Timestamps are TEXT in RFC 3339 with millisecond precision
//! (`2026-10-18T09:00:00.000Z`), so lexicographic order is chronological.
//! Session dates are TEXT `YYYY-MM-DD`.
//!
//! Log records are never removed. Deleting a log sets `archived = 1` and
//! `archived_at`; archived rows are invisible to every read.

use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rh_core::{
    CatalogItem, ItemId, LogId, LogRecord, LogUpdate, NewLog, SessionId, SessionRecord, Store,
    StoreError, ValidationError,
};
use rusqlite::{Connection, OptionalExtension, params};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// A stored id is empty or otherwise unusable.
    #[error("invalid id in database: {0}")]
    InvalidId(#[from] ValidationError),
    /// A stored session date is not `YYYY-MM-DD`.
    #[error("invalid date for session {session_id}: {value}")]
    DateParse {
        session_id: String,
        value: String,
        #[source]
        source: chrono::ParseError,
    },
    /// A stored timestamp is not RFC 3339.
    #[error("invalid timestamp for catalog item {item_id}: {value}")]
    TimestampParse {
        item_id: String,
        value: String,
        #[source]
        source: chrono::ParseError,
    },
    /// The referenced row does not exist or is archived.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },
    /// Catalog item names must not be blank.
    #[error("catalog item name must not be empty")]
    EmptyName,
}

impl From<DbError> for StoreError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { kind, id } => Self::NotFound { kind, id },
            DbError::InvalidId(_) | DbError::DateParse { .. } | DbError::TimestampParse { .. } => {
                Self::InvalidData(err.to_string())
            }
            DbError::Sqlite(_) | DbError::EmptyName => Self::backend(err),
        }
    }
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The schema is initialized on open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        debug!(path = %path.display(), "database opened");
        Ok(db)
    }

    /// Opens an in-memory database, destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initializes the schema. Idempotent.
    fn init(&self) -> Result<(), DbError> {
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS catalog_items (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                category TEXT,
                created_at TEXT NOT NULL,
                last_used_at TEXT,
                usage_count INTEGER
            );

            CREATE TABLE IF NOT EXISTS catalog_item_tags (
                item_id TEXT NOT NULL,
                tag TEXT NOT NULL,
                PRIMARY KEY (item_id, tag),
                FOREIGN KEY (item_id) REFERENCES catalog_items(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS sessions (
                id TEXT PRIMARY KEY,
                label TEXT NOT NULL,
                date TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_sessions_date ON sessions(date);

            -- archived: logical delete flag; archived rows are never read back
            CREATE TABLE IF NOT EXISTS logs (
                id TEXT PRIMARY KEY,
                session_id TEXT NOT NULL,
                item_id TEXT NOT NULL,
                planned_minutes INTEGER NOT NULL,
                actual_minutes REAL,
                position INTEGER NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                archived INTEGER NOT NULL DEFAULT 0,
                archived_at TEXT,
                FOREIGN KEY (session_id) REFERENCES sessions(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_logs_session ON logs(session_id, archived);
            ",
        )?;
        Ok(())
    }

    /// Adds a catalog item with a fresh id. Blank tags are dropped.
    pub fn add_catalog_item(
        &mut self,
        name: &str,
        category: Option<&str>,
        tags: &[String],
    ) -> Result<CatalogItem, DbError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DbError::EmptyName);
        }
        let category = category.map(str::trim).filter(|c| !c.is_empty());
        let mut tags: Vec<String> = tags
            .iter()
            .map(|tag| tag.trim().to_string())
            .filter(|tag| !tag.is_empty())
            .collect();
        tags.sort();
        tags.dedup();

        let id = ItemId::new(Uuid::new_v4().to_string())?;
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO catalog_items (id, name, category, created_at) VALUES (?, ?, ?, ?)",
            params![id.as_str(), name, category, format_timestamp(Utc::now())],
        )?;
        {
            let mut stmt =
                tx.prepare("INSERT OR IGNORE INTO catalog_item_tags (item_id, tag) VALUES (?, ?)")?;
            for tag in &tags {
                stmt.execute(params![id.as_str(), tag])?;
            }
        }
        tx.commit()?;
        debug!(item = %id, name, "catalog item added");

        let mut item = CatalogItem::new(id, name);
        item.category = category.map(str::to_string);
        item.tags = tags;
        Ok(item)
    }

    /// Lists catalog items ordered by name, with their tags.
    pub fn list_catalog_items(&self) -> Result<Vec<CatalogItem>, DbError> {
        let mut tags = self.list_item_tags()?;
        let mut stmt = self.conn.prepare(
            "
            SELECT id, name, category, last_used_at, usage_count
            FROM catalog_items
            ORDER BY name COLLATE NOCASE ASC, id ASC
            ",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, Option<u32>>(4)?,
            ))
        })?;
        let mut items = Vec::new();
        for row in rows {
            let (id, name, category, last_used_at, usage_count) = row?;
            let last_used_at = last_used_at
                .map(|value| parse_timestamp(&value, &id))
                .transpose()?;
            let item_tags = tags.remove(&id).unwrap_or_default();
            let mut item = CatalogItem::new(ItemId::new(id)?, name);
            item.category = category;
            item.tags = item_tags;
            item.last_used_at = last_used_at;
            item.usage_count = usage_count;
            items.push(item);
        }
        Ok(items)
    }

    fn list_item_tags(&self) -> Result<HashMap<String, Vec<String>>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT item_id, tag
            FROM catalog_item_tags
            ORDER BY item_id ASC, tag ASC
            ",
        )?;
        let rows = stmt.query_map([], |row| {
            let item_id: String = row.get(0)?;
            let tag: String = row.get(1)?;
            Ok((item_id, tag))
        })?;
        let mut tags: HashMap<String, Vec<String>> = HashMap::new();
        for row in rows {
            let (item_id, tag) = row?;
            tags.entry(item_id).or_default().push(tag);
        }
        Ok(tags)
    }

    /// Lists sessions, most recent date first.
    pub fn list_sessions(&self) -> Result<Vec<SessionRecord>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT id, label, date
            FROM sessions
            ORDER BY date DESC, label ASC, id ASC
            ",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;
        let mut sessions = Vec::new();
        for row in rows {
            let (id, label, date) = row?;
            let date = parse_date(&date, &id)?;
            sessions.push(SessionRecord {
                id: SessionId::new(id)?,
                label,
                date,
            });
        }
        Ok(sessions)
    }

    /// Lists live logs of a session ordered by position, then id.
    pub fn list_logs_for_session(&self, session_id: &SessionId) -> Result<Vec<LogRecord>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT id, item_id, planned_minutes, actual_minutes, position
            FROM logs
            WHERE session_id = ? AND archived = 0
            ORDER BY position ASC, id ASC
            ",
        )?;
        let rows = stmt.query_map([session_id.as_str()], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, u32>(2)?,
                row.get::<_, Option<f64>>(3)?,
                row.get::<_, u32>(4)?,
            ))
        })?;
        let mut logs = Vec::new();
        for row in rows {
            let (id, item_id, planned_minutes, actual_minutes, position) = row?;
            logs.push(LogRecord {
                id: LogId::new(id)?,
                item_id: ItemId::new(item_id)?,
                session_id: session_id.clone(),
                planned_minutes,
                actual_minutes,
                position,
            });
        }
        Ok(logs)
    }

    pub fn create_session(&self, label: &str, date: NaiveDate) -> Result<SessionRecord, DbError> {
        let id = SessionId::new(Uuid::new_v4().to_string())?;
        self.conn.execute(
            "INSERT INTO sessions (id, label, date, created_at) VALUES (?, ?, ?, ?)",
            params![
                id.as_str(),
                label,
                date.format(DATE_FORMAT).to_string(),
                format_timestamp(Utc::now()),
            ],
        )?;
        debug!(session = %id, label, "session created");
        Ok(SessionRecord {
            id,
            label: label.to_string(),
            date,
        })
    }

    pub fn create_log(&self, log: &NewLog) -> Result<LogId, DbError> {
        let exists: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM sessions WHERE id = ?",
                [log.session_id.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        if exists.is_none() {
            return Err(DbError::NotFound {
                kind: "session",
                id: log.session_id.to_string(),
            });
        }

        let id = LogId::new(Uuid::new_v4().to_string())?;
        let now = format_timestamp(Utc::now());
        self.conn.execute(
            "
            INSERT INTO logs
            (id, session_id, item_id, planned_minutes, position, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ",
            params![
                id.as_str(),
                log.session_id.as_str(),
                log.item_id.as_str(),
                log.planned_minutes,
                log.position,
                now,
                now,
            ],
        )?;
        Ok(id)
    }

    /// Applies a partial update to a live log.
    ///
    /// Writing an actual duration also bumps the item's usage statistics.
    pub fn update_log(&self, log_id: &LogId, update: &LogUpdate) -> Result<(), DbError> {
        let now = format_timestamp(Utc::now());
        let tx = self.conn.unchecked_transaction()?;
        let item_id: Option<String> = tx
            .query_row(
                "SELECT item_id FROM logs WHERE id = ? AND archived = 0",
                [log_id.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        let Some(item_id) = item_id else {
            return Err(DbError::NotFound {
                kind: "log",
                id: log_id.to_string(),
            });
        };

        tx.execute(
            "
            UPDATE logs SET
                planned_minutes = COALESCE(?, planned_minutes),
                position = COALESCE(?, position),
                actual_minutes = COALESCE(?, actual_minutes),
                updated_at = ?
            WHERE id = ?
            ",
            params![
                update.planned_minutes,
                update.position,
                update.actual_minutes,
                now,
                log_id.as_str(),
            ],
        )?;
        if update.actual_minutes.is_some() {
            tx.execute(
                "
                UPDATE catalog_items SET
                    usage_count = COALESCE(usage_count, 0) + 1,
                    last_used_at = ?
                WHERE id = ?
                ",
                params![now, item_id],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Archives a live log.
    pub fn archive_log(&self, log_id: &LogId) -> Result<(), DbError> {
        let changed = self.conn.execute(
            "UPDATE logs SET archived = 1, archived_at = ? WHERE id = ? AND archived = 0",
            params![format_timestamp(Utc::now()), log_id.as_str()],
        )?;
        if changed == 0 {
            return Err(DbError::NotFound {
                kind: "log",
                id: log_id.to_string(),
            });
        }
        Ok(())
    }
}

impl Store for Database {
    async fn list_catalog_items(&self) -> Result<Vec<CatalogItem>, StoreError> {
        Ok(Self::list_catalog_items(self)?)
    }

    async fn list_sessions(&self) -> Result<Vec<SessionRecord>, StoreError> {
        Ok(Self::list_sessions(self)?)
    }

    async fn list_logs_for_session(
        &self,
        session_id: &SessionId,
    ) -> Result<Vec<LogRecord>, StoreError> {
        Ok(Self::list_logs_for_session(self, session_id)?)
    }

    async fn create_session(
        &self,
        label: &str,
        date: NaiveDate,
    ) -> Result<SessionRecord, StoreError> {
        Ok(Self::create_session(self, label, date)?)
    }

    async fn create_log(&self, log: &NewLog) -> Result<LogId, StoreError> {
        Ok(Self::create_log(self, log)?)
    }

    async fn update_log(&self, log_id: &LogId, update: &LogUpdate) -> Result<(), StoreError> {
        Ok(Self::update_log(self, log_id, update)?)
    }

    async fn delete_log(&self, log_id: &LogId) -> Result<(), StoreError> {
        Ok(self.archive_log(log_id)?)
    }
}

fn parse_date(value: &str, session_id: &str) -> Result<NaiveDate, DbError> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|source| DbError::DateParse {
        session_id: session_id.to_string(),
        value: value.to_string(),
        source,
    })
}

fn parse_timestamp(value: &str, item_id: &str) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(value)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|source| DbError::TimestampParse {
            item_id: item_id.to_string(),
            value: value.to_string(),
            source,
        })
}

fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}
