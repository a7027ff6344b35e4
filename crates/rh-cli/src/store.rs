//! Backend selection: one [`Store`] over SQLite or the HTTP API.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rh_core::{
    CatalogItem, LogId, LogRecord, LogUpdate, NewLog, SessionId, SessionRecord, Store, StoreError,
};
use rh_db::Database;
use rh_remote::Client;

use crate::config::{Backend, Config};

/// The configured store.
pub enum AnyStore {
    Sqlite(Database),
    Remote(Client),
}

impl AnyStore {
    /// Opens the backend named by `config`.
    ///
    /// For SQLite the database directory is created if needed.
    pub fn open(config: &Config) -> Result<Self> {
        match config.backend {
            Backend::Sqlite => {
                if let Some(parent) = config.database_path.parent() {
                    std::fs::create_dir_all(parent)
                        .context("failed to create database directory")?;
                }
                let db = Database::open(&config.database_path).with_context(|| {
                    format!("failed to open database {}", config.database_path.display())
                })?;
                Ok(Self::Sqlite(db))
            }
            Backend::Remote => {
                let url = config
                    .api_url
                    .as_deref()
                    .context("api_url is required for the remote backend")?;
                let token = config
                    .api_token
                    .clone()
                    .context("api_token is required for the remote backend")?;
                let client = Client::new(url, token).context("failed to create API client")?;
                Ok(Self::Remote(client))
            }
        }
    }

    /// The SQLite database, for operations only it supports.
    pub const fn database_mut(&mut self) -> Option<&mut Database> {
        match self {
            Self::Sqlite(db) => Some(db),
            Self::Remote(_) => None,
        }
    }
}

impl Store for AnyStore {
    async fn list_catalog_items(&self) -> Result<Vec<CatalogItem>, StoreError> {
        match self {
            Self::Sqlite(db) => Store::list_catalog_items(db).await,
            Self::Remote(client) => Store::list_catalog_items(client).await,
        }
    }

    async fn list_sessions(&self) -> Result<Vec<SessionRecord>, StoreError> {
        match self {
            Self::Sqlite(db) => Store::list_sessions(db).await,
            Self::Remote(client) => Store::list_sessions(client).await,
        }
    }

    async fn list_logs_for_session(
        &self,
        session_id: &SessionId,
    ) -> Result<Vec<LogRecord>, StoreError> {
        match self {
            Self::Sqlite(db) => Store::list_logs_for_session(db, session_id).await,
            Self::Remote(client) => Store::list_logs_for_session(client, session_id).await,
        }
    }

    async fn create_session(
        &self,
        label: &str,
        date: NaiveDate,
    ) -> Result<SessionRecord, StoreError> {
        match self {
            Self::Sqlite(db) => Store::create_session(db, label, date).await,
            Self::Remote(client) => Store::create_session(client, label, date).await,
        }
    }

    async fn create_log(&self, log: &NewLog) -> Result<LogId, StoreError> {
        match self {
            Self::Sqlite(db) => Store::create_log(db, log).await,
            Self::Remote(client) => Store::create_log(client, log).await,
        }
    }

    async fn update_log(&self, log_id: &LogId, update: &LogUpdate) -> Result<(), StoreError> {
        match self {
            Self::Sqlite(db) => Store::update_log(db, log_id, update).await,
            Self::Remote(client) => Store::update_log(client, log_id, update).await,
        }
    }

    async fn delete_log(&self, log_id: &LogId) -> Result<(), StoreError> {
        match self {
            Self::Sqlite(db) => Store::delete_log(db, log_id).await,
            Self::Remote(client) => Store::delete_log(client, log_id).await,
        }
    }
}
