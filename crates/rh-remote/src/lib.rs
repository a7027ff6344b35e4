//! HTTP store client for rehearse.
//!
//! Implements [`rh_core::Store`] against a JSON REST API:
//!
//! | operation               | request                        |
//! |-------------------------|--------------------------------|
//! | list catalog items      | `GET /catalog`                 |
//! | list sessions           | `GET /sessions`                |
//! | list logs of a session  | `GET /sessions/{id}/logs`      |
//! | create session          | `POST /sessions`               |
//! | create log              | `POST /logs`                   |
//! | update log              | `PATCH /logs/{id}`             |
//! | delete log              | `DELETE /logs/{id}`            |
//!
//! Every request carries the configured bearer token.

use std::fmt;
use std::time::Duration;

use chrono::NaiveDate;
use reqwest::{Method, StatusCode, Url};
use rh_core::{
    CatalogItem, LogId, LogRecord, LogUpdate, NewLog, SessionId, SessionRecord, Store, StoreError,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Default request timeout for API calls.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Remote store errors.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The configured token is unusable.
    #[error("invalid API token: {reason}")]
    InvalidToken { reason: &'static str },
    /// The configured base URL cannot be used.
    #[error("invalid API URL {url}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },
    /// Failed to build HTTP client.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
    /// HTTP request failed.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// The server rejected the token.
    #[error("unauthorized: {message}")]
    Unauthorized { message: String },
    /// The addressed resource does not exist.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },
    /// API returned an error response.
    #[error("API error ({status}): {message}")]
    Api { status: StatusCode, message: String },
    /// Failed to parse response.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl From<RemoteError> for StoreError {
    fn from(err: RemoteError) -> Self {
        match err {
            RemoteError::Unauthorized { message } => Self::Unauthorized(message),
            RemoteError::NotFound { kind, id } => Self::NotFound { kind, id },
            RemoteError::InvalidResponse(message) => Self::InvalidData(message),
            other => Self::backend(other),
        }
    }
}

/// The resource a request addresses, used to report 404s.
#[derive(Debug, Clone, Copy)]
struct Target<'a> {
    kind: &'static str,
    id: &'a str,
}

/// HTTP store client.
///
/// Clones share the underlying connection pool.
#[derive(Clone)]
pub struct Client {
    http: reqwest::Client,
    base_url: Url,
    token: String,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.base_url.as_str())
            .field("token", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Creates a client for the API at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is empty or whitespace-only, if the URL
    /// is not an absolute http(s) URL, or if the HTTP client fails to build.
    pub fn new(base_url: &str, token: impl Into<String>) -> Result<Self, RemoteError> {
        Self::with_timeout(base_url, token, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(
        base_url: &str,
        token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, RemoteError> {
        let token = token.into();
        if token.is_empty() {
            return Err(RemoteError::InvalidToken {
                reason: "API token cannot be empty",
            });
        }
        if token.trim().is_empty() {
            return Err(RemoteError::InvalidToken {
                reason: "API token cannot be whitespace-only",
            });
        }

        let base_url = parse_base_url(base_url)?;
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(RemoteError::ClientBuild)?;

        Ok(Self {
            http,
            base_url,
            token,
        })
    }

    /// Builds the URL for `segments` below the base URL.
    ///
    /// Segments are percent-encoded, so ids cannot escape their path slot.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // parse_base_url rejects URLs that cannot be a base
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<&B>,
        target: Target<'_>,
    ) -> Result<String, RemoteError> {
        let url = self.endpoint(segments);
        debug!(%method, path = url.path(), "store request");
        let mut request = self.http.request(method, url).bearer_auth(&self.token);
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await?;

        let status = response.status();
        let body = response.text().await?;
        debug!(%status, "store response");
        if !status.is_success() {
            return Err(error_for_status(status, &body, target));
        }
        Ok(body)
    }

    async fn get<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        target: Target<'_>,
    ) -> Result<T, RemoteError> {
        let body = self.send::<()>(Method::GET, segments, None, target).await?;
        parse_json(&body)
    }

    async fn fetch_catalog(&self) -> Result<Vec<CatalogItem>, RemoteError> {
        self.get(&["catalog"], Target { kind: "endpoint", id: "/catalog" })
            .await
    }

    async fn fetch_sessions(&self) -> Result<Vec<SessionRecord>, RemoteError> {
        self.get(&["sessions"], Target { kind: "endpoint", id: "/sessions" })
            .await
    }

    async fn fetch_logs(&self, session_id: &SessionId) -> Result<Vec<LogRecord>, RemoteError> {
        let id = session_id.as_str();
        self.get(&["sessions", id, "logs"], Target { kind: "session", id })
            .await
    }

    async fn post_session(
        &self,
        label: &str,
        date: NaiveDate,
    ) -> Result<SessionRecord, RemoteError> {
        let body = NewSessionBody { label, date };
        let response = self
            .send(
                Method::POST,
                &["sessions"],
                Some(&body),
                Target { kind: "endpoint", id: "/sessions" },
            )
            .await?;
        parse_json(&response)
    }

    async fn post_log(&self, log: &NewLog) -> Result<LogId, RemoteError> {
        let response = self
            .send(
                Method::POST,
                &["logs"],
                Some(log),
                Target { kind: "session", id: log.session_id.as_str() },
            )
            .await?;
        let created: CreatedLog = parse_json(&response)?;
        Ok(created.id)
    }

    async fn patch_log(&self, log_id: &LogId, update: &LogUpdate) -> Result<(), RemoteError> {
        let id = log_id.as_str();
        self.send(Method::PATCH, &["logs", id], Some(update), Target { kind: "log", id })
            .await?;
        Ok(())
    }

    async fn remove_log(&self, log_id: &LogId) -> Result<(), RemoteError> {
        let id = log_id.as_str();
        self.send::<()>(Method::DELETE, &["logs", id], None, Target { kind: "log", id })
            .await?;
        Ok(())
    }
}

impl Store for Client {
    async fn list_catalog_items(&self) -> Result<Vec<CatalogItem>, StoreError> {
        Ok(self.fetch_catalog().await?)
    }

    async fn list_sessions(&self) -> Result<Vec<SessionRecord>, StoreError> {
        Ok(self.fetch_sessions().await?)
    }

    async fn list_logs_for_session(
        &self,
        session_id: &SessionId,
    ) -> Result<Vec<LogRecord>, StoreError> {
        Ok(self.fetch_logs(session_id).await?)
    }

    async fn create_session(
        &self,
        label: &str,
        date: NaiveDate,
    ) -> Result<SessionRecord, StoreError> {
        Ok(self.post_session(label, date).await?)
    }

    async fn create_log(&self, log: &NewLog) -> Result<LogId, StoreError> {
        Ok(self.post_log(log).await?)
    }

    async fn update_log(&self, log_id: &LogId, update: &LogUpdate) -> Result<(), StoreError> {
        Ok(self.patch_log(log_id, update).await?)
    }

    async fn delete_log(&self, log_id: &LogId) -> Result<(), StoreError> {
        Ok(self.remove_log(log_id).await?)
    }
}

#[derive(Debug, Serialize)]
struct NewSessionBody<'a> {
    label: &'a str,
    date: NaiveDate,
}

#[derive(Debug, Deserialize)]
struct CreatedLog {
    id: LogId,
}

fn parse_base_url(raw: &str) -> Result<Url, RemoteError> {
    let invalid = |reason: &str| RemoteError::InvalidBaseUrl {
        url: raw.to_string(),
        reason: reason.to_string(),
    };
    let url = Url::parse(raw.trim()).map_err(|err| invalid(&err.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid("scheme must be http or https"));
    }
    if url.cannot_be_a_base() {
        return Err(invalid("URL cannot be a base"));
    }
    Ok(url)
}

fn parse_json<T: DeserializeOwned>(body: &str) -> Result<T, RemoteError> {
    serde_json::from_str(body).map_err(|err| RemoteError::InvalidResponse(err.to_string()))
}

fn error_for_status(status: StatusCode, body: &str, target: Target<'_>) -> RemoteError {
    let message = parse_api_error(body).unwrap_or_else(|| {
        let body = body.trim();
        if body.is_empty() {
            status.to_string()
        } else {
            body.to_string()
        }
    });
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => RemoteError::Unauthorized { message },
        StatusCode::NOT_FOUND => RemoteError::NotFound {
            kind: target.kind,
            id: target.id.to_string(),
        },
        _ => RemoteError::Api { status, message },
    }
}

/// Extracts the server's message from `{"error": "..."}`,
/// `{"error": {"message": "..."}}` or `{"message": "..."}`.
fn parse_api_error(body: &str) -> Option<String> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum ErrorField {
        Text(String),
        Detailed { message: String },
    }

    #[derive(Deserialize)]
    struct ErrorPayload {
        error: Option<ErrorField>,
        message: Option<String>,
    }

    let payload: ErrorPayload = serde_json::from_str(body).ok()?;
    match payload.error {
        Some(ErrorField::Text(message) | ErrorField::Detailed { message }) => Some(message),
        None => payload.message,
    }
}
