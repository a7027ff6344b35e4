//! Core type definitions with validation.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Planned duration given to an item when it is toggled into the working set.
pub const DEFAULT_PLANNED_MINUTES: u32 = 5;

/// Smallest planned duration an item can carry.
pub const MIN_PLANNED_MINUTES: u32 = 1;

/// Largest planned duration accepted from exact duration entry.
pub const MAX_PLANNED_MINUTES: u32 = 999;

/// Validation errors for core types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The provided value was empty.
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    /// A planned duration was outside the accepted range.
    #[error("planned minutes must be between 1 and 999, got {value}")]
    PlannedMinutesOutOfRange { value: u32 },

    /// Duration input was not a plain integer.
    #[error("not a whole number of minutes: {input}")]
    NotANumber { input: String },
}

/// Generates a validated string ID newtype with common trait implementations.
macro_rules! define_string_id {
    (
        $(#[$meta:meta])*
        $name:ident, $field_name:literal
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Creates a new ID after validation.
            pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
                let id = id.into();
                if id.trim().is_empty() {
                    return Err(ValidationError::Empty { field: $field_name });
                }
                Ok(Self(id))
            }

            /// Returns the ID as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_string_id!(
    /// Identifier of a catalog item, owned by the store.
    ItemId, "item ID"
);

define_string_id!(
    /// Identifier of a session record.
    SessionId, "session ID"
);

define_string_id!(
    /// Identifier of a persisted log record.
    ///
    /// A [`SelectedItem`] without one has never been written to the store.
    LogId, "log ID"
);

/// A reusable entry that sessions are composed from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: ItemId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage_count: Option<u32>,
}

impl CatalogItem {
    /// Creates a catalog item with only a name; optional metadata is empty.
    pub fn new(id: ItemId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            category: None,
            tags: Vec::new(),
            last_used_at: None,
            usage_count: None,
        }
    }
}

/// A dated container of logged items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: SessionId,
    pub label: String,
    pub date: NaiveDate,
}

/// The persisted link between one catalog item and one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    pub id: LogId,
    pub item_id: ItemId,
    pub session_id: SessionId,
    pub planned_minutes: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_minutes: Option<f64>,
    pub position: u32,
}

/// Fields of a log record that is about to be created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewLog {
    pub session_id: SessionId,
    pub item_id: ItemId,
    pub planned_minutes: u32,
    pub position: u32,
}

/// A partial update of a log record. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LogUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub planned_minutes: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_minutes: Option<f64>,
}

impl LogUpdate {
    /// Returns true when the update would not change anything.
    pub const fn is_empty(&self) -> bool {
        self.planned_minutes.is_none() && self.position.is_none() && self.actual_minutes.is_none()
    }
}

/// Label and date used when a save has to create a new session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionDraft {
    pub label: String,
    pub date: NaiveDate,
}

impl SessionDraft {
    /// Draft labelled after its date, e.g. `Session 2026-10-18`.
    pub fn for_date(date: NaiveDate) -> Self {
        Self {
            label: format!("Session {}", date.format("%Y-%m-%d")),
            date,
        }
    }
}

/// An entry of the in-memory working set.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedItem {
    pub item: CatalogItem,
    pub planned_minutes: u32,
    pub actual_minutes: Option<f64>,
    /// Set once the entry has been written to the store.
    pub log_id: Option<LogId>,
}

impl SelectedItem {
    /// A fresh, unpersisted selection of `item`.
    pub const fn new(item: CatalogItem, planned_minutes: u32) -> Self {
        Self {
            item,
            planned_minutes,
            actual_minutes: None,
            log_id: None,
        }
    }

    /// Builds a selection from a persisted log and its resolved catalog item.
    ///
    /// The stored planned minutes are kept as-is, even when out of range.
    pub fn from_log(item: CatalogItem, log: &LogRecord) -> Self {
        Self {
            item,
            planned_minutes: log.planned_minutes,
            actual_minutes: log.actual_minutes,
            log_id: Some(log.id.clone()),
        }
    }

    pub const fn is_persisted(&self) -> bool {
        self.log_id.is_some()
    }
}

/// Parses typed duration input into planned minutes.
///
/// Accepts only a plain positive integer within
/// [`MIN_PLANNED_MINUTES`]`..=`[`MAX_PLANNED_MINUTES`].
pub fn parse_planned_minutes(input: &str) -> Result<u32, ValidationError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Empty {
            field: "planned minutes",
        });
    }
    if !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ValidationError::NotANumber {
            input: trimmed.to_string(),
        });
    }
    let value: u32 = trimmed.parse().map_err(|_| ValidationError::NotANumber {
        input: trimmed.to_string(),
    })?;
    if !(MIN_PLANNED_MINUTES..=MAX_PLANNED_MINUTES).contains(&value) {
        return Err(ValidationError::PlannedMinutesOutOfRange { value });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_reject_empty() {
        assert!(ItemId::new("").is_err());
        assert!(SessionId::new("   ").is_err());
        assert!(LogId::new("log-1").is_ok());
    }

    #[test]
    fn log_id_serde_roundtrip() {
        let id = LogId::new("log-123").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"log-123\"");
        let parsed: LogId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn session_id_serde_rejects_empty() {
        let result: Result<SessionId, _> = serde_json::from_str("\"\"");
        assert!(result.is_err());
    }

    #[test]
    fn catalog_item_deserializes_without_optional_fields() {
        let item: CatalogItem =
            serde_json::from_str(r#"{"id":"item-1","name":"Scales"}"#).unwrap();
        assert_eq!(item, CatalogItem::new(ItemId::new("item-1").unwrap(), "Scales"));
    }

    #[test]
    fn log_update_skips_absent_fields() {
        let update = LogUpdate {
            position: Some(2),
            ..LogUpdate::default()
        };
        assert!(!update.is_empty());
        assert_eq!(serde_json::to_string(&update).unwrap(), r#"{"position":2}"#);
        assert!(LogUpdate::default().is_empty());
    }

    #[test]
    fn parse_planned_minutes_accepts_range() {
        assert_eq!(parse_planned_minutes("1"), Ok(1));
        assert_eq!(parse_planned_minutes("45"), Ok(45));
        assert_eq!(parse_planned_minutes("999"), Ok(999));
    }

    #[test]
    fn parse_planned_minutes_rejects_bad_input() {
        assert!(parse_planned_minutes("").is_err());
        assert!(parse_planned_minutes("0").is_err());
        assert!(parse_planned_minutes("1000").is_err());
        assert!(parse_planned_minutes("-3").is_err());
        assert!(parse_planned_minutes("4.5").is_err());
        assert!(parse_planned_minutes("ten").is_err());
        assert!(parse_planned_minutes("99999999999").is_err());
    }

    #[test]
    fn session_draft_label_uses_date() {
        let date = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        assert_eq!(SessionDraft::for_date(date).label, "Session 2026-10-18");
    }

    #[test]
    fn selected_item_from_log_keeps_stored_values() {
        let item = CatalogItem::new(ItemId::new("item-1").unwrap(), "Scales");
        let log = LogRecord {
            id: LogId::new("log-1").unwrap(),
            item_id: item.id.clone(),
            session_id: SessionId::new("session-1").unwrap(),
            planned_minutes: 0,
            actual_minutes: Some(2.5),
            position: 0,
        };
        let selected = SelectedItem::from_log(item, &log);
        assert_eq!(selected.planned_minutes, 0);
        assert_eq!(selected.actual_minutes, Some(2.5));
        assert!(selected.is_persisted());
    }
}
