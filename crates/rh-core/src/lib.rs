//! Core logic for the rehearse session composer.
//!
//! This crate contains the store-independent parts of composing a practice
//! session:
//! - Types: catalog items, sessions, logs and the working-set entry
//! - Editor: the working set, its baseline and the save diff
//! - Timer: timing one saved entry and writing its actual duration
//! - Composer: focus routing of key input across panes
//!
//! Persistence goes through the [`Store`] trait. [`MemoryStore`] is an
//! in-process implementation that also records every call.

pub mod catalog;
pub mod composer;
pub mod editor;
pub mod focus;
pub mod memory;
pub mod picker;
pub mod store;
pub mod timer;
mod types;

pub use catalog::CatalogView;
pub use composer::{BusyKind, Composer, Dispatch, Effect, Phase, StatusKind, StatusLine};
pub use editor::{Direction, SavePlan, SaveSummary, SessionEditor};
pub use focus::{Focus, Input};
pub use memory::MemoryStore;
pub use picker::{PickerChoice, SessionPicker};
pub use store::{Store, StoreError};
pub use timer::{Timer, TimerPhase, format_clock, ms_to_minutes};
pub use types::{
    CatalogItem, DEFAULT_PLANNED_MINUTES, ItemId, LogId, LogRecord, LogUpdate,
    MAX_PLANNED_MINUTES, MIN_PLANNED_MINUTES, NewLog, SelectedItem, SessionDraft, SessionId,
    SessionRecord, ValidationError, parse_planned_minutes,
};
