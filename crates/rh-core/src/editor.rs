//! Working-set editing and delta save.
//!
//! The editor owns the working set, the baseline snapshot taken when a
//! session's logs were loaded, and the identity of the active session. Saving
//! compares the two structurally and sends only the operations needed to make
//! the store match the working set.

use std::collections::{HashMap, HashSet};

use tracing::{debug, info, warn};

use crate::store::{Store, StoreError};
use crate::types::{
    CatalogItem, DEFAULT_PLANNED_MINUTES, ItemId, LogId, LogRecord, LogUpdate, MAX_PLANNED_MINUTES,
    MIN_PLANNED_MINUTES, NewLog, SelectedItem, SessionDraft, SessionId, parse_planned_minutes,
};

/// Direction for reordering and cursor movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

/// A log record the next save has to create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingCreate {
    /// Index of the entry in the working set.
    pub index: usize,
    pub item_id: ItemId,
    pub planned_minutes: u32,
    pub position: u32,
}

/// Remote operations needed to persist the working set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SavePlan {
    pub deletes: Vec<LogId>,
    pub updates: Vec<(LogId, LogUpdate)>,
    pub creates: Vec<PendingCreate>,
}

impl SavePlan {
    pub fn is_empty(&self) -> bool {
        self.deletes.is_empty() && self.updates.is_empty() && self.creates.is_empty()
    }

    /// Number of remote write calls the plan will issue.
    pub fn len(&self) -> usize {
        self.deletes.len() + self.updates.len() + self.creates.len()
    }
}

/// What a save did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveSummary {
    /// Session the working set was saved to; `None` when there was nothing to save.
    pub session_id: Option<SessionId>,
    pub session_created: bool,
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
}

impl SaveSummary {
    /// True when the save issued no write calls at all.
    pub const fn is_noop(&self) -> bool {
        !self.session_created && self.created == 0 && self.updated == 0 && self.deleted == 0
    }
}

/// Owner of the working set, baseline and active session.
#[derive(Debug, Clone)]
pub struct SessionEditor {
    active_session: Option<SessionId>,
    working: Vec<SelectedItem>,
    baseline: Vec<SelectedItem>,
    cursor: usize,
    default_minutes: u32,
}

impl Default for SessionEditor {
    fn default() -> Self {
        Self::new(DEFAULT_PLANNED_MINUTES)
    }
}

impl SessionEditor {
    /// Creates an editor for a new session. `default_minutes` is clamped to
    /// the accepted planned-duration range.
    pub fn new(default_minutes: u32) -> Self {
        Self {
            active_session: None,
            working: Vec::new(),
            baseline: Vec::new(),
            cursor: 0,
            default_minutes: default_minutes.clamp(MIN_PLANNED_MINUTES, MAX_PLANNED_MINUTES),
        }
    }

    /// The session being edited, or `None` for a new one.
    pub const fn active_session(&self) -> Option<&SessionId> {
        self.active_session.as_ref()
    }

    pub fn items(&self) -> &[SelectedItem] {
        &self.working
    }

    /// Snapshot taken at the last load.
    pub fn baseline(&self) -> &[SelectedItem] {
        &self.baseline
    }

    pub fn get(&self, index: usize) -> Option<&SelectedItem> {
        self.working.get(index)
    }

    pub fn len(&self) -> usize {
        self.working.len()
    }

    pub fn is_empty(&self) -> bool {
        self.working.is_empty()
    }

    pub const fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn current(&self) -> Option<&SelectedItem> {
        self.working.get(self.cursor)
    }

    pub fn contains(&self, item_id: &ItemId) -> bool {
        self.working.iter().any(|entry| &entry.item.id == item_id)
    }

    /// Moves the list cursor one step, stopping at either end.
    pub fn move_cursor(&mut self, direction: Direction) {
        match direction {
            Direction::Up => self.cursor = self.cursor.saturating_sub(1),
            Direction::Down => {
                if self.cursor + 1 < self.working.len() {
                    self.cursor += 1;
                }
            }
        }
    }

    /// Adds `item` to the working set, or removes it if already present.
    ///
    /// Returns true when the item was added.
    pub fn toggle_item(&mut self, item: &CatalogItem) -> bool {
        if let Some(index) = self.working.iter().position(|e| e.item.id == item.id) {
            self.remove_item(index);
            return false;
        }
        self.working
            .push(SelectedItem::new(item.clone(), self.default_minutes));
        true
    }

    /// Changes the planned duration by `delta`, never going below one minute.
    pub fn adjust_duration(&mut self, index: usize, delta: i32) -> bool {
        let Some(entry) = self.working.get_mut(index) else {
            return false;
        };
        let next = (i64::from(entry.planned_minutes) + i64::from(delta))
            .max(i64::from(MIN_PLANNED_MINUTES));
        entry.planned_minutes = u32::try_from(next).unwrap_or(u32::MAX);
        true
    }

    /// Sets the planned duration from typed input.
    ///
    /// Input that is not a whole number within 1..=999 is ignored and the
    /// previous value kept. Returns whether the value was applied.
    pub fn set_duration_exact(&mut self, index: usize, input: &str) -> bool {
        let Some(entry) = self.working.get_mut(index) else {
            return false;
        };
        match parse_planned_minutes(input) {
            Ok(minutes) => {
                entry.planned_minutes = minutes;
                true
            }
            Err(err) => {
                debug!(%err, "duration input rejected");
                false
            }
        }
    }

    /// Removes an entry. The cursor keeps pointing at a valid entry.
    pub fn remove_item(&mut self, index: usize) -> Option<SelectedItem> {
        if index >= self.working.len() {
            return None;
        }
        let removed = self.working.remove(index);
        if index < self.cursor {
            self.cursor -= 1;
        }
        self.cursor = self.cursor.min(self.working.len().saturating_sub(1));
        Some(removed)
    }

    /// Swaps an entry with its neighbour. The cursor follows the moved entry.
    ///
    /// Returns false at the list boundary.
    pub fn move_item(&mut self, index: usize, direction: Direction) -> bool {
        let target = match direction {
            Direction::Up => index.checked_sub(1),
            Direction::Down => index.checked_add(1),
        };
        let Some(target) = target.filter(|t| *t < self.working.len()) else {
            return false;
        };
        if index >= self.working.len() {
            return false;
        }
        self.working.swap(index, target);
        self.cursor = target;
        true
    }

    /// Forgets the active session and empties the working set.
    pub fn clear_session(&mut self) {
        self.active_session = None;
        self.working.clear();
        self.baseline.clear();
        self.cursor = 0;
    }

    /// Loads a session's logs into the working set and takes a new baseline.
    ///
    /// Logs referring to items missing from `catalog` are dropped. On error
    /// the editor is left exactly as it was.
    pub async fn load_session<S: Store>(
        &mut self,
        store: &S,
        session_id: &SessionId,
        catalog: &[CatalogItem],
    ) -> Result<(), StoreError> {
        let logs = store.list_logs_for_session(session_id).await?;
        let selection = build_selection(logs, catalog);
        debug!(session = %session_id, entries = selection.len(), "loaded session logs");

        // The baseline mirrors the store; the working set gets in-range
        // durations so the next save writes any correction back.
        self.working = selection
            .iter()
            .cloned()
            .map(|mut entry| {
                entry.planned_minutes = entry.planned_minutes.max(MIN_PLANNED_MINUTES);
                entry
            })
            .collect();
        self.baseline = selection;
        self.active_session = Some(session_id.clone());
        self.cursor = self.cursor.min(self.working.len().saturating_sub(1));
        Ok(())
    }

    /// Computes the operations the next save will issue.
    pub fn plan_changes(&self) -> SavePlan {
        let mut plan = SavePlan::default();

        let kept: HashSet<&LogId> = self
            .working
            .iter()
            .filter_map(|entry| entry.log_id.as_ref())
            .collect();
        plan.deletes = self
            .baseline
            .iter()
            .filter_map(|entry| entry.log_id.as_ref())
            .filter(|log_id| !kept.contains(log_id))
            .cloned()
            .collect();

        let baseline: HashMap<&LogId, (usize, &SelectedItem)> = self
            .baseline
            .iter()
            .enumerate()
            .filter_map(|(index, entry)| entry.log_id.as_ref().map(|id| (id, (index, entry))))
            .collect();

        for (index, entry) in self.working.iter().enumerate() {
            let position = position_of(index);
            let Some(log_id) = &entry.log_id else {
                plan.creates.push(PendingCreate {
                    index,
                    item_id: entry.item.id.clone(),
                    planned_minutes: entry.planned_minutes,
                    position,
                });
                continue;
            };

            let mut update = LogUpdate::default();
            match baseline.get(log_id) {
                Some(&(base_index, base)) => {
                    if base.planned_minutes != entry.planned_minutes {
                        update.planned_minutes = Some(entry.planned_minutes);
                    }
                    if base_index != index {
                        update.position = Some(position);
                    }
                }
                None => {
                    update.planned_minutes = Some(entry.planned_minutes);
                    update.position = Some(position);
                }
            }
            if !update.is_empty() {
                plan.updates.push((log_id.clone(), update));
            }
        }

        plan
    }

    /// True when a save would issue at least one write.
    pub fn has_unsaved_changes(&self) -> bool {
        if self.active_session.is_none() {
            return !self.working.is_empty();
        }
        !self.plan_changes().is_empty()
    }

    /// Persists the working set.
    ///
    /// Without an active session a new one is created from `draft`. The first
    /// failing call aborts the save; operations already applied stay applied
    /// and the baseline is re-read from the store so the next save diffs
    /// against what the store actually holds.
    pub async fn save<S: Store>(
        &mut self,
        store: &S,
        catalog: &[CatalogItem],
        draft: &SessionDraft,
    ) -> Result<SaveSummary, StoreError> {
        if self.working.is_empty() && self.active_session.is_none() {
            return Ok(SaveSummary::default());
        }

        let plan = self.plan_changes();
        debug!(
            deletes = plan.deletes.len(),
            updates = plan.updates.len(),
            creates = plan.creates.len(),
            "computed save plan"
        );

        let mut summary = SaveSummary::default();
        let session_id = if let Some(id) = &self.active_session {
            id.clone()
        } else {
            let session = store.create_session(&draft.label, draft.date).await?;
            info!(session = %session.id, label = %session.label, "created session");
            self.active_session = Some(session.id.clone());
            summary.session_created = true;
            session.id
        };
        summary.session_id = Some(session_id.clone());

        if let Err(err) = self.apply_plan(store, &session_id, &plan, &mut summary).await {
            warn!(%err, ?summary, "save aborted");
            self.rebase_baseline(store, &session_id, catalog).await;
            return Err(err);
        }

        self.load_session(store, &session_id, catalog).await?;
        info!(
            session = %session_id,
            created = summary.created,
            updated = summary.updated,
            deleted = summary.deleted,
            "saved session"
        );
        Ok(summary)
    }

    async fn apply_plan<S: Store>(
        &mut self,
        store: &S,
        session_id: &SessionId,
        plan: &SavePlan,
        summary: &mut SaveSummary,
    ) -> Result<(), StoreError> {
        for log_id in &plan.deletes {
            store.delete_log(log_id).await?;
            summary.deleted += 1;
        }
        for (log_id, update) in &plan.updates {
            store.update_log(log_id, update).await?;
            summary.updated += 1;
        }
        for create in &plan.creates {
            let log_id = store
                .create_log(&NewLog {
                    session_id: session_id.clone(),
                    item_id: create.item_id.clone(),
                    planned_minutes: create.planned_minutes,
                    position: create.position,
                })
                .await?;
            if let Some(entry) = self.working.get_mut(create.index) {
                entry.log_id = Some(log_id);
            }
            summary.created += 1;
        }
        Ok(())
    }

    /// Replaces only the baseline with the store's current view of a session.
    async fn rebase_baseline<S: Store>(
        &mut self,
        store: &S,
        session_id: &SessionId,
        catalog: &[CatalogItem],
    ) {
        match store.list_logs_for_session(session_id).await {
            Ok(logs) => self.baseline = build_selection(logs, catalog),
            Err(err) => warn!(%err, "could not re-read session after failed save"),
        }
    }

    /// Writes an actual duration for a persisted entry.
    ///
    /// When the working set has no other pending edits the session is
    /// reloaded; otherwise the value is applied to the working set and the
    /// baseline in place so pending edits survive. Returns false when the
    /// entry does not exist or was never persisted.
    pub async fn record_actual_minutes<S: Store>(
        &mut self,
        store: &S,
        index: usize,
        minutes: f64,
        catalog: &[CatalogItem],
    ) -> Result<bool, StoreError> {
        let Some(log_id) = self.working.get(index).and_then(|e| e.log_id.clone()) else {
            return Ok(false);
        };
        let pending_edits = self.has_unsaved_changes();

        let update = LogUpdate {
            actual_minutes: Some(minutes),
            ..LogUpdate::default()
        };
        store.update_log(&log_id, &update).await?;
        info!(log = %log_id, minutes, "recorded actual time");

        match self.active_session.clone() {
            Some(session_id) if !pending_edits => {
                self.load_session(store, &session_id, catalog).await?;
            }
            _ => {
                for entry in self.working.iter_mut().chain(self.baseline.iter_mut()) {
                    if entry.log_id.as_ref() == Some(&log_id) {
                        entry.actual_minutes = Some(minutes);
                    }
                }
            }
        }
        Ok(true)
    }
}

/// Resolves logs against the catalog in stored order, dropping dangling ones.
fn build_selection(mut logs: Vec<LogRecord>, catalog: &[CatalogItem]) -> Vec<SelectedItem> {
    logs.sort_by_key(|log| log.position);
    logs.iter()
        .filter_map(|log| {
            let item = catalog.iter().find(|item| item.id == log.item_id);
            if item.is_none() {
                debug!(
                    log = %log.id,
                    item = %log.item_id,
                    "dropping log with unknown catalog item"
                );
            }
            item.map(|item| SelectedItem::from_log(item.clone(), log))
        })
        .collect()
}

fn position_of(index: usize) -> u32 {
    u32::try_from(index).unwrap_or(u32::MAX)
}
