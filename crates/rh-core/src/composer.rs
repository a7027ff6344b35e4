//! Input routing across panes.
//!
//! [`Composer`] is the focus state machine. Each input is either consumed by
//! one global shortcut or handed to exactly one handler for the current
//! [`Focus`]. Handlers mutate the editor or timer directly; anything that
//! needs the store comes back to the caller as an [`Effect`] to run with
//! [`Composer::run_effect`].

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, warn};

use crate::catalog::CatalogView;
use crate::editor::{Direction, SaveSummary, SessionEditor};
use crate::focus::{Focus, Input};
use crate::picker::{PickerChoice, SessionPicker};
use crate::store::{Store, StoreError};
use crate::timer::{Timer, TimerPhase};
use crate::types::{CatalogItem, SessionDraft, SessionId, SessionRecord};

/// Longest exact-duration input; planned minutes top out at 999.
const DURATION_INPUT_LEN: usize = 3;

/// Store work requested by an input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Save,
    Refresh,
    LoadSession(SessionId),
    ConfirmTimer,
}

impl Effect {
    const fn busy_kind(&self) -> BusyKind {
        match self {
            Self::Save | Self::ConfirmTimer => BusyKind::Saving,
            Self::Refresh | Self::LoadSession(_) => BusyKind::Loading,
        }
    }
}

/// Result of routing one input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// No handler wanted the input; it is dropped.
    Ignored,
    Consumed,
    /// Consumed, and the caller must run this effect before the next input.
    Effect(Effect),
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusyKind {
    Loading,
    Saving,
}

/// Whether the composer is accepting input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Ready,
    Busy(BusyKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Error,
}

/// One-line message shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    pub kind: StatusKind,
    pub text: String,
}

/// The session composer: panes, editor and timer behind one input entry point.
#[derive(Debug, Clone)]
pub struct Composer {
    focus: Focus,
    phase: Phase,
    catalog: CatalogView,
    picker: SessionPicker,
    editor: SessionEditor,
    timer: Timer,
    /// Digits typed while setting an exact duration in the selection list.
    duration_input: Option<String>,
    status: Option<StatusLine>,
}

impl Default for Composer {
    fn default() -> Self {
        Self::new(SessionEditor::default())
    }
}

impl Composer {
    pub fn new(editor: SessionEditor) -> Self {
        Self {
            focus: Focus::Catalog,
            phase: Phase::Ready,
            catalog: CatalogView::default(),
            picker: SessionPicker::default(),
            editor,
            timer: Timer::default(),
            duration_input: None,
            status: None,
        }
    }

    /// Performs the initial load of catalog and sessions.
    ///
    /// There is no earlier state to fall back to, so errors are returned.
    pub async fn bootstrap<S: Store>(&mut self, store: &S) -> Result<(), StoreError> {
        self.phase = Phase::Busy(BusyKind::Loading);
        let loaded = load_catalog_and_sessions(store).await;
        self.phase = Phase::Ready;
        let (items, sessions) = loaded?;
        debug!(items = items.len(), sessions = sessions.len(), "initial load");
        self.catalog.set_items(items);
        self.picker.set_sessions(sessions);
        Ok(())
    }

    pub const fn focus(&self) -> Focus {
        self.focus
    }

    pub const fn phase(&self) -> Phase {
        self.phase
    }

    pub const fn catalog(&self) -> &CatalogView {
        &self.catalog
    }

    pub const fn picker(&self) -> &SessionPicker {
        &self.picker
    }

    pub const fn editor(&self) -> &SessionEditor {
        &self.editor
    }

    pub const fn timer(&self) -> &Timer {
        &self.timer
    }

    /// Digits typed so far while setting an exact duration.
    pub fn duration_input(&self) -> Option<&str> {
        self.duration_input.as_deref()
    }

    pub const fn status(&self) -> Option<&StatusLine> {
        self.status.as_ref()
    }

    /// The active session's record, if one is active and known.
    pub fn active_session(&self) -> Option<&SessionRecord> {
        self.editor
            .active_session()
            .and_then(|id| self.picker.find(id))
    }

    /// Marks the composer busy before `effect` runs so the shell can show it.
    pub const fn begin_effect(&mut self, effect: &Effect) {
        self.phase = Phase::Busy(effect.busy_kind());
    }

    pub fn handle_input(&mut self, input: Input) -> Dispatch {
        self.handle_input_at(input, Utc::now())
    }

    /// Routes one input. `now` is used for timer transitions.
    pub fn handle_input_at(&mut self, input: Input, now: DateTime<Utc>) -> Dispatch {
        if self.phase != Phase::Ready {
            return Dispatch::Ignored;
        }
        if input == Input::Ctrl('c') {
            return Dispatch::Quit;
        }
        if self.focus == Focus::Timer && !self.timer.is_active() {
            self.focus = Focus::Catalog;
        }

        if let Some(dispatch) = self.global_shortcut(input) {
            debug!(?input, focus = %self.focus, "global shortcut");
            return dispatch;
        }

        let dispatch = match self.focus {
            Focus::Catalog => self.handle_catalog(input),
            Focus::SearchEntry => self.handle_search(input),
            Focus::SessionPicker => self.handle_picker(input),
            Focus::SelectionList => self.handle_selection(input, now),
            Focus::Timer => self.handle_timer(input, now),
        };
        if dispatch == Dispatch::Ignored {
            debug!(?input, focus = %self.focus, "input dropped");
        }
        dispatch
    }

    fn global_shortcut(&mut self, input: Input) -> Option<Dispatch> {
        let typing = self.duration_input.is_some();
        if self.focus == Focus::SearchEntry || (typing && self.focus == Focus::SelectionList) {
            return match input {
                Input::Ctrl('s') => Some(self.request_save()),
                Input::Ctrl('r') => Some(Dispatch::Effect(Effect::Refresh)),
                _ => None,
            };
        }
        if !self.focus.accepts_global_shortcuts() {
            return None;
        }

        let dispatch = match input {
            Input::Char('s') | Input::Ctrl('s') => self.request_save(),
            Input::Char('r') | Input::Ctrl('r') => Dispatch::Effect(Effect::Refresh),
            Input::Char('o') => {
                self.picker.focus(self.editor.active_session());
                self.focus = Focus::SessionPicker;
                Dispatch::Consumed
            }
            Input::Tab => {
                self.focus = self.focus.next_pane(self.editor.is_empty());
                Dispatch::Consumed
            }
            Input::Left | Input::Char('h') => {
                self.focus = Focus::Catalog;
                Dispatch::Consumed
            }
            Input::Right | Input::Char('l' | 'L') => {
                if !self.editor.is_empty() {
                    self.focus = Focus::SelectionList;
                }
                Dispatch::Consumed
            }
            Input::Char('/') => {
                self.focus = Focus::SearchEntry;
                Dispatch::Consumed
            }
            Input::Char('q') => Dispatch::Quit,
            _ => return None,
        };
        Some(dispatch)
    }

    fn request_save(&mut self) -> Dispatch {
        if self.editor.is_empty() && self.editor.active_session().is_none() {
            self.set_info("Nothing to save");
            return Dispatch::Consumed;
        }
        Dispatch::Effect(Effect::Save)
    }

    fn handle_catalog(&mut self, input: Input) -> Dispatch {
        match input {
            Input::Up | Input::Char('k') => self.catalog.move_cursor(Direction::Up),
            Input::Down | Input::Char('j') => self.catalog.move_cursor(Direction::Down),
            Input::Enter | Input::Char(' ') => {
                let Some(item) = self.catalog.selected().cloned() else {
                    return Dispatch::Ignored;
                };
                self.editor.toggle_item(&item);
            }
            Input::Esc if !self.catalog.query().is_empty() => self.catalog.clear_query(),
            _ => return Dispatch::Ignored,
        }
        Dispatch::Consumed
    }

    fn handle_search(&mut self, input: Input) -> Dispatch {
        match input {
            Input::Char(ch) => self.catalog.push_char(ch),
            Input::Backspace => self.catalog.pop_char(),
            Input::Up => self.catalog.move_cursor(Direction::Up),
            Input::Down => self.catalog.move_cursor(Direction::Down),
            Input::Esc | Input::Enter | Input::Tab => self.focus = Focus::Catalog,
            _ => return Dispatch::Ignored,
        }
        Dispatch::Consumed
    }

    fn handle_picker(&mut self, input: Input) -> Dispatch {
        match input {
            Input::Up | Input::Char('k') => self.picker.move_cursor(Direction::Up),
            Input::Down | Input::Char('j') => self.picker.move_cursor(Direction::Down),
            Input::Esc => self.focus = Focus::Catalog,
            Input::Enter => {
                self.focus = Focus::Catalog;
                match self.picker.choice() {
                    PickerChoice::NewSession => {
                        self.timer.cancel();
                        self.editor.clear_session();
                        self.set_info("Started a new session");
                    }
                    PickerChoice::Session(id) => {
                        return Dispatch::Effect(Effect::LoadSession(id));
                    }
                }
            }
            _ => return Dispatch::Ignored,
        }
        Dispatch::Consumed
    }

    fn handle_selection(&mut self, input: Input, now: DateTime<Utc>) -> Dispatch {
        if self.duration_input.is_some() {
            return self.handle_duration_input(input);
        }
        let cursor = self.editor.cursor();
        match input {
            Input::Up | Input::Char('k') => self.editor.move_cursor(Direction::Up),
            Input::Down | Input::Char('j') => self.editor.move_cursor(Direction::Down),
            Input::Char('+' | '=') => {
                self.editor.adjust_duration(cursor, 1);
            }
            Input::Char('-') => {
                self.editor.adjust_duration(cursor, -1);
            }
            Input::Char('e') => self.duration_input = Some(String::new()),
            Input::Char(ch) if ch.is_ascii_digit() => self.duration_input = Some(ch.to_string()),
            Input::Char('x' | 'd') => {
                self.editor.remove_item(cursor);
                if self.editor.is_empty() {
                    self.focus = Focus::Catalog;
                }
            }
            Input::Char('K') => {
                self.editor.move_item(cursor, Direction::Up);
            }
            Input::Char('J') => {
                self.editor.move_item(cursor, Direction::Down);
            }
            Input::Char('t') | Input::Enter => self.start_timer(now),
            Input::Esc => self.focus = Focus::Catalog,
            _ => return Dispatch::Ignored,
        }
        Dispatch::Consumed
    }

    fn handle_duration_input(&mut self, input: Input) -> Dispatch {
        let Some(buffer) = self.duration_input.as_mut() else {
            return Dispatch::Ignored;
        };
        match input {
            Input::Char(ch) if ch.is_ascii_digit() => {
                if buffer.len() < DURATION_INPUT_LEN {
                    buffer.push(ch);
                }
            }
            Input::Backspace => {
                buffer.pop();
            }
            Input::Enter => {
                let typed = std::mem::take(buffer);
                self.duration_input = None;
                let cursor = self.editor.cursor();
                self.editor.set_duration_exact(cursor, &typed);
            }
            Input::Esc => self.duration_input = None,
            _ => return Dispatch::Ignored,
        }
        Dispatch::Consumed
    }

    fn start_timer(&mut self, now: DateTime<Utc>) {
        let cursor = self.editor.cursor();
        let Some(entry) = self.editor.get(cursor) else {
            return;
        };
        if !entry.is_persisted() {
            self.set_info("Save the session before timing this item");
            return;
        }
        if self.timer.start_at(cursor, entry, now) {
            self.status = None;
            self.focus = Focus::Timer;
        }
    }

    fn handle_timer(&mut self, input: Input, now: DateTime<Utc>) -> Dispatch {
        let Some(phase) = self.timer.phase() else {
            return Dispatch::Ignored;
        };
        match (phase, input) {
            (_, Input::Esc | Input::Char('c')) => {
                self.timer.cancel();
                self.focus = Focus::Catalog;
                self.set_info("Timer discarded");
            }
            (TimerPhase::Running | TimerPhase::Paused, Input::Char(' ' | 'p')) => {
                self.timer.toggle_pause_at(now);
            }
            (TimerPhase::Running | TimerPhase::Paused, Input::Char('s') | Input::Enter) => {
                self.timer.request_stop_at(now);
            }
            (TimerPhase::Confirming, Input::Char('y') | Input::Enter) => {
                return Dispatch::Effect(Effect::ConfirmTimer);
            }
            (TimerPhase::Confirming, Input::Char('n')) => self.timer.cancel_confirm(),
            _ => return Dispatch::Ignored,
        }
        Dispatch::Consumed
    }

    /// Runs a store effect to completion, then accepts input again.
    ///
    /// `today` dates a session created by a save.
    pub async fn run_effect<S: Store>(&mut self, store: &S, effect: Effect, today: NaiveDate) {
        self.begin_effect(&effect);
        match effect {
            Effect::Save => self.save(store, today).await,
            Effect::Refresh => self.refresh(store).await,
            Effect::LoadSession(id) => self.load_session(store, &id).await,
            Effect::ConfirmTimer => self.confirm_timer(store).await,
        }
        self.phase = Phase::Ready;
    }

    async fn save<S: Store>(&mut self, store: &S, today: NaiveDate) {
        let draft = SessionDraft::for_date(today);
        match self.editor.save(store, self.catalog.items(), &draft).await {
            Ok(summary) => {
                if summary.session_created {
                    match store.list_sessions().await {
                        Ok(sessions) => self.picker.set_sessions(sessions),
                        Err(err) => warn!(%err, "could not refresh sessions after save"),
                    }
                }
                self.set_info(describe_save(&summary));
            }
            Err(err) => self.fail("Save failed", &err),
        }
    }

    async fn refresh<S: Store>(&mut self, store: &S) {
        let (items, sessions) = match load_catalog_and_sessions(store).await {
            Ok(loaded) => loaded,
            Err(err) => return self.fail("Refresh failed", &err),
        };

        // Nothing is replaced until every load has succeeded.
        let mut message = "Refreshed";
        if let Some(session_id) = self.editor.active_session().cloned() {
            if self.editor.has_unsaved_changes() {
                message = "Refreshed catalog; unsaved edits kept";
            } else if let Err(err) = self.editor.load_session(store, &session_id, &items).await {
                return self.fail("Refresh failed", &err);
            }
        }
        self.catalog.set_items(items);
        self.picker.set_sessions(sessions);
        self.set_info(message);
    }

    async fn load_session<S: Store>(&mut self, store: &S, session_id: &SessionId) {
        self.timer.cancel();
        match self
            .editor
            .load_session(store, session_id, self.catalog.items())
            .await
        {
            Ok(()) => {
                let label = self
                    .picker
                    .find(session_id)
                    .map_or_else(|| session_id.to_string(), |s| s.label.clone());
                self.set_info(format!("Loaded {label}"));
            }
            Err(err) => self.fail("Loading session failed", &err),
        }
    }

    async fn confirm_timer<S: Store>(&mut self, store: &S) {
        let result = self
            .timer
            .confirm(&mut self.editor, store, self.catalog.items())
            .await;
        match result {
            Ok(true) => {
                self.focus = Focus::Catalog;
                self.set_info("Practice time logged");
            }
            Ok(false) => {
                self.timer.cancel();
                self.focus = Focus::Catalog;
                self.set_info("Timer discarded");
            }
            // the timer stays in confirmation so the time can be retried
            Err(err) => {
                warn!(%err, "timer confirm failed");
                self.status = Some(StatusLine {
                    kind: StatusKind::Error,
                    text: format!("Logging time failed: {err}"),
                });
            }
        }
    }

    fn fail(&mut self, what: &str, err: &StoreError) {
        warn!(%err, "{what}");
        self.duration_input = None;
        self.focus = Focus::Catalog;
        self.status = Some(StatusLine {
            kind: StatusKind::Error,
            text: format!("{what}: {err}"),
        });
    }

    fn set_info(&mut self, text: impl Into<String>) {
        self.status = Some(StatusLine {
            kind: StatusKind::Info,
            text: text.into(),
        });
    }
}

async fn load_catalog_and_sessions<S: Store>(
    store: &S,
) -> Result<(Vec<CatalogItem>, Vec<SessionRecord>), StoreError> {
    let items = store.list_catalog_items().await?;
    let sessions = store.list_sessions().await?;
    Ok((items, sessions))
}

fn describe_save(summary: &SaveSummary) -> String {
    if summary.is_noop() {
        return "Nothing changed".to_string();
    }
    let mut text = String::from("Saved");
    if summary.session_created {
        text.push_str(" new session");
    }
    text.push_str(&format!(
        ": {} created, {} updated, {} removed",
        summary.created, summary.updated, summary.deleted
    ));
    text
}
