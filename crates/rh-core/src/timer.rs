//! Practice timer.
//!
//! Elapsed time is derived from wall-clock timestamps only. Callers may poll
//! [`Timer::elapsed_ms_at`] as often as they like for display; nothing about
//! the accumulated value depends on how often that happens.
//!
//! # States
//!
//! ```text
//! Idle -> Running <-> Paused -> Confirming -> Idle
//! ```
//!
//! `cancel` returns to `Idle` from any state without writing anything.

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::editor::SessionEditor;
use crate::store::{Store, StoreError};
use crate::types::{CatalogItem, LogId, SelectedItem};

const MS_PER_MINUTE: f64 = 60_000.0;

/// Phase of an active timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerPhase {
    Running,
    Paused,
    /// Stopped and waiting for the user to confirm writing the time.
    Confirming,
}

/// State of one timed item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerSession {
    /// Index of the timed entry in the working set.
    pub index: usize,
    log_id: LogId,
    started_at: DateTime<Utc>,
    /// Milliseconds from running segments that already ended.
    accumulated_ms: i64,
    phase: TimerPhase,
}

impl TimerSession {
    pub const fn phase(&self) -> TimerPhase {
        self.phase
    }

    pub const fn accumulated_ms(&self) -> i64 {
        self.accumulated_ms
    }

    fn fold_running_segment(&mut self, now: DateTime<Utc>) {
        let segment = (now - self.started_at).num_milliseconds().max(0);
        self.accumulated_ms += segment;
    }
}

/// The timer engine. At most one item is timed at a time.
#[derive(Debug, Clone, Default)]
pub struct Timer {
    session: Option<TimerSession>,
}

impl Timer {
    pub const fn session(&self) -> Option<&TimerSession> {
        self.session.as_ref()
    }

    pub const fn is_active(&self) -> bool {
        self.session.is_some()
    }

    pub fn phase(&self) -> Option<TimerPhase> {
        self.session.as_ref().map(TimerSession::phase)
    }

    /// Starts timing the entry at `index`.
    ///
    /// Only persisted entries can be timed. A previously recorded actual
    /// duration seeds the accumulated time so practice continues where it
    /// left off. Returns false if the entry is not persisted or a timer is
    /// already active.
    pub fn start(&mut self, index: usize, entry: &SelectedItem) -> bool {
        self.start_at(index, entry, Utc::now())
    }

    pub fn start_at(&mut self, index: usize, entry: &SelectedItem, now: DateTime<Utc>) -> bool {
        if self.session.is_some() {
            return false;
        }
        let Some(log_id) = entry.log_id.clone() else {
            return false;
        };
        let accumulated_ms = entry.actual_minutes.map_or(0, minutes_to_ms);
        debug!(index, accumulated_ms, "timer started");
        self.session = Some(TimerSession {
            index,
            log_id,
            started_at: now,
            accumulated_ms,
            phase: TimerPhase::Running,
        });
        true
    }

    pub fn toggle_pause(&mut self) {
        self.toggle_pause_at(Utc::now());
    }

    /// Pauses a running timer or resumes a paused one.
    pub fn toggle_pause_at(&mut self, now: DateTime<Utc>) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        match session.phase {
            TimerPhase::Running => {
                session.fold_running_segment(now);
                session.phase = TimerPhase::Paused;
            }
            TimerPhase::Paused => {
                session.started_at = now;
                session.phase = TimerPhase::Running;
            }
            TimerPhase::Confirming => {}
        }
    }

    pub fn request_stop(&mut self) {
        self.request_stop_at(Utc::now());
    }

    /// Stops the clock and asks for confirmation.
    pub fn request_stop_at(&mut self, now: DateTime<Utc>) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        match session.phase {
            TimerPhase::Running => {
                session.fold_running_segment(now);
                session.phase = TimerPhase::Confirming;
            }
            TimerPhase::Paused => session.phase = TimerPhase::Confirming,
            TimerPhase::Confirming => {}
        }
    }

    /// Backs out of confirmation into the paused state, keeping the time.
    pub fn cancel_confirm(&mut self) {
        if let Some(session) = self.session.as_mut() {
            if session.phase == TimerPhase::Confirming {
                session.phase = TimerPhase::Paused;
            }
        }
    }

    /// Discards the timer without writing anything.
    pub fn cancel(&mut self) {
        if let Some(session) = self.session.take() {
            debug!(index = session.index, "timer cancelled");
        }
    }

    /// Writes the accumulated time as the entry's actual duration.
    ///
    /// Only acts while confirming. If the timed entry is no longer the
    /// persisted log the timer started on, nothing is written and the timer
    /// is discarded. On a store error the timer stays in confirmation so the
    /// time is not lost. Returns whether a value was written.
    pub async fn confirm<S: Store>(
        &mut self,
        editor: &mut SessionEditor,
        store: &S,
        catalog: &[CatalogItem],
    ) -> Result<bool, StoreError> {
        let Some(session) = self.session.take() else {
            return Ok(false);
        };
        if session.phase != TimerPhase::Confirming {
            self.session = Some(session);
            return Ok(false);
        }

        let same_entry = editor
            .get(session.index)
            .and_then(|entry| entry.log_id.as_ref())
            == Some(&session.log_id);
        if !same_entry {
            debug!(index = session.index, "timed entry is not persisted, discarding timer");
            return Ok(false);
        }

        let minutes = ms_to_minutes(session.accumulated_ms);
        match editor
            .record_actual_minutes(store, session.index, minutes, catalog)
            .await
        {
            Ok(written) => {
                info!(log = %session.log_id, minutes, "timer confirmed");
                Ok(written)
            }
            Err(err) => {
                self.session = Some(session);
                Err(err)
            }
        }
    }

    /// Active time so far, including the current running segment.
    pub fn elapsed_ms_at(&self, now: DateTime<Utc>) -> i64 {
        self.session.as_ref().map_or(0, |session| match session.phase {
            TimerPhase::Running => {
                session.accumulated_ms + (now - session.started_at).num_milliseconds().max(0)
            }
            TimerPhase::Paused | TimerPhase::Confirming => session.accumulated_ms,
        })
    }
}

/// Converts milliseconds to decimal minutes, keeping two decimals.
#[expect(
    clippy::cast_precision_loss,
    reason = "practice durations are far below the f64 mantissa limit"
)]
pub fn ms_to_minutes(ms: i64) -> f64 {
    ((ms.max(0) as f64 / MS_PER_MINUTE) * 100.0).round() / 100.0
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "recorded minutes are small and non-negative"
)]
fn minutes_to_ms(minutes: f64) -> i64 {
    if minutes.is_finite() && minutes > 0.0 {
        (minutes * MS_PER_MINUTE).round() as i64
    } else {
        0
    }
}

/// Formats milliseconds as `MM:SS` (or `H:MM:SS`), rounded to whole seconds.
pub fn format_clock(ms: i64) -> String {
    let sign = if ms < 0 { "-" } else { "" };
    let total_secs = (ms.unsigned_abs() + 500) / 1000;
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    if hours > 0 {
        format!("{sign}{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{sign}{minutes:02}:{seconds:02}")
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate, TimeZone};

    use super::*;
    use crate::memory::{MemoryStore, Operation};
    use crate::types::{ItemId, LogRecord, SessionDraft, SessionId, SessionRecord};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 18, 9, 0, 0).unwrap()
    }

    fn persisted(actual: Option<f64>) -> SelectedItem {
        let item = CatalogItem::new(ItemId::new("item-1").unwrap(), "Scales");
        let log = LogRecord {
            id: LogId::new("log-1").unwrap(),
            item_id: item.id.clone(),
            session_id: SessionId::new("session-1").unwrap(),
            planned_minutes: 5,
            actual_minutes: actual,
            position: 0,
        };
        SelectedItem::from_log(item, &log)
    }

    #[test]
    fn start_requires_persisted_entry() {
        let mut timer = Timer::default();
        let unsaved = SelectedItem::new(
            CatalogItem::new(ItemId::new("item-1").unwrap(), "Scales"),
            5,
        );
        assert!(!timer.start_at(0, &unsaved, t0()));
        assert!(!timer.is_active());

        assert!(timer.start_at(0, &persisted(None), t0()));
        assert!(!timer.start_at(0, &persisted(None), t0()));
    }

    #[test]
    fn accumulated_time_is_sum_of_running_segments() {
        let mut timer = Timer::default();
        timer.start_at(0, &persisted(None), t0());

        // display polling must not affect the result
        for tick in 0..40 {
            let _ = timer.elapsed_ms_at(t0() + Duration::milliseconds(tick * 250));
        }
        timer.toggle_pause_at(t0() + Duration::milliseconds(90_500));
        timer.toggle_pause_at(t0() + Duration::seconds(300));
        timer.toggle_pause_at(t0() + Duration::milliseconds(330_250));

        let session = timer.session().unwrap();
        assert_eq!(session.phase(), TimerPhase::Paused);
        assert_eq!(session.accumulated_ms(), 90_500 + 30_250);
        assert_eq!(timer.elapsed_ms_at(t0() + Duration::hours(2)), 120_750);
    }

    #[test]
    fn prior_actual_minutes_seed_the_timer() {
        let mut timer = Timer::default();
        timer.start_at(0, &persisted(Some(2.5)), t0());

        assert_eq!(timer.elapsed_ms_at(t0() + Duration::seconds(30)), 180_000);
    }

    #[test]
    fn stop_from_running_folds_elapsed_time() {
        let mut timer = Timer::default();
        timer.start_at(0, &persisted(None), t0());

        timer.request_stop_at(t0() + Duration::seconds(42));

        assert_eq!(timer.phase(), Some(TimerPhase::Confirming));
        assert_eq!(timer.elapsed_ms_at(t0() + Duration::seconds(100)), 42_000);
    }

    #[test]
    fn cancel_confirm_returns_to_paused_with_time_kept() {
        let mut timer = Timer::default();
        timer.start_at(0, &persisted(None), t0());
        timer.toggle_pause_at(t0() + Duration::seconds(10));
        timer.request_stop_at(t0() + Duration::seconds(20));
        assert_eq!(timer.phase(), Some(TimerPhase::Confirming));

        timer.toggle_pause_at(t0() + Duration::seconds(25));
        assert_eq!(timer.phase(), Some(TimerPhase::Confirming));

        timer.cancel_confirm();
        assert_eq!(timer.phase(), Some(TimerPhase::Paused));
        assert_eq!(timer.session().unwrap().accumulated_ms(), 10_000);
    }

    #[test]
    fn cancel_discards_from_any_state() {
        let mut timer = Timer::default();
        timer.start_at(0, &persisted(None), t0());
        timer.cancel();
        assert!(!timer.is_active());
        assert_eq!(timer.elapsed_ms_at(t0()), 0);
    }

    #[test]
    fn minutes_conversion_keeps_sub_minute_precision() {
        assert!((ms_to_minutes(90_000) - 1.5).abs() < f64::EPSILON);
        assert!((ms_to_minutes(121_000) - 2.02).abs() < 1e-9);
        assert!(ms_to_minutes(-5).abs() < f64::EPSILON);
        assert_eq!(minutes_to_ms(2.5), 150_000);
        assert_eq!(minutes_to_ms(f64::NAN), 0);
    }

    #[test]
    fn format_clock_rounds_to_seconds() {
        assert_eq!(format_clock(0), "00:00");
        assert_eq!(format_clock(59_499), "00:59");
        assert_eq!(format_clock(59_500), "01:00");
        assert_eq!(format_clock(3_725_000), "1:02:05");
        assert_eq!(format_clock(-61_000), "-01:01");
    }

    async fn saved_editor(store: &MemoryStore) -> SessionEditor {
        let item = CatalogItem::new(ItemId::new("item-1").unwrap(), "Scales");
        store.add_catalog_item(item.clone());
        let mut editor = SessionEditor::default();
        editor.toggle_item(&item);
        let draft = SessionDraft::for_date(NaiveDate::from_ymd_opt(2026, 10, 18).unwrap());
        editor.save(store, &[item], &draft).await.unwrap();
        store.clear_calls();
        editor
    }

    #[tokio::test]
    async fn confirm_writes_actual_minutes_and_goes_idle() {
        let store = MemoryStore::new();
        let mut editor = saved_editor(&store).await;
        let catalog = vec![editor.items()[0].item.clone()];
        let mut timer = Timer::default();
        timer.start_at(0, &editor.items()[0].clone(), t0());
        timer.request_stop_at(t0() + Duration::seconds(150));

        let written = timer.confirm(&mut editor, &store, &catalog).await.unwrap();

        assert!(written);
        assert!(!timer.is_active());
        assert_eq!(store.count(Operation::UpdateLog), 1);
        assert_eq!(editor.items()[0].actual_minutes, Some(2.5));
        let session_id = editor.active_session().unwrap();
        assert_eq!(store.logs(session_id)[0].actual_minutes, Some(2.5));
    }

    #[tokio::test]
    async fn confirm_is_ignored_unless_confirming() {
        let store = MemoryStore::new();
        let mut editor = saved_editor(&store).await;
        let mut timer = Timer::default();
        timer.start_at(0, &editor.items()[0].clone(), t0());

        let written = timer.confirm(&mut editor, &store, &[]).await.unwrap();

        assert!(!written);
        assert_eq!(timer.phase(), Some(TimerPhase::Running));
        assert!(store.write_calls().is_empty());
    }

    #[tokio::test]
    async fn confirm_failure_keeps_timer_for_retry() {
        let store = MemoryStore::new();
        let mut editor = saved_editor(&store).await;
        let catalog = vec![editor.items()[0].item.clone()];
        let mut timer = Timer::default();
        timer.start_at(0, &editor.items()[0].clone(), t0());
        timer.request_stop_at(t0() + Duration::seconds(60));
        store.fail_on(Operation::UpdateLog, 0);

        assert!(timer.confirm(&mut editor, &store, &catalog).await.is_err());
        assert_eq!(timer.phase(), Some(TimerPhase::Confirming));

        assert!(timer.confirm(&mut editor, &store, &catalog).await.unwrap());
        assert!(!timer.is_active());
    }

    #[tokio::test]
    async fn confirm_on_entry_that_lost_its_log_behaves_as_cancel() {
        let store = MemoryStore::new();
        let session_id = SessionId::new("session-9").unwrap();
        store.insert_session(SessionRecord {
            id: session_id,
            label: "x".to_string(),
            date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
        });
        let mut editor = SessionEditor::default();
        editor.toggle_item(&CatalogItem::new(ItemId::new("item-1").unwrap(), "Scales"));
        let mut timer = Timer::default();
        timer.start_at(0, &persisted(None), t0());
        timer.request_stop_at(t0() + Duration::seconds(5));

        let written = timer.confirm(&mut editor, &store, &[]).await.unwrap();

        assert!(!written);
        assert!(!timer.is_active());
        assert!(store.write_calls().is_empty());
    }
}
