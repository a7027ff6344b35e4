//! Session picker: "new session" followed by the stored sessions.

use crate::editor::Direction;
use crate::types::{SessionId, SessionRecord};

/// What the picker's cursor points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickerChoice {
    NewSession,
    Session(SessionId),
}

#[derive(Debug, Clone, Default)]
pub struct SessionPicker {
    sessions: Vec<SessionRecord>,
    /// 0 is the "new session" entry; `n` is `sessions[n - 1]`.
    cursor: usize,
}

impl SessionPicker {
    pub fn new(sessions: Vec<SessionRecord>) -> Self {
        Self {
            sessions,
            cursor: 0,
        }
    }

    pub fn sessions(&self) -> &[SessionRecord] {
        &self.sessions
    }

    pub fn set_sessions(&mut self, sessions: Vec<SessionRecord>) {
        self.sessions = sessions;
        self.cursor = self.cursor.min(self.sessions.len());
    }

    pub fn find(&self, session_id: &SessionId) -> Option<&SessionRecord> {
        self.sessions.iter().find(|s| &s.id == session_id)
    }

    pub const fn cursor(&self) -> usize {
        self.cursor
    }

    /// Number of entries, including "new session".
    pub fn len(&self) -> usize {
        self.sessions.len() + 1
    }

    pub const fn is_empty(&self) -> bool {
        false
    }

    /// Points the cursor at `session_id`, or at "new session" for `None`.
    pub fn focus(&mut self, session_id: Option<&SessionId>) {
        self.cursor = session_id
            .and_then(|id| self.sessions.iter().position(|s| &s.id == id))
            .map_or(0, |index| index + 1);
    }

    pub fn move_cursor(&mut self, direction: Direction) {
        match direction {
            Direction::Up => self.cursor = self.cursor.saturating_sub(1),
            Direction::Down => {
                if self.cursor < self.sessions.len() {
                    self.cursor += 1;
                }
            }
        }
    }

    pub fn choice(&self) -> PickerChoice {
        match self.cursor.checked_sub(1).and_then(|i| self.sessions.get(i)) {
            Some(session) => PickerChoice::Session(session.id.clone()),
            None => PickerChoice::NewSession,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn session(id: &str, day: u32) -> SessionRecord {
        SessionRecord {
            id: SessionId::new(id).unwrap(),
            label: format!("Session {id}"),
            date: NaiveDate::from_ymd_opt(2026, 10, day).unwrap(),
        }
    }

    #[test]
    fn first_entry_is_new_session() {
        let picker = SessionPicker::new(vec![session("a", 2)]);
        assert_eq!(picker.len(), 2);
        assert_eq!(picker.choice(), PickerChoice::NewSession);
    }

    #[test]
    fn cursor_walks_sessions_and_stops_at_end() {
        let mut picker = SessionPicker::new(vec![session("a", 2), session("b", 1)]);
        picker.move_cursor(Direction::Down);
        assert_eq!(picker.choice(), PickerChoice::Session(SessionId::new("a").unwrap()));
        picker.move_cursor(Direction::Down);
        picker.move_cursor(Direction::Down);
        assert_eq!(picker.choice(), PickerChoice::Session(SessionId::new("b").unwrap()));
        picker.move_cursor(Direction::Up);
        picker.move_cursor(Direction::Up);
        picker.move_cursor(Direction::Up);
        assert_eq!(picker.choice(), PickerChoice::NewSession);
    }

    #[test]
    fn focus_points_at_active_session() {
        let mut picker = SessionPicker::new(vec![session("a", 2), session("b", 1)]);
        picker.focus(Some(&SessionId::new("b").unwrap()));
        assert_eq!(picker.cursor(), 2);
        picker.focus(Some(&SessionId::new("gone").unwrap()));
        assert_eq!(picker.cursor(), 0);
    }

    #[test]
    fn shrinking_session_list_clamps_cursor() {
        let mut picker = SessionPicker::new(vec![session("a", 2), session("b", 1)]);
        picker.focus(Some(&SessionId::new("b").unwrap()));
        picker.set_sessions(vec![session("a", 2)]);
        assert_eq!(picker.cursor(), 1);
    }
}
