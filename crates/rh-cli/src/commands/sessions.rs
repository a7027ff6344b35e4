//! Sessions command: lists stored sessions, most recent first.

use anyhow::{Context, Result};
use rh_core::{SessionRecord, Store};

use super::{render_lines, truncate};

const LABEL_WIDTH: usize = 24;

/// Format sessions for human-readable output.
pub fn format_sessions(sessions: &[SessionRecord]) -> String {
    let mut lines = Vec::new();
    if sessions.is_empty() {
        lines.push("No sessions yet.".to_string());
        lines.push(String::new());
        lines.push("Hint: Run 'rh' to compose one.".to_string());
        return render_lines(&lines);
    }

    lines.push(format!("SESSIONS ({})", sessions.len()));
    lines.push(String::new());
    lines.push(format!("{:<10}  {:<LABEL_WIDTH$}  ID", "Date", "Label"));
    lines.push(format!(
        "{}  {}  {}",
        "─".repeat(10),
        "─".repeat(LABEL_WIDTH),
        "─".repeat(36)
    ));
    for session in sessions {
        lines.push(format!(
            "{:<10}  {:<LABEL_WIDTH$}  {}",
            session.date.format("%Y-%m-%d").to_string(),
            truncate(&session.label, LABEL_WIDTH),
            session.id
        ));
    }
    render_lines(&lines)
}

/// Runs `rh sessions`.
pub async fn run<S: Store>(store: &S, json: bool) -> Result<String> {
    let sessions = store
        .list_sessions()
        .await
        .context("failed to list sessions")?;
    if json {
        Ok(serde_json::to_string_pretty(&sessions)? + "\n")
    } else {
        Ok(format_sessions(&sessions))
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use insta::assert_snapshot;
    use rh_core::{MemoryStore, SessionId};

    use super::*;

    fn session(id: &str, label: &str, day: u32) -> SessionRecord {
        SessionRecord {
            id: SessionId::new(id).unwrap(),
            label: label.to_string(),
            date: NaiveDate::from_ymd_opt(2026, 10, day).unwrap(),
        }
    }

    #[test]
    fn empty_sessions_show_hint() {
        assert_snapshot!(format_sessions(&[]), @r"
        No sessions yet.

        Hint: Run 'rh' to compose one.
        ");
    }

    #[tokio::test]
    async fn sessions_table_is_most_recent_first() {
        let store = MemoryStore::new();
        store.insert_session(session("session-1", "Session 2026-10-01", 1));
        store.insert_session(session("session-2", "Evening run-through", 18));

        let output = run(&store, false).await.unwrap();
        assert_snapshot!(output, @r"
        SESSIONS (2)

        Date        Label                     ID
        ──────────  ────────────────────────  ────────────────────────────────────
        2026-10-18  Evening run-through       session-2
        2026-10-01  Session 2026-10-01        session-1
        ");
    }

    #[tokio::test]
    async fn sessions_json() {
        let store = MemoryStore::new();
        store.insert_session(session("session-1", "Session 2026-10-01", 1));

        let output = run(&store, true).await.unwrap();
        assert_snapshot!(output, @r#"
        [
          {
            "id": "session-1",
            "label": "Session 2026-10-01",
            "date": "2026-10-01"
          }
        ]
        "#);
    }
}
