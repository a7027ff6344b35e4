//! Show command: the logged items of one session.

use anyhow::{Context, Result, bail};
use rh_core::{CatalogItem, LogRecord, SessionId, SessionRecord, Store};

use super::{render_lines, truncate};

const ITEM_WIDTH: usize = 24;

/// Format one session and its logs for human-readable output.
pub fn format_session(
    session: &SessionRecord,
    logs: &[LogRecord],
    catalog: &[CatalogItem],
) -> String {
    let mut lines = vec![
        format!("{} ({})", session.label, session.date.format("%Y-%m-%d")),
        String::new(),
    ];
    if logs.is_empty() {
        lines.push("No items logged in this session.".to_string());
        return render_lines(&lines);
    }

    lines.push(format!(
        "{:>3}  {:<ITEM_WIDTH$}  {:>7}  Actual",
        "#", "Item", "Planned"
    ));
    lines.push(format!(
        "{}  {}  {}  {}",
        "─".repeat(3),
        "─".repeat(ITEM_WIDTH),
        "─".repeat(7),
        "─".repeat(8)
    ));

    let mut planned_total: u64 = 0;
    let mut actual_total: Option<f64> = None;
    for (index, log) in logs.iter().enumerate() {
        let name = catalog
            .iter()
            .find(|item| item.id == log.item_id)
            .map_or_else(|| format!("({})", log.item_id), |item| item.name.clone());
        let actual = log
            .actual_minutes
            .map_or_else(|| "-".to_string(), |minutes| format!("{minutes:.2} min"));
        let planned = format!("{} min", log.planned_minutes);
        lines.push(format!(
            "{:>3}  {:<ITEM_WIDTH$}  {planned:>7}  {actual}",
            index + 1,
            truncate(&name, ITEM_WIDTH),
        ));
        planned_total += u64::from(log.planned_minutes);
        if let Some(minutes) = log.actual_minutes {
            actual_total = Some(actual_total.unwrap_or(0.0) + minutes);
        }
    }

    lines.push(String::new());
    lines.push(match actual_total {
        Some(actual) => format!("Total: {planned_total} min planned, {actual:.2} min actual"),
        None => format!("Total: {planned_total} min planned"),
    });
    render_lines(&lines)
}

/// Runs `rh show <session-id>`.
pub async fn run<S: Store>(store: &S, session: &str) -> Result<String> {
    let session_id = SessionId::new(session).context("invalid session id")?;
    let sessions = store
        .list_sessions()
        .await
        .context("failed to list sessions")?;
    let Some(record) = sessions.into_iter().find(|s| s.id == session_id) else {
        bail!("session not found: {session_id}");
    };
    let logs = store
        .list_logs_for_session(&session_id)
        .await
        .context("failed to list session logs")?;
    let catalog = store
        .list_catalog_items()
        .await
        .context("failed to list catalog items")?;
    Ok(format_session(&record, &logs, &catalog))
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use insta::assert_snapshot;
    use rh_core::{ItemId, LogId, MemoryStore};

    use super::*;

    fn store() -> MemoryStore {
        let store = MemoryStore::with_catalog([
            CatalogItem::new(ItemId::new("item-1").unwrap(), "Scales"),
            CatalogItem::new(ItemId::new("item-2").unwrap(), "Etude"),
        ]);
        store.insert_session(SessionRecord {
            id: SessionId::new("session-1").unwrap(),
            label: "Session 2026-10-18".to_string(),
            date: NaiveDate::from_ymd_opt(2026, 10, 18).unwrap(),
        });
        store
    }

    fn log(id: &str, item: &str, planned: u32, actual: Option<f64>, position: u32) -> LogRecord {
        LogRecord {
            id: LogId::new(id).unwrap(),
            item_id: ItemId::new(item).unwrap(),
            session_id: SessionId::new("session-1").unwrap(),
            planned_minutes: planned,
            actual_minutes: actual,
            position,
        }
    }

    #[tokio::test]
    async fn session_with_logs() {
        let store = store();
        store.insert_log(log("log-2", "item-2", 10, None, 1));
        store.insert_log(log("log-1", "item-1", 5, Some(2.5), 0));
        store.insert_log(log("log-3", "gone", 3, Some(1.25), 2));

        let output = run(&store, "session-1").await.unwrap();
        assert_snapshot!(output, @r"
        Session 2026-10-18 (2026-10-18)

          #  Item                      Planned  Actual
        ───  ────────────────────────  ───────  ────────
          1  Scales                      5 min  2.50 min
          2  Etude                      10 min  -
          3  (gone)                      3 min  1.25 min

        Total: 18 min planned, 3.75 min actual
        ");
    }

    #[tokio::test]
    async fn empty_session() {
        let output = run(&store(), "session-1").await.unwrap();
        assert_snapshot!(output, @r"
        Session 2026-10-18 (2026-10-18)

        No items logged in this session.
        ");
    }

    #[tokio::test]
    async fn unknown_session_is_an_error() {
        let err = run(&store(), "nope").await.unwrap_err();
        assert_eq!(err.to_string(), "session not found: nope");
    }
}
