//! Rendering of the composer.

use chrono::{DateTime, Utc};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph};
use rh_core::{
    BusyKind, Composer, Focus, Phase, StatusKind, TimerPhase, format_clock, ms_to_minutes,
};

const FOCUS_COLOR: Color = Color::LightGreen;
const MUTED_COLOR: Color = Color::DarkGray;
const KEY_COLOR: Color = Color::Cyan;
const ERROR_COLOR: Color = Color::LightRed;

pub fn draw(frame: &mut Frame<'_>, composer: &Composer, now: DateTime<Utc>) {
    let area = frame.size();
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(area);

    draw_header(frame, rows[0], composer);
    if composer.focus() == Focus::Timer {
        draw_timer(frame, rows[1], composer, now);
    } else {
        let panes = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(rows[1]);
        draw_catalog(frame, panes[0], composer);
        draw_selection(frame, panes[1], composer);
    }
    draw_search(frame, rows[2], composer);
    draw_status(frame, rows[3], composer);
    draw_hints(frame, rows[4], composer);

    if composer.focus() == Focus::SessionPicker {
        draw_picker(frame, centered_rect(area, 60, 60), composer);
    }
}

fn pane_block(title: String, focused: bool) -> Block<'static> {
    let color = if focused { FOCUS_COLOR } else { MUTED_COLOR };
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color))
        .title(title)
}

fn highlight_style() -> Style {
    Style::default().add_modifier(Modifier::REVERSED)
}

fn draw_header(frame: &mut Frame<'_>, area: Rect, composer: &Composer) {
    let session = composer.active_session().map_or_else(
        || "new session".to_string(),
        |s| format!("{} ({})", s.label, s.date.format("%Y-%m-%d")),
    );
    let mut spans = vec![
        Span::styled("rehearse", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw("  "),
        Span::raw(session),
    ];
    if composer.editor().has_unsaved_changes() {
        spans.push(Span::styled("  [unsaved]", Style::default().fg(Color::Yellow)));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn draw_catalog(frame: &mut Frame<'_>, area: Rect, composer: &Composer) {
    let catalog = composer.catalog();
    let focused = composer.focus() == Focus::Catalog;
    let title = if catalog.query().is_empty() {
        " Catalog ".to_string()
    } else {
        format!(" Catalog ({} matches) ", catalog.visible_len())
    };
    let block = pane_block(title, focused);

    if catalog.visible_len() == 0 {
        let message = if catalog.items().is_empty() {
            "The catalog is empty."
        } else {
            "No items match the search."
        };
        let paragraph = Paragraph::new(Span::styled(message, Style::default().fg(MUTED_COLOR)))
            .block(block);
        frame.render_widget(paragraph, area);
        return;
    }

    let items: Vec<ListItem> = catalog
        .visible()
        .map(|item| {
            let marker = if composer.editor().contains(&item.id) {
                "[x] "
            } else {
                "[ ] "
            };
            let mut spans = vec![Span::raw(marker), Span::raw(item.name.clone())];
            if let Some(category) = &item.category {
                spans.push(Span::styled(
                    format!("  {category}"),
                    Style::default().fg(MUTED_COLOR),
                ));
            }
            ListItem::new(Line::from(spans))
        })
        .collect();
    let list = List::new(items)
        .block(block)
        .highlight_style(highlight_style())
        .highlight_symbol("> ");
    let mut state = ListState::default().with_selected(Some(catalog.cursor()));
    frame.render_stateful_widget(list, area, &mut state);
}

fn draw_selection(frame: &mut Frame<'_>, area: Rect, composer: &Composer) {
    let editor = composer.editor();
    let focused = composer.focus() == Focus::SelectionList;
    let block = pane_block(format!(" Session ({} items) ", editor.len()), focused);

    if editor.is_empty() {
        let paragraph = Paragraph::new(Span::styled(
            "Select catalog items with enter.",
            Style::default().fg(MUTED_COLOR),
        ))
        .block(block);
        frame.render_widget(paragraph, area);
        return;
    }

    let typing = composer.duration_input().filter(|_| focused);
    let items: Vec<ListItem> = editor
        .items()
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            let mut spans = vec![
                Span::raw(format!("{}. {}", index + 1, entry.item.name)),
                Span::styled(
                    format!("  {} min", entry.planned_minutes),
                    Style::default().fg(KEY_COLOR),
                ),
            ];
            if let Some(actual) = entry.actual_minutes {
                spans.push(Span::raw(format!("  done {actual:.2} min")));
            }
            if !entry.is_persisted() {
                spans.push(Span::styled("  new", Style::default().fg(Color::Yellow)));
            }
            if let Some(buffer) = typing.filter(|_| index == editor.cursor()) {
                spans.push(Span::styled(
                    format!("  set: {buffer}_"),
                    Style::default().fg(FOCUS_COLOR),
                ));
            }
            ListItem::new(Line::from(spans))
        })
        .collect();
    let list = List::new(items)
        .block(block)
        .highlight_style(highlight_style())
        .highlight_symbol("> ");
    let mut state = ListState::default().with_selected(Some(editor.cursor()));
    frame.render_stateful_widget(list, area, &mut state);
}

fn draw_search(frame: &mut Frame<'_>, area: Rect, composer: &Composer) {
    let query = composer.catalog().query();
    let line = if composer.focus() == Focus::SearchEntry {
        Line::from(vec![
            Span::styled("/ ", Style::default().fg(FOCUS_COLOR)),
            Span::raw(format!("{query}_")),
        ])
    } else if query.is_empty() {
        Line::from(Span::styled("/ search", Style::default().fg(MUTED_COLOR)))
    } else {
        Line::from(vec![
            Span::styled("/ ", Style::default().fg(MUTED_COLOR)),
            Span::raw(query.to_string()),
        ])
    };
    frame.render_widget(Paragraph::new(line), area);
}

fn draw_status(frame: &mut Frame<'_>, area: Rect, composer: &Composer) {
    let line = match composer.phase() {
        Phase::Busy(BusyKind::Saving) => {
            Line::from(Span::styled("Saving...", Style::default().fg(Color::Yellow)))
        }
        Phase::Busy(BusyKind::Loading) => {
            Line::from(Span::styled("Loading...", Style::default().fg(Color::Yellow)))
        }
        Phase::Ready => match composer.status() {
            Some(status) => {
                let color = match status.kind {
                    StatusKind::Info => Color::Reset,
                    StatusKind::Error => ERROR_COLOR,
                };
                Line::from(Span::styled(status.text.clone(), Style::default().fg(color)))
            }
            None => Line::default(),
        },
    };
    frame.render_widget(Paragraph::new(line), area);
}

fn key_hints(composer: &Composer) -> &'static [(&'static str, &'static str)] {
    match composer.focus() {
        Focus::Catalog => &[
            ("enter", "toggle"),
            ("/", "search"),
            ("tab", "next"),
            ("o", "sessions"),
            ("s", "save"),
            ("r", "refresh"),
            ("q", "quit"),
        ],
        Focus::SearchEntry => &[("enter/esc", "done"), ("ctrl-s", "save"), ("ctrl-c", "quit")],
        Focus::SelectionList if composer.duration_input().is_some() => {
            &[("0-9", "minutes"), ("enter", "apply"), ("esc", "cancel")]
        }
        Focus::SelectionList => &[
            ("+/-", "minutes"),
            ("e", "exact"),
            ("K/J", "move"),
            ("x", "remove"),
            ("t", "timer"),
            ("s", "save"),
        ],
        Focus::SessionPicker => &[("enter", "open"), ("esc", "back")],
        Focus::Timer => match composer.timer().phase() {
            Some(TimerPhase::Confirming) => &[
                ("y", "log time"),
                ("n", "keep timing"),
                ("esc", "discard"),
            ],
            _ => &[("space", "pause"), ("s", "stop"), ("esc", "discard")],
        },
    }
}

fn draw_hints(frame: &mut Frame<'_>, area: Rect, composer: &Composer) {
    let mut spans = Vec::new();
    for (key, label) in key_hints(composer) {
        if !spans.is_empty() {
            spans.push(Span::raw("  "));
        }
        spans.push(Span::styled(*key, Style::default().fg(KEY_COLOR)));
        spans.push(Span::raw(" "));
        spans.push(Span::styled(*label, Style::default().fg(MUTED_COLOR)));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn draw_timer(frame: &mut Frame<'_>, area: Rect, composer: &Composer, now: DateTime<Utc>) {
    let timer = composer.timer();
    let Some(session) = timer.session() else {
        return;
    };
    let entry = composer.editor().get(session.index);
    let name = entry.map_or("(removed item)", |entry| entry.item.name.as_str());
    let elapsed = timer.elapsed_ms_at(now);

    let phase = match session.phase() {
        TimerPhase::Running => Line::from("running"),
        TimerPhase::Paused => {
            Line::from(Span::styled("paused", Style::default().fg(Color::Yellow)))
        }
        TimerPhase::Confirming => Line::from(Span::styled(
            format!("Log {:.2} min as actual time? (y/n)", ms_to_minutes(elapsed)),
            Style::default().fg(FOCUS_COLOR),
        )),
    };
    let mut lines = vec![
        Line::default(),
        Line::from(Span::styled(name, Style::default().add_modifier(Modifier::BOLD))),
    ];
    if let Some(entry) = entry {
        lines.push(Line::from(Span::styled(
            format!("planned {} min", entry.planned_minutes),
            Style::default().fg(MUTED_COLOR),
        )));
    }
    lines.push(Line::default());
    lines.push(Line::from(Span::styled(
        format_clock(elapsed),
        Style::default().add_modifier(Modifier::BOLD),
    )));
    lines.push(Line::default());
    lines.push(phase);

    let paragraph = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(pane_block(" Timer ".to_string(), true));
    frame.render_widget(paragraph, area);
}

fn draw_picker(frame: &mut Frame<'_>, area: Rect, composer: &Composer) {
    let picker = composer.picker();
    let active = composer.editor().active_session();

    let mut items = vec![ListItem::new(Line::from(Span::styled(
        "+ New session",
        Style::default().fg(FOCUS_COLOR),
    )))];
    items.extend(picker.sessions().iter().map(|session| {
        let marker = if Some(&session.id) == active { "* " } else { "  " };
        ListItem::new(Line::from(format!(
            "{marker}{}  {}",
            session.date.format("%Y-%m-%d"),
            session.label
        )))
    }));

    let list = List::new(items)
        .block(pane_block(" Sessions ".to_string(), true))
        .highlight_style(highlight_style())
        .highlight_symbol("> ");
    let mut state = ListState::default().with_selected(Some(picker.cursor()));
    frame.render_widget(Clear, area);
    frame.render_stateful_widget(list, area, &mut state);
}

/// A rectangle of the given percentages centered in `area`.
fn centered_rect(area: Rect, percent_x: u16, percent_y: u16) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}
