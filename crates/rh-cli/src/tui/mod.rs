//! Terminal UI.
//!
//! Owns the terminal while the composer runs: draws every tick, feeds key
//! presses to the [`Composer`] and runs the store effects it requests.

use std::io;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{Local, Utc};
use crossterm::event::{self, Event};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::prelude::*;
use rh_core::{Composer, Dispatch, Store};
use tracing::{debug, info};

pub mod keys;
pub mod view;

/// Runs the composer until the user quits.
pub async fn run<S: Store>(store: &S, mut composer: Composer, tick: Duration) -> Result<()> {
    let mut terminal = TerminalSession::new().context("failed to set up terminal")?;
    info!("composer started");

    loop {
        terminal.draw(|frame| view::draw(frame, &composer, Utc::now()))?;

        // Blocking here is fine: the runtime has nothing else to drive.
        if !event::poll(tick)? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        let Some(input) = keys::to_input(key) else {
            continue;
        };

        match composer.handle_input(input) {
            Dispatch::Quit => break,
            Dispatch::Effect(effect) => {
                debug!(?effect, "running effect");
                composer.begin_effect(&effect);
                terminal.draw(|frame| view::draw(frame, &composer, Utc::now()))?;
                composer
                    .run_effect(store, effect, Local::now().date_naive())
                    .await;
            }
            Dispatch::Consumed | Dispatch::Ignored => {}
        }
    }

    if composer.editor().has_unsaved_changes() {
        info!("composer closed with unsaved changes");
    } else {
        info!("composer closed");
    }
    Ok(())
}

struct TerminalSession {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
}

impl TerminalSession {
    fn new() -> io::Result<Self> {
        enable_raw_mode()?;

        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen).inspect_err(|_| teardown_terminal())?;

        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).inspect_err(|_| teardown_terminal())?;
        terminal.clear().inspect_err(|_| teardown_terminal())?;

        Ok(Self { terminal })
    }

    fn draw(&mut self, draw_fn: impl FnOnce(&mut Frame<'_>)) -> io::Result<()> {
        self.terminal.draw(draw_fn)?;
        Ok(())
    }
}

impl Drop for TerminalSession {
    fn drop(&mut self) {
        let _ = self.terminal.show_cursor();
        teardown_terminal();
    }
}

fn teardown_terminal() {
    let _ = disable_raw_mode();
    let mut stdout = io::stdout();
    let _ = execute!(stdout, LeaveAlternateScreen);
}
