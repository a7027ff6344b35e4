//! Compose command: the interactive session composer.

use std::time::Duration;

use anyhow::{Context, Result};
use rh_core::{Composer, SessionEditor, Store};

use crate::config::Config;
use crate::tui;

/// Loads catalog and sessions, then hands the terminal to the composer.
///
/// The initial load fails the command before the terminal is touched.
pub async fn run<S: Store>(store: &S, config: &Config) -> Result<()> {
    let mut composer = Composer::new(SessionEditor::new(config.default_minutes));
    composer
        .bootstrap(store)
        .await
        .context("failed to load catalog and sessions")?;
    tui::run(store, composer, Duration::from_millis(config.tick_ms)).await
}

#[cfg(test)]
mod tests {
    use rh_core::MemoryStore;
    use rh_core::memory::Operation;

    use super::*;

    #[tokio::test]
    async fn failed_initial_load_is_reported() {
        let store = MemoryStore::new();
        store.fail_on(Operation::ListCatalogItems, 0);

        let err = run(&store, &Config::default()).await.unwrap_err();

        assert_eq!(err.to_string(), "failed to load catalog and sessions");
        assert_eq!(store.calls().len(), 1);
    }
}
