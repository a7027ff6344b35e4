use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use rh_cli::commands::{catalog, compose, sessions, show};
use rh_cli::{AnyStore, CatalogAction, Cli, Commands, Config};

/// Initializes tracing.
///
/// The composer owns the terminal, so it logs to `log_file` instead of stderr.
fn init_tracing(verbose: bool, log_file: Option<&Path>) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };

    // try_init: tracing may already be initialized (e.g., in tests)
    if let Some(path) = log_file {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("failed to create log directory")?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("failed to open log file {}", path.display()))?;
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .try_init();
    } else {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init();
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load_from(cli.config.as_deref()).context("failed to load configuration")?;
    let interactive = matches!(cli.command, None | Some(Commands::Compose));
    init_tracing(cli.verbose, interactive.then_some(config.log_path.as_path()))?;
    tracing::debug!(?config, "loaded configuration");
    config.validate().context("invalid configuration")?;

    let mut store = AnyStore::open(&config)?;

    match cli.command {
        None | Some(Commands::Compose) => compose::run(&store, &config).await?,
        Some(Commands::Catalog(CatalogAction::List { json })) => {
            print!("{}", catalog::list(&store, json).await?);
        }
        Some(Commands::Catalog(CatalogAction::Add {
            name,
            category,
            tags,
        })) => {
            let Some(db) = store.database_mut() else {
                bail!("catalog add is only supported with the sqlite backend");
            };
            print!("{}", catalog::add(db, &name, category.as_deref(), &tags)?);
        }
        Some(Commands::Sessions { json }) => {
            print!("{}", sessions::run(&store, json).await?);
        }
        Some(Commands::Show { session }) => {
            print!("{}", show::run(&store, &session).await?);
        }
    }

    Ok(())
}
