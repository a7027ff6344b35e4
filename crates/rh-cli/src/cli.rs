//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Compose practice sessions from a catalog.
///
/// Without a subcommand the interactive composer is started.
#[derive(Debug, Parser)]
#[command(name = "rh", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Open the interactive session composer.
    Compose,

    /// Inspect or extend the catalog.
    #[command(subcommand)]
    Catalog(CatalogAction),

    /// List stored sessions, most recent first.
    Sessions {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show the logged items of one session.
    Show {
        /// The session ID.
        session: String,
    },
}

/// Catalog subcommands.
#[derive(Debug, Subcommand)]
pub enum CatalogAction {
    /// List catalog items.
    List {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Add a catalog item (SQLite backend only).
    Add {
        /// Item name.
        name: String,

        /// Category shown next to the name.
        #[arg(long)]
        category: Option<String>,

        /// Tag to attach; repeat for several.
        #[arg(long = "tag")]
        tags: Vec<String>,
    },
}
