//! Rehearse CLI library.
//!
//! Provides the `rh` command line and the terminal session composer.

mod cli;
pub mod commands;
mod config;
pub mod store;
pub mod tui;

pub use cli::{CatalogAction, Cli, Commands};
pub use config::{Backend, Config, ConfigError};
pub use store::AnyStore;
