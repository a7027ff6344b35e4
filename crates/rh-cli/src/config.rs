//! Configuration loading and management.

use std::fmt;
use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use rh_core::{DEFAULT_PLANNED_MINUTES, MAX_PLANNED_MINUTES, MIN_PLANNED_MINUTES};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const DEFAULT_TICK_MS: u64 = 250;

/// Which store the composer talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Sqlite,
    Remote,
}

/// A configuration that loaded but cannot be used.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("api_url is required for the remote backend")]
    MissingApiUrl,
    #[error("api_token is required for the remote backend")]
    MissingApiToken,
    #[error("default_minutes must be between 1 and 999, got {0}")]
    DefaultMinutesOutOfRange(u32),
    #[error("tick_ms must be greater than zero")]
    ZeroTick,
}

/// Application configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    pub backend: Backend,
    /// Path to the SQLite database file.
    pub database_path: PathBuf,
    /// Base URL of the remote store.
    pub api_url: Option<String>,
    /// Bearer token for the remote store.
    pub api_token: Option<String>,
    /// Planned minutes for newly selected items.
    pub default_minutes: u32,
    /// Redraw interval of the composer in milliseconds.
    pub tick_ms: u64,
    /// Log file of the interactive composer.
    pub log_path: PathBuf,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("backend", &self.backend)
            .field("database_path", &self.database_path)
            .field("api_url", &self.api_url)
            .field("api_token", &self.api_token.as_ref().map(|_| "[REDACTED]"))
            .field("default_minutes", &self.default_minutes)
            .field("tick_ms", &self.tick_ms)
            .field("log_path", &self.log_path)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        let state_dir = dirs_state_path().unwrap_or_else(|| PathBuf::from("."));
        Self {
            backend: Backend::Sqlite,
            database_path: data_dir.join("rh.db"),
            api_url: None,
            api_token: None,
            default_minutes: DEFAULT_PLANNED_MINUTES,
            tick_ms: DEFAULT_TICK_MS,
            log_path: state_dir.join("rh.log"),
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        Self::figment(config_path).extract()
    }

    fn figment(config_path: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // RH_BACKEND, RH_API_TOKEN, ...
        figment.merge(Env::prefixed("RH_"))
    }

    /// Checks the settings that only make sense together.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_PLANNED_MINUTES..=MAX_PLANNED_MINUTES).contains(&self.default_minutes) {
            return Err(ConfigError::DefaultMinutesOutOfRange(self.default_minutes));
        }
        if self.tick_ms == 0 {
            return Err(ConfigError::ZeroTick);
        }
        if self.backend == Backend::Remote {
            if !has_text(self.api_url.as_deref()) {
                return Err(ConfigError::MissingApiUrl);
            }
            if !has_text(self.api_token.as_deref()) {
                return Err(ConfigError::MissingApiToken);
            }
        }
        Ok(())
    }
}

fn has_text(value: Option<&str>) -> bool {
    value.is_some_and(|v| !v.trim().is_empty())
}

/// Returns the platform-specific config directory for rh.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("rh"))
}

/// Returns the platform-specific data directory for rh.
///
/// On Linux: `~/.local/share/rh`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("rh"))
}

/// Returns the platform-specific state directory for rh.
///
/// On Linux: `~/.local/state/rh`
pub fn dirs_state_path() -> Option<PathBuf> {
    dirs::state_dir().map(|p| p.join("rh"))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn remote() -> Config {
        Config {
            backend: Backend::Remote,
            api_url: Some("https://api.example.com".to_string()),
            api_token: Some("secret-token".to_string()),
            ..Config::default()
        }
    }

    #[test]
    fn default_config_uses_data_dir_for_db() {
        let config = Config::default();
        if let Some(data_dir) = dirs_data_path() {
            assert_eq!(config.database_path, data_dir.join("rh.db"));
        }
        assert_eq!(config.backend, Backend::Sqlite);
        assert_eq!(config.default_minutes, 5);
    }

    #[test]
    fn default_config_is_valid() {
        assert_eq!(Config::default().validate(), Ok(()));
    }

    #[test]
    fn remote_backend_requires_url_and_token() {
        assert_eq!(remote().validate(), Ok(()));

        let mut config = remote();
        config.api_url = None;
        assert_eq!(config.validate(), Err(ConfigError::MissingApiUrl));

        let mut config = remote();
        config.api_token = Some("  ".to_string());
        assert_eq!(config.validate(), Err(ConfigError::MissingApiToken));
    }

    #[test]
    fn default_minutes_are_range_checked() {
        let mut config = Config::default();
        config.default_minutes = 0;
        assert_eq!(
            config.validate(),
            Err(ConfigError::DefaultMinutesOutOfRange(0))
        );
        config.default_minutes = 1000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn debug_redacts_token() {
        let debug = format!("{:?}", remote());
        assert!(!debug.contains("secret-token"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn explicit_file_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "backend = \"remote\"\napi_url = \"https://api.example.com\"\ndefault_minutes = 12"
        )
        .unwrap();

        let config: Config = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(file.path()))
            .extract()
            .unwrap();

        assert_eq!(config.backend, Backend::Remote);
        assert_eq!(config.api_url.as_deref(), Some("https://api.example.com"));
        assert_eq!(config.default_minutes, 12);
        assert_eq!(config.tick_ms, 250);
    }
}
