//! Configuration for the `taskdeck` CLI.
//!
//! Supports layered configuration with the following priority
//! (highest first):
//! 1. CLI arguments / environment variables (resolved by the binary)
//! 2. TOML config file (`~/.config/taskdeck/config.toml`)
//! 3. Compiled defaults
//!
//! A missing config file at the default location is not an error
//! (defaults are used). An explicit config path that doesn't exist is.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::reminder::{DEFAULT_LOOKAHEAD, DEFAULT_POLL_INTERVAL, ReminderConfig};

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse the TOML configuration.
    #[error("failed to parse config file: {0}")]
    ParseToml(#[from] toml::de::Error),

    /// Could not determine a data directory for the default task file.
    #[error("could not determine a data directory (no HOME or XDG_DATA_HOME)")]
    NoDataDir,
}

// ---------------------------------------------------------------------------
// TOML file structs (all fields Option for partial overrides)
// ---------------------------------------------------------------------------

/// Top-level TOML config file structure.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ConfigFile {
    storage: StorageFileConfig,
    reminder: ReminderFileConfig,
}

/// `[storage]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct StorageFileConfig {
    data_file: Option<PathBuf>,
}

/// `[reminder]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ReminderFileConfig {
    poll_interval_secs: Option<u64>,
    lookahead_secs: Option<u64>,
}

// ---------------------------------------------------------------------------
// Resolved configuration
// ---------------------------------------------------------------------------

/// Values the binary layer resolved ahead of the config file (CLI
/// flags and environment variables). Kept free of any CLI-parsing
/// dependency so resolution is unit-testable.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Explicit config file path; the default location is used if absent.
    pub config_path: Option<PathBuf>,
    /// Task data file override.
    pub data_file: Option<PathBuf>,
    /// Poll interval override, in seconds.
    pub poll_interval_secs: Option<u64>,
    /// Lookahead window override, in seconds.
    pub lookahead_secs: Option<u64>,
}

/// Fully resolved application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Durable task file path.
    pub data_file: PathBuf,
    /// Pause between reminder poll passes.
    pub poll_interval: Duration,
    /// Window before a deadline in which a reminder fires.
    pub lookahead: Duration,
}

impl AppConfig {
    /// Loads configuration by merging overrides, the TOML file, and
    /// compiled defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if an explicitly named config file
    /// cannot be read or parsed, or if no data file is configured and
    /// no platform data directory exists to derive the default.
    pub fn load(overrides: &ConfigOverrides) -> Result<Self, ConfigError> {
        let file = load_config_file(overrides.config_path.as_deref())?;
        Self::resolve(overrides, &file)
    }

    /// Resolves a config from overrides and a parsed file.
    /// Priority: overrides > file > default.
    fn resolve(overrides: &ConfigOverrides, file: &ConfigFile) -> Result<Self, ConfigError> {
        let data_file = overrides
            .data_file
            .clone()
            .or_else(|| file.storage.data_file.clone())
            .map_or_else(default_data_file, Ok)?;

        Ok(Self {
            data_file,
            poll_interval: overrides
                .poll_interval_secs
                .or(file.reminder.poll_interval_secs)
                .map_or(DEFAULT_POLL_INTERVAL, Duration::from_secs),
            lookahead: overrides
                .lookahead_secs
                .or(file.reminder.lookahead_secs)
                .map_or(DEFAULT_LOOKAHEAD, Duration::from_secs),
        })
    }

    /// Returns the scheduler timing carried by this configuration.
    #[must_use]
    pub fn reminder(&self) -> ReminderConfig {
        ReminderConfig {
            poll_interval: self.poll_interval,
            lookahead: self.lookahead,
        }
    }
}

/// Default durable file location: `<data dir>/taskdeck/tasks.json`.
fn default_data_file() -> Result<PathBuf, ConfigError> {
    dirs::data_dir()
        .map(|dir| dir.join("taskdeck").join("tasks.json"))
        .ok_or(ConfigError::NoDataDir)
}

/// Loads and parses a TOML config file.
///
/// If `explicit_path` is `Some`, the file must exist (error if not).
/// If `explicit_path` is `None`, the default path is tried and a
/// missing file is treated as empty config.
fn load_config_file(explicit_path: Option<&Path>) -> Result<ConfigFile, ConfigError> {
    let path = if let Some(p) = explicit_path {
        let contents = std::fs::read_to_string(p).map_err(|e| ConfigError::ReadFile {
            path: p.to_path_buf(),
            source: e,
        })?;
        return Ok(toml::from_str(&contents)?);
    } else {
        let Some(config_dir) = dirs::config_dir() else {
            // No config dir available — use defaults.
            return Ok(ConfigFile::default());
        };
        config_dir.join("taskdeck").join("config.toml")
    };

    match std::fs::read_to_string(&path) {
        Ok(contents) => Ok(toml::from_str(&contents)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ConfigFile::default()),
        Err(e) => Err(ConfigError::ReadFile { path, source: e }),
    }
}
