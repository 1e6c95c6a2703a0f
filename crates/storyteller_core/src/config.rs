//! Core runtime configuration.
//!
//! # Responsibility
//! - Hold the knobs hosts may tune: storage path, logging, autosave delay.
//! - Validate values before any subsystem starts.
//!
//! # Invariants
//! - Defaults are usable as-is; every field may be omitted when parsing.

use crate::logging::default_log_level;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

/// Default SQLite file name, relative to the working directory.
pub const DEFAULT_DB_FILE_NAME: &str = "storyteller.sqlite3";
/// Trailing-edge debounce applied to mutations before a save.
pub const DEFAULT_AUTOSAVE_DELAY_MS: u64 = 1200;

/// Configuration validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    EmptyDbPath,
    ZeroAutosaveDelay,
    RelativeLogDir(PathBuf),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyDbPath => write!(f, "db_path cannot be empty"),
            Self::ZeroAutosaveDelay => write!(f, "autosave_delay_ms must be greater than zero"),
            Self::RelativeLogDir(path) => write!(
                f,
                "log_dir must be an absolute path, got `{}`",
                path.display()
            ),
        }
    }
}

impl Error for ConfigError {}

/// Runtime configuration shared by core hosts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// SQLite database file.
    pub db_path: PathBuf,
    /// Directory for rolling log files; `None` disables file logging.
    pub log_dir: Option<PathBuf>,
    /// One of `trace|debug|info|warn|error`.
    pub log_level: String,
    /// Autosave debounce in milliseconds.
    pub autosave_delay_ms: u64,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_FILE_NAME),
            log_dir: None,
            log_level: default_log_level().to_string(),
            autosave_delay_ms: DEFAULT_AUTOSAVE_DELAY_MS,
        }
    }
}

impl CoreConfig {
    /// Checks values that would otherwise fail late inside a subsystem.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.db_path.as_os_str().is_empty() {
            return Err(ConfigError::EmptyDbPath);
        }
        if self.autosave_delay_ms == 0 {
            return Err(ConfigError::ZeroAutosaveDelay);
        }
        if let Some(dir) = &self.log_dir {
            if !dir.is_absolute() {
                return Err(ConfigError::RelativeLogDir(dir.clone()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, CoreConfig, DEFAULT_AUTOSAVE_DELAY_MS};
    use std::path::PathBuf;

    #[test]
    fn default_config_is_valid() {
        let config = CoreConfig::default();
        assert_eq!(config.autosave_delay_ms, DEFAULT_AUTOSAVE_DELAY_MS);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: CoreConfig =
            serde_json::from_str(r#"{ "autosave_delay_ms": 300 }"#).expect("config should parse");
        assert_eq!(config.autosave_delay_ms, 300);
        assert_eq!(config.db_path, CoreConfig::default().db_path);
    }

    #[test]
    fn validate_rejects_zero_delay_and_relative_log_dir() {
        let config = CoreConfig {
            autosave_delay_ms: 0,
            ..CoreConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroAutosaveDelay));

        let config = CoreConfig {
            log_dir: Some(PathBuf::from("logs")),
            ..CoreConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::RelativeLogDir(_))
        ));
    }
}
