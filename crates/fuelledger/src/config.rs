//! Configuration management for fuelledger.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::submission::DEFAULT_PLATE_PATTERN;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "fuelledger";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "ledger.db";

/// Default session file name.
const SESSION_FILE_NAME: &str = "session.json";

/// Prefix for environment variable overrides.
pub const ENV_PREFIX: &str = "FUELLEDGER_";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `FUELLEDGER_`, sections separated
///    by a double underscore, e.g. `FUELLEDGER_SESSION__TTL_MINUTES`)
/// 2. TOML config file at `~/.config/fuelledger/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Session configuration.
    pub session: SessionConfig,
    /// Authentication configuration.
    pub auth: AuthConfig,
    /// Submission rules.
    pub submission: SubmissionConfig,
    /// Output configuration.
    pub display: DisplayConfig,
}

/// Storage-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database file.
    /// Defaults to `~/.local/share/fuelledger/ledger.db`
    pub database_path: Option<PathBuf>,
}

/// Session-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Path to the session file.
    /// Defaults to `~/.local/share/fuelledger/session.json`
    pub session_path: Option<PathBuf>,
    /// Minutes a login stays valid.
    pub ttl_minutes: u32,
}

/// Authentication-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// bcrypt work factor for new password hashes.
    pub bcrypt_cost: u32,
}

/// Submission rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubmissionConfig {
    /// Regex a normalized (uppercased) plate must match.
    pub plate_pattern: String,
    /// Liters a load may exceed the tank capacity by.
    /// Negative disables the check.
    pub max_liters_over_capacity: f64,
}

/// Output-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Symbol printed before money amounts.
    pub currency_symbol: String,
    /// Number of loads in the dashboard's recent activity list.
    pub recent_loads: usize,
    /// Default number of rows shown by `history`.
    pub history_limit: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_path: None, // Resolved at runtime
            ttl_minutes: 30,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            bcrypt_cost: bcrypt::DEFAULT_COST,
        }
    }
}

impl Default for SubmissionConfig {
    fn default() -> Self {
        Self {
            plate_pattern: DEFAULT_PLATE_PATTERN.to_string(),
            max_liters_over_capacity: 0.0,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            currency_symbol: "₲".to_string(),
            recent_loads: 3,
            history_limit: 50,
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// Configuration is loaded in this order (later sources override earlier):
    /// 1. Default values
    /// 2. TOML config file (if exists)
    /// 3. Environment variables (prefixed with `FUELLEDGER_`)
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let config: Config = Self::figment(Toml::file(&config_file)).extract()?;
        config.validate()?;
        Ok(config)
    }

    fn figment(file: figment::providers::Data<Toml>) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(file)
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.session.ttl_minutes == 0 {
            return Err(Error::ConfigValidation {
                message: "session.ttl_minutes must be greater than 0".to_string(),
            });
        }

        if !(4..=31).contains(&self.auth.bcrypt_cost) {
            return Err(Error::ConfigValidation {
                message: format!(
                    "auth.bcrypt_cost ({}) must be between 4 and 31",
                    self.auth.bcrypt_cost
                ),
            });
        }

        if regex::Regex::new(&self.submission.plate_pattern).is_err() {
            return Err(Error::ConfigValidation {
                message: format!(
                    "invalid regex pattern: {}",
                    self.submission.plate_pattern
                ),
            });
        }

        if !self.submission.max_liters_over_capacity.is_finite() {
            return Err(Error::ConfigValidation {
                message: "submission.max_liters_over_capacity must be a finite number".to_string(),
            });
        }

        if self.display.history_limit == 0 {
            return Err(Error::ConfigValidation {
                message: "display.history_limit must be greater than 0".to_string(),
            });
        }

        Ok(())
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// Get the session file path, resolving defaults if not set.
    #[must_use]
    pub fn session_path(&self) -> PathBuf {
        self.session
            .session_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(SESSION_FILE_NAME))
    }
}
