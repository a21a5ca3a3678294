//! Station configuration using Figment
//!
//! Configuration is loaded from:
//! 1. `config/qc_station.toml` (or a path given on the command line)
//! 2. Environment variables prefixed with `QC_STATION_`
//!
//! Every field has a default, so a missing file yields a usable configuration.
//!
//! # Example
//! ```no_run
//! use qc_station::config::StationConfig;
//!
//! let config = StationConfig::load()?;
//! println!("Database: {}", config.database.path.display());
//! # Ok::<(), qc_station::error::QcError>(())
//! ```

use crate::error::{AppResult, QcError};
use crate::validation;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default location of the configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "config/qc_station.toml";

/// Top-level station configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StationConfig {
    /// Application settings
    #[serde(default)]
    pub application: ApplicationConfig,
    /// SQLite database settings
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Serial link defaults for the capture session
    #[serde(default)]
    pub serial: SerialConfig,
    /// Validity flag policy
    #[serde(default)]
    pub validity: ValidityConfig,
}

/// Application-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Application name
    #[serde(default = "default_name")]
    pub name: String,
    /// Logging level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Location of the shared database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path of the SQLite file shared by all roles
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

/// Serial link settings.
///
/// `port` is optional: the operator may pass it on the command line instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerialConfig {
    /// Port name (e.g. "COM3", "/dev/ttyUSB0")
    #[serde(default)]
    pub port: Option<String>,
    /// Baud rate
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    /// Wait between writing a query and draining the input buffer
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
    /// Upper bound on a single read
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
}

/// Validity flag configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidityConfig {
    /// A row is `Valid` when every value exceeds this threshold
    #[serde(default = "default_threshold")]
    pub threshold: f64,
}

fn default_name() -> String {
    "QC Station".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("login.db")
}

fn default_baud_rate() -> u32 {
    9600
}

fn default_settle_ms() -> u64 {
    200
}

fn default_read_timeout_ms() -> u64 {
    1000
}

fn default_threshold() -> f64 {
    0.5
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            log_level: default_log_level(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: None,
            baud_rate: default_baud_rate(),
            settle_ms: default_settle_ms(),
            read_timeout_ms: default_read_timeout_ms(),
        }
    }
}

impl Default for ValidityConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
        }
    }
}

impl SerialConfig {
    /// Settle interval as a [`Duration`].
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    /// Read timeout as a [`Duration`].
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

impl StationConfig {
    /// Load configuration from the default path and environment variables
    ///
    /// Environment variables override the file with prefix `QC_STATION_`.
    /// Example: `QC_STATION_APPLICATION__LOG_LEVEL=debug`
    pub fn load() -> AppResult<Self> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration from a specific file path
    pub fn load_from<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let config: Self = Self::figment(path.as_ref()).extract()?;
        config.validate()?;
        Ok(config)
    }

    fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(StationConfig::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("QC_STATION_").split("__"))
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> AppResult<()> {
        let invalid = |field: &str, reason: &str| {
            QcError::Configuration(format!("{field}: {reason}"))
        };

        validation::is_valid_log_level(&self.application.log_level)
            .map_err(|e| invalid("application.log_level", e))?;

        let db_path = self.database.path.to_string_lossy();
        validation::is_valid_path(&db_path).map_err(|e| invalid("database.path", e))?;

        validation::is_valid_baud_rate(self.serial.baud_rate, false)
            .map_err(|e| invalid("serial.baud_rate", e))?;

        if let Some(port) = &self.serial.port {
            validation::is_not_empty(port).map_err(|e| invalid("serial.port", e))?;
        }

        validation::is_in_range(self.serial.settle_ms, 0..=10_000)
            .map_err(|e| invalid("serial.settle_ms", e))?;

        if !self.validity.threshold.is_finite() {
            return Err(invalid("validity.threshold", "must be a finite number"));
        }

        Ok(())
    }
}
