//! Store configuration.
//!
//! Every field has a default, so an empty document is a valid configuration:
//!
//! ```toml
//! default_timeout_ms = 10000
//! max_page_size = 1000
//! allow_legacy_cas = true
//!
//! [logging]
//! level = "info"
//! ```

use crate::error::ConfigError;
use execstore_engine::StoreOptions;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

const DEFAULT_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_MAX_PAGE_SIZE: usize = 1_000;

/// Configuration of an [`ExecutionStore`](crate::ExecutionStore).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Deadline applied by the convenience methods, in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub default_timeout_ms: u64,

    /// Upper bound on list page sizes; larger requests are clamped
    #[serde(default = "default_max_page_size")]
    pub max_page_size: usize,

    /// Permit the `next_event_id` CAS for records written before versioning.
    ///
    /// Turning this off makes every request that would need it fail with
    /// `Internal`, so operators can confirm the path is unused.
    #[serde(default = "default_allow_legacy_cas")]
    pub allow_legacy_cas: bool,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Maximum level: `trace`, `debug`, `info`, `warn` or `error`
    #[serde(default = "default_level")]
    pub level: String,
}

const fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

const fn default_max_page_size() -> usize {
    DEFAULT_MAX_PAGE_SIZE
}

const fn default_allow_legacy_cas() -> bool {
    true
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            default_timeout_ms: DEFAULT_TIMEOUT_MS,
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
            allow_legacy_cas: true,
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

impl StoreConfig {
    /// Parse and validate a TOML document.
    ///
    /// # Errors
    ///
    /// `Parse` for malformed TOML, `Invalid` for out-of-range values.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: StoreConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    ///
    /// # Errors
    ///
    /// As [`from_toml_str`](Self::from_toml_str), plus `Io` if the file
    /// cannot be read.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// `Invalid` naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_timeout_ms == 0 {
            return Err(ConfigError::invalid(
                "default_timeout_ms",
                "must be positive",
            ));
        }
        if self.max_page_size == 0 {
            return Err(ConfigError::invalid("max_page_size", "must be positive"));
        }
        self.logging.max_level()?;
        Ok(())
    }

    /// Default deadline as a duration
    pub fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.default_timeout_ms)
    }

    /// Engine options derived from this configuration
    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            allow_legacy_cas: self.allow_legacy_cas,
            max_page_size: self.max_page_size,
        }
    }
}

impl LoggingConfig {
    /// Parsed maximum level.
    ///
    /// # Errors
    ///
    /// `Invalid` if `level` is not a tracing level name.
    pub fn max_level(&self) -> Result<tracing::Level, ConfigError> {
        self.level
            .parse()
            .map_err(|_| ConfigError::invalid("logging.level", format!("unknown level '{}'", self.level)))
    }
}
