//! Error types for the execstore facade.
//!
//! Operation errors are the engine taxonomy, re-exported unchanged so that
//! callers match on one enum regardless of which layer produced the failure.
//! Configuration loading has its own small error type because it happens
//! before any store exists.

use thiserror::Error;

pub use execstore_core::{Error, Result};

/// Failure to load or apply a [`StoreConfig`](crate::StoreConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Reading the configuration file failed
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// The TOML did not parse into a configuration
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value parsed but is out of range
    #[error("invalid config value for {field}: {reason}")]
    Invalid {
        /// Dotted field name
        field: &'static str,
        /// What is wrong with it
        reason: String,
    },
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Error::Internal(err.to_string())
    }
}
