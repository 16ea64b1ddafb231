//! Logging bootstrap.
//!
//! The engine only emits `tracing` events. Embedders that already install a
//! subscriber can skip this module; everyone else calls [`init`] once at
//! startup.

use crate::config::LoggingConfig;
use crate::error::ConfigError;
use once_cell::sync::OnceCell;
use tracing::Level;

static INSTALLED: OnceCell<Level> = OnceCell::new();

/// Install a fmt subscriber at the configured level.
///
/// Only the first successful call installs anything; later calls return the
/// level that is already in effect. If another global subscriber was set
/// outside this module, it is left in place.
///
/// # Errors
///
/// `Invalid` if the configured level is not a tracing level name.
pub fn init(config: &LoggingConfig) -> Result<Level, ConfigError> {
    let level = config.max_level()?;
    Ok(*INSTALLED.get_or_init(|| install(level)))
}

fn install(level: Level) -> Level {
    match tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(true)
        .try_init()
    {
        Ok(()) => tracing::debug!(%level, "installed fmt subscriber"),
        Err(e) => tracing::debug!(error = %e, "keeping existing global subscriber"),
    }
    level
}
