//! Logging setup for applications embedding eventstats.
//!
//! The library only emits `tracing` events; nothing is printed until the
//! host installs a subscriber, either its own or the one built here.

use crate::core::config::LoggingConfig;
use crate::core::{Result, StatsError};

/// Environment variable consulted before `RUST_LOG`
pub const LOG_ENV: &str = "EVENTSTATS_LOG";

/// Install a global subscriber configured by `config`.
///
/// `EVENTSTATS_LOG` then `RUST_LOG` override the configured level. Fails
/// if a global subscriber is already set.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_str()));

    let fmt_layer = if config.structured {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_line_number(true)
            .compact()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .compact()
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| StatsError::config(format!("Failed to initialize logging: {}", e)))?;

    Ok(())
}
