//! Logging setup and configuration

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Error returned when the log filter cannot be built.
#[derive(Debug, thiserror::Error)]
#[error("invalid log filter: {0}")]
pub struct LogFilterError(String);

/// Setup tracing subscriber for the application.
///
/// `RUST_LOG` takes precedence over `default_level` when set.
pub fn setup_logging(default_level: &str) -> Result<(), LogFilterError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| LogFilterError(e.to_string()))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();

    Ok(())
}
