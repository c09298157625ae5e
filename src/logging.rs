use crate::config::LoggingConfig;
use anyhow::{Context, Result};
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Send `tracing` output to the configured log file so it stays out of the
/// console messages. `RUST_LOG` takes precedence over the configured filter.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let log_file = std::fs::File::create(&config.file)
        .with_context(|| format!("Failed to create log file: {}", config.file))?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Mutex::new(log_file))
        .init();
    Ok(())
}
