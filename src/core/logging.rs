//! Logging initialization
//!
//! Console output always goes to stderr; `logging.file` adds a second,
//! ANSI-free layer appending to a file. `RUST_LOG` wins over the configured
//! level. Records emitted through the `log` facade by dependencies are
//! bridged into `tracing`.

use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter, Registry};

use crate::core::config::LoggingConfig;

/// Build the filter from `RUST_LOG`, falling back to the configured level.
pub fn env_filter(config: &LoggingConfig) -> EnvFilter {
    let from_env = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    filter_from(from_env.as_deref(), &config.level)
}

fn filter_from(directives: Option<&str>, level: &str) -> EnvFilter {
    directives
        .filter(|d| !d.trim().is_empty())
        .and_then(|d| EnvFilter::try_new(d).ok())
        .or_else(|| EnvFilter::try_new(level).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

/// Install the global subscriber. Call once, at startup.
pub fn init_logger(config: &LoggingConfig) -> Result<()> {
    let file_layer = match config.file.as_deref() {
        Some(path) if !path.is_empty() => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path))?;
            Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        }
        _ => None,
    };

    let subscriber = Registry::default()
        .with(env_filter(config))
        .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
        .with(file_layer);

    tracing::subscriber::set_global_default(subscriber).context("Failed to install tracing subscriber")?;
    tracing_log::LogTracer::init().context("Failed to bridge log records")?;

    Ok(())
}
