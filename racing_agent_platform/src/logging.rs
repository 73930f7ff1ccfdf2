//! Logging initialization.

use anyhow::{anyhow, Result};
use tracing_subscriber::{layer::SubscriberExt, EnvFilter, Registry};

use crate::settings::LoggingConfig;

/// Install the global subscriber. `RUST_LOG` takes precedence over the
/// configured level.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))?;

    match config.format.as_str() {
        "json" => init_json(filter, config.enable_target),
        "text" => init_text(filter, config.enable_target),
        other => Err(anyhow!("Unknown logging format '{}'", other)),
    }
}

fn init_text(filter: EnvFilter, with_target: bool) -> Result<()> {
    let subscriber = Registry::default()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(with_target));

    tracing::subscriber::set_global_default(subscriber)?;
    tracing::debug!("Console logging initialized");
    Ok(())
}

fn init_json(filter: EnvFilter, with_target: bool) -> Result<()> {
    let subscriber = Registry::default()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().json().with_target(with_target));

    tracing::subscriber::set_global_default(subscriber)?;
    tracing::debug!("JSON logging initialized");
    Ok(())
}
