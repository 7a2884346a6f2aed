use anyhow::{Context, Result, anyhow};
use tracing_subscriber::{EnvFilter, fmt};

/// Подключает `tracing` для gate. `RUST_LOG` имеет приоритет над `LOG_LEVEL`.
pub(crate) fn init_logging(level: &str) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => gate_filter(level)
            .or_else(|_| gate_filter("info"))
            .context("failed to build log filter")?,
    };

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .compact()
        .try_init()
        .map_err(|e| anyhow!("failed to init logging: {e}"))?;

    Ok(())
}

// Спаны TraceLayer видны на том же уровне, что и логи самого gate.
fn gate_filter(level: &str) -> Result<EnvFilter, tracing_subscriber::filter::ParseError> {
    EnvFilter::try_new(format!("{level},tower_http={level},paw_client={level}"))
}
