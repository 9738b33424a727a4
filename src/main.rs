//! The fleet manager control plane.

use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::prelude::*;

use fleet_manager::{get_metrics_recorder, App, Config, PrometheusMetrics};

#[tokio::main]
async fn main() -> Result<()> {
    // Setup tracing/logging system.
    tracing_subscriber::registry()
        // Filter spans based on the RUST_LOG env var.
        .with(tracing_subscriber::EnvFilter::from_default_env())
        // Send a copy of all spans to stdout in compact form.
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_ansi(true)
        )
        // Install this registry as the global tracing registry.
        .try_init()
        .context("error initializing logging/tracing system")?;

    let cfg = Arc::new(Config::new()?);
    metrics::set_recorder(get_metrics_recorder(&cfg)).context("error setting prometheus metrics recorder")?;
    PrometheusMetrics::register();
    tracing::info!(
        metrics_port = %cfg.metrics_port,
        storage_data_path = %cfg.storage_data_path,
        scaling_type = ?cfg.dataplane.scaling_type,
        quota_type = %cfg.quota_type,
        max_capacity = %cfg.max_capacity,
        "starting fleet manager",
    );
    if let Err(err) = App::new(cfg).await?.spawn().await {
        tracing::error!(error = ?err);
    }

    // Ensure any pending output is flushed.
    let _ = std::io::stdout().flush();
    let _ = std::io::stderr().flush();

    Ok(())
}
