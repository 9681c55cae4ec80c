//! Bankroll overlay — entry point.
//!
//! Loads configuration, initialises structured logging, builds the poller
//! registry and serves overlay data until Ctrl+C.

use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use bankroll_overlay::config;
use bankroll_overlay::registry::PollerRegistry;
use bankroll_overlay::server;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let config_path = std::env::var("OVERLAY_CONFIG").unwrap_or_else(|_| "config.toml".into());
    let cfg = config::AppConfig::load(&config_path)?;

    init_logging();

    info!(
        config = %config_path,
        environment = ?cfg.backend.environment,
        interval_ms = cfg.poller.interval_ms,
        port = cfg.server.port,
        "Bankroll overlay starting up"
    );

    let registry = Arc::new(PollerRegistry::from_config(&cfg)?);
    let reaper = registry.spawn_reaper();

    if cfg.server.enabled {
        let shutdown = async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received.");
        };
        server::serve(Arc::clone(&registry), cfg.server.port, shutdown).await?;
    } else {
        info!("Overlay server disabled in config; waiting for Ctrl+C.");
        tokio::signal::ctrl_c().await?;
    }

    reaper.abort();
    registry.stop_all().await;
    info!("Bankroll overlay shut down cleanly.");

    Ok(())
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("bankroll_overlay=info"));

    if std::env::var("OVERLAY_LOG_JSON").is_ok() {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt().with_env_filter(env_filter).with_target(true).init();
    }
}
