// =============================================================================
// Ticker Pulse: Main Entry Point
// =============================================================================
//
// Polls a market data provider for live prices and candle history, runs the
// analytics core (sparkline window, RSI, session statistics) and serves the
// results to the dashboard over REST + WebSocket.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod analytics;
mod api;
mod app_state;
mod export;
mod indicators;
mod market_data;
mod provider;
mod runtime_config;
mod scheduler;
mod types;

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::app_state::AppState;
use crate::provider::ProviderClient;
use crate::runtime_config::RuntimeConfig;

const DEFAULT_CONFIG_PATH: &str = "ticker_pulse.json";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Ticker Pulse starting up");

    let config_path =
        std::env::var("PULSE_CONFIG_PATH").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());

    let mut config = RuntimeConfig::load(&config_path).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        RuntimeConfig::default()
    });
    config.apply_env_overrides();
    config.normalise_selection();

    info!(
        symbols = ?config.symbols,
        poll_secs = config.poll_interval_secs,
        selection = %config.selection,
        "Configuration resolved"
    );

    let poll_every = Duration::from_secs(config.poll_interval_secs.max(1));
    let client = ProviderClient::new(
        config.provider_base_url.clone(),
        Duration::from_secs(config.request_timeout_secs),
    )?;
    info!(provider = %client.base_url(), "Provider client ready");

    // ── 2. Build shared state ────────────────────────────────────────────
    let state = Arc::new(AppState::new(config));

    // ── 3. Price poll loop ───────────────────────────────────────────────
    tokio::spawn(scheduler::run_price_poller(
        state.clone(),
        client.clone(),
        poll_every,
    ));

    // ── 4. Chart refresher (selection-driven) ────────────────────────────
    tokio::spawn(scheduler::run_chart_refresher(state.clone(), client.clone()));
    state.refresh_chart();

    // ── 5. API server ────────────────────────────────────────────────────
    let bind_addr =
        std::env::var("PULSE_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3001".into());
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(addr = %bind_addr, "API server listening");

    let app = api::rest::router(state.clone());
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!(error = %e, "API server failed");
        }
    });

    info!("All subsystems running. Press Ctrl+C to stop.");

    // ── 6. Graceful shutdown ─────────────────────────────────────────────
    tokio::signal::ctrl_c().await?;
    warn!("Shutdown signal received: stopping");

    if let Err(e) = state.runtime_config.read().save(&config_path) {
        error!(error = %e, "Failed to save runtime config on shutdown");
    }

    info!("Ticker Pulse shut down complete.");
    Ok(())
}
