//! # ectd-api — Binary Entry Point
//!
//! Configuration comes from the environment: `PORT` (default 8080),
//! `ECTD_BASE_DIR` (enables the acknowledgement ledger), `ECTD_PROFILES`
//! (profile YAML), and `RUST_LOG` (default `info`).

use anyhow::Context;

use ectd_api::{AppConfig, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env();
    let state = AppState::from_config(&config).context("loading service state")?;
    if let Some(ledger) = config.ledger_path() {
        tracing::info!(ledger = %ledger.display(), records = state.tracker.len(), "acknowledgement ledger loaded");
    } else {
        tracing::warn!("ECTD_BASE_DIR not set; acknowledgements are kept in memory only");
    }

    let app = ectd_api::app(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("eCTD API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    axum::serve(listener, app).await?;

    Ok(())
}
