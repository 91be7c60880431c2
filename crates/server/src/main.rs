//! pagetitle server entry point.
//!
//! Loads configuration, opens the title store and serves HTTP until Ctrl-C.
//! Logs are JSON on stderr, filtered by `RUST_LOG`.

use anyhow::{Context, Result};
use pagetitle_core::AppConfig;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load().context("failed to load configuration")?;

    tracing::info!(
        bind_addr = %config.bind_addr,
        db_path = %config.db_path.display(),
        cache_ttl_secs = config.cache_ttl_secs,
        "starting pagetitle server"
    );

    let state = pagetitle_server::build_state(&config)
        .await
        .context("failed to initialise title store")?;
    let app = pagetitle_server::router(state);

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("pagetitle server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
