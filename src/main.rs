//! Ref Proxy - A caching proxy for versioned content APIs
//!
//! Serves cached document lookups over HTTP and keeps the cache in step with
//! the upstream master ref.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ref_proxy::api::create_router;
use ref_proxy::{AppState, Config, HttpUpstream, Proxy};

/// Main entry point for the proxy server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Connect to the upstream API (fatal on failure)
/// 4. Create the proxy, which starts the master ref refresh task
/// 5. Start HTTP server on configured port
/// 6. On SIGINT/SIGTERM, stop serving and shut the refresh task down
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ref_proxy=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Ref Proxy");

    let config = Config::from_env()?;
    info!(
        "Configuration loaded: cache_size={}, cache_ttl={}s, master_refresh={}s, port={}",
        config.cache_size, config.cache_ttl, config.master_refresh_interval, config.server_port
    );

    let upstream = HttpUpstream::connect(
        config.upstream_url.clone(),
        config.access_token.clone(),
        config.upstream_timeout(),
    )
    .await
    .with_context(|| format!("failed to connect to upstream {}", config.upstream_url))?;
    info!("Connected to upstream {}", upstream.endpoint());

    let proxy = Proxy::new(Arc::new(upstream), config.proxy_config()).await;
    info!("Proxy started at master ref {}", proxy.master_ref());

    let state = AppState::new(proxy);
    let app = create_router(state.clone());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    state.proxy.shutdown().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::error!("Failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
