//! Webhooker - GitHub webhook receiver.
//!
//! This binary:
//! - Loads its configuration from `/etc/webhooker/config.yaml`
//! - Verifies the signature of every webhook delivery
//! - On push events, syncs the working copy into the served directory
//!   and reloads the web server
//!
//! A missing or malformed configuration file stops the process before the
//! listener is bound.

use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::{net::TcpListener, signal};
use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use webhooker::{app, AppState, Config, ProcessRunner, DEFAULT_CONFIG_PATH, LISTEN_PORT};

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize structured JSON logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().flatten_event(true))
        .init();

    info!("webhooker_starting");

    let config = match Config::from_default_path() {
        Ok(config) => config,
        Err(e) => {
            error!(path = DEFAULT_CONFIG_PATH, error = %e, "config_load_failed");
            return ExitCode::FAILURE;
        }
    };
    info!(
        source = %config.source.display(),
        destination = %config.destination.display(),
        "config_loaded"
    );

    match serve(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = ?e, "webhooker_failed");
            ExitCode::FAILURE
        }
    }
}

async fn serve(config: Config) -> Result<()> {
    let state = AppState::new(config, Arc::new(ProcessRunner));
    let router = app(state);

    // Bind to address
    let addr = SocketAddr::from(([0, 0, 0, 0], LISTEN_PORT));
    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!(address = %addr, "web_server_listening");

    // Run server with graceful shutdown
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("web_server_shutdown_complete");

    Ok(())
}

/// Create a future that completes when a shutdown signal is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "ctrl_c_handler_failed");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "sigterm_handler_failed");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }

    info!("web_server_shutting_down");
}
