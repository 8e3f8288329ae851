//! Server startup and graceful shutdown

use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use slawatch_core::Config;
use slawatch_services::StartOutcome;

use crate::state::AppState;

/// Start the server with graceful shutdown
///
/// Starts the sync scheduler first when `ENABLE_AUTO_SYNC` is set, and stops it
/// (waiting for an in-flight cycle) once the server has drained.
pub async fn start_server(config: &Config, state: Arc<AppState>, app: Router) -> Result<()> {
    let addr = format!("0.0.0.0:{}", config.server_port);
    tracing::info!(addr = %addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    if config.enable_auto_sync {
        if state.scheduler.start() == StartOutcome::Started {
            tracing::info!(
                interval_minutes = config.auto_sync_interval_minutes,
                "Auto-sync started"
            );
        }
    } else {
        tracing::info!("Auto-sync disabled; start it via POST /api/auto-sync/start");
    }

    tracing::info!(
        store_backend = ?config.store_backend,
        default_sla_threshold_hours = config.default_sla_threshold_hours,
        alerts_enabled = config.enable_alerts,
        imap_host = %config.imap_host,
        "Server ready and accepting connections"
    );

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    state.scheduler.shutdown().await;
    tracing::info!("Sync scheduler stopped");

    served?;
    Ok(())
}

/// Resolves on Ctrl+C (SIGINT) or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            tracing::info!("Received terminate signal");
        },
    }

    tracing::info!("Shutting down gracefully...");
}
