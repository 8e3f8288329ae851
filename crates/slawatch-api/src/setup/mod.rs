//! Application setup and initialization
//!
//! Everything `main` needs to go from a `Config` to a running router: tracing,
//! the store backend, services, the scheduler and routes.

pub mod database;
pub mod routes;
pub mod server;
pub mod services;

use crate::state::AppState;
use anyhow::{Context, Result};
use slawatch_core::{Config, StoreBackend, SystemClock};
use slawatch_db::{MemoryStore, PgStore, SlaStore};
use slawatch_services::{ImapMailboxClient, Mailer, MailboxClient, SmtpMailer};
use std::sync::Arc;

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    // Fail fast on misconfiguration
    config.validate().context("Configuration validation failed")?;

    crate::telemetry::init_telemetry()?;

    tracing::info!(
        environment = %config.environment,
        store_backend = ?config.store_backend,
        "Configuration loaded and validated successfully"
    );

    let store: Arc<dyn SlaStore> = match config.store_backend {
        StoreBackend::Postgres => {
            let pool = database::setup_database(&config).await?;
            Arc::new(PgStore::new(pool))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using the in-memory store; data is lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    let mailer: Option<Arc<dyn Mailer>> = match SmtpMailer::from_config(&config) {
        Some(mailer) => Some(Arc::new(mailer)),
        None => {
            tracing::info!("Alert mail disabled (ENABLE_ALERTS off or SMTP_HOST unset)");
            None
        }
    };
    let mailbox_client: Arc<dyn MailboxClient> =
        Arc::new(ImapMailboxClient::new(config.imap_host.clone(), config.imap_port));

    let state = services::initialize_services(
        &config,
        store,
        Arc::new(SystemClock),
        mailer,
        mailbox_client,
    )?;

    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router))
}
