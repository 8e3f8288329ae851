//! Service initialization and application state setup

use std::sync::Arc;

use anyhow::{Context, Result};
use slawatch_core::{Clock, Config};
use slawatch_db::SlaStore;
use slawatch_services::{
    BreachScanner, BreachScannerConfig, DirectoryService, EmailTracker, MailboxClient,
    MailboxSyncService, Mailer, MetricsService, MonitoringCycle, SampleDataSeeder, SyncOptions,
    SyncScheduler,
};

use crate::state::AppState;

/// Wire every service over one store and clock.
///
/// The mailer and mailbox client are passed in so tests can substitute fakes.
pub fn initialize_services(
    config: &Config,
    store: Arc<dyn SlaStore>,
    clock: Arc<dyn Clock>,
    mailer: Option<Arc<dyn Mailer>>,
    mailbox_client: Arc<dyn MailboxClient>,
) -> Result<Arc<AppState>> {
    let tracker = EmailTracker::new(
        store.clone(),
        clock.clone(),
        config.default_sla_threshold_hours,
    );
    let directory = DirectoryService::new(store.clone());
    let metrics = MetricsService::new(store.clone());
    let seeder = SampleDataSeeder::new(store.clone(), clock.clone());

    let scanner = BreachScanner::new(
        store.clone(),
        clock,
        mailer,
        BreachScannerConfig {
            default_threshold_hours: config.default_sla_threshold_hours,
            alerts_enabled: config.enable_alerts,
            alert_recipient: config.alert_email.clone(),
        },
    );

    let sync = MailboxSyncService::new(
        store.clone(),
        tracker.clone(),
        mailbox_client,
        SyncOptions::from_config(config),
    );

    let cycle = MonitoringCycle::new(sync.clone(), scanner.clone());
    let scheduler = SyncScheduler::new(Arc::new(cycle), config.auto_sync_interval_minutes)
        .context("Invalid AUTO_SYNC_INTERVAL_MINUTES")?;

    tracing::info!(
        default_sla_threshold_hours = config.default_sla_threshold_hours,
        alerts_enabled = config.enable_alerts,
        auto_sync_interval_minutes = config.auto_sync_interval_minutes,
        "Services initialized"
    );

    Ok(Arc::new(AppState {
        config: config.clone(),
        store,
        tracker,
        directory,
        metrics,
        scanner,
        sync,
        seeder,
        scheduler: Arc::new(scheduler),
    }))
}
