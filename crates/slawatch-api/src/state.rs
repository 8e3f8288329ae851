//! Application state shared by all handlers.

use std::sync::Arc;

use slawatch_core::Config;
use slawatch_db::SlaStore;
use slawatch_services::{
    BreachScanner, DirectoryService, EmailTracker, MailboxSyncService, MetricsService,
    SampleDataSeeder, SyncScheduler,
};

pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn SlaStore>,
    pub tracker: EmailTracker,
    pub directory: DirectoryService,
    pub metrics: MetricsService,
    pub scanner: BreachScanner,
    pub sync: MailboxSyncService,
    pub seeder: SampleDataSeeder,
    /// Background sync loop. Started at boot when `ENABLE_AUTO_SYNC` is set.
    pub scheduler: Arc<SyncScheduler>,
}
