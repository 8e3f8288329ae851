//! Slawatch Services Layer
//!
//! Business services on top of the store: email tracking and reply evaluation,
//! directory administration, metrics, breach scanning and alerting, mailbox
//! sync and the background sync scheduler. The API crate wires these together
//! and keeps HTTP handling thin.

pub mod breach;
pub mod directory;
pub mod mailbox;
pub mod mailer;
pub mod metrics;
pub mod scheduler;
pub mod seed;
pub mod sync;
pub mod tracking;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

pub use breach::{BreachScanner, BreachScannerConfig, ScanOutcome};
pub use directory::DirectoryService;
pub use mailbox::{FetchedMessage, ImapMailboxClient, MailboxClient, MailboxSession};
pub use mailer::{Mailer, SmtpMailer};
pub use metrics::MetricsService;
pub use scheduler::{
    IntervalUpdate, MonitoringCycle, SchedulerStatus, StartOutcome, StopOutcome, SyncJob, SyncScheduler,
    MAX_SYNC_INTERVAL_MINUTES, MIN_SYNC_INTERVAL_MINUTES,
};
pub use seed::{SampleDataSeeder, SeedSummary};
pub use sync::{MailboxSyncService, MemberSyncResult, SyncOptions, SyncReport};
pub use tracking::EmailTracker;
