//! Background sync scheduler.
//!
//! Owns at most one loop task. Each iteration runs a full monitoring cycle
//! (mailbox sync, then breach scan) and then sleeps for the configured
//! interval. Stopping cancels the sleep but lets an in-flight cycle finish, and
//! a cycle lock shared across restarts keeps cycles from ever overlapping.

use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use futures::FutureExt;
use serde::Serialize;
use slawatch_core::AppError;
pub use slawatch_core::config::{MAX_SYNC_INTERVAL_MINUTES, MIN_SYNC_INTERVAL_MINUTES};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use utoipa::ToSchema;

use crate::breach::BreachScanner;
use crate::sync::MailboxSyncService;

/// Work executed once per scheduler tick
#[async_trait]
pub trait SyncJob: Send + Sync {
    async fn run_cycle(&self) -> Result<(), AppError>;
}

/// Mailbox sync followed by a breach scan
#[derive(Clone)]
pub struct MonitoringCycle {
    sync: MailboxSyncService,
    scanner: BreachScanner,
}

impl MonitoringCycle {
    pub fn new(sync: MailboxSyncService, scanner: BreachScanner) -> Self {
        Self { sync, scanner }
    }
}

#[async_trait]
impl SyncJob for MonitoringCycle {
    async fn run_cycle(&self) -> Result<(), AppError> {
        // A failed sync should not hold back alerts for mail already recorded.
        match self.sync.sync_all_mailboxes(None).await {
            Ok(report) => tracing::info!(
                members_synced = report.total_members_synced,
                emails_found = report.total_emails_found,
                emails_processed = report.total_emails_processed,
                errors = report.errors.len(),
                "Scheduled mailbox sync completed"
            ),
            Err(e) => tracing::error!(error = %e, "Scheduled mailbox sync failed"),
        }

        let outcome = self.scanner.run_scan_and_alert().await?;
        tracing::info!(
            alerts_raised = outcome.alerts_raised,
            notifications_sent = outcome.notifications_sent,
            "Scheduled breach scan completed"
        );
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum StartOutcome {
    Started,
    AlreadyRunning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum StopOutcome {
    Stopped,
    NotRunning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct SchedulerStatus {
    pub is_running: bool,
    pub interval_minutes: u64,
    pub interval_seconds: u64,
    /// Seconds until the next cycle; 0 while a cycle is running, absent when stopped
    pub next_sync_in_seconds: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct IntervalUpdate {
    pub interval_minutes: u64,
    /// The running loop was restarted to apply the new interval
    pub restarted: bool,
}

struct RunningLoop {
    token: CancellationToken,
    handle: JoinHandle<()>,
    // None while a cycle is executing
    next_run: Arc<Mutex<Option<Instant>>>,
}

impl RunningLoop {
    fn is_alive(&self) -> bool {
        !self.token.is_cancelled() && !self.handle.is_finished()
    }
}

struct SchedulerInner {
    interval_minutes: u64,
    interval: Duration,
    running: Option<RunningLoop>,
}

pub struct SyncScheduler {
    job: Arc<dyn SyncJob>,
    inner: Mutex<SchedulerInner>,
    cycle_lock: Arc<tokio::sync::Mutex<()>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl SyncScheduler {
    pub fn new(job: Arc<dyn SyncJob>, interval_minutes: u64) -> Result<Self, AppError> {
        let interval = interval_duration(interval_minutes)?;
        Ok(Self {
            job,
            inner: Mutex::new(SchedulerInner {
                interval_minutes,
                interval,
                running: None,
            }),
            cycle_lock: Arc::new(tokio::sync::Mutex::new(())),
        })
    }

    /// Spawn the loop. The first cycle runs immediately.
    pub fn start(&self) -> StartOutcome {
        let mut inner = lock(&self.inner);
        if inner.running.as_ref().is_some_and(RunningLoop::is_alive) {
            tracing::warn!("Auto-sync is already running");
            return StartOutcome::AlreadyRunning;
        }

        inner.running = Some(self.spawn_loop(inner.interval));
        tracing::info!(interval_minutes = inner.interval_minutes, "Auto-sync started");
        StartOutcome::Started
    }

    /// Request the loop to stop. Returns at once; a cycle in progress completes.
    pub fn stop(&self) -> StopOutcome {
        let mut inner = lock(&self.inner);
        match inner.running.take() {
            Some(running) if running.is_alive() => {
                running.token.cancel();
                tracing::info!("Auto-sync stopped");
                StopOutcome::Stopped
            }
            _ => {
                tracing::warn!("Auto-sync is not running");
                StopOutcome::NotRunning
            }
        }
    }

    /// Stop and wait for the loop task to exit, including any in-flight cycle.
    pub async fn shutdown(&self) {
        let running = lock(&self.inner).running.take();
        if let Some(running) = running {
            running.token.cancel();
            if let Err(e) = running.handle.await {
                tracing::error!(error = %e, "Auto-sync loop ended abnormally");
            }
        }
    }

    pub fn status(&self) -> SchedulerStatus {
        let inner = lock(&self.inner);
        let running = inner.running.as_ref().filter(|r| r.is_alive());
        let next_sync_in_seconds = running.map(|r| match *lock(&r.next_run) {
            Some(at) => {
                let remaining = at.saturating_duration_since(Instant::now());
                remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0)
            }
            None => 0,
        });

        SchedulerStatus {
            is_running: running.is_some(),
            interval_minutes: inner.interval_minutes,
            interval_seconds: inner.interval.as_secs(),
            next_sync_in_seconds,
        }
    }

    /// Change the interval. A running loop is restarted so the new value
    /// applies; a sleep already in progress is never stretched or shortened.
    pub fn update_interval(&self, interval_minutes: u64) -> Result<IntervalUpdate, AppError> {
        let interval = interval_duration(interval_minutes)?;

        let mut inner = lock(&self.inner);
        inner.interval_minutes = interval_minutes;
        inner.interval = interval;

        let restarted = match inner.running.take() {
            Some(running) if running.is_alive() => {
                running.token.cancel();
                inner.running = Some(self.spawn_loop(interval));
                true
            }
            _ => false,
        };

        tracing::info!(interval_minutes, restarted, "Auto-sync interval updated");
        Ok(IntervalUpdate {
            interval_minutes,
            restarted,
        })
    }

    fn spawn_loop(&self, interval: Duration) -> RunningLoop {
        let token = CancellationToken::new();
        let next_run = Arc::new(Mutex::new(None));
        let handle = tokio::spawn(run_loop(
            self.job.clone(),
            interval,
            token.clone(),
            self.cycle_lock.clone(),
            next_run.clone(),
        ));
        RunningLoop {
            token,
            handle,
            next_run,
        }
    }
}

fn interval_duration(interval_minutes: u64) -> Result<Duration, AppError> {
    if !(MIN_SYNC_INTERVAL_MINUTES..=MAX_SYNC_INTERVAL_MINUTES).contains(&interval_minutes) {
        return Err(AppError::InvalidInput(format!(
            "Sync interval must be between {} and {} minutes",
            MIN_SYNC_INTERVAL_MINUTES, MAX_SYNC_INTERVAL_MINUTES
        )));
    }
    interval_minutes
        .checked_mul(60)
        .map(Duration::from_secs)
        .ok_or_else(|| AppError::InvalidInput("Sync interval is too large".to_string()))
}

async fn run_loop(
    job: Arc<dyn SyncJob>,
    interval: Duration,
    token: CancellationToken,
    cycle_lock: Arc<tokio::sync::Mutex<()>>,
    next_run: Arc<Mutex<Option<Instant>>>,
) {
    loop {
        {
            // Wait out a cycle still running from a previous loop.
            let _cycle = tokio::select! {
                guard = cycle_lock.lock() => guard,
                _ = token.cancelled() => break,
            };
            if token.is_cancelled() {
                break;
            }

            *lock(&next_run) = None;
            tracing::info!("Monitoring cycle triggered");

            match AssertUnwindSafe(job.run_cycle()).catch_unwind().await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::error!(error = %e, "Monitoring cycle failed"),
                Err(_) => tracing::error!("Monitoring cycle panicked"),
            }
        }

        *lock(&next_run) = Some(Instant::now() + interval);

        tokio::select! {
            _ = token.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }
    }

    tracing::debug!("Auto-sync loop exited");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::CountingJob;

    const MINUTE: Duration = Duration::from_secs(60);

    fn scheduler(job: Arc<CountingJob>) -> SyncScheduler {
        SyncScheduler::new(job, 1).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn double_start_reports_already_running() {
        let job = Arc::new(CountingJob::default());
        let scheduler = scheduler(job.clone());

        assert_eq!(scheduler.start(), StartOutcome::Started);
        assert_eq!(scheduler.start(), StartOutcome::AlreadyRunning);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(job.started(), 1);
        assert_eq!(job.max_active(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn runs_one_cycle_per_interval() {
        let job = Arc::new(CountingJob::default());
        let scheduler = scheduler(job.clone());
        scheduler.start();

        tokio::time::sleep(MINUTE * 2 + Duration::from_secs(30)).await;
        assert_eq!(job.completed(), 3);

        let status = scheduler.status();
        assert!(status.is_running);
        assert_eq!(status.interval_minutes, 1);
        assert!(matches!(status.next_sync_in_seconds, Some(29..=30)));
    }

    #[tokio::test(start_paused = true)]
    async fn stop_lets_in_flight_cycle_finish() {
        let job = Arc::new(CountingJob::with_duration(Duration::from_secs(30)));
        let scheduler = scheduler(job.clone());
        scheduler.start();

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(job.started(), 1);
        assert_eq!(scheduler.stop(), StopOutcome::Stopped);
        assert!(!scheduler.status().is_running);
        assert_eq!(scheduler.status().next_sync_in_seconds, None);

        tokio::time::sleep(MINUTE * 3).await;
        assert_eq!(job.completed(), 1);
        assert_eq!(job.started(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_when_stopped_reports_not_running() {
        let scheduler = scheduler(Arc::new(CountingJob::default()));
        assert_eq!(scheduler.stop(), StopOutcome::NotRunning);

        scheduler.start();
        assert_eq!(scheduler.stop(), StopOutcome::Stopped);
        assert_eq!(scheduler.stop(), StopOutcome::NotRunning);
    }

    #[tokio::test(start_paused = true)]
    async fn overrunning_cycles_never_overlap() {
        let job = Arc::new(CountingJob::with_duration(Duration::from_secs(90)));
        let scheduler = scheduler(job.clone());
        scheduler.start();

        tokio::time::sleep(Duration::from_secs(10)).await;
        // Restart while the first cycle is still running.
        let update = scheduler.update_interval(2).unwrap();
        assert!(update.restarted);

        tokio::time::sleep(MINUTE * 6).await;
        assert!(job.completed() >= 2);
        assert_eq!(job.max_active(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn interval_below_one_minute_is_rejected() {
        let scheduler = scheduler(Arc::new(CountingJob::default()));
        assert!(matches!(
            scheduler.update_interval(0),
            Err(AppError::InvalidInput(_))
        ));
        assert!(SyncScheduler::new(Arc::new(CountingJob::default()), 0).is_err());

        let update = scheduler.update_interval(5).unwrap();
        assert!(!update.restarted);
        assert_eq!(scheduler.status().interval_minutes, 5);
        assert_eq!(scheduler.status().interval_seconds, 300);
    }

    #[tokio::test(start_paused = true)]
    async fn interval_above_one_week_is_rejected() {
        let job = Arc::new(CountingJob::default());
        let scheduler = scheduler(job.clone());
        scheduler.start();

        for minutes in [MAX_SYNC_INTERVAL_MINUTES + 1, u64::MAX / 60 + 1, u64::MAX] {
            assert!(matches!(
                scheduler.update_interval(minutes),
                Err(AppError::InvalidInput(_))
            ));
        }
        assert!(SyncScheduler::new(Arc::new(CountingJob::default()), u64::MAX).is_err());

        // The running loop keeps its previous interval.
        let status = scheduler.status();
        assert!(status.is_running);
        assert_eq!(status.interval_minutes, 1);
        assert_eq!(status.interval_seconds, 60);

        let update = scheduler.update_interval(MAX_SYNC_INTERVAL_MINUTES).unwrap();
        assert!(update.restarted);
        scheduler.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn failing_cycle_keeps_loop_alive() {
        let job = Arc::new(CountingJob::failing());
        let scheduler = scheduler(job.clone());
        scheduler.start();

        tokio::time::sleep(MINUTE + Duration::from_secs(30)).await;
        assert_eq!(job.completed(), 2);
        assert!(scheduler.status().is_running);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_waits_for_in_flight_cycle() {
        let job = Arc::new(CountingJob::with_duration(Duration::from_secs(20)));
        let scheduler = scheduler(job.clone());
        scheduler.start();

        tokio::time::sleep(Duration::from_secs(1)).await;
        scheduler.shutdown().await;
        assert_eq!(job.completed(), 1);
        assert!(!scheduler.status().is_running);
    }
}
