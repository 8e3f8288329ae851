//! Test doubles for service and API tests
//!
//! Fakes for the mailbox, the mailer and the scheduler job, plus a store
//! wrapper that injects write failures. None of them touch the network.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

use slawatch_core::{
    models::{
        Alert, CreateTeamMemberRequest, Department, Email, EmailContext, EmailFact, EmailFilter,
        NewAlert, NewEmail, ReplyUpdate, StoreCounts, TeamMember, TeamMemberFilter,
        UpdateDepartmentRequest, UpdateTeamMemberRequest,
    },
    AppError,
};
use slawatch_db::SlaStore;

use crate::mailbox::{FetchedMessage, MailboxClient, MailboxSession};
use crate::mailer::Mailer;
use crate::scheduler::SyncJob;

/// Mail captured by `RecordingMailer`
#[derive(Debug, Clone, PartialEq)]
pub struct SentMail {
    pub recipient: String,
    pub subject: String,
    pub body: String,
    pub is_html: bool,
}

/// Mailer that records every message instead of sending it
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<SentMail>>,
    fail: bool,
}

impl RecordingMailer {
    /// Mailer whose every send fails with an upstream error
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<SentMail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(
        &self,
        recipient: &str,
        subject: &str,
        body: &str,
        is_html: bool,
    ) -> Result<(), AppError> {
        if self.fail {
            return Err(AppError::upstream("smtp", "connection refused"));
        }
        self.sent.lock().unwrap().push(SentMail {
            recipient: recipient.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
            is_html,
        });
        Ok(())
    }
}

/// In-memory mailboxes keyed by member address
#[derive(Default)]
pub struct FakeMailboxClient {
    inboxes: Mutex<HashMap<String, Vec<FetchedMessage>>>,
    failing_logins: Mutex<HashSet<String>>,
    hanging: Mutex<HashSet<String>>,
    connects: AtomicUsize,
}

impl FakeMailboxClient {
    /// Unread messages for `address`, most recent first
    pub fn set_inbox(&self, address: &str, messages: Vec<FetchedMessage>) {
        self.inboxes
            .lock()
            .unwrap()
            .insert(address.to_string(), messages);
    }

    pub fn fail_login(&self, address: &str) {
        self.failing_logins
            .lock()
            .unwrap()
            .insert(address.to_string());
    }

    /// Connecting to `address` never completes
    pub fn hang(&self, address: &str) {
        self.hanging.lock().unwrap().insert(address.to_string());
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MailboxClient for FakeMailboxClient {
    async fn connect(
        &self,
        address: &str,
        _credential: &str,
    ) -> Result<Box<dyn MailboxSession>, AppError> {
        self.connects.fetch_add(1, Ordering::SeqCst);

        let hangs = self.hanging.lock().unwrap().contains(address);
        if hangs {
            std::future::pending::<()>().await;
        }
        if self.failing_logins.lock().unwrap().contains(address) {
            return Err(AppError::upstream("imap", "Login failed: invalid credentials"));
        }

        let messages = self
            .inboxes
            .lock()
            .unwrap()
            .get(address)
            .cloned()
            .unwrap_or_default();
        Ok(Box::new(FakeSession { messages }))
    }
}

struct FakeSession {
    messages: Vec<FetchedMessage>,
}

#[async_trait]
impl MailboxSession for FakeSession {
    async fn fetch_unread(&mut self, limit: usize) -> Result<Vec<FetchedMessage>, AppError> {
        Ok(self.messages.iter().take(limit).cloned().collect())
    }

    async fn disconnect(self: Box<Self>) -> Result<(), AppError> {
        Ok(())
    }
}

/// Scheduler job that counts cycles and how many ran at once
#[derive(Default)]
pub struct CountingJob {
    duration: Duration,
    fail: bool,
    started: AtomicUsize,
    completed: AtomicUsize,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

impl CountingJob {
    pub fn with_duration(duration: Duration) -> Self {
        Self {
            duration,
            ..Default::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    /// Finished cycles, successful or not
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SyncJob for CountingJob {
    async fn run_cycle(&self) -> Result<(), AppError> {
        self.started.fetch_add(1, Ordering::SeqCst);
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(active, Ordering::SeqCst);

        if !self.duration.is_zero() {
            tokio::time::sleep(self.duration).await;
        }

        self.active.fetch_sub(1, Ordering::SeqCst);
        self.completed.fetch_add(1, Ordering::SeqCst);

        if self.fail {
            return Err(AppError::Internal("cycle failed".to_string()));
        }
        Ok(())
    }
}

/// Store wrapper that can be told to fail alert writes
pub struct FailingStore {
    inner: Arc<dyn SlaStore>,
    fail_alert_writes: AtomicBool,
}

impl FailingStore {
    pub fn new(inner: Arc<dyn SlaStore>) -> Self {
        Self {
            inner,
            fail_alert_writes: AtomicBool::new(false),
        }
    }

    pub fn fail_alert_writes(&self, fail: bool) {
        self.fail_alert_writes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl SlaStore for FailingStore {
    async fn create_department(
        &self,
        name: &str,
        sla_threshold_hours: f64,
    ) -> Result<Department, AppError> {
        self.inner.create_department(name, sla_threshold_hours).await
    }

    async fn get_department(&self, id: Uuid) -> Result<Option<Department>, AppError> {
        self.inner.get_department(id).await
    }

    async fn find_department_by_name(&self, name: &str) -> Result<Option<Department>, AppError> {
        self.inner.find_department_by_name(name).await
    }

    async fn list_departments(&self) -> Result<Vec<Department>, AppError> {
        self.inner.list_departments().await
    }

    async fn update_department(
        &self,
        id: Uuid,
        changes: &UpdateDepartmentRequest,
    ) -> Result<Option<Department>, AppError> {
        self.inner.update_department(id, changes).await
    }

    async fn delete_department(&self, id: Uuid) -> Result<bool, AppError> {
        self.inner.delete_department(id).await
    }

    async fn count_department_members(&self, id: Uuid) -> Result<i64, AppError> {
        self.inner.count_department_members(id).await
    }

    async fn create_team_member(
        &self,
        request: &CreateTeamMemberRequest,
    ) -> Result<TeamMember, AppError> {
        self.inner.create_team_member(request).await
    }

    async fn get_team_member(&self, id: Uuid) -> Result<Option<TeamMember>, AppError> {
        self.inner.get_team_member(id).await
    }

    async fn find_team_member_by_email(
        &self,
        email: &str,
    ) -> Result<Option<TeamMember>, AppError> {
        self.inner.find_team_member_by_email(email).await
    }

    async fn list_team_members(
        &self,
        filter: &TeamMemberFilter,
    ) -> Result<Vec<TeamMember>, AppError> {
        self.inner.list_team_members(filter).await
    }

    async fn update_team_member(
        &self,
        id: Uuid,
        changes: &UpdateTeamMemberRequest,
    ) -> Result<Option<TeamMember>, AppError> {
        self.inner.update_team_member(id, changes).await
    }

    async fn delete_team_member(&self, id: Uuid) -> Result<bool, AppError> {
        self.inner.delete_team_member(id).await
    }

    async fn count_team_member_emails(&self, id: Uuid) -> Result<i64, AppError> {
        self.inner.count_team_member_emails(id).await
    }

    async fn insert_email(&self, email: NewEmail) -> Result<Email, AppError> {
        self.inner.insert_email(email).await
    }

    async fn get_email(&self, id: Uuid) -> Result<Option<Email>, AppError> {
        self.inner.get_email(id).await
    }

    async fn get_email_context(&self, id: Uuid) -> Result<Option<EmailContext>, AppError> {
        self.inner.get_email_context(id).await
    }

    async fn list_emails(&self, filter: &EmailFilter) -> Result<Vec<Email>, AppError> {
        self.inner.list_emails(filter).await
    }

    async fn email_exists(
        &self,
        sender: &str,
        recipient: &str,
        subject: &str,
    ) -> Result<bool, AppError> {
        self.inner.email_exists(sender, recipient, subject).await
    }

    async fn apply_reply(&self, id: Uuid, reply: ReplyUpdate) -> Result<Option<Email>, AppError> {
        self.inner.apply_reply(id, reply).await
    }

    async fn list_confirmed_breaches(&self) -> Result<Vec<EmailContext>, AppError> {
        self.inner.list_confirmed_breaches().await
    }

    async fn list_unreplied(&self, only_unalerted: bool) -> Result<Vec<EmailContext>, AppError> {
        self.inner.list_unreplied(only_unalerted).await
    }

    async fn email_facts(
        &self,
        department_id: Option<Uuid>,
        team_member_id: Option<Uuid>,
    ) -> Result<Vec<EmailFact>, AppError> {
        self.inner.email_facts(department_id, team_member_id).await
    }

    async fn record_breach_alerts(
        &self,
        alerts: &[NewAlert],
        sent_at: DateTime<Utc>,
    ) -> Result<Vec<Alert>, AppError> {
        if self.fail_alert_writes.load(Ordering::SeqCst) {
            return Err(AppError::Internal("alert write failed".to_string()));
        }
        self.inner.record_breach_alerts(alerts, sent_at).await
    }

    async fn list_alerts(&self, limit: i64) -> Result<Vec<Alert>, AppError> {
        self.inner.list_alerts(limit).await
    }

    async fn acknowledge_alert(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<Option<Alert>, AppError> {
        self.inner.acknowledge_alert(id, at).await
    }

    async fn counts(&self) -> Result<StoreCounts, AppError> {
        self.inner.counts().await
    }
}
