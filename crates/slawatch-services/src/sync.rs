//! Mailbox sync.
//!
//! Pulls recent unread mail from every active team member's mailbox and records
//! new messages through the same creation path as direct reporting. A failing
//! mailbox is recorded in the report and never aborts the batch.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use slawatch_core::{
    address::{has_domain, normalize_address},
    models::{RecordEmailRequest, TeamMember, TeamMemberFilter},
    AppError, Config,
};
use slawatch_db::SlaStore;
use tokio::sync::{Mutex, Semaphore};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::mailbox::{FetchedMessage, MailboxClient};
use crate::tracking::EmailTracker;

#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Default number of unread messages fetched per mailbox
    pub limit: usize,
    /// Pause between members when syncing sequentially
    pub member_pause: Duration,
    /// 1 syncs members one after another; more runs that many mailboxes at once
    pub max_concurrency: usize,
    /// Upper bound for connecting to and reading one mailbox
    pub mailbox_timeout: Duration,
    /// Only sync members whose address is in this domain
    pub domain_filter: Option<String>,
}

impl SyncOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            limit: config.sync_batch_limit,
            member_pause: Duration::from_secs(config.sync_member_pause_secs),
            max_concurrency: config.sync_max_concurrency.max(1),
            mailbox_timeout: Duration::from_secs(config.mailbox_timeout_secs),
            domain_filter: config.mailbox_domain_filter.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct MemberSyncResult {
    pub team_member_id: Uuid,
    pub team_member: String,
    pub emails_found: usize,
    pub emails_processed: usize,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct SyncReport {
    pub total_members_synced: usize,
    pub total_emails_found: usize,
    pub total_emails_processed: usize,
    pub member_results: Vec<MemberSyncResult>,
    pub errors: Vec<String>,
}

impl SyncReport {
    fn absorb(&mut self, result: MemberSyncResult) {
        self.total_members_synced += 1;
        self.total_emails_found += result.emails_found;
        self.total_emails_processed += result.emails_processed;
        self.errors.extend(result.errors.iter().cloned());
        self.member_results.push(result);
    }
}

#[derive(Clone)]
pub struct MailboxSyncService {
    store: Arc<dyn SlaStore>,
    tracker: EmailTracker,
    client: Arc<dyn MailboxClient>,
    options: SyncOptions,
    // Serializes whole runs so a manual sync and a scheduled one never overlap.
    run_lock: Arc<Mutex<()>>,
    // Held across the duplicate check and the insert; member tasks share it.
    record_lock: Arc<Mutex<()>>,
}

impl MailboxSyncService {
    pub fn new(
        store: Arc<dyn SlaStore>,
        tracker: EmailTracker,
        client: Arc<dyn MailboxClient>,
        options: SyncOptions,
    ) -> Self {
        Self {
            store,
            tracker,
            client,
            options,
            run_lock: Arc::new(Mutex::new(())),
            record_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn default_limit(&self) -> usize {
        self.options.limit
    }

    /// Sync every active member that has a mailbox credential.
    ///
    /// Only a failure to list members fails the call; everything after that is
    /// reported per member.
    #[tracing::instrument(skip(self))]
    pub async fn sync_all_mailboxes(&self, limit: Option<usize>) -> Result<SyncReport, AppError> {
        let limit = limit.unwrap_or(self.options.limit).max(1);
        let _run = self.run_lock.lock().await;

        let members: Vec<TeamMember> = self
            .store
            .list_team_members(&TeamMemberFilter::active())
            .await?
            .into_iter()
            .filter(|m| match &self.options.domain_filter {
                Some(domain) => has_domain(&m.email, domain),
                None => true,
            })
            .collect();

        tracing::info!(members = members.len(), limit, "Starting mailbox sync");

        let mut report = SyncReport::default();
        let mut eligible = Vec::with_capacity(members.len());
        for member in members {
            if member.has_mailbox_credential() {
                eligible.push(member);
            } else {
                tracing::warn!(team_member = %member.email, "No app password stored, skipping");
                report
                    .errors
                    .push(format!("No app password for {}", member.email));
            }
        }

        if self.options.max_concurrency <= 1 {
            let count = eligible.len();
            for (index, member) in eligible.into_iter().enumerate() {
                report.absorb(self.sync_member(member, limit).await);
                if index + 1 < count && !self.options.member_pause.is_zero() {
                    tokio::time::sleep(self.options.member_pause).await;
                }
            }
        } else {
            let semaphore = Arc::new(Semaphore::new(self.options.max_concurrency));
            let mut handles = Vec::with_capacity(eligible.len());

            for member in eligible {
                let permit = semaphore
                    .clone()
                    .acquire_owned()
                    .await
                    .map_err(|e| AppError::Internal(format!("Sync semaphore closed: {}", e)))?;
                let this = self.clone();
                let address = member.email.clone();
                let member_id = member.id;
                let handle = tokio::spawn(async move {
                    let _permit = permit;
                    this.sync_member(member, limit).await
                });
                handles.push((member_id, address, handle));
            }

            for (member_id, address, handle) in handles {
                match handle.await {
                    Ok(result) => report.absorb(result),
                    Err(e) => {
                        tracing::error!(error = %e, team_member = %address, "Mailbox sync task panicked");
                        report.absorb(MemberSyncResult {
                            team_member_id: member_id,
                            errors: vec![format!("Error syncing {}: task failed", address)],
                            team_member: address,
                            ..Default::default()
                        });
                    }
                }
            }
        }

        tracing::info!(
            members_synced = report.total_members_synced,
            emails_found = report.total_emails_found,
            emails_processed = report.total_emails_processed,
            errors = report.errors.len(),
            "Mailbox sync finished"
        );

        Ok(report)
    }

    #[tracing::instrument(skip(self, member), fields(team_member = %member.email))]
    async fn sync_member(&self, member: TeamMember, limit: usize) -> MemberSyncResult {
        let mut result = MemberSyncResult {
            team_member_id: member.id,
            team_member: member.email.clone(),
            ..Default::default()
        };

        let fetched = tokio::time::timeout(
            self.options.mailbox_timeout,
            self.fetch_member(&member, limit),
        )
        .await;

        let messages = match fetched {
            Ok(Ok(messages)) => messages,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Mailbox fetch failed");
                result
                    .errors
                    .push(format!("Error syncing {}: {}", member.email, e));
                return result;
            }
            Err(_) => {
                tracing::warn!(
                    timeout_secs = self.options.mailbox_timeout.as_secs(),
                    "Mailbox fetch timed out"
                );
                result.errors.push(format!(
                    "Error syncing {}: timed out after {} seconds",
                    member.email,
                    self.options.mailbox_timeout.as_secs()
                ));
                return result;
            }
        };

        result.emails_found = messages.len();
        for message in messages {
            match self.process_message(message).await {
                Ok(true) => result.emails_processed += 1,
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to record synced message");
                    result
                        .errors
                        .push(format!("Error syncing {}: {}", member.email, e));
                }
            }
        }

        tracing::debug!(
            emails_found = result.emails_found,
            emails_processed = result.emails_processed,
            "Member mailbox synced"
        );
        result
    }

    async fn fetch_member(
        &self,
        member: &TeamMember,
        limit: usize,
    ) -> Result<Vec<FetchedMessage>, AppError> {
        let credential = member.app_password.as_deref().unwrap_or_default();
        let mut session = self.client.connect(&member.email, credential).await?;
        let fetched = session.fetch_unread(limit).await;

        if let Err(e) = session.disconnect().await {
            tracing::debug!(error = %e, "Mailbox logout failed");
        }

        fetched
    }

    /// Record one fetched message. `Ok(false)` means it was skipped: unreadable
    /// addresses, already recorded, or no active member owns the recipient.
    async fn process_message(&self, message: FetchedMessage) -> Result<bool, AppError> {
        let (Some(sender), Some(recipient)) = (
            normalize_address(&message.sender),
            normalize_address(&message.recipient),
        ) else {
            tracing::debug!(sender = %message.sender, recipient = %message.recipient, "Unreadable addresses, skipping");
            return Ok(false);
        };

        let _record = self.record_lock.lock().await;
        if self
            .store
            .email_exists(&sender, &recipient, &message.subject)
            .await?
        {
            tracing::debug!(sender = %sender, "Email already recorded, skipping");
            return Ok(false);
        }

        let owner = match self.store.find_team_member_by_email(&recipient).await? {
            Some(member) if member.is_active => member,
            _ => {
                tracing::debug!(recipient = %recipient, "No active team member for recipient, discarding");
                return Ok(false);
            }
        };

        let email = self
            .tracker
            .record_email(RecordEmailRequest {
                sender,
                recipient,
                subject: message.subject,
                body: message.body,
                team_member_id: Some(owner.id),
                is_client_email: true,
            })
            .await?;

        tracing::info!(email_id = %email.id, team_member_id = %owner.id, "Synced email recorded");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use slawatch_core::{models::CreateTeamMemberRequest, SystemClock};
    use slawatch_db::MemoryStore;

    use crate::test_helpers::FakeMailboxClient;

    fn options(max_concurrency: usize) -> SyncOptions {
        SyncOptions {
            limit: 10,
            member_pause: Duration::ZERO,
            max_concurrency,
            mailbox_timeout: Duration::from_secs(5),
            domain_filter: None,
        }
    }

    fn service(
        store: Arc<MemoryStore>,
        client: Arc<FakeMailboxClient>,
        options: SyncOptions,
    ) -> MailboxSyncService {
        let tracker = EmailTracker::new(store.clone(), Arc::new(SystemClock), 4.0);
        MailboxSyncService::new(store, tracker, client, options)
    }

    async fn add_member(store: &MemoryStore, email: &str, password: Option<&str>) -> TeamMember {
        let dept = match store.find_department_by_name("Support").await.unwrap() {
            Some(d) => d,
            None => store.create_department("Support", 4.0).await.unwrap(),
        };
        store
            .create_team_member(&CreateTeamMemberRequest {
                name: email.to_string(),
                email: email.to_string(),
                app_password: password.map(str::to_string),
                department_id: dept.id,
            })
            .await
            .unwrap()
    }

    fn message(from: &str, to: &str, subject: &str) -> FetchedMessage {
        FetchedMessage {
            sender: from.to_string(),
            recipient: to.to_string(),
            subject: subject.to_string(),
            body: "hello".to_string(),
            date: Some(Utc::now()),
        }
    }

    #[tokio::test]
    async fn second_sync_adds_no_rows() {
        let store = Arc::new(MemoryStore::new());
        let member = add_member(&store, "agent@support.test", Some("secret")).await;
        let client = Arc::new(FakeMailboxClient::default());
        client.set_inbox(
            &member.email,
            vec![
                message("\"Client\" <Client@Example.com>", "Agent <agent@support.test>", "Order"),
                message("other@example.com", "agent@support.test", "Invoice"),
            ],
        );
        let svc = service(store.clone(), client, options(1));

        let first = svc.sync_all_mailboxes(None).await.unwrap();
        assert_eq!(first.total_members_synced, 1);
        assert_eq!(first.total_emails_found, 2);
        assert_eq!(first.total_emails_processed, 2);

        let second = svc.sync_all_mailboxes(None).await.unwrap();
        assert_eq!(second.total_emails_found, 2);
        assert_eq!(second.total_emails_processed, 0);
        assert_eq!(store.counts().await.unwrap().emails, 2);

        let stored = store
            .email_exists("client@example.com", "agent@support.test", "Order")
            .await
            .unwrap();
        assert!(stored);
    }

    #[tokio::test]
    async fn unmatched_recipient_is_discarded() {
        let store = Arc::new(MemoryStore::new());
        let member = add_member(&store, "agent@support.test", Some("secret")).await;
        let client = Arc::new(FakeMailboxClient::default());
        client.set_inbox(
            &member.email,
            vec![message("client@example.com", "nobody@elsewhere.test", "Lost")],
        );
        let svc = service(store.clone(), client, options(1));

        let report = svc.sync_all_mailboxes(None).await.unwrap();
        assert_eq!(report.total_emails_found, 1);
        assert_eq!(report.total_emails_processed, 0);
        assert_eq!(store.counts().await.unwrap().emails, 0);
    }

    #[tokio::test]
    async fn failures_are_collected_per_member() {
        let store = Arc::new(MemoryStore::new());
        add_member(&store, "nopass@support.test", None).await;
        let broken = add_member(&store, "broken@support.test", Some("secret")).await;
        let healthy = add_member(&store, "healthy@support.test", Some("secret")).await;

        let client = Arc::new(FakeMailboxClient::default());
        client.fail_login(&broken.email);
        client.set_inbox(
            &healthy.email,
            vec![message("client@example.com", "healthy@support.test", "Hi")],
        );
        let svc = service(store.clone(), client, options(1));

        let report = svc.sync_all_mailboxes(None).await.unwrap();
        assert_eq!(report.total_members_synced, 2);
        assert_eq!(report.total_emails_processed, 1);
        assert_eq!(report.errors.len(), 2);
        assert!(report
            .errors
            .iter()
            .any(|e| e == "No app password for nopass@support.test"));
        assert!(report
            .errors
            .iter()
            .any(|e| e.starts_with("Error syncing broken@support.test")));
    }

    #[tokio::test(start_paused = true)]
    async fn hung_mailbox_times_out_without_blocking_others() {
        let store = Arc::new(MemoryStore::new());
        let slow = add_member(&store, "slow@support.test", Some("secret")).await;
        let fast = add_member(&store, "fast@support.test", Some("secret")).await;

        let client = Arc::new(FakeMailboxClient::default());
        client.hang(&slow.email);
        client.set_inbox(
            &fast.email,
            vec![message("client@example.com", "fast@support.test", "Hi")],
        );
        let svc = service(store.clone(), client, options(2));

        let report = svc.sync_all_mailboxes(Some(5)).await.unwrap();
        assert_eq!(report.total_members_synced, 2);
        assert_eq!(report.total_emails_processed, 1);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].contains("timed out"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn message_in_many_mailboxes_is_recorded_once() {
        let store = Arc::new(MemoryStore::new());
        let client = Arc::new(FakeMailboxClient::default());
        for i in 0..12 {
            let member = add_member(&store, &format!("agent{}@support.test", i), Some("secret")).await;
            client.set_inbox(
                &member.email,
                vec![message("client@example.com", "agent0@support.test", "Outage")],
            );
        }
        let svc = service(store.clone(), client, options(12));

        for _ in 0..3 {
            svc.sync_all_mailboxes(None).await.unwrap();
        }

        assert_eq!(store.counts().await.unwrap().emails, 1);
        let stored = store
            .email_exists("client@example.com", "agent0@support.test", "Outage")
            .await
            .unwrap();
        assert!(stored);
    }

    #[tokio::test]
    async fn limit_is_passed_to_the_mailbox() {
        let store = Arc::new(MemoryStore::new());
        let member = add_member(&store, "agent@support.test", Some("secret")).await;
        let client = Arc::new(FakeMailboxClient::default());
        client.set_inbox(
            &member.email,
            (0..5)
                .map(|i| message("client@example.com", "agent@support.test", &format!("#{}", i)))
                .collect(),
        );
        let svc = service(store.clone(), client, options(1));

        let report = svc.sync_all_mailboxes(Some(3)).await.unwrap();
        assert_eq!(report.total_emails_found, 3);
        assert_eq!(report.total_emails_processed, 3);
    }
}
