//! Email tracking: recording received emails and the reply transition.

use std::sync::Arc;

use slawatch_core::{
    address::normalize_address,
    models::{Email, NewEmail, RecordEmailRequest, ReplyUpdate},
    sla::{effective_threshold, evaluate_reply},
    AppError, Clock,
};
use slawatch_db::SlaStore;
use uuid::Uuid;
use validator::Validate;

/// Creation and reply path shared by the HTTP API and mailbox sync
#[derive(Clone)]
pub struct EmailTracker {
    store: Arc<dyn SlaStore>,
    clock: Arc<dyn Clock>,
    default_threshold_hours: f64,
}

impl EmailTracker {
    pub fn new(store: Arc<dyn SlaStore>, clock: Arc<dyn Clock>, default_threshold_hours: f64) -> Self {
        Self {
            store,
            clock,
            default_threshold_hours,
        }
    }

    /// Record a received email as unreplied.
    ///
    /// When a team member is given, the email is attributed to that member and
    /// to the member's current department. That attribution never changes
    /// afterwards, even if the member later moves.
    #[tracing::instrument(skip(self, request), fields(team_member_id = ?request.team_member_id))]
    pub async fn record_email(&self, request: RecordEmailRequest) -> Result<Email, AppError> {
        request.validate()?;

        let sender = normalize_address(&request.sender)
            .ok_or_else(|| AppError::InvalidInput(format!("Invalid sender address: {}", request.sender)))?;
        let recipient = normalize_address(&request.recipient).ok_or_else(|| {
            AppError::InvalidInput(format!("Invalid recipient address: {}", request.recipient))
        })?;

        let department_id = match request.team_member_id {
            Some(member_id) => {
                let member = self
                    .store
                    .get_team_member(member_id)
                    .await?
                    .ok_or_else(|| AppError::NotFound(format!("Team member {} not found", member_id)))?;
                Some(member.department_id)
            }
            None => None,
        };

        let email = self
            .store
            .insert_email(NewEmail {
                sender,
                recipient,
                subject: request.subject,
                body: request.body,
                team_member_id: request.team_member_id,
                department_id,
                received_at: self.clock.now(),
                is_client_email: request.is_client_email,
            })
            .await?;

        tracing::info!(
            email_id = %email.id,
            department_id = ?email.department_id,
            "Email recorded"
        );

        Ok(email)
    }

    /// Mark an email replied, computing its response time and breach flag.
    ///
    /// Idempotent: an email that is already replied is returned unchanged, so
    /// the first reply time wins.
    #[tracing::instrument(skip(self), fields(email_id = %email_id))]
    pub async fn mark_replied(&self, email_id: Uuid) -> Result<Email, AppError> {
        let context = self
            .store
            .get_email_context(email_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Email {} not found", email_id)))?;

        if context.email.is_replied {
            tracing::debug!("Email already replied, returning stored evaluation");
            return Ok(context.email);
        }

        let threshold =
            effective_threshold(context.department_threshold, self.default_threshold_hours);
        let replied_at = self.clock.now();
        let evaluation = evaluate_reply(context.email.received_at, replied_at, threshold);

        let reply = ReplyUpdate {
            replied_at,
            response_time_hours: evaluation.response_time_hours,
            is_sla_breach: evaluation.is_sla_breach,
        };

        match self.store.apply_reply(email_id, reply).await? {
            Some(email) => {
                tracing::info!(
                    response_time_hours = email.response_time_hours,
                    is_sla_breach = email.is_sla_breach,
                    sla_threshold_hours = threshold,
                    "Email marked replied"
                );
                Ok(email)
            }
            // Another reply won the race; report the stored outcome.
            None => self
                .store
                .get_email(email_id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Email {} not found", email_id))),
        }
    }

    pub async fn get_email(&self, email_id: Uuid) -> Result<Email, AppError> {
        self.store
            .get_email(email_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Email {} not found", email_id)))
    }

    pub async fn list_emails(
        &self,
        filter: &slawatch_core::models::EmailFilter,
    ) -> Result<Vec<Email>, AppError> {
        self.store.list_emails(filter).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use slawatch_core::{models::CreateTeamMemberRequest, ManualClock};
    use slawatch_db::MemoryStore;

    struct Fixture {
        tracker: EmailTracker,
        store: Arc<MemoryStore>,
        clock: ManualClock,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap());
        let tracker = EmailTracker::new(store.clone(), Arc::new(clock.clone()), 4.0);
        Fixture {
            tracker,
            store,
            clock,
        }
    }

    fn request(team_member_id: Option<Uuid>) -> RecordEmailRequest {
        RecordEmailRequest {
            sender: "Client@Example.com".to_string(),
            recipient: "agent@support.test".to_string(),
            subject: "Where is my order?".to_string(),
            body: "Hello".to_string(),
            team_member_id,
            is_client_email: true,
        }
    }

    async fn member_in_department(store: &MemoryStore, threshold: f64) -> (Uuid, Uuid) {
        let dept = store.create_department("Support", threshold).await.unwrap();
        let member = store
            .create_team_member(&CreateTeamMemberRequest {
                name: "Agent".to_string(),
                email: "agent@support.test".to_string(),
                app_password: None,
                department_id: dept.id,
            })
            .await
            .unwrap();
        (dept.id, member.id)
    }

    #[tokio::test]
    async fn record_email_attributes_member_department() {
        let f = fixture();
        let (dept_id, member_id) = member_in_department(&f.store, 4.0).await;

        let email = f.tracker.record_email(request(Some(member_id))).await.unwrap();

        assert_eq!(email.department_id, Some(dept_id));
        assert_eq!(email.team_member_id, Some(member_id));
        assert_eq!(email.sender, "client@example.com");
        assert!(!email.is_replied);
        assert_eq!(email.received_at, f.clock.now());
    }

    #[tokio::test]
    async fn record_email_rejects_unknown_member() {
        let f = fixture();
        let err = f
            .tracker
            .record_email(request(Some(Uuid::new_v4())))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn five_hour_reply_breaches_four_hour_sla() {
        let f = fixture();
        let (_, member_id) = member_in_department(&f.store, 4.0).await;
        let email = f.tracker.record_email(request(Some(member_id))).await.unwrap();

        f.clock.advance(Duration::hours(5));
        let replied = f.tracker.mark_replied(email.id).await.unwrap();

        assert_eq!(replied.response_time_hours, Some(5.0));
        assert!(replied.is_sla_breach);
        assert!(replied.is_confirmed_breach());
    }

    #[tokio::test]
    async fn reply_exactly_on_threshold_is_compliant() {
        let f = fixture();
        let (_, member_id) = member_in_department(&f.store, 4.0).await;
        let email = f.tracker.record_email(request(Some(member_id))).await.unwrap();

        f.clock.advance(Duration::hours(4));
        let replied = f.tracker.mark_replied(email.id).await.unwrap();

        assert_eq!(replied.response_time_hours, Some(4.0));
        assert!(!replied.is_sla_breach);
    }

    #[tokio::test]
    async fn second_reply_keeps_first_reply_time() {
        let f = fixture();
        let email = f.tracker.record_email(request(None)).await.unwrap();

        f.clock.advance(Duration::minutes(90));
        let first = f.tracker.mark_replied(email.id).await.unwrap();
        f.clock.advance(Duration::hours(10));
        let second = f.tracker.mark_replied(email.id).await.unwrap();

        assert_eq!(first.replied_at, second.replied_at);
        assert_eq!(second.response_time_hours, Some(1.5));
        assert!(!second.is_sla_breach);
    }

    #[tokio::test]
    async fn unattributed_email_uses_default_threshold() {
        let f = fixture();
        let email = f.tracker.record_email(request(None)).await.unwrap();
        assert_eq!(email.department_id, None);

        f.clock.advance(Duration::minutes(4 * 60 + 1));
        let replied = f.tracker.mark_replied(email.id).await.unwrap();
        assert!(replied.is_sla_breach);
    }

    #[tokio::test]
    async fn mark_replied_unknown_email_is_not_found() {
        let f = fixture();
        let err = f.tracker.mark_replied(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
