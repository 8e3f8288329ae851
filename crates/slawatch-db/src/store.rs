//! Store abstraction
//!
//! `SlaStore` is the single persistence seam of the application. Services hold an
//! `Arc<dyn SlaStore>` so they run unchanged against Postgres (`PgStore`) or the
//! in-memory store used by tests (`MemoryStore`).
//!
//! Contract shared by every implementation:
//! - `apply_reply` only updates an unreplied email and returns `None` otherwise;
//! - `record_breach_alerts` is all-or-nothing and never alerts an email twice;
//! - duplicate department names and member addresses surface as `AppError::Conflict`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use slawatch_core::{
    models::{
        Alert, CreateTeamMemberRequest, Department, Email, EmailContext, EmailFact, EmailFilter,
        NewAlert, NewEmail, ReplyUpdate, StoreCounts, TeamMember, TeamMemberFilter,
        UpdateDepartmentRequest, UpdateTeamMemberRequest,
    },
    AppError,
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::{AlertRepository, DepartmentRepository, EmailRepository, TeamMemberRepository};

#[async_trait]
pub trait SlaStore: Send + Sync {
    // Departments
    async fn create_department(
        &self,
        name: &str,
        sla_threshold_hours: f64,
    ) -> Result<Department, AppError>;
    async fn get_department(&self, id: Uuid) -> Result<Option<Department>, AppError>;
    async fn find_department_by_name(&self, name: &str) -> Result<Option<Department>, AppError>;
    async fn list_departments(&self) -> Result<Vec<Department>, AppError>;
    async fn update_department(
        &self,
        id: Uuid,
        changes: &UpdateDepartmentRequest,
    ) -> Result<Option<Department>, AppError>;
    async fn delete_department(&self, id: Uuid) -> Result<bool, AppError>;
    async fn count_department_members(&self, id: Uuid) -> Result<i64, AppError>;

    // Team members
    async fn create_team_member(
        &self,
        request: &CreateTeamMemberRequest,
    ) -> Result<TeamMember, AppError>;
    async fn get_team_member(&self, id: Uuid) -> Result<Option<TeamMember>, AppError>;
    async fn find_team_member_by_email(&self, email: &str)
        -> Result<Option<TeamMember>, AppError>;
    async fn list_team_members(
        &self,
        filter: &TeamMemberFilter,
    ) -> Result<Vec<TeamMember>, AppError>;
    async fn update_team_member(
        &self,
        id: Uuid,
        changes: &UpdateTeamMemberRequest,
    ) -> Result<Option<TeamMember>, AppError>;
    async fn delete_team_member(&self, id: Uuid) -> Result<bool, AppError>;
    async fn count_team_member_emails(&self, id: Uuid) -> Result<i64, AppError>;

    // Emails
    async fn insert_email(&self, email: NewEmail) -> Result<Email, AppError>;
    async fn get_email(&self, id: Uuid) -> Result<Option<Email>, AppError>;
    async fn get_email_context(&self, id: Uuid) -> Result<Option<EmailContext>, AppError>;
    async fn list_emails(&self, filter: &EmailFilter) -> Result<Vec<Email>, AppError>;
    async fn email_exists(
        &self,
        sender: &str,
        recipient: &str,
        subject: &str,
    ) -> Result<bool, AppError>;
    async fn apply_reply(&self, id: Uuid, reply: ReplyUpdate) -> Result<Option<Email>, AppError>;
    async fn list_confirmed_breaches(&self) -> Result<Vec<EmailContext>, AppError>;
    async fn list_unreplied(&self, only_unalerted: bool) -> Result<Vec<EmailContext>, AppError>;
    async fn email_facts(
        &self,
        department_id: Option<Uuid>,
        team_member_id: Option<Uuid>,
    ) -> Result<Vec<EmailFact>, AppError>;

    // Alerts
    async fn record_breach_alerts(
        &self,
        alerts: &[NewAlert],
        sent_at: DateTime<Utc>,
    ) -> Result<Vec<Alert>, AppError>;
    async fn list_alerts(&self, limit: i64) -> Result<Vec<Alert>, AppError>;
    async fn acknowledge_alert(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<Option<Alert>, AppError>;

    async fn counts(&self) -> Result<StoreCounts, AppError>;
}

/// Postgres-backed store composed of the per-table repositories
#[derive(Clone)]
pub struct PgStore {
    departments: DepartmentRepository,
    team_members: TeamMemberRepository,
    emails: EmailRepository,
    alerts: AlertRepository,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            departments: DepartmentRepository::new(pool.clone()),
            team_members: TeamMemberRepository::new(pool.clone()),
            emails: EmailRepository::new(pool.clone()),
            alerts: AlertRepository::new(pool),
        }
    }
}

#[async_trait]
impl SlaStore for PgStore {
    async fn create_department(
        &self,
        name: &str,
        sla_threshold_hours: f64,
    ) -> Result<Department, AppError> {
        self.departments.create(name, sla_threshold_hours).await
    }

    async fn get_department(&self, id: Uuid) -> Result<Option<Department>, AppError> {
        self.departments.get(id).await
    }

    async fn find_department_by_name(&self, name: &str) -> Result<Option<Department>, AppError> {
        self.departments.find_by_name(name).await
    }

    async fn list_departments(&self) -> Result<Vec<Department>, AppError> {
        self.departments.list().await
    }

    async fn update_department(
        &self,
        id: Uuid,
        changes: &UpdateDepartmentRequest,
    ) -> Result<Option<Department>, AppError> {
        self.departments.update(id, changes).await
    }

    async fn delete_department(&self, id: Uuid) -> Result<bool, AppError> {
        self.departments.delete(id).await
    }

    async fn count_department_members(&self, id: Uuid) -> Result<i64, AppError> {
        self.departments.count_members(id).await
    }

    async fn create_team_member(
        &self,
        request: &CreateTeamMemberRequest,
    ) -> Result<TeamMember, AppError> {
        self.team_members.create(request).await
    }

    async fn get_team_member(&self, id: Uuid) -> Result<Option<TeamMember>, AppError> {
        self.team_members.get(id).await
    }

    async fn find_team_member_by_email(
        &self,
        email: &str,
    ) -> Result<Option<TeamMember>, AppError> {
        self.team_members.find_by_email(email).await
    }

    async fn list_team_members(
        &self,
        filter: &TeamMemberFilter,
    ) -> Result<Vec<TeamMember>, AppError> {
        self.team_members.list(filter).await
    }

    async fn update_team_member(
        &self,
        id: Uuid,
        changes: &UpdateTeamMemberRequest,
    ) -> Result<Option<TeamMember>, AppError> {
        self.team_members.update(id, changes).await
    }

    async fn delete_team_member(&self, id: Uuid) -> Result<bool, AppError> {
        self.team_members.delete(id).await
    }

    async fn count_team_member_emails(&self, id: Uuid) -> Result<i64, AppError> {
        self.team_members.count_emails(id).await
    }

    async fn insert_email(&self, email: NewEmail) -> Result<Email, AppError> {
        self.emails.insert(email).await
    }

    async fn get_email(&self, id: Uuid) -> Result<Option<Email>, AppError> {
        self.emails.get(id).await
    }

    async fn get_email_context(&self, id: Uuid) -> Result<Option<EmailContext>, AppError> {
        self.emails.get_context(id).await
    }

    async fn list_emails(&self, filter: &EmailFilter) -> Result<Vec<Email>, AppError> {
        self.emails.list(filter).await
    }

    async fn email_exists(
        &self,
        sender: &str,
        recipient: &str,
        subject: &str,
    ) -> Result<bool, AppError> {
        self.emails.exists(sender, recipient, subject).await
    }

    async fn apply_reply(&self, id: Uuid, reply: ReplyUpdate) -> Result<Option<Email>, AppError> {
        self.emails.apply_reply(id, reply).await
    }

    async fn list_confirmed_breaches(&self) -> Result<Vec<EmailContext>, AppError> {
        self.emails.list_confirmed_breaches().await
    }

    async fn list_unreplied(&self, only_unalerted: bool) -> Result<Vec<EmailContext>, AppError> {
        self.emails.list_unreplied(only_unalerted).await
    }

    async fn email_facts(
        &self,
        department_id: Option<Uuid>,
        team_member_id: Option<Uuid>,
    ) -> Result<Vec<EmailFact>, AppError> {
        self.emails.facts(department_id, team_member_id).await
    }

    async fn record_breach_alerts(
        &self,
        alerts: &[NewAlert],
        sent_at: DateTime<Utc>,
    ) -> Result<Vec<Alert>, AppError> {
        self.alerts.record_breach_alerts(alerts, sent_at).await
    }

    async fn list_alerts(&self, limit: i64) -> Result<Vec<Alert>, AppError> {
        self.alerts.list(limit).await
    }

    async fn acknowledge_alert(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<Option<Alert>, AppError> {
        self.alerts.acknowledge(id, at).await
    }

    async fn counts(&self) -> Result<StoreCounts, AppError> {
        self.alerts.counts().await
    }
}
