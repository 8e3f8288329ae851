use slawatch_core::{
    models::{Email, EmailContext, EmailFact, EmailFilter, NewEmail, ReplyUpdate},
    AppError,
};
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

const EMAIL_COLUMNS: &str = "id, sender, recipient, subject, body, team_member_id, department_id, \
     received_at, replied_at, response_time_hours, is_replied, is_client_email, is_sla_breach, \
     alert_sent, alert_sent_at, created_at, updated_at";

const EMAIL_CONTEXT_SELECT: &str = r#"
    SELECT e.id, e.sender, e.recipient, e.subject, e.body, e.team_member_id, e.department_id,
           e.received_at, e.replied_at, e.response_time_hours, e.is_replied, e.is_client_email,
           e.is_sla_breach, e.alert_sent, e.alert_sent_at, e.created_at, e.updated_at,
           d.sla_threshold_hours AS department_threshold,
           d.name AS department_name,
           tm.name AS team_member_name
    FROM emails e
    LEFT JOIN departments d ON d.id = e.department_id
    LEFT JOIN team_members tm ON tm.id = e.team_member_id
"#;

/// Repository for tracked emails
#[derive(Clone)]
pub struct EmailRepository {
    pool: PgPool,
}

impl EmailRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self, email), fields(db.table = "emails", db.operation = "insert"))]
    pub async fn insert(&self, email: NewEmail) -> Result<Email, AppError> {
        let email = sqlx::query_as::<Postgres, Email>(&format!(
            r#"
            INSERT INTO emails (sender, recipient, subject, body, team_member_id, department_id,
                                received_at, is_client_email, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $7, $7)
            RETURNING {}
            "#,
            EMAIL_COLUMNS
        ))
        .bind(&email.sender)
        .bind(&email.recipient)
        .bind(&email.subject)
        .bind(&email.body)
        .bind(email.team_member_id)
        .bind(email.department_id)
        .bind(email.received_at)
        .bind(email.is_client_email)
        .fetch_one(&self.pool)
        .await?;

        Ok(email)
    }

    #[tracing::instrument(skip(self), fields(db.table = "emails", db.operation = "select", db.record_id = %id))]
    pub async fn get(&self, id: Uuid) -> Result<Option<Email>, AppError> {
        let email = sqlx::query_as::<Postgres, Email>(&format!(
            "SELECT {} FROM emails WHERE id = $1",
            EMAIL_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(email)
    }

    #[tracing::instrument(skip(self), fields(db.table = "emails", db.operation = "select", db.record_id = %id))]
    pub async fn get_context(&self, id: Uuid) -> Result<Option<EmailContext>, AppError> {
        let context = sqlx::query_as::<Postgres, EmailContext>(&format!(
            "{} WHERE e.id = $1",
            EMAIL_CONTEXT_SELECT
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(context)
    }

    #[tracing::instrument(skip(self), fields(db.table = "emails", db.operation = "select"))]
    pub async fn list(&self, filter: &EmailFilter) -> Result<Vec<Email>, AppError> {
        let emails = sqlx::query_as::<Postgres, Email>(&format!(
            r#"
            SELECT {}
            FROM emails
            WHERE ($1::uuid IS NULL OR team_member_id = $1)
              AND ($2::uuid IS NULL OR department_id = $2)
              AND ($3::boolean IS NULL OR is_replied = $3)
            ORDER BY received_at DESC
            LIMIT $4
            "#,
            EMAIL_COLUMNS
        ))
        .bind(filter.team_member_id)
        .bind(filter.department_id)
        .bind(filter.is_replied)
        .bind(filter.clamped_limit())
        .fetch_all(&self.pool)
        .await?;

        Ok(emails)
    }

    /// Dedup key used by mailbox sync
    #[tracing::instrument(skip(self, subject), fields(db.table = "emails", db.operation = "select"))]
    pub async fn exists(&self, sender: &str, recipient: &str, subject: &str) -> Result<bool, AppError> {
        let exists = sqlx::query_scalar::<Postgres, bool>(
            "SELECT EXISTS(SELECT 1 FROM emails WHERE sender = $1 AND recipient = $2 AND subject = $3)",
        )
        .bind(sender)
        .bind(recipient)
        .bind(subject)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    /// Reply transition. Only an unreplied row is updated, so concurrent
    /// replies race on the row and exactly one wins; the loser gets `None`.
    #[tracing::instrument(skip(self, reply), fields(db.table = "emails", db.operation = "update", db.record_id = %id))]
    pub async fn apply_reply(&self, id: Uuid, reply: ReplyUpdate) -> Result<Option<Email>, AppError> {
        let email = sqlx::query_as::<Postgres, Email>(&format!(
            r#"
            UPDATE emails
            SET is_replied = TRUE,
                replied_at = $2,
                response_time_hours = $3,
                is_sla_breach = $4,
                updated_at = $2
            WHERE id = $1 AND is_replied = FALSE
            RETURNING {}
            "#,
            EMAIL_COLUMNS
        ))
        .bind(id)
        .bind(reply.replied_at)
        .bind(reply.response_time_hours)
        .bind(reply.is_sla_breach)
        .fetch_optional(&self.pool)
        .await?;

        Ok(email)
    }

    #[tracing::instrument(skip(self), fields(db.table = "emails", db.operation = "select"))]
    pub async fn list_confirmed_breaches(&self) -> Result<Vec<EmailContext>, AppError> {
        let rows = sqlx::query_as::<Postgres, EmailContext>(&format!(
            "{} WHERE e.is_replied = TRUE AND e.is_sla_breach = TRUE ORDER BY e.received_at DESC",
            EMAIL_CONTEXT_SELECT
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Unreplied emails, oldest first. With `only_unalerted` the rows that
    /// already raised an alert are skipped.
    #[tracing::instrument(skip(self), fields(db.table = "emails", db.operation = "select"))]
    pub async fn list_unreplied(&self, only_unalerted: bool) -> Result<Vec<EmailContext>, AppError> {
        let rows = sqlx::query_as::<Postgres, EmailContext>(&format!(
            "{} WHERE e.is_replied = FALSE AND ($1 = FALSE OR e.alert_sent = FALSE) ORDER BY e.received_at ASC",
            EMAIL_CONTEXT_SELECT
        ))
        .bind(only_unalerted)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    #[tracing::instrument(skip(self), fields(db.table = "emails", db.operation = "select"))]
    pub async fn facts(
        &self,
        department_id: Option<Uuid>,
        team_member_id: Option<Uuid>,
    ) -> Result<Vec<EmailFact>, AppError> {
        let facts = sqlx::query_as::<Postgres, EmailFact>(
            r#"
            SELECT department_id, team_member_id, is_replied, response_time_hours, is_sla_breach
            FROM emails
            WHERE ($1::uuid IS NULL OR department_id = $1)
              AND ($2::uuid IS NULL OR team_member_id = $2)
            "#,
        )
        .bind(department_id)
        .bind(team_member_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(facts)
    }
}
