use chrono::{DateTime, Utc};
use slawatch_core::{
    models::{Alert, NewAlert, StoreCounts},
    AppError,
};
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use super::transaction::TransactionGuard;

const ALERT_COLUMNS: &str =
    "id, email_id, alert_type, message, sent_to, sent_at, acknowledged_at";

/// Repository for the alert log
#[derive(Clone)]
pub struct AlertRepository {
    pool: PgPool,
}

impl AlertRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Mark each email alerted and append its alert, all in one transaction.
    ///
    /// An email that is already alerted (or was replied in the meantime) is
    /// skipped without an alert row. Any failure rolls back every change made
    /// by this call.
    #[tracing::instrument(skip(self, alerts), fields(db.table = "alerts", db.operation = "insert", alert_count = alerts.len()))]
    pub async fn record_breach_alerts(
        &self,
        alerts: &[NewAlert],
        sent_at: DateTime<Utc>,
    ) -> Result<Vec<Alert>, AppError> {
        let mut tx = TransactionGuard::begin(&self.pool).await?;

        match Self::insert_in_transaction(&mut tx, alerts, sent_at).await {
            Ok(created) => {
                tx.commit().await?;
                Ok(created)
            }
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::warn!(error = %rollback_err, "Rollback after failed alert batch also failed");
                }
                Err(e)
            }
        }
    }

    async fn insert_in_transaction(
        tx: &mut TransactionGuard,
        alerts: &[NewAlert],
        sent_at: DateTime<Utc>,
    ) -> Result<Vec<Alert>, AppError> {
        let mut created = Vec::with_capacity(alerts.len());

        for alert in alerts {
            let marked = sqlx::query(
                r#"
                UPDATE emails
                SET alert_sent = TRUE, alert_sent_at = $2, updated_at = $2
                WHERE id = $1 AND alert_sent = FALSE AND is_replied = FALSE
                "#,
            )
            .bind(alert.email_id)
            .bind(sent_at)
            .execute(tx.conn()?)
            .await?;

            if marked.rows_affected() == 0 {
                tracing::debug!(email_id = %alert.email_id, "Email already alerted or replied, skipping");
                continue;
            }

            let row = sqlx::query_as::<Postgres, Alert>(&format!(
                r#"
                INSERT INTO alerts (email_id, alert_type, message, sent_to, sent_at)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING {}
                "#,
                ALERT_COLUMNS
            ))
            .bind(alert.email_id)
            .bind(alert.alert_type)
            .bind(&alert.message)
            .bind(&alert.sent_to)
            .bind(sent_at)
            .fetch_one(tx.conn()?)
            .await?;

            created.push(row);
        }

        Ok(created)
    }

    #[tracing::instrument(skip(self), fields(db.table = "alerts", db.operation = "select"))]
    pub async fn list(&self, limit: i64) -> Result<Vec<Alert>, AppError> {
        let alerts = sqlx::query_as::<Postgres, Alert>(&format!(
            "SELECT {} FROM alerts ORDER BY sent_at DESC LIMIT $1",
            ALERT_COLUMNS
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(alerts)
    }

    /// Set `acknowledged_at` if still empty, then return the row either way.
    #[tracing::instrument(skip(self), fields(db.table = "alerts", db.operation = "update", db.record_id = %id))]
    pub async fn acknowledge(&self, id: Uuid, at: DateTime<Utc>) -> Result<Option<Alert>, AppError> {
        let alert = sqlx::query_as::<Postgres, Alert>(&format!(
            r#"
            UPDATE alerts
            SET acknowledged_at = COALESCE(acknowledged_at, $2)
            WHERE id = $1
            RETURNING {}
            "#,
            ALERT_COLUMNS
        ))
        .bind(id)
        .bind(at)
        .fetch_optional(&self.pool)
        .await?;

        Ok(alert)
    }

    #[tracing::instrument(skip(self), fields(db.operation = "count"))]
    pub async fn counts(&self) -> Result<StoreCounts, AppError> {
        let (departments, team_members, active_team_members, emails, replied_emails, alerts) =
            sqlx::query_as::<Postgres, (i64, i64, i64, i64, i64, i64)>(
                r#"
                SELECT
                    (SELECT COUNT(*) FROM departments),
                    (SELECT COUNT(*) FROM team_members),
                    (SELECT COUNT(*) FROM team_members WHERE is_active = TRUE),
                    (SELECT COUNT(*) FROM emails),
                    (SELECT COUNT(*) FROM emails WHERE is_replied = TRUE),
                    (SELECT COUNT(*) FROM alerts)
                "#,
            )
            .fetch_one(&self.pool)
            .await?;

        Ok(StoreCounts {
            departments,
            team_members,
            active_team_members,
            emails,
            replied_emails,
            alerts,
        })
    }
}
