//! Breach reporting and alerting.
//!
//! Confirmed breaches (late replies) are only ever reported. Pending breaches
//! (unreplied past the threshold) are computed on every call and raise exactly
//! one alert per email. The alert batch commits before any notification goes
//! out, so a failed send never undoes the scan.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use slawatch_core::{
    models::{
        breach_alert_message, Alert, AlertType, BreachReport, BreachStatus, EmailContext,
        NewAlert, SendAlertRequest,
    },
    sla::{effective_threshold, hours_between},
    AppError, Clock,
};
use slawatch_db::SlaStore;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::mailer::Mailer;

#[derive(Debug, Clone)]
pub struct BreachScannerConfig {
    pub default_threshold_hours: f64,
    /// Mail each raised alert to `alert_recipient`
    pub alerts_enabled: bool,
    pub alert_recipient: String,
}

/// Result of one scan pass
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct ScanOutcome {
    pub alerts_raised: usize,
    pub alerts: Vec<Alert>,
    pub notifications_sent: usize,
    pub notification_errors: Vec<String>,
}

#[derive(Clone)]
pub struct BreachScanner {
    store: Arc<dyn SlaStore>,
    clock: Arc<dyn Clock>,
    mailer: Option<Arc<dyn Mailer>>,
    config: BreachScannerConfig,
}

impl BreachScanner {
    pub fn new(
        store: Arc<dyn SlaStore>,
        clock: Arc<dyn Clock>,
        mailer: Option<Arc<dyn Mailer>>,
        config: BreachScannerConfig,
    ) -> Self {
        Self {
            store,
            clock,
            mailer,
            config,
        }
    }

    pub fn alerts_enabled(&self) -> bool {
        self.config.alerts_enabled
    }

    fn threshold_for(&self, context: &EmailContext) -> f64 {
        effective_threshold(
            context.department_threshold,
            self.config.default_threshold_hours,
        )
    }

    /// Confirmed breaches, newest first, then (optionally) pending breaches,
    /// most overdue first.
    #[tracing::instrument(skip(self))]
    pub async fn list_breaches(&self, include_pending: bool) -> Result<Vec<BreachReport>, AppError> {
        let mut reports: Vec<BreachReport> = self
            .store
            .list_confirmed_breaches()
            .await?
            .into_iter()
            .map(|context| {
                let threshold = self.threshold_for(&context);
                report(context, threshold, BreachStatus::Breached, None)
            })
            .collect();

        if include_pending {
            let now = self.clock.now();
            let mut pending: Vec<(f64, BreachReport)> = Vec::new();
            for context in self.store.list_unreplied(false).await? {
                let threshold = self.threshold_for(&context);
                let elapsed = hours_between(context.email.received_at, now);
                if elapsed > threshold {
                    pending.push((
                        elapsed - threshold,
                        report(context, threshold, BreachStatus::PendingBreach, Some(elapsed)),
                    ));
                }
            }
            pending.sort_by(|a, b| b.0.total_cmp(&a.0));
            reports.extend(pending.into_iter().map(|(_, report)| report));
        }

        Ok(reports)
    }

    /// Raise one alert for every unreplied, not yet alerted email past its
    /// threshold, then notify.
    ///
    /// Alerts are committed as one batch; a store failure fails the whole scan
    /// and leaves nothing marked, so the next run retries the same emails.
    #[tracing::instrument(skip(self))]
    pub async fn run_scan_and_alert(&self) -> Result<ScanOutcome, AppError> {
        let now = self.clock.now();
        let mut candidates: HashMap<Uuid, (EmailContext, f64, f64)> = HashMap::new();
        let mut pending = Vec::new();

        for context in self.store.list_unreplied(true).await? {
            let threshold = self.threshold_for(&context);
            let elapsed = hours_between(context.email.received_at, now);
            if elapsed <= threshold {
                continue;
            }

            pending.push(NewAlert {
                email_id: context.email.id,
                alert_type: AlertType::SlaBreach,
                message: breach_alert_message(&context.email.subject, elapsed - threshold),
                sent_to: self.config.alert_recipient.clone(),
            });
            candidates.insert(context.email.id, (context, elapsed, threshold));
        }

        if pending.is_empty() {
            tracing::debug!("No new SLA breaches");
            return Ok(ScanOutcome::default());
        }

        let alerts = self.store.record_breach_alerts(&pending, now).await?;
        tracing::info!(alerts_raised = alerts.len(), "SLA breach alerts raised");

        let mut outcome = ScanOutcome {
            alerts_raised: alerts.len(),
            ..Default::default()
        };

        if let (true, Some(mailer)) = (self.config.alerts_enabled, self.mailer.as_ref()) {
            for alert in &alerts {
                let Some((context, elapsed, threshold)) = candidates.get(&alert.email_id) else {
                    continue;
                };
                let subject = format!("SLA Breach Alert - {}", context.email.subject);
                let body = notification_body(context, *elapsed, *threshold);

                match mailer.send(&alert.sent_to, &subject, &body, false).await {
                    Ok(()) => outcome.notifications_sent += 1,
                    Err(e) => {
                        tracing::warn!(error = %e, email_id = %alert.email_id, "Failed to send breach notification");
                        outcome
                            .notification_errors
                            .push(format!("Alert for email {}: {}", alert.email_id, e));
                    }
                }
            }
        } else if self.config.alerts_enabled {
            tracing::debug!("No mailer configured, breach notifications not sent");
        }

        outcome.alerts = alerts;
        Ok(outcome)
    }

    /// Ad-hoc alert mail to any recipient.
    #[tracing::instrument(skip(self, request), fields(recipient = %request.recipient))]
    pub async fn send_custom_alert(&self, request: SendAlertRequest) -> Result<(), AppError> {
        request.validate()?;
        let mailer = self.mailer.as_ref().ok_or_else(|| {
            AppError::upstream("smtp", "Outbound mail is not configured")
        })?;
        mailer
            .send(&request.recipient, &request.subject, &request.body, request.is_html)
            .await
    }

    pub async fn list_alerts(&self, limit: i64) -> Result<Vec<Alert>, AppError> {
        self.store.list_alerts(limit.clamp(1, 1000)).await
    }

    #[tracing::instrument(skip(self), fields(alert_id = %id))]
    pub async fn acknowledge_alert(&self, id: Uuid) -> Result<Alert, AppError> {
        self.store
            .acknowledge_alert(id, self.clock.now())
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Alert {} not found", id)))
    }
}

fn report(
    context: EmailContext,
    threshold: f64,
    status: BreachStatus,
    hours_elapsed: Option<f64>,
) -> BreachReport {
    let email = context.email;
    BreachReport {
        email_id: email.id,
        sender: email.sender,
        recipient: email.recipient,
        subject: email.subject,
        team_member_id: email.team_member_id,
        team_member_name: context.team_member_name,
        department_id: email.department_id,
        department_name: context.department_name,
        received_at: email.received_at,
        replied_at: email.replied_at,
        response_time_hours: email.response_time_hours,
        hours_elapsed,
        sla_threshold_hours: threshold,
        status,
        alert_sent: email.alert_sent,
    }
}

fn notification_body(context: &EmailContext, elapsed: f64, threshold: f64) -> String {
    let email = &context.email;
    format!(
        "SLA BREACH ALERT\n\n\
         An email has exceeded the SLA threshold and requires immediate attention.\n\n\
         Email Details:\n\
         - Subject: {}\n\
         - From: {}\n\
         - Received: {}\n\
         - Team Member: {}\n\
         - Department: {}\n\n\
         Time Details:\n\
         - Hours Elapsed: {:.2} hours\n\
         - SLA Threshold: {:.2} hours\n\
         - Exceeded By: {:.2} hours\n",
        email.subject,
        email.sender,
        email.received_at.format("%Y-%m-%d %H:%M UTC"),
        context.team_member_name.as_deref().unwrap_or("Unassigned"),
        context.department_name.as_deref().unwrap_or("Unassigned"),
        elapsed,
        threshold,
        elapsed - threshold,
    )
}
