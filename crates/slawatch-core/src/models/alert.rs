use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[cfg(feature = "sqlx")]
use sqlx::FromRow;

/// Alert categories
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "alert_type", rename_all = "snake_case")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertType {
    SlaBreach,
}

/// Append-only alert log entry. Only `acknowledged_at` changes after insert.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(FromRow))]
pub struct Alert {
    pub id: Uuid,
    pub email_id: Uuid,
    pub alert_type: AlertType,
    pub message: String,
    pub sent_to: String,
    pub sent_at: DateTime<Utc>,
    pub acknowledged_at: Option<DateTime<Utc>>,
}

/// Alert the breach scanner wants to raise for one email
#[derive(Debug, Clone)]
pub struct NewAlert {
    pub email_id: Uuid,
    pub alert_type: AlertType,
    pub message: String,
    pub sent_to: String,
}

/// Message text stored on an SLA breach alert
pub fn breach_alert_message(subject: &str, hours_over: f64) -> String {
    format!(
        "Email '{}' has exceeded SLA by {:.2} hours",
        subject, hours_over
    )
}

/// Request DTO for sending an ad-hoc alert mail
#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct SendAlertRequest {
    #[validate(email(message = "Invalid recipient address"))]
    pub recipient: String,
    #[validate(length(min = 1, max = 255, message = "Subject must be between 1 and 255 characters"))]
    pub subject: String,
    pub body: String,
    #[serde(default)]
    pub is_html: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn breach_message_uses_two_decimals() {
        assert_eq!(
            breach_alert_message("Invoice question", 0.5),
            "Email 'Invoice question' has exceeded SLA by 0.50 hours"
        );
    }

    #[test]
    fn alert_type_serializes_screaming_case() {
        let json = serde_json::to_string(&AlertType::SlaBreach).unwrap();
        assert_eq!(json, "\"SLA_BREACH\"");
    }
}
