use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[cfg(feature = "sqlx")]
use sqlx::FromRow;

pub const DEFAULT_EMAIL_LIST_LIMIT: i64 = 100;
pub const MAX_EMAIL_LIST_LIMIT: i64 = 1000;

/// Tracked inbound support email.
///
/// `received_at` and `department_id` are fixed at creation. `replied_at`,
/// `response_time_hours` and `is_sla_breach` are written once by the reply
/// transition. `alert_sent` only ever goes from false to true.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(FromRow))]
pub struct Email {
    pub id: Uuid,
    pub sender: String,
    pub recipient: String,
    pub subject: String,
    pub body: String,
    pub team_member_id: Option<Uuid>,
    pub department_id: Option<Uuid>,
    pub received_at: DateTime<Utc>,
    pub replied_at: Option<DateTime<Utc>>,
    pub response_time_hours: Option<f64>,
    pub is_replied: bool,
    pub is_client_email: bool,
    pub is_sla_breach: bool,
    pub alert_sent: bool,
    pub alert_sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Email {
    /// Breach stored at reply time. Unreplied emails are never confirmed breaches.
    pub fn is_confirmed_breach(&self) -> bool {
        self.is_replied && self.is_sla_breach
    }
}

fn default_true() -> bool {
    true
}

/// Request DTO for reporting a received email
#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct RecordEmailRequest {
    #[validate(email(message = "Invalid sender address"))]
    pub sender: String,
    #[validate(email(message = "Invalid recipient address"))]
    pub recipient: String,
    #[validate(length(max = 998, message = "Subject must be at most 998 characters"))]
    pub subject: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub team_member_id: Option<Uuid>,
    #[serde(default = "default_true")]
    pub is_client_email: bool,
}

/// Request DTO for marking an email replied
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct MarkRepliedRequest {
    pub email_id: Uuid,
}

/// Row to insert. Built by the tracker once attribution is resolved.
#[derive(Debug, Clone)]
pub struct NewEmail {
    pub sender: String,
    pub recipient: String,
    pub subject: String,
    pub body: String,
    pub team_member_id: Option<Uuid>,
    pub department_id: Option<Uuid>,
    pub received_at: DateTime<Utc>,
    pub is_client_email: bool,
}

/// Stored outcome of the reply transition
#[derive(Debug, Clone, Copy)]
pub struct ReplyUpdate {
    pub replied_at: DateTime<Utc>,
    pub response_time_hours: f64,
    pub is_sla_breach: bool,
}

fn default_list_limit() -> i64 {
    DEFAULT_EMAIL_LIST_LIMIT
}

/// Filters for listing emails (newest first)
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct EmailFilter {
    #[serde(default)]
    pub team_member_id: Option<Uuid>,
    #[serde(default)]
    pub department_id: Option<Uuid>,
    #[serde(default)]
    pub is_replied: Option<bool>,
    #[serde(default = "default_list_limit")]
    pub limit: i64,
}

impl Default for EmailFilter {
    fn default() -> Self {
        Self {
            team_member_id: None,
            department_id: None,
            is_replied: None,
            limit: DEFAULT_EMAIL_LIST_LIMIT,
        }
    }
}

impl EmailFilter {
    pub fn clamped_limit(&self) -> i64 {
        self.limit.clamp(1, MAX_EMAIL_LIST_LIMIT)
    }

    pub fn matches(&self, email: &Email) -> bool {
        self.team_member_id
            .map(|id| email.team_member_id == Some(id))
            .unwrap_or(true)
            && self
                .department_id
                .map(|id| email.department_id == Some(id))
                .unwrap_or(true)
            && self
                .is_replied
                .map(|r| email.is_replied == r)
                .unwrap_or(true)
    }
}

/// Email joined with the attribution details the breach scanner needs
#[derive(Debug, Clone)]
#[cfg_attr(feature = "sqlx", derive(FromRow))]
pub struct EmailContext {
    #[cfg_attr(feature = "sqlx", sqlx(flatten))]
    pub email: Email,
    pub department_threshold: Option<f64>,
    pub department_name: Option<String>,
    pub team_member_name: Option<String>,
}

/// Projection of an email used by the metrics aggregator
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "sqlx", derive(FromRow))]
pub struct EmailFact {
    pub department_id: Option<Uuid>,
    pub team_member_id: Option<Uuid>,
    pub is_replied: bool,
    pub response_time_hours: Option<f64>,
    pub is_sla_breach: bool,
}

impl From<&Email> for EmailFact {
    fn from(email: &Email) -> Self {
        EmailFact {
            department_id: email.department_id,
            team_member_id: email.team_member_id,
            is_replied: email.is_replied,
            response_time_hours: email.response_time_hours,
            is_sla_breach: email.is_sla_breach,
        }
    }
}
