//! Reporting models: aggregated metrics, breach listings and store counts.
//!
//! Values are kept at full precision in memory and rounded to two decimals only
//! when serialized.

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::sla::round2;

fn serialize_rounded<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(round2(*value))
}

fn serialize_rounded_opt<S: Serializer>(
    value: &Option<f64>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match value {
        Some(v) => serializer.serialize_some(&round2(*v)),
        None => serializer.serialize_none(),
    }
}

/// Counters shared by every metric group
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct GroupMetrics {
    pub total_emails: i64,
    pub replied_emails: i64,
    pub pending_emails: i64,
    /// Mean response time over replied emails; absent when nothing was replied
    #[serde(serialize_with = "serialize_rounded_opt")]
    pub avg_response_time_hours: Option<f64>,
    pub sla_breaches: i64,
    #[serde(serialize_with = "serialize_rounded")]
    pub sla_compliance_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct DepartmentMetrics {
    pub department_id: Uuid,
    pub department_name: String,
    pub sla_threshold_hours: f64,
    #[serde(flatten)]
    pub metrics: GroupMetrics,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct TeamMemberMetrics {
    pub team_member_id: Uuid,
    pub team_member_name: String,
    pub team_member_email: String,
    pub department_id: Uuid,
    pub department_name: Option<String>,
    pub is_active: bool,
    #[serde(flatten)]
    pub metrics: GroupMetrics,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BreachStatus {
    /// Replied late; stored on the email
    Breached,
    /// Still unreplied and past the threshold; computed at query time
    PendingBreach,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BreachReport {
    pub email_id: Uuid,
    pub sender: String,
    pub recipient: String,
    pub subject: String,
    pub team_member_id: Option<Uuid>,
    pub team_member_name: Option<String>,
    pub department_id: Option<Uuid>,
    pub department_name: Option<String>,
    pub received_at: DateTime<Utc>,
    pub replied_at: Option<DateTime<Utc>>,
    #[serde(serialize_with = "serialize_rounded_opt")]
    pub response_time_hours: Option<f64>,
    #[serde(serialize_with = "serialize_rounded_opt")]
    pub hours_elapsed: Option<f64>,
    pub sla_threshold_hours: f64,
    pub status: BreachStatus,
    pub alert_sent: bool,
}

/// Row counts for the admin statistics endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct StoreCounts {
    pub departments: i64,
    pub team_members: i64,
    pub active_team_members: i64,
    pub emails: i64,
    pub replied_emails: i64,
    pub alerts: i64,
}
