use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[cfg(feature = "sqlx")]
use sqlx::FromRow;

use crate::sla::DEFAULT_SLA_THRESHOLD_HOURS;

/// Department owning a group of team members and an SLA threshold
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(FromRow))]
pub struct Department {
    pub id: Uuid,
    pub name: String,
    pub sla_threshold_hours: f64,
    pub created_at: DateTime<Utc>,
}

fn default_threshold() -> f64 {
    DEFAULT_SLA_THRESHOLD_HOURS
}

/// Request DTO for creating a department
#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct CreateDepartmentRequest {
    #[validate(length(
        min = 1,
        max = 100,
        message = "Department name must be between 1 and 100 characters"
    ))]
    pub name: String,
    #[serde(default = "default_threshold")]
    pub sla_threshold_hours: f64,
}

/// Request DTO for updating a department. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize, ToSchema, Validate)]
pub struct UpdateDepartmentRequest {
    #[serde(default)]
    #[validate(length(
        min = 1,
        max = 100,
        message = "Department name must be between 1 and 100 characters"
    ))]
    pub name: Option<String>,
    #[serde(default)]
    pub sla_threshold_hours: Option<f64>,
}
