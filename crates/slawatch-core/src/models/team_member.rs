use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[cfg(feature = "sqlx")]
use sqlx::FromRow;

/// Support agent whose mailbox is monitored.
///
/// `app_password` is the mailbox credential. It is never serialized and is
/// redacted from `Debug` output.
#[derive(Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(FromRow))]
pub struct TeamMember {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub app_password: Option<String>,
    pub department_id: Uuid,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl TeamMember {
    pub fn has_mailbox_credential(&self) -> bool {
        self.app_password
            .as_deref()
            .map(|p| !p.trim().is_empty())
            .unwrap_or(false)
    }
}

impl fmt::Debug for TeamMember {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TeamMember")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("email", &self.email)
            .field("app_password", &self.app_password.as_ref().map(|_| "<redacted>"))
            .field("department_id", &self.department_id)
            .field("is_active", &self.is_active)
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// Team member as exposed over the API
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TeamMemberResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub department_id: Uuid,
    pub is_active: bool,
    pub has_mailbox_credential: bool,
    pub created_at: DateTime<Utc>,
}

impl From<TeamMember> for TeamMemberResponse {
    fn from(member: TeamMember) -> Self {
        TeamMemberResponse {
            has_mailbox_credential: member.has_mailbox_credential(),
            id: member.id,
            name: member.name,
            email: member.email,
            department_id: member.department_id,
            is_active: member.is_active,
            created_at: member.created_at,
        }
    }
}

/// Request DTO for creating a team member
#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct CreateTeamMemberRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be between 1 and 100 characters"))]
    pub name: String,
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[serde(default)]
    pub app_password: Option<String>,
    pub department_id: Uuid,
}

/// Request DTO for updating a team member. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize, ToSchema, Validate)]
pub struct UpdateTeamMemberRequest {
    #[serde(default)]
    #[validate(length(min = 1, max = 100, message = "Name must be between 1 and 100 characters"))]
    pub name: Option<String>,
    #[serde(default)]
    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,
    #[serde(default)]
    pub app_password: Option<String>,
    #[serde(default)]
    pub department_id: Option<Uuid>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

/// Filters for listing team members
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct TeamMemberFilter {
    #[serde(default)]
    pub department_id: Option<Uuid>,
    /// `None` lists members regardless of state
    #[serde(default)]
    pub is_active: Option<bool>,
}

impl TeamMemberFilter {
    pub fn active() -> Self {
        Self {
            department_id: None,
            is_active: Some(true),
        }
    }

    pub fn matches(&self, member: &TeamMember) -> bool {
        self.department_id
            .map(|d| d == member.department_id)
            .unwrap_or(true)
            && self.is_active.map(|a| a == member.is_active).unwrap_or(true)
    }
}

/// Result of deleting a team member
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TeamMemberRemoval {
    /// No emails referenced the member, so the row was removed
    Deleted,
    /// The member owns email history and was deactivated instead
    Deactivated,
}
