//! In-memory `SlaStore`.
//!
//! Mirrors the Postgres semantics (uniqueness, foreign keys, conditional reply
//! and alert updates) behind a single `RwLock`, so every write is one atomic
//! step. Used by the test suites and by `STORE_BACKEND=memory`.

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
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::store::SlaStore;

#[derive(Default)]
struct MemoryState {
    departments: HashMap<Uuid, Department>,
    team_members: HashMap<Uuid, TeamMember>,
    emails: HashMap<Uuid, Email>,
    alerts: Vec<Alert>,
}

impl MemoryState {
    fn context(&self, email: &Email) -> EmailContext {
        let department = email
            .department_id
            .and_then(|id| self.departments.get(&id));
        let member = email
            .team_member_id
            .and_then(|id| self.team_members.get(&id));
        EmailContext {
            email: email.clone(),
            department_threshold: department.map(|d| d.sla_threshold_hours),
            department_name: department.map(|d| d.name.clone()),
            team_member_name: member.map(|m| m.name.clone()),
        }
    }

    fn email_taken(&self, email: &str, except: Option<Uuid>) -> bool {
        self.team_members
            .values()
            .any(|m| Some(m.id) != except && m.email.eq_ignore_ascii_case(email))
    }

    fn name_taken(&self, name: &str, except: Option<Uuid>) -> bool {
        self.departments
            .values()
            .any(|d| Some(d.id) != except && d.name == name)
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SlaStore for MemoryStore {
    async fn create_department(
        &self,
        name: &str,
        sla_threshold_hours: f64,
    ) -> Result<Department, AppError> {
        let mut state = self.state.write().await;
        if state.name_taken(name, None) {
            return Err(AppError::Conflict(format!(
                "Department '{}' already exists",
                name
            )));
        }
        let department = Department {
            id: Uuid::new_v4(),
            name: name.to_string(),
            sla_threshold_hours,
            created_at: Utc::now(),
        };
        state.departments.insert(department.id, department.clone());
        Ok(department)
    }

    async fn get_department(&self, id: Uuid) -> Result<Option<Department>, AppError> {
        Ok(self.state.read().await.departments.get(&id).cloned())
    }

    async fn find_department_by_name(&self, name: &str) -> Result<Option<Department>, AppError> {
        let state = self.state.read().await;
        Ok(state.departments.values().find(|d| d.name == name).cloned())
    }

    async fn list_departments(&self) -> Result<Vec<Department>, AppError> {
        let state = self.state.read().await;
        let mut departments: Vec<Department> = state.departments.values().cloned().collect();
        departments.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(departments)
    }

    async fn update_department(
        &self,
        id: Uuid,
        changes: &UpdateDepartmentRequest,
    ) -> Result<Option<Department>, AppError> {
        let mut state = self.state.write().await;
        if let Some(name) = changes.name.as_deref() {
            if state.name_taken(name, Some(id)) {
                return Err(AppError::Conflict(format!(
                    "Department '{}' already exists",
                    name
                )));
            }
        }
        let Some(department) = state.departments.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = &changes.name {
            department.name = name.clone();
        }
        if let Some(hours) = changes.sla_threshold_hours {
            department.sla_threshold_hours = hours;
        }
        Ok(Some(department.clone()))
    }

    async fn delete_department(&self, id: Uuid) -> Result<bool, AppError> {
        let mut state = self.state.write().await;
        if state.team_members.values().any(|m| m.department_id == id) {
            return Err(AppError::Conflict(
                "Department still has team members".to_string(),
            ));
        }
        let removed = state.departments.remove(&id).is_some();
        if removed {
            for email in state.emails.values_mut() {
                if email.department_id == Some(id) {
                    email.department_id = None;
                }
            }
        }
        Ok(removed)
    }

    async fn count_department_members(&self, id: Uuid) -> Result<i64, AppError> {
        let state = self.state.read().await;
        Ok(state
            .team_members
            .values()
            .filter(|m| m.department_id == id)
            .count() as i64)
    }

    async fn create_team_member(
        &self,
        request: &CreateTeamMemberRequest,
    ) -> Result<TeamMember, AppError> {
        let mut state = self.state.write().await;
        if state.email_taken(&request.email, None) {
            return Err(AppError::Conflict(format!(
                "Team member with email '{}' already exists",
                request.email
            )));
        }
        if !state.departments.contains_key(&request.department_id) {
            return Err(AppError::Conflict(format!(
                "Department {} does not exist",
                request.department_id
            )));
        }
        let member = TeamMember {
            id: Uuid::new_v4(),
            name: request.name.clone(),
            email: request.email.clone(),
            app_password: request.app_password.clone(),
            department_id: request.department_id,
            is_active: true,
            created_at: Utc::now(),
        };
        state.team_members.insert(member.id, member.clone());
        Ok(member)
    }

    async fn get_team_member(&self, id: Uuid) -> Result<Option<TeamMember>, AppError> {
        Ok(self.state.read().await.team_members.get(&id).cloned())
    }

    async fn find_team_member_by_email(
        &self,
        email: &str,
    ) -> Result<Option<TeamMember>, AppError> {
        let state = self.state.read().await;
        Ok(state
            .team_members
            .values()
            .find(|m| m.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn list_team_members(
        &self,
        filter: &TeamMemberFilter,
    ) -> Result<Vec<TeamMember>, AppError> {
        let state = self.state.read().await;
        let mut members: Vec<TeamMember> = state
            .team_members
            .values()
            .filter(|m| filter.matches(m))
            .cloned()
            .collect();
        members.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(members)
    }

    async fn update_team_member(
        &self,
        id: Uuid,
        changes: &UpdateTeamMemberRequest,
    ) -> Result<Option<TeamMember>, AppError> {
        let mut state = self.state.write().await;
        if let Some(email) = changes.email.as_deref() {
            if state.email_taken(email, Some(id)) {
                return Err(AppError::Conflict(format!(
                    "Team member with email '{}' already exists",
                    email
                )));
            }
        }
        if let Some(department_id) = changes.department_id {
            if !state.departments.contains_key(&department_id) {
                return Err(AppError::Conflict(format!(
                    "Department {} does not exist",
                    department_id
                )));
            }
        }
        let Some(member) = state.team_members.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = &changes.name {
            member.name = name.clone();
        }
        if let Some(email) = &changes.email {
            member.email = email.clone();
        }
        if let Some(password) = &changes.app_password {
            member.app_password = Some(password.clone());
        }
        if let Some(department_id) = changes.department_id {
            member.department_id = department_id;
        }
        if let Some(active) = changes.is_active {
            member.is_active = active;
        }
        Ok(Some(member.clone()))
    }

    async fn delete_team_member(&self, id: Uuid) -> Result<bool, AppError> {
        let mut state = self.state.write().await;
        let removed = state.team_members.remove(&id).is_some();
        if removed {
            for email in state.emails.values_mut() {
                if email.team_member_id == Some(id) {
                    email.team_member_id = None;
                }
            }
        }
        Ok(removed)
    }

    async fn count_team_member_emails(&self, id: Uuid) -> Result<i64, AppError> {
        let state = self.state.read().await;
        Ok(state
            .emails
            .values()
            .filter(|e| e.team_member_id == Some(id))
            .count() as i64)
    }

    async fn insert_email(&self, email: NewEmail) -> Result<Email, AppError> {
        let mut state = self.state.write().await;
        let row = Email {
            id: Uuid::new_v4(),
            sender: email.sender,
            recipient: email.recipient,
            subject: email.subject,
            body: email.body,
            team_member_id: email.team_member_id,
            department_id: email.department_id,
            received_at: email.received_at,
            replied_at: None,
            response_time_hours: None,
            is_replied: false,
            is_client_email: email.is_client_email,
            is_sla_breach: false,
            alert_sent: false,
            alert_sent_at: None,
            created_at: email.received_at,
            updated_at: email.received_at,
        };
        state.emails.insert(row.id, row.clone());
        Ok(row)
    }

    async fn get_email(&self, id: Uuid) -> Result<Option<Email>, AppError> {
        Ok(self.state.read().await.emails.get(&id).cloned())
    }

    async fn get_email_context(&self, id: Uuid) -> Result<Option<EmailContext>, AppError> {
        let state = self.state.read().await;
        Ok(state.emails.get(&id).map(|e| state.context(e)))
    }

    async fn list_emails(&self, filter: &EmailFilter) -> Result<Vec<Email>, AppError> {
        let state = self.state.read().await;
        let mut emails: Vec<Email> = state
            .emails
            .values()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect();
        emails.sort_by(|a, b| b.received_at.cmp(&a.received_at));
        emails.truncate(filter.clamped_limit() as usize);
        Ok(emails)
    }

    async fn email_exists(
        &self,
        sender: &str,
        recipient: &str,
        subject: &str,
    ) -> Result<bool, AppError> {
        let state = self.state.read().await;
        Ok(state
            .emails
            .values()
            .any(|e| e.sender == sender && e.recipient == recipient && e.subject == subject))
    }

    async fn apply_reply(&self, id: Uuid, reply: ReplyUpdate) -> Result<Option<Email>, AppError> {
        let mut state = self.state.write().await;
        match state.emails.get_mut(&id) {
            Some(email) if !email.is_replied => {
                email.is_replied = true;
                email.replied_at = Some(reply.replied_at);
                email.response_time_hours = Some(reply.response_time_hours);
                email.is_sla_breach = reply.is_sla_breach;
                email.updated_at = reply.replied_at;
                Ok(Some(email.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn list_confirmed_breaches(&self) -> Result<Vec<EmailContext>, AppError> {
        let state = self.state.read().await;
        let mut rows: Vec<EmailContext> = state
            .emails
            .values()
            .filter(|e| e.is_confirmed_breach())
            .map(|e| state.context(e))
            .collect();
        rows.sort_by(|a, b| b.email.received_at.cmp(&a.email.received_at));
        Ok(rows)
    }

    async fn list_unreplied(&self, only_unalerted: bool) -> Result<Vec<EmailContext>, AppError> {
        let state = self.state.read().await;
        let mut rows: Vec<EmailContext> = state
            .emails
            .values()
            .filter(|e| !e.is_replied && (!only_unalerted || !e.alert_sent))
            .map(|e| state.context(e))
            .collect();
        rows.sort_by(|a, b| a.email.received_at.cmp(&b.email.received_at));
        Ok(rows)
    }

    async fn email_facts(
        &self,
        department_id: Option<Uuid>,
        team_member_id: Option<Uuid>,
    ) -> Result<Vec<EmailFact>, AppError> {
        let state = self.state.read().await;
        Ok(state
            .emails
            .values()
            .filter(|e| department_id.map(|d| e.department_id == Some(d)).unwrap_or(true))
            .filter(|e| team_member_id.map(|m| e.team_member_id == Some(m)).unwrap_or(true))
            .map(EmailFact::from)
            .collect())
    }

    async fn record_breach_alerts(
        &self,
        alerts: &[NewAlert],
        sent_at: DateTime<Utc>,
    ) -> Result<Vec<Alert>, AppError> {
        let mut state = self.state.write().await;
        let mut created = Vec::with_capacity(alerts.len());
        for alert in alerts {
            let Some(email) = state.emails.get_mut(&alert.email_id) else {
                continue;
            };
            if email.alert_sent || email.is_replied {
                continue;
            }
            email.alert_sent = true;
            email.alert_sent_at = Some(sent_at);
            email.updated_at = sent_at;

            let row = Alert {
                id: Uuid::new_v4(),
                email_id: alert.email_id,
                alert_type: alert.alert_type,
                message: alert.message.clone(),
                sent_to: alert.sent_to.clone(),
                sent_at,
                acknowledged_at: None,
            };
            state.alerts.push(row.clone());
            created.push(row);
        }
        Ok(created)
    }

    async fn list_alerts(&self, limit: i64) -> Result<Vec<Alert>, AppError> {
        let state = self.state.read().await;
        let mut alerts = state.alerts.clone();
        alerts.sort_by(|a, b| b.sent_at.cmp(&a.sent_at));
        alerts.truncate(limit.max(0) as usize);
        Ok(alerts)
    }

    async fn acknowledge_alert(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<Option<Alert>, AppError> {
        let mut state = self.state.write().await;
        Ok(state.alerts.iter_mut().find(|a| a.id == id).map(|alert| {
            if alert.acknowledged_at.is_none() {
                alert.acknowledged_at = Some(at);
            }
            alert.clone()
        }))
    }

    async fn counts(&self) -> Result<StoreCounts, AppError> {
        let state = self.state.read().await;
        Ok(StoreCounts {
            departments: state.departments.len() as i64,
            team_members: state.team_members.len() as i64,
            active_team_members: state.team_members.values().filter(|m| m.is_active).count()
                as i64,
            emails: state.emails.len() as i64,
            replied_emails: state.emails.values().filter(|e| e.is_replied).count() as i64,
            alerts: state.alerts.len() as i64,
        })
    }
}
