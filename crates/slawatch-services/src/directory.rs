//! Department and team member administration.

use std::sync::Arc;

use slawatch_core::{
    address::normalize_address,
    models::{
        CreateDepartmentRequest, CreateTeamMemberRequest, Department, TeamMember,
        TeamMemberFilter, TeamMemberRemoval, UpdateDepartmentRequest, UpdateTeamMemberRequest,
    },
    sla::validate_threshold,
    AppError,
};
use slawatch_db::SlaStore;
use uuid::Uuid;
use validator::Validate;

#[derive(Clone)]
pub struct DirectoryService {
    store: Arc<dyn SlaStore>,
}

impl DirectoryService {
    pub fn new(store: Arc<dyn SlaStore>) -> Self {
        Self { store }
    }

    #[tracing::instrument(skip(self, request), fields(department.name = %request.name))]
    pub async fn create_department(
        &self,
        request: CreateDepartmentRequest,
    ) -> Result<Department, AppError> {
        request.validate()?;
        let threshold = validate_threshold(request.sla_threshold_hours)?;
        let name = request.name.trim();

        if self.store.find_department_by_name(name).await?.is_some() {
            return Err(AppError::Conflict(format!(
                "Department '{}' already exists",
                name
            )));
        }

        let department = self.store.create_department(name, threshold).await?;
        tracing::info!(department_id = %department.id, sla_threshold_hours = threshold, "Department created");
        Ok(department)
    }

    pub async fn list_departments(&self) -> Result<Vec<Department>, AppError> {
        self.store.list_departments().await
    }

    pub async fn get_department(&self, id: Uuid) -> Result<Department, AppError> {
        self.store
            .get_department(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Department {} not found", id)))
    }

    /// Threshold changes only affect replies evaluated afterwards.
    #[tracing::instrument(skip(self, changes), fields(department_id = %id))]
    pub async fn update_department(
        &self,
        id: Uuid,
        mut changes: UpdateDepartmentRequest,
    ) -> Result<Department, AppError> {
        changes.validate()?;
        if let Some(hours) = changes.sla_threshold_hours {
            validate_threshold(hours)?;
        }
        changes.name = changes.name.map(|n| n.trim().to_string());

        let department = self
            .store
            .update_department(id, &changes)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Department {} not found", id)))?;

        tracing::info!("Department updated");
        Ok(department)
    }

    /// Refused while any team member still belongs to the department.
    #[tracing::instrument(skip(self), fields(department_id = %id))]
    pub async fn delete_department(&self, id: Uuid) -> Result<(), AppError> {
        self.get_department(id).await?;

        let members = self.store.count_department_members(id).await?;
        if members > 0 {
            return Err(AppError::Conflict(format!(
                "Department has {} team member(s); reassign or remove them first",
                members
            )));
        }

        if !self.store.delete_department(id).await? {
            return Err(AppError::NotFound(format!("Department {} not found", id)));
        }

        tracing::info!("Department deleted");
        Ok(())
    }

    #[tracing::instrument(skip(self, request), fields(department_id = %request.department_id))]
    pub async fn create_team_member(
        &self,
        mut request: CreateTeamMemberRequest,
    ) -> Result<TeamMember, AppError> {
        request.validate()?;
        request.email = normalize_address(&request.email)
            .ok_or_else(|| AppError::InvalidInput(format!("Invalid email address: {}", request.email)))?;
        request.name = request.name.trim().to_string();

        self.get_department(request.department_id).await?;

        if self
            .store
            .find_team_member_by_email(&request.email)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(format!(
                "Team member with email '{}' already exists",
                request.email
            )));
        }

        let member = self.store.create_team_member(&request).await?;
        tracing::info!(team_member_id = %member.id, "Team member created");
        Ok(member)
    }

    pub async fn list_team_members(
        &self,
        filter: &TeamMemberFilter,
    ) -> Result<Vec<TeamMember>, AppError> {
        self.store.list_team_members(filter).await
    }

    pub async fn get_team_member(&self, id: Uuid) -> Result<TeamMember, AppError> {
        self.store
            .get_team_member(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Team member {} not found", id)))
    }

    /// Moving a member to another department leaves their past emails where
    /// they were recorded.
    #[tracing::instrument(skip(self, changes), fields(team_member_id = %id))]
    pub async fn update_team_member(
        &self,
        id: Uuid,
        mut changes: UpdateTeamMemberRequest,
    ) -> Result<TeamMember, AppError> {
        changes.validate()?;

        if let Some(email) = changes.email.take() {
            let normalized = normalize_address(&email)
                .ok_or_else(|| AppError::InvalidInput(format!("Invalid email address: {}", email)))?;
            if let Some(existing) = self.store.find_team_member_by_email(&normalized).await? {
                if existing.id != id {
                    return Err(AppError::Conflict(format!(
                        "Team member with email '{}' already exists",
                        normalized
                    )));
                }
            }
            changes.email = Some(normalized);
        }

        if let Some(department_id) = changes.department_id {
            self.get_department(department_id).await?;
        }

        let member = self
            .store
            .update_team_member(id, &changes)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Team member {} not found", id)))?;

        tracing::info!("Team member updated");
        Ok(member)
    }

    /// Members with email history are deactivated rather than deleted so
    /// their emails stay attributed.
    #[tracing::instrument(skip(self), fields(team_member_id = %id))]
    pub async fn delete_team_member(&self, id: Uuid) -> Result<TeamMemberRemoval, AppError> {
        self.get_team_member(id).await?;

        let email_count = self.store.count_team_member_emails(id).await?;
        if email_count > 0 {
            let deactivate = UpdateTeamMemberRequest {
                is_active: Some(false),
                ..Default::default()
            };
            self.store
                .update_team_member(id, &deactivate)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Team member {} not found", id)))?;
            tracing::info!(email_count, "Team member has emails, deactivated instead of deleted");
            return Ok(TeamMemberRemoval::Deactivated);
        }

        if !self.store.delete_team_member(id).await? {
            return Err(AppError::NotFound(format!("Team member {} not found", id)));
        }

        tracing::info!("Team member deleted");
        Ok(TeamMemberRemoval::Deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slawatch_core::models::NewEmail;
    use slawatch_db::MemoryStore;

    fn service() -> (DirectoryService, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (DirectoryService::new(store.clone()), store)
    }

    fn department(name: &str, hours: f64) -> CreateDepartmentRequest {
        CreateDepartmentRequest {
            name: name.to_string(),
            sla_threshold_hours: hours,
        }
    }

    fn member(email: &str, department_id: Uuid) -> CreateTeamMemberRequest {
        CreateTeamMemberRequest {
            name: "Dana".to_string(),
            email: email.to_string(),
            app_password: None,
            department_id,
        }
    }

    #[tokio::test]
    async fn rejects_non_positive_threshold() {
        let (svc, _) = service();
        let err = svc.create_department(department("Sales", 0.0)).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));

        let dept = svc.create_department(department("Sales", 4.0)).await.unwrap();
        let err = svc
            .update_department(
                dept.id,
                UpdateDepartmentRequest {
                    name: None,
                    sla_threshold_hours: Some(-1.0),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn duplicate_department_name_conflicts() {
        let (svc, _) = service();
        svc.create_department(department("Billing", 4.0)).await.unwrap();
        let err = svc.create_department(department("Billing", 8.0)).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn department_with_members_cannot_be_deleted() {
        let (svc, _) = service();
        let dept = svc.create_department(department("Support", 4.0)).await.unwrap();
        svc.create_team_member(member("dana@support.test", dept.id)).await.unwrap();

        let err = svc.delete_department(dept.id).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn member_address_is_normalized_and_unique() {
        let (svc, _) = service();
        let dept = svc.create_department(department("Support", 4.0)).await.unwrap();

        let created = svc
            .create_team_member(member("Dana@Support.TEST", dept.id))
            .await
            .unwrap();
        assert_eq!(created.email, "dana@support.test");

        let err = svc
            .create_team_member(member("dana@support.test", dept.id))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn member_in_unknown_department_is_not_found() {
        let (svc, _) = service();
        let err = svc
            .create_team_member(member("dana@support.test", Uuid::new_v4()))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn member_with_history_is_deactivated() {
        let (svc, store) = service();
        let dept = svc.create_department(department("Support", 4.0)).await.unwrap();
        let quiet = svc.create_team_member(member("quiet@support.test", dept.id)).await.unwrap();
        let busy = svc.create_team_member(member("busy@support.test", dept.id)).await.unwrap();

        store
            .insert_email(NewEmail {
                sender: "client@example.com".to_string(),
                recipient: busy.email.clone(),
                subject: "Hi".to_string(),
                body: String::new(),
                team_member_id: Some(busy.id),
                department_id: Some(dept.id),
                received_at: chrono::Utc::now(),
                is_client_email: true,
            })
            .await
            .unwrap();

        assert_eq!(svc.delete_team_member(quiet.id).await.unwrap(), TeamMemberRemoval::Deleted);
        assert_eq!(svc.delete_team_member(busy.id).await.unwrap(), TeamMemberRemoval::Deactivated);

        let busy = svc.get_team_member(busy.id).await.unwrap();
        assert!(!busy.is_active);
        assert!(matches!(
            svc.get_team_member(quiet.id).await.unwrap_err(),
            AppError::NotFound(_)
        ));
    }
}
