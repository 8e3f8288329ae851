//! Metrics queries over the store.

use std::sync::Arc;

use slawatch_core::{
    metrics::{aggregate_by_department, aggregate_by_team_member},
    models::{DepartmentMetrics, TeamMemberFilter, TeamMemberMetrics},
    AppError,
};
use slawatch_db::SlaStore;
use uuid::Uuid;

#[derive(Clone)]
pub struct MetricsService {
    store: Arc<dyn SlaStore>,
}

impl MetricsService {
    pub fn new(store: Arc<dyn SlaStore>) -> Self {
        Self { store }
    }

    /// All departments, or only the given one. An unknown id yields an empty list.
    #[tracing::instrument(skip(self))]
    pub async fn department_metrics(
        &self,
        department_id: Option<Uuid>,
    ) -> Result<Vec<DepartmentMetrics>, AppError> {
        let departments = match department_id {
            Some(id) => self.store.get_department(id).await?.into_iter().collect(),
            None => self.store.list_departments().await?,
        };
        if departments.is_empty() {
            return Ok(Vec::new());
        }

        let facts = self.store.email_facts(department_id, None).await?;
        Ok(aggregate_by_department(&departments, &facts))
    }

    /// Active members by default. An explicit id may target an inactive member.
    #[tracing::instrument(skip(self))]
    pub async fn team_member_metrics(
        &self,
        team_member_id: Option<Uuid>,
    ) -> Result<Vec<TeamMemberMetrics>, AppError> {
        let members = match team_member_id {
            Some(id) => self.store.get_team_member(id).await?.into_iter().collect(),
            None => self.store.list_team_members(&TeamMemberFilter::active()).await?,
        };
        if members.is_empty() {
            return Ok(Vec::new());
        }

        let departments = self.store.list_departments().await?;
        let facts = self.store.email_facts(None, team_member_id).await?;
        Ok(aggregate_by_team_member(&members, &departments, &facts))
    }

    pub async fn single_department_metrics(&self, id: Uuid) -> Result<DepartmentMetrics, AppError> {
        self.department_metrics(Some(id))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::NotFound(format!("Department {} not found", id)))
    }

    pub async fn single_team_member_metrics(
        &self,
        id: Uuid,
    ) -> Result<TeamMemberMetrics, AppError> {
        self.team_member_metrics(Some(id))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::NotFound(format!("Team member {} not found", id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use slawatch_core::{
        models::{CreateTeamMemberRequest, RecordEmailRequest, UpdateTeamMemberRequest},
        ManualClock,
    };
    use slawatch_db::MemoryStore;

    use crate::EmailTracker;

    fn email_for(member_id: Uuid, subject: &str) -> RecordEmailRequest {
        RecordEmailRequest {
            sender: "client@example.com".to_string(),
            recipient: "agent@support.test".to_string(),
            subject: subject.to_string(),
            body: String::new(),
            team_member_id: Some(member_id),
            is_client_email: true,
        }
    }

    #[tokio::test]
    async fn compliance_reflects_confirmed_breaches() {
        let store = Arc::new(MemoryStore::new());
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap());
        let tracker = EmailTracker::new(store.clone(), Arc::new(clock.clone()), 4.0);
        let metrics = MetricsService::new(store.clone());

        let dept = store.create_department("Support", 4.0).await.unwrap();
        let empty = store.create_department("Legal", 4.0).await.unwrap();
        let member = store
            .create_team_member(&CreateTeamMemberRequest {
                name: "Agent".to_string(),
                email: "agent@support.test".to_string(),
                app_password: None,
                department_id: dept.id,
            })
            .await
            .unwrap();

        let fast = tracker.record_email(email_for(member.id, "fast")).await.unwrap();
        let slow = tracker.record_email(email_for(member.id, "slow")).await.unwrap();
        tracker.record_email(email_for(member.id, "open")).await.unwrap();

        clock.advance(Duration::hours(2));
        tracker.mark_replied(fast.id).await.unwrap();
        clock.advance(Duration::hours(4));
        tracker.mark_replied(slow.id).await.unwrap();

        let rows = metrics.department_metrics(None).await.unwrap();
        let support = rows.iter().find(|r| r.department_id == dept.id).unwrap();
        assert_eq!(support.metrics.total_emails, 3);
        assert_eq!(support.metrics.replied_emails, 2);
        assert_eq!(support.metrics.pending_emails, 1);
        assert_eq!(support.metrics.sla_breaches, 1);
        assert_eq!(support.metrics.avg_response_time_hours, Some(4.0));
        assert!((support.metrics.sla_compliance_rate - 200.0 / 3.0).abs() < 1e-9);

        let legal = rows.iter().find(|r| r.department_id == empty.id).unwrap();
        assert_eq!(legal.metrics.total_emails, 0);
        assert_eq!(legal.metrics.sla_compliance_rate, 100.0);
    }

    #[tokio::test]
    async fn inactive_members_only_reported_on_request() {
        let store = Arc::new(MemoryStore::new());
        let metrics = MetricsService::new(store.clone());
        let dept = store.create_department("Support", 4.0).await.unwrap();
        let member = store
            .create_team_member(&CreateTeamMemberRequest {
                name: "Former".to_string(),
                email: "former@support.test".to_string(),
                app_password: None,
                department_id: dept.id,
            })
            .await
            .unwrap();
        store
            .update_team_member(
                member.id,
                &UpdateTeamMemberRequest {
                    is_active: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert!(metrics.team_member_metrics(None).await.unwrap().is_empty());

        let single = metrics.single_team_member_metrics(member.id).await.unwrap();
        assert!(!single.is_active);
        assert_eq!(single.department_name.as_deref(), Some("Support"));
    }

    #[tokio::test]
    async fn unknown_department_metrics_is_not_found() {
        let metrics = MetricsService::new(Arc::new(MemoryStore::new()));
        let err = metrics
            .single_department_metrics(Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
