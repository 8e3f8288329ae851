//! SLA metrics handlers

use crate::error::{ErrorResponse, HttpAppError, ValidatedQuery};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    response::{IntoResponse, Json},
};
use serde::Deserialize;
use slawatch_core::models::{DepartmentMetrics, TeamMemberMetrics};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Default, Deserialize)]
pub struct DepartmentMetricsQuery {
    #[serde(default)]
    pub department_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TeamMemberMetricsQuery {
    #[serde(default)]
    pub team_member_id: Option<Uuid>,
}

#[utoipa::path(
    get,
    path = "/api/metrics/departments",
    tag = "metrics",
    params(("department_id" = Option<Uuid>, Query, description = "Restrict to one department")),
    responses(
        (status = 200, description = "Per-department metrics", body = Vec<DepartmentMetrics>)
    )
)]
pub async fn list_department_metrics(
    State(state): State<Arc<AppState>>,
    ValidatedQuery(query): ValidatedQuery<DepartmentMetricsQuery>,
) -> Result<impl IntoResponse, HttpAppError> {
    Ok(Json(
        state.metrics.department_metrics(query.department_id).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/metrics/team-members",
    tag = "metrics",
    params(("team_member_id" = Option<Uuid>, Query, description = "Restrict to one member")),
    responses(
        (status = 200, description = "Per-member metrics (active members unless an id is given)", body = Vec<TeamMemberMetrics>)
    )
)]
pub async fn list_team_member_metrics(
    State(state): State<Arc<AppState>>,
    ValidatedQuery(query): ValidatedQuery<TeamMemberMetricsQuery>,
) -> Result<impl IntoResponse, HttpAppError> {
    Ok(Json(
        state
            .metrics
            .team_member_metrics(query.team_member_id)
            .await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/departments/{id}/metrics",
    tag = "metrics",
    params(("id" = Uuid, Path, description = "Department ID")),
    responses(
        (status = 200, description = "Department metrics", body = DepartmentMetrics),
        (status = 404, description = "Department not found", body = ErrorResponse)
    )
)]
pub async fn get_department_metrics(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    Ok(Json(state.metrics.single_department_metrics(id).await?))
}

#[utoipa::path(
    get,
    path = "/api/team-members/{id}/metrics",
    tag = "metrics",
    params(("id" = Uuid, Path, description = "Team member ID")),
    responses(
        (status = 200, description = "Team member metrics", body = TeamMemberMetrics),
        (status = 404, description = "Team member not found", body = ErrorResponse)
    )
)]
pub async fn get_team_member_metrics(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    Ok(Json(state.metrics.single_team_member_metrics(id).await?))
}
