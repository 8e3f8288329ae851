//! Team member administration handlers
//!
//! Responses never include the mailbox credential; they only say whether one
//! is configured.

use crate::error::{ErrorResponse, HttpAppError, ValidatedJson, ValidatedQuery};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Serialize;
use slawatch_core::models::{
    CreateTeamMemberRequest, TeamMemberFilter, TeamMemberRemoval, TeamMemberResponse,
    UpdateTeamMemberRequest,
};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Serialize, ToSchema)]
pub struct TeamMemberRemovalResponse {
    pub team_member_id: Uuid,
    pub outcome: TeamMemberRemoval,
}

#[utoipa::path(
    post,
    path = "/api/team-members",
    tag = "team-members",
    request_body = CreateTeamMemberRequest,
    responses(
        (status = 201, description = "Team member created", body = TeamMemberResponse),
        (status = 404, description = "Department not found", body = ErrorResponse),
        (status = 409, description = "Email address already in use", body = ErrorResponse)
    )
)]
pub async fn create_team_member(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<CreateTeamMemberRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let member = state.directory.create_team_member(request).await?;
    Ok((StatusCode::CREATED, Json(TeamMemberResponse::from(member))))
}

#[utoipa::path(
    get,
    path = "/api/team-members",
    tag = "team-members",
    params(
        ("department_id" = Option<Uuid>, Query, description = "Only members of this department"),
        ("is_active" = Option<bool>, Query, description = "Filter on active state")
    ),
    responses(
        (status = 200, description = "Matching team members", body = Vec<TeamMemberResponse>)
    )
)]
pub async fn list_team_members(
    State(state): State<Arc<AppState>>,
    ValidatedQuery(filter): ValidatedQuery<TeamMemberFilter>,
) -> Result<impl IntoResponse, HttpAppError> {
    let members = state.directory.list_team_members(&filter).await?;
    let response: Vec<TeamMemberResponse> =
        members.into_iter().map(TeamMemberResponse::from).collect();
    Ok(Json(response))
}

#[utoipa::path(
    get,
    path = "/api/team-members/{id}",
    tag = "team-members",
    params(("id" = Uuid, Path, description = "Team member ID")),
    responses(
        (status = 200, description = "Team member found", body = TeamMemberResponse),
        (status = 404, description = "Team member not found", body = ErrorResponse)
    )
)]
pub async fn get_team_member(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let member = state.directory.get_team_member(id).await?;
    Ok(Json(TeamMemberResponse::from(member)))
}

#[utoipa::path(
    put,
    path = "/api/team-members/{id}",
    tag = "team-members",
    params(("id" = Uuid, Path, description = "Team member ID")),
    request_body = UpdateTeamMemberRequest,
    responses(
        (status = 200, description = "Team member updated", body = TeamMemberResponse),
        (status = 404, description = "Team member or department not found", body = ErrorResponse),
        (status = 409, description = "Email address already in use", body = ErrorResponse)
    )
)]
pub async fn update_team_member(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<UpdateTeamMemberRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let member = state.directory.update_team_member(id, request).await?;
    Ok(Json(TeamMemberResponse::from(member)))
}

/// Deletes the member, or deactivates them when they own email history
#[utoipa::path(
    delete,
    path = "/api/team-members/{id}",
    tag = "team-members",
    params(("id" = Uuid, Path, description = "Team member ID")),
    responses(
        (status = 200, description = "Member deleted or deactivated", body = TeamMemberRemovalResponse),
        (status = 404, description = "Team member not found", body = ErrorResponse)
    )
)]
pub async fn delete_team_member(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let outcome = state.directory.delete_team_member(id).await?;
    Ok(Json(TeamMemberRemovalResponse {
        team_member_id: id,
        outcome,
    }))
}
