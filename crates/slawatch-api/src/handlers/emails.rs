//! Email tracking handlers: direct reporting, reply marking and listing

use crate::error::{ErrorResponse, HttpAppError, ValidatedJson, ValidatedQuery};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use slawatch_core::models::{Email, EmailFilter, MarkRepliedRequest, RecordEmailRequest};
use std::sync::Arc;
use uuid::Uuid;

#[utoipa::path(
    post,
    path = "/api/emails/receive",
    tag = "emails",
    request_body = RecordEmailRequest,
    responses(
        (status = 201, description = "Email recorded", body = Email),
        (status = 400, description = "Invalid addresses", body = ErrorResponse),
        (status = 404, description = "Team member not found", body = ErrorResponse)
    )
)]
pub async fn receive_email(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<RecordEmailRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let email = state.tracker.record_email(request).await?;
    Ok((StatusCode::CREATED, Json(email)))
}

/// Marking an already replied email again returns it unchanged.
#[utoipa::path(
    post,
    path = "/api/emails/reply",
    tag = "emails",
    request_body = MarkRepliedRequest,
    responses(
        (status = 200, description = "Email with its reply outcome", body = Email),
        (status = 404, description = "Email not found", body = ErrorResponse)
    )
)]
pub async fn mark_replied(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<MarkRepliedRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    Ok(Json(state.tracker.mark_replied(request.email_id).await?))
}

#[utoipa::path(
    get,
    path = "/api/emails",
    tag = "emails",
    params(
        ("team_member_id" = Option<Uuid>, Query, description = "Only this member's emails"),
        ("department_id" = Option<Uuid>, Query, description = "Only this department's emails"),
        ("is_replied" = Option<bool>, Query, description = "Filter on reply state"),
        ("limit" = Option<i64>, Query, description = "Maximum results (default 100, max 1000)")
    ),
    responses(
        (status = 200, description = "Emails, newest first", body = Vec<Email>)
    )
)]
pub async fn list_emails(
    State(state): State<Arc<AppState>>,
    ValidatedQuery(filter): ValidatedQuery<EmailFilter>,
) -> Result<impl IntoResponse, HttpAppError> {
    Ok(Json(state.tracker.list_emails(&filter).await?))
}

#[utoipa::path(
    get,
    path = "/api/emails/{id}",
    tag = "emails",
    params(("id" = Uuid, Path, description = "Email ID")),
    responses(
        (status = 200, description = "Email found", body = Email),
        (status = 404, description = "Email not found", body = ErrorResponse)
    )
)]
pub async fn get_email(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    Ok(Json(state.tracker.get_email(id).await?))
}
