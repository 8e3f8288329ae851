//! Department administration handlers

use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use slawatch_core::models::{CreateDepartmentRequest, Department, UpdateDepartmentRequest};
use std::sync::Arc;
use uuid::Uuid;

#[utoipa::path(
    post,
    path = "/api/departments",
    tag = "departments",
    request_body = CreateDepartmentRequest,
    responses(
        (status = 201, description = "Department created", body = Department),
        (status = 400, description = "Invalid name or threshold", body = ErrorResponse),
        (status = 409, description = "Name already in use", body = ErrorResponse)
    )
)]
pub async fn create_department(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<CreateDepartmentRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let department = state.directory.create_department(request).await?;
    Ok((StatusCode::CREATED, Json(department)))
}

#[utoipa::path(
    get,
    path = "/api/departments",
    tag = "departments",
    responses(
        (status = 200, description = "All departments by name", body = Vec<Department>)
    )
)]
pub async fn list_departments(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpAppError> {
    Ok(Json(state.directory.list_departments().await?))
}

#[utoipa::path(
    get,
    path = "/api/departments/{id}",
    tag = "departments",
    params(("id" = Uuid, Path, description = "Department ID")),
    responses(
        (status = 200, description = "Department found", body = Department),
        (status = 404, description = "Department not found", body = ErrorResponse)
    )
)]
pub async fn get_department(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    Ok(Json(state.directory.get_department(id).await?))
}

#[utoipa::path(
    put,
    path = "/api/departments/{id}",
    tag = "departments",
    params(("id" = Uuid, Path, description = "Department ID")),
    request_body = UpdateDepartmentRequest,
    responses(
        (status = 200, description = "Department updated", body = Department),
        (status = 404, description = "Department not found", body = ErrorResponse),
        (status = 409, description = "Name already in use", body = ErrorResponse)
    )
)]
pub async fn update_department(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<UpdateDepartmentRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    Ok(Json(state.directory.update_department(id, request).await?))
}

#[utoipa::path(
    delete,
    path = "/api/departments/{id}",
    tag = "departments",
    params(("id" = Uuid, Path, description = "Department ID")),
    responses(
        (status = 204, description = "Department deleted"),
        (status = 404, description = "Department not found", body = ErrorResponse),
        (status = 409, description = "Department still has team members", body = ErrorResponse)
    )
)]
pub async fn delete_department(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    state.directory.delete_department(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
