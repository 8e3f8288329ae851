//! Database administration

use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Serialize;
use slawatch_services::SeedSummary;
use std::sync::Arc;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct SampleDataResponse {
    pub success: bool,
    pub message: String,
    pub data: SeedSummary,
}

/// Seed demo departments, team members and a month of email history.
/// Existing departments and members are reused; emails are always added.
#[utoipa::path(
    post,
    path = "/api/admin/init-sample-data",
    tag = "admin",
    responses(
        (status = 201, description = "Sample data created", body = SampleDataResponse),
        (status = 401, description = "Missing or invalid admin secret", body = ErrorResponse)
    )
)]
pub async fn init_sample_data(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpAppError> {
    let summary = state.seeder.seed().await?;
    Ok((
        StatusCode::CREATED,
        Json(SampleDataResponse {
            success: true,
            message: "Sample data initialized successfully".to_string(),
            data: summary,
        }),
    ))
}
