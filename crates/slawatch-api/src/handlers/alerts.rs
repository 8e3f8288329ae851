//! Breach listing and alert handlers

use crate::error::{ErrorResponse, HttpAppError, ValidatedJson, ValidatedQuery};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use slawatch_core::models::{Alert, BreachReport, SendAlertRequest};
use slawatch_services::ScanOutcome;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

fn default_true() -> bool {
    true
}

fn default_alert_limit() -> i64 {
    100
}

#[derive(Debug, Deserialize)]
pub struct BreachQuery {
    #[serde(default = "default_true")]
    pub include_pending: bool,
}

#[derive(Debug, Deserialize)]
pub struct AlertListQuery {
    #[serde(default = "default_alert_limit")]
    pub limit: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BreachListResponse {
    pub sla_breaches: Vec<BreachReport>,
    pub total_count: usize,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SendAlertResponse {
    pub status: String,
    pub message: String,
}

#[utoipa::path(
    get,
    path = "/api/sla/breaches",
    tag = "alerts",
    params(("include_pending" = Option<bool>, Query, description = "Also list unreplied emails past their threshold (default true)")),
    responses(
        (status = 200, description = "Confirmed breaches, then pending ones", body = BreachListResponse)
    )
)]
pub async fn list_breaches(
    State(state): State<Arc<AppState>>,
    ValidatedQuery(query): ValidatedQuery<BreachQuery>,
) -> Result<impl IntoResponse, HttpAppError> {
    let breaches = state.scanner.list_breaches(query.include_pending).await?;
    Ok(Json(BreachListResponse {
        total_count: breaches.len(),
        sla_breaches: breaches,
    }))
}

/// Raise one alert per newly breached email and mail the alert recipient.
#[utoipa::path(
    post,
    path = "/api/alerts/check-sla",
    tag = "alerts",
    responses(
        (status = 200, description = "Alerts raised by this scan", body = ScanOutcome),
        (status = 503, description = "Store unavailable; nothing was recorded", body = ErrorResponse)
    )
)]
pub async fn check_sla(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpAppError> {
    Ok(Json(state.scanner.run_scan_and_alert().await?))
}

#[utoipa::path(
    post,
    path = "/api/alerts/send",
    tag = "alerts",
    request_body = SendAlertRequest,
    responses(
        (status = 200, description = "Alert sent", body = SendAlertResponse),
        (status = 502, description = "Mail server rejected the message or mail is not configured", body = ErrorResponse)
    )
)]
pub async fn send_alert(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<SendAlertRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    state.scanner.send_custom_alert(request).await?;
    Ok(Json(SendAlertResponse {
        status: "success".to_string(),
        message: "Alert sent successfully".to_string(),
    }))
}

#[utoipa::path(
    get,
    path = "/api/alerts",
    tag = "alerts",
    params(("limit" = Option<i64>, Query, description = "Maximum results (default 100, max 1000)")),
    responses(
        (status = 200, description = "Alert log, newest first", body = Vec<Alert>)
    )
)]
pub async fn list_alerts(
    State(state): State<Arc<AppState>>,
    ValidatedQuery(query): ValidatedQuery<AlertListQuery>,
) -> Result<impl IntoResponse, HttpAppError> {
    Ok(Json(state.scanner.list_alerts(query.limit).await?))
}

#[utoipa::path(
    post,
    path = "/api/alerts/{id}/acknowledge",
    tag = "alerts",
    params(("id" = Uuid, Path, description = "Alert ID")),
    responses(
        (status = 200, description = "Alert acknowledged (first acknowledgement time is kept)", body = Alert),
        (status = 404, description = "Alert not found", body = ErrorResponse)
    )
)]
pub async fn acknowledge_alert(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    Ok(Json(state.scanner.acknowledge_alert(id).await?))
}
