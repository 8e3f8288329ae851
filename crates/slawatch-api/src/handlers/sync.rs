//! Mailbox sync and auto-sync control handlers

use crate::error::{ErrorResponse, HttpAppError, ValidatedJson, ValidatedQuery};
use crate::state::AppState;
use axum::{
    extract::State,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use slawatch_services::{IntervalUpdate, StartOutcome, StopOutcome, SyncReport};
use std::sync::Arc;
use utoipa::ToSchema;

#[derive(Debug, Deserialize)]
pub struct SyncQuery {
    /// Unread messages fetched per mailbox; defaults to `SYNC_BATCH_LIMIT`
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateIntervalRequest {
    pub interval_minutes: u64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AutoSyncStartResponse {
    pub status: StartOutcome,
    pub message: String,
    pub interval_minutes: u64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AutoSyncStopResponse {
    pub status: StopOutcome,
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AutoSyncStatusResponse {
    pub is_running: bool,
    pub interval_minutes: u64,
    pub interval_seconds: u64,
    pub next_sync_in_seconds: Option<u64>,
    /// `ENABLE_AUTO_SYNC` at boot
    pub enabled_in_settings: bool,
}

#[utoipa::path(
    post,
    path = "/api/emails/sync",
    tag = "sync",
    params(("limit" = Option<usize>, Query, description = "Unread messages fetched per mailbox")),
    responses(
        (status = 200, description = "Per-member sync results; mailbox failures are listed, not raised", body = SyncReport),
        (status = 503, description = "Could not list team members", body = ErrorResponse)
    )
)]
pub async fn sync_mailboxes(
    State(state): State<Arc<AppState>>,
    ValidatedQuery(query): ValidatedQuery<SyncQuery>,
) -> Result<impl IntoResponse, HttpAppError> {
    Ok(Json(state.sync.sync_all_mailboxes(query.limit).await?))
}

#[utoipa::path(
    post,
    path = "/api/auto-sync/start",
    tag = "sync",
    responses(
        (status = 200, description = "Started, or already running", body = AutoSyncStartResponse)
    )
)]
pub async fn start_auto_sync(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpAppError> {
    let status = state.scheduler.start();
    let message = match status {
        StartOutcome::Started => "Auto-sync started",
        StartOutcome::AlreadyRunning => "Auto-sync is already running",
    };
    Ok(Json(AutoSyncStartResponse {
        status,
        message: message.to_string(),
        interval_minutes: state.scheduler.status().interval_minutes,
    }))
}

#[utoipa::path(
    post,
    path = "/api/auto-sync/stop",
    tag = "sync",
    responses(
        (status = 200, description = "Stopped, or was not running", body = AutoSyncStopResponse)
    )
)]
pub async fn stop_auto_sync(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpAppError> {
    let status = state.scheduler.stop();
    let message = match status {
        StopOutcome::Stopped => "Auto-sync stopped",
        StopOutcome::NotRunning => "Auto-sync is not running",
    };
    Ok(Json(AutoSyncStopResponse {
        status,
        message: message.to_string(),
    }))
}

#[utoipa::path(
    get,
    path = "/api/auto-sync/status",
    tag = "sync",
    responses(
        (status = 200, description = "Scheduler state", body = AutoSyncStatusResponse)
    )
)]
pub async fn auto_sync_status(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpAppError> {
    let status = state.scheduler.status();
    Ok(Json(AutoSyncStatusResponse {
        is_running: status.is_running,
        interval_minutes: status.interval_minutes,
        interval_seconds: status.interval_seconds,
        next_sync_in_seconds: status.next_sync_in_seconds,
        enabled_in_settings: state.config.enable_auto_sync,
    }))
}

#[utoipa::path(
    put,
    path = "/api/auto-sync/interval",
    tag = "sync",
    request_body = UpdateIntervalRequest,
    responses(
        (status = 200, description = "Interval updated; a running loop was restarted", body = IntervalUpdate),
        (status = 400, description = "Interval outside 1 minute to 1 week", body = ErrorResponse)
    )
)]
pub async fn update_auto_sync_interval(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<UpdateIntervalRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    Ok(Json(
        state.scheduler.update_interval(request.interval_minutes)?,
    ))
}
