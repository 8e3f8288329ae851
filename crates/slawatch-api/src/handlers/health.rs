//! Health, status and admin statistics

use crate::constants::{APP_NAME, APP_VERSION};
use crate::error::HttpAppError;
use crate::state::AppState;
use axum::{
    extract::State,
    response::{IntoResponse, Json},
};
use serde::Serialize;
use slawatch_core::models::StoreCounts;
use std::sync::Arc;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct AutoSyncSummary {
    pub running: bool,
    pub interval_minutes: u64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub app: String,
    pub version: String,
    pub database: String,
    pub auto_sync: AutoSyncSummary,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FeatureFlags {
    pub email_monitoring: bool,
    pub sla_tracking: bool,
    pub auto_sync: bool,
    pub alerts: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StatusResponse {
    pub name: String,
    pub version: String,
    pub environment: String,
    pub features: FeatureFlags,
    pub auto_sync: AutoSyncSummary,
    pub auto_sync_enabled_in_settings: bool,
    pub default_sla_threshold_hours: f64,
}

/// Reports the store as reachable only if a count query succeeds.
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses((status = 200, description = "Service health", body = HealthResponse))
)]
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let database = match state.store.counts().await {
        Ok(_) => "connected",
        Err(e) => {
            tracing::warn!(error = %e, "Health check could not reach the store");
            "unavailable"
        }
    };
    let scheduler = state.scheduler.status();

    Json(HealthResponse {
        status: if database == "connected" {
            "healthy".to_string()
        } else {
            "degraded".to_string()
        },
        app: APP_NAME.to_string(),
        version: APP_VERSION.to_string(),
        database: database.to_string(),
        auto_sync: AutoSyncSummary {
            running: scheduler.is_running,
            interval_minutes: scheduler.interval_minutes,
        },
    })
}

#[utoipa::path(
    get,
    path = "/status",
    tag = "health",
    responses((status = 200, description = "Feature and scheduler status", body = StatusResponse))
)]
pub async fn system_status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let scheduler = state.scheduler.status();

    Json(StatusResponse {
        name: APP_NAME.to_string(),
        version: APP_VERSION.to_string(),
        environment: state.config.environment.clone(),
        features: FeatureFlags {
            email_monitoring: true,
            sla_tracking: true,
            auto_sync: scheduler.is_running,
            alerts: state.scanner.alerts_enabled(),
        },
        auto_sync: AutoSyncSummary {
            running: scheduler.is_running,
            interval_minutes: scheduler.interval_minutes,
        },
        auto_sync_enabled_in_settings: state.config.enable_auto_sync,
        default_sla_threshold_hours: state.config.default_sla_threshold_hours,
    })
}

#[utoipa::path(
    get,
    path = "/api/admin/database-stats",
    tag = "health",
    responses((status = 200, description = "Row counts per entity", body = StoreCounts))
)]
pub async fn database_stats(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpAppError> {
    Ok(Json(state.store.counts().await?))
}
