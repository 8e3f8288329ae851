//! Route configuration and setup

use crate::auth::{admin_auth_middleware, AdminAuthState};
use crate::constants::API_PREFIX;
use crate::handlers;
use crate::state::AppState;
use axum::{
    http::{HeaderValue, Method},
    routing::{get, post, put},
    Json, Router,
};
use slawatch_core::Config;
use std::sync::Arc;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

// Requests are small JSON documents; email bodies are truncated well below this
const MAX_REQUEST_BODY_BYTES: usize = 1024 * 1024;

fn api(path: &str) -> String {
    format!("{}{}", API_PREFIX, path)
}

/// Setup all application routes
pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Result<Router<()>, anyhow::Error> {
    let cors = setup_cors(config)?;
    let auth_state = setup_admin_auth(config);

    // Mutating /api routes are checked by the admin secret middleware
    let api_routes = Router::new()
        .merge(department_routes())
        .merge(team_member_routes())
        .merge(email_routes())
        .merge(metrics_routes())
        .merge(alert_routes())
        .merge(sync_routes())
        .route(
            &api("/admin/database-stats"),
            get(handlers::health::database_stats),
        )
        .route(
            &api("/admin/init-sample-data"),
            post(handlers::admin::init_sample_data),
        )
        .layer(axum::middleware::from_fn_with_state(
            Arc::new(auth_state),
            admin_auth_middleware,
        ));

    let app = Router::new()
        .merge(public_routes())
        .merge(api_routes)
        .layer(ConcurrencyLimitLayer::new(config.http_concurrency_limit))
        .layer(RequestBodyLimitLayer::new(MAX_REQUEST_BODY_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    Ok(app)
}

/// Setup CORS configuration
fn setup_cors(config: &Config) -> Result<CorsLayer, anyhow::Error> {
    let methods = [
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::DELETE,
        Method::OPTIONS,
    ];

    let cors = if config.cors_origins.iter().any(|o| o == "*") {
        tracing::warn!("CORS configured to allow all origins - not recommended for production");
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(Any)
    } else {
        let origins = config
            .cors_origins
            .iter()
            .map(|o| o.parse::<HeaderValue>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| anyhow::anyhow!("Invalid CORS origin: {}", e))?;

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers(Any)
    };
    Ok(cors)
}

fn setup_admin_auth(config: &Config) -> AdminAuthState {
    if config.admin_secret.is_none() {
        tracing::warn!("ADMIN_SECRET not set - mutating routes are unauthenticated");
    }
    AdminAuthState {
        admin_secret: config.admin_secret.clone(),
    }
}

/// Public routes (no authentication required)
fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/status", get(handlers::health::system_status))
        .route(
            &api("/openapi.json"),
            get(|| async { Json(crate::api_doc::get_openapi_spec()) }),
        )
}

fn department_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            &api("/departments"),
            post(handlers::departments::create_department)
                .get(handlers::departments::list_departments),
        )
        .route(
            &api("/departments/{id}"),
            get(handlers::departments::get_department)
                .put(handlers::departments::update_department)
                .delete(handlers::departments::delete_department),
        )
        .route(
            &api("/departments/{id}/metrics"),
            get(handlers::metrics::get_department_metrics),
        )
}

fn team_member_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            &api("/team-members"),
            post(handlers::team_members::create_team_member)
                .get(handlers::team_members::list_team_members),
        )
        .route(
            &api("/team-members/{id}"),
            get(handlers::team_members::get_team_member)
                .put(handlers::team_members::update_team_member)
                .delete(handlers::team_members::delete_team_member),
        )
        .route(
            &api("/team-members/{id}/metrics"),
            get(handlers::metrics::get_team_member_metrics),
        )
}

fn email_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(&api("/emails"), get(handlers::emails::list_emails))
        .route(&api("/emails/receive"), post(handlers::emails::receive_email))
        .route(&api("/emails/reply"), post(handlers::emails::mark_replied))
        .route(&api("/emails/sync"), post(handlers::sync::sync_mailboxes))
        .route(&api("/emails/{id}"), get(handlers::emails::get_email))
}

fn metrics_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            &api("/metrics/departments"),
            get(handlers::metrics::list_department_metrics),
        )
        .route(
            &api("/metrics/team-members"),
            get(handlers::metrics::list_team_member_metrics),
        )
}

fn alert_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(&api("/sla/breaches"), get(handlers::alerts::list_breaches))
        .route(&api("/alerts"), get(handlers::alerts::list_alerts))
        .route(&api("/alerts/check-sla"), post(handlers::alerts::check_sla))
        .route(&api("/alerts/send"), post(handlers::alerts::send_alert))
        .route(
            &api("/alerts/{id}/acknowledge"),
            post(handlers::alerts::acknowledge_alert),
        )
}

fn sync_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(&api("/auto-sync/start"), post(handlers::sync::start_auto_sync))
        .route(&api("/auto-sync/stop"), post(handlers::sync::stop_auto_sync))
        .route(&api("/auto-sync/status"), get(handlers::sync::auto_sync_status))
        .route(
            &api("/auto-sync/interval"),
            put(handlers::sync::update_auto_sync_interval),
        )
}
