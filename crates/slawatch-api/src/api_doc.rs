//! OpenAPI documentation, served at `/api/openapi.json`.

use utoipa::OpenApi;

use crate::error;
use crate::handlers;
use slawatch_core::models;
use slawatch_services::{
    IntervalUpdate, MemberSyncResult, ScanOutcome, SchedulerStatus, SeedSummary, StartOutcome,
    StopOutcome, SyncReport,
};

pub fn get_openapi_spec() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Slawatch API",
        version = "0.1.0",
        description = "Support email SLA monitoring: tracks inbound emails per team member and department, measures reply times against department thresholds, reports breaches and raises alerts. Mutating routes require the X-Admin-Secret header."
    ),
    paths(
        // Departments
        handlers::departments::create_department,
        handlers::departments::list_departments,
        handlers::departments::get_department,
        handlers::departments::update_department,
        handlers::departments::delete_department,
        // Team members
        handlers::team_members::create_team_member,
        handlers::team_members::list_team_members,
        handlers::team_members::get_team_member,
        handlers::team_members::update_team_member,
        handlers::team_members::delete_team_member,
        // Emails
        handlers::emails::receive_email,
        handlers::emails::mark_replied,
        handlers::emails::list_emails,
        handlers::emails::get_email,
        // Metrics
        handlers::metrics::list_department_metrics,
        handlers::metrics::list_team_member_metrics,
        handlers::metrics::get_department_metrics,
        handlers::metrics::get_team_member_metrics,
        // Breaches and alerts
        handlers::alerts::list_breaches,
        handlers::alerts::check_sla,
        handlers::alerts::send_alert,
        handlers::alerts::list_alerts,
        handlers::alerts::acknowledge_alert,
        // Sync
        handlers::sync::sync_mailboxes,
        handlers::sync::start_auto_sync,
        handlers::sync::stop_auto_sync,
        handlers::sync::auto_sync_status,
        handlers::sync::update_auto_sync_interval,
        // Health
        handlers::health::health_check,
        handlers::health::system_status,
        handlers::health::database_stats,
        handlers::admin::init_sample_data,
    ),
    components(
        schemas(
            error::ErrorResponse,
            models::Department,
            models::CreateDepartmentRequest,
            models::UpdateDepartmentRequest,
            models::TeamMemberResponse,
            models::CreateTeamMemberRequest,
            models::UpdateTeamMemberRequest,
            models::TeamMemberRemoval,
            models::Email,
            models::RecordEmailRequest,
            models::MarkRepliedRequest,
            models::GroupMetrics,
            models::DepartmentMetrics,
            models::TeamMemberMetrics,
            models::BreachReport,
            models::BreachStatus,
            models::Alert,
            models::AlertType,
            models::SendAlertRequest,
            models::StoreCounts,
            ScanOutcome,
            SyncReport,
            MemberSyncResult,
            SchedulerStatus,
            StartOutcome,
            StopOutcome,
            IntervalUpdate,
            handlers::team_members::TeamMemberRemovalResponse,
            handlers::alerts::BreachListResponse,
            handlers::alerts::SendAlertResponse,
            handlers::sync::UpdateIntervalRequest,
            handlers::sync::AutoSyncStartResponse,
            handlers::sync::AutoSyncStopResponse,
            handlers::sync::AutoSyncStatusResponse,
            handlers::health::HealthResponse,
            handlers::health::StatusResponse,
            handlers::admin::SampleDataResponse,
            SeedSummary,
        )
    ),
    tags(
        (name = "departments", description = "Departments and their SLA thresholds"),
        (name = "team-members", description = "Monitored mailboxes"),
        (name = "emails", description = "Tracked support emails"),
        (name = "metrics", description = "SLA compliance metrics"),
        (name = "alerts", description = "Breach reports and the alert log"),
        (name = "sync", description = "Mailbox sync and the auto-sync scheduler"),
        (name = "health", description = "Health and status"),
        (name = "admin", description = "Database administration")
    )
)]
pub struct ApiDoc;
