//! HTTP API integration tests.
//!
//! Run with: `cargo test -p slawatch-api --test api_test`

mod helpers;

use axum::http::StatusCode;
use helpers::{api_path, setup_test_app, TEST_ADMIN_SECRET};
use serde_json::{json, Value};
use slawatch_api::constants::ADMIN_SECRET_HEADER;
use slawatch_services::FetchedMessage;

#[tokio::test]
async fn test_mutating_routes_require_admin_secret() {
    let app = setup_test_app();
    let client = app.client();

    let missing = client
        .post(&api_path("/departments"))
        .json(&json!({ "name": "Support" }))
        .await;
    assert_eq!(missing.status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(missing.json::<Value>()["code"], "UNAUTHORIZED");

    let wrong = client
        .post(&api_path("/departments"))
        .add_header(ADMIN_SECRET_HEADER, "not-the-secret")
        .json(&json!({ "name": "Support" }))
        .await;
    assert_eq!(wrong.status_code(), StatusCode::UNAUTHORIZED);

    let ok = client
        .post(&api_path("/departments"))
        .add_header(ADMIN_SECRET_HEADER, TEST_ADMIN_SECRET)
        .json(&json!({ "name": "Support" }))
        .await;
    assert_eq!(ok.status_code(), StatusCode::CREATED);

    // Reads stay open
    let list = client.get(&api_path("/departments")).await;
    assert_eq!(list.status_code(), StatusCode::OK);
    assert_eq!(list.json::<Value>().as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn test_department_crud() {
    let app = setup_test_app();

    let id = app.create_department("Billing", 2.0).await;

    let fetched = app.get(&format!("/departments/{}", id)).await;
    assert_eq!(fetched.status_code(), StatusCode::OK);
    assert_eq!(fetched.json::<Value>()["sla_threshold_hours"], 2.0);

    let duplicate = app
        .post("/departments", json!({ "name": "Billing" }))
        .await;
    assert_eq!(duplicate.status_code(), StatusCode::CONFLICT);

    let updated = app
        .put(
            &format!("/departments/{}", id),
            json!({ "sla_threshold_hours": 6.0 }),
        )
        .await;
    assert_eq!(updated.status_code(), StatusCode::OK);
    assert_eq!(updated.json::<Value>()["sla_threshold_hours"], 6.0);

    let bad_threshold = app
        .put(
            &format!("/departments/{}", id),
            json!({ "sla_threshold_hours": 0.0 }),
        )
        .await;
    assert_eq!(bad_threshold.status_code(), StatusCode::BAD_REQUEST);

    let deleted = app.delete(&format!("/departments/{}", id)).await;
    assert_eq!(deleted.status_code(), StatusCode::NO_CONTENT);

    let gone = app.get(&format!("/departments/{}", id)).await;
    assert_eq!(gone.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_department_with_members_cannot_be_deleted() {
    let app = setup_test_app();
    let dept = app.create_department("Support", 4.0).await;
    app.create_team_member(&dept, "agent@support.test", None)
        .await;

    let response = app.delete(&format!("/departments/{}", dept)).await;
    assert_eq!(response.status_code(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_team_member_never_exposes_credential() {
    let app = setup_test_app();
    let dept = app.create_department("Support", 4.0).await;
    let member = app
        .create_team_member(&dept, "Agent@Support.test", Some("app-password"))
        .await;

    let body = app
        .get(&format!("/team-members/{}", member))
        .await
        .json::<Value>();
    assert_eq!(body["email"], "agent@support.test");
    assert_eq!(body["has_mailbox_credential"], true);
    assert!(body.get("app_password").is_none());
}

#[tokio::test]
async fn test_reply_after_threshold_is_a_breach() {
    let app = setup_test_app();
    let dept = app.create_department("Support", 4.0).await;
    let member = app
        .create_team_member(&dept, "agent@support.test", None)
        .await;
    let email_id = app.receive_email(&member, "Invoice question").await;

    app.clock.advance(chrono::Duration::hours(5));

    let replied = app
        .post("/emails/reply", json!({ "email_id": email_id }))
        .await;
    assert_eq!(replied.status_code(), StatusCode::OK);
    let body = replied.json::<Value>();
    assert_eq!(body["is_replied"], true);
    assert_eq!(body["is_sla_breach"], true);
    assert_eq!(body["response_time_hours"], 5.0);
    assert_eq!(body["department_id"], dept.as_str());

    // A second reply changes nothing
    app.clock.advance(chrono::Duration::hours(1));
    let again = app
        .post("/emails/reply", json!({ "email_id": email_id }))
        .await
        .json::<Value>();
    assert_eq!(again["replied_at"], body["replied_at"]);
    assert_eq!(again["response_time_hours"], 5.0);
}

#[tokio::test]
async fn test_reply_to_unknown_email_is_not_found() {
    let app = setup_test_app();
    let response = app
        .post(
            "/emails/reply",
            json!({ "email_id": "7f1c1d1e-0000-4000-8000-000000000000" }),
        )
        .await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let app = setup_test_app();
    let response = app.post("/emails/reply", json!({ "email_id": 42 })).await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["code"], "INVALID_INPUT");
}

#[tokio::test]
async fn test_breach_scan_alerts_once() {
    let app = setup_test_app();
    let dept = app.create_department("Support", 4.0).await;
    let member = app
        .create_team_member(&dept, "agent@support.test", None)
        .await;
    let email_id = app.receive_email(&member, "Refund").await;

    app.clock.advance(chrono::Duration::minutes(270));

    let breaches = app.get("/sla/breaches").await.json::<Value>();
    assert_eq!(breaches["total_count"], 1);
    assert_eq!(breaches["sla_breaches"][0]["status"], "PENDING_BREACH");
    assert_eq!(breaches["sla_breaches"][0]["hours_elapsed"], 4.5);

    let confirmed_only = app
        .client()
        .get(&api_path("/sla/breaches"))
        .add_query_param("include_pending", false)
        .await
        .json::<Value>();
    assert_eq!(confirmed_only["total_count"], 0);

    let scan = app.post("/alerts/check-sla", json!({})).await;
    assert_eq!(scan.status_code(), StatusCode::OK);
    let scan = scan.json::<Value>();
    assert_eq!(scan["alerts_raised"], 1);
    assert_eq!(scan["notifications_sent"], 1);
    assert_eq!(scan["alerts"][0]["email_id"], email_id.as_str());
    assert_eq!(
        scan["alerts"][0]["message"],
        "Email 'Refund' has exceeded SLA by 0.50 hours"
    );

    let sent = app.mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].recipient, "ops@example.com");
    assert_eq!(sent[0].subject, "SLA Breach Alert - Refund");

    let second = app.post("/alerts/check-sla", json!({})).await.json::<Value>();
    assert_eq!(second["alerts_raised"], 0);
    assert_eq!(app.mailer.sent().len(), 1);

    let alerts = app.get("/alerts").await.json::<Value>();
    assert_eq!(alerts.as_array().map(Vec::len), Some(1));
    let alert_id = alerts[0]["id"].as_str().unwrap().to_string();

    let acked = app
        .post(&format!("/alerts/{}/acknowledge", alert_id), json!({}))
        .await;
    assert_eq!(acked.status_code(), StatusCode::OK);
    assert!(acked.json::<Value>()["acknowledged_at"].is_string());
}

#[tokio::test]
async fn test_metrics_reflect_replies() {
    let app = setup_test_app();
    let dept = app.create_department("Support", 4.0).await;
    let member = app
        .create_team_member(&dept, "agent@support.test", None)
        .await;

    let late = app.receive_email(&member, "Late").await;
    app.clock.advance(chrono::Duration::hours(5));
    app.post("/emails/reply", json!({ "email_id": late })).await;

    let quick = app.receive_email(&member, "Quick").await;
    app.clock.advance(chrono::Duration::hours(1));
    app.post("/emails/reply", json!({ "email_id": quick })).await;

    app.receive_email(&member, "Open").await;

    let metrics = app
        .get(&format!("/departments/{}/metrics", dept))
        .await
        .json::<Value>();
    assert_eq!(metrics["total_emails"], 3);
    assert_eq!(metrics["replied_emails"], 2);
    assert_eq!(metrics["pending_emails"], 1);
    assert_eq!(metrics["sla_breaches"], 1);
    assert_eq!(metrics["avg_response_time_hours"], 3.0);
    assert_eq!(metrics["sla_compliance_rate"], 66.67);

    let members = app.get("/metrics/team-members").await.json::<Value>();
    assert_eq!(members.as_array().map(Vec::len), Some(1));
    assert_eq!(members[0]["team_member_id"], member.as_str());

    let missing = app
        .get("/team-members/7f1c1d1e-0000-4000-8000-000000000000/metrics")
        .await;
    assert_eq!(missing.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_member_with_history_is_deactivated() {
    let app = setup_test_app();
    let dept = app.create_department("Support", 4.0).await;
    let busy = app
        .create_team_member(&dept, "busy@support.test", None)
        .await;
    let idle = app
        .create_team_member(&dept, "idle@support.test", None)
        .await;
    app.receive_email(&busy, "Hello").await;

    let busy_removal = app
        .delete(&format!("/team-members/{}", busy))
        .await
        .json::<Value>();
    assert_eq!(busy_removal["outcome"], "deactivated");
    let busy_after = app
        .get(&format!("/team-members/{}", busy))
        .await
        .json::<Value>();
    assert_eq!(busy_after["is_active"], false);

    let idle_removal = app
        .delete(&format!("/team-members/{}", idle))
        .await
        .json::<Value>();
    assert_eq!(idle_removal["outcome"], "deleted");

    let active = app
        .client()
        .get(&api_path("/team-members"))
        .add_query_param("is_active", true)
        .await
        .json::<Value>();
    assert_eq!(active.as_array().map(Vec::len), Some(0));
}

#[tokio::test]
async fn test_mailbox_sync_records_new_mail_once() {
    let app = setup_test_app();
    let dept = app.create_department("Support", 4.0).await;
    app.create_team_member(&dept, "agent@support.test", Some("app-password"))
        .await;
    app.create_team_member(&dept, "nopass@support.test", None)
        .await;

    app.mailbox.set_inbox(
        "agent@support.test",
        vec![FetchedMessage {
            sender: "Client <client@example.com>".to_string(),
            recipient: "agent@support.test".to_string(),
            subject: "Where is my order".to_string(),
            body: "Order 1234".to_string(),
            date: None,
        }],
    );

    let first = app.post("/emails/sync", json!({})).await;
    assert_eq!(first.status_code(), StatusCode::OK);
    let first = first.json::<Value>();
    assert_eq!(first["total_emails_found"], 1);
    assert_eq!(first["total_emails_processed"], 1);
    let errors = first["errors"].as_array().cloned().unwrap_or_default();
    assert!(errors
        .iter()
        .any(|e| e == "No app password for nopass@support.test"));

    let second = app.post("/emails/sync", json!({})).await.json::<Value>();
    assert_eq!(second["total_emails_processed"], 0);

    let emails = app.get("/emails").await.json::<Value>();
    assert_eq!(emails.as_array().map(Vec::len), Some(1));
    assert_eq!(emails[0]["sender"], "client@example.com");
}

#[tokio::test]
async fn test_auto_sync_control() {
    let app = setup_test_app();

    let status = app.get("/auto-sync/status").await.json::<Value>();
    assert_eq!(status["is_running"], false);
    assert_eq!(status["interval_minutes"], 2);
    assert_eq!(status["interval_seconds"], 120);

    let started = app.post("/auto-sync/start", json!({})).await.json::<Value>();
    assert_eq!(started["status"], "started");

    let again = app.post("/auto-sync/start", json!({})).await.json::<Value>();
    assert_eq!(again["status"], "already_running");

    let updated = app
        .put("/auto-sync/interval", json!({ "interval_minutes": 5 }))
        .await
        .json::<Value>();
    assert_eq!(updated["interval_minutes"], 5);
    assert_eq!(updated["restarted"], true);

    let too_short = app
        .put("/auto-sync/interval", json!({ "interval_minutes": 0 }))
        .await;
    assert_eq!(too_short.status_code(), StatusCode::BAD_REQUEST);

    let too_long = app
        .put(
            "/auto-sync/interval",
            json!({ "interval_minutes": u64::MAX / 60 + 1 }),
        )
        .await;
    assert_eq!(too_long.status_code(), StatusCode::BAD_REQUEST);

    let status = app.get("/auto-sync/status").await.json::<Value>();
    assert_eq!(status["is_running"], true);
    assert_eq!(status["interval_minutes"], 5);
    assert_eq!(status["interval_seconds"], 300);

    let stopped = app.post("/auto-sync/stop", json!({})).await.json::<Value>();
    assert_eq!(stopped["status"], "stopped");

    let not_running = app.post("/auto-sync/stop", json!({})).await.json::<Value>();
    assert_eq!(not_running["status"], "not_running");

    app.state.scheduler.shutdown().await;
}

#[tokio::test]
async fn test_health_status_and_stats() {
    let app = setup_test_app();
    let dept = app.create_department("Support", 4.0).await;
    let member = app
        .create_team_member(&dept, "agent@support.test", None)
        .await;
    app.receive_email(&member, "Hello").await;

    let health = app.client().get("/health").await;
    assert_eq!(health.status_code(), StatusCode::OK);
    let health = health.json::<Value>();
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["auto_sync"]["running"], false);

    let status = app.client().get("/status").await.json::<Value>();
    assert_eq!(status["features"]["alerts"], true);

    let stats = app.get("/admin/database-stats").await.json::<Value>();
    assert_eq!(stats["departments"], 1);
    assert_eq!(stats["team_members"], 1);
    assert_eq!(stats["emails"], 1);
    assert_eq!(stats["alerts"], 0);

    let openapi = app.get("/openapi.json").await;
    assert_eq!(openapi.status_code(), StatusCode::OK);
    assert!(openapi.json::<Value>()["paths"]["/api/emails/receive"].is_object());
}

#[tokio::test]
async fn test_sample_data_initialization() {
    let app = setup_test_app();

    let unauthenticated = app
        .client()
        .post(&api_path("/admin/init-sample-data"))
        .await;
    assert_eq!(unauthenticated.status_code(), StatusCode::UNAUTHORIZED);
    let stats = app.get("/admin/database-stats").await.json::<Value>();
    assert_eq!(stats["emails"], 0);

    let seeded = app.post("/admin/init-sample-data", json!({})).await;
    assert_eq!(seeded.status_code(), StatusCode::CREATED);
    let seeded = seeded.json::<Value>();
    assert_eq!(seeded["success"], true);
    assert_eq!(seeded["data"]["departments_created"], 5);
    assert_eq!(seeded["data"]["team_members_created"], 9);
    assert_eq!(seeded["data"]["emails_created"], 100);

    let stats = app.get("/admin/database-stats").await.json::<Value>();
    assert_eq!(stats["departments"], 5);
    assert_eq!(stats["team_members"], 9);
    assert_eq!(stats["emails"], 100);

    let metrics = app.get("/metrics/departments").await.json::<Value>();
    let metrics = metrics.as_array().expect("department metrics");
    assert_eq!(metrics.len(), 5);
    let total: i64 = metrics
        .iter()
        .map(|m| m["total_emails"].as_i64().unwrap_or_default())
        .sum();
    assert_eq!(total, 100);

    let again = app
        .post("/admin/init-sample-data", json!({}))
        .await
        .json::<Value>();
    assert_eq!(again["data"]["departments_created"], 0);
    assert_eq!(again["data"]["totals"]["emails"], 200);
}
