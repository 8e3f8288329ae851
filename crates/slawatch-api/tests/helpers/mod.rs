//! Test helpers: build AppState and router for integration tests.
//!
//! The app runs over the in-memory store with a manual clock and fake mailbox
//! and mailer, so no database, IMAP or SMTP server is needed.
//! Run with: `cargo test -p slawatch-api`.

#![allow(dead_code)]

use std::sync::Arc;

use axum_test::{TestResponse, TestServer};
use chrono::{TimeZone, Utc};
use serde_json::{json, Value};
use slawatch_api::constants::{ADMIN_SECRET_HEADER, API_PREFIX};
use slawatch_api::setup::{routes, services};
use slawatch_api::AppState;
use slawatch_core::{Config, ManualClock};
use slawatch_db::{MemoryStore, SlaStore};
use slawatch_services::test_helpers::{FakeMailboxClient, RecordingMailer};

/// Admin secret configured on every test app
pub const TEST_ADMIN_SECRET: &str = "test-admin-secret-0123456789";

/// API path prefix for tests (e.g. `/api/departments`).
pub fn api_path(path: &str) -> String {
    format!("{}{}", API_PREFIX, path)
}

/// Test application: server plus handles on the fakes behind it.
pub struct TestApp {
    pub server: TestServer,
    pub state: Arc<AppState>,
    pub clock: ManualClock,
    pub mailer: Arc<RecordingMailer>,
    pub mailbox: Arc<FakeMailboxClient>,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.server
            .post(&api_path(path))
            .add_header(ADMIN_SECRET_HEADER, TEST_ADMIN_SECRET)
            .json(&body)
            .await
    }

    pub async fn put(&self, path: &str, body: Value) -> TestResponse {
        self.server
            .put(&api_path(path))
            .add_header(ADMIN_SECRET_HEADER, TEST_ADMIN_SECRET)
            .json(&body)
            .await
    }

    pub async fn delete(&self, path: &str) -> TestResponse {
        self.server
            .delete(&api_path(path))
            .add_header(ADMIN_SECRET_HEADER, TEST_ADMIN_SECRET)
            .await
    }

    pub async fn get(&self, path: &str) -> TestResponse {
        self.server.get(&api_path(path)).await
    }

    /// Create a department and return its id
    pub async fn create_department(&self, name: &str, threshold: f64) -> String {
        let response = self
            .post(
                "/departments",
                json!({ "name": name, "sla_threshold_hours": threshold }),
            )
            .await;
        response.assert_status(axum::http::StatusCode::CREATED);
        response.json::<Value>()["id"]
            .as_str()
            .expect("department id")
            .to_string()
    }

    /// Create a team member and return its id
    pub async fn create_team_member(
        &self,
        department_id: &str,
        email: &str,
        app_password: Option<&str>,
    ) -> String {
        let response = self
            .post(
                "/team-members",
                json!({
                    "name": "Agent",
                    "email": email,
                    "app_password": app_password,
                    "department_id": department_id,
                }),
            )
            .await;
        response.assert_status(axum::http::StatusCode::CREATED);
        response.json::<Value>()["id"]
            .as_str()
            .expect("team member id")
            .to_string()
    }

    /// Report an email to a member and return the email id
    pub async fn receive_email(&self, team_member_id: &str, subject: &str) -> String {
        let response = self
            .post(
                "/emails/receive",
                json!({
                    "sender": "client@example.com",
                    "recipient": "agent@support.test",
                    "subject": subject,
                    "body": "Please help",
                    "team_member_id": team_member_id,
                }),
            )
            .await;
        response.assert_status(axum::http::StatusCode::CREATED);
        response.json::<Value>()["id"]
            .as_str()
            .expect("email id")
            .to_string()
    }
}

pub fn test_config() -> Config {
    let mut config = Config::for_tests();
    config.admin_secret = Some(TEST_ADMIN_SECRET.to_string());
    config.alert_email = "ops@example.com".to_string();
    config
}

/// Setup a test app over a fresh in-memory store.
pub fn setup_test_app() -> TestApp {
    setup_test_app_with(test_config())
}

pub fn setup_test_app_with(config: Config) -> TestApp {
    let store: Arc<dyn SlaStore> = Arc::new(MemoryStore::new());
    let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 9, 2, 8, 0, 0).unwrap());
    let mailer = Arc::new(RecordingMailer::default());
    let mailbox = Arc::new(FakeMailboxClient::default());

    let state = services::initialize_services(
        &config,
        store,
        Arc::new(clock.clone()),
        Some(mailer.clone()),
        mailbox.clone(),
    )
    .expect("Failed to initialize services");

    let router = routes::setup_routes(&config, state.clone()).expect("Failed to build routes");
    let server = TestServer::new(router).expect("Failed to start test server");

    TestApp {
        server,
        state,
        clock,
        mailer,
        mailbox,
    }
}
