//! Configuration module
//!
//! All settings come from the environment (optionally seeded from a `.env` file).
//! `Config::from_env` applies defaults, `Config::validate` fails fast on values
//! that would make the service misbehave at runtime.

use std::env;

use crate::sla::DEFAULT_SLA_THRESHOLD_HOURS;

// Common constants
const SERVER_PORT: u16 = 8000;
const MAX_CONNECTIONS: u32 = 10;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const AUTO_SYNC_INTERVAL_MINUTES: u64 = 2;
const SYNC_BATCH_LIMIT: usize = 10;
const SYNC_MEMBER_PAUSE_SECS: u64 = 2;
const SYNC_MAX_CONCURRENCY: usize = 1;
const MAILBOX_TIMEOUT_SECS: u64 = 30;
const IMAP_PORT: u16 = 993;
const SMTP_PORT: u16 = 587;
const MIN_ADMIN_SECRET_LEN: usize = 16;
const HTTP_CONCURRENCY_LIMIT: usize = 1_000;

/// Shortest auto-sync interval accepted
pub const MIN_SYNC_INTERVAL_MINUTES: u64 = 1;
/// Longest auto-sync interval accepted (one week)
pub const MAX_SYNC_INTERVAL_MINUTES: u64 = 7 * 24 * 60;

/// Where emails, departments and alerts are persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    /// Process-local store for demos and local development
    Memory,
}

/// Application configuration
#[derive(Clone)]
pub struct Config {
    pub server_port: u16,
    pub environment: String,
    pub cors_origins: Vec<String>,
    pub store_backend: StoreBackend,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    pub admin_secret: Option<String>,
    pub http_concurrency_limit: usize,
    // SLA
    pub default_sla_threshold_hours: f64,
    // Mailbox sync
    pub enable_auto_sync: bool,
    pub auto_sync_interval_minutes: u64,
    pub sync_batch_limit: usize,
    pub sync_member_pause_secs: u64,
    pub sync_max_concurrency: usize,
    pub mailbox_timeout_secs: u64,
    pub imap_host: String,
    pub imap_port: u16,
    pub mailbox_domain_filter: Option<String>,
    // Alerts and outbound mail
    pub enable_alerts: bool,
    pub alert_email: String,
    pub smtp_host: Option<String>,
    pub smtp_port: u16,
    pub smtp_user: Option<String>,
    pub smtp_password: Option<String>,
    pub smtp_from: Option<String>,
    pub smtp_tls: bool,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("server_port", &self.server_port)
            .field("environment", &self.environment)
            .field("store_backend", &self.store_backend)
            .field("default_sla_threshold_hours", &self.default_sla_threshold_hours)
            .field("enable_auto_sync", &self.enable_auto_sync)
            .field("auto_sync_interval_minutes", &self.auto_sync_interval_minutes)
            .field("imap_host", &self.imap_host)
            .field("enable_alerts", &self.enable_alerts)
            .field("smtp_host", &self.smtp_host)
            .finish_non_exhaustive()
    }
}

fn env_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .map(|v| v.trim().to_lowercase())
        .ok()
        .and_then(|v| match v.as_str() {
            "true" | "1" | "yes" | "on" => Some(true),
            "false" | "0" | "no" | "off" => Some(false),
            _ => None,
        })
        .unwrap_or(default)
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        // A missing .env file is fine; real deployments set the environment directly.
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let store_backend = match env::var("STORE_BACKEND")
            .unwrap_or_else(|_| "postgres".to_string())
            .to_lowercase()
            .as_str()
        {
            "postgres" | "postgresql" => StoreBackend::Postgres,
            "memory" => StoreBackend::Memory,
            other => {
                return Err(anyhow::anyhow!(
                    "STORE_BACKEND must be 'postgres' or 'memory', got '{}'",
                    other
                ))
            }
        };

        let database_url = env_opt("DATABASE_URL");
        if store_backend == StoreBackend::Postgres && database_url.is_none() {
            return Err(anyhow::anyhow!(
                "DATABASE_URL must be set when STORE_BACKEND=postgres"
            ));
        }

        let cors_origins = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let config = Config {
            server_port: env::var("PORT")
                .unwrap_or_else(|_| SERVER_PORT.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            environment,
            cors_origins,
            store_backend,
            database_url,
            db_max_connections: env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| MAX_CONNECTIONS.to_string())
                .parse()
                .unwrap_or(MAX_CONNECTIONS),
            db_timeout_seconds: env::var("DB_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| CONNECTION_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(CONNECTION_TIMEOUT_SECS),
            admin_secret: env_opt("ADMIN_SECRET"),
            http_concurrency_limit: env::var("HTTP_CONCURRENCY_LIMIT")
                .unwrap_or_else(|_| HTTP_CONCURRENCY_LIMIT.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("HTTP_CONCURRENCY_LIMIT must be a valid number"))?,
            default_sla_threshold_hours: env::var("DEFAULT_SLA_THRESHOLD")
                .unwrap_or_else(|_| DEFAULT_SLA_THRESHOLD_HOURS.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("DEFAULT_SLA_THRESHOLD must be a number"))?,
            enable_auto_sync: env_bool("ENABLE_AUTO_SYNC", false),
            auto_sync_interval_minutes: env::var("AUTO_SYNC_INTERVAL_MINUTES")
                .unwrap_or_else(|_| AUTO_SYNC_INTERVAL_MINUTES.to_string())
                .parse()
                .unwrap_or(AUTO_SYNC_INTERVAL_MINUTES),
            sync_batch_limit: env::var("SYNC_BATCH_LIMIT")
                .unwrap_or_else(|_| SYNC_BATCH_LIMIT.to_string())
                .parse()
                .unwrap_or(SYNC_BATCH_LIMIT),
            sync_member_pause_secs: env::var("SYNC_MEMBER_PAUSE_SECS")
                .unwrap_or_else(|_| SYNC_MEMBER_PAUSE_SECS.to_string())
                .parse()
                .unwrap_or(SYNC_MEMBER_PAUSE_SECS),
            sync_max_concurrency: env::var("SYNC_MAX_CONCURRENCY")
                .unwrap_or_else(|_| SYNC_MAX_CONCURRENCY.to_string())
                .parse()
                .unwrap_or(SYNC_MAX_CONCURRENCY),
            mailbox_timeout_secs: env::var("MAILBOX_TIMEOUT_SECS")
                .unwrap_or_else(|_| MAILBOX_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(MAILBOX_TIMEOUT_SECS),
            imap_host: env::var("IMAP_HOST").unwrap_or_else(|_| "imap.gmail.com".to_string()),
            imap_port: env::var("IMAP_PORT")
                .unwrap_or_else(|_| IMAP_PORT.to_string())
                .parse()
                .unwrap_or(IMAP_PORT),
            mailbox_domain_filter: env_opt("MAILBOX_DOMAIN_FILTER"),
            enable_alerts: env_bool("ENABLE_ALERTS", true),
            alert_email: env::var("ALERT_EMAIL")
                .unwrap_or_else(|_| "admin@company.com".to_string()),
            smtp_host: env_opt("SMTP_HOST"),
            smtp_port: env::var("SMTP_PORT")
                .unwrap_or_else(|_| SMTP_PORT.to_string())
                .parse()
                .unwrap_or(SMTP_PORT),
            smtp_user: env_opt("SMTP_USER"),
            smtp_password: env_opt("SMTP_PASSWORD"),
            smtp_from: env_opt("SMTP_FROM"),
            smtp_tls: env_bool("SMTP_TLS", true),
        };

        Ok(config)
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if !self.default_sla_threshold_hours.is_finite() || self.default_sla_threshold_hours <= 0.0
        {
            return Err(anyhow::anyhow!(
                "DEFAULT_SLA_THRESHOLD must be a positive number of hours"
            ));
        }

        if !(MIN_SYNC_INTERVAL_MINUTES..=MAX_SYNC_INTERVAL_MINUTES)
            .contains(&self.auto_sync_interval_minutes)
        {
            return Err(anyhow::anyhow!(
                "AUTO_SYNC_INTERVAL_MINUTES must be between {} and {}",
                MIN_SYNC_INTERVAL_MINUTES,
                MAX_SYNC_INTERVAL_MINUTES
            ));
        }

        if self.http_concurrency_limit == 0 {
            return Err(anyhow::anyhow!("HTTP_CONCURRENCY_LIMIT must be at least 1"));
        }

        if self.sync_batch_limit == 0 {
            return Err(anyhow::anyhow!("SYNC_BATCH_LIMIT must be at least 1"));
        }

        if self.sync_max_concurrency == 0 {
            return Err(anyhow::anyhow!("SYNC_MAX_CONCURRENCY must be at least 1"));
        }

        if let Some(url) = &self.database_url {
            if !(url.starts_with("postgres://") || url.starts_with("postgresql://")) {
                return Err(anyhow::anyhow!(
                    "DATABASE_URL must be a valid PostgreSQL connection string"
                ));
            }
        }

        if self.is_production() {
            match &self.admin_secret {
                Some(secret) if secret.len() >= MIN_ADMIN_SECRET_LEN => {}
                _ => {
                    return Err(anyhow::anyhow!(
                        "ADMIN_SECRET must be set to at least {} characters in production",
                        MIN_ADMIN_SECRET_LEN
                    ))
                }
            }
            if self.cors_origins.iter().any(|o| o == "*") {
                return Err(anyhow::anyhow!(
                    "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
                ));
            }
        }

        if self.enable_alerts && self.smtp_host.is_some() && self.smtp_from.is_none() {
            return Err(anyhow::anyhow!(
                "SMTP_HOST is set but SMTP_FROM is missing; alert mail needs a sender"
            ));
        }

        Ok(())
    }

    /// Defaults suitable for tests: in-memory store, no mail, manual sync.
    pub fn for_tests() -> Self {
        Config {
            server_port: SERVER_PORT,
            environment: "test".to_string(),
            cors_origins: vec!["*".to_string()],
            store_backend: StoreBackend::Memory,
            database_url: None,
            db_max_connections: MAX_CONNECTIONS,
            db_timeout_seconds: CONNECTION_TIMEOUT_SECS,
            admin_secret: None,
            http_concurrency_limit: HTTP_CONCURRENCY_LIMIT,
            default_sla_threshold_hours: DEFAULT_SLA_THRESHOLD_HOURS,
            enable_auto_sync: false,
            auto_sync_interval_minutes: AUTO_SYNC_INTERVAL_MINUTES,
            sync_batch_limit: SYNC_BATCH_LIMIT,
            sync_member_pause_secs: 0,
            sync_max_concurrency: SYNC_MAX_CONCURRENCY,
            mailbox_timeout_secs: MAILBOX_TIMEOUT_SECS,
            imap_host: "imap.gmail.com".to_string(),
            imap_port: IMAP_PORT,
            mailbox_domain_filter: None,
            enable_alerts: true,
            alert_email: "admin@company.com".to_string(),
            smtp_host: None,
            smtp_port: SMTP_PORT,
            smtp_user: None,
            smtp_password: None,
            smtp_from: None,
            smtp_tls: true,
        }
    }
}
