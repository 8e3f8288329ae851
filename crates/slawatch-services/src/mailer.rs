//! Outbound mail for alert notifications via SMTP.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::sync::Arc;

use slawatch_core::{AppError, Config};

const SERVICE: &str = "smtp";

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(
        &self,
        recipient: &str,
        subject: &str,
        body: &str,
        is_html: bool,
    ) -> Result<(), AppError>;
}

/// SMTP mailer built on lettre.
#[derive(Clone)]
pub struct SmtpMailer {
    transport: Arc<AsyncSmtpTransport<Tokio1Executor>>,
    from: Mailbox,
}

impl SmtpMailer {
    /// Create the mailer from config. Returns `None` if alerts are disabled or SMTP is not configured.
    pub fn from_config(config: &Config) -> Option<Self> {
        if !config.enable_alerts {
            tracing::debug!("Alert mail disabled (ENABLE_ALERTS=false)");
            return None;
        }
        let host = config.smtp_host.as_deref()?;
        let from = match config.smtp_from.as_deref()?.parse::<Mailbox>() {
            Ok(from) => from,
            Err(e) => {
                tracing::warn!(error = %e, "SMTP_FROM is not a valid mailbox, alert mail disabled");
                return None;
            }
        };
        let port = config.smtp_port;
        let credentials = match (config.smtp_user.as_deref(), config.smtp_password.as_deref()) {
            (Some(u), Some(p)) => Some(Credentials::new(u.to_string(), p.to_string())),
            _ => None,
        };

        let transport = if config.smtp_tls {
            let builder = match AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host) {
                Ok(b) => b.port(port),
                Err(e) => {
                    tracing::warn!(error = %e, host = %host, "Failed to configure SMTP relay, alert mail disabled");
                    return None;
                }
            };
            let builder = match credentials {
                Some(c) => builder.credentials(c),
                None => builder,
            };
            tracing::info!(host = %host, port = port, "Mailer initialized (SMTP with STARTTLS)");
            builder.build()
        } else {
            let builder = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host).port(port);
            let builder = match credentials {
                Some(c) => builder.credentials(c),
                None => builder,
            };
            tracing::info!(host = %host, port = port, "Mailer initialized (SMTP)");
            builder.build()
        };

        Some(Self {
            transport: Arc::new(transport),
            from,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    #[tracing::instrument(skip(self, body), fields(recipient = %recipient))]
    async fn send(
        &self,
        recipient: &str,
        subject: &str,
        body: &str,
        is_html: bool,
    ) -> Result<(), AppError> {
        let to: Mailbox = recipient.parse().map_err(|e| {
            AppError::InvalidInput(format!("Invalid recipient address '{}': {}", recipient, e))
        })?;

        let content_type = if is_html {
            ContentType::TEXT_HTML
        } else {
            ContentType::TEXT_PLAIN
        };

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .header(content_type)
            .body(body.to_string())
            .map_err(|e| AppError::upstream(SERVICE, e.to_string()))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| AppError::upstream(SERVICE, e.to_string()))?;

        tracing::info!("Alert email sent");
        Ok(())
    }
}
