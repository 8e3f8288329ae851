//! Mailbox access used by sync.
//!
//! A `MailboxClient` opens one authenticated session per team member; the
//! session hands back the member's most recent unread messages, freshest first.

mod imap;
pub mod mime;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use slawatch_core::AppError;

pub use imap::ImapMailboxClient;

/// Message as read from a mailbox, before normalization and attribution.
///
/// `sender` and `recipient` are raw header values and may carry display names.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedMessage {
    pub sender: String,
    pub recipient: String,
    pub subject: String,
    pub body: String,
    pub date: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait MailboxClient: Send + Sync {
    async fn connect(
        &self,
        address: &str,
        credential: &str,
    ) -> Result<Box<dyn MailboxSession>, AppError>;
}

#[async_trait]
pub trait MailboxSession: Send {
    /// Up to `limit` unread messages, most recent first.
    async fn fetch_unread(&mut self, limit: usize) -> Result<Vec<FetchedMessage>, AppError>;

    async fn disconnect(self: Box<Self>) -> Result<(), AppError>;
}
