use async_imap::Session;
use async_native_tls::TlsStream;
use async_trait::async_trait;
use futures::TryStreamExt;
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncReadCompatExt};

use slawatch_core::AppError;

use super::{mime, FetchedMessage, MailboxClient, MailboxSession};

const SERVICE: &str = "imap";
const INBOX: &str = "INBOX";

type ImapSession = Session<TlsStream<Compat<TcpStream>>>;

/// IMAP over implicit TLS, logging in with the member's address and app password.
#[derive(Debug, Clone)]
pub struct ImapMailboxClient {
    host: String,
    port: u16,
}

impl ImapMailboxClient {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

#[async_trait]
impl MailboxClient for ImapMailboxClient {
    #[tracing::instrument(skip(self, credential), fields(host = %self.host))]
    async fn connect(
        &self,
        address: &str,
        credential: &str,
    ) -> Result<Box<dyn MailboxSession>, AppError> {
        let tcp = TcpStream::connect((self.host.as_str(), self.port))
            .await
            .map_err(|e| AppError::upstream(SERVICE, format!("TCP connection failed: {}", e)))?;

        let tls = async_native_tls::TlsConnector::new();
        let tls_stream = tls
            .connect(self.host.as_str(), tcp.compat())
            .await
            .map_err(|e| AppError::upstream(SERVICE, format!("TLS handshake failed: {}", e)))?;

        let session = async_imap::Client::new(tls_stream)
            .login(address, credential)
            .await
            .map_err(|(e, _)| AppError::upstream(SERVICE, format!("Login failed: {}", e)))?;

        tracing::debug!("IMAP session opened");
        Ok(Box::new(ImapMailbox { session }))
    }
}

struct ImapMailbox {
    session: ImapSession,
}

#[async_trait]
impl MailboxSession for ImapMailbox {
    async fn fetch_unread(&mut self, limit: usize) -> Result<Vec<FetchedMessage>, AppError> {
        self.session
            .select(INBOX)
            .await
            .map_err(|e| AppError::upstream(SERVICE, format!("SELECT failed: {}", e)))?;

        let unseen = self
            .session
            .search("UNSEEN")
            .await
            .map_err(|e| AppError::upstream(SERVICE, format!("SEARCH failed: {}", e)))?;

        let mut ids: Vec<u32> = unseen.into_iter().collect();
        ids.sort_unstable();
        let newest: Vec<u32> = ids.into_iter().rev().take(limit).collect();

        let mut messages = Vec::with_capacity(newest.len());
        for id in newest {
            let fetches: Vec<_> = self
                .session
                .fetch(id.to_string(), "RFC822")
                .await
                .map_err(|e| AppError::upstream(SERVICE, format!("FETCH failed: {}", e)))?
                .try_collect()
                .await
                .map_err(|e| AppError::upstream(SERVICE, format!("FETCH failed: {}", e)))?;

            for fetch in &fetches {
                let Some(raw) = fetch.body() else {
                    tracing::warn!(message_id = id, "Fetched message has no body, skipping");
                    continue;
                };
                match mime::parse_message(raw) {
                    Ok(message) => messages.push(message),
                    Err(e) => {
                        tracing::warn!(message_id = id, error = %e, "Unparseable message, skipping")
                    }
                }
            }
        }

        Ok(messages)
    }

    async fn disconnect(self: Box<Self>) -> Result<(), AppError> {
        let mut mailbox = self;
        mailbox
            .session
            .logout()
            .await
            .map_err(|e| AppError::upstream(SERVICE, format!("LOGOUT failed: {}", e)))
    }
}
