//! RFC 822 message parsing for mailbox sync.

use chrono::{DateTime, Utc};
use mailparse::{parse_mail, DispositionType, MailHeaderMap, ParsedMail};

use slawatch_core::AppError;

use super::FetchedMessage;

pub const BODY_PLACEHOLDER: &str = "[Email body could not be extracted]";
pub const MAX_BODY_CHARS: usize = 1000;
/// RFC 5322 line limit; also the longest subject a stored email accepts
pub const MAX_SUBJECT_CHARS: usize = 998;

pub fn parse_message(raw: &[u8]) -> Result<FetchedMessage, AppError> {
    let parsed = parse_mail(raw)
        .map_err(|e| AppError::InvalidInput(format!("Malformed message: {}", e)))?;

    let header = |name: &str| parsed.headers.get_first_value(name).unwrap_or_default();

    let date = parsed
        .headers
        .get_first_value("Date")
        .and_then(|d| mailparse::dateparse(&d).ok())
        .and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0));

    Ok(FetchedMessage {
        sender: header("From"),
        recipient: header("To"),
        subject: header("Subject").chars().take(MAX_SUBJECT_CHARS).collect(),
        body: extract_body(&parsed),
        date,
    })
}

/// First inline text/plain part, else first inline text/html part, else the
/// placeholder. Truncated to `MAX_BODY_CHARS` characters.
pub fn extract_body(mail: &ParsedMail<'_>) -> String {
    let body = if mail.subparts.is_empty() {
        mail.get_body().ok()
    } else {
        first_inline_part(mail, "text/plain").or_else(|| first_inline_part(mail, "text/html"))
    };

    match body.filter(|b| !b.trim().is_empty()) {
        Some(b) => b.chars().take(MAX_BODY_CHARS).collect(),
        None => BODY_PLACEHOLDER.to_string(),
    }
}

fn first_inline_part(mail: &ParsedMail<'_>, mimetype: &str) -> Option<String> {
    if mail.subparts.is_empty() {
        let is_attachment =
            mail.get_content_disposition().disposition == DispositionType::Attachment;
        if !is_attachment && mail.ctype.mimetype.eq_ignore_ascii_case(mimetype) {
            return mail.get_body().ok().filter(|b| !b.is_empty());
        }
        return None;
    }
    mail.subparts
        .iter()
        .find_map(|part| first_inline_part(part, mimetype))
}
