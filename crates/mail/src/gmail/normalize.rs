//! Gmail API response normalization
//!
//! Converts Gmail API message payloads to the canonical message model.
//! Pure functions, no I/O.

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use chrono::{DateTime, Utc};

use super::api::{GmailMessage, MessagePart, MessagePayload};
use crate::models::{
    Category, EmailAddress, Message, MessageId, STARRED_LABEL, ThreadId, UNREAD_LABEL,
};

/// Standard alphabet, padding optional (Gmail strips it)
const STANDARD_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// A provider payload that cannot become a canonical message
#[derive(Debug, thiserror::Error)]
pub enum NormalizeError {
    #[error("Message {id} has an unparsable Date header: {value:?}")]
    InvalidDate { id: String, value: String },

    #[error("Message {id} has a malformed body: {reason}")]
    InvalidBody { id: String, reason: String },
}

/// Normalize a Gmail API message to a canonical Message
pub fn normalize_message(gmail_msg: GmailMessage) -> Result<Message, NormalizeError> {
    let empty = MessagePayload::default();
    let payload = gmail_msg.payload.as_ref().unwrap_or(&empty);

    let from = EmailAddress::parse(&extract_header(payload, "From").unwrap_or_default());
    let subject = extract_header(payload, "Subject").unwrap_or_default();

    let date = extract_header(payload, "Date").unwrap_or_default();
    let received_at = parse_date_header(&date).ok_or_else(|| NormalizeError::InvalidDate {
        id: gmail_msg.id.clone(),
        value: date.clone(),
    })?;

    let snippet = decode_html_entities(&gmail_msg.snippet);

    // Prefer the top-level body, fall back to the snippet
    let body = match top_level_body(payload) {
        Some(data) => decode_base64url(data).map_err(|e| NormalizeError::InvalidBody {
            id: gmail_msg.id.clone(),
            reason: e.to_string(),
        })?,
        None => snippet.clone(),
    };

    let label_ids = gmail_msg.label_ids.unwrap_or_default();
    let is_read = !has_label(&label_ids, UNREAD_LABEL);
    let is_starred = has_label(&label_ids, STARRED_LABEL);
    let category = Category::from_labels(&label_ids);
    let has_attachments = payload
        .parts
        .as_deref()
        .is_some_and(parts_declare_filename);

    Ok(Message::builder(MessageId::new(gmail_msg.id), ThreadId::new(gmail_msg.thread_id))
        .from(from)
        .subject(subject)
        .snippet(snippet)
        .body(body)
        .label_ids(label_ids)
        .category(category)
        .read(is_read)
        .starred(is_starred)
        .has_attachments(has_attachments)
        .received_at(received_at)
        .build())
}

/// Extract a header value by name
fn extract_header(payload: &MessagePayload, name: &str) -> Option<String> {
    payload.headers.as_ref()?.iter().find_map(|h| {
        if h.name.eq_ignore_ascii_case(name) {
            Some(h.value.clone())
        } else {
            None
        }
    })
}

fn has_label(labels: &[String], label: &str) -> bool {
    labels.iter().any(|l| l == label)
}

/// Body data attached directly to the payload, if any
fn top_level_body(payload: &MessagePayload) -> Option<&str> {
    payload
        .body
        .as_ref()?
        .data
        .as_deref()
        .filter(|data| !data.is_empty())
}

/// Whether any part (at any depth) carries a filename
fn parts_declare_filename(parts: &[MessagePart]) -> bool {
    parts.iter().any(|part| {
        part.filename.as_deref().is_some_and(|f| !f.is_empty())
            || part.parts.as_deref().is_some_and(parts_declare_filename)
    })
}

/// Decode Gmail's base64url body encoding.
///
/// Translates `-` to `+` and `_` to `/`, then decodes as standard base64.
/// Invalid UTF-8 sequences are replaced rather than rejected.
pub fn decode_base64url(data: &str) -> Result<String, base64::DecodeError> {
    let translated: String = data
        .trim()
        .chars()
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            other => other,
        })
        .collect();

    let bytes = STANDARD_LENIENT.decode(translated)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Parse an RFC 2822 `Date` header.
///
/// Trailing comments such as `(UTC)` are ignored. Returns None when the value
/// is empty or unparsable.
pub fn parse_date_header(value: &str) -> Option<DateTime<Utc>> {
    let mut value = value.trim();
    if value.ends_with(')')
        && let Some(idx) = value.rfind('(')
    {
        value = value[..idx].trim_end();
    }
    if value.is_empty() {
        return None;
    }

    DateTime::parse_from_rfc2822(value)
        .or_else(|_| DateTime::parse_from_rfc3339(value))
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}

/// Decode HTML entities in snippet text
fn decode_html_entities(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}
