//! Message list read model

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::models::{Category, StoredMessage};
use crate::storage::MailStore;

/// Placeholder shown for messages without a subject
pub const NO_SUBJECT: &str = "(No Subject)";

/// Flattened message for displaying in a list or reader pane
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageSummary {
    /// Local message ID
    pub id: i64,
    /// Provider message ID
    pub provider_id: String,
    pub thread_id: String,
    /// Sender display name, falling back to the address
    pub from_name: String,
    pub from_email: String,
    /// Subject line, or [`NO_SUBJECT`]
    pub subject: String,
    pub snippet: String,
    pub body: String,
    pub received_at: DateTime<Utc>,
    pub is_read: bool,
    pub is_starred: bool,
    pub has_attachments: bool,
    pub category: Category,
    pub labels: Vec<String>,
}

impl From<StoredMessage> for MessageSummary {
    fn from(stored: StoredMessage) -> Self {
        let msg = stored.message;
        let subject = if msg.subject.trim().is_empty() {
            NO_SUBJECT.to_string()
        } else {
            msg.subject
        };

        Self {
            id: stored.id,
            from_name: msg.from.display_name().to_string(),
            from_email: msg.from.email,
            provider_id: msg.id.0,
            thread_id: msg.thread_id.0,
            subject,
            snippet: msg.snippet,
            body: msg.body,
            received_at: msg.received_at,
            is_read: msg.is_read,
            is_starred: msg.is_starred,
            has_attachments: msg.has_attachments,
            category: msg.category,
            labels: msg.label_ids,
        }
    }
}

/// Mailbox view selected in the sidebar
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    #[default]
    Inbox,
    Starred,
    Sent,
    Drafts,
    Trash,
    All,
    /// Opens the compose dialog; the list shows every message
    Compose,
}

impl View {
    /// Whether `message` belongs in this view
    pub fn includes(&self, message: &MessageSummary) -> bool {
        match self {
            View::Inbox => message.category == Category::Inbox,
            View::Starred => message.is_starred,
            View::Sent => message.category == Category::Sent,
            View::Drafts => message.category == Category::Draft,
            View::Trash => message.category == Category::Trash,
            View::All | View::Compose => true,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            View::Inbox => "inbox",
            View::Starred => "starred",
            View::Sent => "sent",
            View::Drafts => "drafts",
            View::Trash => "trash",
            View::All => "all",
            View::Compose => "compose",
        }
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for View {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "inbox" => Ok(View::Inbox),
            "starred" => Ok(View::Starred),
            "sent" => Ok(View::Sent),
            "drafts" => Ok(View::Drafts),
            "trash" => Ok(View::Trash),
            "all" => Ok(View::All),
            "compose" => Ok(View::Compose),
            other => anyhow::bail!("Unknown view: {}", other),
        }
    }
}

/// List an account's messages for display
///
/// Returns messages sorted by received time descending (newest first).
pub fn list_messages(store: &dyn MailStore, account_id: i64) -> Result<Vec<MessageSummary>> {
    let messages = store.list_messages(account_id)?;
    Ok(messages.into_iter().map(MessageSummary::from).collect())
}

/// Number of unread inbox messages
pub fn unread_count(messages: &[MessageSummary]) -> usize {
    messages
        .iter()
        .filter(|m| !m.is_read && m.category == Category::Inbox)
        .count()
}
