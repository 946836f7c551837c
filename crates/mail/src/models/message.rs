//! Message model: the canonical email record and its stored form

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use super::Category;

/// `Name <address>` sender header form
static NAMED_ADDRESS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.+?)\s*<(.+?)>$").expect("sender pattern is valid")
});

/// Provider-assigned message identifier (Gmail message ID), the dedup key
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

impl MessageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for MessageId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for MessageId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Provider-assigned thread identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ThreadId(pub String);

impl ThreadId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ThreadId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Sender of a message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailAddress {
    /// Display name (e.g., "Jane Doe")
    pub name: String,
    /// Email address (e.g., "jane@example.com")
    pub email: String,
}

impl EmailAddress {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }

    /// Parse a raw `From` header value.
    ///
    /// `Jane Doe <jane@x.com>` splits into name and address. Anything else is
    /// used verbatim as both name and address.
    pub fn parse(raw: &str) -> Self {
        match NAMED_ADDRESS.captures(raw) {
            Some(caps) => Self {
                name: caps[1].trim().to_string(),
                email: caps[2].trim().to_string(),
            },
            None => Self {
                name: raw.to_string(),
                email: raw.to_string(),
            },
        }
    }

    /// Name to show in lists, falling back to the address
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.email
        } else {
            &self.name
        }
    }
}

/// Canonical email record, independent of the provider payload shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Provider message ID
    pub id: MessageId,
    /// Provider thread ID
    pub thread_id: ThreadId,
    pub from: EmailAddress,
    /// Subject line, empty when the header is absent
    pub subject: String,
    /// Provider's short preview text
    pub snippet: String,
    /// Full body text
    pub body: String,
    /// Provider label IDs (e.g., "INBOX", "UNREAD")
    pub label_ids: Vec<String>,
    pub category: Category,
    pub is_read: bool,
    pub is_starred: bool,
    pub has_attachments: bool,
    pub received_at: DateTime<Utc>,
}

impl Message {
    /// Create a new message builder
    pub fn builder(id: MessageId, thread_id: ThreadId) -> MessageBuilder {
        MessageBuilder::new(id, thread_id)
    }
}

/// A message as persisted for one account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredMessage {
    /// Local row identifier
    pub id: i64,
    /// Owning account
    pub account_id: i64,
    pub message: Message,
}

/// Builder for creating Message instances
pub struct MessageBuilder {
    id: MessageId,
    thread_id: ThreadId,
    from: Option<EmailAddress>,
    subject: String,
    snippet: String,
    body: String,
    label_ids: Vec<String>,
    category: Option<Category>,
    is_read: bool,
    is_starred: bool,
    has_attachments: bool,
    received_at: Option<DateTime<Utc>>,
}

impl MessageBuilder {
    fn new(id: MessageId, thread_id: ThreadId) -> Self {
        Self {
            id,
            thread_id,
            from: None,
            subject: String::new(),
            snippet: String::new(),
            body: String::new(),
            label_ids: Vec::new(),
            category: None,
            is_read: true,
            is_starred: false,
            has_attachments: false,
            received_at: None,
        }
    }

    pub fn from(mut self, from: EmailAddress) -> Self {
        self.from = Some(from);
        self
    }

    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    pub fn snippet(mut self, snippet: impl Into<String>) -> Self {
        self.snippet = snippet.into();
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn label_ids(mut self, label_ids: Vec<String>) -> Self {
        self.label_ids = label_ids;
        self
    }

    pub fn category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    pub fn read(mut self, is_read: bool) -> Self {
        self.is_read = is_read;
        self
    }

    pub fn starred(mut self, is_starred: bool) -> Self {
        self.is_starred = is_starred;
        self
    }

    pub fn has_attachments(mut self, has_attachments: bool) -> Self {
        self.has_attachments = has_attachments;
        self
    }

    pub fn received_at(mut self, received_at: DateTime<Utc>) -> Self {
        self.received_at = Some(received_at);
        self
    }

    pub fn build(self) -> Message {
        let category = self
            .category
            .unwrap_or_else(|| Category::from_labels(&self.label_ids));
        Message {
            id: self.id,
            thread_id: self.thread_id,
            from: self.from.unwrap_or_else(|| EmailAddress::new("", "")),
            subject: self.subject,
            snippet: self.snippet,
            body: self.body,
            label_ids: self.label_ids,
            category,
            is_read: self.is_read,
            is_starred: self.is_starred,
            has_attachments: self.has_attachments,
            received_at: self.received_at.unwrap_or_else(Utc::now),
        }
    }
}
