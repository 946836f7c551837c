//! Provider labels and the local category derived from them

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// Gmail system labels that map onto local flags
pub const INBOX_LABEL: &str = "INBOX";
pub const STARRED_LABEL: &str = "STARRED";
pub const UNREAD_LABEL: &str = "UNREAD";

/// Local folder a message is filed under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Inbox,
    Sent,
    Draft,
    Starred,
    Trash,
}

impl Category {
    /// Derive the category of an imported message from its labels.
    ///
    /// Anything not in the inbox is filed as sent.
    pub fn from_labels(labels: &[String]) -> Self {
        if labels.iter().any(|l| l == INBOX_LABEL) {
            Category::Inbox
        } else {
            Category::Sent
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Inbox => "inbox",
            Category::Sent => "sent",
            Category::Draft => "draft",
            Category::Starred => "starred",
            Category::Trash => "trash",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "inbox" => Ok(Category::Inbox),
            "sent" => Ok(Category::Sent),
            "draft" => Ok(Category::Draft),
            "starred" => Ok(Category::Starred),
            "trash" => Ok(Category::Trash),
            other => anyhow::bail!("Unknown category: {}", other),
        }
    }
}
