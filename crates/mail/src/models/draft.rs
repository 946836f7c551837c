//! Locally authored drafts

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A message composed locally and not yet sent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Draft {
    /// Local identifier (assigned by the store)
    pub id: i64,
    pub account_id: i64,
    pub to: String,
    pub subject: String,
    pub body: String,
    /// Whether the body came from the draft generator
    pub generated_by_ai: bool,
    pub created_at: DateTime<Utc>,
}

impl Draft {
    pub fn new(
        account_id: i64,
        to: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            id: 0,
            account_id,
            to: to.into(),
            subject: subject.into(),
            body: body.into(),
            generated_by_ai: false,
            created_at: Utc::now(),
        }
    }

    pub fn generated_by_ai(mut self, generated: bool) -> Self {
        self.generated_by_ai = generated;
        self
    }
}
