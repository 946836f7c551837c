//! Account model linking a user to one external mailbox

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stored provider credential
///
/// Opaque beyond `access_token`. The `Debug` impl redacts every token so a
/// credential can never end up in a log line.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Credential {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
}

impl Credential {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
            expires_at: None,
        }
    }

    /// An empty access token counts as no credential at all
    pub fn is_usable(&self) -> bool {
        !self.access_token.trim().is_empty()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"<redacted>")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "<redacted>"),
            )
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// A connected mailbox
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// Unique integer identifier (database primary key)
    pub id: i64,
    /// Identity of the owning user
    pub user_id: String,
    /// Mailbox address
    pub email: String,
    /// Provider name (e.g., "gmail")
    pub provider: String,
    /// Credential used to call the provider API
    pub credential: Option<Credential>,
    /// When the last sync completed
    pub last_synced_at: Option<DateTime<Utc>>,
    /// When the account was linked
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Create a new account (id will be assigned by the store)
    pub fn new(user_id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: 0,
            user_id: user_id.into(),
            email: email.into(),
            provider: "gmail".to_string(),
            credential: None,
            last_synced_at: None,
            created_at: Utc::now(),
        }
    }

    /// Set the provider credential
    pub fn with_credential(mut self, credential: Credential) -> Self {
        self.credential = Some(credential);
        self
    }

    /// Set the provider name
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = provider.into();
        self
    }
}
