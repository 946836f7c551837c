//! Gmail API HTTP client
//!
//! Provides the two endpoints sync needs: message listing and message detail.
//! Uses synchronous HTTP (ureq) to be executor-agnostic. No retries are
//! performed here.

use serde::de::DeserializeOwned;
use url::Url;

use super::api::{GmailMessage, ListMessagesResponse};
use crate::models::{Credential, MessageId};

/// Failure talking to the remote mailbox
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    /// The provider rejected the bearer credential
    #[error("Mail provider rejected the credential (HTTP {status})")]
    Auth { status: u16 },

    /// Any other non-success response
    #[error("Mail provider returned HTTP {status} for {operation}")]
    Provider { operation: &'static str, status: u16 },

    /// Transport failure (DNS, connect, TLS, timeout)
    #[error("Network error during {operation}: {message}")]
    Network {
        operation: &'static str,
        message: String,
    },

    /// Success status with a body we could not parse
    #[error("Failed to parse {operation} response: {message}")]
    Decode {
        operation: &'static str,
        message: String,
    },
}

impl RemoteError {
    pub fn is_auth(&self) -> bool {
        matches!(self, RemoteError::Auth { .. })
    }

    fn from_ureq(operation: &'static str, err: ureq::Error) -> Self {
        match err {
            ureq::Error::StatusCode(401) => RemoteError::Auth { status: 401 },
            ureq::Error::StatusCode(status) => RemoteError::Provider { operation, status },
            other => RemoteError::Network {
                operation,
                message: other.to_string(),
            },
        }
    }
}

/// Remote mailbox operations used by sync
pub trait RemoteMailbox: Send + Sync {
    /// List up to `max_results` message IDs matching the provider query
    fn list_message_ids(
        &self,
        credential: &Credential,
        max_results: usize,
        query: &str,
    ) -> Result<Vec<MessageId>, RemoteError>;

    /// Fetch the full payload of one message
    fn get_message(
        &self,
        credential: &Credential,
        id: &MessageId,
    ) -> Result<GmailMessage, RemoteError>;
}

/// Gmail API client for fetching messages
pub struct GmailClient {
    base_url: String,
}

impl GmailClient {
    /// Gmail API base URL
    pub const BASE_URL: &'static str = "https://gmail.googleapis.com/gmail/v1";

    /// Largest page Gmail will return from the list endpoint
    const MAX_PAGE_SIZE: usize = 500;

    /// Create a new Gmail client against the public API
    pub fn new() -> Self {
        Self::with_base_url(Self::BASE_URL)
    }

    /// Create a client against another API root (used with mock servers)
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn get_json<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        url: &str,
        credential: &Credential,
    ) -> Result<T, RemoteError> {
        let mut response = ureq::get(url)
            .header("Authorization", &format!("Bearer {}", credential.access_token))
            .call()
            .map_err(|e| RemoteError::from_ureq(operation, e))?;

        response
            .body_mut()
            .read_json()
            .map_err(|e| RemoteError::Decode {
                operation,
                message: e.to_string(),
            })
    }
}

impl Default for GmailClient {
    fn default() -> Self {
        Self::new()
    }
}

impl RemoteMailbox for GmailClient {
    fn list_message_ids(
        &self,
        credential: &Credential,
        max_results: usize,
        query: &str,
    ) -> Result<Vec<MessageId>, RemoteError> {
        const OPERATION: &str = "list messages";

        let mut url = Url::parse(&format!("{}/users/me/messages", self.base_url)).map_err(|e| {
            RemoteError::Network {
                operation: OPERATION,
                message: format!("invalid API URL: {}", e),
            }
        })?;
        url.query_pairs_mut()
            .append_pair("maxResults", &max_results.min(Self::MAX_PAGE_SIZE).to_string());
        if !query.is_empty() {
            url.query_pairs_mut().append_pair("q", query);
        }

        let list: ListMessagesResponse = self.get_json(OPERATION, url.as_str(), credential)?;

        Ok(list
            .messages
            .unwrap_or_default()
            .into_iter()
            .map(|m| MessageId::new(m.id))
            .collect())
    }

    fn get_message(
        &self,
        credential: &Credential,
        id: &MessageId,
    ) -> Result<GmailMessage, RemoteError> {
        let url = format!(
            "{}/users/me/messages/{}?format=full",
            self.base_url,
            urlencoding::encode(id.as_str())
        );

        self.get_json("get message", &url, credential)
    }
}
