//! Caller-facing error type for sync requests

use crate::gmail::RemoteError;

/// Failure of a sync request, as surfaced to the caller
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Missing, malformed or unknown caller credential
    #[error("Unauthorized")]
    Unauthorized,

    /// The caller has no linked mail account
    #[error("No mail account linked for user {user_id}")]
    AccountNotLinked { user_id: String },

    /// The linked account has no usable provider credential
    #[error("Mail account {account_id} has no stored credential")]
    CredentialMissing { account_id: i64 },

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error("Storage error: {0:#}")]
    Storage(#[from] anyhow::Error),
}

impl SyncError {
    /// HTTP status reported to the caller
    pub fn status_code(&self) -> u16 {
        match self {
            SyncError::Unauthorized => 401,
            SyncError::Remote(e) if e.is_auth() => 401,
            SyncError::AccountNotLinked { .. } | SyncError::CredentialMissing { .. } => 400,
            SyncError::Remote(_) => 502,
            SyncError::Storage(_) => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(SyncError::Unauthorized.status_code(), 401);
        assert_eq!(
            SyncError::from(RemoteError::Auth { status: 401 }).status_code(),
            401
        );
        assert_eq!(
            SyncError::AccountNotLinked {
                user_id: "u1".into()
            }
            .status_code(),
            400
        );
        assert_eq!(SyncError::CredentialMissing { account_id: 1 }.status_code(), 400);
        assert_eq!(
            SyncError::from(RemoteError::Provider {
                operation: "list messages",
                status: 503
            })
            .status_code(),
            502
        );
        assert_eq!(
            SyncError::from(anyhow::anyhow!("disk full")).status_code(),
            500
        );
    }

    #[test]
    fn test_messages_are_human_readable() {
        let err = SyncError::AccountNotLinked {
            user_id: "u1".into(),
        };
        assert_eq!(err.to_string(), "No mail account linked for user u1");

        let err = SyncError::from(anyhow::anyhow!("disk full").context("Failed to insert"));
        assert_eq!(err.to_string(), "Storage error: Failed to insert: disk full");
    }
}
