//! Caller authentication for sync requests

use log::debug;

use crate::error::SyncError;
use crate::storage::MailStore;

/// Resolve the caller's user id from an `Authorization` header value.
///
/// Accepts `Bearer <token>` and looks the token up in the session table.
pub fn authenticate(header: Option<&str>, store: &dyn MailStore) -> Result<String, SyncError> {
    let token = header
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(SyncError::Unauthorized)?;

    match store.user_for_session(token)? {
        Some(user_id) => Ok(user_id),
        None => {
            debug!("Rejected unknown bearer token");
            Err(SyncError::Unauthorized)
        }
    }
}
