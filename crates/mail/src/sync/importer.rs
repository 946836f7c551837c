//! Deduplicating message import

use anyhow::{Context, Result};

use crate::models::Message;
use crate::storage::MailStore;

/// Store `message` unless the account already has it.
///
/// Returns `true` when a row was created. An existing message is left
/// untouched, so local read/starred changes survive re-sync. The insert
/// itself ignores conflicts, which covers a concurrent import racing past
/// the existence check.
pub fn import_if_new(store: &dyn MailStore, account_id: i64, message: &Message) -> Result<bool> {
    if store.has_message(account_id, &message.id)? {
        return Ok(false);
    }

    store
        .insert_message(account_id, message)
        .with_context(|| format!("Failed to import message {}", message.id.as_str()))
}
