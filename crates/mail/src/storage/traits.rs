//! Storage trait definitions

use crate::models::{Account, Credential, Draft, Message, MessageId, StoredMessage};
use anyhow::Result;
use chrono::{DateTime, Utc};

/// Trait for mail storage operations
///
/// Messages are keyed by (account, provider message ID). Implementations must
/// enforce that pair as unique: `insert_message` on an existing pair is a
/// no-op returning `false`, even when two callers race.
pub trait MailStore: Send + Sync {
    // === Accounts ===

    /// Store a newly linked account, returning it with its assigned id
    fn create_account(&self, account: Account) -> Result<Account>;

    /// Find the account linked to a user
    fn find_account_for_user(&self, user_id: &str) -> Result<Option<Account>>;

    /// Replace the stored provider credential
    fn update_account_credential(&self, account_id: i64, credential: &Credential) -> Result<()>;

    /// Record when the account last completed a sync
    fn update_last_synced(&self, account_id: i64, at: DateTime<Utc>) -> Result<()>;

    // === Sessions ===

    /// Register a caller bearer token for a user
    fn create_session(&self, user_id: &str, token: &str) -> Result<()>;

    /// Resolve a caller bearer token to its user
    fn user_for_session(&self, token: &str) -> Result<Option<String>>;

    // === Messages ===

    /// Check whether a provider message is already stored for the account
    fn has_message(&self, account_id: i64, id: &MessageId) -> Result<bool>;

    /// Insert a message unless the provider ID is already stored.
    ///
    /// Returns `true` if a row was created. Never updates an existing row.
    fn insert_message(&self, account_id: i64, message: &Message) -> Result<bool>;

    /// Get a stored message by local id
    fn get_message(&self, id: i64) -> Result<Option<StoredMessage>>;

    /// List an account's messages, ordered by received_at descending
    fn list_messages(&self, account_id: i64) -> Result<Vec<StoredMessage>>;

    /// Count an account's messages
    fn count_messages(&self, account_id: i64) -> Result<usize>;

    /// Set the starred flag. Returns `false` if the message does not exist.
    fn set_starred(&self, id: i64, starred: bool) -> Result<bool>;

    /// Set the read flag. Returns `false` if the message does not exist.
    fn set_read(&self, id: i64, read: bool) -> Result<bool>;

    // === Drafts ===

    /// Save a draft, returning it with its assigned id
    fn save_draft(&self, draft: Draft) -> Result<Draft>;

    /// List an account's drafts, newest first
    fn list_drafts(&self, account_id: i64) -> Result<Vec<Draft>>;
}
