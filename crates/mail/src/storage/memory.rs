//! In-memory storage implementation
//!
//! Used for tests and short-lived tooling. Check-then-insert for messages
//! happens under a single write lock, so concurrent imports cannot duplicate
//! a provider message.

use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::MailStore;
use crate::models::{Account, Credential, Draft, Message, MessageId, StoredMessage};

#[derive(Default)]
struct Inner {
    accounts: HashMap<i64, Account>,
    sessions: HashMap<String, String>,
    /// Keyed by local id
    messages: HashMap<i64, StoredMessage>,
    /// (account_id, provider id) -> local id
    message_keys: HashMap<(i64, String), i64>,
    drafts: Vec<Draft>,
    next_account_id: i64,
    next_message_id: i64,
    next_draft_id: i64,
}

/// In-memory implementation of MailStore
#[derive(Default)]
pub struct InMemoryMailStore {
    inner: RwLock<Inner>,
}

impl InMemoryMailStore {
    /// Create a new empty in-memory store
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Inner>> {
        self.inner
            .read()
            .map_err(|_| anyhow!("in-memory store lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Inner>> {
        self.inner
            .write()
            .map_err(|_| anyhow!("in-memory store lock poisoned"))
    }

    fn update_message<F>(&self, id: i64, update: F) -> Result<bool>
    where
        F: FnOnce(&mut Message),
    {
        let mut inner = self.write()?;
        match inner.messages.get_mut(&id) {
            Some(stored) => {
                update(&mut stored.message);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

impl MailStore for InMemoryMailStore {
    fn create_account(&self, mut account: Account) -> Result<Account> {
        let mut inner = self.write()?;
        if inner.accounts.values().any(|a| a.user_id == account.user_id) {
            anyhow::bail!("User {} already has a linked account", account.user_id);
        }
        inner.next_account_id += 1;
        account.id = inner.next_account_id;
        inner.accounts.insert(account.id, account.clone());
        Ok(account)
    }

    fn find_account_for_user(&self, user_id: &str) -> Result<Option<Account>> {
        let inner = self.read()?;
        Ok(inner
            .accounts
            .values()
            .find(|a| a.user_id == user_id)
            .cloned())
    }

    fn update_account_credential(&self, account_id: i64, credential: &Credential) -> Result<()> {
        let mut inner = self.write()?;
        let account = inner
            .accounts
            .get_mut(&account_id)
            .ok_or_else(|| anyhow!("Account {} not found", account_id))?;
        account.credential = Some(credential.clone());
        Ok(())
    }

    fn update_last_synced(&self, account_id: i64, at: DateTime<Utc>) -> Result<()> {
        let mut inner = self.write()?;
        let account = inner
            .accounts
            .get_mut(&account_id)
            .ok_or_else(|| anyhow!("Account {} not found", account_id))?;
        account.last_synced_at = Some(at);
        Ok(())
    }

    fn create_session(&self, user_id: &str, token: &str) -> Result<()> {
        let mut inner = self.write()?;
        inner.sessions.insert(token.to_string(), user_id.to_string());
        Ok(())
    }

    fn user_for_session(&self, token: &str) -> Result<Option<String>> {
        let inner = self.read()?;
        Ok(inner.sessions.get(token).cloned())
    }

    fn has_message(&self, account_id: i64, id: &MessageId) -> Result<bool> {
        let inner = self.read()?;
        Ok(inner
            .message_keys
            .contains_key(&(account_id, id.as_str().to_string())))
    }

    fn insert_message(&self, account_id: i64, message: &Message) -> Result<bool> {
        let mut inner = self.write()?;
        let key = (account_id, message.id.as_str().to_string());
        if inner.message_keys.contains_key(&key) {
            return Ok(false);
        }

        inner.next_message_id += 1;
        let id = inner.next_message_id;
        inner.message_keys.insert(key, id);
        inner.messages.insert(
            id,
            StoredMessage {
                id,
                account_id,
                message: message.clone(),
            },
        );
        Ok(true)
    }

    fn get_message(&self, id: i64) -> Result<Option<StoredMessage>> {
        let inner = self.read()?;
        Ok(inner.messages.get(&id).cloned())
    }

    fn list_messages(&self, account_id: i64) -> Result<Vec<StoredMessage>> {
        let inner = self.read()?;
        let mut messages: Vec<StoredMessage> = inner
            .messages
            .values()
            .filter(|m| m.account_id == account_id)
            .cloned()
            .collect();

        // Newest first, insertion order breaks ties
        messages.sort_by(|a, b| {
            b.message
                .received_at
                .cmp(&a.message.received_at)
                .then(a.id.cmp(&b.id))
        });
        Ok(messages)
    }

    fn count_messages(&self, account_id: i64) -> Result<usize> {
        let inner = self.read()?;
        Ok(inner
            .messages
            .values()
            .filter(|m| m.account_id == account_id)
            .count())
    }

    fn set_starred(&self, id: i64, starred: bool) -> Result<bool> {
        self.update_message(id, |m| m.is_starred = starred)
    }

    fn set_read(&self, id: i64, read: bool) -> Result<bool> {
        self.update_message(id, |m| m.is_read = read)
    }

    fn save_draft(&self, mut draft: Draft) -> Result<Draft> {
        let mut inner = self.write()?;
        inner.next_draft_id += 1;
        draft.id = inner.next_draft_id;
        inner.drafts.push(draft.clone());
        Ok(draft)
    }

    fn list_drafts(&self, account_id: i64) -> Result<Vec<Draft>> {
        let inner = self.read()?;
        let mut drafts: Vec<Draft> = inner
            .drafts
            .iter()
            .filter(|d| d.account_id == account_id)
            .cloned()
            .collect();
        drafts.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(drafts)
    }
}
