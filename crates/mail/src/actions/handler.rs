//! Action handler for email operations
//!
//! Applies user mutations to local storage. Sync never overwrites these
//! flags, so local storage is the source of truth for read/starred.

use anyhow::{Result, bail};
use log::info;
use std::sync::Arc;

use crate::drafts::ComposeDraft;
use crate::models::Draft;
use crate::storage::MailStore;

/// Persists read/starred changes made in the UI
///
/// The mailbox state container applies changes optimistically and calls
/// through this trait to reconcile; an error triggers a rollback.
pub trait FlagUpdater {
    fn set_starred(&self, id: i64, starred: bool) -> Result<()>;
    fn set_read(&self, id: i64, read: bool) -> Result<()>;
}

/// Handler for email actions like star, read/unread and saving drafts
pub struct ActionHandler {
    store: Arc<dyn MailStore>,
}

impl ActionHandler {
    /// Create a new action handler
    pub fn new(store: Arc<dyn MailStore>) -> Self {
        Self { store }
    }

    /// Toggle star status for a message
    ///
    /// Returns the new starred state (true = starred, false = unstarred).
    pub fn toggle_star(&self, id: i64) -> Result<bool> {
        let Some(stored) = self.store.get_message(id)? else {
            bail!("Message {} not found", id);
        };

        let new_starred = !stored.message.is_starred;
        info!(
            "Toggling star for message {} to {}",
            id,
            if new_starred { "starred" } else { "unstarred" }
        );
        FlagUpdater::set_starred(self, id, new_starred)?;
        Ok(new_starred)
    }

    /// Mark a message as read
    pub fn mark_as_read(&self, id: i64) -> Result<()> {
        FlagUpdater::set_read(self, id, true)
    }

    /// Save a composed message as a local draft
    pub fn save_draft(
        &self,
        account_id: i64,
        compose: &ComposeDraft,
        generated_by_ai: bool,
    ) -> Result<Draft> {
        let draft = Draft::new(account_id, &compose.to, &compose.subject, &compose.body)
            .generated_by_ai(generated_by_ai);
        let saved = self.store.save_draft(draft)?;
        info!("Saved draft {} for account {}", saved.id, account_id);
        Ok(saved)
    }
}

impl FlagUpdater for ActionHandler {
    fn set_starred(&self, id: i64, starred: bool) -> Result<()> {
        if !self.store.set_starred(id, starred)? {
            bail!("Message {} not found", id);
        }
        Ok(())
    }

    fn set_read(&self, id: i64, read: bool) -> Result<()> {
        if !self.store.set_read(id, read)? {
            bail!("Message {} not found", id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Account, Message, MessageId, ThreadId};
    use crate::storage::InMemoryMailStore;

    fn setup() -> (ActionHandler, Arc<InMemoryMailStore>, i64, i64) {
        let store = Arc::new(InMemoryMailStore::new());
        let account = store
            .create_account(Account::new("u1", "u1@example.com"))
            .unwrap();
        let msg = Message::builder(MessageId::new("m1"), ThreadId::new("t1"))
            .read(false)
            .build();
        store.insert_message(account.id, &msg).unwrap();
        let local_id = store.list_messages(account.id).unwrap()[0].id;

        let handler = ActionHandler::new(store.clone());
        (handler, store, account.id, local_id)
    }

    #[test]
    fn test_toggle_star() {
        let (handler, store, _, id) = setup();

        assert!(handler.toggle_star(id).unwrap());
        assert!(store.get_message(id).unwrap().unwrap().message.is_starred);

        assert!(!handler.toggle_star(id).unwrap());
        assert!(!store.get_message(id).unwrap().unwrap().message.is_starred);
    }

    #[test]
    fn test_mark_as_read() {
        let (handler, store, _, id) = setup();
        handler.mark_as_read(id).unwrap();
        assert!(store.get_message(id).unwrap().unwrap().message.is_read);
    }

    #[test]
    fn test_missing_message_is_error() {
        let (handler, _, _, _) = setup();
        assert!(handler.toggle_star(404).is_err());
        assert!(handler.mark_as_read(404).is_err());
    }

    #[test]
    fn test_save_draft() {
        let (handler, store, account_id, _) = setup();
        let compose = ComposeDraft {
            to: "jane@x.com".to_string(),
            subject: "Re: Hello".to_string(),
            body: "Thanks!".to_string(),
        };

        let saved = handler.save_draft(account_id, &compose, true).unwrap();
        assert!(saved.generated_by_ai);

        let drafts = store.list_drafts(account_id).unwrap();
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].subject, "Re: Hello");
    }
}
