//! Inbox sync implementation

use chrono::Utc;
use log::{debug, error, info, warn};
use serde::Serialize;
use std::time::Instant;

use super::importer::import_if_new;
use crate::error::SyncError;
use crate::gmail::{RemoteMailbox, normalize_message};
use crate::models::{Credential, MessageId};
use crate::storage::MailStore;

/// Tuning for one sync run
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Maximum number of message IDs requested from the provider
    pub max_results: usize,
    /// Provider search query scoping the listing
    pub query: String,
    /// Abort the run on the first failed detail fetch instead of skipping
    /// that message
    pub abort_on_fetch_error: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            max_results: 50,
            query: "in:inbox".to_string(),
            abort_on_fetch_error: false,
        }
    }
}

/// Statistics from a sync operation
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct SyncReport {
    /// Message IDs returned by the listing (reported to callers as `synced`)
    pub attempted: usize,
    /// Number of new messages stored
    pub inserted: usize,
    /// Number of messages skipped because they were already stored
    pub skipped_existing: usize,
    /// Number of messages skipped after a fetch or normalization failure
    pub failed: usize,
    /// Duration of the sync operation
    pub duration_ms: u64,
}

/// Sync the caller's inbox from the provider to local storage.
///
/// Safe to run repeatedly or concurrently: messages already stored are never
/// fetched again or modified. IDs found in the store are counted as
/// `skipped_existing` before the detail fetch, so [`import_if_new`] only sees
/// messages that were absent at that point; it still returns false when a
/// concurrent run stored the same message in between. The account's
/// last-synced timestamp is only updated when the run completes.
pub fn sync_account(
    remote: &dyn RemoteMailbox,
    store: &dyn MailStore,
    user_id: &str,
    options: &SyncOptions,
) -> Result<SyncReport, SyncError> {
    let start = Instant::now();
    let mut report = SyncReport::default();

    // 1. Resolve the linked account and its credential
    let account = store
        .find_account_for_user(user_id)?
        .ok_or_else(|| SyncError::AccountNotLinked {
            user_id: user_id.to_string(),
        })?;
    let credential = account
        .credential
        .as_ref()
        .filter(|c| c.is_usable())
        .ok_or(SyncError::CredentialMissing {
            account_id: account.id,
        })?;

    info!(
        "Syncing account {} ({} messages max, query {:?})",
        account.id, options.max_results, options.query
    );

    // 2. List message IDs; failure here aborts the whole run
    let ids = remote
        .list_message_ids(credential, options.max_results, &options.query)
        .inspect_err(|e| error!("Listing messages for account {} failed: {}", account.id, e))?;
    report.attempted = ids.len();

    // 3. Fetch, normalize and import one message at a time
    for id in &ids {
        match sync_one(remote, store, account.id, credential, id, options)? {
            Outcome::Inserted => report.inserted += 1,
            Outcome::Existing => report.skipped_existing += 1,
            Outcome::Failed => report.failed += 1,
        }
    }

    // 4. Record completion
    store.update_last_synced(account.id, Utc::now())?;

    report.duration_ms = start.elapsed().as_millis() as u64;
    info!(
        "Synced account {}: {} listed, {} new, {} existing, {} failed in {}ms",
        account.id,
        report.attempted,
        report.inserted,
        report.skipped_existing,
        report.failed,
        report.duration_ms
    );
    Ok(report)
}

enum Outcome {
    Inserted,
    Existing,
    Failed,
}

fn sync_one(
    remote: &dyn RemoteMailbox,
    store: &dyn MailStore,
    account_id: i64,
    credential: &Credential,
    id: &MessageId,
    options: &SyncOptions,
) -> Result<Outcome, SyncError> {
    if store.has_message(account_id, id)? {
        debug!("Message {} already stored, skipping fetch", id.as_str());
        return Ok(Outcome::Existing);
    }

    let raw = match remote.get_message(credential, id) {
        Ok(raw) => raw,
        // A rejected credential fails every remaining fetch too
        Err(e) if e.is_auth() => {
            error!("Credential rejected while fetching {}: {}", id.as_str(), e);
            return Err(e.into());
        }
        Err(e) if options.abort_on_fetch_error => {
            error!("Aborting sync at message {}: {}", id.as_str(), e);
            return Err(e.into());
        }
        Err(e) => {
            warn!("Skipping message {}: {}", id.as_str(), e);
            return Ok(Outcome::Failed);
        }
    };

    let message = match normalize_message(raw) {
        Ok(message) => message,
        Err(e) => {
            warn!("Skipping message {}: {}", id.as_str(), e);
            return Ok(Outcome::Failed);
        }
    };

    if import_if_new(store, account_id, &message)? {
        Ok(Outcome::Inserted)
    } else {
        Ok(Outcome::Existing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gmail::RemoteError;
    use crate::gmail::api::{GmailMessage, Header, MessagePayload};
    use crate::models::Account;
    use crate::storage::InMemoryMailStore;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Scripted provider: listing result plus per-ID detail responses
    struct FakeRemote {
        list: Result<Vec<&'static str>, u16>,
        details: HashMap<&'static str, Result<GmailMessage, u16>>,
        fetched: Mutex<Vec<String>>,
    }

    impl FakeRemote {
        fn new(ids: Vec<&'static str>) -> Self {
            let details = ids.iter().map(|id| (*id, Ok(gmail_message(id)))).collect();
            Self {
                list: Ok(ids),
                details,
                fetched: Mutex::new(Vec::new()),
            }
        }

        fn fail_detail(mut self, id: &'static str, status: u16) -> Self {
            self.details.insert(id, Err(status));
            self
        }

        fn fetched(&self) -> Vec<String> {
            self.fetched.lock().unwrap().clone()
        }
    }

    fn status_error(operation: &'static str, status: u16) -> RemoteError {
        if status == 401 {
            RemoteError::Auth { status }
        } else {
            RemoteError::Provider { operation, status }
        }
    }

    impl RemoteMailbox for FakeRemote {
        fn list_message_ids(
            &self,
            _credential: &Credential,
            _max_results: usize,
            _query: &str,
        ) -> Result<Vec<MessageId>, RemoteError> {
            match &self.list {
                Ok(ids) => Ok(ids.iter().map(|id| MessageId::new(*id)).collect()),
                Err(status) => Err(status_error("list messages", *status)),
            }
        }

        fn get_message(
            &self,
            _credential: &Credential,
            id: &MessageId,
        ) -> Result<GmailMessage, RemoteError> {
            self.fetched.lock().unwrap().push(id.0.clone());
            match self.details.get(id.as_str()) {
                Some(Ok(msg)) => Ok(msg.clone()),
                Some(Err(status)) => Err(status_error("get message", *status)),
                None => Err(status_error("get message", 404)),
            }
        }
    }

    fn gmail_message(id: &str) -> GmailMessage {
        GmailMessage {
            id: id.to_string(),
            thread_id: format!("thread-{}", id),
            label_ids: Some(vec!["INBOX".to_string(), "UNREAD".to_string()]),
            snippet: format!("Snippet {}", id),
            payload: Some(MessagePayload {
                headers: Some(vec![
                    Header {
                        name: "From".to_string(),
                        value: "Jane Doe <jane@x.com>".to_string(),
                    },
                    Header {
                        name: "Subject".to_string(),
                        value: format!("Subject {}", id),
                    },
                    Header {
                        name: "Date".to_string(),
                        value: "Mon, 10 Feb 2025 10:00:00 +0000".to_string(),
                    },
                ]),
                ..Default::default()
            }),
        }
    }

    fn linked_store() -> (InMemoryMailStore, Account) {
        let store = InMemoryMailStore::new();
        let account = store
            .create_account(
                Account::new("user-1", "user@example.com").with_credential(Credential::new("tok")),
            )
            .unwrap();
        (store, account)
    }

    #[test]
    fn test_sync_imports_listed_messages() {
        let (store, account) = linked_store();
        let remote = FakeRemote::new(vec!["a", "b"]);

        let before = Utc::now();
        let report = sync_account(&remote, &store, "user-1", &SyncOptions::default()).unwrap();

        assert_eq!(report.attempted, 2);
        assert_eq!(report.inserted, 2);
        assert_eq!(store.count_messages(account.id).unwrap(), 2);
        let synced_at = store
            .find_account_for_user("user-1")
            .unwrap()
            .unwrap()
            .last_synced_at
            .unwrap();
        assert!(synced_at >= before);
    }

    #[test]
    fn test_second_sync_inserts_nothing() {
        let (store, account) = linked_store();
        let remote = FakeRemote::new(vec!["a", "b"]);
        sync_account(&remote, &store, "user-1", &SyncOptions::default()).unwrap();

        let report = sync_account(&remote, &store, "user-1", &SyncOptions::default()).unwrap();
        assert_eq!(report.attempted, 2);
        assert_eq!(report.inserted, 0);
        assert_eq!(report.skipped_existing, 2);
        assert_eq!(store.count_messages(account.id).unwrap(), 2);
        // Existing messages are not fetched again
        assert_eq!(remote.fetched().len(), 2);
    }

    #[test]
    fn test_known_id_skips_fetch_and_import() {
        let (store, account) = linked_store();
        let stored = normalize_message(gmail_message("a")).unwrap();
        assert!(import_if_new(&store, account.id, &stored).unwrap());
        let id = store.list_messages(account.id).unwrap()[0].id;
        store.set_starred(id, true).unwrap();

        let remote = FakeRemote::new(vec!["a", "b"]);
        let report = sync_account(&remote, &store, "user-1", &SyncOptions::default()).unwrap();

        assert_eq!(report.skipped_existing, 1);
        assert_eq!(report.inserted, 1);
        assert_eq!(remote.fetched(), vec!["b".to_string()]);
        let message = store.get_message(id).unwrap().unwrap();
        assert!(message.message.is_starred);
    }

    #[test]
    fn test_unlinked_user() {
        let (store, _) = linked_store();
        let remote = FakeRemote::new(vec!["a"]);
        let err = sync_account(&remote, &store, "nobody", &SyncOptions::default()).unwrap_err();
        assert!(matches!(err, SyncError::AccountNotLinked { .. }));
        assert!(remote.fetched().is_empty());
    }

    #[test]
    fn test_missing_or_blank_credential() {
        let store = InMemoryMailStore::new();
        store
            .create_account(Account::new("no-cred", "a@example.com"))
            .unwrap();
        store
            .create_account(
                Account::new("blank-cred", "b@example.com").with_credential(Credential::new(" ")),
            )
            .unwrap();
        let remote = FakeRemote::new(vec!["a"]);

        for user in ["no-cred", "blank-cred"] {
            let err = sync_account(&remote, &store, user, &SyncOptions::default()).unwrap_err();
            assert!(matches!(err, SyncError::CredentialMissing { .. }));
        }
        assert!(remote.fetched().is_empty());
    }

    #[test]
    fn test_listing_failure_aborts_run() {
        let (store, account) = linked_store();
        let mut remote = FakeRemote::new(vec![]);
        remote.list = Err(401);

        let err = sync_account(&remote, &store, "user-1", &SyncOptions::default()).unwrap_err();
        assert_eq!(err.status_code(), 401);
        assert!(
            store
                .find_account_for_user("user-1")
                .unwrap()
                .unwrap()
                .last_synced_at
                .is_none()
        );
        assert_eq!(store.count_messages(account.id).unwrap(), 0);
    }

    #[test]
    fn test_failed_detail_is_skipped_by_default() {
        let (store, account) = linked_store();
        let remote = FakeRemote::new(vec!["a", "b", "c"]).fail_detail("b", 500);

        let report = sync_account(&remote, &store, "user-1", &SyncOptions::default()).unwrap();
        assert_eq!(report.attempted, 3);
        assert_eq!(report.inserted, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(store.count_messages(account.id).unwrap(), 2);
    }

    #[test]
    fn test_failed_detail_aborts_when_configured() {
        let (store, account) = linked_store();
        let remote = FakeRemote::new(vec!["a", "b", "c"]).fail_detail("b", 500);
        let options = SyncOptions {
            abort_on_fetch_error: true,
            ..Default::default()
        };

        let err = sync_account(&remote, &store, "user-1", &options).unwrap_err();
        assert_eq!(err.status_code(), 502);
        assert_eq!(store.count_messages(account.id).unwrap(), 1);
        assert_eq!(remote.fetched(), vec!["a", "b"]);
        assert!(
            store
                .find_account_for_user("user-1")
                .unwrap()
                .unwrap()
                .last_synced_at
                .is_none()
        );
    }

    #[test]
    fn test_auth_failure_mid_batch_always_aborts() {
        let (store, _) = linked_store();
        let remote = FakeRemote::new(vec!["a", "b", "c"]).fail_detail("b", 401);

        let err = sync_account(&remote, &store, "user-1", &SyncOptions::default()).unwrap_err();
        assert!(matches!(err, SyncError::Remote(ref e) if e.is_auth()));
        assert_eq!(remote.fetched(), vec!["a", "b"]);
    }

    #[test]
    fn test_unnormalizable_message_is_skipped() {
        let (store, account) = linked_store();
        let mut remote = FakeRemote::new(vec!["a", "b"]);
        let mut broken = gmail_message("b");
        broken.payload = Some(MessagePayload::default());
        remote.details.insert("b", Ok(broken));

        let report = sync_account(&remote, &store, "user-1", &SyncOptions::default()).unwrap();
        assert_eq!(report.attempted, 2);
        assert_eq!(report.inserted, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(store.count_messages(account.id).unwrap(), 1);
    }
}
