//! Mail crate - Business logic for the webmail sync service
//!
//! This crate provides:
//! - Domain models (Message, Account, Draft)
//! - Gmail API client and response normalization
//! - Storage trait with SQLite and in-memory implementations
//! - Idempotent, deduplicating sync engine
//! - Query API and mailbox state for UI consumption
//! - Action handlers for mutations (star, read, drafts)
//! - Scripted draft generation

pub mod actions;
pub mod auth;
pub mod config;
pub mod drafts;
pub mod error;
pub mod gmail;
pub mod models;
pub mod query;
pub mod state;
pub mod storage;
pub mod sync;

pub use actions::{ActionHandler, FlagUpdater};
pub use auth::authenticate;
pub use config::ServiceConfig;
pub use drafts::{
    CancelToken, ComposeDraft, DraftError, DraftRequest, DraftStream, ReplyContext,
    draft_template,
};
pub use error::SyncError;
pub use gmail::{GmailClient, NormalizeError, RemoteError, RemoteMailbox, normalize_message};
pub use models::{
    Account, Category, Credential, Draft, DraftLength, DraftPreferences, DraftTone, EmailAddress,
    Message, MessageId, StoredMessage, ThreadId,
};
pub use query::{MessageSummary, View, list_messages, unread_count};
pub use state::{ComposeTarget, MailboxState, Notice, NoticeKind};
pub use storage::{InMemoryMailStore, MailStore, SqliteMailStore};
pub use sync::{SyncOptions, SyncReport, import_if_new, sync_account};
