//! Domain models for mail entities

mod account;
mod draft;
mod label;
mod message;
mod preferences;

pub use account::{Account, Credential};
pub use draft::Draft;
pub use label::{Category, INBOX_LABEL, STARRED_LABEL, UNREAD_LABEL};
pub use message::{EmailAddress, Message, MessageBuilder, MessageId, StoredMessage, ThreadId};
pub use preferences::{DraftLength, DraftPreferences, DraftTone};
