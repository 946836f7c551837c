//! Query API for UI consumption
//!
//! Provides read-only access to mail data in formats suitable for display.

mod messages;

pub use messages::{MessageSummary, NO_SUBJECT, View, list_messages, unread_count};
