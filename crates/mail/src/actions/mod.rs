//! Action handlers for email mutations
//!
//! Provides operations that modify local mail state (star, read, drafts).

mod handler;

pub use handler::{ActionHandler, FlagUpdater};
