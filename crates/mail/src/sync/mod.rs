//! Sync engine for fetching and storing mail
//!
//! Provides idempotent sync operations that can be safely retried.

mod importer;
mod inbox;

pub use importer::import_if_new;
pub use inbox::{SyncOptions, SyncReport, sync_account};
