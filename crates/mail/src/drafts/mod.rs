//! Scripted draft generation
//!
//! Drafts are produced from a fixed template and played back word by word,
//! so callers can render them incrementally and cancel midway.

mod stream;
mod template;

pub use stream::{CancelToken, DraftStream};
pub use template::{ComposeDraft, DraftRequest, ReplyContext, draft_template};

/// Failure producing a draft
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DraftError {
    /// Neither a prompt nor a message to reply to was given
    #[error("Please provide a prompt or reply to an existing email")]
    NeedContext,

    #[error("Draft generation was cancelled")]
    Cancelled,
}
