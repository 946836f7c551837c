//! Mailbox UI state container
//!
//! Holds the active view, the selected message, the compose target and the
//! loaded message list, so view switching and reply prefill stay
//! deterministic. Flag changes are applied optimistically and rolled back
//! when persisting them fails.

use anyhow::{Result, anyhow};
use log::warn;
use std::path::PathBuf;
use std::time::Duration;

use crate::actions::{ActionHandler, FlagUpdater};
use crate::drafts::{
    CancelToken, ComposeDraft, DraftError, DraftRequest, DraftStream, ReplyContext,
    draft_template,
};
use crate::error::SyncError;
use crate::models::{Draft, DraftPreferences};
use crate::query::{self, MessageSummary, View};
use crate::storage::MailStore;
use crate::sync::SyncReport;

/// Severity of a notice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
}

/// Non-blocking notification for the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub title: String,
    pub description: String,
}

impl Notice {
    pub fn success(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Success,
            title: title.into(),
            description: description.into(),
        }
    }

    pub fn error(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            title: title.into(),
            description: description.into(),
        }
    }
}

/// Open compose dialog
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComposeTarget {
    /// Message being replied to, if any
    pub reply_to: Option<ReplyContext>,
    pub draft: ComposeDraft,
    /// Set once the body has been filled by the draft generator
    pub generated_by_ai: bool,
}

#[derive(Clone, Copy)]
enum Flag {
    Read,
    Starred,
}

impl Flag {
    fn get(self, message: &MessageSummary) -> bool {
        match self {
            Flag::Read => message.is_read,
            Flag::Starred => message.is_starred,
        }
    }

    fn set(self, message: &mut MessageSummary, value: bool) {
        match self {
            Flag::Read => message.is_read = value,
            Flag::Starred => message.is_starred = value,
        }
    }

    fn persist(self, updater: &dyn FlagUpdater, id: i64, value: bool) -> Result<()> {
        match self {
            Flag::Read => updater.set_read(id, value),
            Flag::Starred => updater.set_starred(id, value),
        }
    }
}

/// Application state for one mailbox
#[derive(Debug, Default)]
pub struct MailboxState {
    view: View,
    selected: Option<i64>,
    compose: Option<ComposeTarget>,
    messages: Vec<MessageSummary>,
    notices: Vec<Notice>,
    preferences: DraftPreferences,
    /// Where preferences are persisted; the config directory when unset
    preferences_path: Option<PathBuf>,
}

impl MailboxState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Persist preferences to `path` instead of the config directory
    pub fn with_preferences_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.preferences_path = Some(path.into());
        self
    }

    /// Read saved draft preferences, keeping defaults when none were saved
    pub fn load_preferences(&mut self) -> Result<()> {
        self.preferences = match &self.preferences_path {
            Some(path) => DraftPreferences::load_from(path)?,
            None => DraftPreferences::load()?,
        };
        Ok(())
    }

    pub fn preferences(&self) -> &DraftPreferences {
        &self.preferences
    }

    /// Save new draft preferences. The previous ones stay active when
    /// saving fails.
    pub fn set_preferences(&mut self, preferences: DraftPreferences) -> Result<()> {
        let saved = match &self.preferences_path {
            Some(path) => preferences.save_to(path),
            None => preferences.save(),
        };
        match saved {
            Ok(()) => {
                self.preferences = preferences;
                self.notices.push(Notice::success(
                    "Settings saved",
                    "Your AI preferences have been updated.",
                ));
                Ok(())
            }
            Err(e) => {
                warn!("Failed to save preferences: {:#}", e);
                self.notices
                    .push(Notice::error("Could not save settings", format!("{:#}", e)));
                Err(e)
            }
        }
    }

    /// Replace the message list with the account's stored messages
    pub fn load(&mut self, store: &dyn MailStore, account_id: i64) -> Result<()> {
        self.messages = query::list_messages(store, account_id)?;
        if let Some(id) = self.selected
            && self.find(id).is_none()
        {
            self.selected = None;
        }
        Ok(())
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn messages(&self) -> &[MessageSummary] {
        &self.messages
    }

    /// Messages shown in the active view, newest first
    pub fn visible_messages(&self) -> Vec<&MessageSummary> {
        self.messages
            .iter()
            .filter(|m| self.view.includes(m))
            .collect()
    }

    pub fn unread_count(&self) -> usize {
        query::unread_count(&self.messages)
    }

    pub fn selected(&self) -> Option<&MessageSummary> {
        self.selected.and_then(|id| self.find(id))
    }

    pub fn compose(&self) -> Option<&ComposeTarget> {
        self.compose.as_ref()
    }

    pub fn compose_mut(&mut self) -> Option<&mut ComposeTarget> {
        self.compose.as_mut()
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    /// Remove and return pending notices
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// Switch views. Clears the selection; `Compose` opens a blank dialog.
    pub fn set_view(&mut self, view: View) {
        self.view = view;
        self.selected = None;
        if view == View::Compose {
            self.compose = Some(ComposeTarget::default());
        }
    }

    /// Select a message and mark it read
    pub fn select(&mut self, id: i64, updater: &dyn FlagUpdater) -> Result<()> {
        if self.find(id).is_none() {
            return Err(anyhow!("Message {} is not loaded", id));
        }
        self.selected = Some(id);
        self.update_flag(id, Flag::Read, true, updater)
    }

    /// Flip the starred flag of a loaded message
    pub fn toggle_star(&mut self, id: i64, updater: &dyn FlagUpdater) -> Result<()> {
        let starred = self
            .find(id)
            .map(|m| m.is_starred)
            .ok_or_else(|| anyhow!("Message {} is not loaded", id))?;
        self.update_flag(id, Flag::Starred, !starred, updater)
    }

    pub fn mark_as_read(&mut self, id: i64, updater: &dyn FlagUpdater) -> Result<()> {
        self.update_flag(id, Flag::Read, true, updater)
    }

    /// Open the compose dialog as a reply to the selected message.
    ///
    /// Returns false when nothing is selected.
    pub fn reply(&mut self) -> bool {
        let Some(selected) = self.selected() else {
            return false;
        };

        let reply_to = ReplyContext {
            email: selected.from_email.clone(),
            subject: selected.subject.clone(),
            body: selected.body.clone(),
        };
        self.compose = Some(ComposeTarget {
            draft: ComposeDraft::for_reply(&reply_to),
            reply_to: Some(reply_to),
            generated_by_ai: false,
        });
        true
    }

    pub fn close_compose(&mut self) {
        self.compose = None;
    }

    /// Fill the compose body from the draft generator.
    ///
    /// The body is updated after every chunk, so a cancelled run leaves the
    /// partial text in place.
    pub fn generate_draft(
        &mut self,
        prompt: &str,
        delay: Duration,
        cancel: CancelToken,
    ) -> Result<(), DraftError> {
        let Some(compose) = self.compose.as_mut() else {
            return Err(DraftError::NeedContext);
        };

        let request = DraftRequest {
            reply_to: compose.reply_to.clone(),
            prompt: prompt.to_string(),
        };
        let text = match draft_template(&request) {
            Ok(text) => text,
            Err(e) => {
                self.notices.push(Notice::error("Need context", e.to_string()));
                return Err(e);
            }
        };

        DraftStream::new(&text)
            .with_delay(delay)
            .with_cancel_token(cancel)
            .play(|partial| compose.draft.body = partial.to_string())?;

        compose.generated_by_ai = true;
        self.notices.push(Notice::success(
            "Draft generated",
            "AI has generated your email draft. Feel free to edit before sending.",
        ));
        Ok(())
    }

    /// Persist the open compose dialog as a draft and close it
    pub fn save_compose(&mut self, actions: &ActionHandler, account_id: i64) -> Result<Draft> {
        let compose = self
            .compose
            .as_ref()
            .ok_or_else(|| anyhow!("No compose dialog is open"))?;

        match actions.save_draft(account_id, &compose.draft, compose.generated_by_ai) {
            Ok(draft) => {
                self.compose = None;
                self.notices
                    .push(Notice::success("Draft saved", "Your draft has been saved."));
                Ok(draft)
            }
            Err(e) => {
                self.notices
                    .push(Notice::error("Could not save draft", e.to_string()));
                Err(e)
            }
        }
    }

    /// Record the result of a sync run.
    ///
    /// The message list is never touched here; callers reload after a
    /// successful run.
    pub fn apply_sync_outcome(&mut self, outcome: &Result<SyncReport, SyncError>) {
        let notice = match outcome {
            Ok(report) => Notice::success(
                "Sync complete",
                format!(
                    "Synced {} messages ({} new)",
                    report.attempted, report.inserted
                ),
            ),
            Err(e) => {
                warn!("Sync failed: {}", e);
                Notice::error("Sync failed", e.to_string())
            }
        };
        self.notices.push(notice);
    }

    fn find(&self, id: i64) -> Option<&MessageSummary> {
        self.messages.iter().find(|m| m.id == id)
    }

    fn find_mut(&mut self, id: i64) -> Option<&mut MessageSummary> {
        self.messages.iter_mut().find(|m| m.id == id)
    }

    fn update_flag(
        &mut self,
        id: i64,
        flag: Flag,
        value: bool,
        updater: &dyn FlagUpdater,
    ) -> Result<()> {
        let message = self
            .find_mut(id)
            .ok_or_else(|| anyhow!("Message {} is not loaded", id))?;
        let previous = flag.get(message);
        if previous == value {
            return Ok(());
        }
        flag.set(message, value);

        if let Err(e) = flag.persist(updater, id, value) {
            warn!("Rolling back update to message {}: {:#}", id, e);
            if let Some(message) = self.find_mut(id) {
                flag.set(message, previous);
            }
            self.notices
                .push(Notice::error("Update failed", format!("{:#}", e)));
            return Err(e);
        }
        Ok(())
    }
}
