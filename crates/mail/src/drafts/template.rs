//! Draft text template and compose fields

use serde::{Deserialize, Serialize};

use super::DraftError;

/// The message being replied to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyContext {
    /// Address of the original sender
    pub email: String,
    pub subject: String,
    pub body: String,
}

/// Input for generating a draft
#[derive(Debug, Clone, Default)]
pub struct DraftRequest {
    pub reply_to: Option<ReplyContext>,
    /// Free-form description of what the draft should cover
    pub prompt: String,
}

/// Render the draft text for `request`.
///
/// Requires a reply target or a non-blank prompt.
pub fn draft_template(request: &DraftRequest) -> Result<String, DraftError> {
    let prompt = request.prompt.trim();
    if request.reply_to.is_none() && prompt.is_empty() {
        return Err(DraftError::NeedContext);
    }

    let mut paragraphs = Vec::with_capacity(5);

    match &request.reply_to {
        Some(reply) => paragraphs.push(format!(
            "Thank you for your email regarding {}.",
            reply.subject
        )),
        None => paragraphs.push("Thank you for your email.".to_string()),
    }

    if prompt.is_empty() {
        paragraphs.push("I appreciate you reaching out. Let me address your points:".to_string());
    } else {
        paragraphs.push(format!(
            "I appreciate you reaching out about {}. Let me address your points:",
            prompt
        ));
    }

    if let Some(reply) = &request.reply_to {
        paragraphs.push(format!(
            "Regarding your message about {}, I've reviewed the details and here are my thoughts:",
            reply.subject.to_lowercase()
        ));
    }

    paragraphs.push(
        "I look forward to discussing this further. Please let me know if you have any \
         questions or need additional information."
            .to_string(),
    );
    paragraphs.push("Best regards".to_string());

    Ok(paragraphs.join("\n\n"))
}

/// Fields of the compose dialog
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComposeDraft {
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl ComposeDraft {
    /// Prefill recipient and subject for a reply. The body starts empty.
    pub fn for_reply(reply: &ReplyContext) -> Self {
        let subject = if reply.subject.is_empty() {
            String::new()
        } else {
            format!("Re: {}", reply.subject)
        };

        Self {
            to: reply.email.clone(),
            subject,
            body: String::new(),
        }
    }

    /// Whether every field has content
    pub fn can_send(&self) -> bool {
        [&self.to, &self.subject, &self.body]
            .iter()
            .all(|field| !field.trim().is_empty())
    }
}
