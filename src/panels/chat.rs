//! Chat with the agent about the selected email (or the whole inbox).
//!
//! Sent messages are appended before the backend answers and are never
//! removed: a failed reply is recorded as an error entry after them. Draft
//! generation only previews; nothing is persisted until `begin_save`.

use crate::api::ApiError;
use crate::models::{ChatMessage, ChatReply, ChatRequest, Draft, DraftPreview, DraftRequest};
use tracing::{debug, info, warn};

pub const CHAT_ERROR: &str = "Sorry, I couldn't reach the assistant. Please try again.";
pub const DEFAULT_TONE: &str = "friendly";

/// Captured when a request starts; a completion from an older context is
/// not applied to the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChatTicket {
    generation: u64,
    pub email_id: Option<i64>,
}

#[derive(Debug)]
pub struct ChatPanel {
    pub email_id: Option<i64>,
    pub messages: Vec<ChatMessage>,
    pub sending: bool,
    pub generating: bool,
    pub saving: bool,
    /// Open draft editor contents, if any.
    pub editor: Option<DraftPreview>,
    pub tone: String,
    pub chat_prompt_key: Option<String>,
    pub draft_prompt_key: Option<String>,
    generation: u64,
}

impl Default for ChatPanel {
    fn default() -> Self {
        Self {
            email_id: None,
            messages: Vec::new(),
            sending: false,
            generating: false,
            saving: false,
            editor: None,
            tone: DEFAULT_TONE.to_string(),
            chat_prompt_key: None,
            draft_prompt_key: None,
            generation: 0,
        }
    }
}

impl ChatPanel {
    fn ticket(&self) -> ChatTicket {
        ChatTicket {
            generation: self.generation,
            email_id: self.email_id,
        }
    }

    fn is_current(&self, ticket: ChatTicket) -> bool {
        let current = ticket.generation == self.generation;
        if !current {
            debug!(email_id = ?ticket.email_id, "dropping chat response for previous email");
        }
        current
    }

    /// Switch the conversation to another email. History, the editor and any
    /// in-flight responses belong to the old email and are discarded.
    pub fn set_context(&mut self, email_id: Option<i64>) {
        if self.email_id == email_id {
            return;
        }
        self.email_id = email_id;
        self.messages.clear();
        self.editor = None;
        self.sending = false;
        self.generating = false;
        self.saving = false;
        self.generation += 1;
    }

    pub fn begin_send(&mut self, text: &str) -> Option<(ChatTicket, ChatRequest)> {
        let query = text.trim();
        if query.is_empty() || self.sending {
            return None;
        }
        self.messages.push(ChatMessage::user(query));
        self.sending = true;
        Some((
            self.ticket(),
            ChatRequest {
                email_id: self.email_id,
                query: query.to_string(),
                prompt_key: self.chat_prompt_key.clone(),
            },
        ))
    }

    pub fn finish_send(&mut self, ticket: ChatTicket, result: Result<ChatReply, ApiError>) {
        if !self.is_current(ticket) {
            return;
        }
        self.sending = false;
        match result {
            Ok(reply) => self.messages.push(ChatMessage::assistant(reply.reply)),
            Err(e) => {
                warn!(email_id = ?ticket.email_id, error = %e, "chat request failed");
                self.messages.push(ChatMessage::failure(CHAT_ERROR));
            }
        }
    }

    pub fn begin_generate(&mut self) -> Option<(ChatTicket, DraftRequest)> {
        if self.generating {
            return None;
        }
        let Some(email_id) = self.email_id else {
            self.messages
                .push(ChatMessage::failure("Select an email before generating a draft."));
            return None;
        };
        self.generating = true;
        Some((
            self.ticket(),
            DraftRequest {
                email_id,
                tone: self.tone.clone(),
                prompt_key: self.draft_prompt_key.clone(),
                save: false,
            },
        ))
    }

    pub fn finish_generate(&mut self, ticket: ChatTicket, result: Result<DraftPreview, ApiError>) {
        if !self.is_current(ticket) {
            return;
        }
        self.generating = false;
        match result {
            Ok(preview) => {
                info!(email_id = preview.email_id, "draft preview generated");
                self.messages.push(ChatMessage::assistant(format!(
                    "Draft generated: \"{}\". Review it and save when ready.",
                    preview.subject
                )));
                self.editor = Some(preview);
            }
            Err(e) => {
                warn!(email_id = ?ticket.email_id, error = %e, "draft generation failed");
                self.messages.push(ChatMessage::failure(format!(
                    "Could not generate a draft: {}",
                    e.user_message()
                )));
            }
        }
    }

    pub fn update_editor(&mut self, subject: String, body: String) {
        if let Some(editor) = &mut self.editor {
            editor.subject = subject;
            editor.body = body;
        }
    }

    pub fn close_editor(&mut self) {
        self.editor = None;
    }

    pub fn begin_save(&mut self) -> Option<(ChatTicket, DraftPreview)> {
        if self.saving {
            return None;
        }
        let draft = self.editor.clone()?;
        self.saving = true;
        Some((self.ticket(), draft))
    }

    /// Returns the saved draft id. A save always counts once the backend
    /// accepted it, even if the conversation moved on meanwhile, so the
    /// caller can refresh the inbox and drafts.
    pub fn finish_save(&mut self, ticket: ChatTicket, result: Result<Draft, ApiError>) -> Option<i64> {
        let current = self.is_current(ticket);
        if current {
            self.saving = false;
        }
        match result {
            Ok(draft) => {
                if current {
                    self.editor = None;
                    self.messages
                        .push(ChatMessage::assistant(format!("Draft saved (id {}).", draft.id)));
                }
                Some(draft.id)
            }
            Err(e) => {
                warn!(email_id = ?ticket.email_id, error = %e, "draft save failed");
                if current {
                    self.messages.push(ChatMessage::failure(format!(
                        "Could not save the draft: {}",
                        e.user_message()
                    )));
                }
                None
            }
        }
    }
}
