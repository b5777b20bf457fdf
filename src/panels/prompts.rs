//! Prompt Brain: the editable prompt table that steers categorization, task
//! extraction and reply drafting on the backend.

use super::{PanelState, RequestTracker, Ticket};
use crate::api::ApiError;
use crate::models::{PromptMap, PromptUpdate};
use std::collections::BTreeMap;
use tracing::{info, warn};

#[derive(Debug, Default)]
pub struct PromptsPanel {
    pub state: PanelState<PromptMap>,
    pub cursor: usize,
    /// Unsaved text per key.
    pub edits: BTreeMap<String, String>,
    pub saving: Option<String>,
    pub status: Option<String>,
    tracker: RequestTracker,
}

impl PromptsPanel {
    pub fn keys(&self) -> Vec<&str> {
        self.state
            .loaded()
            .map(|prompts| prompts.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn current_key(&self) -> Option<String> {
        self.keys().get(self.cursor).map(|k| k.to_string())
    }

    pub fn move_down(&mut self) {
        if self.cursor < self.keys().len().saturating_sub(1) {
            self.cursor += 1;
        }
    }

    pub fn move_up(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    /// The text to show for a key: the local edit if there is one.
    pub fn text(&self, key: &str) -> Option<&str> {
        self.edits
            .get(key)
            .or_else(|| self.state.loaded().and_then(|p| p.get(key)))
            .map(String::as_str)
    }

    pub fn is_dirty(&self, key: &str) -> bool {
        match (self.edits.get(key), self.state.loaded().and_then(|p| p.get(key))) {
            (Some(edit), Some(saved)) => edit != saved,
            (Some(_), None) => true,
            _ => false,
        }
    }

    pub fn edit(&mut self, key: &str, text: String) {
        self.edits.insert(key.to_string(), text);
    }

    pub fn begin_load(&mut self) -> Ticket {
        self.state = PanelState::Loading;
        self.tracker.issue()
    }

    pub fn finish_load(&mut self, ticket: Ticket, result: Result<PromptMap, ApiError>) {
        if !self.tracker.is_current(ticket) {
            return;
        }
        if let Err(e) = &result {
            warn!(error = %e, "prompts load failed");
        }
        self.state.settle(result);
        self.cursor = self.cursor.min(self.keys().len().saturating_sub(1));
    }

    /// Returns the key and text to send, or `None` when a save is already
    /// running or there is nothing to save.
    pub fn begin_save(&mut self, key: &str) -> Option<(String, String)> {
        if self.saving.is_some() {
            return None;
        }
        let text = self.text(key)?.to_string();
        self.saving = Some(key.to_string());
        self.status = None;
        Some((key.to_string(), text))
    }

    pub fn finish_save(&mut self, key: &str, text: &str, result: Result<PromptUpdate, ApiError>) {
        self.saving = None;
        match result {
            Ok(update) => {
                info!(key, ?update, "prompt saved");
                if let Some(prompts) = self.state.loaded_mut() {
                    prompts.insert(key.to_string(), text.to_string());
                }
                // A newer edit typed while saving stays pending
                if self.edits.get(key).map(String::as_str) == Some(text) {
                    self.edits.remove(key);
                }
                self.status = Some(match update {
                    PromptUpdate::Updated => format!("Saved \"{}\"", key),
                    PromptUpdate::Created => format!("Created \"{}\"", key),
                });
            }
            Err(e) => {
                warn!(key, error = %e, "prompt save failed");
                self.status = Some(format!("Could not save \"{}\": {}", key, e.user_message()));
            }
        }
    }
}
