use super::{PanelState, RequestTracker, Ticket};
use crate::api::ApiError;
use crate::models::Draft;
use std::collections::BTreeSet;
use tracing::{info, warn};

#[derive(Debug, Default)]
pub struct DraftsPanel {
    pub state: PanelState<Vec<Draft>>,
    pub cursor: usize,
    pub checked: BTreeSet<i64>,
    pub deleting: bool,
    seen_refresh: u64,
    tracker: RequestTracker,
}

impl DraftsPanel {
    pub fn drafts(&self) -> &[Draft] {
        self.state.loaded().map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn current(&self) -> Option<&Draft> {
        self.drafts().get(self.cursor)
    }

    pub fn move_down(&mut self) {
        if self.cursor < self.drafts().len().saturating_sub(1) {
            self.cursor += 1;
        }
    }

    pub fn move_up(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn toggle_checked(&mut self) {
        let Some(id) = self.current().map(|d| d.id) else {
            return;
        };
        if !self.checked.remove(&id) {
            self.checked.insert(id);
        }
    }

    pub fn is_checked(&self, id: i64) -> bool {
        self.checked.contains(&id)
    }

    /// Leaving the drafts view forgets the checked items.
    pub fn clear_selection(&mut self) {
        self.checked.clear();
    }

    /// Drafts a delete would act on: the checked set, or the draft under the cursor.
    pub fn delete_targets(&self) -> Vec<i64> {
        if self.checked.is_empty() {
            self.current().map(|d| vec![d.id]).unwrap_or_default()
        } else {
            self.checked.iter().copied().collect()
        }
    }

    pub fn needs_refresh(&self, counter: u64) -> bool {
        counter != self.seen_refresh
    }

    pub fn begin_load(&mut self, refresh_counter: u64) -> Ticket {
        self.seen_refresh = refresh_counter;
        self.state = PanelState::Loading;
        self.tracker.issue()
    }

    pub fn finish_load(&mut self, ticket: Ticket, result: Result<Vec<Draft>, ApiError>) {
        if !self.tracker.is_current(ticket) {
            return;
        }
        if let Err(e) = &result {
            warn!(error = %e, "drafts load failed");
        }
        self.state.settle(result);
        // Checked ids that no longer exist are meaningless
        let present: BTreeSet<i64> = self.drafts().iter().map(|d| d.id).collect();
        self.checked.retain(|id| present.contains(id));
        self.cursor = self.cursor.min(self.drafts().len().saturating_sub(1));
    }

    pub fn begin_delete(&mut self) -> bool {
        if self.deleting {
            return false;
        }
        self.deleting = true;
        true
    }

    /// Removes the requested drafts only once the backend confirmed the delete.
    /// On failure nothing changes and the message to alert with is returned.
    pub fn finish_delete(&mut self, ids: &[i64], result: Result<Vec<i64>, ApiError>) -> Result<usize, String> {
        self.deleting = false;
        match result {
            Ok(deleted) => {
                info!(requested = ids.len(), confirmed = deleted.len(), "drafts removed");
                if let Some(drafts) = self.state.loaded_mut() {
                    drafts.retain(|d| !ids.contains(&d.id));
                }
                self.checked.clear();
                self.cursor = self.cursor.min(self.drafts().len().saturating_sub(1));
                Ok(ids.len())
            }
            Err(e) => {
                warn!(?ids, error = %e, "draft delete failed");
                Err(e.user_message())
            }
        }
    }
}
