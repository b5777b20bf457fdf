use super::{PanelState, RequestTracker, Ticket};
use crate::api::ApiError;
use crate::models::{Email, IngestReport};
use tracing::{info, warn};

#[derive(Debug, Default)]
pub struct InboxPanel {
    pub state: PanelState<Vec<Email>>,
    pub selected_index: usize,
    pub ingesting: bool,
    pub status: Option<String>,
    seen_refresh: u64,
    cursor_id: Option<i64>,
    tracker: RequestTracker,
}

impl InboxPanel {
    pub fn emails(&self) -> &[Email] {
        self.state.loaded().map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn selected(&self) -> Option<&Email> {
        self.emails().get(self.selected_index)
    }

    pub fn select_next(&mut self) {
        if self.selected_index < self.emails().len().saturating_sub(1) {
            self.selected_index += 1;
        }
        self.cursor_id = self.selected().map(|e| e.id);
    }

    pub fn select_prev(&mut self) {
        self.selected_index = self.selected_index.saturating_sub(1);
        self.cursor_id = self.selected().map(|e| e.id);
    }

    /// Whether the shell's refresh counter has moved since the last load.
    pub fn needs_refresh(&self, counter: u64) -> bool {
        counter != self.seen_refresh
    }

    pub fn begin_load(&mut self, refresh_counter: u64) -> Ticket {
        self.seen_refresh = refresh_counter;
        if let Some(email) = self.selected() {
            self.cursor_id = Some(email.id);
        }
        self.state = PanelState::Loading;
        self.tracker.issue()
    }

    pub fn finish_load(&mut self, ticket: Ticket, result: Result<Vec<Email>, ApiError>) {
        if !self.tracker.is_current(ticket) {
            return;
        }
        if let Err(e) = &result {
            warn!(error = %e, "inbox load failed");
        }
        self.state.settle(result);
        // Keep the cursor on the same email when it survives the reload
        let emails = self.emails();
        let index = self
            .cursor_id
            .and_then(|id| emails.iter().position(|e| e.id == id))
            .unwrap_or_else(|| self.selected_index.min(emails.len().saturating_sub(1)));
        self.selected_index = index;
    }

    /// The "Load Mock" control. Disabled only while an ingestion is running.
    pub fn can_ingest(&self) -> bool {
        !self.ingesting
    }

    pub fn begin_ingest(&mut self) -> bool {
        if self.ingesting {
            return false;
        }
        self.ingesting = true;
        self.status = Some("Processing inbox…".to_string());
        true
    }

    /// Returns true when the inbox should be reloaded.
    pub fn finish_ingest(&mut self, result: Result<IngestReport, ApiError>) -> bool {
        self.ingesting = false;
        match result {
            Ok(report) => {
                info!(processed = report.processed, "inbox ingestion complete");
                self.status = Some(if report.errors.is_empty() {
                    format!("Processed {} emails", report.processed)
                } else {
                    format!(
                        "Processed {} emails, {} failed",
                        report.processed,
                        report.errors.len()
                    )
                });
                true
            }
            Err(e) => {
                warn!(error = %e, "inbox ingestion failed");
                self.status = Some(e.user_message());
                false
            }
        }
    }
}
