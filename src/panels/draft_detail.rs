use super::{PanelState, RequestTracker, Ticket};
use crate::api::ApiError;
use crate::models::DraftDetail;
use tracing::warn;

#[derive(Debug, Default)]
pub struct DraftDetailPanel {
    pub draft_id: Option<i64>,
    pub state: PanelState<DraftDetail>,
    pub deleting: bool,
    tracker: RequestTracker,
}

impl DraftDetailPanel {
    pub fn detail(&self) -> Option<&DraftDetail> {
        self.state.loaded()
    }

    pub fn begin_load(&mut self, draft_id: i64) -> Ticket {
        self.draft_id = Some(draft_id);
        self.state = PanelState::Loading;
        self.tracker.issue()
    }

    pub fn finish_load(&mut self, ticket: Ticket, draft_id: i64, result: Result<DraftDetail, ApiError>) {
        if !self.tracker.is_current(ticket) || self.draft_id != Some(draft_id) {
            return;
        }
        if let Err(e) = &result {
            warn!(draft_id, error = %e, "draft load failed");
        }
        self.state.settle(result);
    }

    pub fn begin_delete(&mut self) -> Option<i64> {
        if self.deleting || self.detail().is_none() {
            return None;
        }
        self.deleting = true;
        self.draft_id
    }

    /// On success the panel is emptied and the caller navigates back to the
    /// drafts list; on failure the draft stays on screen.
    pub fn finish_delete(&mut self, draft_id: i64, result: Result<(), ApiError>) -> Result<(), String> {
        self.deleting = false;
        match result {
            Ok(()) => {
                if self.draft_id == Some(draft_id) {
                    self.draft_id = None;
                    self.state = PanelState::Idle;
                    self.tracker.invalidate();
                }
                Ok(())
            }
            Err(e) => {
                warn!(draft_id, error = %e, "draft delete failed");
                Err(e.user_message())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Draft;

    fn detail(id: i64) -> DraftDetail {
        DraftDetail {
            draft: Draft {
                id,
                email_id: Some(3),
                subject: "Re: Q3".into(),
                body: "Numbers attached.".into(),
                created_at: None,
            },
            email: None,
        }
    }

    #[test]
    fn test_load_then_delete() {
        let mut panel = DraftDetailPanel::default();
        let ticket = panel.begin_load(8);
        panel.finish_load(ticket, 8, Ok(detail(8)));
        assert_eq!(panel.detail().map(|d| d.draft.id), Some(8));

        let id = panel.begin_delete().unwrap();
        assert!(panel.begin_delete().is_none());
        assert_eq!(panel.finish_delete(id, Ok(())), Ok(()));
        assert_eq!(panel.state, PanelState::Idle);
    }

    #[test]
    fn test_failed_delete_keeps_draft() {
        let mut panel = DraftDetailPanel::default();
        let ticket = panel.begin_load(8);
        panel.finish_load(ticket, 8, Ok(detail(8)));
        let id = panel.begin_delete().unwrap();
        let outcome = panel.finish_delete(id, Err(ApiError::Request("offline".into())));
        assert!(outcome.is_err());
        assert!(panel.detail().is_some());
        assert!(!panel.deleting);
    }
}
