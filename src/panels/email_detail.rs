use super::{PanelState, RequestTracker, Ticket};
use crate::api::ApiError;
use crate::models::Email;
use tracing::warn;

#[derive(Debug, Default)]
pub struct EmailDetailPanel {
    pub email_id: Option<i64>,
    pub state: PanelState<Email>,
    pub scroll: u16,
    tracker: RequestTracker,
}

impl EmailDetailPanel {
    pub fn email(&self) -> Option<&Email> {
        self.state.loaded()
    }

    pub fn begin_load(&mut self, email_id: i64) -> Ticket {
        self.email_id = Some(email_id);
        self.state = PanelState::Loading;
        self.scroll = 0;
        self.tracker.issue()
    }

    /// Applies the response only if it is still for the email on screen.
    pub fn finish_load(&mut self, ticket: Ticket, email_id: i64, result: Result<Email, ApiError>) {
        if !self.tracker.is_current(ticket) || self.email_id != Some(email_id) {
            return;
        }
        if let Err(e) = &result {
            warn!(email_id, error = %e, "email detail load failed");
        }
        self.state.settle(result);
    }

    pub fn clear(&mut self) {
        self.email_id = None;
        self.state = PanelState::Idle;
        self.scroll = 0;
        self.tracker.invalidate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    fn email(id: i64) -> Email {
        serde_json::from_value(serde_json::json!({"id": id, "sender": "s", "subject": format!("#{}", id)})).unwrap()
    }

    #[test]
    fn test_response_for_previous_selection_is_dropped() {
        let mut panel = EmailDetailPanel::default();
        let first = panel.begin_load(1);
        let second = panel.begin_load(2);
        panel.finish_load(first, 1, Ok(email(1)));
        assert!(panel.state.is_loading());
        panel.finish_load(second, 2, Ok(email(2)));
        assert_eq!(panel.email().map(|e| e.id), Some(2));
    }

    #[test]
    fn test_clear_drops_in_flight_response() {
        let mut panel = EmailDetailPanel::default();
        let ticket = panel.begin_load(1);
        panel.clear();
        panel.finish_load(ticket, 1, Ok(email(1)));
        assert_eq!(panel.state, PanelState::Idle);
    }

    #[test]
    fn test_not_found_shows_backend_detail() {
        let mut panel = EmailDetailPanel::default();
        let ticket = panel.begin_load(99);
        panel.finish_load(
            ticket,
            99,
            Err(ApiError::Status {
                status: StatusCode::NOT_FOUND,
                detail: Some("Email not found".into()),
            }),
        );
        assert_eq!(panel.state.error(), Some("Email not found"));
    }
}
