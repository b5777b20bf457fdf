pub mod chat;
pub mod draft_detail;
pub mod drafts;
pub mod email_detail;
pub mod inbox;
pub mod prompts;

use crate::api::ApiError;
use tracing::debug;

/// Fetch lifecycle shared by every panel.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum PanelState<T> {
    #[default]
    Idle,
    Loading,
    Loaded(T),
    Failed(String),
}

impl<T> PanelState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, PanelState::Loading)
    }

    pub fn loaded(&self) -> Option<&T> {
        match self {
            PanelState::Loaded(value) => Some(value),
            _ => None,
        }
    }

    pub fn loaded_mut(&mut self) -> Option<&mut T> {
        match self {
            PanelState::Loaded(value) => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            PanelState::Failed(message) => Some(message),
            _ => None,
        }
    }

    fn settle(&mut self, result: Result<T, ApiError>) {
        *self = match result {
            Ok(value) => PanelState::Loaded(value),
            Err(e) => PanelState::Failed(e.user_message()),
        };
    }
}

/// Identifies one outstanding request. A completion whose ticket is no
/// longer the latest one issued by its panel is dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

#[derive(Debug, Default)]
pub struct RequestTracker {
    latest: u64,
}

impl RequestTracker {
    pub fn issue(&mut self) -> Ticket {
        self.latest += 1;
        Ticket(self.latest)
    }

    /// Invalidate whatever is in flight without starting a new request.
    pub fn invalidate(&mut self) {
        self.latest += 1;
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        let current = ticket.0 == self.latest;
        if !current {
            debug!(ticket = ticket.0, latest = self.latest, "dropping stale response");
        }
        current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracker_only_latest_is_current() {
        let mut tracker = RequestTracker::default();
        let first = tracker.issue();
        let second = tracker.issue();
        assert!(!tracker.is_current(first));
        assert!(tracker.is_current(second));
        tracker.invalidate();
        assert!(!tracker.is_current(second));
    }

    #[test]
    fn test_settle_maps_error_to_message() {
        let mut state: PanelState<Vec<i64>> = PanelState::Loading;
        state.settle(Err(ApiError::Request("bad".into())));
        assert_eq!(state.error(), Some(crate::api::GENERIC_ERROR));
        state.settle(Ok(vec![1]));
        assert_eq!(state.loaded(), Some(&vec![1]));
    }
}
