//! Top-level composition of the panels.
//!
//! The shell never talks to the backend itself. Operations return a
//! `Request`; whoever drives the shell runs it (the terminal loop spawns it)
//! and feeds the resulting `Completion` back through `apply`.

use crate::api::{ApiError, Backend};
use crate::models::{
    ChatReply, ChatRequest, Draft, DraftDetail, DraftPreview, DraftRequest, Email, IngestReport,
    PromptMap, PromptUpdate,
};
use crate::panels::{PanelState, Ticket};
use crate::panels::chat::{ChatPanel, ChatTicket};
use crate::panels::draft_detail::DraftDetailPanel;
use crate::panels::drafts::DraftsPanel;
use crate::panels::email_detail::EmailDetailPanel;
use crate::panels::inbox::InboxPanel;
use crate::panels::prompts::PromptsPanel;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum View {
    #[default]
    Inbox,
    Drafts,
    Prompts,
}

impl View {
    pub const ALL: [View; 3] = [View::Inbox, View::Drafts, View::Prompts];

    pub fn title(self) -> &'static str {
        match self {
            View::Inbox => "Inbox",
            View::Drafts => "Drafts",
            View::Prompts => "Prompt Brain",
        }
    }

    pub fn next(self) -> Self {
        match self {
            View::Inbox => View::Drafts,
            View::Drafts => View::Prompts,
            View::Prompts => View::Inbox,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            View::Inbox => View::Prompts,
            View::Drafts => View::Inbox,
            View::Prompts => View::Drafts,
        }
    }
}

/// Destructive actions wait here until the user confirms them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Confirmation {
    DeleteDraft(i64),
    DeleteDrafts(Vec<i64>),
}

impl Confirmation {
    pub fn prompt(&self) -> String {
        match self {
            Confirmation::DeleteDraft(id) => format!("Delete draft #{}?", id),
            Confirmation::DeleteDrafts(ids) if ids.len() == 1 => format!("Delete draft #{}?", ids[0]),
            Confirmation::DeleteDrafts(ids) => format!("Delete {} drafts?", ids.len()),
        }
    }
}

/// Which pane asked for a single-draft delete. The list and the detail
/// pane each track their own in-flight delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOrigin {
    List,
    Detail,
}

/// A backend call the shell wants made.
#[derive(Debug, Clone)]
pub enum Request {
    LoadInbox(Ticket),
    Ingest { reset: bool },
    LoadEmail(Ticket, i64),
    LoadDrafts(Ticket),
    LoadDraft(Ticket, i64),
    LoadPrompts(Ticket),
    SavePrompt { key: String, text: String },
    Chat(ChatTicket, ChatRequest),
    GenerateDraft(ChatTicket, DraftRequest),
    SaveDraft(ChatTicket, DraftPreview),
    DeleteDraft(DeleteOrigin, i64),
    DeleteDrafts(Vec<i64>),
}

#[derive(Debug)]
pub enum Completion {
    Inbox(Ticket, Result<Vec<Email>, ApiError>),
    Ingested(Result<IngestReport, ApiError>),
    Email(Ticket, i64, Result<Email, ApiError>),
    Drafts(Ticket, Result<Vec<Draft>, ApiError>),
    Draft(Ticket, i64, Result<DraftDetail, ApiError>),
    Prompts(Ticket, Result<PromptMap, ApiError>),
    PromptSaved(String, String, Result<PromptUpdate, ApiError>),
    ChatReply(ChatTicket, Result<ChatReply, ApiError>),
    DraftGenerated(ChatTicket, Result<DraftPreview, ApiError>),
    DraftSaved(ChatTicket, Result<Draft, ApiError>),
    DraftDeleted(DeleteOrigin, i64, Result<(), ApiError>),
    DraftsDeleted(Vec<i64>, Result<Vec<i64>, ApiError>),
}

impl Request {
    pub async fn run(self, backend: &dyn Backend) -> Completion {
        match self {
            Request::LoadInbox(t) => Completion::Inbox(t, backend.list_emails().await),
            Request::Ingest { reset } => Completion::Ingested(backend.load_inbox(reset).await),
            Request::LoadEmail(t, id) => Completion::Email(t, id, backend.get_email(id).await),
            Request::LoadDrafts(t) => Completion::Drafts(t, backend.list_drafts().await),
            Request::LoadDraft(t, id) => Completion::Draft(t, id, backend.get_draft(id).await),
            Request::LoadPrompts(t) => Completion::Prompts(t, backend.get_prompts().await),
            Request::SavePrompt { key, text } => {
                let result = backend.update_prompt(&key, &text).await;
                Completion::PromptSaved(key, text, result)
            }
            Request::Chat(t, req) => Completion::ChatReply(t, backend.chat(&req).await),
            Request::GenerateDraft(t, req) => Completion::DraftGenerated(t, backend.generate_draft(&req).await),
            Request::SaveDraft(t, draft) => Completion::DraftSaved(t, backend.save_draft(&draft).await),
            Request::DeleteDraft(origin, id) => {
                Completion::DraftDeleted(origin, id, backend.delete_draft(id).await)
            }
            Request::DeleteDrafts(ids) => {
                let result = backend.delete_drafts(&ids).await;
                Completion::DraftsDeleted(ids, result)
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct Shell {
    pub view: View,
    pub inbox: InboxPanel,
    pub email_detail: EmailDetailPanel,
    pub drafts: DraftsPanel,
    pub draft_detail: DraftDetailPanel,
    pub prompts: PromptsPanel,
    pub chat: ChatPanel,
    pub chat_open: bool,
    pub selected_email_id: Option<i64>,
    /// Bumped whenever a sibling action makes the inbox stale.
    pub inbox_refresh: u64,
    pub drafts_refresh: u64,
    pub pending: Option<Confirmation>,
    pub alert: Option<String>,
}

impl Shell {
    /// Requests needed when the UI first comes up.
    pub fn start(&mut self) -> Vec<Request> {
        vec![Request::LoadInbox(self.inbox.begin_load(self.inbox_refresh))]
    }

    pub fn navigate(&mut self, view: View) -> Vec<Request> {
        if view == self.view {
            return Vec::new();
        }
        debug!(from = ?self.view, to = ?view, "navigate");
        match self.view {
            // The chat context and email detail belong to the inbox
            View::Inbox => {
                self.select_email(None);
            }
            View::Drafts => self.drafts.clear_selection(),
            View::Prompts => {}
        }
        self.view = view;
        self.alert = None;
        self.pending = None;

        match view {
            View::Inbox => self.sync_refresh(),
            View::Drafts => {
                if matches!(self.drafts.state, PanelState::Idle)
                    || self.drafts.needs_refresh(self.drafts_refresh)
                {
                    let ticket = self.drafts.begin_load(self.drafts_refresh);
                    let mut requests = vec![Request::LoadDrafts(ticket)];
                    requests.extend(self.open_current_draft());
                    requests
                } else {
                    self.open_current_draft().into_iter().collect()
                }
            }
            View::Prompts => {
                if matches!(self.prompts.state, PanelState::Idle) {
                    vec![Request::LoadPrompts(self.prompts.begin_load())]
                } else {
                    Vec::new()
                }
            }
        }
    }

    /// Reload whatever the refresh counters say is stale and visible.
    pub fn sync_refresh(&mut self) -> Vec<Request> {
        let mut requests = Vec::new();
        if self.view == View::Inbox && self.inbox.needs_refresh(self.inbox_refresh) {
            requests.push(Request::LoadInbox(self.inbox.begin_load(self.inbox_refresh)));
        }
        if self.view == View::Drafts && self.drafts.needs_refresh(self.drafts_refresh) {
            requests.push(Request::LoadDrafts(self.drafts.begin_load(self.drafts_refresh)));
        }
        requests
    }

    /// Explicit refresh of the current view. Ignored while that view is
    /// already loading.
    pub fn refresh(&mut self) -> Vec<Request> {
        match self.view {
            View::Inbox if self.inbox.state.is_loading() => Vec::new(),
            View::Drafts if self.drafts.state.is_loading() => Vec::new(),
            View::Prompts if self.prompts.state.is_loading() => Vec::new(),
            View::Inbox => {
                self.inbox_refresh += 1;
                let mut requests = self.sync_refresh();
                requests.extend(self.reload_selected_email());
                requests
            }
            View::Drafts => {
                self.drafts_refresh += 1;
                self.sync_refresh()
            }
            View::Prompts => vec![Request::LoadPrompts(self.prompts.begin_load())],
        }
    }

    fn reload_selected_email(&mut self) -> Option<Request> {
        let id = self.selected_email_id?;
        Some(Request::LoadEmail(self.email_detail.begin_load(id), id))
    }

    /// Select the email under the inbox cursor, loading its detail and
    /// moving the chat to it.
    pub fn select_current_email(&mut self) -> Option<Request> {
        let id = self.inbox.selected()?.id;
        self.select_email(Some(id))
    }

    pub fn select_email(&mut self, email_id: Option<i64>) -> Option<Request> {
        if self.selected_email_id == email_id && self.email_detail.email_id == email_id {
            return None;
        }
        self.selected_email_id = email_id;
        self.chat.set_context(email_id);
        match email_id {
            Some(id) => Some(Request::LoadEmail(self.email_detail.begin_load(id), id)),
            None => {
                self.email_detail.clear();
                None
            }
        }
    }

    pub fn open_current_draft(&mut self) -> Option<Request> {
        let id = self.drafts.current()?.id;
        if self.draft_detail.draft_id == Some(id) && self.draft_detail.detail().is_some() {
            return None;
        }
        Some(Request::LoadDraft(self.draft_detail.begin_load(id), id))
    }

    pub fn toggle_chat(&mut self) {
        self.chat_open = !self.chat_open;
    }

    pub fn load_mock(&mut self, reset: bool) -> Option<Request> {
        self.inbox.begin_ingest().then_some(Request::Ingest { reset })
    }

    pub fn send_chat(&mut self, text: &str) -> Option<Request> {
        let (ticket, request) = self.chat.begin_send(text)?;
        Some(Request::Chat(ticket, request))
    }

    pub fn generate_draft(&mut self) -> Option<Request> {
        self.chat_open = true;
        let (ticket, request) = self.chat.begin_generate()?;
        Some(Request::GenerateDraft(ticket, request))
    }

    pub fn save_draft(&mut self) -> Option<Request> {
        let (ticket, draft) = self.chat.begin_save()?;
        Some(Request::SaveDraft(ticket, draft))
    }

    pub fn save_prompt(&mut self, key: &str) -> Option<Request> {
        let (key, text) = self.prompts.begin_save(key)?;
        Some(Request::SavePrompt { key, text })
    }

    /// Ask for confirmation before deleting the checked drafts (or the one
    /// under the cursor).
    pub fn request_delete_drafts(&mut self) {
        if self.drafts.deleting {
            return;
        }
        let ids = self.drafts.delete_targets();
        if ids.is_empty() {
            return;
        }
        self.pending = Some(Confirmation::DeleteDrafts(ids));
    }

    pub fn request_delete_open_draft(&mut self) {
        if self.draft_detail.deleting {
            return;
        }
        if let Some(detail) = self.draft_detail.detail() {
            self.pending = Some(Confirmation::DeleteDraft(detail.draft.id));
        }
    }

    pub fn cancel_confirmation(&mut self) {
        self.pending = None;
    }

    pub fn confirm(&mut self) -> Option<Request> {
        match self.pending.take()? {
            Confirmation::DeleteDraft(id) => {
                self.draft_detail.begin_delete()?;
                Some(Request::DeleteDraft(DeleteOrigin::Detail, id))
            }
            Confirmation::DeleteDrafts(ids) => {
                if !self.drafts.begin_delete() {
                    return None;
                }
                if ids.len() == 1 {
                    Some(Request::DeleteDraft(DeleteOrigin::List, ids[0]))
                } else {
                    Some(Request::DeleteDrafts(ids))
                }
            }
        }
    }

    /// Draft saved from chat: both the inbox and the drafts list are stale.
    fn notify_draft_saved(&mut self) -> Vec<Request> {
        self.inbox_refresh += 1;
        self.drafts_refresh += 1;
        self.sync_refresh()
    }

    pub fn apply(&mut self, completion: Completion) -> Vec<Request> {
        match completion {
            Completion::Inbox(ticket, result) => {
                self.inbox.finish_load(ticket, result);
                Vec::new()
            }
            Completion::Ingested(result) => {
                if self.inbox.finish_ingest(result) {
                    self.inbox_refresh += 1;
                    let mut requests = self.sync_refresh();
                    requests.extend(self.reload_selected_email());
                    requests
                } else {
                    Vec::new()
                }
            }
            Completion::Email(ticket, id, result) => {
                self.email_detail.finish_load(ticket, id, result);
                Vec::new()
            }
            Completion::Drafts(ticket, result) => {
                self.drafts.finish_load(ticket, result);
                self.open_current_draft().into_iter().collect()
            }
            Completion::Draft(ticket, id, result) => {
                self.draft_detail.finish_load(ticket, id, result);
                Vec::new()
            }
            Completion::Prompts(ticket, result) => {
                self.prompts.finish_load(ticket, result);
                Vec::new()
            }
            Completion::PromptSaved(key, text, result) => {
                self.prompts.finish_save(&key, &text, result);
                Vec::new()
            }
            Completion::ChatReply(ticket, result) => {
                self.chat.finish_send(ticket, result);
                Vec::new()
            }
            Completion::DraftGenerated(ticket, result) => {
                self.chat.finish_generate(ticket, result);
                Vec::new()
            }
            Completion::DraftSaved(ticket, result) => match self.chat.finish_save(ticket, result) {
                Some(_) => self.notify_draft_saved(),
                None => Vec::new(),
            },
            Completion::DraftDeleted(origin, id, result) => {
                let outcome = match origin {
                    DeleteOrigin::Detail => self.draft_detail.finish_delete(id, result),
                    DeleteOrigin::List => self
                        .drafts
                        .finish_delete(&[id], result.map(|()| vec![id]))
                        .map(|_| ()),
                };
                match outcome {
                    Ok(()) => {
                        if origin == DeleteOrigin::Detail {
                            if let Some(drafts) = self.drafts.state.loaded_mut() {
                                drafts.retain(|d| d.id != id);
                            }
                            self.drafts.checked.remove(&id);
                        }
                        self.alert = Some(format!("Draft #{} deleted", id));
                        self.open_current_draft().into_iter().collect()
                    }
                    Err(message) => {
                        self.alert = Some(format!("Delete failed: {}", message));
                        Vec::new()
                    }
                }
            }
            Completion::DraftsDeleted(ids, result) => match self.drafts.finish_delete(&ids, result) {
                Ok(count) => {
                    self.alert = Some(format!("Deleted {} drafts", count));
                    self.open_current_draft().into_iter().collect()
                }
                Err(message) => {
                    self.alert = Some(format!("Delete failed: {}", message));
                    Vec::new()
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MockBackend;
    use serde_json::json;

    fn email(id: i64, subject: &str) -> Email {
        serde_json::from_value(json!({"id": id, "sender": "s@example.com", "subject": subject})).unwrap()
    }

    fn draft(id: i64) -> Draft {
        Draft {
            id,
            email_id: Some(1),
            subject: format!("Re: {}", id),
            body: "b".into(),
            created_at: None,
        }
    }

    async fn drive(shell: &mut Shell, backend: &dyn Backend, mut requests: Vec<Request>) {
        while let Some(request) = requests.pop() {
            let completion = request.run(backend).await;
            requests.extend(shell.apply(completion));
        }
    }

    #[tokio::test]
    async fn test_generate_then_save_refreshes_inbox() {
        let mut backend = MockBackend::new();
        backend.expect_list_emails().returning(|| Ok(vec![email(1, "Hi")]));
        backend.expect_get_email().returning(|id| Ok(email(id, "Hi")));
        backend.expect_generate_draft().returning(|req| {
            Ok(DraftPreview {
                email_id: req.email_id,
                subject: "Re: Hi".into(),
                body: "Thanks!".into(),
            })
        });
        backend.expect_save_draft().times(1).returning(|d| {
            Ok(Draft {
                id: 42,
                email_id: Some(d.email_id),
                subject: d.subject.clone(),
                body: d.body.clone(),
                created_at: None,
            })
        });

        let mut shell = Shell::default();
        let requests = shell.start();
        drive(&mut shell, &backend, requests).await;
        let requests: Vec<Request> = shell.select_current_email().into_iter().collect();
        drive(&mut shell, &backend, requests).await;
        assert_eq!(shell.selected_email_id, Some(1));

        let requests: Vec<Request> = shell.generate_draft().into_iter().collect();
        drive(&mut shell, &backend, requests).await;
        assert!(shell.chat_open);
        assert_eq!(shell.chat.editor.as_ref().map(|d| d.subject.as_str()), Some("Re: Hi"));

        let before = shell.inbox_refresh;
        let save = shell.save_draft().unwrap();
        let follow_up = shell.apply(save.run(&backend).await);
        assert!(shell.chat.editor.is_none());
        assert!(shell.chat.messages.last().unwrap().text.contains("42"));
        assert_eq!(shell.inbox_refresh, before + 1);
        assert!(matches!(follow_up.as_slice(), [Request::LoadInbox(_)]));
    }

    #[tokio::test]
    async fn test_batch_delete_requires_confirmation() {
        let mut backend = MockBackend::new();
        backend.expect_list_drafts().times(1).returning(|| Ok(vec![draft(1), draft(2), draft(3)]));
        backend.expect_get_draft().returning(|id| Ok(DraftDetail { draft: draft(id), email: None }));
        backend.expect_delete_drafts().times(1).returning(|ids| Ok(ids.to_vec()));

        let mut shell = Shell::default();
        let requests = shell.navigate(View::Drafts);
        drive(&mut shell, &backend, requests).await;
        assert_eq!(shell.drafts.drafts().len(), 3);

        shell.drafts.toggle_checked();
        shell.drafts.move_down();
        shell.drafts.toggle_checked();
        shell.request_delete_drafts();
        assert_eq!(shell.pending, Some(Confirmation::DeleteDrafts(vec![1, 2])));

        let request = shell.confirm().unwrap();
        assert!(shell.pending.is_none());
        let follow_up = shell.apply(request.run(&backend).await);
        drive(&mut shell, &backend, follow_up).await;

        assert_eq!(shell.drafts.drafts().iter().map(|d| d.id).collect::<Vec<_>>(), vec![3]);
        assert!(shell.drafts.checked.is_empty());
        assert_eq!(shell.alert.as_deref(), Some("Deleted 2 drafts"));
    }

    #[test]
    fn test_cancelled_confirmation_sends_nothing() {
        let mut shell = Shell::default();
        shell.view = View::Drafts;
        let ticket = shell.drafts.begin_load(0);
        shell.drafts.finish_load(ticket, Ok(vec![draft(7)]));
        shell.request_delete_drafts();
        assert_eq!(shell.pending, Some(Confirmation::DeleteDrafts(vec![7])));
        shell.cancel_confirmation();
        assert!(shell.confirm().is_none());
        assert_eq!(shell.drafts.drafts().len(), 1);
    }

    #[test]
    fn test_failed_delete_alerts_and_keeps_draft() {
        let mut shell = Shell::default();
        shell.view = View::Drafts;
        let ticket = shell.drafts.begin_load(0);
        shell.drafts.finish_load(ticket, Ok(vec![draft(7)]));
        shell.request_delete_drafts();
        let Some(Request::DeleteDraft(origin, id)) = shell.confirm() else {
            panic!("expected single delete");
        };
        assert_eq!(origin, DeleteOrigin::List);
        shell.apply(Completion::DraftDeleted(
            origin,
            id,
            Err(ApiError::Status {
                status: reqwest::StatusCode::NOT_FOUND,
                detail: Some("Draft not found".into()),
            }),
        ));
        assert_eq!(shell.alert.as_deref(), Some("Delete failed: Draft not found"));
        assert_eq!(shell.drafts.drafts().len(), 1);
    }

    #[test]
    fn test_leaving_drafts_clears_selection() {
        let mut shell = Shell::default();
        shell.view = View::Drafts;
        let ticket = shell.drafts.begin_load(0);
        shell.drafts.finish_load(ticket, Ok(vec![draft(1), draft(2)]));
        shell.drafts.toggle_checked();
        shell.navigate(View::Inbox);
        assert!(shell.drafts.checked.is_empty());
    }

    #[test]
    fn test_list_and_detail_deletes_complete_independently() {
        let mut shell = Shell::default();
        shell.view = View::Drafts;
        let ticket = shell.drafts.begin_load(0);
        shell.drafts.finish_load(ticket, Ok(vec![draft(7), draft(8)]));
        shell.drafts.move_down();
        let Some(Request::LoadDraft(ticket, 8)) = shell.open_current_draft() else {
            panic!("expected draft load");
        };
        shell.apply(Completion::Draft(ticket, 8, Ok(DraftDetail { draft: draft(8), email: None })));

        shell.drafts.move_up();
        shell.drafts.toggle_checked();
        shell.request_delete_drafts();
        let list_delete = shell.confirm();
        assert!(matches!(list_delete, Some(Request::DeleteDraft(DeleteOrigin::List, 7))));

        shell.request_delete_open_draft();
        let detail_delete = shell.confirm();
        assert!(matches!(detail_delete, Some(Request::DeleteDraft(DeleteOrigin::Detail, 8))));

        // The list delete lands first while the detail delete is still running
        shell.apply(Completion::DraftDeleted(DeleteOrigin::List, 7, Ok(())));
        assert_eq!(shell.drafts.drafts().iter().map(|d| d.id).collect::<Vec<_>>(), vec![8]);
        assert!(!shell.drafts.deleting);
        assert!(shell.draft_detail.deleting);
        assert_eq!(shell.draft_detail.detail().map(|d| d.draft.id), Some(8));

        shell.apply(Completion::DraftDeleted(DeleteOrigin::Detail, 8, Ok(())));
        assert!(!shell.draft_detail.deleting);
        assert!(shell.draft_detail.detail().is_none());
        assert!(shell.drafts.drafts().is_empty());
        assert_eq!(shell.alert.as_deref(), Some("Draft #8 deleted"));
    }

    #[test]
    fn test_leaving_inbox_clears_chat_context() {
        let mut shell = Shell::default();
        shell.select_email(Some(1));
        shell.chat.begin_send("hello");
        assert_eq!(shell.chat.messages.len(), 1);

        shell.navigate(View::Drafts);
        assert_eq!(shell.selected_email_id, None);
        assert_eq!(shell.chat.email_id, None);
        assert!(shell.chat.messages.is_empty());
        assert!(!shell.chat.sending);
        assert!(shell.email_detail.email().is_none());
    }

    #[test]
    fn test_refresh_is_ignored_while_loading() {
        let mut shell = Shell::default();
        let requests = shell.start();
        assert_eq!(requests.len(), 1);
        let counter = shell.inbox_refresh;
        assert!(shell.refresh().is_empty());
        assert_eq!(shell.inbox_refresh, counter);

        let Some(Request::LoadInbox(ticket)) = requests.into_iter().next() else {
            panic!("expected inbox load");
        };
        shell.apply(Completion::Inbox(ticket, Ok(vec![email(1, "Hi")])));
        assert!(matches!(shell.refresh().as_slice(), [Request::LoadInbox(_)]));
        assert_eq!(shell.inbox_refresh, counter + 1);
    }

    #[test]
    fn test_changing_email_resets_chat() {
        let mut shell = Shell::default();
        shell.select_email(Some(1));
        shell.chat.begin_send("hello");
        assert_eq!(shell.chat.messages.len(), 1);
        let request = shell.select_email(Some(2));
        assert!(matches!(request, Some(Request::LoadEmail(_, 2))));
        assert!(shell.chat.messages.is_empty());
        assert_eq!(shell.chat.email_id, Some(2));
        assert!(shell.email_detail.state.is_loading());
    }

    #[test]
    fn test_inbox_failure_leaves_load_mock_available() {
        let mut shell = Shell::default();
        let Some(Request::LoadInbox(ticket)) = shell.start().pop() else {
            panic!("expected inbox load");
        };
        shell.apply(Completion::Inbox(ticket, Err(ApiError::Request("offline".into()))));
        assert!(matches!(shell.inbox.state, PanelState::Failed(_)));
        assert!(shell.load_mock(false).is_some());
    }
}
