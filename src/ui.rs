use crate::app::{Shell, View};
use crate::models::{ChatMessage, Draft, DraftPreview, Email, Role, Task};
use crate::panels::PanelState;
use crate::timefmt::format_timestamp;
use inflections::case::to_title_case;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};
use tui_textarea::TextArea;

#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub enum UIMode {
    #[default]
    Browsing,
    ChatInput,
    EditingDraft,
    EditingPrompt,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub enum DraftField {
    #[default]
    Subject,
    Body,
}

impl DraftField {
    pub fn toggle(self) -> Self {
        match self {
            DraftField::Subject => DraftField::Body,
            DraftField::Body => DraftField::Subject,
        }
    }
}

fn plain_textarea<'a>(text: &str) -> TextArea<'a> {
    let mut textarea = TextArea::from(text.lines());
    // Disable cursor line highlighting for cleaner look
    textarea.set_cursor_line_style(Style::default());
    textarea
}

/// The generated draft while the user reviews it.
pub struct DraftEditor<'a> {
    pub subject: TextArea<'a>,
    pub body: TextArea<'a>,
    pub focused_field: DraftField,
}

impl<'a> DraftEditor<'a> {
    pub fn new(draft: &DraftPreview) -> Self {
        Self {
            subject: plain_textarea(&draft.subject),
            body: plain_textarea(&draft.body),
            focused_field: DraftField::Body,
        }
    }

    pub fn get_subject(&self) -> String {
        self.subject.lines().join(" ")
    }

    pub fn get_body(&self) -> String {
        self.body.lines().join("\n")
    }

    pub fn focused_textarea(&mut self) -> &mut TextArea<'a> {
        match self.focused_field {
            DraftField::Subject => &mut self.subject,
            DraftField::Body => &mut self.body,
        }
    }
}

pub struct PromptEditor<'a> {
    pub key: String,
    pub text: TextArea<'a>,
}

impl<'a> PromptEditor<'a> {
    pub fn new(key: &str, text: &str) -> Self {
        Self {
            key: key.to_string(),
            text: plain_textarea(text),
        }
    }

    pub fn get_text(&self) -> String {
        self.text.lines().join("\n")
    }
}

pub struct UIState<'a> {
    pub mode: UIMode,
    pub chat_input: TextArea<'a>,
    pub draft_editor: Option<DraftEditor<'a>>,
    pub prompt_editor: Option<PromptEditor<'a>>,
    pub list_state: ListState,
}

impl<'a> Default for UIState<'a> {
    fn default() -> Self {
        let mut chat_input = plain_textarea("");
        chat_input.set_placeholder_text("Ask about this email, or the inbox...");
        Self {
            mode: UIMode::Browsing,
            chat_input,
            draft_editor: None,
            prompt_editor: None,
            list_state: ListState::default(),
        }
    }
}

impl<'a> UIState<'a> {
    /// Take the typed chat message and reset the input.
    pub fn take_chat_input(&mut self) -> String {
        let text = self.chat_input.lines().join("\n");
        let mut fresh = plain_textarea("");
        fresh.set_placeholder_text("Ask about this email, or the inbox...");
        self.chat_input = fresh;
        text
    }
}

fn border_style(focused: bool) -> Style {
    if focused {
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::Gray)
    }
}

pub fn render(f: &mut Frame, shell: &Shell, state: &mut UIState<'_>) {
    let outer = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(f.area());

    let constraints = if shell.chat_open {
        vec![
            Constraint::Percentage(10),
            Constraint::Percentage(30),
            Constraint::Percentage(30),
            Constraint::Percentage(30),
        ]
    } else {
        vec![
            Constraint::Percentage(10),
            Constraint::Percentage(30),
            Constraint::Percentage(60),
        ]
    };
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(constraints)
        .split(outer[0]);

    render_views(f, shell, chunks[0]);
    match shell.view {
        View::Inbox => {
            render_inbox(f, shell, state, chunks[1]);
            render_email_detail(f, shell, chunks[2]);
        }
        View::Drafts => {
            render_drafts(f, shell, state, chunks[1]);
            render_draft_detail(f, shell, chunks[2]);
        }
        View::Prompts => {
            render_prompt_keys(f, shell, state, chunks[1]);
            render_prompt_text(f, shell, chunks[2]);
        }
    }
    if shell.chat_open {
        render_chat(f, shell, state, chunks[3]);
    }
    render_status(f, shell, state, outer[1]);

    match state.mode {
        UIMode::EditingDraft => render_draft_editor(f, shell, state),
        UIMode::EditingPrompt => render_prompt_editor(f, shell, state),
        _ => {}
    }
    if let Some(confirmation) = &shell.pending {
        render_confirmation(f, &confirmation.prompt());
    }
}

fn render_views(f: &mut Frame, shell: &Shell, area: Rect) {
    let items: Vec<ListItem> = View::ALL
        .iter()
        .map(|view| {
            let style = if *view == shell.view {
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            ListItem::new(view.title()).style(style)
        })
        .collect();
    let list = List::new(items).block(Block::default().borders(Borders::ALL).title("Views"));
    f.render_widget(list, area);
}

/// Loading and error placeholders shared by the list panes. `None` means
/// the panel has data to draw.
fn placeholder<T>(state: &PanelState<T>, what: &str) -> Option<(String, Style)> {
    match state {
        PanelState::Idle => Some((String::new(), Style::default())),
        PanelState::Loading => Some((
            format!("Loading {}...", what),
            Style::default().fg(Color::Yellow),
        )),
        PanelState::Failed(message) => Some((message.clone(), Style::default().fg(Color::Red))),
        PanelState::Loaded(_) => None,
    }
}

fn render_placeholder(f: &mut Frame, block: Block, area: Rect, text: String, style: Style) {
    let paragraph = Paragraph::new(text)
        .block(block)
        .style(style)
        .wrap(Wrap { trim: true });
    f.render_widget(paragraph, area);
}

fn fit(s: &str, len: usize) -> String {
    if s.chars().count() > len {
        let truncated: String = s.chars().take(len.saturating_sub(3)).collect();
        format!("{}...", truncated)
    } else {
        s.to_string()
    }
}

fn email_row(email: &Email, width: usize) -> String {
    let when = email
        .timestamp
        .as_deref()
        .map(format_timestamp)
        .unwrap_or_default();
    let subject = if email.subject.is_empty() {
        "(No Subject)"
    } else {
        email.subject.as_str()
    };
    format!(
        "{}\n{}\n[{}] {}",
        fit(&email.sender, width),
        fit(subject, width),
        email.category,
        when
    )
}

fn render_inbox(f: &mut Frame, shell: &Shell, state: &mut UIState<'_>, area: Rect) {
    let inbox = &shell.inbox;
    let title = if inbox.ingesting {
        "Inbox - loading mock inbox...".to_string()
    } else {
        format!("Inbox ({})", inbox.emails().len())
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .border_style(border_style(true));

    if let Some((text, style)) = placeholder(&inbox.state, "inbox") {
        let text = if inbox.state.error().is_some() {
            format!("{}\n\nPress m to load the mock inbox.", text)
        } else {
            text
        };
        render_placeholder(f, block, area, text, style);
        return;
    }
    if inbox.emails().is_empty() {
        render_placeholder(
            f,
            block,
            area,
            "No emails yet. Press m to load the mock inbox.".to_string(),
            Style::default().fg(Color::DarkGray),
        );
        return;
    }

    let width = area.width.saturating_sub(4) as usize;
    let items: Vec<ListItem> = inbox
        .emails()
        .iter()
        .enumerate()
        .map(|(i, email)| {
            let mut style = Style::default();
            if i == inbox.selected_index {
                style = style.fg(Color::Yellow);
            }
            if shell.selected_email_id == Some(email.id) {
                style = style.add_modifier(Modifier::BOLD);
            }
            ListItem::new(email_row(email, width)).style(style)
        })
        .collect();

    state.list_state.select(Some(inbox.selected_index));
    let list = List::new(items).block(block).highlight_symbol("█");
    f.render_stateful_widget(list, area, &mut state.list_state);
}

fn task_line(task: &Task) -> String {
    let mut line = format!("- {}", task.task);
    if let Some(deadline) = &task.deadline {
        line.push_str(&format!(" (due {})", deadline));
    }
    if let Some(notes) = &task.notes {
        line.push_str(&format!(" - {}", notes));
    }
    line
}

fn email_text(email: &Email) -> String {
    let mut text = format!("From: {}\n", email.sender);
    if let Some(recipients) = &email.recipients {
        text.push_str(&format!("To: {}\n", recipients));
    }
    if let Some(timestamp) = &email.timestamp {
        text.push_str(&format!("Date: {}\n", format_timestamp(timestamp)));
    }
    text.push_str(&format!(
        "Category: {}\nSubject: {}\n\n{}\n",
        email.category,
        email.subject,
        clean_body(&email.body)
    ));
    if !email.tasks.is_empty() {
        text.push_str("\nTasks:\n");
        for task in &email.tasks {
            text.push_str(&task_line(task));
            text.push('\n');
        }
    }
    if let Some(draft) = &email.draft {
        text.push_str(&format!(
            "\n------------------------------------------------------------\nSuggested reply: {}\n\n{}\n",
            draft.subject,
            clean_body(&draft.body)
        ));
    }
    text
}

fn render_email_detail(f: &mut Frame, shell: &Shell, area: Rect) {
    let detail = &shell.email_detail;
    let block = Block::default().borders(Borders::ALL).title("Email");
    if detail.email_id.is_none() {
        render_placeholder(
            f,
            block,
            area,
            "No email selected".to_string(),
            Style::default().fg(Color::DarkGray),
        );
        return;
    }
    if let Some((text, style)) = placeholder(&detail.state, "email") {
        render_placeholder(f, block, area, text, style);
        return;
    }
    let text = detail.email().map(email_text).unwrap_or_default();
    let paragraph = Paragraph::new(text)
        .block(block)
        .wrap(Wrap { trim: true })
        .scroll((detail.scroll, 0));
    f.render_widget(paragraph, area);
}

fn draft_row(draft: &Draft, checked: bool, width: usize) -> String {
    let mark = if checked { "[x]" } else { "[ ]" };
    let when = draft
        .created_at
        .as_deref()
        .map(format_timestamp)
        .unwrap_or_default();
    format!("{} {}\n    {}", mark, fit(&draft.subject, width.saturating_sub(4)), when)
}

fn render_drafts(f: &mut Frame, shell: &Shell, state: &mut UIState<'_>, area: Rect) {
    let drafts = &shell.drafts;
    let title = match drafts.checked.len() {
        0 => "Drafts".to_string(),
        n => format!("Drafts - {} selected", n),
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .border_style(border_style(true));
    if let Some((text, style)) = placeholder(&drafts.state, "drafts") {
        render_placeholder(f, block, area, text, style);
        return;
    }
    if drafts.drafts().is_empty() {
        render_placeholder(
            f,
            block,
            area,
            "No saved drafts".to_string(),
            Style::default().fg(Color::DarkGray),
        );
        return;
    }

    let width = area.width.saturating_sub(4) as usize;
    let items: Vec<ListItem> = drafts
        .drafts()
        .iter()
        .enumerate()
        .map(|(i, draft)| {
            let style = if i == drafts.cursor {
                Style::default().fg(Color::Yellow)
            } else {
                Style::default()
            };
            ListItem::new(draft_row(draft, drafts.is_checked(draft.id), width)).style(style)
        })
        .collect();
    state.list_state.select(Some(drafts.cursor));
    f.render_stateful_widget(List::new(items).block(block), area, &mut state.list_state);
}

fn render_draft_detail(f: &mut Frame, shell: &Shell, area: Rect) {
    let panel = &shell.draft_detail;
    let title = if panel.deleting { "Draft - deleting..." } else { "Draft" };
    let block = Block::default().borders(Borders::ALL).title(title);
    if let Some((text, style)) = placeholder(&panel.state, "draft") {
        render_placeholder(f, block, area, text, style);
        return;
    }
    let Some(detail) = panel.detail() else {
        return;
    };
    let draft = &detail.draft;
    let mut text = format!("Subject: {}\n", draft.subject);
    if let Some(created) = &draft.created_at {
        text.push_str(&format!("Created: {}\n", format_timestamp(created)));
    }
    text.push_str(&format!("\n{}\n", clean_body(&draft.body)));
    if let Some(email) = &detail.email {
        text.push_str(&format!(
            "\n------------------------------------------------------------\nIn reply to {}: {}\n\n{}\n",
            email.sender,
            email.subject,
            clean_body(&email.body)
        ));
    }
    let paragraph = Paragraph::new(text).block(block).wrap(Wrap { trim: true });
    f.render_widget(paragraph, area);
}

fn render_prompt_keys(f: &mut Frame, shell: &Shell, state: &mut UIState<'_>, area: Rect) {
    let prompts = &shell.prompts;
    let block = Block::default()
        .borders(Borders::ALL)
        .title("Prompt Brain")
        .border_style(border_style(true));
    if let Some((text, style)) = placeholder(&prompts.state, "prompts") {
        render_placeholder(f, block, area, text, style);
        return;
    }
    let items: Vec<ListItem> = prompts
        .keys()
        .iter()
        .enumerate()
        .map(|(i, key)| {
            let style = if i == prompts.cursor {
                Style::default().fg(Color::Yellow)
            } else {
                Style::default()
            };
            let dirty = if prompts.is_dirty(key) { " *" } else { "" };
            ListItem::new(format!("{}{}", to_title_case(key), dirty)).style(style)
        })
        .collect();
    state.list_state.select(Some(prompts.cursor));
    f.render_stateful_widget(List::new(items).block(block), area, &mut state.list_state);
}

fn render_prompt_text(f: &mut Frame, shell: &Shell, area: Rect) {
    let prompts = &shell.prompts;
    let key = prompts.current_key();
    let title = match (&key, &prompts.saving) {
        (Some(key), Some(saving)) if key == saving => format!("{} - saving...", to_title_case(key)),
        (Some(key), _) => to_title_case(key),
        (None, _) => "Prompt".to_string(),
    };
    let text = key
        .as_deref()
        .and_then(|k| prompts.text(k))
        .unwrap_or_default()
        .to_string();
    let paragraph = Paragraph::new(text)
        .block(Block::default().borders(Borders::ALL).title(title))
        .wrap(Wrap { trim: false });
    f.render_widget(paragraph, area);
}

fn chat_line(message: &ChatMessage) -> Line<'_> {
    let (who, style) = match (message.role, message.error) {
        (_, true) => ("Agent", Style::default().fg(Color::Red)),
        (Role::User, false) => ("You", Style::default().fg(Color::Cyan)),
        (Role::Assistant, false) => ("Agent", Style::default().fg(Color::Green)),
    };
    Line::from(vec![
        Span::styled(format!("{}: ", who), style.add_modifier(Modifier::BOLD)),
        Span::styled(message.text.as_str(), if message.error { style } else { Style::default() }),
    ])
}

/// Rows `lines` take up once wrapped to `width` columns. Word wrapping can
/// break earlier than this, so it is a lower bound.
fn wrapped_rows(lines: &[Line], width: u16) -> usize {
    let width = usize::from(width.max(1));
    lines
        .iter()
        .map(|line| line.width().div_ceil(width).max(1))
        .sum()
}

fn render_chat(f: &mut Frame, shell: &Shell, state: &mut UIState<'_>, area: Rect) {
    let chat = &shell.chat;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(3)])
        .split(area);

    let title = match chat.email_id {
        Some(id) => format!("Agent - email #{}", id),
        None => "Agent - whole inbox".to_string(),
    };
    let mut lines: Vec<Line> = Vec::new();
    for message in &chat.messages {
        lines.push(chat_line(message));
        lines.push(Line::from(""));
    }
    if chat.sending {
        lines.push(Line::styled("Agent is thinking...", Style::default().fg(Color::DarkGray)));
    }
    if chat.generating {
        lines.push(Line::styled("Generating a draft...", Style::default().fg(Color::DarkGray)));
    }
    // Keep the newest messages in view
    let visible = chunks[0].height.saturating_sub(2) as usize;
    let rows = wrapped_rows(&lines, chunks[0].width.saturating_sub(2));
    let scroll = u16::try_from(rows.saturating_sub(visible)).unwrap_or(u16::MAX);
    let history = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(title))
        .wrap(Wrap { trim: true })
        .scroll((scroll, 0));
    f.render_widget(history, chunks[0]);

    let focused = state.mode == UIMode::ChatInput;
    state.chat_input.set_block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Message [Enter to Send, Esc to Leave] ")
            .border_style(border_style(focused)),
    );
    f.render_widget(&state.chat_input, chunks[1]);
    if focused {
        let (row, col) = state.chat_input.cursor();
        f.set_cursor_position((chunks[1].x + 1 + col as u16, chunks[1].y + 1 + row as u16));
    }
}

fn render_status(f: &mut Frame, shell: &Shell, state: &UIState<'_>, area: Rect) {
    let hints = match state.mode {
        UIMode::Browsing => match shell.view {
            View::Inbox => "Tab views | j/k move | Enter open | c chat | g draft | m mock | M reprocess | r refresh | q quit",
            View::Drafts => "Tab views | j/k move | Space select | d delete | r refresh | q quit",
            View::Prompts => "Tab views | j/k move | e edit | r refresh | q quit",
        },
        UIMode::ChatInput => "Enter send | Esc back",
        UIMode::EditingDraft => "Tab switch field | Ctrl-S save | Esc discard",
        UIMode::EditingPrompt => "Ctrl-S save | Esc close",
    };
    let message = shell
        .alert
        .as_deref()
        .or(shell.inbox.status.as_deref())
        .or(shell.prompts.status.as_deref());
    let line = match message {
        Some(message) => Line::from(vec![
            Span::styled(format!(" {} ", message), Style::default().fg(Color::Yellow)),
            Span::styled(format!(" {}", hints), Style::default().fg(Color::DarkGray)),
        ]),
        None => Line::styled(format!(" {}", hints), Style::default().fg(Color::DarkGray)),
    };
    f.render_widget(Paragraph::new(line), area);
}

fn render_draft_editor(f: &mut Frame, shell: &Shell, state: &mut UIState<'_>) {
    let Some(editor) = &mut state.draft_editor else {
        return;
    };
    let area = centered_rect(80, 80, f.area());
    f.render_widget(Clear, area);
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(5)])
        .split(area);

    let field_style = |focused: bool| {
        if focused {
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Gray)
        }
    };
    editor.subject.set_block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Subject ")
            .border_style(field_style(editor.focused_field == DraftField::Subject)),
    );
    let body_title = if shell.chat.saving {
        " Body [saving...] "
    } else {
        " Body [Esc to Discard, Ctrl-S to Save, Tab to Switch] "
    };
    editor.body.set_block(
        Block::default()
            .borders(Borders::ALL)
            .title(body_title)
            .border_style(field_style(editor.focused_field == DraftField::Body)),
    );
    f.render_widget(&editor.subject, chunks[0]);
    f.render_widget(&editor.body, chunks[1]);

    let (chunk, (row, col)) = match editor.focused_field {
        DraftField::Subject => (chunks[0], editor.subject.cursor()),
        DraftField::Body => (chunks[1], editor.body.cursor()),
    };
    f.set_cursor_position((chunk.x + 1 + col as u16, chunk.y + 1 + row as u16));
}

fn render_prompt_editor(f: &mut Frame, shell: &Shell, state: &mut UIState<'_>) {
    let Some(editor) = &mut state.prompt_editor else {
        return;
    };
    let area = centered_rect(80, 70, f.area());
    f.render_widget(Clear, area);
    let saving = shell.prompts.saving.as_deref() == Some(editor.key.as_str());
    let title = format!(
        " {}{} [Ctrl-S to Save, Esc to Close] ",
        to_title_case(&editor.key),
        if saving { " (saving...)" } else { "" }
    );
    editor.text.set_block(
        Block::default()
            .borders(Borders::ALL)
            .title(title)
            .border_style(Style::default().fg(Color::Cyan)),
    );
    f.render_widget(&editor.text, area);
    let (row, col) = editor.text.cursor();
    f.set_cursor_position((area.x + 1 + col as u16, area.y + 1 + row as u16));
}

fn render_confirmation(f: &mut Frame, prompt: &str) {
    let area = centered_rect(40, 20, f.area());
    f.render_widget(Clear, area);
    let paragraph = Paragraph::new(format!("{}\n\n[y] Yes    [n] No", prompt))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Confirm ")
                .border_style(Style::default().fg(Color::Red)),
        )
        .wrap(Wrap { trim: true });
    f.render_widget(paragraph, area);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

/// Collapse runs of blank lines to one and strip trailing whitespace.
fn clean_body(body: &str) -> String {
    let normalized = body.replace("\r\n", "\n").replace('\r', "\n");
    let mut result = String::with_capacity(normalized.len());
    let mut blank_run = 0;
    let mut first_content = true;

    for line in normalized.split('\n') {
        let trimmed = line.trim_end();
        if trimmed.is_empty() {
            blank_run += 1;
            continue;
        }
        if !first_content {
            // One newline between adjacent lines, two across any blank gap
            let newlines = std::cmp::min(blank_run + 1, 2);
            for _ in 0..newlines {
                result.push('\n');
            }
        }
        result.push_str(trimmed);
        blank_run = 0;
        first_content = false;
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Category;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_clean_body_removes_extra_newlines() {
        let input = "Line 1\n\n\nLine 2\n\n\n\nLine 3";
        assert_eq!(clean_body(input), "Line 1\n\nLine 2\n\nLine 3");
    }

    #[test]
    fn test_clean_body_normalizes_crlf_and_whitespace_lines() {
        assert_eq!(clean_body("Line 1\r\n  \r\n\t\r\nLine 2"), "Line 1\n\nLine 2");
        assert_eq!(clean_body("Line 1   \nLine 2\t"), "Line 1\nLine 2");
    }

    #[test]
    fn test_task_line_includes_deadline_and_notes() {
        let task = Task {
            task: "Send the Q3 report".into(),
            deadline: Some("Friday".into()),
            notes: Some("CC finance".into()),
        };
        assert_eq!(task_line(&task), "- Send the Q3 report (due Friday) - CC finance");
        let bare = Task {
            task: "Reply".into(),
            ..Task::default()
        };
        assert_eq!(task_line(&bare), "- Reply");
    }

    #[test]
    fn test_email_text_shows_processing_results() {
        let email = Email {
            id: 1,
            sender: "boss@example.com".into(),
            recipients: None,
            subject: "Q3".into(),
            body: "Please send it.".into(),
            timestamp: None,
            category: Category::ToDo,
            tasks: vec![Task {
                task: "Send report".into(),
                ..Task::default()
            }],
            draft: Some(DraftPreview {
                email_id: 1,
                subject: "Re: Q3".into(),
                body: "On it.".into(),
            }),
        };
        let text = email_text(&email);
        assert!(text.contains("Category: To-Do"));
        assert!(text.contains("- Send report"));
        assert!(text.contains("Suggested reply: Re: Q3"));
    }

    #[test]
    fn test_draft_row_marks_checked() {
        let draft = Draft {
            id: 3,
            email_id: None,
            subject: "Re: lunch".into(),
            body: String::new(),
            created_at: None,
        };
        assert!(draft_row(&draft, true, 40).starts_with("[x] Re: lunch"));
        assert!(draft_row(&draft, false, 40).starts_with("[ ] Re: lunch"));
    }

    #[test]
    fn test_wrapped_rows_counts_wrapped_lines() {
        let lines = vec![
            Line::from("a".repeat(25)),
            Line::from(""),
            Line::from("short"),
        ];
        assert_eq!(wrapped_rows(&lines, 10), 3 + 1 + 1);
        assert_eq!(wrapped_rows(&lines, 40), 3);
        assert_eq!(wrapped_rows(&lines, 0), 25 + 1 + 5);
    }

    #[test]
    fn test_fit_truncates_long_text() {
        assert_eq!(fit("abcdefghij", 6), "abc...");
        assert_eq!(fit("short", 10), "short");
    }
}
