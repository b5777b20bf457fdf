use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode},
};
use inbox_agent::api::{ApiClient, Backend};
use inbox_agent::app::{Completion, Request, Shell, View};
use inbox_agent::config::{Config, matches_key};
use inbox_agent::ui::{self, DraftEditor, PromptEditor, UIMode, UIState};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use std::io;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

const LOG_FILE: &str = "inbox_agent_debug.log";

/// Logs go to a file; the terminal belongs to the UI.
fn init_logging(debug_logging: bool) -> anyhow::Result<()> {
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(LOG_FILE)?;
    let default_filter = if debug_logging {
        "inbox_agent=debug"
    } else {
        "inbox_agent=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

/// Run each request on its own task; completions come back over `tx`.
fn dispatch(
    requests: impl IntoIterator<Item = Request>,
    backend: &Arc<dyn Backend>,
    tx: &mpsc::Sender<Completion>,
) {
    for request in requests {
        debug!(?request, "dispatch");
        let backend = Arc::clone(backend);
        let tx = tx.clone();
        tokio::spawn(async move {
            let completion = request.run(backend.as_ref()).await;
            let _ = tx.send(completion).await;
        });
    }
}

/// Keep the popup editor in step with the chat panel's draft.
fn sync_draft_editor(shell: &Shell, ui_state: &mut UIState<'_>) {
    match (&shell.chat.editor, ui_state.draft_editor.is_some()) {
        (Some(draft), false) => {
            ui_state.draft_editor = Some(DraftEditor::new(draft));
            ui_state.mode = UIMode::EditingDraft;
        }
        (None, true) => {
            ui_state.draft_editor = None;
            if ui_state.mode == UIMode::EditingDraft {
                ui_state.mode = UIMode::Browsing;
            }
        }
        _ => {}
    }
}

fn handle_browsing(
    key: KeyEvent,
    config: &Config,
    shell: &mut Shell,
    ui_state: &mut UIState<'_>,
) -> Vec<Request> {
    let keys = &config.keybindings;

    if shell.pending.is_some() {
        if matches_key(key, &keys.confirm) {
            return shell.confirm().into_iter().collect();
        }
        if matches_key(key, &keys.cancel) {
            shell.cancel_confirmation();
        }
        return Vec::new();
    }

    if matches_key(key, &keys.next_view) {
        return shell.navigate(shell.view.next());
    }
    if matches_key(key, &keys.prev_view) {
        return shell.navigate(shell.view.prev());
    }
    if matches_key(key, &keys.refresh) {
        return shell.refresh();
    }
    if matches_key(key, &keys.toggle_chat) {
        shell.toggle_chat();
        return Vec::new();
    }
    if matches_key(key, &keys.chat_input) {
        shell.chat_open = true;
        ui_state.mode = UIMode::ChatInput;
        return Vec::new();
    }

    match shell.view {
        View::Inbox => {
            if matches_key(key, &keys.scroll_down) {
                shell.email_detail.scroll = shell.email_detail.scroll.saturating_add(1);
            } else if matches_key(key, &keys.scroll_up) {
                shell.email_detail.scroll = shell.email_detail.scroll.saturating_sub(1);
            } else if matches_key(key, &keys.move_down) {
                shell.inbox.select_next();
            } else if matches_key(key, &keys.move_up) {
                shell.inbox.select_prev();
            } else if matches_key(key, &keys.open) {
                return shell.select_current_email().into_iter().collect();
            } else if matches_key(key, &keys.generate_draft) {
                return shell.generate_draft().into_iter().collect();
            } else if matches_key(key, &keys.load_mock) {
                return shell.load_mock(false).into_iter().collect();
            } else if matches_key(key, &keys.reprocess) {
                return shell.load_mock(true).into_iter().collect();
            }
        }
        View::Drafts => {
            if matches_key(key, &keys.move_down) {
                shell.drafts.move_down();
                return shell.open_current_draft().into_iter().collect();
            } else if matches_key(key, &keys.move_up) {
                shell.drafts.move_up();
                return shell.open_current_draft().into_iter().collect();
            } else if matches_key(key, &keys.toggle_select) {
                shell.drafts.toggle_checked();
            } else if matches_key(key, &keys.delete) {
                if shell.drafts.checked.is_empty() && shell.draft_detail.detail().is_some() {
                    shell.request_delete_open_draft();
                } else {
                    shell.request_delete_drafts();
                }
            }
        }
        View::Prompts => {
            if matches_key(key, &keys.move_down) {
                shell.prompts.move_down();
            } else if matches_key(key, &keys.move_up) {
                shell.prompts.move_up();
            } else if matches_key(key, &keys.edit) || matches_key(key, &keys.open) {
                if let Some(prompt_key) = shell.prompts.current_key() {
                    let text = shell.prompts.text(&prompt_key).unwrap_or_default();
                    ui_state.prompt_editor = Some(PromptEditor::new(&prompt_key, text));
                    ui_state.mode = UIMode::EditingPrompt;
                }
            }
        }
    }
    Vec::new()
}

fn handle_chat_input(key: KeyEvent, shell: &mut Shell, ui_state: &mut UIState<'_>) -> Vec<Request> {
    match key.code {
        KeyCode::Esc => {
            ui_state.mode = UIMode::Browsing;
            Vec::new()
        }
        KeyCode::Enter => {
            if shell.chat.sending {
                return Vec::new();
            }
            let text = ui_state.take_chat_input();
            shell.send_chat(&text).into_iter().collect()
        }
        _ => {
            ui_state.chat_input.input(key);
            Vec::new()
        }
    }
}

fn handle_draft_editor(
    key: KeyEvent,
    config: &Config,
    shell: &mut Shell,
    ui_state: &mut UIState<'_>,
) -> Vec<Request> {
    let Some(editor) = &mut ui_state.draft_editor else {
        ui_state.mode = UIMode::Browsing;
        return Vec::new();
    };
    if matches_key(key, &config.keybindings.save) {
        shell.chat.update_editor(editor.get_subject(), editor.get_body());
        return shell.save_draft().into_iter().collect();
    }
    match key.code {
        KeyCode::Esc => {
            shell.chat.close_editor();
            ui_state.draft_editor = None;
            ui_state.mode = UIMode::Browsing;
        }
        KeyCode::Tab | KeyCode::BackTab => {
            editor.focused_field = editor.focused_field.toggle();
        }
        _ => {
            editor.focused_textarea().input(key);
        }
    }
    Vec::new()
}

fn handle_prompt_editor(
    key: KeyEvent,
    config: &Config,
    shell: &mut Shell,
    ui_state: &mut UIState<'_>,
) -> Vec<Request> {
    let Some(editor) = &mut ui_state.prompt_editor else {
        ui_state.mode = UIMode::Browsing;
        return Vec::new();
    };
    if matches_key(key, &config.keybindings.save) {
        let prompt_key = editor.key.clone();
        shell.prompts.edit(&prompt_key, editor.get_text());
        return shell.save_prompt(&prompt_key).into_iter().collect();
    }
    if key.code == KeyCode::Esc {
        let text = editor.get_text();
        // Unsaved changes stay as a pending edit
        if shell.prompts.text(&editor.key) != Some(text.as_str()) {
            shell.prompts.edit(&editor.key, text);
        }
        ui_state.prompt_editor = None;
        ui_state.mode = UIMode::Browsing;
        return Vec::new();
    }
    editor.text.input(key);
    Vec::new()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let debug_logging = std::env::args().any(|arg| arg == "--debug");
    init_logging(debug_logging)?;
    let config = Config::load();

    let base_url = config.api_base_url();
    info!(%base_url, "starting");
    let backend: Arc<dyn Backend> = Arc::new(ApiClient::new(base_url)?);

    let mut shell = Shell::default();
    shell.chat.tone = config.agent.tone.clone();
    shell.chat.chat_prompt_key = config.agent.chat_prompt_key.clone();
    shell.chat.draft_prompt_key = config.agent.draft_prompt_key.clone();

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(
        stdout,
        crossterm::terminal::EnterAlternateScreen,
        crossterm::event::EnableMouseCapture
    )?;
    let term_backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(term_backend)?;

    let mut ui_state = UIState::default();
    let (tx, mut rx) = mpsc::channel::<Completion>(64);
    dispatch(shell.start(), &backend, &tx);

    loop {
        // Apply finished requests; they may ask for follow-up loads
        while let Ok(completion) = rx.try_recv() {
            let follow_up = shell.apply(completion);
            dispatch(follow_up, &backend, &tx);
        }
        sync_draft_editor(&shell, &mut ui_state);

        terminal.draw(|f| ui::render(f, &shell, &mut ui_state))?;

        if !event::poll(std::time::Duration::from_millis(100))? {
            continue;
        }

        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        let requests = match ui_state.mode {
            UIMode::Browsing => {
                if shell.pending.is_none() && matches_key(key, &config.keybindings.quit) {
                    break;
                }
                handle_browsing(key, &config, &mut shell, &mut ui_state)
            }
            UIMode::ChatInput => handle_chat_input(key, &mut shell, &mut ui_state),
            UIMode::EditingDraft => handle_draft_editor(key, &config, &mut shell, &mut ui_state),
            UIMode::EditingPrompt => handle_prompt_editor(key, &config, &mut shell, &mut ui_state),
        };
        dispatch(requests, &backend, &tx);
    }

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        crossterm::terminal::LeaveAlternateScreen,
        crossterm::event::DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    info!("exiting");

    Ok(())
}
