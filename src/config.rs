use crate::api;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use serde::{Deserialize, Serialize};
use tracing::warn;

pub const SETTINGS_FILE: &str = "settings.toml";
pub const API_URL_ENV: &str = "INBOX_AGENT_API_URL";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub keybindings: Keybindings,
    #[serde(default)]
    pub api: ApiSettings,
    #[serde(default)]
    pub agent: AgentSettings,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiSettings {
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSettings {
    #[serde(default = "default_tone")]
    pub tone: String,
    pub chat_prompt_key: Option<String>,
    #[serde(default = "default_draft_prompt")]
    pub draft_prompt_key: Option<String>,
}

fn default_tone() -> String {
    crate::panels::chat::DEFAULT_TONE.to_string()
}

fn default_draft_prompt() -> Option<String> {
    Some("auto_reply".to_string())
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            tone: default_tone(),
            chat_prompt_key: None,
            draft_prompt_key: default_draft_prompt(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Keybindings {
    pub next_view: Vec<String>,
    pub prev_view: Vec<String>,
    pub move_up: Vec<String>,
    pub move_down: Vec<String>,
    pub scroll_up: Vec<String>,
    pub scroll_down: Vec<String>,
    pub open: Vec<String>,
    pub refresh: Vec<String>,
    pub load_mock: Vec<String>,
    pub reprocess: Vec<String>,
    pub toggle_chat: Vec<String>,
    pub chat_input: Vec<String>,
    pub generate_draft: Vec<String>,
    pub toggle_select: Vec<String>,
    pub delete: Vec<String>,
    pub edit: Vec<String>,
    pub save: Vec<String>,
    pub confirm: Vec<String>,
    pub cancel: Vec<String>,
    pub quit: Vec<String>,
}

fn keys(list: &[&str]) -> Vec<String> {
    list.iter().map(|k| k.to_string()).collect()
}

impl Default for Keybindings {
    fn default() -> Self {
        Self {
            next_view: keys(&["Tab", "l", "Right"]),
            prev_view: keys(&["BackTab", "h", "Left"]),
            move_up: keys(&["k", "Up"]),
            move_down: keys(&["j", "Down"]),
            scroll_up: keys(&["ctrl-u", "K"]),
            scroll_down: keys(&["ctrl-d", "J"]),
            open: keys(&["Enter"]),
            refresh: keys(&["r"]),
            load_mock: keys(&["m"]),
            reprocess: keys(&["M"]),
            toggle_chat: keys(&["c"]),
            chat_input: keys(&["i"]),
            generate_draft: keys(&["g"]),
            toggle_select: keys(&[" "]),
            delete: keys(&["d", "Backspace"]),
            edit: keys(&["e"]),
            save: keys(&["ctrl-s"]),
            confirm: keys(&["y"]),
            cancel: keys(&["n", "Esc"]),
            quit: keys(&["q"]),
        }
    }
}

pub fn parse_key_string(key_str: &str) -> (KeyCode, KeyModifiers) {
    // A lone "-" is the minus key, not a separator
    let mut parts: Vec<&str> = if key_str == "-" {
        vec!["-"]
    } else {
        key_str.split('-').collect()
    };
    let mut modifiers = KeyModifiers::empty();

    // We process from the end to find the base key, then consume prefixes
    let base_key_str = parts.pop().unwrap_or("");

    for part in parts {
        match part.to_lowercase().as_str() {
            "ctrl" => modifiers.insert(KeyModifiers::CONTROL),
            "alt" => modifiers.insert(KeyModifiers::ALT),
            "shift" => modifiers.insert(KeyModifiers::SHIFT),
            "cmd" | "command" | "super" => modifiers.insert(KeyModifiers::SUPER),
            "meta" => modifiers.insert(KeyModifiers::META),
            _ => {}
        }
    }

    let code = match base_key_str {
        "Backspace" => KeyCode::Backspace,
        "Enter" => KeyCode::Enter,
        "Left" => KeyCode::Left,
        "Right" => KeyCode::Right,
        "Up" => KeyCode::Up,
        "Down" => KeyCode::Down,
        "Tab" => KeyCode::Tab,
        "BackTab" => KeyCode::BackTab,
        "Esc" => KeyCode::Esc,
        "Delete" => KeyCode::Delete,
        " " => KeyCode::Char(' '),
        s => {
            let mut chars = s.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => KeyCode::Char(c),
                _ => KeyCode::Null,
            }
        }
    };

    (code, modifiers)
}

/// Modifiers must match exactly, except that SHIFT may be added: terminals
/// report it with uppercase letters and BackTab.
pub fn matches_key(event: KeyEvent, bindings: &[String]) -> bool {
    bindings.iter().any(|b| {
        let (code, modifiers) = parse_key_string(b);
        event.code == code
            && event.modifiers.contains(modifiers)
            && event
                .modifiers
                .difference(modifiers)
                .difference(KeyModifiers::SHIFT)
                .is_empty()
    })
}

impl Config {
    pub fn load() -> Self {
        use std::fs;
        match fs::read_to_string(SETTINGS_FILE) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => config,
                Err(e) => {
                    warn!(error = %e, file = SETTINGS_FILE, "ignoring invalid settings");
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    /// Backend base URL: `INBOX_AGENT_API_URL`, then `[api] base_url`, then the default.
    pub fn api_base_url(&self) -> String {
        api::resolve_base_url(std::env::var(API_URL_ENV).ok(), self.api.base_url.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_string_modifiers() {
        assert_eq!(
            parse_key_string("ctrl-s"),
            (KeyCode::Char('s'), KeyModifiers::CONTROL)
        );
        assert_eq!(parse_key_string("Enter"), (KeyCode::Enter, KeyModifiers::empty()));
        assert_eq!(parse_key_string(" "), (KeyCode::Char(' '), KeyModifiers::empty()));
        assert_eq!(parse_key_string("-"), (KeyCode::Char('-'), KeyModifiers::empty()));
        assert_eq!(parse_key_string("Nonsense").0, KeyCode::Null);
    }

    #[test]
    fn test_matches_key_tolerates_shift() {
        let bindings = keys(&["M"]);
        let event = KeyEvent::new(KeyCode::Char('M'), KeyModifiers::SHIFT);
        assert!(matches_key(event, &bindings));
        let back = keys(&["BackTab"]);
        assert!(matches_key(KeyEvent::new(KeyCode::BackTab, KeyModifiers::SHIFT), &back));
        let save = keys(&["ctrl-s"]);
        assert!(!matches_key(KeyEvent::new(KeyCode::Char('s'), KeyModifiers::empty()), &save));
    }

    #[test]
    fn test_matches_key_rejects_extra_modifiers() {
        let keybindings = Keybindings::default();
        let ctrl_d = KeyEvent::new(KeyCode::Char('d'), KeyModifiers::CONTROL);
        assert!(!matches_key(ctrl_d, &keybindings.delete));
        assert!(matches_key(ctrl_d, &keybindings.scroll_down));

        let plain_d = KeyEvent::new(KeyCode::Char('d'), KeyModifiers::empty());
        assert!(matches_key(plain_d, &keybindings.delete));
        assert!(!matches_key(plain_d, &keybindings.scroll_down));

        let alt_q = KeyEvent::new(KeyCode::Char('q'), KeyModifiers::ALT);
        assert!(!matches_key(alt_q, &keybindings.quit));
    }

    #[test]
    fn test_partial_settings_keep_defaults() {
        let config: Config = toml::from_str(
            r#"
            [api]
            base_url = "http://backend:8000"

            [keybindings]
            quit = ["Q"]
            "#,
        )
        .unwrap();
        assert_eq!(config.api.base_url.as_deref(), Some("http://backend:8000"));
        assert_eq!(config.keybindings.quit, vec!["Q".to_string()]);
        assert_eq!(config.keybindings.save, vec!["ctrl-s".to_string()]);
        assert_eq!(config.agent.tone, "friendly");
        assert_eq!(config.agent.draft_prompt_key.as_deref(), Some("auto_reply"));
    }
}
