use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(from = "Option<String>")]
pub enum Category {
    Important,
    ToDo,
    Newsletter,
    Spam,
    #[default]
    Uncategorized,
}

impl From<Option<String>> for Category {
    fn from(raw: Option<String>) -> Self {
        let Some(raw) = raw else {
            return Category::Uncategorized;
        };
        // The model sometimes answers "to do" or "todo" instead of "To-Do"
        let key: String = raw
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect();
        match key.as_str() {
            "important" => Category::Important,
            "todo" => Category::ToDo,
            "newsletter" => Category::Newsletter,
            "spam" => Category::Spam,
            _ => Category::Uncategorized,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Category::Important => "Important",
            Category::ToDo => "To-Do",
            Category::Newsletter => "Newsletter",
            Category::Spam => "Spam",
            Category::Uncategorized => "uncategorized",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Task {
    pub task: String,
    pub deadline: Option<String>,
    pub notes: Option<String>,
}

/// An email as the client sees it. `/inbox` only fills the summary fields;
/// `/email/{id}` adds the body and the processing results.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Email {
    pub id: i64,
    #[serde(default)]
    pub sender: String,
    #[serde(default)]
    pub recipients: Option<String>,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub category: Category,
    #[serde(skip)]
    pub tasks: Vec<Task>,
    #[serde(skip)]
    pub draft: Option<DraftPreview>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Draft {
    pub id: i64,
    #[serde(default)]
    pub email_id: Option<i64>,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Unsaved draft. Also the payload of `POST /draft/save`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DraftPreview {
    #[serde(default)]
    pub email_id: i64,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub body: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DraftDetail {
    pub draft: Draft,
    pub email: Option<Email>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub text: String,
    pub error: bool,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
            error: false,
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
            error: false,
        }
    }

    pub fn failure(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
            error: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatRequest {
    pub email_id: Option<i64>,
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DraftRequest {
    pub email_id: i64,
    pub tone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_key: Option<String>,
    /// Always false: generation is a preview until `/draft/save`.
    pub save: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChatReply {
    #[serde(default)]
    pub reply: String,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

pub type PromptMap = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptUpdate {
    Updated,
    Created,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct IngestReport {
    #[serde(default)]
    pub processed: u64,
    #[serde(default)]
    pub errors: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_from_backend_strings() {
        assert_eq!(Category::from(Some("Important".into())), Category::Important);
        assert_eq!(Category::from(Some("To-Do".into())), Category::ToDo);
        assert_eq!(Category::from(Some(" to do ".into())), Category::ToDo);
        assert_eq!(Category::from(Some("SPAM".into())), Category::Spam);
        assert_eq!(Category::from(Some("weird".into())), Category::Uncategorized);
        assert_eq!(Category::from(None), Category::Uncategorized);
    }

    #[test]
    fn test_email_summary_deserializes_with_missing_fields() {
        let email: Email = serde_json::from_value(serde_json::json!({
            "id": 3,
            "sender": "alice@example.com",
            "subject": "Lunch",
            "timestamp": null,
            "category": null
        }))
        .unwrap();
        assert_eq!(email.id, 3);
        assert_eq!(email.category, Category::Uncategorized);
        assert!(email.body.is_empty());
        assert!(email.tasks.is_empty());
    }

    #[test]
    fn test_draft_request_carries_preview_flag() {
        let req = DraftRequest {
            email_id: 7,
            tone: "friendly".into(),
            prompt_key: None,
            save: false,
        };
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"email_id": 7, "tone": "friendly", "save": false})
        );
    }
}
