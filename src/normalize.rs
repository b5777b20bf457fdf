//! Response normalization.
//!
//! Every endpoint has one canonical body shape (documented on the `Backend`
//! methods). The wrapped `{ "<key>": ... }` form some backend versions emit is
//! accepted as well. Anything else is a `ShapeError`, which the client reports
//! separately from an empty result.

use crate::models::{PromptMap, Task};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ShapeError {
    #[error("expected {expected} (optionally wrapped in `{key}`), got {found}")]
    Unexpected {
        key: &'static str,
        expected: &'static str,
        found: &'static str,
    },
    #[error("item {index} under `{key}` is malformed: {reason}")]
    Item {
        key: &'static str,
        index: usize,
        reason: String,
    },
    #[error("`{key}` is malformed: {reason}")]
    Field { key: &'static str, reason: String },
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Take `body[key]` when the body is an object carrying that key.
fn unwrap_key(body: Value, key: &str) -> Value {
    match body {
        Value::Object(mut map) if map.contains_key(key) => map.remove(key).unwrap_or(Value::Null),
        other => other,
    }
}

/// Normalize a collection body: `{key: [...]}` or a bare `[...]`.
pub fn collection<T: DeserializeOwned>(body: Value, key: &'static str) -> Result<Vec<T>, ShapeError> {
    match unwrap_key(body, key) {
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(index, item)| {
                serde_json::from_value(item).map_err(|e| ShapeError::Item {
                    key,
                    index,
                    reason: e.to_string(),
                })
            })
            .collect(),
        other => Err(ShapeError::Unexpected {
            key,
            expected: "an array",
            found: kind(&other),
        }),
    }
}

/// Normalize a single resource body: `{key: {...}}` or a bare `{...}`.
pub fn resource<T: DeserializeOwned>(body: Value, key: &'static str) -> Result<T, ShapeError> {
    let inner = match body {
        Value::Object(mut map) if matches!(map.get(key), Some(Value::Object(_))) => {
            map.remove(key).unwrap_or(Value::Null)
        }
        other => other,
    };
    match inner {
        Value::Object(_) => serde_json::from_value(inner).map_err(|e| ShapeError::Field {
            key,
            reason: e.to_string(),
        }),
        other => Err(ShapeError::Unexpected {
            key,
            expected: "an object",
            found: kind(&other),
        }),
    }
}

/// Normalize a key -> text mapping such as the prompt table.
pub fn mapping(body: Value, key: &'static str) -> Result<PromptMap, ShapeError> {
    let inner = match body {
        Value::Object(mut map) if matches!(map.get(key), Some(Value::Object(_))) => {
            map.remove(key).unwrap_or(Value::Null)
        }
        other => other,
    };
    let Value::Object(map) = inner else {
        return Err(ShapeError::Unexpected {
            key,
            expected: "an object",
            found: kind(&inner),
        });
    };

    let mut prompts = PromptMap::new();
    for (name, text) in map {
        match text {
            Value::String(text) => {
                prompts.insert(name, text);
            }
            Value::Null => {
                prompts.insert(name, String::new());
            }
            other => {
                return Err(ShapeError::Field {
                    key,
                    reason: format!("value for `{}` is {}", name, kind(&other)),
                });
            }
        }
    }
    Ok(prompts)
}

fn strip_code_fences(text: &str) -> &str {
    let mut t = text.trim();
    if let Some(rest) = t.strip_prefix("```") {
        // Drop the language tag on the opening fence
        t = match rest.find('\n') {
            Some(pos) => &rest[pos + 1..],
            None => rest,
        };
    }
    t.strip_suffix("```").unwrap_or(t).trim()
}

/// Decode a field that may hold JSON directly or as a JSON-encoded string.
fn decode_embedded(value: &Value) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::String(s) => {
            let s = strip_code_fences(s);
            if s.is_empty() {
                return None;
            }
            serde_json::from_str(s).ok()
        }
        other => Some(other.clone()),
    }
}

fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.trim().to_string()),
        other => Some(other.to_string()),
    }
}

fn task_from(item: &Value) -> Option<Task> {
    match item {
        Value::Object(map) => {
            let task = ["task", "text", "fragment"]
                .iter()
                .find_map(|k| map.get(*k).and_then(text_of))?;
            Some(Task {
                task,
                deadline: map.get("deadline").and_then(text_of),
                notes: map.get("notes").and_then(text_of),
            })
        }
        Value::String(s) if !s.trim().is_empty() => Some(Task {
            task: s.trim().to_string(),
            ..Task::default()
        }),
        _ => None,
    }
}

/// Parse the tasks attached to an email. Never fails: anything that is not
/// recognizably a task list yields no tasks.
pub fn parse_tasks(value: &Value) -> Vec<Task> {
    match decode_embedded(value) {
        Some(Value::Array(items)) => items.iter().filter_map(task_from).collect(),
        Some(item @ Value::Object(_)) => task_from(&item).into_iter().collect(),
        _ => Vec::new(),
    }
}

/// Parse an object stored as a JSON string (e.g. `draft_json`). Failures yield `None`.
pub fn parse_embedded<T: DeserializeOwned>(value: &Value) -> Option<T> {
    match decode_embedded(value)? {
        obj @ Value::Object(_) => serde_json::from_value(obj).ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Draft, DraftPreview, Email};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn inbox_items() -> Value {
        json!([
            {"id": 1, "sender": "a@example.com", "subject": "Hi", "timestamp": "2024-05-01T10:00:00", "category": "Important"},
            {"id": 2, "sender": "b@example.com", "subject": "Sale", "timestamp": null, "category": "Newsletter"}
        ])
    }

    #[test]
    fn test_collection_same_for_wrapped_and_bare() {
        let bare: Vec<Email> = collection(inbox_items(), "emails").unwrap();
        let wrapped: Vec<Email> = collection(json!({ "emails": inbox_items() }), "emails").unwrap();
        assert_eq!(bare, wrapped);
        assert_eq!(bare.len(), 2);
    }

    #[test]
    fn test_collection_empty_is_not_an_error() {
        let drafts: Vec<Draft> = collection(json!([]), "drafts").unwrap();
        assert!(drafts.is_empty());
    }

    #[test]
    fn test_collection_rejects_unexpected_shape() {
        let err = collection::<Draft>(json!({"status": "ok"}), "drafts").unwrap_err();
        assert_eq!(
            err,
            ShapeError::Unexpected {
                key: "drafts",
                expected: "an array",
                found: "an object"
            }
        );
        assert!(collection::<Draft>(Value::Null, "drafts").is_err());
    }

    #[test]
    fn test_collection_rejects_malformed_item() {
        let err = collection::<Draft>(json!([{"id": 1}, {"subject": "no id"}]), "drafts").unwrap_err();
        assert!(matches!(err, ShapeError::Item { index: 1, .. }));
    }

    #[test]
    fn test_resource_wrapped_and_bare() {
        let wrapped: DraftPreview =
            resource(json!({"draft": {"email_id": 1, "subject": "Re: Hi", "body": "b"}}), "draft").unwrap();
        let bare: DraftPreview = resource(json!({"email_id": 1, "subject": "Re: Hi", "body": "b"}), "draft").unwrap();
        assert_eq!(wrapped, bare);
        assert!(resource::<DraftPreview>(json!([1, 2]), "draft").is_err());
    }

    #[test]
    fn test_mapping_accepts_prompt_table() {
        let prompts = mapping(json!({"auto_reply": "Be polite", "categorization": null}), "prompts").unwrap();
        assert_eq!(prompts.get("auto_reply").map(String::as_str), Some("Be polite"));
        assert_eq!(prompts.get("categorization").map(String::as_str), Some(""));

        let wrapped = mapping(json!({"prompts": {"auto_reply": "Be polite"}}), "prompts").unwrap();
        assert_eq!(wrapped.len(), 1);
        assert!(mapping(json!({"auto_reply": 3}), "prompts").is_err());
    }

    #[test]
    fn test_parse_tasks_invalid_json_string_is_empty() {
        assert!(parse_tasks(&json!("[{\"task\": ")).is_empty());
        assert!(parse_tasks(&json!("not json at all")).is_empty());
        assert!(parse_tasks(&Value::Null).is_empty());
        assert!(parse_tasks(&json!(42)).is_empty());
    }

    #[test]
    fn test_parse_tasks_from_encoded_string() {
        let raw = json!("[{\"task\": \"Send report\", \"deadline\": \"Friday\"}, \"Call Bob\"]");
        let tasks = parse_tasks(&raw);
        assert_eq!(
            tasks,
            vec![
                Task {
                    task: "Send report".into(),
                    deadline: Some("Friday".into()),
                    notes: None
                },
                Task {
                    task: "Call Bob".into(),
                    ..Task::default()
                },
            ]
        );
    }

    #[test]
    fn test_parse_tasks_fenced_and_alternate_keys() {
        let raw = json!("```json\n[{\"text\": \"Review PR\", \"deadline\": null, \"notes\": \"urgent\"}]\n```");
        let tasks = parse_tasks(&raw);
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].task, "Review PR");
        assert_eq!(tasks[0].deadline, None);
        assert_eq!(tasks[0].notes.as_deref(), Some("urgent"));
    }

    #[test]
    fn test_parse_embedded_draft() {
        let draft: Option<DraftPreview> =
            parse_embedded(&json!("{\"subject\": \"Re: Hi\", \"body\": \"Thanks\"}"));
        assert_eq!(draft.map(|d| d.subject), Some("Re: Hi".to_string()));
        assert_eq!(parse_embedded::<DraftPreview>(&json!("{broken")), None);
    }
}
