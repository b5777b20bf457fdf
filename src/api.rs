//! HTTP access to the Email Productivity Agent backend.

use crate::models::{
    ChatReply, ChatRequest, Draft, DraftDetail, DraftPreview, DraftRequest, Email, IngestReport,
    PromptMap, PromptUpdate,
};
use crate::normalize::{self, ShapeError};
use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde_json::{Value, json};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

pub const GENERIC_ERROR: &str = "Something went wrong. Please try again.";
pub const INVALID_RESPONSE: &str = "Invalid response format from server.";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("server responded with {status}{}", with_detail(.detail))]
    Status {
        status: StatusCode,
        detail: Option<String>,
    },
    #[error("no response received: {0}")]
    NoResponse(#[source] reqwest::Error),
    #[error("request could not be sent: {0}")]
    Request(String),
    #[error("invalid response format: {0}")]
    InvalidResponse(#[from] ShapeError),
    #[error("server reported an error: {0}")]
    Rejected(String),
}

fn with_detail(detail: &Option<String>) -> String {
    detail.as_deref().map(|d| format!(": {}", d)).unwrap_or_default()
}

impl ApiError {
    /// The one string shown to the user for any failure.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Status {
                detail: Some(detail),
                ..
            } => detail.clone(),
            ApiError::Rejected(detail) if !detail.is_empty() => detail.clone(),
            ApiError::InvalidResponse(_) => INVALID_RESPONSE.to_string(),
            _ => GENERIC_ERROR.to_string(),
        }
    }
}

/// Pull the human-readable reason out of an error body. FastAPI uses
/// `detail` (a string, or a list of validation errors); the agent routes use
/// `error`.
pub fn error_detail(body: &Value) -> Option<String> {
    match body.get("detail") {
        Some(Value::String(s)) if !s.is_empty() => return Some(s.clone()),
        Some(Value::Array(items)) => {
            if let Some(msg) = items.iter().find_map(|i| i.get("msg").and_then(Value::as_str)) {
                return Some(msg.to_string());
            }
        }
        _ => {}
    }
    body.get("error")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn reject_reported_error(body: &Value) -> Result<(), ApiError> {
    if body.get("status").and_then(Value::as_str) == Some("error") {
        return Err(ApiError::Rejected(error_detail(body).unwrap_or_default()));
    }
    Ok(())
}

/// Resolve the backend base URL: environment override, then settings, then default.
pub fn resolve_base_url(env_override: Option<String>, configured: Option<&str>) -> String {
    env_override
        .filter(|s| !s.trim().is_empty())
        .or_else(|| configured.map(str::to_string).filter(|s| !s.trim().is_empty()))
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
        .trim()
        .trim_end_matches('/')
        .to_string()
}

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ApiError> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/json"),
        );
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .default_headers(headers)
            .build()
            .map_err(|e| ApiError::Request(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<Value, ApiError> {
        self.request(Method::GET, path, query, None).await
    }

    pub async fn post(
        &self,
        path: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> Result<Value, ApiError> {
        self.request(Method::POST, path, query, body).await
    }

    pub async fn delete(&self, path: &str, body: Option<&Value>) -> Result<Value, ApiError> {
        self.request(Method::DELETE, path, &[], body).await
    }

    async fn request(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> Result<Value, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%method, %url, has_body = body.is_some(), "api request");

        let mut builder = self.http.request(method.clone(), &url);
        if !query.is_empty() {
            builder = builder.query(query);
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) if e.is_builder() => {
                error!(%method, %url, error = %e, "api request setup failed");
                return Err(ApiError::Request(e.to_string()));
            }
            Err(e) => {
                warn!(%method, %url, error = %e, timeout = e.is_timeout(), "api no response received");
                return Err(ApiError::NoResponse(e));
            }
        };

        let status = response.status();
        let text = response.text().await.map_err(|e| {
            warn!(%method, %url, %status, error = %e, "api response body lost");
            ApiError::NoResponse(e)
        })?;
        let parsed = if text.trim().is_empty() {
            Ok(Value::Null)
        } else {
            serde_json::from_str::<Value>(&text)
        };

        if !status.is_success() {
            let detail = parsed.as_ref().ok().and_then(error_detail);
            warn!(%method, %url, %status, detail = ?detail, "api server responded with error status");
            return Err(ApiError::Status { status, detail });
        }

        match parsed {
            Ok(value) => {
                debug!(%method, %url, %status, "api response");
                Ok(value)
            }
            Err(e) => {
                warn!(%method, %url, %status, error = %e, "api response is not JSON");
                Err(ApiError::InvalidResponse(ShapeError::Field {
                    key: "body",
                    reason: e.to_string(),
                }))
            }
        }
    }
}

/// Typed backend surface. Canonical bodies are noted per method; the
/// wrapped form is accepted by the normalizer as well.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Backend: Send + Sync {
    /// `GET /inbox` -> `[Email]`
    async fn list_emails(&self) -> Result<Vec<Email>, ApiError>;
    /// `POST /inbox/load` -> `{status, result: {processed, errors}}`
    async fn load_inbox(&self, reset: bool) -> Result<IngestReport, ApiError>;
    /// `GET /email/{id}` -> `{email, processing}`
    async fn get_email(&self, id: i64) -> Result<Email, ApiError>;
    /// `POST /agent/chat` -> `{reply, metadata}`
    async fn chat(&self, request: &ChatRequest) -> Result<ChatReply, ApiError>;
    /// `POST /agent/draft` -> `{draft: DraftPreview}`
    async fn generate_draft(&self, request: &DraftRequest) -> Result<DraftPreview, ApiError>;
    /// `POST /draft/save` -> `{status: "saved", draft: Draft}`
    async fn save_draft(&self, draft: &DraftPreview) -> Result<Draft, ApiError>;
    /// `GET /draft/{id}` -> `{draft, email}`
    async fn get_draft(&self, id: i64) -> Result<DraftDetail, ApiError>;
    /// `DELETE /draft/{id}` -> `{status: "deleted", id}`
    async fn delete_draft(&self, id: i64) -> Result<(), ApiError>;
    /// `GET /drafts` -> `[Draft]`
    async fn list_drafts(&self) -> Result<Vec<Draft>, ApiError>;
    /// `DELETE /drafts/batch-delete` -> `{status: "deleted", deleted_ids}`
    async fn delete_drafts(&self, ids: &[i64]) -> Result<Vec<i64>, ApiError>;
    /// `GET /prompts` -> `{key: text}`
    async fn get_prompts(&self) -> Result<PromptMap, ApiError>;
    /// `POST /prompts/update?key=..&text=..` -> `{status: "updated" | "created"}`
    async fn update_prompt(&self, key: &str, text: &str) -> Result<PromptUpdate, ApiError>;
}

/// Build the full email from the `/email/{id}` body: the email record plus
/// whatever the processing row carries.
pub fn email_detail(body: Value) -> Result<Email, ApiError> {
    let processing = body.get("processing").cloned().unwrap_or(Value::Null);
    let mut email: Email = normalize::resource(body, "email")?;

    if let Value::Object(proc) = &processing {
        email.category = proc
            .get("category")
            .and_then(Value::as_str)
            .map(|c| c.to_string())
            .into();
        email.tasks = proc
            .get("tasks_json")
            .or_else(|| proc.get("tasks"))
            .map(normalize::parse_tasks)
            .unwrap_or_default();
        email.draft = proc
            .get("draft_json")
            .or_else(|| proc.get("draft"))
            .and_then(normalize::parse_embedded);
    }
    Ok(email)
}

#[async_trait]
impl Backend for ApiClient {
    async fn list_emails(&self) -> Result<Vec<Email>, ApiError> {
        let body = self.get("/inbox", &[]).await?;
        let emails: Vec<Email> = normalize::collection(body, "emails")?;
        info!(count = emails.len(), "inbox loaded");
        Ok(emails)
    }

    async fn load_inbox(&self, reset: bool) -> Result<IngestReport, ApiError> {
        let query = [("mock", "true".to_string()), ("reset", reset.to_string())];
        let body = self.post("/inbox/load", &query, None).await?;
        reject_reported_error(&body)?;
        let result = body.get("result").cloned().unwrap_or(body);
        reject_reported_error(&result)?;
        let report: IngestReport = normalize::resource(result, "result")?;
        info!(processed = report.processed, errors = report.errors.len(), reset, "inbox ingestion finished");
        Ok(report)
    }

    async fn get_email(&self, id: i64) -> Result<Email, ApiError> {
        let body = self.get(&format!("/email/{}", id), &[]).await?;
        email_detail(body)
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatReply, ApiError> {
        let payload = serde_json::to_value(request).map_err(|e| ApiError::Request(e.to_string()))?;
        let body = self.post("/agent/chat", &[], Some(&payload)).await?;
        reject_reported_error(&body)?;
        Ok(normalize::resource(body, "chat")?)
    }

    async fn generate_draft(&self, request: &DraftRequest) -> Result<DraftPreview, ApiError> {
        let payload = serde_json::to_value(request).map_err(|e| ApiError::Request(e.to_string()))?;
        let body = self.post("/agent/draft", &[], Some(&payload)).await?;
        reject_reported_error(&body)?;
        let mut draft: DraftPreview = normalize::resource(body, "draft")?;
        if draft.email_id == 0 {
            draft.email_id = request.email_id;
        }
        Ok(draft)
    }

    async fn save_draft(&self, draft: &DraftPreview) -> Result<Draft, ApiError> {
        let payload = serde_json::to_value(draft).map_err(|e| ApiError::Request(e.to_string()))?;
        let body = self.post("/draft/save", &[], Some(&payload)).await?;
        reject_reported_error(&body)?;
        let saved: Draft = normalize::resource(body, "draft")?;
        info!(draft_id = saved.id, email_id = draft.email_id, "draft saved");
        Ok(saved)
    }

    async fn get_draft(&self, id: i64) -> Result<DraftDetail, ApiError> {
        let body = self.get(&format!("/draft/{}", id), &[]).await?;
        let email = match body.get("email") {
            Some(e @ Value::Object(_)) => Some(normalize::resource::<Email>(e.clone(), "email")?),
            _ => None,
        };
        let draft: Draft = normalize::resource(body, "draft")?;
        Ok(DraftDetail { draft, email })
    }

    async fn delete_draft(&self, id: i64) -> Result<(), ApiError> {
        let body = self.delete(&format!("/draft/{}", id), None).await?;
        reject_reported_error(&body)?;
        info!(draft_id = id, "draft deleted");
        Ok(())
    }

    async fn list_drafts(&self) -> Result<Vec<Draft>, ApiError> {
        let body = self.get("/drafts", &[]).await?;
        Ok(normalize::collection(body, "drafts")?)
    }

    async fn delete_drafts(&self, ids: &[i64]) -> Result<Vec<i64>, ApiError> {
        let payload = json!({ "ids": ids });
        let body = self.delete("/drafts/batch-delete", Some(&payload)).await?;
        reject_reported_error(&body)?;
        let deleted: Vec<i64> = normalize::collection(body, "deleted_ids")?;
        info!(requested = ids.len(), deleted = deleted.len(), "drafts batch deleted");
        Ok(deleted)
    }

    async fn get_prompts(&self) -> Result<PromptMap, ApiError> {
        let body = self.get("/prompts", &[]).await?;
        Ok(normalize::mapping(body, "prompts")?)
    }

    async fn update_prompt(&self, key: &str, text: &str) -> Result<PromptUpdate, ApiError> {
        let query = [("key", key.to_string()), ("text", text.to_string())];
        let body = self.post("/prompts/update", &query, None).await?;
        reject_reported_error(&body)?;
        match body.get("status").and_then(Value::as_str) {
            Some("created") => Ok(PromptUpdate::Created),
            Some("updated") => Ok(PromptUpdate::Updated),
            _ => Err(ShapeError::Field {
                key: "status",
                reason: format!("unexpected prompt update body {}", body),
            }
            .into()),
        }
    }
}
