use std::time::Duration;

use crate::config::Config;
use crate::llm::{AssistantsClient, OpenAIAdapter};
use crate::multipart::{MultipartForm, UploadedFile};
use crate::types::{AppError, AppResult};

pub const NO_ANALYSIS_PLACEHOLDER: &str = "No analysis was returned.";

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.llm.timeout_secs))
            .build()?;
        Ok(Self { config, http })
    }

    fn api_key(&self) -> AppResult<&str> {
        self.config
            .llm
            .openai_api_key
            .as_deref()
            .ok_or_else(|| AppError::Configuration("API key is not set on the server.".to_string()))
    }

    pub fn chat_adapter(&self) -> AppResult<OpenAIAdapter> {
        let key = self.api_key()?;
        Ok(OpenAIAdapter::new(self.http.clone(), &self.config.llm.base_url, key))
    }

    pub fn assistants_client(&self) -> AppResult<AssistantsClient> {
        let key = self.api_key()?;
        Ok(AssistantsClient::new(self.http.clone(), &self.config.llm.base_url, key))
    }

    pub fn assistant_id(&self) -> AppResult<&str> {
        self.config
            .assistant
            .assistant_id
            .as_deref()
            .ok_or_else(|| {
                AppError::Configuration("Assistant ID is not set on the server.".to_string())
            })
    }
}

// Domain

/// A document plus the instruction to apply to it. Lives for one request.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub prompt: String,
    pub document: Option<UploadedFile>,
}

impl AnalysisRequest {
    /// Build from a decoded form, requiring both a prompt and a non-empty file.
    pub fn from_form(form: MultipartForm) -> AppResult<Self> {
        match form.file {
            Some(file) if !file.data.is_empty() && !form.prompt.trim().is_empty() => Ok(Self {
                prompt: form.prompt,
                document: Some(file),
            }),
            _ => Err(AppError::InvalidRequest("Missing prompt or file.".to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisResult {
    pub text: String,
}

/// Identifiers of a submitted run. Opaque; only stored and forwarded.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunHandle {
    pub thread_id: String,
    pub run_id: String,
}

/// Run lifecycle as reported upstream.
///
/// Unrecognised values are kept verbatim so they can be echoed to clients.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RunStatus {
    Queued,
    InProgress,
    RequiresAction,
    Cancelling,
    Completed,
    Failed,
    Cancelled,
    Expired,
    Incomplete,
    Other(String),
}

impl RunStatus {
    pub fn as_str(&self) -> &str {
        match self {
            RunStatus::Queued => "queued",
            RunStatus::InProgress => "in_progress",
            RunStatus::RequiresAction => "requires_action",
            RunStatus::Cancelling => "cancelling",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
            RunStatus::Cancelled => "cancelled",
            RunStatus::Expired => "expired",
            RunStatus::Incomplete => "incomplete",
            RunStatus::Other(s) => s,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunStatus::Completed
                | RunStatus::Failed
                | RunStatus::Cancelled
                | RunStatus::Expired
                | RunStatus::Incomplete
        )
    }

    /// Terminal without a result
    pub fn is_failure(&self) -> bool {
        self.is_terminal() && *self != RunStatus::Completed
    }
}

impl From<String> for RunStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "queued" => RunStatus::Queued,
            "in_progress" => RunStatus::InProgress,
            "requires_action" => RunStatus::RequiresAction,
            "cancelling" => RunStatus::Cancelling,
            "completed" => RunStatus::Completed,
            "failed" => RunStatus::Failed,
            "cancelled" => RunStatus::Cancelled,
            "expired" => RunStatus::Expired,
            "incomplete" => RunStatus::Incomplete,
            _ => RunStatus::Other(s),
        }
    }
}

impl From<RunStatus> for String {
    fn from(status: RunStatus) -> Self {
        status.as_str().to_string()
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// API Request/Response types

#[derive(Debug, serde::Deserialize)]
pub struct AnalyzeTextRequest {
    pub prompt: Option<String>,
    pub text: Option<String>,
    pub document: Option<InlineDocument>,
}

/// Base64 document sent inline with a JSON request
#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineDocument {
    pub filename: Option<String>,
    pub media_type: Option<String>,
    pub data: String,
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct AnalysisResponse {
    pub analysis: String,
}

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusQuery {
    pub thread_id: Option<String>,
    pub run_id: Option<String>,
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct StatusResponse {
    pub status: RunStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub openai_configured: bool,
    pub assistant_configured: bool,
}
