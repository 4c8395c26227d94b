// Type definitions, LLM message shapes and the application error

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct LLMRequest {
    pub model: String,
    pub messages: Vec<LLMMessage>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

/// Content part for multimodal messages (text or an inlined file)
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type")]
pub enum ContentPart {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "file")]
    File {
        filename: String,
        media_type: String,
        base64: String,
    },
}

/// Message content - can be simple text or multimodal (text + files)
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Multimodal(Vec<ContentPart>),
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct LLMMessage {
    pub role: String, // "user", "assistant", "system"
    pub content: MessageContent,
}

impl LLMMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: MessageContent::Text(content.into()),
        }
    }

    /// Create a user message carrying a base64 file next to the instruction
    pub fn user_with_file(
        text: impl Into<String>,
        filename: impl Into<String>,
        media_type: impl Into<String>,
        base64: impl Into<String>,
    ) -> Self {
        Self {
            role: "user".to_string(),
            content: MessageContent::Multimodal(vec![
                ContentPart::Text { text: text.into() },
                ContentPart::File {
                    filename: filename.into(),
                    media_type: media_type.into(),
                    base64: base64.into(),
                },
            ]),
        }
    }
}

/// Reply text is `None` when the upstream returned no message content.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct LLMResponse {
    pub content: Option<String>,
    pub finish_reason: Option<String>,
}

/// Body of every error response
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Decode(#[from] crate::multipart::DecodeError),

    #[error("Method Not Allowed")]
    MethodNotAllowed,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Configuration(String),

    /// Upstream failure. `status` is the upstream HTTP status when one was received.
    #[error("{message}")]
    LLMApi {
        status: Option<u16>,
        message: String,
    },

    #[error("Analysis did not complete after {attempts} status checks")]
    RunTimedOut { attempts: u32 },

    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn llm(message: impl Into<String>) -> Self {
        AppError::LLMApi {
            status: None,
            message: message.into(),
        }
    }

    /// Drops any upstream status so the error is reported as a plain server error.
    pub fn into_server_error(self) -> Self {
        match self {
            AppError::LLMApi { message, .. } => AppError::LLMApi {
                status: None,
                message,
            },
            other => other,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Decode(e) => e.status_code(),
            AppError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::LLMApi {
                status: Some(code), ..
            } => StatusCode::from_u16(*code)
                .ok()
                .filter(|s| s.is_client_error() || s.is_server_error())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            AppError::Configuration(_)
            | AppError::LLMApi { status: None, .. }
            | AppError::RunTimedOut { .. }
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(status = %status, "Request failed: {}", self);
        } else {
            tracing::debug!(status = %status, "Request rejected: {}", self);
        }

        let body = ErrorResponse {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

pub type AppResult<T> = std::result::Result<T, AppError>;
