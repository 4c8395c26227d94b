// OpenAI chat completions adapter
// API Reference: https://platform.openai.com/docs/api-reference/chat

use crate::llm::provider::LLMAdapter;
use crate::types::{AppError, AppResult, ContentPart, LLMMessage, LLMRequest, LLMResponse, MessageContent};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

const CHAT_FALLBACK_ERROR: &str = "Failed to get a response from OpenAI.";

pub struct OpenAIAdapter {
    client: Client,
    base_url: String,
    api_key: String,
}

// Request types for the chat completions API
#[derive(Serialize)]
struct OpenAIChatRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Serialize)]
struct OpenAIMessage {
    role: String,
    content: OpenAIMessageContent,
}

#[derive(Serialize)]
#[serde(untagged)]
enum OpenAIMessageContent {
    Text(String),
    Parts(Vec<OpenAIContentPart>),
}

#[derive(Serialize)]
#[serde(tag = "type")]
enum OpenAIContentPart {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "file")]
    File { file: OpenAIFileData },
}

#[derive(Serialize)]
struct OpenAIFileData {
    filename: String,
    file_data: String, // data URL
}

// Response types
#[derive(Deserialize)]
struct OpenAIChatResponse {
    #[serde(default)]
    choices: Vec<OpenAIChoice>,
}

#[derive(Deserialize)]
struct OpenAIChoice {
    #[serde(default)]
    message: Option<OpenAIResponseMessage>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct OpenAIResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct OpenAIErrorResponse {
    error: OpenAIError,
}

#[derive(Deserialize)]
struct OpenAIError {
    #[serde(default)]
    message: Option<String>,
}

impl OpenAIAdapter {
    pub fn new(client: Client, base_url: &str, api_key: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    fn convert_message(msg: &LLMMessage) -> OpenAIMessage {
        let content = match &msg.content {
            MessageContent::Text(text) => OpenAIMessageContent::Text(text.clone()),
            MessageContent::Multimodal(parts) => OpenAIMessageContent::Parts(
                parts
                    .iter()
                    .map(|part| match part {
                        ContentPart::Text { text } => OpenAIContentPart::Text { text: text.clone() },
                        ContentPart::File { filename, media_type, base64 } => OpenAIContentPart::File {
                            file: OpenAIFileData {
                                filename: filename.clone(),
                                file_data: format!("data:{};base64,{}", media_type, base64),
                            },
                        },
                    })
                    .collect(),
            ),
        };

        OpenAIMessage {
            role: msg.role.clone(),
            content,
        }
    }
}

#[async_trait]
impl LLMAdapter for OpenAIAdapter {
    async fn create_chat_completion(&self, request: &LLMRequest) -> AppResult<LLMResponse> {
        let url = format!("{}/chat/completions", self.base_url);

        let body = OpenAIChatRequest {
            model: request.model.clone(),
            messages: request.messages.iter().map(Self::convert_message).collect(),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        debug!(model = %body.model, "Sending chat completion request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::llm(format!("OpenAI request failed: {}", e)))?;

        let parsed: OpenAIChatResponse = parse_response(response, CHAT_FALLBACK_ERROR).await?;

        let choice = parsed.choices.into_iter().next();
        let finish_reason = choice.as_ref().and_then(|c| c.finish_reason.clone());
        let content = choice
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .filter(|text| !text.is_empty());

        Ok(LLMResponse {
            content,
            finish_reason,
        })
    }
}

/// Decode a successful JSON body, or turn a non-success status into `AppError::LLMApi`
/// carrying the upstream status and its `error.message` (else `fallback`).
pub(crate) async fn parse_response<T: DeserializeOwned>(
    response: Response,
    fallback: &str,
) -> AppResult<T> {
    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| AppError::llm(format!("Failed to read OpenAI response: {}", e)))?;

    if !status.is_success() {
        error!(status = %status, "OpenAI API error: {}", text);
        let message = serde_json::from_str::<OpenAIErrorResponse>(&text)
            .ok()
            .and_then(|e| e.error.message)
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| fallback.to_string());
        return Err(AppError::LLMApi {
            status: Some(status.as_u16()),
            message,
        });
    }

    serde_json::from_str(&text)
        .map_err(|e| AppError::llm(format!("Failed to parse OpenAI response: {}", e)))
}
