//! Direct Completion Agent
//!
//! One chat completion per request: the instruction plus either embedded text
//! or an inlined base64 document. Blocks until the upstream answers.

use base64::Engine;
use tracing::info;

use crate::llm::LLMAdapter;
use crate::models::{AnalysisResult, AnalyzeTextRequest, InlineDocument, NO_ANALYSIS_PLACEHOLDER};
use crate::types::{AppError, AppResult, LLMMessage, LLMRequest};

/// What the instruction is applied to
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisInput {
    Text(String),
    Document {
        filename: String,
        media_type: String,
        base64: String,
    },
}

pub struct DirectCompletionAgent;

impl DirectCompletionAgent {
    /// Split a JSON request into prompt and input, rejecting missing fields.
    /// Text wins when both text and a document are supplied.
    pub fn validate(request: AnalyzeTextRequest) -> AppResult<(String, AnalysisInput)> {
        let missing = || AppError::InvalidRequest("Missing prompt or text.".to_string());

        let prompt = request
            .prompt
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(missing)?;

        if let Some(text) = request.text.filter(|t| !t.trim().is_empty()) {
            return Ok((prompt, AnalysisInput::Text(text)));
        }

        let document = request.document.ok_or_else(missing)?;
        Ok((prompt, Self::inline_document(document)?))
    }

    fn inline_document(document: InlineDocument) -> AppResult<AnalysisInput> {
        // Accept bare base64 as well as a full data URL
        let (declared_type, data) = match document.data.strip_prefix("data:") {
            Some(rest) => match rest.split_once(";base64,") {
                Some((media_type, data)) => (Some(media_type.to_string()), data.to_string()),
                None => {
                    return Err(AppError::InvalidRequest(
                        "Document data URL must be base64 encoded.".to_string(),
                    ))
                }
            },
            None => (None, document.data),
        };
        let data = data.trim().to_string();

        if data.is_empty() {
            return Err(AppError::InvalidRequest("Missing prompt or text.".to_string()));
        }
        base64::engine::general_purpose::STANDARD
            .decode(&data)
            .map_err(|_| AppError::InvalidRequest("Document data is not valid base64.".to_string()))?;

        let filename = document
            .filename
            .filter(|f| !f.trim().is_empty())
            .unwrap_or_else(|| "document".to_string());
        let media_type = document
            .media_type
            .or(declared_type)
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| {
                mime_guess::from_path(&filename)
                    .first_or_octet_stream()
                    .essence_str()
                    .to_string()
            });

        Ok(AnalysisInput::Document {
            filename,
            media_type,
            base64: data,
        })
    }

    pub fn build_message(prompt: &str, input: &AnalysisInput) -> LLMMessage {
        match input {
            AnalysisInput::Text(text) => LLMMessage::user(format!(
                "Based on the following document text, please perform this task: \"{}\"\n\nHere is the document text:\n---\n{}",
                prompt, text
            )),
            AnalysisInput::Document { filename, media_type, base64 } => LLMMessage::user_with_file(
                format!("Based on the attached document, please perform this task: \"{}\"", prompt),
                filename.as_str(),
                media_type.as_str(),
                base64.as_str(),
            ),
        }
    }

    pub async fn analyze(
        adapter: &dyn LLMAdapter,
        model: &str,
        prompt: &str,
        input: &AnalysisInput,
    ) -> AppResult<AnalysisResult> {
        let request = LLMRequest {
            model: model.to_string(),
            messages: vec![Self::build_message(prompt, input)],
            max_tokens: None,
            temperature: None,
        };

        let response = adapter.create_chat_completion(&request).await?;
        info!(
            model,
            finish_reason = response.finish_reason.as_deref().unwrap_or("unknown"),
            "Direct analysis completed"
        );

        Ok(AnalysisResult {
            text: response
                .content
                .unwrap_or_else(|| NO_ANALYSIS_PLACEHOLDER.to_string()),
        })
    }
}
