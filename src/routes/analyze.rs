use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use tracing::info;

use crate::agents::{AnalysisInput, DirectCompletionAgent};
use crate::models::{AnalysisResponse, AnalyzeTextRequest, AppState};
use crate::routes::method_not_allowed;
use crate::types::{AppError, AppResult};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/analyze", post(analyze).fallback(method_not_allowed))
        .with_state(state)
}

/// POST /api/analyze - JSON `{prompt, text}` or `{prompt, document}`
async fn analyze(
    State(state): State<AppState>,
    payload: Result<Json<AnalyzeTextRequest>, JsonRejection>,
) -> AppResult<Json<AnalysisResponse>> {
    let adapter = state.chat_adapter()?;

    let Json(request) =
        payload.map_err(|e| AppError::InvalidRequest(format!("Invalid JSON body: {}", e.body_text())))?;
    let (prompt, input) = DirectCompletionAgent::validate(request)?;

    info!(
        prompt_len = prompt.len(),
        inline_document = matches!(input, AnalysisInput::Document { .. }),
        "Direct analysis request received"
    );

    let result =
        DirectCompletionAgent::analyze(&adapter, &state.config.llm.model, &prompt, &input).await?;

    Ok(Json(AnalysisResponse {
        analysis: result.text,
    }))
}

#[cfg(test)]
mod tests {
    use crate::routes::test_support::*;
    use axum::http::StatusCode;
    use mockito::Matcher;
    use serde_json::json;

    #[tokio::test]
    async fn test_analysis_passes_reply_through() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer test-key")
            .match_body(Matcher::PartialJson(json!({"model": "gpt-3.5-turbo"})))
            .with_status(200)
            .with_body(r#"{"choices":[{"message":{"role":"assistant","content":"The memo asks for a budget increase."}}]}"#)
            .expect(1)
            .create_async()
            .await;

        let (status, body) = send(
            configured_app(&server.url()),
            json_request("POST", "/api/analyze", json!({"prompt": "Summarize", "text": "Memo text"})),
        )
        .await;

        mock.assert_async().await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"analysis": "The memo asks for a budget increase."}));
    }

    #[tokio::test]
    async fn test_empty_reply_uses_placeholder() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(r#"{"choices":[]}"#)
            .create_async()
            .await;

        let (status, body) = send(
            configured_app(&server.url()),
            json_request("POST", "/api/analyze", json!({"prompt": "Summarize", "text": "Memo"})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["analysis"], "No analysis was returned.");
    }

    #[tokio::test]
    async fn test_missing_text_is_bad_request() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .expect(0)
            .create_async()
            .await;

        let (status, body) = send(
            configured_app(&server.url()),
            json_request("POST", "/api/analyze", json!({"prompt": "Summarize"})),
        )
        .await;

        mock.assert_async().await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "Missing prompt or text."}));
    }

    #[tokio::test]
    async fn test_upstream_status_is_passed_through() {
        let mut server = mockito::Server::new_async().await;
        let _m1 = server
            .mock("POST", "/chat/completions")
            .with_status(429)
            .with_body(r#"{"error":{"message":"Rate limit reached for gpt-3.5-turbo"}}"#)
            .create_async()
            .await;

        let (status, body) = send(
            configured_app(&server.url()),
            json_request("POST", "/api/analyze", json!({"prompt": "Summarize", "text": "Memo"})),
        )
        .await;

        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body["error"], "Rate limit reached for gpt-3.5-turbo");
    }

    #[tokio::test]
    async fn test_missing_api_key_is_server_error() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .expect(0)
            .create_async()
            .await;

        let (status, body) = send(
            app(test_config(&server.url(), None, None)),
            json_request("POST", "/api/analyze", json!({"prompt": "Summarize", "text": "Memo"})),
        )
        .await;

        mock.assert_async().await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "API key is not set on the server.");
    }

    #[tokio::test]
    async fn test_malformed_json_is_bad_request() {
        let (status, body) = send(
            configured_app("http://127.0.0.1:9"),
            axum::http::Request::builder()
                .method("POST")
                .uri("/api/analyze")
                .header("content-type", "application/json")
                .body(axum::body::Body::from("{not json"))
                .unwrap(),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().starts_with("Invalid JSON body"));
    }

    #[tokio::test]
    async fn test_unreachable_upstream_is_server_error() {
        // Nothing listens on the discard port
        let (status, body) = send(
            configured_app("http://127.0.0.1:9"),
            json_request("POST", "/api/analyze", json!({"prompt": "Summarize", "text": "Memo"})),
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!body["error"].as_str().unwrap().is_empty());
    }
}
