use axum::extract::multipart::{Multipart, MultipartRejection};
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use tracing::info;

use crate::agents::{DocumentAgent, SubmissionAgent};
use crate::models::{AnalysisRequest, AnalysisResponse, AppState, RunHandle};
use crate::multipart::{decode_form, DecodeError, PROMPT_FIELD};
use crate::routes::method_not_allowed;
use crate::types::AppResult;
use crate::utils::PollPolicy;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/analyze-document",
            post(analyze_document).fallback(method_not_allowed),
        )
        .route(
            "/api/submit-document",
            post(submit_document).fallback(method_not_allowed),
        )
        .with_state(state)
}

async fn read_request(
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<AnalysisRequest> {
    let multipart = multipart.map_err(DecodeError::from)?;
    let form = decode_form(multipart, PROMPT_FIELD).await?;
    let request = AnalysisRequest::from_form(form)?;

    if let Some(document) = &request.document {
        info!(
            filename = %document.filename,
            media_type = %document.media_type,
            size = document.data.len(),
            "Document received"
        );
    }
    Ok(request)
}

/// POST /api/submit-document - start a run and return its ids immediately
async fn submit_document(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<Json<RunHandle>> {
    let client = state.assistants_client()?;
    let assistant_id = state.assistant_id()?;
    let request = read_request(multipart).await?;

    let handle = SubmissionAgent::submit(&client, assistant_id, &request).await?;
    Ok(Json(handle))
}

/// POST /api/analyze-document - submit, wait for the run, clean up
async fn analyze_document(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<Json<AnalysisResponse>> {
    let client = state.assistants_client()?;
    let assistant_id = state.assistant_id()?;
    let request = read_request(multipart).await?;

    let policy = PollPolicy::new(
        state.config.assistant.poll_interval(),
        state.config.assistant.poll_max_attempts,
    );
    let result =
        DocumentAgent::analyze(client, assistant_id.to_string(), policy, request).await?;

    Ok(Json(AnalysisResponse {
        analysis: result.text,
    }))
}
