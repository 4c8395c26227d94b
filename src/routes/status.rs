use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use tracing::debug;

use crate::agents::StatusAgent;
use crate::models::{AppState, RunHandle, StatusQuery, StatusResponse};
use crate::routes::method_not_allowed;
use crate::types::{AppError, AppResult};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/check-status", get(check_status).fallback(method_not_allowed))
        .with_state(state)
}

/// GET /api/check-status?threadId=..&runId=..
async fn check_status(
    State(state): State<AppState>,
    query: Result<Query<StatusQuery>, QueryRejection>,
) -> AppResult<Json<StatusResponse>> {
    let client = state.assistants_client()?;

    let missing = || AppError::InvalidRequest("Missing threadId or runId.".to_string());
    let Query(query) = query.map_err(|_| missing())?;
    let handle = match (query.thread_id, query.run_id) {
        (Some(thread_id), Some(run_id)) if !thread_id.is_empty() && !run_id.is_empty() => {
            RunHandle { thread_id, run_id }
        }
        _ => return Err(missing()),
    };

    debug!(thread_id = %handle.thread_id, run_id = %handle.run_id, "Checking run status");
    let response = StatusAgent::check(&client, &handle).await?;
    Ok(Json(response))
}
