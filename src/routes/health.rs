use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

use crate::models::{AppState, HealthResponse};
use crate::routes::method_not_allowed;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health_check).fallback(method_not_allowed))
        .with_state(state)
}

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let response = HealthResponse {
        status: "ok".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        openai_configured: state.config.llm.openai_api_key.is_some(),
        assistant_configured: state.config.assistant.assistant_id.is_some(),
    };

    Json(response)
}
