//! API Routes
//!
//! This module organizes all HTTP endpoints for the application:
//! - `/api/analyze` - Direct analysis of embedded text or an inlined document
//! - `/api/analyze-document` - Document analysis that waits for the result
//! - `/api/submit-document` - Two-phase submission, returns run identifiers
//! - `/api/check-status` - Single status check for a submitted run
//! - `/api/health` - Health checks

pub mod analyze;
pub mod documents;
pub mod health;
pub mod status;

use axum::extract::DefaultBodyLimit;
use axum::http::Uri;
use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::middleware::apply_cors;
use crate::models::AppState;
use crate::types::AppError;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    info!("Creating application router");

    let max_upload_bytes = state.config.server.max_upload_bytes;
    let origins = state.config.server.cors_allowed_origins.clone();

    let api_router = Router::new()
        .merge(analyze::router(state.clone()))
        .merge(documents::router(state.clone()))
        .merge(status::router(state.clone()))
        .merge(health::router(state))
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http());

    apply_cors(api_router, &origins)
}

/// Shared by every route for verbs it does not serve
pub(crate) async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}

async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(uri.path().to_string())
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use axum::http::StatusCode;

    #[tokio::test]
    async fn test_unknown_route_is_json_404() {
        let (status, body) = send(
            configured_app("http://127.0.0.1:9"),
            empty_request("GET", "/api/nope"),
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().contains("/api/nope"));
    }

    #[tokio::test]
    async fn test_wrong_methods_are_rejected_without_upstream_calls() {
        let mut server = mockito::Server::new_async().await;
        let upstream = server
            .mock("GET", mockito::Matcher::Any)
            .expect(0)
            .create_async()
            .await;
        let upstream_post = server
            .mock("POST", mockito::Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        for (method, uri) in [
            ("GET", "/api/analyze"),
            ("PUT", "/api/analyze"),
            ("GET", "/api/analyze-document"),
            ("GET", "/api/submit-document"),
            ("DELETE", "/api/submit-document"),
            ("POST", "/api/check-status?threadId=t&runId=r"),
        ] {
            let (status, body) =
                send(configured_app(&server.url()), empty_request(method, uri)).await;
            assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED, "{method} {uri}");
            assert_eq!(body["error"], "Method Not Allowed");
        }

        upstream.assert_async().await;
        upstream_post.assert_async().await;
    }
}
