// Docsift - document and text analysis over OpenAI chat completions and assistants

pub mod config;
pub mod models;
pub mod types;
pub mod agents;
pub mod llm;
pub mod multipart;
pub mod routes;
pub mod middleware;
pub mod utils;

// Re-exports for convenience
pub use config::Config;
pub use models::AppState;

pub fn create_router(state: AppState) -> axum::Router {
    routes::create_router(state)
}
