use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{info, warn};
use docsift::{config::Config, routes::create_router, utils::init_logger, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logger();

    // Load configuration
    let config = Config::from_env()?;
    info!("Configuration loaded: {:?} {:?}", config.server, config.llm);

    if config.llm.openai_api_key.is_none() {
        warn!("OPENAI_API_KEY is not set; analysis requests will fail until it is");
    }
    if config.assistant.assistant_id.is_none() {
        warn!("OPENAI_ASSISTANT_ID is not set; document workflows will fail until it is");
    }

    let state = AppState::new(config.clone())?;
    let app = create_router(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Server listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutting down");
}
