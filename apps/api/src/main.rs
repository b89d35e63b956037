mod config;
mod errors;
mod llm_client;
mod routes;
mod session;
mod skills;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::llm_client::OllamaClient;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Skillmark v{}", env!("CARGO_PKG_VERSION"));

    let llm = OllamaClient::new(
        config.ollama_base_url.clone(),
        config.ollama_model.clone(),
        config.ollama_timeout,
    )?;
    info!(
        "Model client initialized (server: {}, model: {}, timeout: {:?})",
        llm.base_url(),
        config.ollama_model,
        config.ollama_timeout
    );

    let state = AppState::new(Arc::new(llm), config.clone());

    if let Some(max_idle) = config.session_idle_timeout {
        state.sessions.spawn_idle_sweeper(max_idle);
        info!("Idle sessions expire after {max_idle:?}");
    }

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
