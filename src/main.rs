//! Stock assistant - chat backend with widget tools
//!
//! Serves conversations with a hosted OpenAI assistant whose tool calls
//! are rendered as stock widgets.

mod api;
mod assistant;
mod config;
mod db;
mod projection;
mod session;
mod tools;
mod transcript;

use api::{create_router, AppState};
use assistant::{LoggingBridge, OpenAiAssistant};
use config::AppConfig;
use db::Database;
use session::{DatabaseChatStore, SessionManager, SessionSettings};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stock_assistant=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    // Configuration
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration");
            return Err(e.into());
        }
    };

    // Ensure database directory exists
    if let Some(parent) = config.db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    tracing::info!(path = %config.db_path.display(), "Opening database");
    let db = Database::open(&config.db_path)?;

    // Assistant bridge
    let assistant = OpenAiAssistant::new(&config.assistant)?;
    let bridge = Arc::new(LoggingBridge::new(Arc::new(assistant)));
    tracing::info!(
        assistant_id = %config.assistant.assistant_id,
        base_url = %config.assistant.base_url,
        "Assistant bridge initialized"
    );

    let settings = SessionSettings {
        purchase_step_delay: config.purchase_step_delay,
    };
    let sessions = Arc::new(SessionManager::new(
        Arc::new(DatabaseChatStore::new(db)),
        bridge,
        settings,
    ));
    sessions.spawn_sweeper(config.session_idle_ttl);
    let state = AppState::new(sessions);

    // Create router
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let compression = CompressionLayer::new()
        .gzip(true)
        .br(true)
        .deflate(true)
        .zstd(true);

    let app = create_router(state)
        .layer(cors)
        .layer(compression)
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Stock assistant listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
