//! PaperChat API Gateway
//!
//! The main entry point for all external requests.
//! Handles:
//! - Chat pipeline dispatch (HTTP and WebSocket)
//! - Paper search and diagram rendering endpoints
//! - Observability (logging, metrics, tracing)

mod handlers;

use axum::{
    routing::get,
    routing::post,
    Router,
};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use paperchat_common::{
    arxiv::ArxivToolClient,
    chat::{Chatbot, SessionStore},
    config::AppConfig,
    llm::{create_generator, Generator},
    metrics,
    render::DiagramRenderer,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub chatbot: Arc<Chatbot>,
    pub generator: Arc<dyn Generator>,
    pub paper_tool: Arc<ArxivToolClient>,
    pub renderer: Arc<DiagramRenderer>,
    pub sessions: Arc<SessionStore>,
    pub metrics_handle: PrometheusHandle,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load().map_err(|e| {
        eprintln!("Failed to load configuration: {e}");
        e
    })?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.observability.log_level));
    if config.observability.json_logging {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }

    info!("Starting PaperChat API Gateway v{}", paperchat_common::VERSION);

    let config = Arc::new(config);

    // Initialize metrics
    let metrics_handle = PrometheusBuilder::new().install_recorder()?;
    metrics::register_metrics();

    // Wire up the chat pipeline
    let generator = create_generator(&config.llm)?;
    let paper_tool = Arc::new(ArxivToolClient::new(
        config.paper_tool.command.clone(),
        config.paper_storage_path(),
    )?);
    let chatbot = Arc::new(Chatbot::new(generator.clone(), paper_tool.clone()));
    let renderer = Arc::new(DiagramRenderer::new(config.render.dot_binary.clone()));

    // Ensure the image directory exists before the first render
    tokio::fs::create_dir_all(&config.render.image_dir).await?;

    // Create app state
    let state = AppState {
        config: config.clone(),
        chatbot,
        generator,
        paper_tool,
        renderer,
        sessions: Arc::new(SessionStore::new()),
        metrics_handle,
    };

    // Build the router
    let app = create_router(state);

    // Start the server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Create the main application router
fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    Router::new()
        // Root and health endpoints
        .route("/", get(handlers::health::root))
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        .route("/metrics", get(handlers::health::metrics))
        // Chat endpoints
        .route("/chat", post(handlers::chat::chat))
        .route("/ws", get(handlers::ws::ws_upgrade))
        // Paper endpoints
        .route("/search", post(handlers::search::search))
        // Visualization endpoints
        .route("/visualize", post(handlers::visualize::visualize))
        .route("/images/{filename}", get(handlers::images::get_image))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(request_id)
        .layer(propagate_id)
        .with_state(state)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}
