//! HTTP surface: axum router, shared state and the JSON envelope.

pub mod client_ip;
pub mod envelope;
pub mod handlers;

pub use client_ip::ClientIp;
pub use envelope::{error_response, Envelope};

use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get};
use axum::Router;
use std::any::Any;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::time::Instant;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::core::config::Config;
use crate::core::error::AppError;
use crate::extract::MediaExtractor;
use crate::instagram::AccountFetcher;
use crate::normalize::NormalizedResponse;
use crate::storage::ResultCache;

/// Cache of normalized results, shared by `/download`, `/formats` and `/info`.
pub type ResponseCache = ResultCache<Arc<NormalizedResponse>>;

/// State handed to every handler. Cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub cache: Arc<ResponseCache>,
    pub extractor: Arc<dyn MediaExtractor>,
    pub accounts: Arc<dyn AccountFetcher>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(config: Config, extractor: Arc<dyn MediaExtractor>, accounts: Arc<dyn AccountFetcher>) -> Self {
        let cache = ResultCache::new(config.cache.ttl(), config.cache.max_entries);
        Self {
            config: Arc::new(config),
            cache: Arc::new(cache),
            extractor,
            accounts,
            started_at: Instant::now(),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/download", get(handlers::download))
        .route("/formats", get(handlers::formats))
        .route("/info", get(handlers::info))
        .route("/test", get(handlers::test_extractor))
        .route("/test/{username}", get(handlers::test_public_profile))
        .route("/health", get(handlers::health))
        .route("/status", get(handlers::status))
        .route("/cache", delete(handlers::clear_cache))
        .route("/session/{credential}", get(handlers::session))
        .route("/{segment}", get(handlers::session_segment))
        .fallback(handlers::not_found)
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// A panicking handler still answers with the error envelope.
fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!("Handler panicked: {}", detail);
    AppError::Internal("Internal server error".to_string()).into_response()
}

/// Binds `host:port` and serves until Ctrl+C.
pub async fn serve(state: AppState) -> std::io::Result<()> {
    let addr = format!("{}:{}", state.config.server.host, state.config.server.port);
    let listener = TcpListener::bind(&addr).await?;

    tracing::info!("Starting mediagate on http://{}", listener.local_addr()?);
    tracing::info!("  /download?url=...     - Normalized media");
    tracing::info!("  /formats?url=...      - Format listing");
    tracing::info!("  /info?url=...         - Metadata only");
    tracing::info!("  /sessionid=<session>  - Account snapshot");
    tracing::info!("  /health, /status      - Service checks");

    let app = router(state).into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            match tokio::signal::ctrl_c().await {
                Ok(()) => tracing::info!("Shutting down"),
                Err(e) => {
                    tracing::error!("Failed to listen for Ctrl+C: {}", e);
                    std::future::pending::<()>().await;
                }
            }
        })
        .await
}
