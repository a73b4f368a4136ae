//! HTTP transport — scrape endpoint and /health.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use pagescrape::{ScrapePayload, ScrapeRequest, ScrapeResponse, Scraper};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::types::ServerResult;

/// Shared state passed to all handlers via axum State.
pub struct AppState {
    pub scraper: Scraper,
    /// Whether a Chromium binary was found at startup.
    pub chromium_available: bool,
}

impl AppState {
    pub fn new(scraper: Scraper, chromium_available: bool) -> Self {
        Self {
            scraper,
            chromium_available,
        }
    }
}

/// Build the axum Router with every endpoint.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", post(handle_scrape))
        .route("/scrape", post(handle_scrape))
        .route("/health", get(handle_health))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

pub struct HttpTransport {
    state: Arc<AppState>,
}

impl HttpTransport {
    pub fn new(state: AppState) -> Self {
        Self {
            state: Arc::new(state),
        }
    }

    /// Serve until Ctrl-C.
    pub async fn run(&self, addr: SocketAddr) -> ServerResult<()> {
        let app = router(self.state.clone());

        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("HTTP transport listening on http://{addr}");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("HTTP transport stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
}

/// Scrape one page. The body is parsed here rather than with the `Json`
/// extractor so malformed input gets the same error body as everything else.
async fn handle_scrape(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> ServerResult<Json<ScrapeResponse>> {
    let payload: ScrapePayload = serde_json::from_slice(&body)?;
    let request = ScrapeRequest::from_payload(&payload)?;
    let response = state.scraper.scrape(&request).await?;
    Ok(Json(response))
}

async fn handle_health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "chromium_available": state.chromium_available,
        "active_contexts": state.scraper.renderer().active_contexts(),
    }))
}
