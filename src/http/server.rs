//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router with a single path-agnostic handler
//! - Wire up middleware (request ID, tracing)
//! - Build shared state (proxy client, CORS set, session tracker)
//! - Serve until the shutdown broadcast fires
//!
//! Axum fills in `content-length` for bodies with a known size inside every
//! route, so headers that must stay unset are removed outside the router.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{rejection::WebSocketUpgradeRejection, WebSocketUpgrade},
        State,
    },
    http::{
        header::{InvalidHeaderValue, CONTENT_LENGTH},
        status::InvalidStatusCode,
        HeaderMap, Method, StatusCode, Uri,
    },
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::util::{MapResponse, MapResponseLayer};
use tower::Layer;
use tower_http::trace::TraceLayer;

use crate::config::{EdgeConfig, WebSocketConfig};
use crate::http::cors::CorsHeaders;
use crate::http::dispatch::{dispatch, Dispatch};
use crate::http::proxy::{ProxyHandler, UnknownLength};
use crate::http::request::{request_id_layer, request_span};
use crate::lifecycle::shutdown;
use crate::net::SessionTracker;

/// Body of the fallback response when a request is neither proxied nor upgraded.
pub const UPGRADE_FAILED: &str = "Upgrade failed";

/// Errors building the server from a configuration.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid default user agent: {0}")]
    UserAgent(#[from] InvalidHeaderValue),

    #[error("invalid upgrade failure status: {0}")]
    Status(#[from] InvalidStatusCode),

    #[error("failed to build upstream client: {0}")]
    Client(#[from] reqwest::Error),
}

/// The router wrapped in layers that must run after axum's own response handling.
pub type EdgeService = MapResponse<Router, fn(Response) -> Response>;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub proxy: Arc<ProxyHandler>,
    pub sessions: SessionTracker,
    pub websocket: WebSocketConfig,
    pub upgrade_failure_status: StatusCode,
}

/// HTTP server for the edge relay.
pub struct HttpServer {
    router: Router,
    config: EdgeConfig,
    sessions: SessionTracker,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: EdgeConfig) -> Result<Self, ServerError> {
        let proxy = ProxyHandler::new(&config.upstream, CorsHeaders::new())?;
        let sessions = SessionTracker::new();

        let state = AppState {
            proxy: Arc::new(proxy),
            sessions: sessions.clone(),
            websocket: config.websocket.clone(),
            upgrade_failure_status: StatusCode::from_u16(config.websocket.upgrade_failure_status)?,
        };

        let router = Self::build_router(state);
        Ok(Self {
            router,
            config,
            sessions,
        })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/", any(edge_handler))
            .route("/{*path}", any(edge_handler))
            .with_state(state)
            .layer(TraceLayer::new_for_http().make_span_with(request_span))
            .layer(request_id_layer())
    }

    /// Run the server until `shutdown_rx` fires, then finish in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown_rx: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(
            listener,
            axum::ServiceExt::<axum::extract::Request>::into_make_service(self.service()),
        )
            .with_graceful_shutdown(async move {
                shutdown::wait(shutdown_rx).await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!(
            open_sessions = self.sessions.active_count(),
            "HTTP server stopped"
        );
        Ok(())
    }

    /// The configured router, for serving elsewhere or in-process tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// The router plus the outer response fix-ups; this is what gets served.
    pub fn service(&self) -> EdgeService {
        MapResponseLayer::new(strip_unknown_length as fn(Response) -> Response)
            .layer(self.router.clone())
    }

    /// Tracker of currently open WebSocket sessions.
    pub fn sessions(&self) -> &SessionTracker {
        &self.sessions
    }

    /// The configuration the server was built from.
    pub fn config(&self) -> &EdgeConfig {
        &self.config
    }
}

/// Drop the `content-length` axum derived from an empty relay body when the
/// upstream never sent one.
fn strip_unknown_length(mut response: Response) -> Response {
    if response.extensions_mut().remove::<UnknownLength>().is_some() {
        response.headers_mut().remove(CONTENT_LENGTH);
    }
    response
}

/// Catch-all handler: proxy, upgrade, or the "Upgrade failed" fallback.
async fn edge_handler(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    match dispatch(&state, &method, &uri, &headers, upgrade).await {
        Dispatch::Response(response) | Dispatch::Upgraded(response) => response,
        Dispatch::NotHandled => (state.upgrade_failure_status, UPGRADE_FAILED).into_response(),
    }
}
