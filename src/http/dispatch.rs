//! Per-request decision between the proxy and a WebSocket upgrade.
//!
//! ```text
//! HEAD / OPTIONS ──→ ProxyHandler ──→ Dispatch::Response
//! anything else  ──→ upgrade ok   ──→ Dispatch::Upgraded (echo owns the socket)
//!                └─→ upgrade fails ─→ Dispatch::NotHandled
//! ```

use axum::{
    extract::ws::{rejection::WebSocketUpgradeRejection, WebSocketUpgrade},
    http::{HeaderMap, Method, Uri},
    response::Response,
};

use crate::http::server::AppState;
use crate::http::websocket;

/// Outcome of dispatching one request.
pub enum Dispatch {
    /// The proxy produced a finished response.
    Response(Response),
    /// The connection switched protocols; carries the 101 handshake response.
    Upgraded(Response),
    /// Neither the proxy nor the upgrade claimed the request.
    NotHandled,
}

/// Route a request to the proxy or hand its connection to the echo handler.
pub async fn dispatch(
    state: &AppState,
    method: &Method,
    uri: &Uri,
    headers: &HeaderMap,
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Dispatch {
    if let Some(response) = state.proxy.handle(method, uri, headers).await {
        return Dispatch::Response(response);
    }

    let mut ws = match upgrade {
        Ok(ws) => ws,
        Err(rejection) => {
            tracing::debug!(
                method = %method,
                path = %uri.path(),
                reason = %rejection,
                "WebSocket upgrade rejected"
            );
            return Dispatch::NotHandled;
        }
    };

    if let Some(limit) = state.websocket.max_message_size {
        ws = ws.max_message_size(limit);
    }

    let sessions = state.sessions.clone();
    let response = ws
        .on_failed_upgrade(|e| tracing::warn!(error = %e, "WebSocket upgrade failed after handshake"))
        .on_upgrade(move |socket| websocket::echo(socket, sessions.open()));

    Dispatch::Upgraded(response)
}
