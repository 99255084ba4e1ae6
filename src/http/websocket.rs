//! WebSocket echo handling.
//!
//! # Data Flow
//! ```text
//! Client ──── text/binary frame ────→ edge ──── same frame ────→ Client
//! ```
//!
//! # Design Decisions
//! - Each message is sent back as soon as it arrives, no queue
//! - Ping/pong and the close handshake are answered by the transport
//! - A failed send ends the session

use axum::extract::ws::{Message, WebSocket};

use crate::net::SessionGuard;
use crate::observability::metrics;

/// Echo every text and binary message back on the same socket until it closes.
pub async fn echo(mut socket: WebSocket, session: SessionGuard) {
    let id = session.id();
    tracing::debug!(session_id = %id, "WebSocket session opened");

    let mut echoed: u64 = 0;
    while let Some(received) = socket.recv().await {
        let message = match received {
            Ok(message) => message,
            Err(e) => {
                tracing::debug!(session_id = %id, error = %e, "WebSocket receive failed");
                break;
            }
        };

        let kind = match &message {
            Message::Text(_) => "text",
            Message::Binary(_) => "binary",
            // The next recv flushes the close reply and returns None.
            Message::Ping(_) | Message::Pong(_) | Message::Close(_) => continue,
        };

        if let Err(e) = socket.send(message).await {
            tracing::debug!(session_id = %id, error = %e, "WebSocket send failed");
            break;
        }
        metrics::record_echo(kind);
        echoed += 1;
    }

    tracing::debug!(session_id = %id, messages = echoed, "WebSocket session closed");
}
