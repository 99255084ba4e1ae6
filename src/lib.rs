//! edge-relay: a small HTTP/WebSocket edge server.
//!
//! HEAD and OPTIONS requests are proxied to the URL named by the `url`
//! query parameter, with permissive CORS headers on every response.
//! Every other request is upgraded to a WebSocket whose messages are
//! echoed back unchanged.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client ──▶ http::server ──▶ http::dispatch ──┬─▶ http::proxy ──▶ target URL
//!                (axum, request id,                │   (+ http::cors)
//!                 tracing)                         │
//!                                                  ├─▶ http::websocket (echo)
//!                                                  │   (net::connection tracks sessions)
//!                                                  │
//!                                                  └─▶ "Upgrade failed"
//!
//!     Cross-cutting: config, observability (logging, metrics), lifecycle
//! ```

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;

pub use config::EdgeConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
