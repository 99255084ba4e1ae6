//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, single catch-all route)
//!     → request.rs (request ID, tracing span)
//!     → dispatch.rs (proxy or upgrade)
//!         → proxy.rs + cors.rs (HEAD/OPTIONS)
//!         → websocket.rs (echo, after upgrade)
//!     → Send to client
//! ```

pub mod cors;
pub mod dispatch;
pub mod proxy;
pub mod request;
pub mod server;
pub mod websocket;

pub use cors::CorsHeaders;
pub use dispatch::{dispatch, Dispatch};
pub use proxy::{ProxyError, ProxyHandler};
pub use server::{AppState, HttpServer, ServerError};
