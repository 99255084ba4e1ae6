//! Network layer subsystem.
//!
//! Accepting and serving connections is left to axum/hyper; this layer
//! only tracks the WebSocket sessions that outlive their HTTP request.

pub mod connection;

pub use connection::{SessionGuard, SessionId, SessionTracker};
