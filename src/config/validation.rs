//! Configuration validation.
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: EdgeConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use axum::http::{HeaderValue, StatusCode};
use thiserror::Error;

use crate::config::schema::EdgeConfig;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: '{value}' is not a valid socket address")]
    InvalidAddress { field: &'static str, value: String },

    #[error("upstream.default_user_agent must not be empty")]
    EmptyUserAgent,

    #[error("upstream.default_user_agent is not a valid header value")]
    InvalidUserAgent,

    #[error("{0} must be greater than zero")]
    ZeroValue(&'static str),

    #[error("websocket.upgrade_failure_status: {0} is not a valid HTTP status")]
    InvalidStatus(u16),

    #[error("observability.log_level: unknown level '{0}'")]
    UnknownLogLevel(String),
}

/// Check the semantic constraints serde cannot express.
pub fn validate_config(config: &EdgeConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }

    let user_agent = &config.upstream.default_user_agent;
    if user_agent.is_empty() {
        errors.push(ValidationError::EmptyUserAgent);
    } else if HeaderValue::from_str(user_agent).is_err() {
        errors.push(ValidationError::InvalidUserAgent);
    }

    if config.upstream.timeout_secs == Some(0) {
        errors.push(ValidationError::ZeroValue("upstream.timeout_secs"));
    }
    if config.upstream.connect_timeout_secs == Some(0) {
        errors.push(ValidationError::ZeroValue("upstream.connect_timeout_secs"));
    }

    let status = config.websocket.upgrade_failure_status;
    if StatusCode::from_u16(status).is_err() {
        errors.push(ValidationError::InvalidStatus(status));
    }
    if config.websocket.max_message_size == Some(0) {
        errors.push(ValidationError::ZeroValue("websocket.max_message_size"));
    }

    let level = config.observability.log_level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ValidationError::UnknownLogLevel(
            config.observability.log_level.clone(),
        ));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
