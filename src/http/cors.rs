//! Fixed CORS header set attached to every proxy response.

use axum::{
    body::Body,
    http::{
        header::{
            ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
            ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_MAX_AGE,
        },
        HeaderMap, HeaderName, HeaderValue, StatusCode,
    },
    response::Response,
};

pub const ALLOW_ORIGIN: &str = "*";
pub const ALLOW_METHODS: &str = "HEAD, OPTIONS";
pub const ALLOW_HEADERS: &str =
    "Content-Type, Authorization, X-Requested-With, Accept, Origin, User-Agent";
pub const MAX_AGE: &str = "86400";

/// Immutable CORS headers, built once and merged into each response.
#[derive(Debug, Clone)]
pub struct CorsHeaders {
    headers: HeaderMap,
}

impl CorsHeaders {
    pub fn new() -> Self {
        let entries: [(HeaderName, &'static str); 4] = [
            (ACCESS_CONTROL_ALLOW_ORIGIN, ALLOW_ORIGIN),
            (ACCESS_CONTROL_ALLOW_METHODS, ALLOW_METHODS),
            (ACCESS_CONTROL_ALLOW_HEADERS, ALLOW_HEADERS),
            (ACCESS_CONTROL_MAX_AGE, MAX_AGE),
        ];

        let mut headers = HeaderMap::with_capacity(entries.len());
        for (name, value) in entries {
            headers.insert(name, HeaderValue::from_static(value));
        }
        Self { headers }
    }

    /// Overwrite `target` with every CORS header.
    pub fn apply(&self, target: &mut HeaderMap) {
        for (name, value) in &self.headers {
            target.insert(name.clone(), value.clone());
        }
    }

    /// Build a response carrying the CORS headers.
    pub fn response(&self, status: StatusCode, body: impl Into<Body>) -> Response {
        let mut response = Response::new(body.into());
        *response.status_mut() = status;
        self.apply(response.headers_mut());
        response
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }
}

impl Default for CorsHeaders {
    fn default() -> Self {
        Self::new()
    }
}
