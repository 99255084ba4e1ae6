//! HEAD/OPTIONS proxy with permissive CORS.
//!
//! # Responsibilities
//! - Answer CORS preflight (OPTIONS) locally
//! - Forward HEAD to the target named by the `url` query parameter
//! - Relay upstream status, status text, content-type and content-length
//! - Render every failure as a 400 that still carries the CORS headers
//!
//! # Data Flow
//! ```text
//! HEAD /?url=<target>
//!     → target_param (first `url`, percent-decoded)
//!     → Url::parse (absolute only)
//!     → upstream HEAD with User-Agent only
//!     → relay(status, reason, content-type, content-length) + CORS
//! ```

use std::error::Error as StdError;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    http::{
        header::{CONTENT_LENGTH, CONTENT_TYPE, USER_AGENT},
        HeaderMap, HeaderValue, Method, StatusCode, Uri,
    },
    response::Response,
};
use thiserror::Error;
use url::Url;

use crate::config::UpstreamConfig;
use crate::http::cors::CorsHeaders;
use crate::http::server::ServerError;
use crate::observability::metrics;

/// Query parameter holding the proxy target.
pub const TARGET_PARAM: &str = "url";

/// Prefix of every failed-forward response body.
pub const FAILURE_PREFIX: &str = "Invalid URL or request failed: ";

/// Marks a relayed response whose upstream sent no `content-length`.
///
/// The HTTP stack fills in a length for the empty body; the server strips it
/// again for responses carrying this marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownLength;

/// Errors that end a proxied request with a 400.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// The `url` query parameter is absent or empty.
    #[error("Missing url parameter")]
    MissingParameter,

    /// The target is not an absolute URL.
    #[error("Invalid URL or request failed: {0}")]
    InvalidTarget(#[from] url::ParseError),

    /// The outbound request could not be completed.
    #[error("Invalid URL or request failed: {}", message_chain(.0))]
    Upstream(#[from] reqwest::Error),
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        StatusCode::BAD_REQUEST
    }

    /// Render the error as a client response with CORS headers.
    pub fn into_response(self, cors: &CorsHeaders) -> Response {
        cors.response(self.status(), self.to_string())
    }
}

/// Join an error's message with its sources, without any backtrace.
fn message_chain(err: &(dyn StdError + 'static)) -> String {
    let mut previous = err.to_string();
    let mut message = previous.clone();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if text != previous {
            message.push_str(": ");
            message.push_str(&text);
        }
        previous = text;
        source = cause.source();
    }
    message
}

/// Extract the first `url` query parameter, percent-decoded.
pub fn target_param(uri: &Uri) -> Option<String> {
    let query = uri.query()?;
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == TARGET_PARAM)
        .map(|(_, value)| value.into_owned())
}

/// Stateless proxy for HEAD and OPTIONS.
#[derive(Debug, Clone)]
pub struct ProxyHandler {
    client: reqwest::Client,
    cors: CorsHeaders,
    default_user_agent: HeaderValue,
}

impl ProxyHandler {
    /// Build the handler and its outbound HTTP client.
    pub fn new(config: &UpstreamConfig, cors: CorsHeaders) -> Result<Self, ServerError> {
        let default_user_agent = HeaderValue::from_str(&config.default_user_agent)?;

        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = config.connect_timeout_secs {
            builder = builder.connect_timeout(Duration::from_secs(secs));
        }
        if !config.use_system_proxy {
            builder = builder.no_proxy();
        }

        Ok(Self {
            client: builder.build()?,
            cors,
            default_user_agent,
        })
    }

    /// Handle the request if it is HEAD or OPTIONS.
    ///
    /// Returns `None` for every other method so the caller can try an upgrade.
    pub async fn handle(&self, method: &Method, uri: &Uri, headers: &HeaderMap) -> Option<Response> {
        let response = match *method {
            Method::OPTIONS => self.preflight(),
            Method::HEAD => match self.forward(uri, headers).await {
                Ok(response) => response,
                Err(e) => {
                    tracing::debug!(error = %e, "Proxy request failed");
                    e.into_response(&self.cors)
                }
            },
            _ => return None,
        };

        metrics::record_proxy_response(method.as_str(), response.status().as_u16());
        Some(response)
    }

    /// CORS preflight: 200, empty body, no upstream call.
    pub fn preflight(&self) -> Response {
        self.cors.response(StatusCode::OK, Body::empty())
    }

    async fn forward(&self, uri: &Uri, headers: &HeaderMap) -> Result<Response, ProxyError> {
        let raw = target_param(uri)
            .filter(|value| !value.is_empty())
            .ok_or(ProxyError::MissingParameter)?;
        let target = Url::parse(&raw)?;

        let user_agent = headers
            .get(USER_AGENT)
            .filter(|value| !value.is_empty())
            .cloned()
            .unwrap_or_else(|| self.default_user_agent.clone());

        tracing::debug!(target = %target, "Forwarding HEAD upstream");

        let start = Instant::now();
        let result = self
            .client
            .head(target)
            .header(USER_AGENT, user_agent)
            .send()
            .await;
        metrics::record_upstream_latency(start);

        Ok(self.relay(&result?))
    }

    /// Build the client response from an upstream response. The body is never relayed.
    fn relay(&self, upstream: &reqwest::Response) -> Response {
        let mut response = self.cors.response(upstream.status(), Body::empty());

        for name in [CONTENT_TYPE, CONTENT_LENGTH] {
            if let Some(value) = upstream.headers().get(&name) {
                response.headers_mut().insert(name, value.clone());
            }
        }
        if !response.headers().contains_key(CONTENT_LENGTH) {
            response.extensions_mut().insert(UnknownLength);
        }

        // Only present when the upstream used a non-canonical status text.
        if let Some(reason) = upstream.extensions().get::<hyper::ext::ReasonPhrase>() {
            response.extensions_mut().insert(reason.clone());
        }

        response
    }
}
