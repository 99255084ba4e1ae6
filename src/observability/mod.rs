//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! dispatcher / proxy / echo handler produce:
//!     → logging.rs (structured log events via `tracing`)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout (pretty or JSON lines)
//!     → Metrics endpoint (Prometheus scrape), when enabled
//! ```
//!
//! # Design Decisions
//! - Request ID is attached to the request span, never to responses
//! - Metric updates are no-ops until a recorder is installed

pub mod logging;
pub mod metrics;
