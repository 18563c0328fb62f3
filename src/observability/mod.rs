//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Gate decisions, session failures, limiter sweeps
//!     → logging.rs (structured tracing events, request id in every span)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → Prometheus scrape endpoint (optional)
//! ```

pub mod logging;
pub mod metrics;
