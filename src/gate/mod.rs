//! Request gatekeeping.
//!
//! # Data Flow
//! ```text
//! Request
//!     → middleware.rs   (axum glue: peer address, extensions, response)
//!     → pipeline.rs     (classify → rate limit → session → policy)
//!     → Decision
//!         Allow    → GateContext attached, forwarded to handlers
//!         Redirect → 307 with Location
//!         Reject   → 401 / 403 / 429 JSON
//!     → security headers on every outcome
//! ```
//!
//! # Design Decisions
//! - Decide first, forward second; nothing is undone after the fact
//! - Gate failures become responses, never errors past this boundary

pub mod middleware;
pub mod pipeline;

pub use middleware::gatekeeper_middleware;
pub use pipeline::{Admission, Concern, GateContext, Gatekeeper};
