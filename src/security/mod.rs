//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → client.rs     (who is calling, for rate keys)
//!     → rate_limit.rs (fixed-window budget, API routes only)
//!     → policy.rs     (allow / redirect / reject)
//!     → headers.rs    (security headers on whatever response goes out)
//! ```
//!
//! # Design Decisions
//! - Fail closed: a missing or broken session is treated as anonymous
//! - Counters live behind the RateStore trait; the default is in-memory
//! - No trust in client input unless the deployment opts in

pub mod client;
pub mod headers;
pub mod policy;
pub mod rate_limit;
pub mod store;

pub use client::ClientResolver;
pub use headers::SecurityHeaders;
pub use policy::{AccessPolicy, Decision};
pub use rate_limit::{RateLimitOutcome, RateLimitRule, RateLimiter, ScopedLimiter};
pub use store::{MemoryStore, RateStore, WindowRecord};
