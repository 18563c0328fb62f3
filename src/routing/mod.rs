//! Route classification.
//!
//! # Data Flow
//! ```text
//! Route Compilation (at startup / reload):
//!     RouteConfig[]
//!     → validate rules and roles
//!     → split exact paths (HashMap) from prefixes (longest first)
//!     → freeze as immutable RouteTable
//!
//! Per request:
//!     path → RouteTable::classify → Arc<Route> (class + optional rate rule)
//! ```
//!
//! # Design Decisions
//! - One table drives both throttling and authorization, so the two cannot drift
//! - No regex in hot path (exact lookup, then prefix scan)
//! - Path matching is case-sensitive
//! - Unmatched paths are public pages

pub mod table;

pub use table::{Access, Route, RouteClass, RouteTable, Surface};
