//! HTTP serving subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs   (axum setup, layers, graceful shutdown, reloads)
//!     → request.rs  (request ID, tracing span)
//!     → gate        (decide, then forward or answer)
//!     → handlers.rs (placeholder application routes)
//! ```

pub mod handlers;
pub mod request;
pub mod server;

pub use request::{UuidRequestId, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
