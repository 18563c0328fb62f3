//! Request gatekeeping for a web application.
//!
//! Every inbound request is classified by path, rate limited (API routes),
//! matched against the caller's session and either forwarded, redirected or
//! rejected. Security headers are stamped on whatever goes back out.

pub mod clock;
pub mod config;
pub mod error;
pub mod gate;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;
pub mod security;
pub mod session;

pub use config::schema::GatekeeperConfig;
pub use error::GateError;
pub use gate::{GateContext, Gatekeeper};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
