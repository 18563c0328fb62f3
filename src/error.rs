//! Request-level gate failures.
//!
//! These never escape as 500s: each maps to a fixed status and the stable
//! JSON body `{ "error": "..." }`. Configuration failures are a separate type
//! ([`crate::config::ConfigError`]) because they only occur at startup.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GateError {
    /// Budget exhausted; the caller may retry after the window resets.
    #[error("Too many requests")]
    RateLimited { retry_after_secs: u64 },
    /// No valid session; recoverable by signing in.
    #[error("Unauthorized")]
    Unauthenticated,
    /// Signed in without the required role.
    #[error("Forbidden")]
    Forbidden,
}

impl GateError {
    pub fn status(&self) -> StatusCode {
        match self {
            GateError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            GateError::Unauthenticated => StatusCode::UNAUTHORIZED,
            GateError::Forbidden => StatusCode::FORBIDDEN,
        }
    }

    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            GateError::RateLimited { .. } => "rate_limited",
            GateError::Unauthenticated => "unauthenticated",
            GateError::Forbidden => "forbidden",
        }
    }
}

impl IntoResponse for GateError {
    fn into_response(self) -> Response {
        let mut response = (self.status(), Json(json!({ "error": self.to_string() }))).into_response();
        if let GateError::RateLimited { retry_after_secs } = self {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs));
        }
        response
    }
}
