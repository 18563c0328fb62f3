//! Security response headers.
//!
//! The same fixed set goes on every response the gate touches, including
//! redirects and rejections. API routes additionally get a CSP that forbids
//! scripts and plugins; rendered pages manage their own CSP.

use axum::http::header::{CONTENT_SECURITY_POLICY, STRICT_TRANSPORT_SECURITY, X_DNS_PREFETCH_CONTROL, X_XSS_PROTECTION};
use axum::http::{HeaderMap, HeaderValue};

use crate::config::{ConfigError, SecurityConfig, ValidationError};
use crate::routing::Surface;

#[derive(Debug, Clone)]
pub struct SecurityHeaders {
    enabled: bool,
    hsts: HeaderValue,
    api_csp: HeaderValue,
}

impl SecurityHeaders {
    pub fn from_config(config: &SecurityConfig) -> Result<Self, ConfigError> {
        let mut hsts = format!("max-age={}", config.hsts_max_age_secs);
        if config.hsts_include_subdomains {
            hsts.push_str("; includeSubDomains");
        }

        let invalid = |field: &str| ConfigError::Validation(vec![ValidationError::new(field, "not a valid header value")]);
        Ok(Self {
            enabled: config.enable_headers,
            hsts: HeaderValue::from_str(&hsts).map_err(|_| invalid("security.hsts"))?,
            api_csp: HeaderValue::from_str(&config.api_csp).map_err(|_| invalid("security.api_csp"))?,
        })
    }

    /// Stamp the header set for `surface` onto `headers`, replacing existing values.
    pub fn apply(&self, surface: Surface, headers: &mut HeaderMap) {
        if !self.enabled {
            return;
        }
        headers.insert(STRICT_TRANSPORT_SECURITY, self.hsts.clone());
        headers.insert(X_DNS_PREFETCH_CONTROL, HeaderValue::from_static("on"));
        headers.insert(X_XSS_PROTECTION, HeaderValue::from_static("1; mode=block"));
        if surface == Surface::Api {
            headers.insert(CONTENT_SECURITY_POLICY, self.api_csp.clone());
        }
    }
}
