//! Configuration validation.
//!
//! Serde handles syntax; this pass checks meaning: positive budgets, a
//! well-formed route table, usable redirect targets and header values.
//! Every problem is collected so an operator sees them all at once.

use std::collections::HashSet;
use std::fmt;
use std::net::SocketAddr;

use axum::http::HeaderValue;

use crate::config::schema::{AccessConfig, GatekeeperConfig, RuleConfig, SessionProvider, SurfaceConfig};
use crate::security::rate_limit::RateLimitRule;
use crate::session::jwt::MIN_SECRET_LEN;

/// A single semantic problem, tagged with the offending field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate `config`, returning every error found.
pub fn validate_config(config: &GatekeeperConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new("listener.bind_address", "not a socket address"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than zero"));
    }

    let rl = &config.rate_limit;
    check_rule(&mut errors, "rate_limit", rl.default_rule());
    check_rule(&mut errors, "rate_limit.contact", rl.contact);
    check_rule(&mut errors, "rate_limit.writes", rl.writes);
    check_rule(&mut errors, "rate_limit.dashboard", rl.dashboard);

    validate_routes(config, &mut errors);

    for (field, target) in [
        ("redirects.sign_in", &config.redirects.sign_in),
        ("redirects.landing", &config.redirects.landing),
        ("redirects.neutral", &config.redirects.neutral),
    ] {
        if !target.starts_with('/') || target.starts_with("//") {
            errors.push(ValidationError::new(field, "must be a local path starting with '/'"));
        } else if HeaderValue::from_str(target).is_err() {
            errors.push(ValidationError::new(field, "not a valid Location value"));
        }
    }

    if HeaderValue::from_str(&config.security.api_csp).is_err() {
        errors.push(ValidationError::new("security.api_csp", "not a valid header value"));
    }

    let session = &config.session;
    if session.cookie_name.is_empty() || session.cookie_name.contains(['=', ';', ' ']) {
        errors.push(ValidationError::new("session.cookie_name", "not a valid cookie name"));
    }
    match session.provider {
        SessionProvider::Jwt if session.jwt_secret.len() < MIN_SECRET_LEN => {
            errors.push(ValidationError::new(
                "session.jwt_secret",
                format!("must be at least {MIN_SECRET_LEN} bytes"),
            ));
        }
        SessionProvider::Static => {
            let mut tokens = HashSet::new();
            for (i, user) in session.users.iter().enumerate() {
                if user.token.is_empty() {
                    errors.push(ValidationError::new(format!("session.users[{i}].token"), "must not be empty"));
                } else if !tokens.insert(user.token.as_str()) {
                    errors.push(ValidationError::new(format!("session.users[{i}].token"), "duplicate token"));
                }
            }
        }
        _ => {}
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new("observability.metrics_address", "not a socket address"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_rule(errors: &mut Vec<ValidationError>, field: &str, rule: RuleConfig) {
    if let Err(e) = RateLimitRule::new(rule.limit, rule.window_ms) {
        errors.push(ValidationError::new(field, e.to_string()));
    }
}

fn validate_routes(config: &GatekeeperConfig, errors: &mut Vec<ValidationError>) {
    let mut names = HashSet::new();
    for (i, route) in config.routes.iter().enumerate() {
        let field = format!("routes[{i}]");

        if route.name.is_empty() || route.name.contains(':') {
            errors.push(ValidationError::new(format!("{field}.name"), "must be non-empty and contain no ':'"));
        } else if !names.insert(route.name.as_str()) {
            errors.push(ValidationError::new(format!("{field}.name"), format!("duplicate route '{}'", route.name)));
        }

        if !route.path.starts_with('/') {
            errors.push(ValidationError::new(format!("{field}.path"), "must start with '/'"));
        }

        match (route.access, route.role) {
            (AccessConfig::Protected, None) => {
                errors.push(ValidationError::new(format!("{field}.role"), "protected routes need a role"));
            }
            (AccessConfig::Public | AccessConfig::AuthOnly, Some(_)) => {
                errors.push(ValidationError::new(format!("{field}.role"), "only protected routes take a role"));
            }
            _ => {}
        }

        if let Some(rule) = route.rate_limit {
            if route.surface != SurfaceConfig::Api {
                errors.push(ValidationError::new(
                    format!("{field}.rate_limit"),
                    "only api routes are rate limited",
                ));
            }
            check_rule(errors, &format!("{field}.rate_limit"), rule);
        }
    }
}
