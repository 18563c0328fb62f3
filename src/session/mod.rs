//! Session resolution.
//!
//! # Data Flow
//! ```text
//! Request parts (cookie / Authorization header)
//!     → credential()          (pick the raw token)
//!     → SessionResolver       (static table or signed JWT)
//!     → Option<Identity>      (read-only for the rest of the request)
//! ```
//!
//! Authentication itself (passwords, sign-in forms) lives outside this crate;
//! the gatekeeper only turns an existing credential into an [`Identity`].

pub mod jwt;
pub mod static_sessions;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use axum::http::{header, request::Parts};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{ConfigError, SessionConfig, SessionProvider, ValidationError};

pub use jwt::JwtSessions;
pub use static_sessions::StaticSessions;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    /// Whether this role grants access to something requiring `required`.
    /// Admins satisfy every requirement.
    pub fn satisfies(self, required: Role) -> bool {
        match self {
            Role::Admin => true,
            Role::User => required == Role::User,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => f.write_str("USER"),
            Role::Admin => f.write_str("ADMIN"),
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "USER" => Ok(Role::User),
            "ADMIN" => Ok(Role::Admin),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserStatus {
    Active,
    Invited,
    Suspended,
}

/// An authenticated principal, valid for one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub role: Role,
    pub status: UserStatus,
}

impl Identity {
    /// Only active accounts count as signed in.
    pub fn is_active(&self) -> bool {
        self.status == UserStatus::Active
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("invalid session token: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),
    #[error("session backend failure: {0}")]
    Backend(String),
}

/// Turns request credentials into an identity.
///
/// `Ok(None)` means "no session". Errors are reported separately so they can
/// be logged, but the pipeline treats both the same way.
#[async_trait]
pub trait SessionResolver: Send + Sync {
    async fn resolve(&self, parts: &Parts) -> Result<Option<Identity>, SessionError>;
}

/// Extract the raw session token: named cookie first, then a bearer token.
pub fn credential<'a>(parts: &'a Parts, cookie_name: &str) -> Option<&'a str> {
    let from_cookie = parts
        .headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == cookie_name)
        .map(|(_, value)| value.trim())
        .filter(|value| !value.is_empty());

    from_cookie.or_else(|| {
        parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
    })
}

/// Build the resolver selected by `[session] provider`.
pub fn build_resolver(config: &SessionConfig) -> Result<Arc<dyn SessionResolver>, ConfigError> {
    match config.provider {
        SessionProvider::Static => Ok(Arc::new(StaticSessions::from_config(config))),
        SessionProvider::Jwt => {
            if config.jwt_secret.len() < jwt::MIN_SECRET_LEN {
                return Err(ConfigError::Validation(vec![ValidationError::new(
                    "session.jwt_secret",
                    format!("must be at least {} bytes", jwt::MIN_SECRET_LEN),
                )]));
            }
            Ok(Arc::new(JwtSessions::new(&config.jwt_secret, &config.cookie_name)))
        }
    }
}
