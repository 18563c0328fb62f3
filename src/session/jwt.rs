//! HS256 session tokens.
//!
//! The token carries the whole identity, so resolution never leaves the
//! process. Expired, tampered or malformed tokens surface as
//! [`SessionError::InvalidToken`].

use std::time::Duration;

use async_trait::async_trait;
use axum::http::request::Parts;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::session::{credential, Identity, Role, SessionError, SessionResolver, UserStatus};

/// Shortest accepted signing secret, in bytes.
pub const MIN_SECRET_LEN: usize = 32;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub role: Role,
    pub status: UserStatus,
    pub iat: u64,
    pub exp: u64,
}

impl From<SessionClaims> for Identity {
    fn from(claims: SessionClaims) -> Self {
        Identity {
            id: claims.sub,
            email: claims.email,
            display_name: claims.name,
            role: claims.role,
            status: claims.status,
        }
    }
}

pub struct JwtSessions {
    cookie_name: String,
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl JwtSessions {
    pub fn new(secret: &str, cookie_name: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            cookie_name: cookie_name.to_string(),
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Mint a token for `identity` valid for `ttl`.
    pub fn issue(&self, identity: &Identity, ttl: Duration) -> Result<String, SessionError> {
        let now = jsonwebtoken::get_current_timestamp();
        let claims = SessionClaims {
            sub: identity.id.clone(),
            email: identity.email.clone(),
            name: identity.display_name.clone(),
            role: identity.role,
            status: identity.status,
            iat: now,
            exp: now.saturating_add(ttl.as_secs()),
        };
        Ok(encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?)
    }

    /// Check signature and expiry, returning the embedded identity.
    pub fn verify(&self, token: &str) -> Result<Identity, SessionError> {
        let data = decode::<SessionClaims>(token, &self.decoding, &self.validation)?;
        Ok(data.claims.into())
    }
}

#[async_trait]
impl SessionResolver for JwtSessions {
    async fn resolve(&self, parts: &Parts) -> Result<Option<Identity>, SessionError> {
        match credential(parts, &self.cookie_name) {
            Some(token) => self.verify(token).map(Some),
            None => Ok(None),
        }
    }
}
