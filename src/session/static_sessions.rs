//! Fixed token table, configured under `[[session.users]]`.

use std::collections::HashMap;

use async_trait::async_trait;
use axum::http::request::Parts;

use crate::config::SessionConfig;
use crate::session::{credential, Identity, SessionError, SessionResolver};

#[derive(Debug, Clone, Default)]
pub struct StaticSessions {
    cookie_name: String,
    by_token: HashMap<String, Identity>,
}

impl StaticSessions {
    pub fn new(cookie_name: impl Into<String>) -> Self {
        Self {
            cookie_name: cookie_name.into(),
            by_token: HashMap::new(),
        }
    }

    pub fn from_config(config: &SessionConfig) -> Self {
        let mut sessions = Self::new(config.cookie_name.clone());
        for user in &config.users {
            sessions = sessions.with_user(user.token.clone(), user.identity());
        }
        sessions
    }

    pub fn with_user(mut self, token: impl Into<String>, identity: Identity) -> Self {
        self.by_token.insert(token.into(), identity);
        self
    }
}

#[async_trait]
impl SessionResolver for StaticSessions {
    async fn resolve(&self, parts: &Parts) -> Result<Option<Identity>, SessionError> {
        Ok(credential(parts, &self.cookie_name).and_then(|token| self.by_token.get(token).cloned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{Role, UserStatus};
    use axum::http::Request;

    #[tokio::test]
    async fn test_known_and_unknown_tokens() {
        let admin = Identity {
            id: "1".into(),
            email: "admin@example.com".into(),
            display_name: Some("Admin User".into()),
            role: Role::Admin,
            status: UserStatus::Active,
        };
        let sessions = StaticSessions::new("session").with_user("t-admin", admin.clone());

        let (known, _) = Request::builder()
            .header("cookie", "session=t-admin")
            .body(())
            .unwrap()
            .into_parts();
        assert_eq!(sessions.resolve(&known).await.unwrap(), Some(admin));

        let (unknown, _) = Request::builder()
            .header("authorization", "Bearer nope")
            .body(())
            .unwrap()
            .into_parts();
        assert_eq!(sessions.resolve(&unknown).await.unwrap(), None);
    }
}
