//! Access policy: route class + identity → decision.
//!
//! Pure and synchronous. Navigation routes never see a 401/403; they are
//! redirected so the existence of a protected page is not confirmed to
//! users who cannot open it.

use crate::config::RedirectConfig;
use crate::error::GateError;
use crate::routing::{Access, RouteClass, Surface};
use crate::session::Identity;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Redirect(String),
    Reject(GateError),
}

impl Decision {
    pub fn label(&self) -> &'static str {
        match self {
            Decision::Allow => "allow",
            Decision::Redirect(_) => "redirect",
            Decision::Reject(e) => e.kind(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AccessPolicy {
    sign_in: String,
    landing: String,
    neutral: String,
}

impl AccessPolicy {
    pub fn new(redirects: &RedirectConfig) -> Self {
        Self {
            sign_in: redirects.sign_in.clone(),
            landing: redirects.landing.clone(),
            neutral: redirects.neutral.clone(),
        }
    }

    /// Decide what happens to a request. `identity` must already be filtered
    /// down to active accounts.
    pub fn decide(&self, class: &RouteClass, identity: Option<&Identity>) -> Decision {
        match (class.access, identity) {
            (Access::Public, _) => Decision::Allow,

            (Access::AuthOnly, Some(_)) => Decision::Redirect(self.landing.clone()),
            (Access::AuthOnly, None) => Decision::Allow,

            (Access::Protected(_), None) => match class.surface {
                Surface::Page => Decision::Redirect(self.sign_in.clone()),
                Surface::Api => Decision::Reject(GateError::Unauthenticated),
            },
            (Access::Protected(required), Some(id)) if !id.role.satisfies(required) => match class.surface {
                Surface::Page => Decision::Redirect(self.neutral.clone()),
                Surface::Api => Decision::Reject(GateError::Forbidden),
            },
            (Access::Protected(_), Some(_)) => Decision::Allow,
        }
    }
}

impl Default for AccessPolicy {
    fn default() -> Self {
        Self::new(&RedirectConfig::default())
    }
}
