//! Compiled route table.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::config::schema::{AccessConfig, MatchKind, RouteConfig, RuleConfig, SurfaceConfig};
use crate::config::{ConfigError, ValidationError};
use crate::security::rate_limit::RateLimitRule;
use crate::session::Role;

/// Name given to paths no entry matches.
pub const DEFAULT_ROUTE: &str = "default";

/// Navigation pages get redirects; API routes get status codes and JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Surface {
    Page,
    Api,
}

impl Surface {
    pub fn as_str(self) -> &'static str {
        match self {
            Surface::Page => "page",
            Surface::Api => "api",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Public,
    /// Only for visitors without a session (e.g. the login page).
    AuthOnly,
    Protected(Role),
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Access::Public => f.write_str("public"),
            Access::AuthOnly => f.write_str("auth_only"),
            Access::Protected(role) => write!(f, "protected({role})"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteClass {
    pub access: Access,
    pub surface: Surface,
}

impl RouteClass {
    pub const fn new(access: Access, surface: Surface) -> Self {
        Self { access, surface }
    }
}

/// A compiled table entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub name: String,
    pub class: RouteClass,
    /// Per-route budget for the pipeline gate. Always set on API routes.
    pub rate_limit: Option<RateLimitRule>,
}

#[derive(Debug, Clone)]
struct PrefixEntry {
    prefix: String,
    route: Arc<Route>,
}

/// Immutable path → classification table.
#[derive(Debug, Clone)]
pub struct RouteTable {
    exact: HashMap<String, Arc<Route>>,
    prefixes: Vec<PrefixEntry>,
    fallback: Arc<Route>,
}

impl RouteTable {
    /// Compile `routes`. API routes without their own rule get `default_api_rule`.
    pub fn compile(routes: &[RouteConfig], default_api_rule: RuleConfig) -> Result<Self, ConfigError> {
        let mut errors = Vec::new();
        let mut exact = HashMap::new();
        let mut prefixes = Vec::new();

        let default_rule = match RateLimitRule::new(default_api_rule.limit, default_api_rule.window_ms) {
            Ok(rule) => Some(rule),
            Err(e) => {
                errors.push(ValidationError::new("rate_limit", e.to_string()));
                None
            }
        };

        for cfg in routes {
            let access = match (cfg.access, cfg.role) {
                (AccessConfig::Public, _) => Access::Public,
                (AccessConfig::AuthOnly, _) => Access::AuthOnly,
                (AccessConfig::Protected, Some(role)) => Access::Protected(role),
                (AccessConfig::Protected, None) => {
                    errors.push(ValidationError::new(
                        format!("routes.{}.role", cfg.name),
                        "protected routes need a role",
                    ));
                    continue;
                }
            };
            let surface = match cfg.surface {
                SurfaceConfig::Page => Surface::Page,
                SurfaceConfig::Api => Surface::Api,
            };

            let rate_limit = match (surface, cfg.rate_limit) {
                (Surface::Api, Some(rule)) => match RateLimitRule::new(rule.limit, rule.window_ms) {
                    Ok(rule) => Some(rule),
                    Err(e) => {
                        errors.push(ValidationError::new(format!("routes.{}.rate_limit", cfg.name), e.to_string()));
                        continue;
                    }
                },
                (Surface::Api, None) => default_rule,
                (Surface::Page, _) => None,
            };

            let route = Arc::new(Route {
                name: cfg.name.clone(),
                class: RouteClass::new(access, surface),
                rate_limit,
            });

            match cfg.match_kind {
                MatchKind::Exact => {
                    exact.insert(cfg.path.clone(), route);
                }
                MatchKind::Prefix => prefixes.push(PrefixEntry {
                    prefix: cfg.path.clone(),
                    route,
                }),
            }
        }

        if !errors.is_empty() {
            return Err(ConfigError::Validation(errors));
        }

        // Longest prefix first; stable sort keeps declaration order on ties.
        prefixes.sort_by(|a, b| b.prefix.len().cmp(&a.prefix.len()));

        Ok(Self {
            exact,
            prefixes,
            fallback: Arc::new(Route {
                name: DEFAULT_ROUTE.to_string(),
                class: RouteClass::new(Access::Public, Surface::Page),
                rate_limit: None,
            }),
        })
    }

    /// Classify a request path.
    pub fn classify(&self, path: &str) -> Arc<Route> {
        if let Some(route) = self.exact.get(path) {
            return Arc::clone(route);
        }
        self.prefixes
            .iter()
            .find(|entry| path.starts_with(&entry.prefix))
            .map(|entry| Arc::clone(&entry.route))
            .unwrap_or_else(|| Arc::clone(&self.fallback))
    }

    /// Every compiled entry with its path, exact entries first.
    pub fn entries(&self) -> Vec<(String, Arc<Route>)> {
        let mut exact: Vec<_> = self
            .exact
            .iter()
            .map(|(path, route)| (path.clone(), Arc::clone(route)))
            .collect();
        exact.sort_by(|a, b| a.0.cmp(&b.0));
        exact
            .into_iter()
            .chain(self.prefixes.iter().map(|e| (format!("{}*", e.prefix), Arc::clone(&e.route))))
            .collect()
    }
}
