//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the
//! gatekeeper. All types derive Serde traits for deserialization from TOML.

use serde::{Deserialize, Serialize};

use crate::session::{Identity, Role, UserStatus};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatekeeperConfig {
    /// Listener configuration (bind address, TLS).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Rate limiting defaults and per-concern rules.
    pub rate_limit: RateLimitConfig,

    /// Route classification table. Checked exact-first, then longest prefix.
    pub routes: Vec<RouteConfig>,

    /// Redirect targets used by the access policy.
    pub redirects: RedirectConfig,

    /// Response hardening.
    pub security: SecurityConfig,

    /// Session credential handling.
    pub session: SessionConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Optional TLS configuration.
    pub tls: Option<TlsConfig>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            tls: None,
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// A single `limit` per `window_ms` budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct RuleConfig {
    pub limit: u32,
    pub window_ms: u64,
}

impl RuleConfig {
    pub const fn per_minute(limit: u32) -> Self {
        Self {
            limit,
            window_ms: 60_000,
        }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable the pipeline's per-route gate on API routes.
    pub enabled: bool,

    /// Default window, overridable with `RATE_LIMIT_WINDOW_MS`.
    pub window_ms: u64,

    /// Default hits per window, overridable with `RATE_LIMIT_MAX`.
    pub max: u32,

    /// Checks between opportunistic sweeps of expired windows.
    pub sweep_every: u64,

    /// Contact form submissions, keyed by client.
    pub contact: RuleConfig,

    /// Authenticated writes, keyed by user id.
    pub writes: RuleConfig,

    /// Dashboard reads, keyed by user id.
    pub dashboard: RuleConfig,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            window_ms: 60_000,
            max: 10,
            sweep_every: 64,
            contact: RuleConfig::per_minute(5),
            writes: RuleConfig::per_minute(10),
            dashboard: RuleConfig::per_minute(30),
        }
    }
}

impl RateLimitConfig {
    /// The rule API routes fall back to when they carry none.
    pub fn default_rule(&self) -> RuleConfig {
        RuleConfig {
            limit: self.max,
            window_ms: self.window_ms,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    #[default]
    Prefix,
    Exact,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SurfaceConfig {
    #[default]
    Page,
    Api,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AccessConfig {
    #[default]
    Public,
    AuthOnly,
    Protected,
}

/// One row of the route classification table.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    /// Route identifier for logging, metrics and rate keys.
    pub name: String,

    /// Path or path prefix to match (case-sensitive).
    pub path: String,

    #[serde(default, rename = "match")]
    pub match_kind: MatchKind,

    #[serde(default)]
    pub surface: SurfaceConfig,

    #[serde(default)]
    pub access: AccessConfig,

    /// Required role for protected routes.
    #[serde(default)]
    pub role: Option<Role>,

    /// Per-route budget (API routes only).
    #[serde(default)]
    pub rate_limit: Option<RuleConfig>,
}

impl RouteConfig {
    fn new(name: &str, path: &str, match_kind: MatchKind, surface: SurfaceConfig, access: AccessConfig) -> Self {
        Self {
            name: name.to_string(),
            path: path.to_string(),
            match_kind,
            surface,
            access,
            role: None,
            rate_limit: None,
        }
    }

    fn role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    fn limited(mut self, rule: RuleConfig) -> Self {
        self.rate_limit = Some(rule);
        self
    }
}

/// Per-client budget shared by every non-auth API prefix in the default table.
/// Stays above the concern budgets handlers spend on the same paths.
const API_CLIENT_BUDGET: RuleConfig = RuleConfig::per_minute(100);

/// The table used when the config file declares no routes.
pub fn default_routes() -> Vec<RouteConfig> {
    use AccessConfig::*;
    use MatchKind::*;
    use SurfaceConfig::*;

    vec![
        RouteConfig::new("auth-api", "/api/auth/", Prefix, Api, Public).limited(RuleConfig::per_minute(10)),
        RouteConfig::new("dashboard-api", "/api/dashboard/", Prefix, Api, Protected)
            .role(Role::Admin)
            .limited(API_CLIENT_BUDGET),
        RouteConfig::new("users-api", "/api/users", Prefix, Api, Protected)
            .role(Role::Admin)
            .limited(API_CLIENT_BUDGET),
        RouteConfig::new("posts-api", "/api/posts", Prefix, Api, Protected)
            .role(Role::User)
            .limited(API_CLIENT_BUDGET),
        RouteConfig::new("api", "/api/", Prefix, Api, Public).limited(API_CLIENT_BUDGET),
        RouteConfig::new("dashboard", "/dashboard", Prefix, Page, Protected).role(Role::Admin),
        RouteConfig::new("login", "/login", Exact, Page, AuthOnly),
    ]
}

/// Where the access policy sends navigation requests it turns away.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RedirectConfig {
    /// Sign-in entry point for anonymous visitors.
    pub sign_in: String,

    /// Authenticated landing area (used when a signed-in user opens the login page).
    pub landing: String,

    /// Neutral page for signed-in users lacking the required role.
    pub neutral: String,
}

impl Default for RedirectConfig {
    fn default() -> Self {
        Self {
            sign_in: "/login".to_string(),
            landing: "/dashboard".to_string(),
            neutral: "/".to_string(),
        }
    }
}

/// Security hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Enable security headers.
    pub enable_headers: bool,

    /// HSTS max-age in seconds.
    pub hsts_max_age_secs: u64,

    /// Append `includeSubDomains` to HSTS.
    pub hsts_include_subdomains: bool,

    /// Content-Security-Policy sent on API responses.
    pub api_csp: String,

    /// Honor X-Forwarded-For / X-Real-IP when identifying clients.
    pub trust_forwarded_for: bool,

    /// Maximum body size in bytes.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            enable_headers: true,
            hsts_max_age_secs: 31_536_000,
            hsts_include_subdomains: true,
            api_csp: "default-src 'self'; script-src 'none'; object-src 'none'".to_string(),
            trust_forwarded_for: true,
            max_body_size: 2 * 1024 * 1024, // 2MB
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionProvider {
    #[default]
    Static,
    Jwt,
}

/// Session credential handling.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    pub provider: SessionProvider,

    /// Cookie carrying the session token.
    pub cookie_name: String,

    /// HS256 signing secret for the `jwt` provider.
    pub jwt_secret: String,

    /// Fixed tokens for the `static` provider.
    pub users: Vec<StaticUserConfig>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            provider: SessionProvider::Static,
            cookie_name: "session".to_string(),
            jwt_secret: String::new(),
            users: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StaticUserConfig {
    pub token: String,
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default = "default_role")]
    pub role: Role,
    #[serde(default = "default_status")]
    pub status: UserStatus,
}

fn default_role() -> Role {
    Role::User
}

fn default_status() -> UserStatus {
    UserStatus::Active
}

impl StaticUserConfig {
    pub fn identity(&self) -> Identity {
        Identity {
            id: self.id.clone(),
            email: self.email.clone(),
            display_name: self.display_name.clone(),
            role: self.role,
            status: self.status,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error); `RUST_LOG` wins when set.
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

impl GatekeeperConfig {
    /// Routes to compile: the configured table, or the defaults when empty.
    pub fn effective_routes(&self) -> Vec<RouteConfig> {
        if self.routes.is_empty() {
            default_routes()
        } else {
            self.routes.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_api_routes_leave_room_for_concerns() {
        let limits = RateLimitConfig::default();
        let concern_max = [limits.contact, limits.writes, limits.dashboard]
            .iter()
            .map(|rule| rule.limit)
            .max()
            .unwrap();

        for route in default_routes().iter().filter(|r| r.surface == SurfaceConfig::Api) {
            let rule = route.rate_limit.unwrap_or_else(|| panic!("{} has no rule", route.name));
            if route.name != "auth-api" {
                assert!(rule.limit >= concern_max, "{} allows only {}", route.name, rule.limit);
            }
        }
    }

    #[test]
    fn test_minimal_toml_uses_defaults() {
        let config: GatekeeperConfig = toml::from_str("").unwrap();
        assert_eq!(config.rate_limit.window_ms, 60_000);
        assert_eq!(config.rate_limit.max, 10);
        assert_eq!(config.rate_limit.contact, RuleConfig::per_minute(5));
        assert_eq!(config.effective_routes().len(), default_routes().len());
    }

    #[test]
    fn test_route_table_parses() {
        let config: GatekeeperConfig = toml::from_str(
            r#"
            [[routes]]
            name = "admin"
            path = "/admin"
            surface = "page"
            access = "protected"
            role = "ADMIN"

            [[routes]]
            name = "signin"
            path = "/signin"
            match = "exact"
            access = "auth_only"

            [[routes]]
            name = "hooks"
            path = "/api/hooks/"
            surface = "api"
            rate_limit = { limit = 3, window_ms = 1000 }
            "#,
        )
        .unwrap();

        assert_eq!(config.routes.len(), 3);
        assert_eq!(config.routes[0].role, Some(Role::Admin));
        assert_eq!(config.routes[1].match_kind, MatchKind::Exact);
        assert_eq!(config.routes[1].access, AccessConfig::AuthOnly);
        assert_eq!(config.routes[2].rate_limit, Some(RuleConfig { limit: 3, window_ms: 1000 }));
    }
}
