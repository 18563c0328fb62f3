//! The gatekeeping pipeline.
//!
//! `classify → rate-limit (API only) → resolve identity → policy`, stopping
//! at the first step that turns the request away. [`Gatekeeper::admit`] only
//! decides; applying the decision to a response is the middleware's job, so
//! nothing downstream runs before the decision exists.

use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;

use arc_swap::ArcSwap;
use axum::http::{request::Parts, HeaderMap};

use crate::clock::SystemClock;
use crate::config::{ConfigError, GatekeeperConfig, RuleConfig, ValidationError};
use crate::error::GateError;
use crate::observability::metrics;
use crate::routing::{Route, RouteTable, Surface};
use crate::security::{
    AccessPolicy, ClientResolver, Decision, MemoryStore, RateLimitOutcome, RateLimitRule, RateLimiter,
    ScopedLimiter, SecurityHeaders,
};
use crate::session::{self, Identity, SessionResolver};

/// Namespace of the pipeline's own per-route gate.
const GATE_NAMESPACE: &str = "gate";

/// Budgets that handlers spend explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Concern {
    /// Contact form submissions, keyed by client.
    Contact,
    /// Authenticated writes, keyed by user id.
    Writes,
    /// Dashboard reads, keyed by user id.
    Dashboard,
}

impl Concern {
    pub fn namespace(self) -> &'static str {
        match self {
            Concern::Contact => "contact",
            Concern::Writes => "writes",
            Concern::Dashboard => "dashboard",
        }
    }
}

#[derive(Debug)]
struct Concerns {
    contact: ScopedLimiter,
    writes: ScopedLimiter,
    dashboard: ScopedLimiter,
}

impl Concerns {
    fn get(&self, concern: Concern) -> &ScopedLimiter {
        match concern {
            Concern::Contact => &self.contact,
            Concern::Writes => &self.writes,
            Concern::Dashboard => &self.dashboard,
        }
    }
}

/// Everything compiled from one config version.
#[derive(Debug)]
struct GateState {
    routes: RouteTable,
    policy: AccessPolicy,
    headers: SecurityHeaders,
    clients: ClientResolver,
    rate_limit_enabled: bool,
    concerns: Concerns,
}

impl GateState {
    fn compile(config: &GatekeeperConfig, limiter: &Arc<RateLimiter>) -> Result<Self, ConfigError> {
        let rl = &config.rate_limit;
        let scoped = |concern: Concern, rule: RuleConfig| -> Result<ScopedLimiter, ConfigError> {
            let rule = RateLimitRule::new(rule.limit, rule.window_ms).map_err(|e| {
                ConfigError::Validation(vec![ValidationError::new(
                    format!("rate_limit.{}", concern.namespace()),
                    e.to_string(),
                )])
            })?;
            Ok(limiter.scoped(concern.namespace(), rule))
        };

        Ok(Self {
            routes: RouteTable::compile(&config.effective_routes(), rl.default_rule())?,
            policy: AccessPolicy::new(&config.redirects),
            headers: SecurityHeaders::from_config(&config.security)?,
            clients: ClientResolver::new(config.security.trust_forwarded_for),
            rate_limit_enabled: rl.enabled,
            concerns: Concerns {
                contact: scoped(Concern::Contact, rl.contact)?,
                writes: scoped(Concern::Writes, rl.writes)?,
                dashboard: scoped(Concern::Dashboard, rl.dashboard)?,
            },
        })
    }
}

/// The outcome of running the pipeline over one request.
pub struct Admission {
    pub route: Arc<Route>,
    pub client: String,
    /// Active identity, if any. Inactive or unresolvable sessions are `None`.
    pub identity: Option<Identity>,
    pub decision: Decision,
    state: Arc<GateState>,
}

impl Admission {
    pub fn surface(&self) -> Surface {
        self.route.class.surface
    }

    /// Stamp the security header set for this route onto a response.
    pub fn apply_headers(&self, headers: &mut HeaderMap) {
        self.state.headers.apply(self.surface(), headers);
    }

    /// The request-scoped view handed to route handlers.
    pub fn context(&self) -> GateContext {
        GateContext {
            route: self.route.name.clone(),
            client: self.client.clone(),
            identity: self.identity.clone(),
        }
    }
}

impl fmt::Debug for Admission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Admission")
            .field("route", &self.route.name)
            .field("client", &self.client)
            .field("identity", &self.identity.as_ref().map(|i| &i.id))
            .field("decision", &self.decision)
            .finish()
    }
}

/// Attached to every forwarded request's extensions.
#[derive(Debug, Clone)]
pub struct GateContext {
    pub route: String,
    pub client: String,
    pub identity: Option<Identity>,
}

pub struct Gatekeeper {
    state: ArcSwap<GateState>,
    limiter: Arc<RateLimiter>,
    resolver: Arc<dyn SessionResolver>,
}

impl Gatekeeper {
    /// Build from config, including the session resolver it selects.
    pub fn from_config(config: &GatekeeperConfig) -> Result<Self, ConfigError> {
        let resolver = session::build_resolver(&config.session)?;
        Self::new(config, resolver)
    }

    /// Build with an explicit resolver and an in-memory limiter.
    pub fn new(config: &GatekeeperConfig, resolver: Arc<dyn SessionResolver>) -> Result<Self, ConfigError> {
        let limiter = RateLimiter::with_parts(
            Arc::new(MemoryStore::new()),
            Arc::new(SystemClock),
            config.rate_limit.sweep_every,
        );
        Self::with_limiter(config, resolver, Arc::new(limiter))
    }

    /// Build around an existing limiter (custom store or clock).
    pub fn with_limiter(
        config: &GatekeeperConfig,
        resolver: Arc<dyn SessionResolver>,
        limiter: Arc<RateLimiter>,
    ) -> Result<Self, ConfigError> {
        let state = GateState::compile(config, &limiter)?;
        Ok(Self {
            state: ArcSwap::from_pointee(state),
            limiter,
            resolver,
        })
    }

    /// Swap in a new config version. Counters are kept; on error nothing changes.
    pub fn reload(&self, config: &GatekeeperConfig) -> Result<(), ConfigError> {
        let state = GateState::compile(config, &self.limiter)?;
        self.state.store(Arc::new(state));
        tracing::info!(routes = config.effective_routes().len(), "Gatekeeper configuration reloaded");
        Ok(())
    }

    /// Run the pipeline for one request and return its decision.
    pub async fn admit(&self, parts: &Parts, peer: Option<IpAddr>) -> Admission {
        let state = self.state.load_full();
        let route = state.routes.classify(parts.uri.path());
        let client = state.clients.identify(&parts.headers, peer);

        if state.rate_limit_enabled && route.class.surface == Surface::Api {
            if let Some(rule) = route.rate_limit {
                let key = format!("{GATE_NAMESPACE}:{}:{client}", route.name);
                let outcome = self.limiter.check(&key, &rule);
                if !outcome.success {
                    let retry_after_secs = outcome.retry_after_secs(self.limiter.now());
                    tracing::warn!(client = %client, route = %route.name, retry_after_secs, "Rate limit exceeded");
                    metrics::record_rate_limited(&route.name);
                    return Admission {
                        route,
                        client,
                        identity: None,
                        decision: Decision::Reject(GateError::RateLimited { retry_after_secs }),
                        state,
                    };
                }
            }
        }

        let identity = self.resolve_identity(parts).await;
        let decision = state.policy.decide(&route.class, identity.as_ref());

        tracing::debug!(
            route = %route.name,
            access = %route.class.access,
            user = identity.as_ref().map(|i| i.id.as_str()).unwrap_or("-"),
            decision = decision.label(),
            "Gate decision"
        );

        Admission {
            route,
            client,
            identity,
            decision,
            state,
        }
    }

    /// Spend one unit of `concern`'s budget for `subject`.
    pub fn limit(&self, concern: Concern, subject: &str) -> Result<RateLimitOutcome, GateError> {
        let state = self.state.load();
        let scoped = state.concerns.get(concern);
        let outcome = scoped.check(subject);
        if outcome.success {
            return Ok(outcome);
        }
        let retry_after_secs = outcome.retry_after_secs(scoped.now());
        tracing::warn!(concern = concern.namespace(), subject, retry_after_secs, "Rate limit exceeded");
        metrics::record_rate_limited(concern.namespace());
        Err(GateError::RateLimited { retry_after_secs })
    }

    /// The compiled route for `path`.
    pub fn classify(&self, path: &str) -> Arc<Route> {
        self.state.load().routes.classify(path)
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    /// Resolution failures and inactive accounts both count as anonymous.
    async fn resolve_identity(&self, parts: &Parts) -> Option<Identity> {
        match self.resolver.resolve(parts).await {
            Ok(Some(identity)) if identity.is_active() => Some(identity),
            Ok(Some(identity)) => {
                tracing::debug!(user = %identity.id, status = ?identity.status, "Ignoring inactive session");
                None
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(error = %e, "Session resolution failed, treating request as anonymous");
                metrics::record_session_failure();
                None
            }
        }
    }
}

impl fmt::Debug for Gatekeeper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gatekeeper")
            .field("limiter", &self.limiter)
            .finish_non_exhaustive()
    }
}
