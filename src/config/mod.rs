//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse, RATE_LIMIT_* env overrides)
//!     → validation.rs (semantic checks, all errors collected)
//!     → GatekeeperConfig (validated, immutable)
//!     → compiled by Gatekeeper::new into routes, rules and headers
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → Gatekeeper::reload swaps the compiled state
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - Non-positive limits or windows are startup errors, never per-request faults
//! - Counters live outside the config and survive reloads

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    AccessConfig, GatekeeperConfig, ListenerConfig, LogFormat, MatchKind, ObservabilityConfig,
    RateLimitConfig, RedirectConfig, RouteConfig, RuleConfig, SecurityConfig, SessionConfig,
    SessionProvider, StaticUserConfig, SurfaceConfig, TlsConfig,
};
pub use validation::ValidationError;
