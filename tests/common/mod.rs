//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use gatekeeper::clock::ManualClock;
use gatekeeper::config::schema::default_routes;
use gatekeeper::config::{GatekeeperConfig, RuleConfig, StaticUserConfig};
use gatekeeper::security::{MemoryStore, RateLimiter};
use gatekeeper::session::{build_resolver, Role, UserStatus};
use gatekeeper::{Gatekeeper, HttpServer, Shutdown};

pub const ADMIN_TOKEN: &str = "admin-token";
pub const USER_TOKEN: &str = "user-token";
pub const INVITED_TOKEN: &str = "invited-token";

fn user(token: &str, id: &str, role: Role, status: UserStatus) -> StaticUserConfig {
    StaticUserConfig {
        token: token.to_string(),
        id: id.to_string(),
        email: format!("{id}@example.com"),
        display_name: None,
        role,
        status,
    }
}

/// Default config with one admin, one user and one invited admin.
pub fn test_config() -> GatekeeperConfig {
    let mut config = GatekeeperConfig::default();
    config.session.users = vec![
        user(ADMIN_TOKEN, "admin-1", Role::Admin, UserStatus::Active),
        user(USER_TOKEN, "user-1", Role::User, UserStatus::Active),
        user(INVITED_TOKEN, "admin-2", Role::Admin, UserStatus::Invited),
    ];
    config
}

/// Spell out the default table with `route` limited to `limit` hits per minute.
pub fn limit_route(config: &mut GatekeeperConfig, route: &str, limit: u32) {
    if config.routes.is_empty() {
        config.routes = default_routes();
    }
    for entry in config.routes.iter_mut().filter(|r| r.name == route) {
        entry.rate_limit = Some(RuleConfig::per_minute(limit));
    }
}

/// Router plus the clock driving its limiter.
pub fn router_with_clock(config: GatekeeperConfig) -> (Router, ManualClock) {
    let clock = ManualClock::default();
    let limiter = RateLimiter::with_parts(
        Arc::new(MemoryStore::new()),
        Arc::new(clock.clone()),
        config.rate_limit.sweep_every,
    );
    let resolver = build_resolver(&config.session).unwrap();
    let gate = Gatekeeper::with_limiter(&config, resolver, Arc::new(limiter)).unwrap();
    let server = HttpServer::with_gatekeeper(config, Arc::new(gate));
    (server.router(), clock)
}

pub fn get(path: &str, token: Option<&str>) -> Request<Body> {
    request("GET", path, token)
}

pub fn request(method: &str, path: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(path)
        .header("x-forwarded-for", "198.51.100.7");
    if let Some(token) = token {
        builder = builder.header("cookie", format!("theme=dark; session={token}"));
    }
    builder.body(Body::empty()).unwrap()
}

pub async fn json_body(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Serve `config` on an ephemeral port. Returns the address and the shutdown handle.
pub async fn spawn_server(config: GatekeeperConfig) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = HttpServer::new(config).unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let (_tx, config_updates) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        let _ = server.run(listener, config_updates, server_shutdown).await;
    });

    (addr, shutdown)
}
