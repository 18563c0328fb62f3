//! HTTP server setup.
//!
//! # Responsibilities
//! - Build the Axum router with the gate in front of every handler
//! - Wire up layers (request ID, tracing, timeout, body limit)
//! - Serve plain TCP or TLS with graceful shutdown
//! - Apply validated config reloads to the running gatekeeper

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{middleware, Router};
use axum_server::tls_rustls::RustlsConfig;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower::ServiceBuilder;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::{ConfigError, GatekeeperConfig, TlsConfig};
use crate::gate::{gatekeeper_middleware, Gatekeeper};
use crate::http::handlers;
use crate::http::request::{make_span, UuidRequestId, X_REQUEST_ID};

/// How long in-flight TLS connections get to finish after shutdown.
const TLS_DRAIN_GRACE: Duration = Duration::from_secs(10);

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub gatekeeper: Arc<Gatekeeper>,
}

/// HTTP server fronted by the gatekeeper.
pub struct HttpServer {
    router: Router,
    config: GatekeeperConfig,
    gatekeeper: Arc<Gatekeeper>,
}

impl HttpServer {
    /// Create a server whose gatekeeper and session resolver come from `config`.
    pub fn new(config: GatekeeperConfig) -> Result<Self, ConfigError> {
        let gatekeeper = Arc::new(Gatekeeper::from_config(&config)?);
        Ok(Self::with_gatekeeper(config, gatekeeper))
    }

    /// Create a server around an already-built gatekeeper.
    pub fn with_gatekeeper(config: GatekeeperConfig, gatekeeper: Arc<Gatekeeper>) -> Self {
        let router = Self::build_router(&config, gatekeeper.clone());
        Self {
            router,
            config,
            gatekeeper,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &GatekeeperConfig, gatekeeper: Arc<Gatekeeper>) -> Router {
        let state = AppState {
            gatekeeper: gatekeeper.clone(),
        };

        handlers::routes()
            .with_state(state)
            .layer(RequestBodyLimitLayer::new(config.security.max_body_size))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(middleware::from_fn_with_state(gatekeeper, gatekeeper_middleware))
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::new(X_REQUEST_ID, UuidRequestId))
                    .layer(TraceLayer::new_for_http().make_span_with(make_span))
                    .layer(PropagateRequestIdLayer::new(X_REQUEST_ID)),
            )
    }

    /// The fully layered router, for driving requests without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn gatekeeper(&self) -> &Arc<Gatekeeper> {
        &self.gatekeeper
    }

    pub fn config(&self) -> &GatekeeperConfig {
        &self.config
    }

    /// Serve plain HTTP on `listener` until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        config_updates: mpsc::UnboundedReceiver<GatekeeperConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        spawn_reloader(self.gatekeeper.clone(), config_updates);

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Serve HTTPS on `addr` until `shutdown` fires.
    pub async fn run_tls(
        self,
        addr: SocketAddr,
        tls: &TlsConfig,
        config_updates: mpsc::UnboundedReceiver<GatekeeperConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let rustls = RustlsConfig::from_pem_file(&tls.cert_path, &tls.key_path).await?;
        tracing::info!(address = %addr, cert = %tls.cert_path, "HTTPS server starting");

        spawn_reloader(self.gatekeeper.clone(), config_updates);

        let handle = axum_server::Handle::new();
        let drain = handle.clone();
        tokio::spawn(async move {
            let _ = shutdown.recv().await;
            tracing::info!("Shutdown signal received, draining connections");
            drain.graceful_shutdown(Some(TLS_DRAIN_GRACE));
        });

        axum_server::bind_rustls(addr, rustls)
            .handle(handle)
            .serve(self.router.into_make_service_with_connect_info::<SocketAddr>())
            .await?;

        tracing::info!("HTTPS server stopped");
        Ok(())
    }
}

/// Apply config updates as they arrive. Rejected versions leave the gate as it was.
fn spawn_reloader(gatekeeper: Arc<Gatekeeper>, mut updates: mpsc::UnboundedReceiver<GatekeeperConfig>) {
    tokio::spawn(async move {
        while let Some(config) = updates.recv().await {
            if let Err(e) = gatekeeper.reload(&config) {
                tracing::error!(error = %e, "Config reload rejected, keeping current gate");
            }
        }
    });
}
