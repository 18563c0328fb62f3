//! Gatekeeper server.
//!
//! ```text
//!   client ──▶ request id ─▶ trace span ─▶ ┌──────────── gate ────────────┐ ─▶ handlers
//!                                          │ classify → rate limit (API)  │
//!                                          │ → session → access policy    │
//!                                          └──────────────┬───────────────┘
//!   client ◀── security headers ◀── redirect / 401 / 403 / 429 ┘
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use gatekeeper::config::{loader, watcher::ConfigWatcher};
use gatekeeper::lifecycle::{wait_for_signal, Shutdown};
use gatekeeper::observability::{logging, metrics};
use gatekeeper::HttpServer;

#[derive(Parser)]
#[command(name = "gatekeeper")]
#[command(about = "Rate limiting, session and role gate in front of a web app", long_about = None)]
struct Args {
    /// TOML config file. Without one, defaults plus RATE_LIMIT_* env vars are used.
    #[arg(short, long, env = "GATEKEEPER_CONFIG")]
    config: Option<PathBuf>,

    /// Reload the config file when it changes.
    #[arg(long, requires = "config")]
    watch: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => loader::load_config(path)?,
        None => loader::from_env()?,
    };

    logging::init(&config.observability)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "gatekeeper starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        routes = config.effective_routes().len(),
        rate_limit_max = config.rate_limit.max,
        rate_limit_window_ms = config.rate_limit.window_ms,
        session_provider = ?config.session.provider,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr);
    }

    // Held for the life of the process; dropping it stops watching.
    let (config_updates, _watcher) = match (&args.config, args.watch) {
        (Some(path), true) => {
            let (watcher, rx) = ConfigWatcher::new(path);
            (rx, Some(watcher.run()?))
        }
        _ => (mpsc::unbounded_channel().1, None),
    };

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        match wait_for_signal().await {
            Ok(signal) => tracing::info!(signal, "Signal received"),
            Err(e) => tracing::error!(error = %e, "Signal handler failed, shutting down"),
        }
        signal_shutdown.trigger();
    });

    let tls = config.listener.tls.clone();
    let bind_address = config.listener.bind_address.clone();
    let server = HttpServer::new(config)?;

    match tls {
        Some(tls) => {
            let addr: SocketAddr = bind_address.parse()?;
            server.run_tls(addr, &tls, config_updates, server_shutdown).await?;
        }
        None => {
            let listener = TcpListener::bind(&bind_address).await?;
            tracing::info!(address = %listener.local_addr()?, "Listening for connections");
            server.run(listener, config_updates, server_shutdown).await?;
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
