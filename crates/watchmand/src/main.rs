//! watchmand — the Watchman daemon.
//!
//! Single binary that assembles the fleet-health subsystems:
//! - Target registry (desired state)
//! - Probe poller + reconciler (observed state)
//! - Status store (authoritative table)
//! - REST API
//!
//! # Usage
//!
//! ```text
//! watchmand --port 8090 --poll-interval 15 --probe-timeout 5
//! ```

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::sync::watch;
use tracing::info;

use watchman_health::WatchConfig;

#[derive(Parser)]
#[command(name = "watchmand", about = "Watchman fleet-health daemon")]
struct Cli {
    /// Port the REST API listens on.
    #[arg(long, default_value = "8090")]
    port: u16,

    /// Poll interval between probe rounds, in seconds.
    #[arg(long, default_value = "15")]
    poll_interval: u64,

    /// Timeout per probe, in seconds. Must be shorter than the interval.
    #[arg(long, default_value = "5")]
    probe_timeout: u64,

    /// Maximum concurrent in-flight probes per round.
    #[arg(long, default_value = "32")]
    max_in_flight: usize,

    /// Consecutive failures before a target is marked unhealthy.
    #[arg(long, default_value = "3")]
    failure_threshold: u32,

    /// HTTP path probed on each model server.
    #[arg(long, default_value = "/healthcheck")]
    health_path: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,watchmand=debug,watchman=debug".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    let config = WatchConfig {
        poll_interval: Duration::from_secs(cli.poll_interval),
        probe_timeout: Duration::from_secs(cli.probe_timeout),
        max_in_flight: cli.max_in_flight,
        failure_threshold: cli.failure_threshold,
        health_path: cli.health_path,
    };
    config.validate().context("invalid configuration")?;

    run(cli.port, config).await
}

async fn run(port: u16, config: WatchConfig) -> anyhow::Result<()> {
    info!("Watchman daemon starting");

    // ── Fleet state ────────────────────────────────────────────
    // Both tables are in-memory; on restart they are rebuilt from the
    // external registration source and fresh probes.

    let registry = watchman_fleet::TargetRegistry::new();
    let store = watchman_fleet::StatusStore::new();
    info!("fleet tables initialized");

    // ── Poll-and-reconcile loop ────────────────────────────────

    let reconciler = watchman_health::StateReconciler::new(store.clone(), config.failure_threshold);
    let poller = watchman_health::ProbePoller::new(registry.clone(), reconciler, config.clone());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let poller_handle = tokio::spawn(async move {
        poller.run(shutdown_rx).await;
    });
    info!("probe poller started");

    // ── API server ─────────────────────────────────────────────

    let router = watchman_api::build_router(registry, store);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    info!(%addr, "API server starting");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Graceful shutdown on Ctrl-C.
    let server = axum::serve(listener, router).with_graceful_shutdown(async move {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install CTRL+C handler");
        info!("shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    server.await?;

    // Wait for the poller to finish its round and exit.
    let _ = poller_handle.await;

    info!("Watchman daemon stopped");
    Ok(())
}
