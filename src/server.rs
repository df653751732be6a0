//! Runtime setup: store, controller, HTTP server lifecycle.
//!
//! Wires the single routing-table instance into both the reconcile side and
//! the HTTP side, then serves until a shutdown signal drains everything.

use crate::application::services::{Reconciler, SyncController};
use crate::config::Config;
use crate::domain::entities::ShortLinkSpec;
use crate::infrastructure::routing::RoutingTable;
use crate::infrastructure::store::MemoryLinkStore;
use crate::routes::app_router;
use crate::state::AppState;

use anyhow::{Context, Result};
use axum::ServiceExt;
use axum::extract::Request;
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

/// Runs the service with the given configuration.
///
/// Initializes:
/// - Declarative store (seeded from `LINKS_FILE` when configured)
/// - Routing table and reconciliation controller
/// - Axum HTTP server with graceful drain
///
/// # Errors
///
/// Returns an error if:
/// - Seed file loading fails
/// - Server bind fails
/// - Server runtime error occurs
pub async fn run(config: Config) -> Result<()> {
    let store = Arc::new(MemoryLinkStore::new());
    if let Some(path) = &config.links_file {
        let seeded = seed_links(&store, path).await?;
        info!(seeded, %path, "loaded shortlink declarations");
    }

    let table = Arc::new(RoutingTable::new());
    let reconciler = Arc::new(Reconciler::new(
        store.clone(),
        table.clone(),
        config.allowed_schemes.clone(),
        config.public_host.clone(),
    ));
    let controller = Arc::new(SyncController::new(
        store.clone(),
        table.clone(),
        reconciler,
        config.controller_config(),
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let controller_handle = tokio::spawn(controller.run(shutdown_rx));
    info!("synchronization controller started");

    let state = AppState::new(table, config.redirect_policy());
    let app = app_router(state);

    let addr: SocketAddr = config.listen_addr.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on http://{addr}");

    axum::serve(listener, ServiceExt::<Request>::into_make_service(app))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // HTTP connections drained; give the controller its grace period.
    let _ = shutdown_tx.send(true);
    match tokio::time::timeout(config.shutdown_grace(), controller_handle).await {
        Ok(Ok(Ok(()))) => info!("controller drained"),
        Ok(Ok(Err(err))) => warn!(error = %err, "controller exited with error"),
        Ok(Err(err)) => warn!(error = %err, "controller task panicked"),
        Err(_) => warn!(
            grace_secs = config.shutdown_grace_secs,
            "controller did not drain within grace period, terminating"
        ),
    }

    info!("Server exiting");
    Ok(())
}

/// One declaration in a `LINKS_FILE` seed document.
#[derive(Debug, Deserialize)]
struct SeedLink {
    code: String,
    target: String,
}

/// Loads a JSON array of `{code, target}` declarations into the store.
async fn seed_links(store: &MemoryLinkStore, path: &str) -> Result<usize> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read links file '{path}'"))?;
    let seeds: Vec<SeedLink> =
        serde_json::from_str(&raw).with_context(|| format!("Failed to parse links file '{path}'"))?;

    let count = seeds.len();
    for seed in seeds {
        store
            .create(ShortLinkSpec {
                code: seed.code,
                target: seed.target,
            })
            .await
            .context("Failed to seed shortlink")?;
    }
    Ok(count)
}

/// Resolves when SIGINT or SIGTERM is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, draining");
}
