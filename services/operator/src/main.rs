//! Sidecar Operator
//!
//! Runs the sidecar controller against in-memory stores, optionally seeded
//! from a JSON file (`SIDECAR_SEED_FILE`).
//!
//! ## Architecture
//!
//! - **Controller**: resyncs the policy object periodically and retries failures
//! - **Engine**: one reconciliation trigger (finalizer, convergence, status)
//! - **Stores**: desired-state and workload access behind traits

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use sidecar_operator::config::Config;
use sidecar_operator::seed::Seed;
use sidecar_operator::{
    Controller, ControllerConfig, Engine, InMemoryDesiredStateStore, InMemoryWorkloadStore,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone())),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!(
        policy = %config.policy,
        resync_interval_secs = config.resync_interval_secs,
        seed_file = ?config.seed_file,
        "Starting sidecar operator"
    );

    let desired = Arc::new(InMemoryDesiredStateStore::new());
    let workloads = Arc::new(InMemoryWorkloadStore::new());

    if let Some(path) = &config.seed_file {
        Seed::from_file(path)?.apply(&desired, &workloads).await;
    }

    let engine = Arc::new(Engine::new(desired, workloads));

    // Create shutdown channel
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let (controller, _handle) =
        Controller::new(engine, config.policy.clone(), ControllerConfig::from(&config));
    let mut controller_handle = tokio::spawn(controller.run(shutdown_rx));

    // Wait for shutdown signal
    let controller_exited = tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
            false
        }
        result = &mut controller_handle => {
            if let Err(e) = result {
                error!(error = %e, "Controller task panicked");
            }
            true
        }
    };

    // Signal shutdown to the controller
    let _ = shutdown_tx.send(true);

    // Give the controller time to finish the trigger in flight
    if !controller_exited
        && tokio::time::timeout(Duration::from_secs(5), controller_handle)
            .await
            .is_err()
    {
        error!("Controller did not stop within 5s");
    }

    info!("Sidecar operator shutdown complete");
    Ok(())
}
