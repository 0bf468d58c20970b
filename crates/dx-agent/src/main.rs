//! Edge agent: polls each configured ECU on an interval and logs the
//! decoded diagnostic records.

use std::sync::Arc;

use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use dx_agent::config::AgentConfig;
use dx_agent::ecu;
use dx_agent::publisher::LogPublisher;
use dx_session::RecordPublisher;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "dx-agent starting");

    // ── Load config ─────────────────────────────────────────────
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "/etc/dx/agent.toml".to_string());

    let config = AgentConfig::from_file(&config_path)?;
    tracing::info!(
        ecus = config.ecus.len(),
        modes = ?config.modes,
        keep_alive_secs = config.keep_alive_secs,
        cycle_interval_secs = config.cycle_interval_secs,
        "config loaded"
    );

    // ── Catalog (validation errors are fatal) ───────────────────
    let catalog = Arc::new(config.load_catalog()?);
    tracing::info!(parameters = catalog.len(), "catalog ready");

    // ── One poller per ECU (simulated transport for now) ────────
    let publisher: Arc<dyn RecordPublisher> = Arc::new(LogPublisher);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let mut tasks = Vec::with_capacity(config.ecus.len());
    for ecu_config in &config.ecus {
        let task = ecu::spawn_simulated(
            &config,
            ecu_config,
            catalog.clone(),
            publisher.clone(),
            shutdown_rx.clone(),
        )?;
        tracing::info!(ecu_type = ?ecu_config.resolved_type(), "poller started");
        tasks.push(task);
    }

    tracing::info!("dx-agent ready");

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown signal received");

    for task in &tasks {
        task.cancel();
    }
    shutdown_tx.send(true)?;
    for task in tasks {
        if let Err(e) = task.handle.await {
            tracing::warn!(error = %e, "poller task failed");
        }
    }

    tracing::info!("dx-agent stopped");
    Ok(())
}
