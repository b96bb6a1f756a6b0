//! Fleet Advisor - compute fleet cost optimization service
//!
//! Serves the optimizer over HTTP, decays interruption risk on a fixed
//! cadence and, when inventory and catalog files are configured, publishes
//! a fresh recommendation on every scan.

use advisor_lib::{
    health::{components, HealthRegistry},
    observability::{AdvisorMetrics, StructuredLogger},
    scan::{DecayTicker, JsonFileSource, ScanLoopBuilder, SharedReport},
    Optimizer, Packer, PolicyValidator, RiskEngine,
};
use anyhow::{Context, Result};
use fleet_advisor::{api, config::AdvisorConfig};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const ADVISOR_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting fleet-advisor");

    let config = AdvisorConfig::load()?;
    info!(
        instance = %config.instance_name,
        api_port = config.api_port,
        scan_enabled = config.source_paths().is_some(),
        "Advisor configured"
    );

    let risk = Arc::new(RiskEngine::new(config.risk.clone()).context("Invalid risk configuration")?);
    let policy = PolicyValidator::new(config.policy.clone());
    let optimizer = Arc::new(Optimizer::new(Arc::clone(&risk), policy, Packer::new()));

    let health_registry = HealthRegistry::new();
    health_registry.register(components::OPTIMIZER).await;
    health_registry.register(components::RISK_ENGINE).await;

    let metrics = AdvisorMetrics::new();
    let logger = StructuredLogger::new(&config.instance_name);
    logger.log_startup(ADVISOR_VERSION);

    let latest_report = SharedReport::default();
    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    let decay = DecayTicker::new(Arc::clone(&risk), config.decay_interval())
        .with_health(health_registry.clone())
        .with_logger(logger.clone());
    let decay_handle = tokio::spawn(decay.run(shutdown_tx.subscribe()));

    let scan_handle = match config.source_paths() {
        Some((inventory, catalog)) => {
            health_registry.register(components::FLEET_SOURCE).await;
            health_registry.register(components::SCAN_LOOP).await;
            let scan = ScanLoopBuilder::new()
                .source(Arc::new(JsonFileSource::new(inventory, catalog)))
                .optimizer(Arc::clone(&optimizer))
                .health(health_registry.clone())
                .logger(logger.clone())
                .latest(Arc::clone(&latest_report))
                .interval(config.scan_interval())
                .build()?;
            Some(tokio::spawn(scan.run(shutdown_tx.subscribe())))
        }
        None => {
            warn!("inventory_path or catalog_path not set, scan loop disabled");
            None
        }
    };

    let app_state = Arc::new(api::AppState::new(
        health_registry.clone(),
        metrics,
        logger.clone(),
        optimizer,
        latest_report,
    ));

    // Mark advisor as ready after initialization
    health_registry.set_ready(true).await;

    let api_handle = tokio::spawn(api::serve(config.api_port, app_state));

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result.context("Failed to listen for shutdown signal")?;
            logger.log_shutdown("SIGINT received");
        }
        result = api_handle => {
            match result {
                Ok(Ok(())) => logger.log_shutdown("API server exited"),
                Ok(Err(e)) => error!(error = %e, "API server failed"),
                Err(e) => error!(error = %e, "API server task panicked"),
            }
        }
    }

    info!("Shutting down");
    // Receivers may already be gone if a task exited early
    let _ = shutdown_tx.send(());
    if let Err(e) = decay_handle.await {
        error!(error = %e, "Decay ticker task failed");
    }
    if let Some(handle) = scan_handle {
        if let Err(e) = handle.await {
            error!(error = %e, "Scan loop task failed");
        }
    }

    Ok(())
}
