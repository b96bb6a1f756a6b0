//! Background risk decay

use crate::health::{components, HealthRegistry};
use crate::observability::{AdvisorMetrics, StructuredLogger};
use crate::risk::RiskEngine;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::info;

/// Default time between decay ticks, matching the scan cadence
pub const DEFAULT_DECAY_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Applies one `decay()` to the risk engine per interval
pub struct DecayTicker {
    risk: Arc<RiskEngine>,
    interval: Duration,
    health: Option<HealthRegistry>,
    metrics: AdvisorMetrics,
    logger: StructuredLogger,
}

impl DecayTicker {
    pub fn new(risk: Arc<RiskEngine>, interval: Duration) -> Self {
        Self {
            risk,
            interval,
            health: None,
            metrics: AdvisorMetrics::new(),
            logger: StructuredLogger::new("fleet-advisor"),
        }
    }

    pub fn with_health(mut self, health: HealthRegistry) -> Self {
        self.health = Some(health);
        self
    }

    pub fn with_logger(mut self, logger: StructuredLogger) -> Self {
        self.logger = logger;
        self
    }

    /// Decay once and publish the tracked pair count
    pub async fn tick(&self) {
        self.risk.decay();
        let tracked = self.risk.len();
        self.metrics.set_risk_tracked_pairs(tracked as i64);
        self.logger.log_risk_decay(tracked);
        if let Some(health) = &self.health {
            health.set_healthy(components::RISK_ENGINE).await;
        }
    }

    /// Run until a shutdown signal arrives. The first decay happens one
    /// full interval after start.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        info!(
            interval_secs = self.interval.as_secs(),
            "Starting risk decay ticker"
        );

        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => self.tick().await,
                _ = shutdown.recv() => {
                    info!("Shutting down risk decay ticker");
                    break;
                }
            }
        }
    }
}
