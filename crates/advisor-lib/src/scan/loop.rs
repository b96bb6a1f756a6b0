//! Scan loop
//!
//! On every tick: load inventory and catalog, solve, publish the outcome.
//! A failed load or an infeasible request produces a report without a plan;
//! the loop keeps running.

use super::{load_request, FleetSource};
use crate::health::{components, HealthRegistry};
use crate::models::AllocationPlan;
use crate::observability::{AdvisorMetrics, StructuredLogger};
use crate::optimizer::Optimizer;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, RwLock};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

/// Default time between scans (5 minutes)
pub const DEFAULT_SCAN_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Latest report, shared with the API
pub type SharedReport = Arc<RwLock<Option<ScanReport>>>;

#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub interval: Duration,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_SCAN_INTERVAL,
        }
    }
}

/// Outcome of one scan cycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    pub cycle: u64,
    pub generated_at: i64,
    pub workloads: usize,
    pub catalog: usize,
    pub current_spend: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<AllocationPlan>,
    /// Why no plan was produced
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Periodically turns the fleet source into a recommendation
pub struct ScanLoop {
    source: Arc<dyn FleetSource>,
    optimizer: Arc<Optimizer>,
    health: HealthRegistry,
    metrics: AdvisorMetrics,
    logger: StructuredLogger,
    config: ScanConfig,
    latest: SharedReport,
    cycle: u64,
}

impl ScanLoop {
    /// Handle to the most recent report
    pub fn latest(&self) -> SharedReport {
        Arc::clone(&self.latest)
    }

    /// Run until a shutdown signal arrives
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        info!(
            interval_secs = self.config.interval.as_secs(),
            "Starting scan loop"
        );

        let mut ticker = interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let report = self.run_cycle().await;
                    debug!(
                        cycle = report.cycle,
                        has_plan = report.plan.is_some(),
                        "Scan cycle complete"
                    );
                }
                _ = shutdown.recv() => {
                    info!("Shutting down scan loop");
                    break;
                }
            }
        }
    }

    /// Run a single scan and publish its report
    pub async fn run_cycle(&mut self) -> ScanReport {
        self.cycle += 1;
        let loaded = load_request(self.source.as_ref()).await;
        self.health
            .record_outcome(components::FLEET_SOURCE, &loaded)
            .await;

        let mut report = ScanReport {
            cycle: self.cycle,
            generated_at: chrono::Utc::now().timestamp(),
            workloads: 0,
            catalog: 0,
            current_spend: 0.0,
            plan: None,
            error: None,
        };

        match loaded {
            Err(e) => {
                let reason = format!("{e:#}");
                self.metrics.inc_scan_errors();
                self.logger.log_source_error("scan", &reason);
                report.error = Some(reason);
            }
            Ok(request) => {
                report.workloads = request.workloads.len();
                report.catalog = request.catalog.len();
                report.current_spend = request.current_spend;

                let start = Instant::now();
                let outcome = self.optimizer.solve(&request);
                self.metrics
                    .observe_optimization_latency(start.elapsed().as_secs_f64());

                match outcome {
                    Ok(plan) => {
                        self.metrics.record_plan(&plan);
                        self.logger.log_plan("scan", &plan);
                        report.plan = Some(plan);
                    }
                    Err(e) => {
                        self.metrics.inc_infeasible();
                        self.logger.log_infeasible(
                            "scan",
                            report.workloads,
                            report.catalog,
                            &e.to_string(),
                        );
                        report.error = Some(e.to_string());
                    }
                }
            }
        }

        match &report.error {
            Some(reason) => {
                self.health
                    .set_degraded(components::SCAN_LOOP, reason.clone())
                    .await
            }
            None => self.health.set_healthy(components::SCAN_LOOP).await,
        }

        *self.latest.write().await = Some(report.clone());
        report
    }
}

/// Builder for the scan loop
pub struct ScanLoopBuilder {
    source: Option<Arc<dyn FleetSource>>,
    optimizer: Option<Arc<Optimizer>>,
    health: Option<HealthRegistry>,
    logger: Option<StructuredLogger>,
    latest: Option<SharedReport>,
    config: ScanConfig,
}

impl ScanLoopBuilder {
    pub fn new() -> Self {
        Self {
            source: None,
            optimizer: None,
            health: None,
            logger: None,
            latest: None,
            config: ScanConfig::default(),
        }
    }

    pub fn source(mut self, source: Arc<dyn FleetSource>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn optimizer(mut self, optimizer: Arc<Optimizer>) -> Self {
        self.optimizer = Some(optimizer);
        self
    }

    pub fn health(mut self, health: HealthRegistry) -> Self {
        self.health = Some(health);
        self
    }

    pub fn logger(mut self, logger: StructuredLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Publish reports into an existing shared slot
    pub fn latest(mut self, latest: SharedReport) -> Self {
        self.latest = Some(latest);
        self
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        self.config.interval = interval;
        self
    }

    pub fn build(self) -> Result<ScanLoop> {
        let source = self
            .source
            .ok_or_else(|| anyhow::anyhow!("Fleet source is required"))?;
        let optimizer = self
            .optimizer
            .ok_or_else(|| anyhow::anyhow!("Optimizer is required"))?;

        Ok(ScanLoop {
            source,
            optimizer,
            health: self.health.unwrap_or_default(),
            metrics: AdvisorMetrics::new(),
            logger: self
                .logger
                .unwrap_or_else(|| StructuredLogger::new("fleet-advisor")),
            config: self.config,
            latest: self.latest.unwrap_or_default(),
            cycle: 0,
        })
    }
}

impl Default for ScanLoopBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::ComponentStatus;
    use crate::inventory::{ComputeResource, SkuOffer};
    use crate::packing::Packer;
    use crate::policy::PolicyValidator;
    use crate::risk::{RiskConfig, RiskEngine};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// In-memory source whose catalog can be switched off
    struct StaticSource {
        offers_available: AtomicBool,
        loads: AtomicUsize,
    }

    impl StaticSource {
        fn new() -> Self {
            Self {
                offers_available: AtomicBool::new(true),
                loads: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl FleetSource for StaticSource {
        async fn load_inventory(&self) -> Result<Vec<ComputeResource>> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            Ok((0..4)
                .map(|i| ComputeResource {
                    id: format!("i-{i}"),
                    kind: "ec2_instance".to_string(),
                    vcpu: 1.0,
                    memory_mib: 1024,
                    monthly_cost: 50.0,
                    group: None,
                })
                .collect())
        }

        async fn load_offers(&self) -> Result<Vec<SkuOffer>> {
            if !self.offers_available.load(Ordering::SeqCst) {
                anyhow::bail!("pricing unavailable");
            }
            Ok(vec![SkuOffer {
                name: "m5.xlarge".to_string(),
                vcpu: 4.0,
                memory_mib: 16384,
                monthly_price: 140.16,
                region: "us-east-1".to_string(),
                zone: "us-east-1a".to_string(),
            }])
        }
    }

    fn optimizer() -> Arc<Optimizer> {
        let risk = Arc::new(RiskEngine::new(RiskConfig::default()).unwrap());
        Arc::new(Optimizer::new(risk, PolicyValidator::default(), Packer::new()))
    }

    #[test]
    fn test_scan_config_default() {
        assert_eq!(ScanConfig::default().interval, Duration::from_secs(300));
    }

    #[test]
    fn test_builder_requires_source() {
        let result = ScanLoopBuilder::new().optimizer(optimizer()).build();
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_cycle_publishes_plan() {
        let health = HealthRegistry::new();
        let mut scan = ScanLoopBuilder::new()
            .source(Arc::new(StaticSource::new()))
            .optimizer(optimizer())
            .health(health.clone())
            .build()
            .unwrap();
        let latest = scan.latest();

        let report = scan.run_cycle().await;

        assert_eq!(report.cycle, 1);
        assert_eq!(report.workloads, 4);
        assert_eq!(report.current_spend, 200.0);
        let plan = report.plan.as_ref().unwrap();
        assert_eq!(plan.node_count(), 1);
        assert!((plan.total_cost - 140.16).abs() < 1e-9);
        assert!((plan.savings - (200.0 - 140.16)).abs() < 1e-9);
        assert!(report.error.is_none());

        let published = latest.read().await.clone().unwrap();
        assert_eq!(published.cycle, 1);
        assert_eq!(
            health.status_of(components::SCAN_LOOP).await,
            Some(ComponentStatus::Healthy)
        );
    }

    #[tokio::test]
    async fn test_failed_load_degrades_without_stopping() {
        let source = Arc::new(StaticSource::new());
        let health = HealthRegistry::new();
        let mut scan = ScanLoopBuilder::new()
            .source(source.clone())
            .optimizer(optimizer())
            .health(health.clone())
            .build()
            .unwrap();

        source.offers_available.store(false, Ordering::SeqCst);
        let failed = scan.run_cycle().await;
        assert!(failed.plan.is_none());
        assert!(failed.error.as_deref().unwrap().contains("pricing unavailable"));
        assert_eq!(
            health.status_of(components::FLEET_SOURCE).await,
            Some(ComponentStatus::Degraded)
        );

        source.offers_available.store(true, Ordering::SeqCst);
        let recovered = scan.run_cycle().await;
        assert_eq!(recovered.cycle, 2);
        assert!(recovered.plan.is_some());
        assert_eq!(source.loads.load(Ordering::SeqCst), 2);
        assert_eq!(
            health.status_of(components::FLEET_SOURCE).await,
            Some(ComponentStatus::Healthy)
        );
    }

    /// Buffer collecting formatted log output
    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl CapturedLogs {
        fn contents(&self) -> String {
            let buf = self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            String::from_utf8_lossy(&buf).into_owned()
        }
    }

    #[tokio::test]
    async fn test_failed_load_logged_as_source_error() {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .json()
            .with_writer(move || writer.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let source = Arc::new(StaticSource::new());
        source.offers_available.store(false, Ordering::SeqCst);
        let mut scan = ScanLoopBuilder::new()
            .source(source)
            .optimizer(optimizer())
            .build()
            .unwrap();

        scan.run_cycle().await;

        let output = logs.contents();
        assert!(output.contains("source_unavailable"), "{output}");
        assert!(output.contains("pricing unavailable"), "{output}");
        assert!(!output.contains("plan_infeasible"), "{output}");
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let scan = ScanLoopBuilder::new()
            .source(Arc::new(StaticSource::new()))
            .optimizer(optimizer())
            .interval(Duration::from_millis(10))
            .build()
            .unwrap();
        let latest = scan.latest();
        let (tx, rx) = broadcast::channel(1);

        let handle = tokio::spawn(scan.run(rx));
        tokio::time::sleep(Duration::from_millis(50)).await;
        tx.send(()).unwrap();
        handle.await.unwrap();

        assert!(latest.read().await.is_some());
    }
}
