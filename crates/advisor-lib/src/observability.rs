//! Observability infrastructure for the fleet advisor
//!
//! Provides:
//! - Prometheus metrics (optimization latency, plan outcomes, risk tracking)
//! - Structured JSON logging with tracing

use crate::models::AllocationPlan;
use prometheus::{
    register_gauge, register_histogram, register_int_counter, register_int_gauge, Gauge,
    Histogram, IntCounter, IntGauge,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for optimization latency (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<AdvisorMetricsInner> = OnceLock::new();

/// Inner metrics structure that holds the actual Prometheus metrics
struct AdvisorMetricsInner {
    optimization_latency_seconds: Histogram,
    plans_generated: IntCounter,
    plans_infeasible: IntCounter,
    workloads_unplaced: IntCounter,
    interruptions_recorded: IntCounter,
    risk_tracked_pairs: IntGauge,
    plan_monthly_cost: Gauge,
    plan_monthly_savings: Gauge,
    plan_nodes: IntGauge,
    scan_errors: IntCounter,
}

impl AdvisorMetricsInner {
    fn new() -> Self {
        Self {
            optimization_latency_seconds: register_histogram!(
                "fleet_advisor_optimization_latency_seconds",
                "Time spent solving a single optimization request",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register optimization_latency_seconds"),

            plans_generated: register_int_counter!(
                "fleet_advisor_plans_generated_total",
                "Total number of allocation plans produced"
            )
            .expect("Failed to register plans_generated"),

            plans_infeasible: register_int_counter!(
                "fleet_advisor_plans_infeasible_total",
                "Total number of optimization runs with no feasible plan"
            )
            .expect("Failed to register plans_infeasible"),

            workloads_unplaced: register_int_counter!(
                "fleet_advisor_workloads_unplaced_total",
                "Total number of workloads dropped as larger than the chosen node shape"
            )
            .expect("Failed to register workloads_unplaced"),

            interruptions_recorded: register_int_counter!(
                "fleet_advisor_interruptions_recorded_total",
                "Total number of instance interruptions recorded"
            )
            .expect("Failed to register interruptions_recorded"),

            risk_tracked_pairs: register_int_gauge!(
                "fleet_advisor_risk_tracked_pairs",
                "Number of (zone, instance type) pairs with a tracked risk score"
            )
            .expect("Failed to register risk_tracked_pairs"),

            plan_monthly_cost: register_gauge!(
                "fleet_advisor_plan_monthly_cost",
                "Monthly cost of the most recent plan"
            )
            .expect("Failed to register plan_monthly_cost"),

            plan_monthly_savings: register_gauge!(
                "fleet_advisor_plan_monthly_savings",
                "Monthly savings of the most recent plan versus current spend"
            )
            .expect("Failed to register plan_monthly_savings"),

            plan_nodes: register_int_gauge!(
                "fleet_advisor_plan_nodes",
                "Node count of the most recent plan"
            )
            .expect("Failed to register plan_nodes"),

            scan_errors: register_int_counter!(
                "fleet_advisor_scan_errors_total",
                "Total number of scan cycles that failed to load inventory or catalog"
            )
            .expect("Failed to register scan_errors"),
        }
    }
}

/// Advisor metrics for Prometheus exposition
///
/// This is a lightweight handle to the global metrics instance.
/// Multiple clones share the same underlying metrics.
#[derive(Clone)]
pub struct AdvisorMetrics {
    _private: (),
}

impl Default for AdvisorMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl AdvisorMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(AdvisorMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &AdvisorMetricsInner {
        GLOBAL_METRICS.get_or_init(AdvisorMetricsInner::new)
    }

    pub fn observe_optimization_latency(&self, duration_secs: f64) {
        self.inner()
            .optimization_latency_seconds
            .observe(duration_secs);
    }

    /// Record a produced plan
    pub fn record_plan(&self, plan: &AllocationPlan) {
        let inner = self.inner();
        inner.plans_generated.inc();
        inner.workloads_unplaced.inc_by(plan.unplaced.len() as u64);
        inner.plan_monthly_cost.set(plan.total_cost);
        inner.plan_monthly_savings.set(plan.savings);
        inner.plan_nodes.set(plan.node_count() as i64);
    }

    pub fn inc_infeasible(&self) {
        self.inner().plans_infeasible.inc();
    }

    pub fn inc_interruptions(&self) {
        self.inner().interruptions_recorded.inc();
    }

    pub fn set_risk_tracked_pairs(&self, count: i64) {
        self.inner().risk_tracked_pairs.set(count);
    }

    pub fn inc_scan_errors(&self) {
        self.inner().scan_errors.inc();
    }
}

/// Structured logger for advisor events
///
/// Provides consistent JSON-formatted logging for plans, interruptions
/// and lifecycle events.
#[derive(Clone)]
pub struct StructuredLogger {
    instance: String,
}

impl StructuredLogger {
    pub fn new(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
        }
    }

    /// Log a produced plan
    pub fn log_plan(&self, source: &str, plan: &AllocationPlan) {
        info!(
            event = "plan_generated",
            instance = %self.instance,
            source = %source,
            strategy = %plan.strategy,
            nodes = plan.node_count(),
            total_cost = plan.total_cost,
            savings = plan.savings,
            risk_score = plan.risk_score,
            instructions = ?plan.instructions,
            "Generated allocation plan"
        );

        if !plan.unplaced.is_empty() {
            warn!(
                event = "workloads_unplaced",
                instance = %self.instance,
                source = %source,
                count = plan.unplaced.len(),
                workloads = ?plan.unplaced,
                "Workloads exceed node capacity and need manual placement"
            );
        }
    }

    /// Log a scan whose inventory or catalog could not be loaded
    pub fn log_source_error(&self, source: &str, reason: &str) {
        warn!(
            event = "source_unavailable",
            instance = %self.instance,
            source = %source,
            reason = %reason,
            "Failed to load fleet source"
        );
    }

    /// Log an optimization run that produced no recommendation
    pub fn log_infeasible(&self, source: &str, workloads: usize, catalog: usize, reason: &str) {
        warn!(
            event = "plan_infeasible",
            instance = %self.instance,
            source = %source,
            workloads = workloads,
            catalog = catalog,
            reason = %reason,
            "Optimization skipped"
        );
    }

    /// Log a recorded interruption
    pub fn log_interruption(&self, zone: &str, instance_type: &str, score: f64) {
        warn!(
            event = "interruption_recorded",
            instance = %self.instance,
            zone = %zone,
            instance_type = %instance_type,
            score = score,
            "Instance interruption recorded"
        );
    }

    /// Log a risk decay tick
    pub fn log_risk_decay(&self, tracked_pairs: usize) {
        info!(
            event = "risk_decayed",
            instance = %self.instance,
            tracked_pairs = tracked_pairs,
            "Decayed interruption risk scores"
        );
    }

    /// Log advisor startup
    pub fn log_startup(&self, version: &str) {
        info!(
            event = "advisor_started",
            instance = %self.instance,
            advisor_version = %version,
            "Fleet advisor started"
        );
    }

    /// Log advisor shutdown
    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "advisor_shutdown",
            instance = %self.instance,
            reason = %reason,
            "Fleet advisor shutting down"
        );
    }
}
