//! HTTP API for health checks, Prometheus metrics and the advisor endpoints

use advisor_lib::{
    health::{components, ComponentStatus, HealthRegistry},
    observability::{AdvisorMetrics, StructuredLogger},
    scan::SharedReport,
    AllocationPlan, OptimizationRequest, Optimizer, RiskEntry, SafetyViolation,
};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub health_registry: HealthRegistry,
    pub metrics: AdvisorMetrics,
    pub logger: StructuredLogger,
    pub optimizer: Arc<Optimizer>,
    pub latest_report: SharedReport,
}

impl AppState {
    pub fn new(
        health_registry: HealthRegistry,
        metrics: AdvisorMetrics,
        logger: StructuredLogger,
        optimizer: Arc<Optimizer>,
        latest_report: SharedReport,
    ) -> Self {
        Self {
            health_registry,
            metrics,
            logger,
            optimizer,
            latest_report,
        }
    }
}

/// Error body for non-2xx advisor responses
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

/// Interruption report body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterruptionRequest {
    pub zone: String,
    pub instance_type: String,
}

/// Score after recording an interruption
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterruptionResponse {
    pub key: String,
    pub score: f64,
}

/// Proposal to check against policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyCheckRequest {
    pub churn_percent: f64,
    pub instance_type: String,
    pub total_cost: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyCheckResponse {
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub violation: Option<SafetyViolation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Health check response - returns 200 if healthy, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy => StatusCode::OK,
        ComponentStatus::Degraded => StatusCode::OK, // Still operational
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> Response {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!(error = %e, "Failed to encode metrics");
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string());
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
        .into_response()
}

/// Solve an ad-hoc request; 422 when no plan satisfies the constraints
async fn optimize(
    State(state): State<Arc<AppState>>,
    Json(request): Json<OptimizationRequest>,
) -> Response {
    let optimizer = Arc::clone(&state.optimizer);
    let (workloads, catalog) = (request.workloads.len(), request.catalog.len());

    let start = Instant::now();
    let solved = tokio::task::spawn_blocking(move || optimizer.solve(&request)).await;
    state
        .metrics
        .observe_optimization_latency(start.elapsed().as_secs_f64());

    let outcome = match solved {
        Ok(outcome) => outcome,
        Err(e) => {
            error!(error = %e, "Optimization task failed");
            state
                .health_registry
                .set_unhealthy(components::OPTIMIZER, e.to_string())
                .await;
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "optimization failed");
        }
    };
    // Infeasible requests do not degrade the optimizer
    state
        .health_registry
        .set_healthy(components::OPTIMIZER)
        .await;

    match outcome {
        Ok(plan) => {
            state.metrics.record_plan(&plan);
            state.logger.log_plan("api", &plan);
            (StatusCode::OK, Json::<AllocationPlan>(plan)).into_response()
        }
        Err(e) => {
            state.metrics.inc_infeasible();
            state
                .logger
                .log_infeasible("api", workloads, catalog, &e.to_string());
            error_response(StatusCode::UNPROCESSABLE_ENTITY, e.to_string())
        }
    }
}

/// Latest scan report
async fn latest_plan(State(state): State<Arc<AppState>>) -> Response {
    match state.latest_report.read().await.clone() {
        Some(report) => (StatusCode::OK, Json(report)).into_response(),
        None => error_response(StatusCode::NOT_FOUND, "no scan has completed yet"),
    }
}

async fn risk_snapshot(State(state): State<Arc<AppState>>) -> Json<Vec<RiskEntry>> {
    Json(state.optimizer.risk().snapshot())
}

async fn record_interruption(
    State(state): State<Arc<AppState>>,
    Json(body): Json<InterruptionRequest>,
) -> Response {
    if body.zone.is_empty() || body.instance_type.is_empty() {
        return error_response(
            StatusCode::BAD_REQUEST,
            "zone and instance_type must be non-empty",
        );
    }

    let risk = state.optimizer.risk();
    let score = risk.record_interruption(&body.zone, &body.instance_type);
    state.metrics.inc_interruptions();
    state.metrics.set_risk_tracked_pairs(risk.len() as i64);
    state
        .logger
        .log_interruption(&body.zone, &body.instance_type, score);

    Json(InterruptionResponse {
        key: advisor_lib::RiskEngine::key(&body.zone, &body.instance_type),
        score,
    })
    .into_response()
}

async fn validate_policy(
    State(state): State<Arc<AppState>>,
    Json(body): Json<PolicyCheckRequest>,
) -> Json<PolicyCheckResponse> {
    let outcome = state.optimizer.policy().validate_proposal(
        body.churn_percent,
        &body.instance_type,
        body.total_cost,
    );

    Json(match outcome {
        Ok(()) => PolicyCheckResponse {
            allowed: true,
            violation: None,
            message: None,
        },
        Err(violation) => PolicyCheckResponse {
            allowed: false,
            violation: Some(violation),
            message: Some(violation.to_string()),
        },
    })
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .route("/api/v1/optimize", post(optimize))
        .route("/api/v1/plan", get(latest_plan))
        .route("/api/v1/risk", get(risk_snapshot))
        .route("/api/v1/risk/interruptions", post(record_interruption))
        .route("/api/v1/policy/validate", post(validate_policy))
        .with_state(state)
}

/// Start the API server
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
