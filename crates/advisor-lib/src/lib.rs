//! Fleet advisor library for compute cost optimization
//!
//! This crate provides the core functionality for:
//! - Two-dimensional bin packing of workloads onto node shapes
//! - Interruption-risk tracking per zone and instance type
//! - Policy guardrails on churn, spend and instance families
//! - The two-phase fleet optimizer
//! - Periodic fleet scans, health checks and observability

pub mod error;
pub mod health;
pub mod inventory;
pub mod models;
pub mod observability;
pub mod optimizer;
pub mod packing;
pub mod policy;
pub mod risk;
pub mod scan;

pub use error::{ConfigError, OptimizeError};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use inventory::{build_request, ComputeResource, SkuOffer};
pub use models::*;
pub use observability::{AdvisorMetrics, StructuredLogger};
pub use optimizer::Optimizer;
pub use packing::{Bin, Dimensions, Item, NodeTemplate, Packer, Packing};
pub use policy::{PolicyConfig, PolicyValidator, SafetyViolation};
pub use risk::{RiskConfig, RiskEngine, RiskEntry};
