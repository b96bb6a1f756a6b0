//! Error types for the optimization engine

use thiserror::Error;

/// Failure of a single `solve` call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OptimizeError {
    /// No candidate survived policy and risk filtering and the
    /// heterogeneous pass produced nothing either
    #[error("no feasible plan found satisfying all constraints")]
    InfeasiblePlan,
}

/// Invalid engine configuration
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("decay_factor must be in (0, 1), got {0}")]
    DecayFactorOutOfRange(f64),

    #[error("baseline_risk must be in [0, 1], got {0}")]
    BaselineRiskOutOfRange(f64),

    #[error("interruption_penalty must be in [baseline_risk, 1] = [{baseline}, 1], got {penalty}")]
    PenaltyOutOfRange { penalty: f64, baseline: f64 },

    #[error("{field} must be non-negative, got {value}")]
    NegativeLimit { field: &'static str, value: f64 },
}
