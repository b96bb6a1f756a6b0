//! Safety policy gate for proposed fleet changes
//!
//! Checks run in a fixed order (churn, spend, instance family) and stop at
//! the first violation.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default maximum share of existing infrastructure a plan may change
pub const DEFAULT_MAX_CHURN_PERCENT: f64 = 20.0;

/// Default monthly spend ceiling
pub const DEFAULT_MAX_SPEND_LIMIT: f64 = 10_000.0;

/// Default instance-family whitelist
pub const DEFAULT_ALLOWED_FAMILIES: &[&str] = &["t3", "m5", "m6g", "c5", "c6g", "r5", "r6g"];

/// Hard safety limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    pub max_churn_percent: f64,
    pub max_spend_limit: f64,
    /// Case-sensitive prefixes an instance type name must start with
    pub allowed_families: Vec<String>,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            max_churn_percent: DEFAULT_MAX_CHURN_PERCENT,
            max_spend_limit: DEFAULT_MAX_SPEND_LIMIT,
            allowed_families: DEFAULT_ALLOWED_FAMILIES
                .iter()
                .map(|f| f.to_string())
                .collect(),
        }
    }
}

impl PolicyConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_churn_percent < 0.0 {
            return Err(ConfigError::NegativeLimit {
                field: "max_churn_percent",
                value: self.max_churn_percent,
            });
        }
        if self.max_spend_limit < 0.0 {
            return Err(ConfigError::NegativeLimit {
                field: "max_spend_limit",
                value: self.max_spend_limit,
            });
        }
        Ok(())
    }
}

/// Reason a proposal was refused
#[derive(Debug, Clone, Copy, PartialEq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SafetyViolation {
    #[error("churn exceeds limit ({churn_percent}% > {limit}%)")]
    ChurnExceedsLimit { churn_percent: f64, limit: f64 },

    #[error("spend exceeds limit ({total_cost} > {limit})")]
    SpendExceedsLimit { total_cost: f64, limit: f64 },

    #[error("instance family not allowed")]
    FamilyNotAllowed,
}

/// Validates proposals against an immutable [`PolicyConfig`]
#[derive(Debug, Clone)]
pub struct PolicyValidator {
    config: PolicyConfig,
}

impl PolicyValidator {
    pub fn new(config: PolicyConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    /// Check a proposed action, reporting only the first violated constraint
    pub fn validate_proposal(
        &self,
        churn_percent: f64,
        target_instance_type: &str,
        total_cost: f64,
    ) -> Result<(), SafetyViolation> {
        if churn_percent > self.config.max_churn_percent {
            return Err(SafetyViolation::ChurnExceedsLimit {
                churn_percent,
                limit: self.config.max_churn_percent,
            });
        }

        if total_cost > self.config.max_spend_limit {
            return Err(SafetyViolation::SpendExceedsLimit {
                total_cost,
                limit: self.config.max_spend_limit,
            });
        }

        if !self.family_allowed(target_instance_type) {
            return Err(SafetyViolation::FamilyNotAllowed);
        }

        Ok(())
    }

    /// True if the instance type starts with a whitelisted family prefix
    pub fn family_allowed(&self, instance_type: &str) -> bool {
        self.config
            .allowed_families
            .iter()
            .any(|family| instance_type.starts_with(family.as_str()))
    }
}

impl Default for PolicyValidator {
    fn default() -> Self {
        Self::new(PolicyConfig::default())
    }
}
