//! Policy commands

use advisor_lib::{PolicyConfig, PolicyValidator};
use anyhow::{Context, Result};
use serde_json::json;

use crate::output::{print_json, print_success, OutputFormat};

/// Check a proposal against the configured policy; a violation is an error
pub fn check(
    policy: PolicyConfig,
    churn_percent: f64,
    instance_type: &str,
    total_cost: f64,
    format: OutputFormat,
) -> Result<()> {
    let validator = PolicyValidator::new(policy);
    let outcome = validator.validate_proposal(churn_percent, instance_type, total_cost);

    if let OutputFormat::Json = format {
        print_json(&json!({
            "allowed": outcome.is_ok(),
            "violation": outcome.as_ref().err(),
        }))?;
    }

    outcome.context("Proposal rejected by policy")?;

    if let OutputFormat::Table = format {
        print_success(&format!(
            "Proposal allowed: {} at {:.1}% churn, ${:.2}/month",
            instance_type, churn_percent, total_cost
        ));
    }

    Ok(())
}
