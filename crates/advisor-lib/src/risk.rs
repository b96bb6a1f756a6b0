//! Interruption-risk oracle
//!
//! Tracks an exponentially decaying risk score per (zone, instance type).
//! An interruption sets the score to a fixed penalty; each `decay()` tick
//! multiplies every tracked score by the decay factor, floored at the
//! baseline. Keys are never removed.

use crate::error::ConfigError;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Default baseline risk for untracked pairs
pub const DEFAULT_BASELINE_RISK: f64 = 0.05;

/// Default per-tick decay multiplier
pub const DEFAULT_DECAY_FACTOR: f64 = 0.95;

/// Default score assigned on interruption
pub const DEFAULT_INTERRUPTION_PENALTY: f64 = 1.0;

/// Risk model parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    pub baseline_risk: f64,
    /// Must be strictly between 0 and 1 for scores to converge
    pub decay_factor: f64,
    pub interruption_penalty: f64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            baseline_risk: DEFAULT_BASELINE_RISK,
            decay_factor: DEFAULT_DECAY_FACTOR,
            interruption_penalty: DEFAULT_INTERRUPTION_PENALTY,
        }
    }
}

impl RiskConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.decay_factor > 0.0 && self.decay_factor < 1.0) {
            return Err(ConfigError::DecayFactorOutOfRange(self.decay_factor));
        }
        if !(0.0..=1.0).contains(&self.baseline_risk) {
            return Err(ConfigError::BaselineRiskOutOfRange(self.baseline_risk));
        }
        if !(self.baseline_risk..=1.0).contains(&self.interruption_penalty) {
            return Err(ConfigError::PenaltyOutOfRange {
                penalty: self.interruption_penalty,
                baseline: self.baseline_risk,
            });
        }
        Ok(())
    }
}

/// Tracked state for one (zone, instance type) pair
#[derive(Debug, Clone, Copy)]
struct RiskState {
    score: f64,
    last_interruption_at: i64,
}

/// Point-in-time view of a tracked pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskEntry {
    pub zone: String,
    pub instance_type: String,
    pub score: f64,
    /// Unix timestamp of the most recent interruption
    pub last_interruption_at: i64,
}

/// Concurrent interruption-risk store
///
/// Every operation locks only the shard(s) it touches, so queries from
/// concurrent `solve` calls may or may not observe an update landing at the
/// same time.
#[derive(Debug)]
pub struct RiskEngine {
    config: RiskConfig,
    scores: DashMap<(String, String), RiskState>,
}

impl RiskEngine {
    /// Create an engine after validating its parameters
    pub fn new(config: RiskConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            scores: DashMap::new(),
        })
    }

    pub fn config(&self) -> &RiskConfig {
        &self.config
    }

    /// Composite key as rendered in logs and the API
    pub fn key(zone: &str, instance_type: &str) -> String {
        format!("{}:{}", zone, instance_type)
    }

    /// Jump the pair's score to the interruption penalty, overwriting any prior score
    pub fn record_interruption(&self, zone: &str, instance_type: &str) -> f64 {
        let penalty = self.config.interruption_penalty;
        self.scores.insert(
            (zone.to_string(), instance_type.to_string()),
            RiskState {
                score: penalty,
                last_interruption_at: chrono::Utc::now().timestamp(),
            },
        );
        info!(
            zone = %zone,
            instance_type = %instance_type,
            score = penalty,
            "Recorded interruption"
        );
        penalty
    }

    /// Decay every tracked score toward the baseline
    pub fn decay(&self) {
        let factor = self.config.decay_factor;
        let floor = self.config.baseline_risk;
        for mut entry in self.scores.iter_mut() {
            let state = entry.value_mut();
            state.score = (state.score * factor).max(floor);
        }
        debug!(tracked = self.scores.len(), factor, "Decayed risk scores");
    }

    /// Current score, or the baseline for pairs never interrupted
    pub fn get_risk(&self, zone: &str, instance_type: &str) -> f64 {
        self.scores
            .get(&(zone.to_string(), instance_type.to_string()))
            .map(|state| state.score)
            .unwrap_or(self.config.baseline_risk)
    }

    /// All tracked pairs, sorted by key
    pub fn snapshot(&self) -> Vec<RiskEntry> {
        let mut entries: Vec<RiskEntry> = self
            .scores
            .iter()
            .map(|r| {
                let (zone, instance_type) = r.key();
                RiskEntry {
                    zone: zone.clone(),
                    instance_type: instance_type.clone(),
                    score: r.value().score,
                    last_interruption_at: r.value().last_interruption_at,
                }
            })
            .collect();
        entries.sort_by(|a, b| {
            (a.zone.as_str(), a.instance_type.as_str())
                .cmp(&(b.zone.as_str(), b.instance_type.as_str()))
        });
        entries
    }

    /// Number of tracked pairs
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn engine() -> RiskEngine {
        RiskEngine::new(RiskConfig::default()).unwrap()
    }

    #[test]
    fn test_untracked_pair_returns_baseline() {
        let risk = engine();
        assert_eq!(risk.get_risk("us-east-1a", "m5.large"), DEFAULT_BASELINE_RISK);
        assert!(risk.is_empty());
    }

    #[test]
    fn test_interruption_overwrites_score() {
        let config = RiskConfig {
            interruption_penalty: 0.8,
            ..RiskConfig::default()
        };
        let risk = RiskEngine::new(config).unwrap();

        risk.record_interruption("us-east-1a", "m5.large");
        risk.decay();
        risk.record_interruption("us-east-1a", "m5.large");

        // Flat jump, not additive
        assert_eq!(risk.get_risk("us-east-1a", "m5.large"), 0.8);
        assert_eq!(risk.get_risk("us-east-1b", "m5.large"), DEFAULT_BASELINE_RISK);
    }

    #[test]
    fn test_decay_is_multiplicative() {
        let risk = engine();
        risk.record_interruption("z", "c5.xlarge");

        risk.decay();
        assert!((risk.get_risk("z", "c5.xlarge") - 0.95).abs() < 1e-12);

        risk.decay();
        assert!((risk.get_risk("z", "c5.xlarge") - 0.9025).abs() < 1e-12);
    }

    #[test]
    fn test_decay_converges_to_baseline() {
        let risk = engine();
        risk.record_interruption("z", "t3.micro");

        let mut previous = risk.get_risk("z", "t3.micro");
        for _ in 0..500 {
            risk.decay();
            let current = risk.get_risk("z", "t3.micro");
            assert!(current <= previous);
            assert!(current >= DEFAULT_BASELINE_RISK);
            previous = current;
        }
        assert_eq!(previous, DEFAULT_BASELINE_RISK);
    }

    #[test]
    fn test_decay_crosses_cutoff_after_enough_ticks() {
        let risk = engine();
        risk.record_interruption("z", "r5.large");

        // 0.95^13 ≈ 0.513, 0.95^14 ≈ 0.488
        for _ in 0..13 {
            risk.decay();
        }
        assert!(risk.get_risk("z", "r5.large") > 0.5);
        risk.decay();
        assert!(risk.get_risk("z", "r5.large") < 0.5);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let bad_decay = RiskConfig {
            decay_factor: 1.0,
            ..RiskConfig::default()
        };
        assert_eq!(
            RiskEngine::new(bad_decay).unwrap_err(),
            ConfigError::DecayFactorOutOfRange(1.0)
        );

        let bad_baseline = RiskConfig {
            baseline_risk: -0.1,
            ..RiskConfig::default()
        };
        assert!(bad_baseline.validate().is_err());

        let bad_penalty = RiskConfig {
            baseline_risk: 0.3,
            interruption_penalty: 0.2,
            ..RiskConfig::default()
        };
        assert!(matches!(
            bad_penalty.validate(),
            Err(ConfigError::PenaltyOutOfRange { .. })
        ));
    }

    #[test]
    fn test_snapshot_sorted() {
        let risk = engine();
        risk.record_interruption("zone-b", "m5.large");
        risk.record_interruption("zone-a", "t3.small");
        risk.record_interruption("zone-a", "c5.large");

        let snapshot = risk.snapshot();
        let keys: Vec<String> = snapshot
            .iter()
            .map(|e| RiskEngine::key(&e.zone, &e.instance_type))
            .collect();
        assert_eq!(keys, vec!["zone-a:c5.large", "zone-a:t3.small", "zone-b:m5.large"]);
        assert!(snapshot.iter().all(|e| e.last_interruption_at > 0));
    }

    #[test]
    fn test_concurrent_updates_and_reads() {
        let risk = Arc::new(engine());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let risk = Arc::clone(&risk);
                std::thread::spawn(move || {
                    for i in 0..200 {
                        let zone = format!("zone-{}", i % 4);
                        match t % 3 {
                            0 => {
                                risk.record_interruption(&zone, "m5.large");
                            }
                            1 => risk.decay(),
                            _ => {
                                let score = risk.get_risk(&zone, "m5.large");
                                assert!((DEFAULT_BASELINE_RISK..=1.0).contains(&score));
                            }
                        }
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(risk.len(), 4);
    }
}
