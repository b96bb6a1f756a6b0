//! Fleet optimizer
//!
//! Runs two searches over the instance catalog and returns the cheaper result:
//!
//! 1. **Homogeneous sweep** - for every catalog entry that passes the family
//!    whitelist and the risk cutoff, pack the whole workload set onto nodes of
//!    that type and keep the cheapest fleet.
//! 2. **Heterogeneous refinement** - pack onto the most cost-efficient type
//!    (the workhorse); if the last node is poorly utilized, move its contents
//!    to the cheapest single node that can hold them.
//!
//! The refinement pass ranks candidates by cost only and does not consult
//! policy or risk.

use crate::error::OptimizeError;
use crate::models::{AllocationPlan, InstanceType, OptimizationRequest, PlanStrategy, HOURS_PER_MONTH};
use crate::packing::{Bin, Dimensions, NodeTemplate, Packer};
use crate::policy::PolicyValidator;
use crate::risk::RiskEngine;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Candidates with a risk score above this are skipped in the homogeneous sweep
pub const RISK_CUTOFF: f64 = 0.5;

/// A last node below this efficiency is treated as dust
pub const DUST_EFFICIENCY_THRESHOLD: f64 = 0.4;

/// Risk reported for a main-pool-plus-dust plan
pub const HETEROGENEOUS_RISK_SCORE: f64 = 0.1;

/// Node name prefix for the heterogeneous main pool
const MAIN_POOL: &str = "pool-main";

/// Node name prefix for the heterogeneous remainder node
const DUST_POOL: &str = "pool-dust";

/// Cost-minimizing fleet planner
pub struct Optimizer {
    risk: Arc<RiskEngine>,
    policy: PolicyValidator,
    packer: Packer,
}

impl Optimizer {
    pub fn new(risk: Arc<RiskEngine>, policy: PolicyValidator, packer: Packer) -> Self {
        Self {
            risk,
            policy,
            packer,
        }
    }

    pub fn risk(&self) -> &Arc<RiskEngine> {
        &self.risk
    }

    pub fn policy(&self) -> &PolicyValidator {
        &self.policy
    }

    /// Find the cheapest feasible plan for the request
    pub fn solve(&self, request: &OptimizationRequest) -> Result<AllocationPlan, OptimizeError> {
        let homogeneous = self.homogeneous_sweep(request);
        let heterogeneous = self.heterogeneous_refinement(request);

        let plan = match (homogeneous, heterogeneous) {
            (Some(a), Some(b)) => {
                if b.total_cost < a.total_cost {
                    b
                } else {
                    a
                }
            }
            (Some(a), None) => a,
            (None, Some(b)) => b,
            (None, None) => {
                warn!(
                    workloads = request.workloads.len(),
                    catalog = request.catalog.len(),
                    "No feasible plan"
                );
                return Err(OptimizeError::InfeasiblePlan);
            }
        };

        info!(
            strategy = %plan.strategy,
            nodes = plan.node_count(),
            total_cost = plan.total_cost,
            savings = plan.savings,
            risk_score = plan.risk_score,
            unplaced = plan.unplaced.len(),
            "Selected allocation plan"
        );

        Ok(plan)
    }

    /// Cheapest single-type fleet among candidates passing policy and risk
    fn homogeneous_sweep(&self, request: &OptimizationRequest) -> Option<AllocationPlan> {
        let mut best: Option<AllocationPlan> = None;

        for candidate in &request.catalog {
            // Only the family whitelist is meaningful with zero churn and cost
            if let Err(violation) = self.policy.validate_proposal(0.0, &candidate.name, 0.0) {
                debug!(
                    instance_type = %candidate.name,
                    reason = %violation,
                    "Candidate rejected by policy"
                );
                continue;
            }

            let risk = self.risk.get_risk(&candidate.zone, &candidate.name);
            if risk > RISK_CUTOFF {
                debug!(
                    instance_type = %candidate.name,
                    zone = %candidate.zone,
                    risk,
                    "Candidate rejected by risk cutoff"
                );
                continue;
            }

            let template = NodeTemplate::new(&candidate.name, candidate.capacity());
            let packing = self
                .packer
                .pack_detailed(&request.workloads, template.factory());
            let total_cost = packing.bins.len() as f64 * candidate.monthly_cost();

            debug!(
                instance_type = %candidate.name,
                nodes = packing.bins.len(),
                total_cost,
                "Evaluated homogeneous candidate"
            );

            if best.as_ref().map_or(true, |b| total_cost < b.total_cost) {
                let instruction = format!(
                    "migrate fleet to {}: {} nodes",
                    candidate.name,
                    packing.bins.len()
                );
                best = Some(AllocationPlan {
                    nodes: packing.bins,
                    total_cost,
                    savings: request.current_spend - total_cost,
                    risk_score: risk,
                    instructions: vec![instruction],
                    strategy: PlanStrategy::Homogeneous,
                    unplaced: packing.unplaced,
                });
            }
        }

        best
    }

    /// Workhorse pool, optionally with its tail moved onto a cheaper dust node
    fn heterogeneous_refinement(&self, request: &OptimizationRequest) -> Option<AllocationPlan> {
        if request.workloads.is_empty() {
            return None;
        }

        let workhorse = rank_by(&request.catalog, InstanceType::cost_efficiency)
            .into_iter()
            .next()?;

        let template = NodeTemplate::new(MAIN_POOL, workhorse.capacity());
        let mut packing = self
            .packer
            .pack_detailed(&request.workloads, template.factory());

        let last = packing.bins.last()?;
        let last_efficiency = last.efficiency();

        if last_efficiency < DUST_EFFICIENCY_THRESHOLD {
            let demand = last.used;
            match cheapest_covering(&request.catalog, &demand) {
                Some(dust_type) => {
                    if let Some(dust) = packing.bins.pop() {
                        let mut dust_node = Bin::new(format!("{}-0", DUST_POOL), dust_type.capacity());
                        for item in dust.items {
                            dust_node.try_add(item);
                        }

                        let main_count = packing.bins.len();
                        let total_cost =
                            main_count as f64 * workhorse.monthly_cost() + dust_type.monthly_cost();

                        debug!(
                            workhorse = %workhorse.name,
                            dust_type = %dust_type.name,
                            dust_cpu = demand.cpu,
                            dust_ram = demand.ram,
                            last_efficiency,
                            "Moved tail of workhorse pool to dust node"
                        );

                        let mut nodes = packing.bins;
                        nodes.push(dust_node);

                        return Some(AllocationPlan {
                            nodes,
                            total_cost,
                            savings: request.current_spend - total_cost,
                            risk_score: HETEROGENEOUS_RISK_SCORE,
                            instructions: vec![
                                format!("{}: {} nodes of type {}", MAIN_POOL, main_count, workhorse.name),
                                format!("{}: 1 node of type {}", DUST_POOL, dust_type.name),
                            ],
                            strategy: PlanStrategy::Heterogeneous,
                            unplaced: packing.unplaced,
                        });
                    }
                }
                None => {
                    debug!(
                        dust_cpu = demand.cpu,
                        dust_ram = demand.ram,
                        "No catalog entry covers dust demand"
                    );
                }
            }
        }

        let node_count = packing.bins.len();
        let total_cost = node_count as f64 * workhorse.monthly_cost();
        Some(AllocationPlan {
            nodes: packing.bins,
            total_cost,
            savings: request.current_spend - total_cost,
            risk_score: self.risk.get_risk(&workhorse.zone, &workhorse.name),
            instructions: vec![format!(
                "{}: {} nodes of type {}",
                MAIN_POOL, node_count, workhorse.name
            )],
            strategy: PlanStrategy::Homogeneous,
            unplaced: packing.unplaced,
        })
    }
}

/// Catalog entries sorted ascending by `key`; equal keys keep catalog order.
/// An undefined key (zero capacity at zero cost) ranks last.
fn rank_by<F>(catalog: &[InstanceType], key: F) -> Vec<&InstanceType>
where
    F: Fn(&InstanceType) -> f64,
{
    let rank = |t: &InstanceType| {
        let value = key(t);
        if value.is_nan() {
            f64::INFINITY
        } else {
            value
        }
    };
    let mut ranked: Vec<&InstanceType> = catalog.iter().collect();
    ranked.sort_by(|a, b| rank(a).total_cmp(&rank(b)));
    ranked
}

/// Cheapest catalog entry whose capacity covers `demand` on both axes
fn cheapest_covering<'a>(catalog: &'a [InstanceType], demand: &Dimensions) -> Option<&'a InstanceType> {
    rank_by(catalog, |t| t.hourly_cost)
        .into_iter()
        .find(|t| t.capacity().covers(demand))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packing::Item;
    use crate::policy::PolicyConfig;
    use crate::risk::RiskConfig;

    const ZONE: &str = "us-east-1a";

    fn instance(name: &str, cpu: u64, ram: u64, hourly: f64) -> InstanceType {
        InstanceType {
            name: name.to_string(),
            cpu,
            ram,
            hourly_cost: hourly,
            region: "us-east-1".to_string(),
            zone: ZONE.to_string(),
        }
    }

    fn workloads(count: usize, cpu: u64, ram: u64) -> Vec<Item> {
        (0..count).map(|i| Item::new(format!("w{i}"), cpu, ram)).collect()
    }

    fn optimizer_with(policy: PolicyConfig) -> Optimizer {
        let risk = Arc::new(RiskEngine::new(RiskConfig::default()).unwrap());
        Optimizer::new(risk, PolicyValidator::new(policy), Packer::new())
    }

    fn optimizer() -> Optimizer {
        optimizer_with(PolicyConfig::default())
    }

    fn allow(families: &[&str]) -> PolicyConfig {
        PolicyConfig {
            allowed_families: families.iter().map(|f| f.to_string()).collect(),
            ..PolicyConfig::default()
        }
    }

    fn small_large(large_hourly: f64) -> Vec<InstanceType> {
        vec![
            instance("small", 1000, 2048, 1.0),
            instance("large", 12000, 16384, large_hourly),
        ]
    }

    #[test]
    fn test_heterogeneous_win() {
        let request = OptimizationRequest {
            workloads: workloads(13, 1000, 1024),
            catalog: small_large(10.0),
            current_spend: 100.0,
        };

        let plan = optimizer().solve(&request).unwrap();

        assert!((plan.hourly_cost() - 11.0).abs() < 1e-9);
        assert_eq!(plan.node_count(), 2);
        assert_eq!(plan.strategy, PlanStrategy::Heterogeneous);
        assert_eq!(plan.risk_score, HETEROGENEOUS_RISK_SCORE);
        assert_eq!(
            plan.instructions,
            vec![
                "pool-main: 1 nodes of type large".to_string(),
                "pool-dust: 1 node of type small".to_string(),
            ]
        );
        assert_eq!(plan.nodes[0].len(), 12);
        assert_eq!(plan.nodes[1].id, "pool-dust-0");
        assert_eq!(plan.nodes[1].capacity, Dimensions::new(1000, 2048));
        assert_eq!(plan.placed_count(), 13);
        assert!((plan.savings - (100.0 - plan.total_cost)).abs() < 1e-9);
    }

    #[test]
    fn test_heterogeneous_beats_whitelisted_homogeneous() {
        let request = OptimizationRequest {
            workloads: workloads(13, 1000, 1024),
            catalog: small_large(10.0),
            current_spend: 100.0,
        };

        // Phase A would pick 13 x small at $13/h
        let plan = optimizer_with(allow(&["small", "large"])).solve(&request).unwrap();

        assert_eq!(plan.strategy, PlanStrategy::Heterogeneous);
        assert!((plan.hourly_cost() - 11.0).abs() < 1e-9);
    }

    #[test]
    fn test_homogeneous_fallback() {
        let request = OptimizationRequest {
            workloads: workloads(10, 1000, 1024),
            catalog: small_large(9.0),
            current_spend: 100.0,
        };

        for policy in [PolicyConfig::default(), allow(&["small", "large"])] {
            let plan = optimizer_with(policy).solve(&request).unwrap();

            assert!((plan.hourly_cost() - 9.0).abs() < 1e-9);
            assert_eq!(plan.node_count(), 1);
            assert_eq!(plan.strategy, PlanStrategy::Homogeneous);
            assert_eq!(plan.placed_count(), 10);
        }
    }

    #[test]
    fn test_efficient_tail_keeps_workhorse_plan() {
        let request = OptimizationRequest {
            workloads: workloads(10, 1000, 1024),
            catalog: small_large(9.0),
            current_spend: 0.0,
        };

        let plan = optimizer().heterogeneous_refinement(&request).unwrap();

        assert_eq!(plan.strategy, PlanStrategy::Homogeneous);
        assert_eq!(plan.instructions, vec!["pool-main: 1 nodes of type large".to_string()]);
        assert_eq!(plan.risk_score, RiskConfig::default().baseline_risk);
    }

    #[test]
    fn test_infeasible_on_empty_catalog() {
        let request = OptimizationRequest {
            workloads: workloads(3, 1000, 1024),
            catalog: Vec::new(),
            current_spend: 50.0,
        };

        assert_eq!(optimizer().solve(&request), Err(OptimizeError::InfeasiblePlan));
    }

    #[test]
    fn test_infeasible_message() {
        assert_eq!(
            OptimizeError::InfeasiblePlan.to_string(),
            "no feasible plan found satisfying all constraints"
        );
    }

    #[test]
    fn test_risky_candidate_excluded_from_sweep() {
        let request = OptimizationRequest {
            workloads: workloads(4, 1000, 1024),
            catalog: vec![
                instance("m5.large", 2000, 8192, 0.1),
                instance("c5.xlarge", 4000, 8192, 0.5),
            ],
            current_spend: 0.0,
        };
        let optimizer = optimizer();

        let before = optimizer.homogeneous_sweep(&request).unwrap();
        assert!(before.nodes.iter().all(|n| n.id.starts_with("m5.large")));

        optimizer.risk().record_interruption(ZONE, "m5.large");

        let after = optimizer.homogeneous_sweep(&request).unwrap();
        assert!(after.nodes.iter().all(|n| n.id.starts_with("c5.xlarge")));
        assert_eq!(after.instructions, vec!["migrate fleet to c5.xlarge: 1 nodes".to_string()]);
        assert_eq!(after.risk_score, RiskConfig::default().baseline_risk);
    }

    #[test]
    fn test_risk_is_per_zone() {
        let mut other_zone = instance("m5.large", 2000, 8192, 0.1);
        other_zone.zone = "us-east-1b".to_string();
        let request = OptimizationRequest {
            workloads: workloads(2, 1000, 1024),
            catalog: vec![other_zone],
            current_spend: 0.0,
        };
        let optimizer = optimizer();
        optimizer.risk().record_interruption(ZONE, "m5.large");

        assert!(optimizer.homogeneous_sweep(&request).is_some());
    }

    #[test]
    fn test_policy_filters_sweep() {
        let request = OptimizationRequest {
            workloads: workloads(2, 1000, 1024),
            catalog: vec![
                instance("x1.cheap", 4000, 8192, 0.01),
                instance("t3.large", 2000, 8192, 0.08),
            ],
            current_spend: 0.0,
        };

        let plan = optimizer().homogeneous_sweep(&request).unwrap();

        assert!(plan.nodes.iter().all(|n| n.id.starts_with("t3.large")));
        assert!((plan.total_cost - 0.08 * HOURS_PER_MONTH).abs() < 1e-9);
    }

    #[test]
    fn test_sweep_rejecting_everything_yields_none() {
        let request = OptimizationRequest {
            workloads: workloads(2, 1000, 1024),
            catalog: small_large(10.0),
            current_spend: 0.0,
        };

        assert!(optimizer().homogeneous_sweep(&request).is_none());
    }

    #[test]
    fn test_sweep_picks_cheapest_fleet() {
        let request = OptimizationRequest {
            workloads: workloads(8, 1000, 1024),
            catalog: vec![
                instance("m5.large", 2000, 8192, 0.096),   // 4 nodes
                instance("m5.xlarge", 4000, 16384, 0.192), // 2 nodes
                instance("m5.4xlarge", 16000, 65536, 0.9), // 1 node
            ],
            current_spend: 1000.0,
        };

        let plan = optimizer().homogeneous_sweep(&request).unwrap();

        // Equal cost between the first two: the earlier candidate is kept
        assert_eq!(plan.node_count(), 4);
        assert!(plan.nodes[0].id.starts_with("m5.large-"));
        assert!((plan.total_cost - 4.0 * 0.096 * HOURS_PER_MONTH).abs() < 1e-9);
    }

    #[test]
    fn test_dust_uses_cheapest_covering_type() {
        let request = OptimizationRequest {
            workloads: workloads(13, 1000, 1024),
            catalog: vec![
                instance("tiny", 500, 2048, 0.5),
                instance("small", 1000, 2048, 1.0),
                instance("large", 12000, 16384, 10.0),
            ],
            current_spend: 0.0,
        };

        let plan = optimizer().heterogeneous_refinement(&request).unwrap();

        assert_eq!(plan.strategy, PlanStrategy::Heterogeneous);
        assert_eq!(plan.instructions[1], "pool-dust: 1 node of type small");
        assert!((plan.total_cost - 11.0 * HOURS_PER_MONTH).abs() < 1e-9);
    }

    #[test]
    fn test_zero_capacity_entries_rank_last() {
        let mut catalog = Vec::new();
        for size in 1..=40u64 {
            catalog.push(instance(&format!("m5.s{size}"), size * 1000, size * 4096, size as f64 * 0.05));
            if size % 5 == 0 {
                catalog.push(instance(&format!("m5.zero{size}"), 0, 0, 0.0));
            }
        }
        let request = OptimizationRequest {
            workloads: workloads(6, 1000, 1024),
            catalog,
            current_spend: 100.0,
        };

        let ranked = rank_by(&request.catalog, InstanceType::cost_efficiency);
        assert!(ranked.iter().rev().take(8).all(|t| t.name.starts_with("m5.zero")));

        let optimizer = optimizer();
        let refined = optimizer.heterogeneous_refinement(&request).unwrap();
        assert!(!refined.instructions[0].contains("m5.zero"));
        assert!(refined.unplaced.is_empty());
        assert!(optimizer.solve(&request).is_ok());
    }

    #[test]
    fn test_single_sparse_node_moves_entirely_to_dust() {
        let request = OptimizationRequest {
            workloads: workloads(1, 1000, 1024),
            catalog: small_large(10.0),
            current_spend: 0.0,
        };

        let plan = optimizer().heterogeneous_refinement(&request).unwrap();

        assert_eq!(plan.node_count(), 1);
        assert_eq!(plan.instructions[0], "pool-main: 0 nodes of type large");
        assert!((plan.hourly_cost() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_oversized_workloads_reported() {
        let mut items = workloads(3, 1000, 1024);
        items.push(Item::new("giant", 64000, 1024));
        let request = OptimizationRequest {
            workloads: items,
            catalog: vec![instance("m5.xlarge", 4000, 16384, 0.192)],
            current_spend: 0.0,
        };

        let plan = optimizer().solve(&request).unwrap();

        assert_eq!(plan.unplaced, vec!["giant".to_string()]);
        assert_eq!(plan.placed_count(), 3);
    }

    #[test]
    fn test_empty_workloads_yield_empty_fleet() {
        let request = OptimizationRequest {
            workloads: Vec::new(),
            catalog: vec![instance("t3.small", 2000, 2048, 0.02)],
            current_spend: 30.0,
        };

        let optimizer = optimizer();
        assert!(optimizer.heterogeneous_refinement(&request).is_none());

        let plan = optimizer.solve(&request).unwrap();
        assert_eq!(plan.node_count(), 0);
        assert_eq!(plan.total_cost, 0.0);
        assert_eq!(plan.savings, 30.0);
    }

    #[test]
    fn test_solve_does_not_mutate_request() {
        let request = OptimizationRequest {
            workloads: workloads(13, 1000, 1024),
            catalog: small_large(10.0),
            current_spend: 100.0,
        };
        let before = request.clone();

        let first = optimizer().solve(&request).unwrap();
        let second = optimizer().solve(&request).unwrap();

        assert_eq!(request, before);
        assert_eq!(first, second);
    }

    #[test]
    fn test_capacity_invariant_holds_in_plans() {
        let items: Vec<Item> = (0..40)
            .map(|i| Item::new(format!("w{i}"), 250 + (i * 137) % 1900, 256 + (i * 331) % 7000))
            .collect();
        let request = OptimizationRequest {
            workloads: items,
            catalog: vec![
                instance("t3.medium", 2000, 4096, 0.0416),
                instance("m5.xlarge", 4000, 16384, 0.192),
                instance("r5.2xlarge", 8000, 65536, 0.504),
            ],
            current_spend: 2000.0,
        };

        let plan = optimizer().solve(&request).unwrap();

        for node in &plan.nodes {
            assert!(node.capacity.covers(&node.used));
        }
        assert_eq!(plan.placed_count() + plan.unplaced.len(), 40);
    }
}
