//! Core data models for the fleet optimizer

use crate::packing::{Bin, Dimensions, Item};
use serde::{Deserialize, Serialize};

/// Hours in a billing month
pub const HOURS_PER_MONTH: f64 = 730.0;

/// A purchasable compute SKU
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceType {
    pub name: String,
    /// Capacity in millicores
    pub cpu: u64,
    /// Capacity in MiB
    pub ram: u64,
    pub hourly_cost: f64,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub zone: String,
}

impl InstanceType {
    pub fn capacity(&self) -> Dimensions {
        Dimensions::new(self.cpu, self.ram)
    }

    pub fn monthly_cost(&self) -> f64 {
        self.hourly_cost * HOURS_PER_MONTH
    }

    /// Hourly cost per unit of capacity, counting `cpu + ram / 1000`. Lower is better.
    pub fn cost_efficiency(&self) -> f64 {
        self.hourly_cost / (self.cpu as f64 + self.ram as f64 / 1000.0)
    }
}

/// Input to a single optimization run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OptimizationRequest {
    pub workloads: Vec<Item>,
    pub catalog: Vec<InstanceType>,
    /// Current monthly spend of the fleet being replaced
    #[serde(default)]
    pub current_spend: f64,
}

/// How a plan's fleet is composed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStrategy {
    /// Every node is the same instance type
    Homogeneous,
    /// A main pool of one type plus a single remainder node of another
    Heterogeneous,
}

impl std::fmt::Display for PlanStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlanStrategy::Homogeneous => write!(f, "homogeneous"),
            PlanStrategy::Heterogeneous => write!(f, "heterogeneous"),
        }
    }
}

/// Proposed fleet produced by the optimizer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationPlan {
    pub nodes: Vec<Bin>,
    /// Monthly cost of the proposed fleet
    pub total_cost: f64,
    /// `current_spend - total_cost`; negative when the plan costs more
    pub savings: f64,
    pub risk_score: f64,
    pub instructions: Vec<String>,
    pub strategy: PlanStrategy,
    /// Workloads too large for the chosen node shape
    #[serde(default)]
    pub unplaced: Vec<String>,
}

impl AllocationPlan {
    pub fn hourly_cost(&self) -> f64 {
        self.total_cost / HOURS_PER_MONTH
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn placed_count(&self) -> usize {
        self.nodes.iter().map(Bin::len).sum()
    }

    /// Mean node efficiency across the fleet
    pub fn mean_efficiency(&self) -> f64 {
        if self.nodes.is_empty() {
            return 0.0;
        }
        self.nodes.iter().map(Bin::efficiency).sum::<f64>() / self.nodes.len() as f64
    }
}
