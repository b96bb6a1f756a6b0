//! Conversion from discovered resources and priced SKUs to optimizer input
//!
//! Discovery reports each compute resource with fractional vCPUs and memory
//! in MiB; pricing reports monthly prices. The optimizer works in millicores,
//! MiB and hourly cost.

use crate::models::{InstanceType, OptimizationRequest, HOURS_PER_MONTH};
use crate::packing::{Dimensions, Item};
use serde::{Deserialize, Serialize};

/// A compute resource found by infrastructure discovery
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComputeResource {
    pub id: String,
    /// Resource kind as reported by discovery (e.g. "ec2_instance")
    #[serde(default)]
    pub kind: String,
    pub vcpu: f64,
    pub memory_mib: u64,
    /// What the resource currently costs per month
    #[serde(default)]
    pub monthly_cost: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

impl ComputeResource {
    /// One workload per resource: `cpu = vcpu * 1000`, `ram = memory_mib`
    pub fn to_item(&self) -> Item {
        Item {
            id: self.id.clone(),
            dimensions: Dimensions::new(vcpu_to_millicores(self.vcpu), self.memory_mib),
            group: self.group.clone(),
        }
    }
}

/// A purchasable SKU with its monthly price
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkuOffer {
    pub name: String,
    pub vcpu: f64,
    pub memory_mib: u64,
    pub monthly_price: f64,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub zone: String,
}

impl SkuOffer {
    pub fn to_instance_type(&self) -> InstanceType {
        InstanceType {
            name: self.name.clone(),
            cpu: vcpu_to_millicores(self.vcpu),
            ram: self.memory_mib,
            hourly_cost: self.monthly_price / HOURS_PER_MONTH,
            region: self.region.clone(),
            zone: self.zone.clone(),
        }
    }
}

/// Build an optimization request; current spend is the sum of resource costs
pub fn build_request(resources: &[ComputeResource], offers: &[SkuOffer]) -> OptimizationRequest {
    OptimizationRequest {
        workloads: resources.iter().map(ComputeResource::to_item).collect(),
        catalog: offers.iter().map(SkuOffer::to_instance_type).collect(),
        current_spend: resources.iter().map(|r| r.monthly_cost).sum(),
    }
}

fn vcpu_to_millicores(vcpu: f64) -> u64 {
    (vcpu.max(0.0) * 1000.0).round() as u64
}
