//! Periodic fleet scans
//!
//! This module provides:
//! - The `FleetSource` seam for loading inventory and priced SKUs
//! - A JSON file-backed source
//! - The scan loop that turns each load into a recommendation
//! - The risk decay ticker

mod decay;
mod file_source;
mod r#loop;

pub use decay::{DecayTicker, DEFAULT_DECAY_INTERVAL};
pub use file_source::JsonFileSource;
pub use r#loop::{
    ScanConfig, ScanLoop, ScanLoopBuilder, ScanReport, SharedReport, DEFAULT_SCAN_INTERVAL,
};

use crate::inventory::{build_request, ComputeResource, SkuOffer};
use crate::models::OptimizationRequest;
use anyhow::Result;
use async_trait::async_trait;

/// Where a scan gets its inputs from
#[async_trait]
pub trait FleetSource: Send + Sync {
    /// Compute resources currently running
    async fn load_inventory(&self) -> Result<Vec<ComputeResource>>;

    /// Purchasable SKUs with monthly prices
    async fn load_offers(&self) -> Result<Vec<SkuOffer>>;
}

/// Load both lists and convert them into an optimization request
pub async fn load_request(source: &dyn FleetSource) -> Result<OptimizationRequest> {
    let resources = source.load_inventory().await?;
    let offers = source.load_offers().await?;
    Ok(build_request(&resources, &offers))
}
