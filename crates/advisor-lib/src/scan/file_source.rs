//! Fleet source backed by JSON files on disk

use super::FleetSource;
use crate::inventory::{ComputeResource, SkuOffer};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Reads the inventory and catalog from two JSON array files
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    inventory_path: PathBuf,
    catalog_path: PathBuf,
}

impl JsonFileSource {
    pub fn new(inventory_path: impl Into<PathBuf>, catalog_path: impl Into<PathBuf>) -> Self {
        Self {
            inventory_path: inventory_path.into(),
            catalog_path: catalog_path.into(),
        }
    }

    pub fn inventory_path(&self) -> &Path {
        &self.inventory_path
    }

    pub fn catalog_path(&self) -> &Path {
        &self.catalog_path
    }
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

#[async_trait]
impl FleetSource for JsonFileSource {
    async fn load_inventory(&self) -> Result<Vec<ComputeResource>> {
        let resources: Vec<ComputeResource> = read_json(&self.inventory_path).await?;
        debug!(path = %self.inventory_path.display(), count = resources.len(), "Loaded inventory");
        Ok(resources)
    }

    async fn load_offers(&self) -> Result<Vec<SkuOffer>> {
        let offers: Vec<SkuOffer> = read_json(&self.catalog_path).await?;
        debug!(path = %self.catalog_path.display(), count = offers.len(), "Loaded catalog");
        Ok(offers)
    }
}
