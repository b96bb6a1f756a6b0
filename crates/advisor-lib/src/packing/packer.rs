//! Two-dimensional Best-Fit-Decreasing bin packing
//!
//! Items are ordered by area (`cpu * ram`) descending, ties kept in input
//! order. Each item goes into the open bin that leaves the least residual
//! space; when none fits a fresh bin is requested from the factory. Items
//! that do not fit an empty bin are dropped and reported in
//! [`Packing::unplaced`].

use super::{Bin, Dimensions, Item};
use tracing::debug;

/// Result of a packing run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Packing {
    /// Bins in creation order
    pub bins: Vec<Bin>,
    /// Ids of items larger than a freshly created bin
    pub unplaced: Vec<String>,
}

impl Packing {
    /// Number of items placed across all bins
    pub fn placed_count(&self) -> usize {
        self.bins.iter().map(Bin::len).sum()
    }
}

/// Describes the node shape handed out by a bin factory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeTemplate {
    pub name: String,
    pub capacity: Dimensions,
}

impl NodeTemplate {
    pub fn new(name: impl Into<String>, capacity: Dimensions) -> Self {
        Self {
            name: name.into(),
            capacity,
        }
    }

    /// Factory producing sequentially numbered empty bins (`<name>-0`, `<name>-1`, ...)
    pub fn factory(&self) -> impl FnMut() -> Bin + '_ {
        let mut next = 0usize;
        move || {
            let bin = Bin::new(format!("{}-{}", self.name, next), self.capacity);
            next += 1;
            bin
        }
    }
}

/// Stateless Best-Fit-Decreasing packer
#[derive(Debug, Clone, Copy, Default)]
pub struct Packer;

impl Packer {
    pub fn new() -> Self {
        Self
    }

    /// Pack items into bins produced by `factory`.
    ///
    /// Oversized items are silently left out; use [`Packer::pack_detailed`]
    /// to find out which.
    pub fn pack<F>(&self, items: &[Item], factory: F) -> Vec<Bin>
    where
        F: FnMut() -> Bin,
    {
        self.pack_detailed(items, factory).bins
    }

    /// Pack items and report the ones that could not be placed
    pub fn pack_detailed<F>(&self, items: &[Item], mut factory: F) -> Packing
    where
        F: FnMut() -> Bin,
    {
        let mut ordered: Vec<&Item> = items.iter().collect();
        // Stable: equal areas keep input order
        ordered.sort_by(|a, b| b.dimensions.area().cmp(&a.dimensions.area()));

        let mut packing = Packing::default();

        for item in ordered {
            if let Some(idx) = best_fit(&packing.bins, item) {
                packing.bins[idx].try_add(item.clone());
                continue;
            }

            let mut bin = factory();
            if bin.try_add(item.clone()) {
                packing.bins.push(bin);
            } else {
                debug!(
                    item = %item.id,
                    cpu = item.dimensions.cpu,
                    ram = item.dimensions.ram,
                    bin_cpu = bin.capacity.cpu,
                    bin_ram = bin.capacity.ram,
                    "Item exceeds bin capacity, dropping"
                );
                packing.unplaced.push(item.id.clone());
            }
        }

        packing
    }
}

/// Index of the open bin with the smallest residual space after admitting
/// `item`. Ties go to the earliest-created bin.
fn best_fit(bins: &[Bin], item: &Item) -> Option<usize> {
    let mut best: Option<(usize, u64)> = None;
    for (idx, bin) in bins.iter().enumerate() {
        let Some(residual) = bin.residual_after(item) else {
            continue;
        };
        match best {
            Some((_, current)) if residual >= current => {}
            _ => best = Some((idx, residual)),
        }
    }
    best.map(|(idx, _)| idx)
}
