//! Packing vocabulary: resource vectors, workloads and candidate nodes

use serde::{Deserialize, Serialize};

/// Two-axis resource vector
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimensions {
    /// CPU in millicores
    pub cpu: u64,
    /// Memory in MiB
    pub ram: u64,
}

impl Dimensions {
    pub fn new(cpu: u64, ram: u64) -> Self {
        Self { cpu, ram }
    }

    /// True if `other` fits inside `self` on every axis
    pub fn covers(&self, other: &Dimensions) -> bool {
        self.cpu >= other.cpu && self.ram >= other.ram
    }

    /// Area heuristic used to order items for packing
    pub fn area(&self) -> u128 {
        self.cpu as u128 * self.ram as u128
    }

    pub fn saturating_sub(&self, other: &Dimensions) -> Dimensions {
        Dimensions {
            cpu: self.cpu.saturating_sub(other.cpu),
            ram: self.ram.saturating_sub(other.ram),
        }
    }
}

impl std::ops::Add for Dimensions {
    type Output = Dimensions;

    fn add(self, rhs: Dimensions) -> Dimensions {
        Dimensions {
            cpu: self.cpu + rhs.cpu,
            ram: self.ram + rhs.ram,
        }
    }
}

impl std::ops::AddAssign for Dimensions {
    fn add_assign(&mut self, rhs: Dimensions) {
        self.cpu += rhs.cpu;
        self.ram += rhs.ram;
    }
}

impl std::iter::Sum for Dimensions {
    fn sum<I: Iterator<Item = Dimensions>>(iter: I) -> Self {
        iter.fold(Dimensions::default(), |acc, d| acc + d)
    }
}

/// A deployable workload requiring a fixed amount of resources
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub dimensions: Dimensions,
    /// Co-location hint. Carried through packing but not used for placement.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

impl Item {
    pub fn new(id: impl Into<String>, cpu: u64, ram: u64) -> Self {
        Self {
            id: id.into(),
            dimensions: Dimensions::new(cpu, ram),
            group: None,
        }
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }
}

/// A candidate node with a hard capacity and the workloads admitted so far
///
/// `used` never exceeds `capacity` on any axis: an admission that would
/// overflow is rejected and leaves the bin untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bin {
    pub id: String,
    pub capacity: Dimensions,
    pub used: Dimensions,
    /// Admission order
    pub items: Vec<Item>,
}

impl Bin {
    pub fn new(id: impl Into<String>, capacity: Dimensions) -> Self {
        Self {
            id: id.into(),
            capacity,
            used: Dimensions::default(),
            items: Vec::new(),
        }
    }

    /// Check whether the item could be admitted without exceeding capacity
    pub fn can_fit(&self, item: &Item) -> bool {
        self.remaining().covers(&item.dimensions)
    }

    /// Admit an item if it fits. Returns false and leaves the bin unchanged otherwise.
    pub fn try_add(&mut self, item: Item) -> bool {
        if !self.can_fit(&item) {
            return false;
        }
        self.used += item.dimensions;
        self.items.push(item);
        true
    }

    /// Space left on each axis
    pub fn remaining(&self) -> Dimensions {
        self.capacity.saturating_sub(&self.used)
    }

    /// Unused capacity per axis
    pub fn waste(&self) -> Dimensions {
        self.remaining()
    }

    /// Residual space after admitting `item`, summed across axes.
    ///
    /// Returns `None` if the item does not fit. The plain sum (no weighting)
    /// is what best-fit ranks candidates by.
    pub fn residual_after(&self, item: &Item) -> Option<u64> {
        if !self.can_fit(item) {
            return None;
        }
        let left = self.remaining().saturating_sub(&item.dimensions);
        Some(left.cpu + left.ram)
    }

    /// Mean of per-axis utilization ratios, in [0, 1]
    pub fn efficiency(&self) -> f64 {
        let ratio = |used: u64, cap: u64| {
            if cap == 0 {
                0.0
            } else {
                used as f64 / cap as f64
            }
        };
        (ratio(self.used.cpu, self.capacity.cpu) + ratio(self.used.ram, self.capacity.ram)) / 2.0
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }
}
