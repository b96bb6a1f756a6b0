//! Workload placement onto candidate nodes
//!
//! This module provides:
//! - The packing vocabulary (resource vectors, workloads, nodes)
//! - A deterministic two-dimensional Best-Fit-Decreasing packer

mod bin;
mod packer;

pub use bin::{Bin, Dimensions, Item};
pub use packer::{NodeTemplate, Packer, Packing};
