//! Fleet advisor service
//!
//! Hosts the optimizer behind an HTTP API and keeps a fresh recommendation
//! by periodically scanning the fleet.

pub mod api;
pub mod config;
