//! CLI command implementations

pub mod plan;
pub mod policy;
pub mod risk;

/// Format a unix timestamp for display
pub(crate) fn format_timestamp(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| ts.to_string())
}
