//! Interruption risk commands

use anyhow::Result;
use tabled::Tabled;

use super::format_timestamp;
use crate::client::ApiClient;
use crate::output::{color_risk, print_info, print_json, print_success, OutputFormat};

/// Row for the risk table
#[derive(Tabled)]
struct RiskRow {
    #[tabled(rename = "Zone")]
    zone: String,
    #[tabled(rename = "Instance Type")]
    instance_type: String,
    #[tabled(rename = "Score")]
    score: String,
    #[tabled(rename = "Last Interruption")]
    last_interruption: String,
}

/// List every tracked (zone, instance type) pair
pub async fn show_risk(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let entries = client.risk_snapshot().await?;

    match format {
        OutputFormat::Json => print_json(&entries)?,
        OutputFormat::Table => {
            if entries.is_empty() {
                print_info("No interruptions recorded; every pair is at baseline risk");
                return Ok(());
            }

            let rows: Vec<RiskRow> = entries
                .iter()
                .map(|e| RiskRow {
                    zone: e.zone.clone(),
                    instance_type: e.instance_type.clone(),
                    score: color_risk(e.score),
                    last_interruption: format_timestamp(e.last_interruption_at),
                })
                .collect();

            let table = tabled::Table::new(rows)
                .with(tabled::settings::Style::rounded())
                .to_string();
            println!("{}", table);
        }
    }

    Ok(())
}

/// Report an interruption to the service
pub async fn interrupt(
    client: &ApiClient,
    zone: &str,
    instance_type: &str,
    format: OutputFormat,
) -> Result<()> {
    let recorded = client.record_interruption(zone, instance_type).await?;

    match format {
        OutputFormat::Json => print_json(&recorded)?,
        OutputFormat::Table => print_success(&format!(
            "Recorded interruption for {} (risk now {})",
            recorded.key,
            color_risk(recorded.score)
        )),
    }

    Ok(())
}
