//! Planning commands

use advisor_lib::{
    scan::{load_request, JsonFileSource},
    AllocationPlan, Optimizer, Packer, PolicyConfig, PolicyValidator, RiskConfig, RiskEngine,
};
use anyhow::{Context, Result};
use colored::Colorize;
use std::path::Path;
use std::sync::Arc;
use tabled::Tabled;

use super::format_timestamp;
use crate::client::ApiClient;
use crate::output::{
    color_efficiency, color_risk, color_savings, format_cpu, format_currency, format_mib,
    print_error, print_info, print_json, print_warning, OutputFormat,
};

/// Row for the node table
#[derive(Tabled)]
struct NodeRow {
    #[tabled(rename = "Node")]
    id: String,
    #[tabled(rename = "CPU")]
    cpu: String,
    #[tabled(rename = "Memory")]
    memory: String,
    #[tabled(rename = "Workloads")]
    workloads: usize,
    #[tabled(rename = "Efficiency")]
    efficiency: String,
}

/// Solve locally from inventory and catalog files
pub async fn plan_local(
    inventory: &Path,
    catalog: &Path,
    policy: PolicyConfig,
    format: OutputFormat,
) -> Result<()> {
    let source = JsonFileSource::new(inventory, catalog);
    let request = load_request(&source).await?;

    // No interruption history is available offline
    let risk = Arc::new(RiskEngine::new(RiskConfig::default())?);
    let optimizer = Optimizer::new(risk, PolicyValidator::new(policy), Packer::new());

    let plan = optimizer.solve(&request).with_context(|| {
        format!(
            "Cannot plan {} workloads against {} catalog entries",
            request.workloads.len(),
            request.catalog.len()
        )
    })?;

    match format {
        OutputFormat::Json => print_json(&plan)?,
        OutputFormat::Table => print_plan(&plan, request.current_spend),
    }

    Ok(())
}

/// Show the service's most recent scan report
pub async fn get_plan(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let Some(report) = client.latest_report().await? else {
        print_warning("No scan has completed yet");
        return Ok(());
    };

    match format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Table => {
            println!("{}", "Latest Scan".bold());
            println!("{}", "=".repeat(50));
            println!("Service:                {}", client.base_url());
            println!("Cycle:                  {}", report.cycle);
            println!(
                "Generated:              {}",
                format_timestamp(report.generated_at).dimmed()
            );
            println!("Workloads:              {}", report.workloads);
            println!("Catalog entries:        {}", report.catalog);
            println!();

            match (&report.plan, &report.error) {
                (Some(plan), _) => print_plan(plan, report.current_spend),
                (None, Some(error)) => print_error(error),
                (None, None) => print_warning("Scan produced no plan"),
            }
        }
    }

    Ok(())
}

/// Render a plan as a summary followed by its node table
pub(crate) fn print_plan(plan: &AllocationPlan, current_spend: f64) {
    println!("{}", "Allocation Plan".bold());
    println!("{}", "=".repeat(50));
    println!("Strategy:               {}", plan.strategy.to_string().cyan());
    println!("Nodes:                  {}", plan.node_count());
    println!("Current spend:          {}", format_currency(current_spend));
    println!(
        "Plan cost:              {} ({}/h)",
        format_currency(plan.total_cost).green(),
        format_currency(plan.hourly_cost())
    );
    println!(
        "{} {}",
        "Savings:               ".bold(),
        color_savings(plan.savings).bold()
    );
    println!("Risk score:             {}", color_risk(plan.risk_score));
    println!(
        "Mean efficiency:        {}",
        color_efficiency(plan.mean_efficiency())
    );
    println!();

    println!("{}", "Instructions".bold());
    println!("{}", "-".repeat(50));
    for instruction in &plan.instructions {
        println!("  {}", instruction);
    }
    println!();

    if plan.nodes.is_empty() {
        print_info("No nodes required");
    } else {
        let rows: Vec<NodeRow> = plan
            .nodes
            .iter()
            .map(|node| NodeRow {
                id: node.id.clone(),
                cpu: format!(
                    "{}/{}",
                    format_cpu(node.used.cpu),
                    format_cpu(node.capacity.cpu)
                ),
                memory: format!(
                    "{}/{}",
                    format_mib(node.used.ram),
                    format_mib(node.capacity.ram)
                ),
                workloads: node.len(),
                efficiency: color_efficiency(node.efficiency()),
            })
            .collect();

        let table = tabled::Table::new(rows)
            .with(tabled::settings::Style::rounded())
            .to_string();
        println!("{}", table);
    }

    if !plan.unplaced.is_empty() {
        println!();
        print_warning(&format!(
            "{} workloads exceed node capacity and were not placed: {}",
            plan.unplaced.len(),
            plan.unplaced.join(", ")
        ));
    }
}
