//! Fleet Advisor CLI
//!
//! A command-line tool for planning fleets locally, querying the advisor
//! service and reporting instance interruptions.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use commands::{plan, policy, risk};
use std::path::PathBuf;

/// Fleet Advisor CLI
#[derive(Parser)]
#[command(name = "fleet")]
#[command(author, version, about = "CLI for the Fleet Advisor", long_about = None)]
pub struct Cli {
    /// API endpoint URL (can also be set via FLEET_API_URL env var)
    #[arg(long, env = "FLEET_API_URL")]
    pub api_url: Option<String>,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compute an allocation plan locally from inventory and catalog files
    Plan {
        /// Discovered inventory (JSON array of compute resources)
        #[arg(long)]
        inventory: PathBuf,

        /// Priced SKU catalog (JSON array of offers)
        #[arg(long)]
        catalog: PathBuf,

        #[command(flatten)]
        policy: PolicyArgs,
    },

    /// Fetch results from the advisor service
    #[command(subcommand)]
    Get(GetCommands),

    /// Inspect or update interruption risk
    #[command(subcommand)]
    Risk(RiskCommands),

    /// Check proposals against policy
    #[command(subcommand)]
    Policy(PolicyCommands),
}

#[derive(Subcommand)]
pub enum GetCommands {
    /// Get the latest scan report
    Plan,
}

#[derive(Subcommand)]
pub enum RiskCommands {
    /// Show tracked risk scores
    Show,

    /// Record an instance interruption
    Interrupt {
        /// Availability zone
        #[arg(long)]
        zone: String,

        /// Instance type name (e.g. m5.large)
        #[arg(long)]
        instance_type: String,
    },
}

#[derive(Subcommand)]
pub enum PolicyCommands {
    /// Validate a proposed change
    Check {
        /// Share of existing infrastructure changed, in percent
        #[arg(long)]
        churn: f64,

        /// Target instance type
        #[arg(long)]
        instance_type: String,

        /// Monthly cost of the proposal
        #[arg(long)]
        cost: f64,

        #[command(flatten)]
        policy: PolicyArgs,
    },
}

/// Policy overrides on top of the config file
#[derive(Args)]
pub struct PolicyArgs {
    /// Monthly spend ceiling
    #[arg(long)]
    max_spend: Option<f64>,

    /// Maximum churn percent
    #[arg(long)]
    max_churn: Option<f64>,

    /// Allowed instance family prefix (repeatable; replaces the configured list)
    #[arg(long = "allow", value_name = "FAMILY")]
    allow: Vec<String>,
}

impl From<PolicyArgs> for config::PolicyOverrides {
    fn from(args: PolicyArgs) -> Self {
        Self {
            max_spend: args.max_spend,
            max_churn: args.max_churn,
            allow: args.allow,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = config::Config::load()?;

    match cli.command {
        Commands::Plan {
            inventory,
            catalog,
            policy,
        } => {
            let policy = config.resolve_policy(&policy.into())?;
            plan::plan_local(&inventory, &catalog, policy, cli.format).await?;
        }
        Commands::Policy(PolicyCommands::Check {
            churn,
            instance_type,
            cost,
            policy: overrides,
        }) => {
            let policy_config = config.resolve_policy(&overrides.into())?;
            policy::check(policy_config, churn, &instance_type, cost, cli.format)?;
        }
        Commands::Get(GetCommands::Plan) => {
            let client = client::ApiClient::new(&config.resolve_api_url(cli.api_url.as_deref()))?;
            plan::get_plan(&client, cli.format).await?;
        }
        Commands::Risk(risk_cmd) => {
            let client = client::ApiClient::new(&config.resolve_api_url(cli.api_url.as_deref()))?;
            match risk_cmd {
                RiskCommands::Show => risk::show_risk(&client, cli.format).await?,
                RiskCommands::Interrupt {
                    zone,
                    instance_type,
                } => risk::interrupt(&client, &zone, &instance_type, cli.format).await?,
            }
        }
    }

    Ok(())
}
