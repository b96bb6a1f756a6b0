//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print any serializable value as pretty JSON
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Format MiB as human-readable string
pub fn format_mib(mib: u64) -> String {
    if mib >= 1024 {
        format!("{:.1}Gi", mib as f64 / 1024.0)
    } else {
        format!("{}Mi", mib)
    }
}

/// Format millicores as human-readable string
pub fn format_cpu(millicores: u64) -> String {
    if millicores >= 1000 {
        format!("{:.1}", millicores as f64 / 1000.0)
    } else {
        format!("{}m", millicores)
    }
}

/// Format a ratio as percentage
pub fn format_percent(ratio: f64) -> String {
    format!("{:.0}%", ratio * 100.0)
}

/// Format a monthly dollar amount
pub fn format_currency(amount: f64) -> String {
    if amount < 0.0 {
        format!("-${:.2}", -amount)
    } else {
        format!("${:.2}", amount)
    }
}

/// Color savings: green when positive, red when the plan costs more
pub fn color_savings(amount: f64) -> String {
    let formatted = format_currency(amount);
    if amount >= 0.0 {
        formatted.green().to_string()
    } else {
        formatted.red().to_string()
    }
}

/// Color a risk score against the optimizer's cutoff
pub fn color_risk(score: f64) -> String {
    let formatted = format!("{:.3}", score);
    if score > advisor_lib::optimizer::RISK_CUTOFF {
        formatted.red().to_string()
    } else if score > 0.2 {
        formatted.yellow().to_string()
    } else {
        formatted.green().to_string()
    }
}

/// Color node efficiency; low values mark nearly-empty nodes
pub fn color_efficiency(efficiency: f64) -> String {
    let formatted = format_percent(efficiency);
    if efficiency >= 0.8 {
        formatted.green().to_string()
    } else if efficiency >= advisor_lib::optimizer::DUST_EFFICIENCY_THRESHOLD {
        formatted.yellow().to_string()
    } else {
        formatted.red().to_string()
    }
}
