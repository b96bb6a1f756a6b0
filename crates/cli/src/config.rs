//! Configuration management for the CLI

use advisor_lib::PolicyConfig;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Used when neither the flag, the environment nor the config file set one
pub const DEFAULT_API_URL: &str = "http://localhost:8080";

/// CLI configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// API endpoint URL
    pub api_url: Option<String>,
    /// Policy used for local planning and checks
    pub policy: Option<PolicyConfig>,
}

impl Config {
    /// Load configuration from the default location, if present
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// `~/.config/fleet/config.json`
    fn config_path() -> Option<PathBuf> {
        dirs_next::home_dir().map(|home| home.join(".config").join("fleet").join("config.json"))
    }

    /// Flag or environment value, then the config file, then the default
    pub fn resolve_api_url(&self, flag: Option<&str>) -> String {
        flag.map(str::to_string)
            .or_else(|| self.api_url.clone())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
    }

    /// Configured policy with command-line overrides applied
    pub fn resolve_policy(&self, overrides: &PolicyOverrides) -> Result<PolicyConfig> {
        let mut policy = self.policy.clone().unwrap_or_default();
        if let Some(limit) = overrides.max_spend {
            policy.max_spend_limit = limit;
        }
        if let Some(churn) = overrides.max_churn {
            policy.max_churn_percent = churn;
        }
        if !overrides.allow.is_empty() {
            policy.allowed_families = overrides.allow.clone();
        }
        policy.validate()?;
        Ok(policy)
    }
}

/// Policy settings given on the command line
#[derive(Debug, Clone, Default)]
pub struct PolicyOverrides {
    pub max_spend: Option<f64>,
    pub max_churn: Option<f64>,
    pub allow: Vec<String>,
}
