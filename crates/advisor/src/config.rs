//! Advisor configuration

use advisor_lib::{PolicyConfig, RiskConfig};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable naming an optional config file
pub const CONFIG_PATH_ENV: &str = "ADVISOR_CONFIG";

/// Advisor configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AdvisorConfig {
    /// Name used in structured log events
    #[serde(default = "default_instance_name")]
    pub instance_name: String,

    /// API server port for health, metrics and the advisor API
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Fleet scan interval in seconds
    #[serde(default = "default_scan_interval")]
    pub scan_interval_secs: u64,

    /// Risk decay interval in seconds
    #[serde(default = "default_decay_interval")]
    pub decay_interval_secs: u64,

    /// Discovered inventory JSON; the scan loop runs only when both paths are set
    #[serde(default)]
    pub inventory_path: Option<PathBuf>,

    /// Priced SKU catalog JSON
    #[serde(default)]
    pub catalog_path: Option<PathBuf>,

    #[serde(default)]
    pub policy: PolicyConfig,

    #[serde(default)]
    pub risk: RiskConfig,
}

fn default_instance_name() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "fleet-advisor".to_string())
}

fn default_api_port() -> u16 {
    8080
}

fn default_scan_interval() -> u64 {
    300
}

fn default_decay_interval() -> u64 {
    300
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            instance_name: default_instance_name(),
            api_port: default_api_port(),
            scan_interval_secs: default_scan_interval(),
            decay_interval_secs: default_decay_interval(),
            inventory_path: None,
            catalog_path: None,
            policy: PolicyConfig::default(),
            risk: RiskConfig::default(),
        }
    }
}

impl AdvisorConfig {
    /// Load from the optional `ADVISOR_CONFIG` file, overridden by
    /// `ADVISOR__*` environment variables
    pub fn load() -> Result<Self> {
        let file = std::env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from);
        Self::load_from(file)
    }

    pub fn load_from(file: Option<PathBuf>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = &file {
            builder = builder.add_source(config::File::from(path.as_path()));
        }
        let settings = builder
            .add_source(
                config::Environment::with_prefix("ADVISOR")
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("policy.allowed_families")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to load advisor configuration")?;

        let config: AdvisorConfig = settings
            .try_deserialize()
            .context("Invalid advisor configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.scan_interval_secs == 0 {
            anyhow::bail!("scan_interval_secs must be positive");
        }
        if self.decay_interval_secs == 0 {
            anyhow::bail!("decay_interval_secs must be positive");
        }
        self.policy.validate()?;
        self.risk.validate()?;
        Ok(())
    }

    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.scan_interval_secs)
    }

    pub fn decay_interval(&self) -> Duration {
        Duration::from_secs(self.decay_interval_secs)
    }

    /// Both source paths, when the scan loop is enabled
    pub fn source_paths(&self) -> Option<(PathBuf, PathBuf)> {
        match (&self.inventory_path, &self.catalog_path) {
            (Some(inventory), Some(catalog)) => Some((inventory.clone(), catalog.clone())),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::{Mutex, MutexGuard};

    // Tests that read the process environment run one at a time
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn env_guard() -> MutexGuard<'static, ()> {
        ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    #[test]
    fn test_defaults() {
        let config = AdvisorConfig::default();
        assert_eq!(config.api_port, 8080);
        assert_eq!(config.scan_interval(), Duration::from_secs(300));
        assert_eq!(config.decay_interval(), Duration::from_secs(300));
        assert_eq!(config.policy, PolicyConfig::default());
        assert_eq!(config.risk, RiskConfig::default());
        assert!(config.source_paths().is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let _env = env_guard();
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
api_port = 9191
inventory_path = "/data/inventory.json"
catalog_path = "/data/catalog.json"

[policy]
max_spend_limit = 5000.0
allowed_families = ["m5"]

[risk]
decay_factor = 0.9
"#
        )
        .unwrap();

        let config = AdvisorConfig::load_from(Some(file.path().to_path_buf())).unwrap();

        assert_eq!(config.api_port, 9191);
        assert_eq!(config.policy.max_spend_limit, 5000.0);
        assert_eq!(config.policy.allowed_families, vec!["m5".to_string()]);
        // Unset fields in a section keep their defaults
        assert_eq!(config.policy.max_churn_percent, 20.0);
        assert_eq!(config.risk.decay_factor, 0.9);
        assert_eq!(config.risk.baseline_risk, 0.05);
        let (inventory, catalog) = config.source_paths().unwrap();
        assert_eq!(inventory, PathBuf::from("/data/inventory.json"));
        assert_eq!(catalog, PathBuf::from("/data/catalog.json"));
    }

    #[test]
    fn test_invalid_risk_rejected() {
        let _env = env_guard();
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[risk]\ndecay_factor = 1.5").unwrap();

        let err = AdvisorConfig::load_from(Some(file.path().to_path_buf())).unwrap_err();

        assert!(format!("{err:#}").contains("decay_factor"));
    }

    #[test]
    fn test_environment_overrides_file() {
        let _env = env_guard();
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "api_port = 9191\n\n[policy]\nmax_spend_limit = 100.0"
        )
        .unwrap();

        std::env::set_var("ADVISOR__API_PORT", "9000");
        std::env::set_var("ADVISOR__POLICY__MAX_SPEND_LIMIT", "5000");
        std::env::set_var("ADVISOR__POLICY__ALLOWED_FAMILIES", "m5,c5");

        let result = AdvisorConfig::load_from(Some(file.path().to_path_buf()));

        std::env::remove_var("ADVISOR__API_PORT");
        std::env::remove_var("ADVISOR__POLICY__MAX_SPEND_LIMIT");
        std::env::remove_var("ADVISOR__POLICY__ALLOWED_FAMILIES");

        let config = result.unwrap();
        assert_eq!(config.api_port, 9000);
        assert_eq!(config.policy.max_spend_limit, 5000.0);
        assert_eq!(
            config.policy.allowed_families,
            vec!["m5".to_string(), "c5".to_string()]
        );
        assert_eq!(config.policy.max_churn_percent, 20.0);
    }

    #[test]
    fn test_zero_interval_rejected() {
        let config = AdvisorConfig {
            scan_interval_secs: 0,
            ..AdvisorConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
