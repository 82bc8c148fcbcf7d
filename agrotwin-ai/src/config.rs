//! Configuration for agrotwin-ai
//!
//! Resolution priority: command line > environment (`AGROTWIN_*`) > TOML
//! file > compiled default. Every TOML key is optional.

use agrotwin_common::config::{load_toml, RootFolderInitializer};
use agrotwin_common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::registry::ArtifactPaths;

pub const ENV_BIND_ADDRESS: &str = "AGROTWIN_BIND_ADDRESS";
pub const ENV_PORT: &str = "AGROTWIN_PORT";
pub const ENV_LOG_LEVEL: &str = "AGROTWIN_LOG_LEVEL";
pub const ENV_MODELS_DIR: &str = "AGROTWIN_MODELS_DIR";
pub const ENV_LEDGER_ENABLED: &str = "AGROTWIN_LEDGER_ENABLED";
pub const ENV_BRIDGE_URL: &str = "AGROTWIN_BRIDGE_URL";
pub const ENV_SCHEDULER_ENABLED: &str = "AGROTWIN_SCHEDULER_ENABLED";
pub const ENV_ADVICE_TEMPLATES: &str = "AGROTWIN_ADVICE_TEMPLATES";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    /// Defaults to `<root_folder>/models`
    pub dir: Option<PathBuf>,
    pub scaler_path: Option<PathBuf>,
    pub encoder_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub enabled: bool,
    pub bridge_url: String,
    pub timeout_secs: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bridge_url: "http://localhost:3000".to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregationConfig {
    pub timeout_secs: u64,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self { timeout_secs: 10 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub enabled: bool,
    /// Local wall-clock time, `HH:MM`
    pub run_at: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            run_at: "23:59".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdviceConfig {
    /// Replacement advisory template table
    pub templates: Option<PathBuf>,
}

/// `agrotwin-ai.toml`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    pub root_folder: Option<PathBuf>,
    pub bind_address: String,
    pub port: u16,
    pub logging: LoggingConfig,
    pub models: ModelsConfig,
    pub ledger: LedgerConfig,
    pub aggregation: AggregationConfig,
    pub scheduler: SchedulerConfig,
    pub advice: AdviceConfig,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            root_folder: None,
            bind_address: "127.0.0.1".to_string(),
            port: 8080,
            logging: LoggingConfig::default(),
            models: ModelsConfig::default(),
            ledger: LedgerConfig::default(),
            aggregation: AggregationConfig::default(),
            scheduler: SchedulerConfig::default(),
            advice: AdviceConfig::default(),
        }
    }
}

/// Values given on the command line
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub bind_address: Option<String>,
    pub port: Option<u16>,
    pub models_dir: Option<PathBuf>,
    pub bridge_url: Option<String>,
    pub no_ledger: bool,
    pub no_scheduler: bool,
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(Error::Config(format!("{} must be a boolean, got '{}'", name, other))),
    }
}

impl AiConfig {
    /// Load from a TOML file; a missing file yields defaults
    pub fn load(path: &Path) -> Result<Self> {
        load_toml(path)
    }

    /// Apply `AGROTWIN_*` variables from the process environment
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_from(|name| std::env::var(name).ok())
    }

    /// Apply environment overrides from an arbitrary lookup
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(value) = var(ENV_BIND_ADDRESS) {
            self.bind_address = value;
        }
        if let Some(value) = var(ENV_PORT) {
            self.port = value
                .trim()
                .parse()
                .map_err(|_| Error::Config(format!("{} must be a port number, got '{}'", ENV_PORT, value)))?;
        }
        if let Some(value) = var(ENV_LOG_LEVEL) {
            self.logging.level = value;
        }
        if let Some(value) = var(ENV_MODELS_DIR) {
            self.models.dir = Some(PathBuf::from(value));
        }
        if let Some(value) = var(ENV_LEDGER_ENABLED) {
            self.ledger.enabled = parse_bool(ENV_LEDGER_ENABLED, &value)?;
        }
        if let Some(value) = var(ENV_BRIDGE_URL) {
            self.ledger.bridge_url = value;
        }
        if let Some(value) = var(ENV_SCHEDULER_ENABLED) {
            self.scheduler.enabled = parse_bool(ENV_SCHEDULER_ENABLED, &value)?;
        }
        if let Some(value) = var(ENV_ADVICE_TEMPLATES) {
            self.advice.templates = Some(PathBuf::from(value));
        }
        Ok(())
    }

    pub fn apply_cli(&mut self, cli: &CliOverrides) {
        if let Some(bind_address) = &cli.bind_address {
            self.bind_address = bind_address.clone();
        }
        if let Some(port) = cli.port {
            self.port = port;
        }
        if let Some(dir) = &cli.models_dir {
            self.models.dir = Some(dir.clone());
        }
        if let Some(url) = &cli.bridge_url {
            self.ledger.bridge_url = url.clone();
        }
        if cli.no_ledger {
            self.ledger.enabled = false;
        }
        if cli.no_scheduler {
            self.scheduler.enabled = false;
        }
    }

    /// Artifact locations; relative overrides resolve against the models dir
    pub fn artifact_paths(&self, root: &RootFolderInitializer) -> ArtifactPaths {
        let dir = self.models.dir.clone().unwrap_or_else(|| root.models_path());
        let mut paths = ArtifactPaths::in_dir(&dir);
        if let Some(scaler) = &self.models.scaler_path {
            paths.scaler_path = dir.join(scaler);
        }
        if let Some(encoder) = &self.models.encoder_path {
            paths.encoder_path = dir.join(encoder);
        }
        paths
    }

    pub fn ledger_timeout(&self) -> Duration {
        Duration::from_secs(self.ledger.timeout_secs)
    }

    pub fn aggregation_timeout(&self) -> Duration {
        Duration::from_secs(self.aggregation.timeout_secs)
    }
}
