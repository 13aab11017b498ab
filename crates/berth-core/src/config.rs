//! berth.toml configuration parser.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Label namespace used when none is configured.
pub const DEFAULT_LABEL_NAMESPACE: &str = "com.docker.swarm";

/// Strategy used when none is configured.
pub const DEFAULT_STRATEGY: &str = "weighted";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BerthConfig {
    #[serde(default)]
    pub placement: PlacementConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlacementConfig {
    /// Prefix of the reserved `.id`, `.affinities` and `.constraints` labels.
    pub label_namespace: String,
    /// Name of the ranking strategy.
    pub strategy: String,
    /// Drop unhealthy hosts before ranking.
    pub skip_unhealthy: bool,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            label_namespace: DEFAULT_LABEL_NAMESPACE.to_string(),
            strategy: DEFAULT_STRATEGY.to_string(),
            skip_unhealthy: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LogConfig {
    /// `tracing` env-filter directive, overridden by `RUST_LOG`.
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "info,berth=debug".to_string(),
        }
    }
}

impl BerthConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: BerthConfig = toml::from_str(content)?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}
