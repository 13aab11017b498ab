//! Wire-shaped input types.
//!
//! `ContainerConfig` mirrors the container-create payload clients send,
//! including the legacy duplication of resource fields between the top
//! level and the nested `HostConfig` block. Nothing here is normalized;
//! that is the placement crate's job.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Unique identifier for a host in the cluster.
pub type HostId = String;

/// Unique identifier for a container.
pub type ContainerId = String;

// ── Container request ─────────────────────────────────────────────

/// Raw container-create request.
///
/// Field names follow the container engine's JSON API (PascalCase), and
/// every field may be omitted.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase", default)]
pub struct ContainerConfig {
    pub image: String,
    pub cmd: Vec<String>,
    /// Memory limit in bytes.
    pub memory: i64,
    pub memory_swap: i64,
    /// Relative CPU shares.
    pub cpu_shares: i64,
    pub cpuset: String,
    pub blkio_weight: i64,
    pub labels: HashMap<String, String>,
    /// Environment entries in `KEY=value` form, order preserved.
    pub env: Vec<String>,
    pub host_config: HostConfig,
}

/// Host-level resource settings nested inside a [`ContainerConfig`].
///
/// Newer clients send resources here, older ones at the top level.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase", default)]
pub struct HostConfig {
    pub memory: i64,
    pub memory_swap: i64,
    pub cpu_shares: i64,
    pub cpuset_cpus: String,
    pub blkio_weight: i64,
}

impl ContainerConfig {
    /// Parse a request from its JSON form.
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read a JSON request from disk.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }
}

// ── Host state ────────────────────────────────────────────────────

/// A container already running on a host.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ContainerState {
    pub id: ContainerId,
    /// Names as reported by the engine, usually with a leading `/`.
    pub names: Vec<String>,
    pub image: String,
    pub config: Option<ContainerConfig>,
}

/// An image cached on a host.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ImageState {
    pub id: String,
    pub repo_tags: Vec<String>,
}

/// Point-in-time description of one host.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HostState {
    pub id: HostId,
    #[serde(default)]
    pub ip: String,
    #[serde(default)]
    pub addr: String,
    pub name: String,
    #[serde(default)]
    pub labels: HashMap<String, String>,
    /// Total memory in bytes.
    pub total_memory: i64,
    /// Total CPU shares.
    pub total_cpus: i64,
    #[serde(default = "default_healthy")]
    pub healthy: bool,
    #[serde(default)]
    pub containers: Vec<ContainerState>,
    #[serde(default)]
    pub images: Vec<ImageState>,
}

fn default_healthy() -> bool {
    true
}

/// A set of hosts, as loaded from a cluster description file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ClusterState {
    #[serde(default)]
    pub hosts: Vec<HostState>,
}

impl ClusterState {
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }
}
