//! Request normalization.
//!
//! Clients describe the same resource twice: once at the top level of the
//! request and once inside `HostConfig`, depending on their API version.
//! Placement hints also arrive two ways: as JSON arrays in reserved labels
//! (`<ns>.affinities`, `<ns>.constraints`) or as `affinity:<expr>` /
//! `constraint:<expr>` environment entries. [`Normalizer::normalize`]
//! collapses both into one canonical [`ResourceRequest`] whose hints live
//! only in the labels.

use std::collections::HashMap;
use std::fmt::Debug;

use berth_core::config::DEFAULT_LABEL_NAMESPACE;
use berth_core::{ContainerConfig, HostConfig};
use tracing::debug;

use crate::error::PlacementResult;

const ID_KEY: &str = "id";
const AFFINITIES_KEY: &str = "affinities";
const CONSTRAINTS_KEY: &str = "constraints";

const AFFINITY_ENV: &str = "affinity";
const CONSTRAINT_ENV: &str = "constraint";

/// Builds [`ResourceRequest`]s under a fixed label namespace.
#[derive(Debug, Clone)]
pub struct Normalizer {
    namespace: String,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(DEFAULT_LABEL_NAMESPACE)
    }
}

impl Normalizer {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Canonicalize a raw request.
    ///
    /// Hints from the labels come first, followed by hints found in the
    /// environment. Matching environment entries are removed; all others
    /// keep their relative order. A label that fails to decode contributes
    /// no hints.
    pub fn normalize(&self, mut config: ContainerConfig) -> ResourceRequest {
        let affinities_key = label_key(&self.namespace, AFFINITIES_KEY);
        let constraints_key = label_key(&self.namespace, CONSTRAINTS_KEY);

        let mut affinities = read_exprs(&config.labels, &affinities_key);
        let mut constraints = read_exprs(&config.labels, &constraints_key);

        let mut env = Vec::with_capacity(config.env.len());
        for entry in std::mem::take(&mut config.env) {
            let hint = match entry.split_once(':') {
                Some((AFFINITY_ENV, expr)) => Some((true, expr.to_string())),
                Some((CONSTRAINT_ENV, expr)) => Some((false, expr.to_string())),
                _ => None,
            };
            match hint {
                Some((true, expr)) => affinities.push(expr),
                Some((false, expr)) => constraints.push(expr),
                None => env.push(entry),
            }
        }
        config.env = env;

        store_exprs(&mut config.labels, affinities_key, &affinities);
        store_exprs(&mut config.labels, constraints_key, &constraints);

        reconcile_resources(&mut config);

        ResourceRequest {
            config,
            namespace: self.namespace.clone(),
        }
    }
}

/// A normalized container request.
///
/// Each resource has exactly one value (the top-level field and its
/// `HostConfig` mirror agree) and placement hints are stored only in the
/// reserved labels.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceRequest {
    config: ContainerConfig,
    namespace: String,
}

impl Default for ResourceRequest {
    fn default() -> Self {
        Normalizer::default().normalize(ContainerConfig::default())
    }
}

impl ResourceRequest {
    pub fn config(&self) -> &ContainerConfig {
        &self.config
    }

    pub fn into_config(self) -> ContainerConfig {
        self.config
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn image(&self) -> &str {
        &self.config.image
    }

    pub fn memory(&self) -> i64 {
        self.config.memory
    }

    pub fn memory_swap(&self) -> i64 {
        self.config.memory_swap
    }

    pub fn cpu_shares(&self) -> i64 {
        self.config.cpu_shares
    }

    pub fn cpuset(&self) -> &str {
        &self.config.cpuset
    }

    pub fn blkio_weight(&self) -> i64 {
        self.config.blkio_weight
    }

    pub fn labels(&self) -> &HashMap<String, String> {
        &self.config.labels
    }

    pub fn env(&self) -> &[String] {
        &self.config.env
    }

    /// The placement id stored in the `<ns>.id` label, or `""` if unset.
    pub fn swarm_id(&self) -> &str {
        self.config
            .labels
            .get(&label_key(&self.namespace, ID_KEY))
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn set_swarm_id(&mut self, id: impl Into<String>) {
        self.config
            .labels
            .insert(label_key(&self.namespace, ID_KEY), id.into());
    }

    /// Affinity expressions, decoded from the label on every call.
    pub fn affinities(&self) -> Vec<String> {
        self.extract_exprs(AFFINITIES_KEY)
    }

    /// Constraint expressions, decoded from the label on every call.
    pub fn constraints(&self) -> Vec<String> {
        self.extract_exprs(CONSTRAINTS_KEY)
    }

    /// Append an affinity and rewrite the label.
    pub fn add_affinity(&mut self, affinity: impl Into<String>) -> PlacementResult<()> {
        let mut affinities = self.extract_exprs(AFFINITIES_KEY);
        affinities.push(affinity.into());
        let encoded = serde_json::to_string(&affinities)?;
        self.config
            .labels
            .insert(label_key(&self.namespace, AFFINITIES_KEY), encoded);
        Ok(())
    }

    /// True when a hard `node==` constraint pins the request to a host.
    /// Soft `node==~` constraints do not count.
    pub fn has_node_constraint(&self) -> bool {
        self.constraints()
            .iter()
            .any(|c| c.starts_with("node==") && !c.starts_with("node==~"))
    }

    fn extract_exprs(&self, key: &str) -> Vec<String> {
        read_exprs(&self.config.labels, &label_key(&self.namespace, key))
    }
}

fn label_key(namespace: &str, key: &str) -> String {
    format!("{namespace}.{key}")
}

fn read_exprs(labels: &HashMap<String, String>, key: &str) -> Vec<String> {
    let Some(raw) = labels.get(key) else {
        return Vec::new();
    };
    match serde_json::from_str(raw) {
        Ok(exprs) => exprs,
        Err(e) => {
            debug!(label = key, error = %e, "ignoring undecodable hint label");
            Vec::new()
        }
    }
}

fn store_exprs(labels: &mut HashMap<String, String>, key: String, exprs: &[String]) {
    if exprs.is_empty() {
        return;
    }
    match serde_json::to_string(exprs) {
        Ok(encoded) => {
            labels.insert(key, encoded);
        }
        Err(e) => debug!(label = %key, error = %e, "failed to encode hint label"),
    }
}

/// Make the top-level resource fields and their `HostConfig` mirrors agree.
/// An explicitly set value wins; an empty side is back-filled.
fn reconcile_resources(config: &mut ContainerConfig) {
    let HostConfig {
        memory,
        memory_swap,
        cpu_shares,
        cpuset_cpus,
        blkio_weight,
    } = &mut config.host_config;

    reconcile("blkio_weight", &mut config.blkio_weight, blkio_weight);
    reconcile("memory", &mut config.memory, memory);
    reconcile("memory_swap", &mut config.memory_swap, memory_swap);
    reconcile("cpu_shares", &mut config.cpu_shares, cpu_shares);
    reconcile("cpuset", &mut config.cpuset, cpuset_cpus);
}

fn reconcile<T>(field: &'static str, primary: &mut T, mirrored: &mut T)
where
    T: PartialEq + Clone + Default + Debug,
{
    if primary == mirrored {
        return;
    }
    if *primary != T::default() {
        *mirrored = primary.clone();
    } else {
        *primary = mirrored.clone();
    }
    debug!(field, value = ?primary, "reconciled resource field");
}
