//! Type conversions between `berth-core` state types and placement types.
//!
//! [`StaticHost`] implements [`Host`] over a [`HostState`] read from a
//! cluster description, the way an engine connection would over live data.

use std::collections::HashMap;

use berth_core::{ClusterState, ContainerState, HostState};

use crate::node::{Container, Containers, Host, Image, Node, Usage};
use crate::request::Normalizer;

/// Convert a [`ContainerState`], normalizing its config if it has one.
pub fn container_from_state(state: &ContainerState, normalizer: &Normalizer) -> Container {
    Container {
        id: state.id.clone(),
        names: state.names.clone(),
        image: state.image.clone(),
        config: state
            .config
            .as_ref()
            .map(|config| normalizer.normalize(config.clone())),
    }
}

/// A [`Host`] backed by a fixed [`HostState`].
///
/// Used capacity is not stored in the state; like an engine, it is the sum
/// of what the host's containers requested.
#[derive(Debug, Clone)]
pub struct StaticHost<'a> {
    state: &'a HostState,
    containers: Containers,
    used: Usage,
}

impl<'a> StaticHost<'a> {
    pub fn new(state: &'a HostState, normalizer: &Normalizer) -> Self {
        let containers: Containers = state
            .containers
            .iter()
            .map(|c| container_from_state(c, normalizer))
            .collect();
        let used = containers
            .iter()
            .map(Container::requested)
            .fold(Usage::default(), Usage::saturating_add);
        Self {
            state,
            containers,
            used,
        }
    }
}

impl Host for StaticHost<'_> {
    fn id(&self) -> &str {
        &self.state.id
    }

    fn ip(&self) -> &str {
        &self.state.ip
    }

    fn addr(&self) -> &str {
        &self.state.addr
    }

    fn name(&self) -> &str {
        &self.state.name
    }

    fn labels(&self) -> &HashMap<String, String> {
        &self.state.labels
    }

    fn containers(&self) -> Containers {
        self.containers.clone()
    }

    fn images(&self) -> Vec<Image> {
        self.state
            .images
            .iter()
            .map(|image| Image {
                id: image.id.clone(),
                repo_tags: image.repo_tags.clone(),
            })
            .collect()
    }

    fn used_memory(&self) -> i64 {
        self.used.memory
    }

    fn total_memory(&self) -> i64 {
        self.state.total_memory
    }

    fn used_cpus(&self) -> i64 {
        self.used.cpus
    }

    fn total_cpus(&self) -> i64 {
        self.state.total_cpus
    }

    fn used_blkio(&self) -> i64 {
        self.used.blkio
    }

    fn is_healthy(&self) -> bool {
        self.state.healthy
    }
}

/// Snapshot every host of a cluster description.
pub fn cluster_to_nodes(cluster: &ClusterState, normalizer: &Normalizer) -> Vec<Node> {
    cluster
        .hosts
        .iter()
        .map(|host| Node::from_host(&StaticHost::new(host, normalizer)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use berth_core::{ContainerConfig, HostConfig, ImageState};

    fn sample_host() -> HostState {
        HostState {
            id: "host-1".to_string(),
            ip: "10.0.0.1".to_string(),
            addr: "10.0.0.1:2375".to_string(),
            name: "node-1".to_string(),
            labels: {
                let mut m = HashMap::new();
                m.insert("storage".to_string(), "ssd".to_string());
                m
            },
            total_memory: 8192,
            total_cpus: 8,
            healthy: true,
            containers: vec![
                ContainerState {
                    id: "c1".to_string(),
                    names: vec!["/redis".to_string()],
                    image: "redis".to_string(),
                    config: Some(ContainerConfig {
                        memory: 1024,
                        cpu_shares: 2,
                        ..Default::default()
                    }),
                },
                ContainerState {
                    id: "c2".to_string(),
                    names: vec!["/web".to_string()],
                    image: "nginx".to_string(),
                    // Resources only in the nested block.
                    config: Some(ContainerConfig {
                        host_config: HostConfig {
                            memory: 512,
                            cpu_shares: 1,
                            blkio_weight: 300,
                            ..Default::default()
                        },
                        ..Default::default()
                    }),
                },
                ContainerState {
                    id: "c3".to_string(),
                    config: None,
                    ..Default::default()
                },
            ],
            images: vec![ImageState {
                id: "sha256:abc".to_string(),
                repo_tags: vec!["redis:latest".to_string()],
            }],
        }
    }

    #[test]
    fn used_capacity_is_summed_from_containers() {
        let state = sample_host();
        let host = StaticHost::new(&state, &Normalizer::default());

        assert_eq!(host.used_memory(), 1536);
        assert_eq!(host.used_cpus(), 3);
        assert_eq!(host.used_blkio(), 300);
        assert_eq!(host.total_memory(), 8192);
    }

    #[test]
    fn node_snapshot_from_state() {
        let state = sample_host();
        let node = Node::from_host(&StaticHost::new(&state, &Normalizer::default()));

        assert_eq!(node.id, "host-1");
        assert_eq!(node.addr, "10.0.0.1:2375");
        assert_eq!(node.labels.get("storage"), Some(&"ssd".to_string()));
        assert_eq!(node.containers.len(), 3);
        assert!(node.container("web").is_some());
        assert!(node.image("redis").is_some());
        assert!(node.is_healthy);
    }

    #[test]
    fn container_config_is_normalized() {
        let state = sample_host();
        let container = container_from_state(&state.containers[1], &Normalizer::default());

        let config = container.config.unwrap();
        assert_eq!(config.memory(), 512);
        assert_eq!(config.blkio_weight(), 300);
    }

    #[test]
    fn cluster_conversion_keeps_host_order() {
        let mut second = sample_host();
        second.id = "host-2".to_string();
        second.containers.clear();
        let cluster = ClusterState {
            hosts: vec![sample_host(), second],
        };

        let nodes = cluster_to_nodes(&cluster, &Normalizer::default());

        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].id, "host-1");
        assert_eq!(nodes[1].id, "host-2");
        assert_eq!(nodes[1].used_memory, 0);
    }

    #[test]
    fn used_capacity_saturates() {
        let mut state = sample_host();
        for c in &mut state.containers {
            c.config = Some(ContainerConfig {
                memory: i64::MAX,
                ..Default::default()
            });
        }
        let host = StaticHost::new(&state, &Normalizer::default());

        assert_eq!(host.used_memory(), i64::MAX);
    }
}
