pub mod normalize;
pub mod place;
pub mod rank;

use std::path::Path;

use berth_core::{BerthConfig, ClusterState, ContainerConfig};
use berth_placement::{Node, Normalizer, ResourceRequest, cluster_to_nodes};

/// Request and host snapshots shared by `rank` and `place`.
pub struct Inputs {
    pub request: ResourceRequest,
    pub nodes: Vec<Node>,
}

pub fn load_inputs(
    config: &BerthConfig,
    cluster_path: &Path,
    request_path: &Path,
) -> anyhow::Result<Inputs> {
    let normalizer = Normalizer::new(config.placement.label_namespace.clone());
    let request = normalizer.normalize(ContainerConfig::from_file(request_path)?);
    let cluster = ClusterState::from_file(cluster_path)?;
    let nodes = cluster_to_nodes(&cluster, &normalizer);
    Ok(Inputs { request, nodes })
}
