use std::path::Path;

use berth_core::BerthConfig;
use berth_placement::{Container, NodeLedger, Placement, PlacementError, Placer, ResourceRequest};

use super::load_inputs;

pub fn run(
    config: &BerthConfig,
    cluster_path: &Path,
    request_path: &Path,
    name: &str,
    count: u32,
    format: &str,
) -> anyhow::Result<()> {
    let inputs = load_inputs(config, cluster_path, request_path)?;
    let placer = Placer::from_config(&config.placement)?;
    let ledger = NodeLedger::from_nodes(inputs.nodes);

    let (placed, failure) = place_replicas(&placer, &ledger, &inputs.request, name, count);

    match format {
        "json" => {
            let rows: Vec<serde_json::Value> = placed
                .iter()
                .map(|p| {
                    serde_json::json!({
                        "container": p.reservation.container_id,
                        "node": p.node_id,
                        "weight": p.weight,
                        "attempts": p.attempts,
                        "used_memory": p.reservation.after.memory,
                        "used_cpus": p.reservation.after.cpus,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
        _ => {
            for p in &placed {
                println!(
                    "✓ {} → {} (weight {})",
                    p.reservation.container_id, p.node_name, p.weight
                );
            }
        }
    }

    match failure {
        Some(e) => {
            eprintln!("Placement failed after {} of {count}: {e}", placed.len());
            Err(e.into())
        }
        None => Ok(()),
    }
}

/// Place `count` copies of `request`, stopping at the first failure.
pub fn place_replicas(
    placer: &Placer,
    ledger: &NodeLedger,
    request: &ResourceRequest,
    name: &str,
    count: u32,
) -> (Vec<Placement>, Option<PlacementError>) {
    let mut placed = Vec::new();
    for i in 0..count {
        let id = if count == 1 {
            name.to_string()
        } else {
            format!("{name}-{i}")
        };
        let mut request = request.clone();
        request.set_swarm_id(id.clone());
        let container = Container::new(id.clone(), request).with_name(format!("/{id}"));

        match placer.place(ledger, &container) {
            Ok(placement) => placed.push(placement),
            Err(e) => return (placed, Some(e)),
        }
    }
    (placed, None)
}
