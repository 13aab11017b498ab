use std::path::Path;

use berth_core::BerthConfig;
use berth_placement::{Placer, RankedNode};

use super::load_inputs;

pub fn run(
    config: &BerthConfig,
    cluster_path: &Path,
    request_path: &Path,
    format: &str,
) -> anyhow::Result<()> {
    let inputs = load_inputs(config, cluster_path, request_path)?;
    let placer = Placer::from_config(&config.placement)?;

    let nodes = placer.candidates(&inputs.request, inputs.nodes)?;
    let ranked = placer.rank(&inputs.request, &nodes)?;

    println!("{}", format_ranking(&ranked, format)?);
    Ok(())
}

pub fn format_ranking(ranked: &[RankedNode<'_>], format: &str) -> anyhow::Result<String> {
    match format {
        "json" => {
            let rows: Vec<serde_json::Value> = ranked
                .iter()
                .map(|r| {
                    serde_json::json!({
                        "id": r.node.id,
                        "name": r.node.name,
                        "weight": r.weight,
                        "cpu": r.score.cpu,
                        "memory": r.score.memory,
                        "blkio": r.score.blkio,
                        "containers": r.node.containers.len(),
                    })
                })
                .collect();
            Ok(serde_json::to_string_pretty(&rows)?)
        }
        _ => {
            let mut out = format!(
                "{:<20} {:>6} {:>5} {:>6} {:>5} {:>10}",
                "NODE", "WEIGHT", "CPU", "MEMORY", "BLKIO", "CONTAINERS"
            );
            for r in ranked {
                out.push_str(&format!(
                    "\n{:<20} {:>6} {:>5} {:>6} {:>5} {:>10}",
                    r.node.name,
                    r.weight,
                    r.score.cpu,
                    r.score.memory,
                    r.score.blkio,
                    r.node.containers.len()
                ));
            }
            Ok(out)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::fixtures;

    fn ranked_json() -> serde_json::Value {
        let dir = tempfile::tempdir().unwrap();
        let cluster = fixtures::write(&dir, "cluster.toml", fixtures::CLUSTER);
        let request = fixtures::write(&dir, "request.json", fixtures::REQUEST);
        let config = BerthConfig::default();

        let inputs = load_inputs(&config, &cluster, &request).unwrap();
        let placer = Placer::from_config(&config.placement).unwrap();
        let ranked = placer.rank(&inputs.request, &inputs.nodes).unwrap();
        serde_json::from_str(&format_ranking(&ranked, "json").unwrap()).unwrap()
    }

    #[test]
    fn test_rank_orders_by_weight() {
        let rows = ranked_json();

        assert_eq!(rows[0]["id"], "a");
        assert_eq!(rows[0]["weight"], 200);
        assert_eq!(rows[1]["id"], "b");
        assert_eq!(rows[1]["weight"], 250);
        assert_eq!(rows[1]["containers"], 1);
    }

    #[test]
    fn test_text_table_has_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let cluster = fixtures::write(&dir, "cluster.toml", fixtures::CLUSTER);
        let request = fixtures::write(&dir, "request.json", fixtures::REQUEST);
        let inputs = load_inputs(&BerthConfig::default(), &cluster, &request).unwrap();
        let placer = Placer::from_config(&BerthConfig::default().placement).unwrap();
        let ranked = placer.rank(&inputs.request, &inputs.nodes).unwrap();

        let table = format_ranking(&ranked, "text").unwrap();
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("NODE"));
        assert!(lines[1].starts_with("node-a"));
    }

    #[test]
    fn test_run_fails_when_nothing_fits() {
        let dir = tempfile::tempdir().unwrap();
        let cluster = fixtures::write(&dir, "cluster.toml", fixtures::CLUSTER);
        let request = fixtures::write(&dir, "request.json", r#"{"Memory": 999999}"#);

        let err = run(&BerthConfig::default(), &cluster, &request, "text").unwrap_err();
        assert!(err.to_string().contains("no resources available"));
    }
}
