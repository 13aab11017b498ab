use std::path::Path;

use berth_core::{BerthConfig, ContainerConfig};
use berth_placement::{Normalizer, ResourceRequest};

pub fn run(config: &BerthConfig, request_path: &Path) -> anyhow::Result<()> {
    let normalizer = Normalizer::new(config.placement.label_namespace.clone());
    let request = normalizer.normalize(ContainerConfig::from_file(request_path)?);
    println!("{}", render(&request)?);
    Ok(())
}

/// Normalized request as pretty JSON, with the decoded hints alongside.
pub fn render(request: &ResourceRequest) -> anyhow::Result<String> {
    let value = serde_json::json!({
        "config": request.config(),
        "swarm_id": request.swarm_id(),
        "affinities": request.affinities(),
        "constraints": request.constraints(),
        "node_constraint": request.has_node_constraint(),
    });
    Ok(serde_json::to_string_pretty(&value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::fixtures;

    #[test]
    fn test_render_shows_hints_and_reconciled_fields() {
        let raw = ContainerConfig::from_json(fixtures::REQUEST).unwrap();
        let request = Normalizer::default().normalize(raw);

        let value: serde_json::Value = serde_json::from_str(&render(&request).unwrap()).unwrap();

        assert_eq!(value["affinities"][0], "image==redis");
        assert_eq!(value["constraints"].as_array().unwrap().len(), 0);
        assert_eq!(value["config"]["HostConfig"]["Memory"], 1024);
        assert_eq!(value["config"]["Env"].as_array().unwrap().len(), 1);
        assert_eq!(value["node_constraint"], false);
    }

    #[test]
    fn test_run_reads_request_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = fixtures::write(&dir, "request.json", fixtures::REQUEST);

        run(&BerthConfig::default(), &path).unwrap();
    }

    #[test]
    fn test_run_rejects_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = fixtures::write(&dir, "request.json", "{ not json");

        assert!(run(&BerthConfig::default(), &path).is_err());
    }
}
