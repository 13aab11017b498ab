//! End-to-end placement tests.
//!
//! Exercise the full path: raw request → normalization → snapshots built
//! from host state → ranking → reservation on a shared ledger, including
//! concurrent scheduling threads racing for the same hosts.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use berth_core::{ClusterState, ContainerConfig, HostState};
use berth_placement::*;

fn host(id: &str, total_memory: i64, total_cpus: i64) -> HostState {
    HostState {
        id: id.to_string(),
        ip: String::new(),
        addr: format!("{id}:2375"),
        name: format!("node-{id}"),
        labels: Default::default(),
        total_memory,
        total_cpus,
        healthy: true,
        containers: Vec::new(),
        images: Vec::new(),
    }
}

fn container(id: &str, memory: i64, cpus: i64) -> Container {
    let config = ContainerConfig {
        memory,
        cpu_shares: cpus,
        ..Default::default()
    };
    Container::new(id, Normalizer::default().normalize(config))
}

fn placer() -> Placer {
    Placer::new(
        Box::new(WeightedStrategy::new(Arc::new(NoopObserver))),
        Arc::new(NoopObserver),
    )
}

#[derive(Default)]
struct Recorder {
    reserved: Mutex<Vec<Reservation>>,
    weighed: AtomicUsize,
}

impl PlacementObserver for Recorder {
    fn node_weighed(&self, _node: &Node, _score: &Score, _weight: i64) {
        self.weighed.fetch_add(1, Ordering::Relaxed);
    }

    fn resources_reserved(&self, reservation: &Reservation) {
        self.reserved.lock().unwrap().push(reservation.clone());
    }
}

#[test]
fn request_from_legacy_client_is_placed() {
    // Old client: resources only in HostConfig, hints in the environment.
    let raw = ContainerConfig::from_json(
        r#"{
            "Image": "redis",
            "Env": ["MODE=primary", "affinity:image==redis", "constraint:node==~node-a"],
            "HostConfig": { "Memory": 1024, "CpuShares": 2 }
        }"#,
    )
    .unwrap();
    let request = Normalizer::default().normalize(raw);

    assert_eq!(request.memory(), 1024);
    assert_eq!(request.cpu_shares(), 2);
    assert_eq!(request.env(), ["MODE=primary"]);
    assert_eq!(request.affinities(), ["image==redis"]);
    assert!(!request.has_node_constraint());

    let cluster = ClusterState {
        hosts: vec![host("a", 2048, 4), host("b", 4096, 8)],
    };
    let ledger = NodeLedger::from_nodes(cluster_to_nodes(&cluster, &Normalizer::default()));

    let placement = placer()
        .place(&ledger, &Container::new("c1", request))
        .unwrap();

    // b: 25 + 25 + 100; a: 50 + 50 + 100.
    assert_eq!(placement.node_id, "b");
    assert_eq!(placement.weight, 150);
    assert_eq!(ledger.node("b").unwrap().used_memory, 1024);
}

#[test]
fn successive_placements_spread_across_hosts() {
    let hosts = [host("a", 4096, 8), host("b", 4096, 8), host("c", 4096, 8)];
    let normalizer = Normalizer::default();
    let statics: Vec<StaticHost<'_>> = hosts
        .iter()
        .map(|h| StaticHost::new(h, &normalizer))
        .collect();
    let ledger = NodeLedger::from_hosts(&statics);
    let placer = placer();

    let mut chosen = Vec::new();
    for i in 0..3 {
        let placement = placer
            .place(&ledger, &container(&format!("c{i}"), 1024, 2))
            .unwrap();
        chosen.push(placement.node_id);
    }
    chosen.sort();

    assert_eq!(chosen, ["a", "b", "c"]);
}

#[test]
fn observer_sees_every_reservation() {
    let recorder = Arc::new(Recorder::default());
    let observer: Arc<dyn PlacementObserver> = recorder.clone();
    let placer = Placer::new(Box::new(WeightedStrategy::new(observer.clone())), observer);
    let ledger = NodeLedger::from_nodes(cluster_to_nodes(
        &ClusterState {
            hosts: vec![host("a", 2048, 4), host("b", 2048, 4)],
        },
        &Normalizer::default(),
    ));

    placer.place(&ledger, &container("c1", 512, 1)).unwrap();
    placer.place(&ledger, &container("c2", 512, 1)).unwrap();

    let reserved = recorder.reserved.lock().unwrap();
    assert_eq!(reserved.len(), 2);
    assert_eq!(reserved[0].container_id, "c1");
    assert_eq!(reserved[0].after.memory - reserved[0].before.memory, 512);
    assert_eq!(recorder.weighed.load(Ordering::Relaxed), 4);
}

#[test]
fn concurrent_reservations_on_one_host_are_atomic() {
    let ledger = Arc::new(NodeLedger::from_nodes([Node {
        id: "shared".to_string(),
        name: "shared".to_string(),
        total_memory: 1 << 20,
        total_cpus: 1024,
        is_healthy: true,
        ..Default::default()
    }]));

    let threads = 8;
    let per_thread = 50;
    let handles: Vec<_> = (0..threads)
        .map(|t| {
            let ledger = Arc::clone(&ledger);
            thread::spawn(move || {
                for i in 0..per_thread {
                    ledger
                        .reserve("shared", &container(&format!("t{t}-{i}"), 16, 1))
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let node = ledger.node("shared").unwrap();
    let total = (threads * per_thread) as i64;
    assert_eq!(node.used_memory, total * 16);
    assert_eq!(node.used_cpus, total);
    assert_eq!(node.containers.len(), threads * per_thread);
}

#[test]
fn concurrent_placements_across_hosts() {
    let hosts: Vec<Node> = (0..4)
        .map(|i| Node {
            id: format!("h{i}"),
            name: format!("h{i}"),
            total_memory: 1 << 30,
            total_cpus: 1 << 10,
            is_healthy: true,
            ..Default::default()
        })
        .collect();
    let ledger = Arc::new(NodeLedger::from_nodes(hosts));
    let placer = Arc::new(placer());

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let ledger = Arc::clone(&ledger);
            let placer = Arc::clone(&placer);
            thread::spawn(move || {
                for i in 0..25 {
                    placer
                        .place(&ledger, &container(&format!("t{t}-{i}"), 1024, 1))
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let snapshot = ledger.snapshot();
    let placed: usize = snapshot.iter().map(|n| n.containers.len()).sum();
    let used: i64 = snapshot.iter().map(|n| n.used_memory).sum();
    assert_eq!(placed, 100);
    assert_eq!(used, 100 * 1024);
}

#[test]
fn oversized_request_fails_everywhere() {
    let ledger = NodeLedger::from_nodes(cluster_to_nodes(
        &ClusterState {
            hosts: vec![host("a", 1024, 2), host("b", 2048, 2)],
        },
        &Normalizer::default(),
    ));

    let err = placer()
        .place(&ledger, &container("big", 4096, 1))
        .unwrap_err();

    assert!(matches!(err, PlacementError::NoResourcesAvailable));
    assert!(ledger.snapshot().iter().all(|n| n.containers.is_empty()));
}

#[test]
fn negative_request_is_refused_and_leaves_hosts_untouched() {
    let ledger = NodeLedger::from_nodes(cluster_to_nodes(
        &ClusterState {
            hosts: vec![host("a", 2048, 4)],
        },
        &Normalizer::default(),
    ));
    let raw = ContainerConfig::from_json(r#"{"Memory": -9223372036854775808}"#).unwrap();
    let container = Container::new("bad", Normalizer::default().normalize(raw));

    let err = placer().place(&ledger, &container).unwrap_err();

    assert!(matches!(err, PlacementError::InvalidRequest(_)));
    assert!(ledger.snapshot().iter().all(|n| n.containers.is_empty()));
}
