//! Weighted ranking of candidate nodes.
//!
//! Each node gets three post-placement utilization percentages (cpu,
//! memory, blkio). Their sum is the node's weight, and lower weights rank
//! first, so containers spread towards the least-utilized hosts.

use std::cmp::Ordering;
use std::sync::Arc;

use crate::error::{PlacementError, PlacementResult};
use crate::node::Node;
use crate::observer::{PlacementObserver, TracingObserver};
use crate::request::ResourceRequest;

/// Fixed baseline added to the blkio denominator so an idle node does not
/// score every blkio request at 100%.
const BLKIO_BASELINE: i64 = 500;

/// Score given to a resource the request does not ask for.
const NEUTRAL_SCORE: i64 = 100;

/// Score for a resource whose percentage cannot be computed (a zero or
/// negative denominator, or an overflow). Never qualifies.
const UNSCHEDULABLE: i64 = i64::MAX;

/// Per-resource utilization percentages after placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Score {
    pub cpu: i64,
    pub memory: i64,
    pub blkio: i64,
}

impl Score {
    /// Compute the scores of placing `request` on `node`.
    pub fn compute(request: &ResourceRequest, node: &Node) -> Self {
        let cpus = request.cpu_shares();
        let memory = request.memory();
        let blkio = request.blkio_weight();

        let cpu = if cpus > 0 {
            percent(node.used_cpus.checked_add(cpus), Some(node.total_cpus))
        } else {
            NEUTRAL_SCORE
        };
        let memory = if memory > 0 {
            percent(node.used_memory.checked_add(memory), Some(node.total_memory))
        } else {
            NEUTRAL_SCORE
        };
        let blkio = if blkio > 0 {
            let baseline = node
                .used_blkio
                .checked_add(blkio)
                .and_then(|v| v.checked_add(BLKIO_BASELINE));
            percent(Some(blkio), baseline)
        } else {
            NEUTRAL_SCORE
        };

        Self { cpu, memory, blkio }
    }

    /// A node qualifies only if no resource would go above 100%.
    pub fn qualifies(&self) -> bool {
        self.cpu <= 100 && self.memory <= 100 && self.blkio <= 100
    }

    pub fn weight(&self) -> i64 {
        self.cpu.saturating_add(self.memory).saturating_add(self.blkio)
    }
}

fn percent(part: Option<i64>, whole: Option<i64>) -> i64 {
    match (part.and_then(|p| p.checked_mul(100)), whole) {
        (Some(part), Some(whole)) if whole > 0 => part / whole,
        _ => UNSCHEDULABLE,
    }
}

/// A qualifying node and its weight (lower is preferred).
#[derive(Debug, Clone)]
pub struct RankedNode<'a> {
    pub node: &'a Node,
    pub score: Score,
    pub weight: i64,
}

/// Orders candidate nodes for a request.
pub trait PlacementStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Rank `nodes` best first, or fail with
    /// [`PlacementError::NoResourcesAvailable`] when none qualifies.
    fn rank<'a>(
        &self,
        request: &ResourceRequest,
        nodes: &'a [Node],
    ) -> PlacementResult<Vec<RankedNode<'a>>>;
}

/// Look up a strategy by its configured name.
pub fn from_name(
    name: &str,
    observer: Arc<dyn PlacementObserver>,
) -> PlacementResult<Box<dyn PlacementStrategy>> {
    match name {
        WeightedStrategy::NAME => Ok(Box::new(WeightedStrategy::new(observer))),
        other => Err(PlacementError::UnsupportedStrategy(other.to_string())),
    }
}

/// Least-utilized-first ranking over cpu, memory and blkio.
pub struct WeightedStrategy {
    observer: Arc<dyn PlacementObserver>,
}

impl Default for WeightedStrategy {
    fn default() -> Self {
        Self::new(Arc::new(TracingObserver))
    }
}

impl WeightedStrategy {
    pub const NAME: &'static str = "weighted";

    pub fn new(observer: Arc<dyn PlacementObserver>) -> Self {
        Self { observer }
    }
}

impl PlacementStrategy for WeightedStrategy {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn rank<'a>(
        &self,
        request: &ResourceRequest,
        nodes: &'a [Node],
    ) -> PlacementResult<Vec<RankedNode<'a>>> {
        let mut ranked = Vec::with_capacity(nodes.len());

        for node in nodes {
            // Totals, not what is left: a node that passes here can still
            // turn the reservation down.
            if node.total_memory < request.memory() || node.total_cpus < request.cpu_shares() {
                self.observer.node_filtered(node, "request exceeds total capacity");
                continue;
            }

            let score = Score::compute(request, node);
            if !score.qualifies() {
                self.observer.node_filtered(node, "utilization would exceed 100%");
                continue;
            }

            let weight = score.weight();
            self.observer.node_weighed(node, &score, weight);
            ranked.push(RankedNode {
                node,
                score,
                weight,
            });
        }

        if ranked.is_empty() {
            return Err(PlacementError::NoResourcesAvailable);
        }

        ranked.sort_by(compare_ranked);
        Ok(ranked)
    }
}

/// Ascending weight; equal weights favor the node with fewer containers.
fn compare_ranked(a: &RankedNode<'_>, b: &RankedNode<'_>) -> Ordering {
    a.weight
        .cmp(&b.weight)
        .then_with(|| a.node.containers.len().cmp(&b.node.containers.len()))
}
