//! Observability hooks for ranking and reservation.
//!
//! Scoring and reservation stay pure; anything worth logging is handed to
//! a [`PlacementObserver`] injected by the caller.

use tracing::debug;

use crate::error::PlacementError;
use crate::expr::HintExpr;
use crate::node::{Node, Reservation};
use crate::strategy::Score;

/// Receives placement events. Every method defaults to a no-op.
pub trait PlacementObserver: Send + Sync {
    /// A node was left out of the ranking.
    fn node_filtered(&self, _node: &Node, _reason: &str) {}

    /// A node qualified and was given a weight.
    fn node_weighed(&self, _node: &Node, _score: &Score, _weight: i64) {}

    /// Resources were committed on a node.
    fn resources_reserved(&self, _reservation: &Reservation) {}

    /// A node turned down a reservation.
    fn reservation_rejected(&self, _node_id: &str, _error: &PlacementError) {}

    /// Hard hints were left unchecked because no matcher is configured.
    fn hints_unenforced(&self, _hints: &[HintExpr]) {}
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl PlacementObserver for NoopObserver {}

/// Emits each event as a structured `tracing` debug record.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl PlacementObserver for TracingObserver {
    fn node_filtered(&self, node: &Node, reason: &str) {
        debug!(
            node = %node.id,
            total_memory = node.total_memory,
            total_cpus = node.total_cpus,
            used_memory = node.used_memory,
            used_cpus = node.used_cpus,
            reason,
            "node filtered"
        );
    }

    fn node_weighed(&self, node: &Node, score: &Score, weight: i64) {
        debug!(
            node = %node.id,
            cpu = score.cpu,
            memory = score.memory,
            blkio = score.blkio,
            weight,
            "node weighed"
        );
    }

    fn resources_reserved(&self, reservation: &Reservation) {
        debug!(
            node = %reservation.node_id,
            container = %reservation.container_id,
            memory = reservation.requested.memory,
            cpus = reservation.requested.cpus,
            blkio = reservation.requested.blkio,
            used_memory_before = reservation.before.memory,
            used_cpus_before = reservation.before.cpus,
            used_blkio_before = reservation.before.blkio,
            used_memory_after = reservation.after.memory,
            used_cpus_after = reservation.after.cpus,
            used_blkio_after = reservation.after.blkio,
            "resources reserved"
        );
    }

    fn reservation_rejected(&self, node_id: &str, error: &PlacementError) {
        debug!(node = node_id, error = %error, "reservation rejected");
    }
}
