//! Placement engine — ranks nodes and commits a reservation.
//!
//! The ranking is computed from a snapshot that can be stale by the time a
//! reservation runs, so a node turning a reservation down is expected: the
//! placer moves on to the next-ranked node and only gives up once the
//! ranking is exhausted.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use berth_core::PlacementConfig;
use tracing::{debug, info, warn};

use crate::error::{PlacementError, PlacementResult};
use crate::expr::{ConstraintMatcher, HintExpr};
use crate::node::{Container, Host, Node, Reservation};
use crate::observer::{NoopObserver, PlacementObserver, TracingObserver};
use crate::request::ResourceRequest;
use crate::strategy::{self, PlacementStrategy, RankedNode};

/// Shared per-node record of used capacity.
///
/// Each node sits behind its own mutex, so reservations on one node are
/// serialized while reservations on different nodes never contend.
pub struct NodeLedger {
    inner: RwLock<LedgerInner>,
    observer: Arc<dyn PlacementObserver>,
}

impl Default for NodeLedger {
    fn default() -> Self {
        Self {
            inner: RwLock::default(),
            observer: Arc::new(NoopObserver),
        }
    }
}

#[derive(Default)]
struct LedgerInner {
    /// Node ids in insertion order.
    order: Vec<String>,
    nodes: HashMap<String, Arc<Mutex<Node>>>,
}

impl NodeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_nodes(nodes: impl IntoIterator<Item = Node>) -> Self {
        let ledger = Self::new();
        for node in nodes {
            ledger.upsert(node);
        }
        ledger
    }

    pub fn from_hosts<H: Host>(hosts: &[H]) -> Self {
        Self::from_nodes(hosts.iter().map(Node::from_host))
    }

    /// Report reservations made through [`NodeLedger::reserve`].
    pub fn with_observer(mut self, observer: Arc<dyn PlacementObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Insert a node, or replace the state of a known one.
    pub fn upsert(&self, node: Node) {
        let mut inner = write(&self.inner);
        match inner.nodes.get(&node.id) {
            Some(entry) => *lock(entry) = node,
            None => {
                inner.order.push(node.id.clone());
                inner.nodes.insert(node.id.clone(), Arc::new(Mutex::new(node)));
            }
        }
    }

    pub fn remove(&self, node_id: &str) -> Option<Node> {
        let mut inner = write(&self.inner);
        let entry = inner.nodes.remove(node_id)?;
        inner.order.retain(|id| id != node_id);
        let node = lock(&entry).clone();
        Some(node)
    }

    pub fn len(&self) -> usize {
        read(&self.inner).order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current state of one node.
    pub fn node(&self, node_id: &str) -> Option<Node> {
        let entry = read(&self.inner).nodes.get(node_id).cloned()?;
        let node = lock(&entry).clone();
        Some(node)
    }

    /// Copy every node, in insertion order.
    pub fn snapshot(&self) -> Vec<Node> {
        let inner = read(&self.inner);
        inner
            .order
            .iter()
            .filter_map(|id| inner.nodes.get(id))
            .map(|entry| lock(entry).clone())
            .collect()
    }

    /// Reserve the container's resources on one node, reporting the
    /// outcome to the ledger's observer.
    pub fn reserve(&self, node_id: &str, container: &Container) -> PlacementResult<Reservation> {
        self.reserve_observed(node_id, container, self.observer.as_ref())
    }

    fn reserve_observed(
        &self,
        node_id: &str,
        container: &Container,
        observer: &dyn PlacementObserver,
    ) -> PlacementResult<Reservation> {
        let result = self.try_reserve(node_id, container);
        match &result {
            Ok(reservation) => observer.resources_reserved(reservation),
            Err(e) => observer.reservation_rejected(node_id, e),
        }
        result
    }

    fn try_reserve(&self, node_id: &str, container: &Container) -> PlacementResult<Reservation> {
        let entry = read(&self.inner)
            .nodes
            .get(node_id)
            .cloned()
            .ok_or_else(|| PlacementError::UnknownNode(node_id.to_string()))?;
        let mut node = lock(&entry);
        node.add_container(container)
    }
}

// Poisoning is ignored: a reservation either fails its capacity check
// before touching the node or completes with plain field writes.
fn lock(entry: &Mutex<Node>) -> MutexGuard<'_, Node> {
    entry.lock().unwrap_or_else(PoisonError::into_inner)
}

fn read(lock: &RwLock<LedgerInner>) -> std::sync::RwLockReadGuard<'_, LedgerInner> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write(lock: &RwLock<LedgerInner>) -> std::sync::RwLockWriteGuard<'_, LedgerInner> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

/// Outcome of a successful placement.
#[derive(Debug, Clone)]
pub struct Placement {
    pub node_id: String,
    pub node_name: String,
    pub weight: i64,
    /// Reservations attempted, including the successful one.
    pub attempts: usize,
    pub reservation: Reservation,
}

/// Filters, ranks and reserves.
pub struct Placer {
    strategy: Box<dyn PlacementStrategy>,
    observer: Arc<dyn PlacementObserver>,
    matcher: Option<Box<dyn ConstraintMatcher>>,
    skip_unhealthy: bool,
}

impl Placer {
    pub fn new(strategy: Box<dyn PlacementStrategy>, observer: Arc<dyn PlacementObserver>) -> Self {
        Self {
            strategy,
            observer,
            matcher: None,
            skip_unhealthy: true,
        }
    }

    /// Build a placer from `[placement]` settings, logging through `tracing`.
    pub fn from_config(config: &PlacementConfig) -> PlacementResult<Self> {
        Self::from_config_with_observer(config, Arc::new(TracingObserver))
    }

    pub fn from_config_with_observer(
        config: &PlacementConfig,
        observer: Arc<dyn PlacementObserver>,
    ) -> PlacementResult<Self> {
        let strategy = strategy::from_name(&config.strategy, observer.clone())?;
        Ok(Self::new(strategy, observer).skip_unhealthy(config.skip_unhealthy))
    }

    pub fn with_matcher(mut self, matcher: impl ConstraintMatcher + 'static) -> Self {
        self.matcher = Some(Box::new(matcher));
        self
    }

    pub fn skip_unhealthy(mut self, skip: bool) -> Self {
        self.skip_unhealthy = skip;
        self
    }

    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    /// Drop nodes that cannot take the request at all: unhealthy ones (when
    /// configured) and, with a matcher, those failing a hard hint.
    pub fn candidates(
        &self,
        request: &ResourceRequest,
        mut nodes: Vec<Node>,
    ) -> PlacementResult<Vec<Node>> {
        let hints = match &self.matcher {
            Some(_) => request
                .constraints()
                .iter()
                .chain(request.affinities().iter())
                .map(|expr| HintExpr::parse(expr))
                .collect::<PlacementResult<Vec<_>>>()?,
            None => {
                self.report_unenforced(request);
                Vec::new()
            }
        };

        nodes.retain(|node| self.admits(node, &hints));
        Ok(nodes)
    }

    fn report_unenforced(&self, request: &ResourceRequest) {
        let hard: Vec<HintExpr> = request
            .constraints()
            .iter()
            .chain(request.affinities().iter())
            .filter_map(|expr| HintExpr::parse(expr).ok())
            .filter(|hint| !hint.soft)
            .collect();
        if hard.is_empty() {
            return;
        }
        let listed: Vec<String> = hard.iter().map(HintExpr::to_string).collect();
        warn!(
            hints = %listed.join(", "),
            "no constraint matcher configured, hard hints are not enforced"
        );
        self.observer.hints_unenforced(&hard);
    }

    fn admits(&self, node: &Node, hints: &[HintExpr]) -> bool {
        if self.skip_unhealthy && !node.is_healthy {
            self.observer.node_filtered(node, "node is unhealthy");
            return false;
        }
        let Some(matcher) = &self.matcher else {
            return true;
        };
        for hint in hints {
            if !matcher.matches(node, hint) && !hint.soft {
                self.observer.node_filtered(node, "hard hint not satisfied");
                return false;
            }
        }
        true
    }

    pub fn rank<'a>(
        &self,
        request: &ResourceRequest,
        nodes: &'a [Node],
    ) -> PlacementResult<Vec<RankedNode<'a>>> {
        self.strategy.rank(request, nodes)
    }

    /// Place a container: rank a fresh snapshot of the ledger and reserve
    /// on the best node that accepts.
    pub fn place(&self, ledger: &NodeLedger, container: &Container) -> PlacementResult<Placement> {
        let request = container.config.clone().unwrap_or_default();
        let nodes = self.candidates(&request, ledger.snapshot())?;
        let ranked = self.rank(&request, &nodes)?;

        debug!(
            container = %container.id,
            strategy = self.strategy.name(),
            candidates = ranked.len(),
            "ranked nodes"
        );

        let observer = self.observer.as_ref();
        for (i, candidate) in ranked.iter().enumerate() {
            match ledger.reserve_observed(&candidate.node.id, container, observer) {
                Ok(reservation) => {
                    info!(
                        container = %container.id,
                        node = %candidate.node.name,
                        weight = candidate.weight,
                        attempts = i + 1,
                        "container placed"
                    );
                    return Ok(Placement {
                        node_id: candidate.node.id.clone(),
                        node_name: candidate.node.name.clone(),
                        weight: candidate.weight,
                        attempts: i + 1,
                        reservation,
                    });
                }
                Err(
                    PlacementError::InsufficientResources { .. } | PlacementError::UnknownNode(_),
                ) => continue,
                Err(e) => return Err(e),
            }
        }

        warn!(
            container = %container.id,
            tried = ranked.len(),
            "every ranked node rejected the reservation"
        );
        Err(PlacementError::NoResourcesAvailable)
    }
}
