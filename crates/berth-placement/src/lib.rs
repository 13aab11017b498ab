//! berth-placement — node selection for container placement.
//!
//! Given a container request and a snapshot of candidate hosts, this crate
//! picks the host to run on and keeps a ledger of consumed capacity. It does
//! no I/O: hosts are read through the [`Host`] trait and everything else is
//! in-memory computation.
//!
//! # Components
//!
//! - **`request`** — Request normalization (field reconciliation, hints)
//! - **`expr`** — Affinity/constraint expression parsing
//! - **`node`** — Host snapshots and capacity reservation
//! - **`strategy`** — Weighted ranking of hosts
//! - **`observer`** — Injected observability callback
//! - **`placer`** — Shared ledger and the reserve-or-fall-through loop
//! - **`convert`** — Conversions from `berth-core` state types
//!
//! # Flow
//!
//! ```text
//! ContainerConfig ──normalize──▶ ResourceRequest
//!                                     │
//! Host ──from_host──▶ Node ──rank──▶ [RankedNode] ──reserve in order──▶ Placement
//! ```

pub mod convert;
pub mod error;
pub mod expr;
pub mod node;
pub mod observer;
pub mod placer;
pub mod request;
pub mod strategy;

pub use convert::{StaticHost, cluster_to_nodes, container_from_state};
pub use error::{PlacementError, PlacementResult};
pub use expr::{ConstraintMatcher, HintExpr};
pub use node::{Container, Containers, Host, Image, Node, Reservation, Usage};
pub use observer::{NoopObserver, PlacementObserver, TracingObserver};
pub use placer::{NodeLedger, Placement, Placer};
pub use request::{Normalizer, ResourceRequest};
pub use strategy::{PlacementStrategy, RankedNode, Score, WeightedStrategy};
