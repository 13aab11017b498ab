//! berth-core — shared types for the berth placement engine.
//!
//! Holds the raw, wire-shaped inputs the placement crate works from:
//! container requests as clients submit them, host and cluster state as
//! read from a cluster description, and the `berth.toml` configuration.

pub mod config;
pub mod types;

pub use config::{BerthConfig, LogConfig, PlacementConfig};
pub use types::*;
