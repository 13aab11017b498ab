//! Placement error types.

use thiserror::Error;

/// Result type alias for placement operations.
pub type PlacementResult<T> = Result<T, PlacementError>;

/// Errors that can occur while normalizing, ranking or reserving.
#[derive(Debug, Error)]
pub enum PlacementError {
    /// A single host rejected a reservation. The placement loop treats this
    /// as a signal to try the next-ranked host.
    #[error(
        "not enough resources on node {node}: requested {memory} memory / {cpus} cpus, \
         total {total_memory} memory / {total_cpus} cpus"
    )]
    InsufficientResources {
        node: String,
        memory: i64,
        cpus: i64,
        total_memory: i64,
        total_cpus: i64,
    },

    /// The request itself cannot be reserved anywhere, e.g. a negative amount.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("no resources available to schedule container")]
    NoResourcesAvailable,

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid expression: {0}")]
    InvalidExpression(String),

    #[error("strategy not supported: {0}")]
    UnsupportedStrategy(String),

    #[error("unknown node: {0}")]
    UnknownNode(String),
}

impl PlacementError {
    /// True for capacity failures, as opposed to malformed input.
    pub fn is_resource_error(&self) -> bool {
        matches!(
            self,
            PlacementError::InsufficientResources { .. } | PlacementError::NoResourcesAvailable
        )
    }
}
