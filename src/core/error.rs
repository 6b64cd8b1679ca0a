//! Error types for scheduler operations.

use thiserror::Error;

use crate::util::ResourceKind;

/// Errors produced by scheduler components.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// A reservation asked for more than the pool has left.
    #[error("insufficient {kind}: requested {requested}, available {available}")]
    InsufficientResource {
        /// Pool that could not cover the request.
        kind: ResourceKind,
        /// Quantity requested.
        requested: u64,
        /// Quantity still unreserved.
        available: u64,
    },
    /// The ledger has no pool with this name.
    #[error("unknown resource: {0}")]
    UnknownResource(ResourceKind),
    /// The reservation was already committed, released, or never existed.
    #[error("unknown reservation: {0}")]
    UnknownReservation(u64),
    /// An inventory or balance query failed.
    #[error("fetch failed: {0}")]
    Fetch(String),
    /// Data from a collaborator could not be interpreted.
    #[error("malformed data: {0}")]
    Malformed(String),
    /// Configuration is invalid.
    #[error("config error: {0}")]
    Config(String),
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
