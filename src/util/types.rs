//! Identifier and cost types shared across the scheduler.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque identifier of an externally owned asset (NFT id, seal id, ...).
pub type AssetId = String;

/// Identifier of an asset class as named in configuration.
pub type ClassId = String;

/// Name of a shared consumable resource pool.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceKind(pub String);

impl ResourceKind {
    /// Create a resource kind from any string-like name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Borrow the underlying name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ResourceKind {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Per-operation cost: resource kind to quantity in ledger base units.
///
/// Ordered so that reservations and log lines are deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceCost(pub BTreeMap<ResourceKind, u64>);

impl ResourceCost {
    /// An empty cost (the operation consumes nothing shared).
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Add or replace a cost entry.
    #[must_use]
    pub fn with(mut self, kind: impl Into<ResourceKind>, quantity: u64) -> Self {
        self.0.insert(kind.into(), quantity);
        self
    }

    /// Iterate `(kind, quantity)` pairs in kind order.
    pub fn iter(&self) -> impl Iterator<Item = (&ResourceKind, u64)> {
        self.0.iter().map(|(k, q)| (k, *q))
    }

    /// True when no resource is required.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.values().all(|q| *q == 0)
    }
}
