//! Per-pass bookkeeping of shared consumable resources.
//!
//! The ledger is built once at the start of a pass from fetched balances and
//! is the only source of truth for the rest of that pass. Every consuming
//! operation goes through a two-phase protocol:
//!
//! 1. [`ResourceLedger::reserve_all`] sets quantities aside without spending
//!    them (unit tokens stay in the pool, FIFO order is preserved).
//! 2. [`ResourceLedger::commit`] spends them once the operation succeeded, or
//!    [`ResourceLedger::release`] hands them back after a failure.
//!
//! Reservations are all-or-nothing across every kind in a cost.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use crate::core::SchedulerError;
use crate::util::{AssetId, ResourceCost, ResourceKind};

/// Fetched state of one pool, used to build the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoolSnapshot {
    /// A single numeric balance in base units.
    Fungible {
        /// Balance in base units.
        balance: u64,
    },
    /// An ordered list of single-use tokens.
    Units {
        /// Token ids in consumption order.
        tokens: Vec<AssetId>,
    },
}

#[derive(Debug)]
enum PoolState {
    Fungible {
        balance: u64,
        reserved: u64,
    },
    Units {
        tokens: VecDeque<AssetId>,
        reserved: HashSet<AssetId>,
    },
}

impl PoolState {
    fn from_snapshot(snapshot: PoolSnapshot) -> Self {
        match snapshot {
            PoolSnapshot::Fungible { balance } => Self::Fungible {
                balance,
                reserved: 0,
            },
            PoolSnapshot::Units { tokens } => {
                // paged listings can repeat an id; keep its first position
                let mut seen = HashSet::with_capacity(tokens.len());
                let tokens: VecDeque<AssetId> =
                    tokens.into_iter().filter(|t| seen.insert(t.clone())).collect();
                Self::Units {
                    tokens,
                    reserved: HashSet::new(),
                }
            }
        }
    }

    fn total(&self) -> u64 {
        match self {
            Self::Fungible { balance, .. } => *balance,
            Self::Units { tokens, .. } => tokens.len() as u64,
        }
    }

    fn available(&self) -> u64 {
        match self {
            Self::Fungible { balance, reserved } => balance - reserved,
            Self::Units { tokens, reserved } => (tokens.len() - reserved.len()) as u64,
        }
    }

    /// Caller has already checked `available() >= quantity`.
    fn grant(&mut self, quantity: u64) -> Grant {
        match self {
            Self::Fungible { reserved, .. } => {
                *reserved += quantity;
                Grant::Amount(quantity)
            }
            Self::Units { tokens, reserved } => {
                let take: Vec<AssetId> = tokens
                    .iter()
                    .filter(|t| !reserved.contains(*t))
                    .take(usize::try_from(quantity).unwrap_or(usize::MAX))
                    .cloned()
                    .collect();
                reserved.extend(take.iter().cloned());
                Grant::Tokens(take)
            }
        }
    }

    fn spend(&mut self, grant: &Grant) {
        match (self, grant) {
            (Self::Fungible { balance, reserved }, Grant::Amount(q)) => {
                *reserved -= q;
                *balance -= q;
            }
            (Self::Units { tokens, reserved }, Grant::Tokens(ids)) => {
                for id in ids {
                    reserved.remove(id);
                }
                tokens.retain(|t| !ids.contains(t));
            }
            _ => tracing::error!("grant shape does not match pool shape"),
        }
    }

    fn unreserve(&mut self, grant: &Grant) {
        match (self, grant) {
            (Self::Fungible { reserved, .. }, Grant::Amount(q)) => *reserved -= q,
            (Self::Units { reserved, .. }, Grant::Tokens(ids)) => {
                for id in ids {
                    reserved.remove(id);
                }
            }
            _ => tracing::error!("grant shape does not match pool shape"),
        }
    }
}

/// What a reservation set aside from one pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Grant {
    /// Base units of a fungible balance.
    Amount(u64),
    /// Specific unit tokens, in FIFO order.
    Tokens(Vec<AssetId>),
}

impl Grant {
    /// Quantity represented by the grant.
    #[must_use]
    pub fn quantity(&self) -> u64 {
        match self {
            Self::Amount(q) => *q,
            Self::Tokens(ids) => ids.len() as u64,
        }
    }
}

/// Handle to resources set aside but not yet spent.
///
/// Consumed by [`ResourceLedger::commit`] or [`ResourceLedger::release`].
#[derive(Debug, PartialEq, Eq)]
#[must_use = "a reservation must be committed or released"]
pub struct Reservation {
    id: u64,
    grants: Vec<(ResourceKind, Grant)>,
}

impl Reservation {
    /// Ledger-local reservation id.
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Grants per resource kind, in kind order.
    #[must_use]
    pub fn grants(&self) -> &[(ResourceKind, Grant)] {
        &self.grants
    }

    /// Grant for a single kind, if the reservation covers it.
    #[must_use]
    pub fn grant(&self, kind: &ResourceKind) -> Option<&Grant> {
        self.grants.iter().find(|(k, _)| k == kind).map(|(_, g)| g)
    }
}

/// Remaining quantities of all pools in the ledger.
pub type LedgerSnapshot = BTreeMap<ResourceKind, u64>;

/// Tracks every shared pool for the duration of one pass.
#[derive(Debug, Default)]
pub struct ResourceLedger {
    pools: BTreeMap<ResourceKind, PoolState>,
    initial: BTreeMap<ResourceKind, u64>,
    committed: BTreeMap<ResourceKind, u64>,
    pending: HashMap<u64, Vec<(ResourceKind, Grant)>>,
    next_id: u64,
}

impl ResourceLedger {
    /// Create an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a ledger from fetched pool snapshots.
    pub fn from_snapshots(snapshots: impl IntoIterator<Item = (ResourceKind, PoolSnapshot)>) -> Self {
        let mut ledger = Self::new();
        for (kind, snapshot) in snapshots {
            ledger.insert_pool(kind, snapshot);
        }
        ledger
    }

    /// Builder-style [`insert_pool`](Self::insert_pool).
    #[must_use]
    pub fn with_pool(mut self, kind: impl Into<ResourceKind>, snapshot: PoolSnapshot) -> Self {
        self.insert_pool(kind.into(), snapshot);
        self
    }

    /// Add or replace a pool. Replacing discards outstanding reservations on it.
    pub fn insert_pool(&mut self, kind: ResourceKind, snapshot: PoolSnapshot) {
        let state = PoolState::from_snapshot(snapshot);
        self.initial.insert(kind.clone(), state.total());
        self.committed.insert(kind.clone(), 0);
        self.pending
            .retain(|_, grants| grants.iter().all(|(k, _)| *k != kind));
        self.pools.insert(kind, state);
    }

    /// Unreserved quantity left in a pool.
    #[must_use]
    pub fn remaining(&self, kind: &ResourceKind) -> Option<u64> {
        self.pools.get(kind).map(PoolState::available)
    }

    /// Quantity observed when the pool was loaded.
    #[must_use]
    pub fn initial(&self, kind: &ResourceKind) -> Option<u64> {
        self.initial.get(kind).copied()
    }

    /// Quantity spent through commits since the pool was loaded.
    #[must_use]
    pub fn committed(&self, kind: &ResourceKind) -> Option<u64> {
        self.committed.get(kind).copied()
    }

    /// Number of reservations neither committed nor released.
    #[must_use]
    pub fn outstanding(&self) -> usize {
        self.pending.len()
    }

    /// Unreserved quantity of every pool.
    #[must_use]
    pub fn snapshot(&self) -> LedgerSnapshot {
        self.pools
            .iter()
            .map(|(k, p)| (k.clone(), p.available()))
            .collect()
    }

    /// Reserve `quantity` from a single pool.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::UnknownResource`] or
    /// [`SchedulerError::InsufficientResource`]; nothing is reserved on error.
    pub fn reserve(
        &mut self,
        kind: &ResourceKind,
        quantity: u64,
    ) -> Result<Reservation, SchedulerError> {
        self.reserve_all(&ResourceCost::none().with(kind.clone(), quantity))
    }

    /// Reserve a whole cost atomically: either every kind is covered or
    /// nothing is reserved.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::UnknownResource`] or
    /// [`SchedulerError::InsufficientResource`] naming the first kind (in
    /// kind order) that cannot be covered.
    pub fn reserve_all(&mut self, cost: &ResourceCost) -> Result<Reservation, SchedulerError> {
        for (kind, quantity) in cost.iter() {
            let pool = self
                .pools
                .get(kind)
                .ok_or_else(|| SchedulerError::UnknownResource(kind.clone()))?;
            let available = pool.available();
            if quantity > available {
                return Err(SchedulerError::InsufficientResource {
                    kind: kind.clone(),
                    requested: quantity,
                    available,
                });
            }
        }

        let mut grants = Vec::new();
        for (kind, quantity) in cost.iter() {
            if let Some(pool) = self.pools.get_mut(kind) {
                grants.push((kind.clone(), pool.grant(quantity)));
            }
        }

        let id = self.next_id;
        self.next_id += 1;
        self.pending.insert(id, grants.clone());
        tracing::debug!("reservation {} holds {:?}", id, grants);
        Ok(Reservation { id, grants })
    }

    /// Spend a reservation permanently.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::UnknownReservation`] if it does not belong to this
    /// ledger (or its pool was replaced).
    pub fn commit(&mut self, reservation: Reservation) -> Result<(), SchedulerError> {
        let grants = self
            .pending
            .remove(&reservation.id)
            .ok_or(SchedulerError::UnknownReservation(reservation.id))?;
        for (kind, grant) in &grants {
            if let Some(pool) = self.pools.get_mut(kind) {
                pool.spend(grant);
            }
            *self.committed.entry(kind.clone()).or_default() += grant.quantity();
        }
        tracing::debug!("reservation {} committed", reservation.id);
        Ok(())
    }

    /// Return a reservation to its pools unchanged.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::UnknownReservation`] if it does not belong to this
    /// ledger (or its pool was replaced).
    pub fn release(&mut self, reservation: Reservation) -> Result<(), SchedulerError> {
        let grants = self
            .pending
            .remove(&reservation.id)
            .ok_or(SchedulerError::UnknownReservation(reservation.id))?;
        for (kind, grant) in &grants {
            if let Some(pool) = self.pools.get_mut(kind) {
                pool.unreserve(grant);
            }
        }
        tracing::debug!("reservation {} released", reservation.id);
        Ok(())
    }
}
