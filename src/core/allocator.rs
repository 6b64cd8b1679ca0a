//! Greedy, priority-ordered allocation of shared resources to asset classes.
//!
//! Classes are visited in the order they are configured; there is no dynamic
//! scarcity heuristic. Under persistent scarcity a high-priority class can
//! starve every class behind it indefinitely. That is a known limitation of
//! the fixed order, not something the allocator tries to correct.
//!
//! Within a class, the first failed reservation or failed operation stops the
//! class for the rest of the pass. Later assets are deferred, never skipped
//! over, because they are no more likely to succeed.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::classifier::Classified;
use crate::core::executor::{ExecutionOutcome, OperationExecutor, TransactionSubmitter};
use crate::core::ledger::ResourceLedger;
use crate::core::operation::Operation;
use crate::core::SchedulerError;
use crate::util::{AssetId, ClassId, ResourceCost, ResourceKind};

/// Immutable description of one asset class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetClass {
    /// Class identifier.
    pub id: ClassId,
    /// Inventory template id.
    pub template_id: u64,
    /// Hours an asset must wait between productions.
    pub cooldown_hours: u32,
    /// Recipe used when producing.
    pub recipe_id: u64,
    /// Contract that receives recharges and performs crafts.
    pub destination: String,
    /// Resources spent per recharge, in ledger base units.
    pub recharge_cost: ResourceCost,
    /// Whether depleted assets of this class are recharged.
    pub recharge_enabled: bool,
    /// Whether eligible assets of this class produce.
    pub produce_enabled: bool,
}

/// Why a class stopped before handling all of its assets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// Recharge or production is switched off for the class.
    Disabled,
    /// A pool could not cover the next recharge.
    Exhausted {
        /// Pool that ran short.
        kind: ResourceKind,
        /// Quantity needed.
        requested: u64,
        /// Quantity left.
        available: u64,
    },
    /// The ledger refused the reservation for another reason.
    Ledger(String),
    /// The transaction was rejected.
    OperationFailed(String),
    /// The transaction hit a billing or rate limit.
    Throttled(String),
}

impl StopReason {
    /// True when the stop was caused by a submission failure.
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        matches!(self, Self::OperationFailed(_) | Self::Throttled(_))
    }
}

/// What happened to one class during a pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassAllocation {
    /// Class identifier.
    pub class: ClassId,
    /// Assets recharged, in execution order.
    pub recharged: Vec<AssetId>,
    /// Production batches executed, in execution order.
    pub produced: Vec<Vec<AssetId>>,
    /// Depleted assets left for a later pass.
    pub deferred_recharge: Vec<AssetId>,
    /// Eligible assets left for a later pass.
    pub deferred_production: Vec<AssetId>,
    /// Resources spent by committed recharges.
    pub committed: BTreeMap<ResourceKind, u64>,
    /// Why recharging stopped early, if it did.
    pub recharge_stop: Option<StopReason>,
    /// Why production stopped early, if it did.
    pub production_stop: Option<StopReason>,
}

impl ClassAllocation {
    fn new(class: &ClassId) -> Self {
        Self {
            class: class.clone(),
            ..Self::default()
        }
    }

    /// True if a recharge or production submission failed.
    #[must_use]
    pub fn any_failure(&self) -> bool {
        self.recharge_stop.as_ref().is_some_and(StopReason::is_failure)
            || self.production_stop.as_ref().is_some_and(StopReason::is_failure)
    }

    /// True if a submission was throttled.
    #[must_use]
    pub fn throttled(&self) -> bool {
        matches!(self.recharge_stop, Some(StopReason::Throttled(_)))
            || matches!(self.production_stop, Some(StopReason::Throttled(_)))
    }
}

/// Per-pass record of what each class received. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllocationPlan {
    /// Classes in processing order.
    pub classes: Vec<ClassAllocation>,
}

impl AllocationPlan {
    /// Get or create the entry for a class, keeping first-seen order.
    pub fn entry(&mut self, class: &ClassId) -> &mut ClassAllocation {
        let index = if let Some(i) = self.classes.iter().position(|c| &c.class == class) {
            i
        } else {
            self.classes.push(ClassAllocation::new(class));
            self.classes.len() - 1
        };
        &mut self.classes[index]
    }

    /// Entry for a class, if it was processed.
    #[must_use]
    pub fn get(&self, class: &str) -> Option<&ClassAllocation> {
        self.classes.iter().find(|c| c.class == class)
    }

    /// Total recharges executed.
    #[must_use]
    pub fn recharges(&self) -> usize {
        self.classes.iter().map(|c| c.recharged.len()).sum()
    }

    /// Total production batches executed.
    #[must_use]
    pub fn production_batches(&self) -> usize {
        self.classes.iter().map(|c| c.produced.len()).sum()
    }

    /// Total assets that produced.
    #[must_use]
    pub fn produced_instances(&self) -> usize {
        self.classes
            .iter()
            .flat_map(|c| c.produced.iter())
            .map(Vec::len)
            .sum()
    }

    /// Depleted assets deferred because a pool ran short.
    #[must_use]
    pub fn skipped_for_scarcity(&self) -> usize {
        self.classes
            .iter()
            .filter(|c| matches!(c.recharge_stop, Some(StopReason::Exhausted { .. })))
            .map(|c| c.deferred_recharge.len())
            .sum()
    }

    /// Total committed per resource across classes.
    #[must_use]
    pub fn committed(&self) -> BTreeMap<ResourceKind, u64> {
        let mut totals = BTreeMap::new();
        for class in &self.classes {
            for (kind, q) in &class.committed {
                *totals.entry(kind.clone()).or_default() += q;
            }
        }
        totals
    }

    /// True if any submission failed.
    #[must_use]
    pub fn any_failure(&self) -> bool {
        self.classes.iter().any(ClassAllocation::any_failure)
    }

    /// True if any submission was throttled.
    #[must_use]
    pub fn throttled(&self) -> bool {
        self.classes.iter().any(ClassAllocation::throttled)
    }
}

/// Greedy allocator parameterised by the production batch limit.
#[derive(Debug, Clone, Copy)]
pub struct Allocator {
    max_batch_size: usize,
}

impl Allocator {
    /// Create an allocator; a batch size of 0 is treated as 1.
    #[must_use]
    pub fn new(max_batch_size: usize) -> Self {
        Self {
            max_batch_size: max_batch_size.max(1),
        }
    }

    /// Configured batch limit.
    #[must_use]
    pub const fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }

    /// Recharge depleted assets of one class, in fetch order, until a pool
    /// runs short or a submission fails.
    pub async fn recharge<S: TransactionSubmitter>(
        &self,
        class: &AssetClass,
        needs_charge: &[AssetId],
        ledger: &mut ResourceLedger,
        executor: &OperationExecutor<S>,
        out: &mut ClassAllocation,
    ) {
        if needs_charge.is_empty() {
            return;
        }
        if !class.recharge_enabled {
            tracing::info!(
                "recharge disabled for {}; {} assets left depleted",
                class.id,
                needs_charge.len()
            );
            out.deferred_recharge.extend_from_slice(needs_charge);
            out.recharge_stop = Some(StopReason::Disabled);
            return;
        }

        tracing::info!("recharging {} {}", needs_charge.len(), class.id);
        for (i, asset) in needs_charge.iter().enumerate() {
            let reservation = match ledger.reserve_all(&class.recharge_cost) {
                Ok(r) => r,
                Err(e) => {
                    tracing::info!(
                        "cannot continue recharging {}: {} ({} assets deferred)",
                        class.id,
                        e,
                        needs_charge.len() - i
                    );
                    out.deferred_recharge.extend_from_slice(&needs_charge[i..]);
                    out.recharge_stop = Some(match e {
                        SchedulerError::InsufficientResource {
                            kind,
                            requested,
                            available,
                        } => StopReason::Exhausted {
                            kind,
                            requested,
                            available,
                        },
                        other => StopReason::Ledger(other.to_string()),
                    });
                    return;
                }
            };

            let operation = Operation::Recharge {
                class: class.id.clone(),
                asset: asset.clone(),
                destination: class.destination.clone(),
                grants: reservation.grants().to_vec(),
            };

            let stop = match executor.execute(&operation).await {
                ExecutionOutcome::Success => {
                    for (kind, grant) in reservation.grants() {
                        *out.committed.entry(kind.clone()).or_default() += grant.quantity();
                    }
                    if let Err(e) = ledger.commit(reservation) {
                        tracing::error!("commit after recharge of {} failed: {}", asset, e);
                    }
                    out.recharged.push(asset.clone());
                    continue;
                }
                ExecutionOutcome::Failure(r) => StopReason::OperationFailed(r),
                ExecutionOutcome::Throttled(r) => StopReason::Throttled(r),
            };

            if let Err(e) = ledger.release(reservation) {
                tracing::error!("release after failed recharge of {} failed: {}", asset, e);
            }
            out.deferred_recharge.extend_from_slice(&needs_charge[i..]);
            tracing::warn!(
                "stopping {} recharges for this pass; {} assets deferred",
                class.id,
                needs_charge.len() - i
            );
            out.recharge_stop = Some(stop);
            return;
        }
    }

    /// Produce with eligible assets of one class in sequential batches,
    /// stopping at the first failed batch.
    pub async fn produce<S: TransactionSubmitter>(
        &self,
        class: &AssetClass,
        eligible: &[AssetId],
        executor: &OperationExecutor<S>,
        out: &mut ClassAllocation,
    ) {
        if eligible.is_empty() {
            tracing::info!("no {} to produce with", class.id);
            return;
        }
        if !class.produce_enabled {
            out.deferred_production.extend_from_slice(eligible);
            out.production_stop = Some(StopReason::Disabled);
            return;
        }

        tracing::info!("producing with {} {}", eligible.len(), class.id);
        for (n, batch) in eligible.chunks(self.max_batch_size).enumerate() {
            let operation = Operation::Produce {
                class: class.id.clone(),
                destination: class.destination.clone(),
                recipe_id: class.recipe_id,
                assets: batch.to_vec(),
            };
            let outcome = executor.execute(&operation).await;
            let stop = match outcome {
                ExecutionOutcome::Success => {
                    out.produced.push(batch.to_vec());
                    continue;
                }
                ExecutionOutcome::Failure(r) => StopReason::OperationFailed(r),
                ExecutionOutcome::Throttled(r) => StopReason::Throttled(r),
            };
            let done = n * self.max_batch_size;
            out.deferred_production.extend_from_slice(&eligible[done..]);
            tracing::warn!(
                "stopping {} production for this pass; {} assets deferred",
                class.id,
                eligible.len() - done
            );
            out.production_stop = Some(stop);
            return;
        }
    }

    /// Run a whole allocation: recharges for every class in order, then
    /// production for every class in order.
    ///
    /// This is the delay-free variant over one classification. A pass in
    /// [`PassOrchestrator`](crate::core::PassOrchestrator) drives
    /// [`recharge`](Self::recharge) and [`produce`](Self::produce) itself so
    /// it can wait for confirmations, back off and re-fetch in between.
    pub async fn allocate<S: TransactionSubmitter>(
        &self,
        classes: &[(AssetClass, Classified)],
        ledger: &mut ResourceLedger,
        executor: &OperationExecutor<S>,
    ) -> AllocationPlan {
        let mut plan = AllocationPlan::default();
        for (class, classified) in classes {
            let out = plan.entry(&class.id);
            self.recharge(class, &classified.needs_charge, ledger, executor, out)
                .await;
        }
        for (class, classified) in classes {
            let out = plan.entry(&class.id);
            self.produce(class, &classified.eligible, executor, out).await;
        }
        plan
    }
}
