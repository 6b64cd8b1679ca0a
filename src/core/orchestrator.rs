//! Pass orchestration: one full claim → refresh → recharge → produce →
//! secondary cycle across every configured class.
//!
//! A pass never aborts. Each phase handles its own failures (fetches fall
//! back to empty sets, failed operations stop their class) and the pass
//! always ends in [`PassState::Idle`] with a [`PassResult`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::allocator::{AllocationPlan, Allocator, AssetClass, ClassAllocation, StopReason};
use crate::core::audit::{build_audit_event, AuditAction, AuditSink, TracingAuditSink};
use crate::core::classifier::{partition, Classified};
use crate::core::executor::{ExecutionOutcome, OperationExecutor, TransactionSubmitter};
use crate::core::inventory::{
    fetch_all_assets, fetch_balance, parse_instances, AssetQuery, AttributeNames, BalanceSource,
    InventorySource,
};
use crate::core::ledger::{LedgerSnapshot, PoolSnapshot, ResourceLedger};
use crate::core::operation::Operation;
use crate::util::ResourceKind;

/// Abstraction for waiting on the runtime (confirmation waits, throttle
/// backoff, the inter-pass interval).
#[async_trait]
pub trait Delay: Send + Sync {
    /// Suspend for `duration`.
    async fn wait(&self, duration: Duration);
}

/// Phases of a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PassState {
    /// Between passes.
    Idle,
    /// Claiming staking rewards.
    Claiming,
    /// Fetching balances, unit pools and class inventories.
    Refreshing,
    /// Recharging depleted assets.
    Recharging,
    /// Producing with eligible assets.
    Producing,
    /// Recharging assets depleted by this pass's production.
    FollowUpRecharging,
    /// Spending a fungible pool on token-funded crafts.
    Secondary,
}

/// Where a resource pool's quantity comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceSource {
    /// Token balance queried from the chain.
    Fungible {
        /// Token contract.
        contract: String,
        /// Token symbol.
        symbol: String,
        /// Decimal places.
        precision: u8,
    },
    /// Owned single-use assets of one template.
    Units {
        /// Template id.
        template_id: u64,
    },
}

/// A named resource pool and its source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceSpec {
    /// Pool name used in class costs.
    pub kind: ResourceKind,
    /// How to refresh it.
    pub source: ResourceSource,
}

/// Staking-reward claim performed at the start of each pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimSpec {
    /// Staking contract.
    pub contract: String,
    /// Action name.
    pub action: String,
}

/// Token-funded craft repeated while the pool can pay for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenCraftSpec {
    /// Pool paying the fee (must be fungible).
    pub kind: ResourceKind,
    /// Fee per craft in base units.
    pub fee: u64,
    /// Contract receiving the fee.
    pub contract: String,
    /// Template of the crafted pack.
    pub template_id: u64,
}

/// Settings fixed for the lifetime of the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassSettings {
    /// Owning account.
    pub owner: String,
    /// Asset collection.
    pub collection: String,
    /// Inventory page size.
    pub page_size: u32,
    /// Wait after a phase that submitted transactions.
    pub confirmation_wait: Duration,
    /// Extra wait after a throttled submission.
    pub throttle_backoff: Duration,
    /// Attribute names on class assets.
    pub attributes: AttributeNames,
    /// Re-fetch inventories and recharge again after production.
    pub recharge_after_production: bool,
}

/// Aggregate outcome of one pass, consumed by the run loop.
#[derive(Debug, Clone)]
pub struct PassResult {
    /// Pass identifier (also on every audit event).
    pub pass_id: Uuid,
    /// Successful reward claims.
    pub claims: usize,
    /// Recharges executed (including follow-up).
    pub recharges: usize,
    /// Production batches executed.
    pub production_batches: usize,
    /// Assets that produced.
    pub produced_instances: usize,
    /// Token-funded crafts executed.
    pub secondary_crafts: usize,
    /// Depleted assets left because a pool ran short.
    pub skipped_for_scarcity: usize,
    /// Whether any submission failed.
    pub any_failure: bool,
    /// Whether any submission was throttled.
    pub throttled: bool,
    /// States entered, in order; always ends with [`PassState::Idle`].
    pub transitions: Vec<PassState>,
    /// Main allocation.
    pub plan: AllocationPlan,
    /// Follow-up recharge allocation, if it ran.
    pub follow_up: Option<AllocationPlan>,
    /// Unreserved pool quantities after refresh.
    pub ledger_start: LedgerSnapshot,
    /// Unreserved pool quantities at the end of the pass.
    pub ledger_end: LedgerSnapshot,
}

impl PassResult {
    fn new(pass_id: Uuid) -> Self {
        Self {
            pass_id,
            claims: 0,
            recharges: 0,
            production_batches: 0,
            produced_instances: 0,
            secondary_crafts: 0,
            skipped_for_scarcity: 0,
            any_failure: false,
            throttled: false,
            transitions: Vec::new(),
            plan: AllocationPlan::default(),
            follow_up: None,
            ledger_start: LedgerSnapshot::new(),
            ledger_end: LedgerSnapshot::new(),
        }
    }

    /// Total operations that changed chain state.
    #[must_use]
    pub const fn operations(&self) -> usize {
        self.claims + self.recharges + self.production_batches + self.secondary_crafts
    }
}

/// Sequences the components for one pass at a time.
pub struct PassOrchestrator<I, B, S, D> {
    settings: PassSettings,
    classes: Vec<AssetClass>,
    resources: Vec<ResourceSpec>,
    claim: Option<ClaimSpec>,
    secondary: Option<TokenCraftSpec>,
    allocator: Allocator,
    inventory: I,
    balances: B,
    executor: OperationExecutor<S>,
    delay: D,
    audit: Arc<Mutex<Box<dyn AuditSink>>>,
}

impl<I, B, S, D> PassOrchestrator<I, B, S, D>
where
    I: InventorySource,
    B: BalanceSource,
    S: TransactionSubmitter,
    D: Delay,
{
    /// Create an orchestrator. `classes` is the priority order.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        settings: PassSettings,
        classes: Vec<AssetClass>,
        resources: Vec<ResourceSpec>,
        allocator: Allocator,
        inventory: I,
        balances: B,
        executor: OperationExecutor<S>,
        delay: D,
    ) -> Self {
        Self {
            settings,
            classes,
            resources,
            claim: None,
            secondary: None,
            allocator,
            inventory,
            balances,
            executor,
            delay,
            audit: Arc::new(Mutex::new(Box::new(TracingAuditSink))),
        }
    }

    /// Claim rewards at the start of every pass.
    #[must_use]
    pub fn with_claim(mut self, claim: ClaimSpec) -> Self {
        self.claim = Some(claim);
        self
    }

    /// Spend a fungible pool on token crafts at the end of every pass.
    #[must_use]
    pub fn with_secondary(mut self, secondary: TokenCraftSpec) -> Self {
        self.secondary = Some(secondary);
        self
    }

    /// Attach an audit sink.
    #[must_use]
    pub fn with_audit(mut self, audit: Box<dyn AuditSink>) -> Self {
        self.audit = Arc::new(Mutex::new(audit));
        self
    }

    /// Classes in priority order.
    pub fn classes(&self) -> &[AssetClass] {
        &self.classes
    }

    /// Settings in use.
    pub const fn settings(&self) -> &PassSettings {
        &self.settings
    }

    /// The delay used for waits, shared with the run loop.
    pub const fn delay(&self) -> &D {
        &self.delay
    }

    /// The executor, for inspection in tests.
    pub const fn executor(&self) -> &OperationExecutor<S> {
        &self.executor
    }

    fn record(&self, pass_id: Uuid, subject: &str, operation: &str, action: AuditAction, detail: Option<String>) {
        let mut sink = self.audit.lock();
        sink.record(build_audit_event(pass_id, subject, operation, action, detail));
    }

    fn enter(state: PassState, result: &mut PassResult) {
        tracing::debug!(pass = %result.pass_id, "entering {:?}", state);
        result.transitions.push(state);
    }

    async fn wait_for_confirmations(&self) {
        if self.settings.confirmation_wait.is_zero() {
            return;
        }
        tracing::info!("waiting on blockchain transaction confirmations");
        self.delay.wait(self.settings.confirmation_wait).await;
    }

    async fn back_off(&self) {
        tracing::warn!(
            "throttled; backing off for {:?}",
            self.settings.throttle_backoff
        );
        self.delay.wait(self.settings.throttle_backoff).await;
    }

    fn query(&self, template_id: u64) -> AssetQuery {
        AssetQuery {
            owner: self.settings.owner.clone(),
            collection: self.settings.collection.clone(),
            template_id,
        }
    }

    /// Run one complete pass. Never fails; problems are reported through
    /// the counters, the logs and the audit sink.
    pub async fn run_pass(&self, now_ms: u128) -> PassResult {
        let mut result = PassResult::new(Uuid::new_v4());
        let pass_id = result.pass_id;
        tracing::info!(pass = %pass_id, "pass started");

        if let Some(claim) = &self.claim {
            Self::enter(PassState::Claiming, &mut result);
            self.claim_rewards(claim, &mut result).await;
        }

        Self::enter(PassState::Refreshing, &mut result);
        let mut ledger = self.refresh_ledger(pass_id).await;
        result.ledger_start = ledger.snapshot();
        tracing::info!(pass = %pass_id, "resources at pass start: {:?}", result.ledger_start);
        self.record_disabled(pass_id);
        let mut classified = self.fetch_classes(pass_id, now_ms).await;

        Self::enter(PassState::Recharging, &mut result);
        let mut plan = AllocationPlan::default();
        self.recharge_phase(pass_id, &classified, &mut ledger, &mut plan).await;
        if plan.recharges() > 0 {
            self.wait_for_confirmations().await;
            // recharged assets may be producible right away
            classified = self.fetch_classes(pass_id, now_ms).await;
        }

        Self::enter(PassState::Producing, &mut result);
        self.production_phase(pass_id, &classified, &mut plan).await;
        if plan.production_batches() > 0 {
            self.wait_for_confirmations().await;
        }

        if self.settings.recharge_after_production && plan.production_batches() > 0 {
            Self::enter(PassState::FollowUpRecharging, &mut result);
            let refreshed = self.fetch_classes(pass_id, now_ms).await;
            let mut follow_up = AllocationPlan::default();
            self.recharge_phase(pass_id, &refreshed, &mut ledger, &mut follow_up)
                .await;
            if follow_up.recharges() > 0 {
                self.wait_for_confirmations().await;
            }
            result.follow_up = Some(follow_up);
        }

        if let Some(secondary) = &self.secondary {
            Self::enter(PassState::Secondary, &mut result);
            self.secondary_phase(pass_id, secondary, &mut ledger, &mut result)
                .await;
        }

        result.recharges += plan.recharges();
        result.production_batches = plan.production_batches();
        result.produced_instances = plan.produced_instances();
        result.skipped_for_scarcity += plan.skipped_for_scarcity();
        result.any_failure |= plan.any_failure();
        result.throttled |= plan.throttled();
        if let Some(follow_up) = &result.follow_up {
            result.recharges += follow_up.recharges();
            result.skipped_for_scarcity += follow_up.skipped_for_scarcity();
            result.any_failure |= follow_up.any_failure();
            result.throttled |= follow_up.throttled();
        }
        result.plan = plan;
        result.ledger_end = ledger.snapshot();
        if ledger.outstanding() > 0 {
            tracing::error!(pass = %pass_id, "{} reservations left outstanding", ledger.outstanding());
        }

        Self::enter(PassState::Idle, &mut result);
        tracing::info!(
            pass = %pass_id,
            claims = result.claims,
            recharges = result.recharges,
            batches = result.production_batches,
            produced = result.produced_instances,
            secondary = result.secondary_crafts,
            scarce = result.skipped_for_scarcity,
            failure = result.any_failure,
            throttled = result.throttled,
            "pass finished"
        );
        result
    }

    async fn claim_rewards(&self, claim: &ClaimSpec, result: &mut PassResult) {
        let operation = Operation::Claim {
            contract: claim.contract.clone(),
            action: claim.action.clone(),
        };
        match self.executor.execute(&operation).await {
            ExecutionOutcome::Success => {
                result.claims += 1;
                self.record(result.pass_id, &claim.contract, "claim", AuditAction::Executed, None);
                self.wait_for_confirmations().await;
            }
            ExecutionOutcome::Failure(reason) => {
                result.any_failure = true;
                self.record(result.pass_id, &claim.contract, "claim", AuditAction::Failed, Some(reason));
            }
            ExecutionOutcome::Throttled(reason) => {
                result.any_failure = true;
                result.throttled = true;
                self.record(result.pass_id, &claim.contract, "claim", AuditAction::Throttled, Some(reason));
                self.back_off().await;
            }
        }
    }

    async fn refresh_ledger(&self, pass_id: Uuid) -> ResourceLedger {
        let mut ledger = ResourceLedger::new();
        for spec in &self.resources {
            let snapshot = match &spec.source {
                ResourceSource::Fungible {
                    contract,
                    symbol,
                    precision,
                } => {
                    let fetched = fetch_balance(
                        &self.balances,
                        contract,
                        &self.settings.owner,
                        symbol,
                        *precision,
                    )
                    .await;
                    let balance = fetched.unwrap_or_else(|e| {
                        tracing::warn!("balance of {} unavailable, using 0: {}", spec.kind, e);
                        self.record(pass_id, spec.kind.as_str(), "refresh", AuditAction::FetchFailed, Some(e.to_string()));
                        0
                    });
                    PoolSnapshot::Fungible { balance }
                }
                ResourceSource::Units { template_id } => {
                    let query = self.query(*template_id);
                    let tokens = match fetch_all_assets(&self.inventory, &query, self.settings.page_size).await {
                        Ok(raw) => raw.into_iter().map(|a| a.asset_id).collect(),
                        Err(e) => {
                            tracing::warn!("{} inventory unavailable, using none: {}", spec.kind, e);
                            self.record(pass_id, spec.kind.as_str(), "refresh", AuditAction::FetchFailed, Some(e.to_string()));
                            Vec::new()
                        }
                    };
                    PoolSnapshot::Units { tokens }
                }
            };
            ledger.insert_pool(spec.kind.clone(), snapshot);
        }
        ledger
    }

    fn record_disabled(&self, pass_id: Uuid) {
        for class in &self.classes {
            if !class.recharge_enabled && !class.produce_enabled {
                tracing::info!("{} has recharge and production disabled, skipping", class.id);
                self.record(pass_id, &class.id, "refresh", AuditAction::SkippedDisabled, None);
            }
        }
    }

    async fn fetch_classes(&self, pass_id: Uuid, now_ms: u128) -> Vec<Classified> {
        let mut out = Vec::with_capacity(self.classes.len());
        for class in &self.classes {
            if !class.recharge_enabled && !class.produce_enabled {
                out.push(Classified::default());
                continue;
            }
            let query = self.query(class.template_id);
            let instances = match fetch_all_assets(&self.inventory, &query, self.settings.page_size).await {
                Ok(raw) => parse_instances(&raw, &self.settings.attributes),
                Err(e) => {
                    tracing::warn!("{} inventory unavailable, treating as empty: {}", class.id, e);
                    self.record(pass_id, &class.id, "refresh", AuditAction::FetchFailed, Some(e.to_string()));
                    Vec::new()
                }
            };
            let classified = partition(&instances, class.cooldown_hours, now_ms);
            tracing::info!(
                "{}: {} need charge, {} cooling down, {} eligible",
                class.id,
                classified.needs_charge.len(),
                classified.cooldown.len(),
                classified.eligible.len()
            );
            out.push(classified);
        }
        out
    }

    async fn recharge_phase(
        &self,
        pass_id: Uuid,
        classified: &[Classified],
        ledger: &mut ResourceLedger,
        plan: &mut AllocationPlan,
    ) {
        for (class, assets) in self.classes.iter().zip(classified) {
            let out = plan.entry(&class.id);
            self.allocator
                .recharge(class, &assets.needs_charge, ledger, &self.executor, out)
                .await;
            self.record_recharges(pass_id, out);
            if matches!(out.recharge_stop, Some(StopReason::Throttled(_))) {
                self.back_off().await;
            }
        }
    }

    async fn production_phase(&self, pass_id: Uuid, classified: &[Classified], plan: &mut AllocationPlan) {
        for (class, assets) in self.classes.iter().zip(classified) {
            let out = plan.entry(&class.id);
            self.allocator
                .produce(class, &assets.eligible, &self.executor, out)
                .await;
            self.record_production(pass_id, out);
            if matches!(out.production_stop, Some(StopReason::Throttled(_))) {
                self.back_off().await;
            }
        }
    }

    async fn secondary_phase(
        &self,
        pass_id: Uuid,
        spec: &TokenCraftSpec,
        ledger: &mut ResourceLedger,
        result: &mut PassResult,
    ) {
        if spec.fee == 0 {
            tracing::warn!("token craft paid in {} has no fee, skipping", spec.kind);
            self.record(pass_id, &spec.contract, "token_craft", AuditAction::SkippedDisabled, Some("zero fee".into()));
            return;
        }
        loop {
            let reservation = match ledger.reserve(&spec.kind, spec.fee) {
                Ok(r) => r,
                Err(e) => {
                    tracing::info!("secondary crafts done ({}): {}", result.secondary_crafts, e);
                    break;
                }
            };
            tracing::info!(
                "{} {} remaining after reserving a craft fee",
                ledger.remaining(&spec.kind).unwrap_or_default(),
                spec.kind
            );
            let operation = Operation::TokenCraft {
                kind: spec.kind.clone(),
                fee: spec.fee,
                contract: spec.contract.clone(),
                template_id: spec.template_id,
            };
            let (action, reason) = match self.executor.execute(&operation).await {
                ExecutionOutcome::Success => {
                    if let Err(e) = ledger.commit(reservation) {
                        tracing::error!("commit after token craft failed: {}", e);
                    }
                    result.secondary_crafts += 1;
                    self.record(pass_id, &spec.contract, "token_craft", AuditAction::Executed, None);
                    continue;
                }
                ExecutionOutcome::Failure(r) => (AuditAction::Failed, r),
                ExecutionOutcome::Throttled(r) => (AuditAction::Throttled, r),
            };
            if let Err(e) = ledger.release(reservation) {
                tracing::error!("release after failed token craft failed: {}", e);
            }
            tracing::warn!("errors occurred during token craft, will try again next pass");
            result.any_failure = true;
            self.record(pass_id, &spec.contract, "token_craft", action, Some(reason));
            if action == AuditAction::Throttled {
                result.throttled = true;
                self.back_off().await;
            }
            break;
        }
    }

    fn record_recharges(&self, pass_id: Uuid, out: &ClassAllocation) {
        for asset in &out.recharged {
            self.record(pass_id, &out.class, "recharge", AuditAction::Executed, Some(asset.clone()));
        }
        if let Some(stop) = &out.recharge_stop {
            self.record_stop(pass_id, &out.class, "recharge", stop, &out.deferred_recharge);
        }
    }

    fn record_production(&self, pass_id: Uuid, out: &ClassAllocation) {
        for batch in &out.produced {
            self.record(pass_id, &out.class, "produce", AuditAction::Executed, Some(batch.join(",")));
        }
        if let Some(stop) = &out.production_stop {
            self.record_stop(pass_id, &out.class, "produce", stop, &out.deferred_production);
        }
    }

    fn record_stop(&self, pass_id: Uuid, class: &str, operation: &str, stop: &StopReason, deferred: &[String]) {
        let (action, reason) = match stop {
            StopReason::Disabled => (AuditAction::SkippedDisabled, "disabled".to_string()),
            StopReason::Exhausted {
                kind,
                requested,
                available,
            } => (
                AuditAction::SkippedScarcity,
                format!("{kind}: requested {requested}, available {available}"),
            ),
            StopReason::Ledger(r) => (AuditAction::SkippedScarcity, r.clone()),
            StopReason::OperationFailed(r) => {
                self.record(pass_id, class, operation, AuditAction::Failed, Some(r.clone()));
                (AuditAction::SkippedAfterFailure, r.clone())
            }
            StopReason::Throttled(r) => {
                self.record(pass_id, class, operation, AuditAction::Throttled, Some(r.clone()));
                (AuditAction::SkippedAfterFailure, r.clone())
            }
        };
        for asset in deferred {
            self.record(pass_id, class, operation, action, Some(format!("{asset}: {reason}")));
        }
    }
}
