//! Core scheduling: classification, resource accounting, allocation and
//! pass orchestration.

pub mod error;
pub mod classifier;
pub mod ledger;
pub mod operation;
pub mod executor;
pub mod inventory;
pub mod audit;
pub mod allocator;
pub mod orchestrator;

pub use error::{AppResult, SchedulerError};
pub use classifier::{
    classify, partition, reconstruct_claim_ms, AssetInstance, ClaimReference, Classified,
    Eligibility,
};
pub use ledger::{Grant, LedgerSnapshot, PoolSnapshot, Reservation, ResourceLedger};
pub use operation::{ActionBuilder, Authorization, ChainAction, Operation, TokenSpec};
pub use executor::{
    classify_rejection, ExecutionOutcome, OperationExecutor, SubmitError, TransactionSubmitter,
};
pub use inventory::{
    fetch_all_assets, fetch_balance, parse_instance, parse_instances, AssetQuery, AttributeNames,
    BalanceSource, InventorySource, RawAsset,
};
pub use audit::{
    build_audit_event, AuditAction, AuditEvent, AuditSink, InMemoryAuditSink, TracingAuditSink,
};
pub use allocator::{AllocationPlan, Allocator, AssetClass, ClassAllocation, StopReason};
pub use orchestrator::{
    ClaimSpec, Delay, PassOrchestrator, PassResult, PassSettings, PassState, ResourceSource,
    ResourceSpec, TokenCraftSpec,
};
