//! # Recharge Scheduler
//!
//! A resource-constrained scheduler for externally owned crafting assets.
//!
//! Each pass inspects every configured asset class, works out which assets
//! need a recharge, which are cooling down and which can produce, and then
//! spends a set of shared, depleting resource pools on them in a fixed
//! priority order:
//!
//! - **Eligibility Classifier**: pure `NeedsCharge` / `Cooldown` / `Eligible`
//!   classification from charge counts and truncated claim timestamps
//! - **Resource Ledger**: per-pass, all-or-nothing reservations over fungible
//!   balances and single-use unit tokens, committed or released after each
//!   operation
//! - **Allocator**: greedy recharges class by class, then batched production,
//!   stopping a class at its first shortfall or failure
//! - **Operation Executor**: one transaction per operation with typed
//!   success, failure and throttled outcomes
//! - **Pass Orchestrator**: claim, refresh, recharge, produce, follow-up and
//!   secondary phases with confirmation waits and throttle backoff
//!
//! ```rust,ignore
//! use recharge_scheduler::builders::build_orchestrator;
//! use recharge_scheduler::config::SchedulerConfig;
//! use recharge_scheduler::infra::{AtomicAssetsClient, ChainRpcClient, DryRunSubmitter};
//! use recharge_scheduler::runtime::{run_loop, LoopOptions, TokioDelay};
//!
//! let cfg = SchedulerConfig::from_json_str(&raw)?;
//! let orchestrator = build_orchestrator(
//!     &cfg,
//!     AtomicAssetsClient::new("https://wax.api.atomicassets.io"),
//!     ChainRpcClient::new("https://wax.greymass.com"),
//!     DryRunSubmitter::new(),
//!     TokioDelay,
//! )?;
//! run_loop(&orchestrator, LoopOptions::forever(cfg.pass_interval()), |_| {}).await;
//! ```
//!
//! For complete examples, see `tests/scenarios/`.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Classification, accounting, allocation and orchestration.
pub mod core;
/// Configuration models and environment loading.
pub mod config;
/// Builders to construct scheduler components from configuration.
pub mod builders;
/// Infrastructure adapters for the indexer, RPC node and submission.
pub mod infra;
/// Runtime adapters and the pass loop.
pub mod runtime;
/// Shared utilities.
pub mod util;
