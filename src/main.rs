//! `recharge-scheduler`: runs passes forever against the configured account.
//!
//! Transactions are logged, not signed; plug a signing
//! [`TransactionSubmitter`](recharge_scheduler::core::TransactionSubmitter)
//! in place of [`DryRunSubmitter`] to act on chain.

use recharge_scheduler::builders::build_orchestrator;
use recharge_scheduler::config;
use recharge_scheduler::core::AppResult;
use recharge_scheduler::infra::{AtomicAssetsClient, ChainRpcClient, DryRunSubmitter};
use recharge_scheduler::runtime::{run_loop, LoopOptions, TokioDelay};
use recharge_scheduler::util::init_tracing;

#[tokio::main]
async fn main() -> AppResult<()> {
    init_tracing();

    let (cfg, settings) = config::load()?;
    tracing::info!(
        "loaded {} for {} ({} classes)",
        settings.config_path.display(),
        cfg.owner,
        cfg.classes.len()
    );

    let http = reqwest::Client::new();
    let orchestrator = build_orchestrator(
        &cfg,
        AtomicAssetsClient::with_client(&settings.indexer_url, http.clone()),
        ChainRpcClient::with_client(&settings.rpc_url, http),
        DryRunSubmitter::new(),
        TokioDelay,
    )?;

    run_loop(
        &orchestrator,
        LoopOptions::forever(cfg.pass_interval()),
        |result| {
            if result.any_failure {
                tracing::warn!(pass = %result.pass_id, "pass finished with failures");
            }
        },
    )
    .await;
    Ok(())
}
