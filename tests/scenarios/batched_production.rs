//! Production split into sequential batches with a hard stop on failure.

use recharge_scheduler::core::{StopReason, SubmitError};
use recharge_scheduler::infra::InMemoryChain;
use recharge_scheduler::util::{now_ms, ResourceCost};

use crate::common::*;

fn setup(chain: &InMemoryChain) -> Harness {
    chain.add_assets(CASTLE, ids("c", 25).iter().map(|id| ready(id, 2)));
    let castle = class("castle", CASTLE, KINGS, ResourceCost::none().with("seal", 1));
    harness(chain, vec![castle], vec![seal_pool()], 10)
}

fn batch_sizes(chain: &InMemoryChain) -> Vec<usize> {
    chain
        .submissions_named("craft")
        .iter()
        .map(|tx| tx[0].data["asset_ids"].as_array().unwrap().len())
        .collect()
}

#[tokio::test]
async fn test_twenty_five_assets_make_three_batches() {
    let chain = InMemoryChain::new();
    let h = setup(&chain);

    let result = h.orchestrator.run_pass(now_ms()).await;

    assert_eq!(result.production_batches, 3);
    assert_eq!(result.produced_instances, 25);
    assert_eq!(batch_sizes(&chain), vec![10, 10, 5]);
    let first = &chain.submissions_named("craft")[0][0].data["asset_ids"];
    assert_eq!(first[0], "c1");
    assert_eq!(first[9], "c10");
}

#[tokio::test]
async fn test_failed_second_batch_stops_the_class() {
    let chain = InMemoryChain::new();
    let h = setup(&chain);
    chain.script_outcomes([Ok(()), Err(SubmitError::Rejected("craft not ready".into()))]);

    let result = h.orchestrator.run_pass(now_ms()).await;

    assert_eq!(batch_sizes(&chain), vec![10, 10]);
    assert_eq!(result.production_batches, 1);
    assert!(result.any_failure);
    let entry = result.plan.get("castle").unwrap();
    assert_eq!(entry.deferred_production, ids("c", 25)[10..].to_vec());
    assert!(matches!(entry.production_stop, Some(StopReason::OperationFailed(_))));

    let next = h.orchestrator.run_pass(now_ms()).await;
    assert_eq!(next.produced_instances, 15);
    assert_eq!(batch_sizes(&chain), vec![10, 10, 10, 5]);
    assert!(!next.any_failure);
}

#[tokio::test]
async fn test_failed_first_batch_skips_confirmation_wait() {
    let chain = InMemoryChain::new();
    let h = setup(&chain);
    chain.script_outcomes([Err(SubmitError::Transport("timeout".into()))]);

    let result = h.orchestrator.run_pass(now_ms()).await;

    assert_eq!(result.production_batches, 0);
    assert!(h.delay.waits().is_empty());
}
