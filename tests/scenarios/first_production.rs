//! Assets that have never produced carry no charge history.

use recharge_scheduler::core::{classify, AssetInstance, Eligibility, RawAsset};
use recharge_scheduler::infra::InMemoryChain;
use recharge_scheduler::util::{now_ms, ResourceCost};

use crate::common::*;

#[test]
fn test_no_history_is_eligible() {
    let now = now_ms();
    assert_eq!(classify(&AssetInstance::fresh("n1"), 24, now), Eligibility::Eligible);
}

#[tokio::test]
async fn test_fresh_assets_produce_on_first_pass() {
    let chain = InMemoryChain::new();
    chain.add_assets(CASTLE, [RawAsset::bare("n1"), RawAsset::bare("n2"), cooling("c1")]);
    let castle = class("castle", CASTLE, KINGS, ResourceCost::none().with("seal", 1));
    let h = harness(&chain, vec![castle], vec![seal_pool()], 10);

    let result = h.orchestrator.run_pass(now_ms()).await;

    assert_eq!(result.production_batches, 1);
    assert_eq!(result.produced_instances, 2);
    let crafts = h.chain.submissions_named("craft");
    assert_eq!(crafts.len(), 1);
    assert_eq!(crafts[0][0].data["asset_ids"], serde_json::json!(["n1", "n2"]));
    assert_eq!(crafts[0][0].data["recipe_id"], 1);
    assert_eq!(crafts[0][0].account, KINGS);
    assert_eq!(h.delay.waits(), vec![CONFIRM]);
}

#[tokio::test]
async fn test_produced_assets_cool_down_next_pass() {
    let chain = InMemoryChain::new();
    chain.add_assets(CASTLE, [RawAsset::bare("n1")]);
    let castle = class("castle", CASTLE, KINGS, ResourceCost::none().with("seal", 1));
    let h = harness(&chain, vec![castle], vec![seal_pool()], 10);

    assert_eq!(h.orchestrator.run_pass(now_ms()).await.produced_instances, 1);
    // charges went to zero, so the asset now waits for a seal
    let second = h.orchestrator.run_pass(now_ms()).await;
    assert_eq!(second.produced_instances, 0);
    assert_eq!(second.plan.get("castle").unwrap().deferred_recharge, vec!["n1".to_string()]);
}
