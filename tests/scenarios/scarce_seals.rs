//! Two classes competing for a unit pool that cannot cover both.

use recharge_scheduler::core::{AuditAction, StopReason};
use recharge_scheduler::infra::InMemoryChain;
use recharge_scheduler::util::{now_ms, ResourceCost, ResourceKind};

use crate::common::*;

fn two_seal_classes() -> Vec<recharge_scheduler::core::AssetClass> {
    vec![
        class("castle", CASTLE, KINGS, ResourceCost::none().with("seal", 2)),
        class("baron", BARON, KINGS, ResourceCost::none().with("seal", 2)),
    ]
}

#[tokio::test]
async fn test_higher_priority_class_takes_scarce_seals() {
    let chain = InMemoryChain::new();
    chain.add_units(SEAL, ["s1", "s2", "s3"]);
    chain.add_assets(CASTLE, [depleted("c1"), depleted("c2")]);
    chain.add_assets(BARON, [depleted("b1")]);
    let h = harness(&chain, two_seal_classes(), vec![seal_pool()], 10);

    let result = h.orchestrator.run_pass(now_ms()).await;

    assert_eq!(result.recharges, 1);
    let castle = result.plan.get("castle").unwrap();
    assert_eq!(castle.recharged, vec!["c1".to_string()]);
    assert_eq!(castle.deferred_recharge, vec!["c2".to_string()]);
    assert_eq!(
        castle.recharge_stop,
        Some(StopReason::Exhausted {
            kind: ResourceKind::new("seal"),
            requested: 2,
            available: 1,
        })
    );

    let baron = result.plan.get("baron").unwrap();
    assert!(baron.recharged.is_empty());
    assert_eq!(baron.deferred_recharge, vec!["b1".to_string()]);

    assert_eq!(result.ledger_start[&ResourceKind::new("seal")], 3);
    assert_eq!(result.ledger_end[&ResourceKind::new("seal")], 1);
    assert_eq!(result.skipped_for_scarcity, 2);
    assert!(!result.any_failure);

    // one leftover seal stays in the wallet
    assert_eq!(h.chain.assets(SEAL).len(), 1);
    assert_eq!(h.chain.assets(SEAL)[0].asset_id, "s3");

    // c1 is producible again once its recharge lands
    assert_eq!(castle.produced, vec![vec!["c1".to_string()]]);

    let transfers = h.chain.submissions_named("transfer");
    assert_eq!(transfers.len(), 1);
    assert_eq!(transfers[0].len(), 1);
    assert_eq!(transfers[0][0].data["asset_ids"], serde_json::json!(["s1", "s2"]));
    assert_eq!(transfers[0][0].data["memo"], "fix:c1");
    assert_eq!(transfers[0][0].data["to"], KINGS);
}

#[tokio::test]
async fn test_scarcity_is_audited_per_deferred_asset() {
    let chain = InMemoryChain::new();
    chain.add_units(SEAL, ["s1", "s2", "s3"]);
    chain.add_assets(CASTLE, [depleted("c1"), depleted("c2")]);
    chain.add_assets(BARON, [depleted("b1")]);
    let h = harness(&chain, two_seal_classes(), vec![seal_pool()], 10);

    let result = h.orchestrator.run_pass(now_ms()).await;

    let audit = h.audit.lock();
    let skipped = audit.events_for(result.pass_id, AuditAction::SkippedScarcity);
    let subjects: Vec<_> = skipped.iter().map(|e| e.subject.as_str()).collect();
    assert_eq!(subjects, vec!["castle", "baron"]);
    assert!(skipped[0].detail.as_deref().unwrap().starts_with("c2"));
    let executed = audit.events_for(result.pass_id, AuditAction::Executed);
    let operations: Vec<_> = executed.iter().map(|e| e.operation.as_str()).collect();
    assert_eq!(operations, vec!["recharge", "produce"]);
}

#[tokio::test]
async fn test_recharge_waits_for_confirmation_once() {
    let chain = InMemoryChain::new();
    chain.add_units(SEAL, ["s1", "s2", "s3"]);
    chain.add_assets(CASTLE, [depleted("c1"), depleted("c2")]);
    let mut classes = two_seal_classes();
    classes[0].produce_enabled = false;
    let h = harness(&chain, classes, vec![seal_pool()], 10);

    h.orchestrator.run_pass(now_ms()).await;

    assert_eq!(h.delay.waits(), vec![CONFIRM]);
}
