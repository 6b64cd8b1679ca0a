//! Collaborator failures degrade to empty data without aborting the pass.

use recharge_scheduler::core::{AuditAction, StopReason};
use recharge_scheduler::infra::InMemoryChain;
use recharge_scheduler::util::{now_ms, ResourceCost, ResourceKind};

use crate::common::*;

#[tokio::test]
async fn test_failed_inventory_skips_only_that_class() {
    let chain = InMemoryChain::new();
    chain.add_assets(CASTLE, [ready("c1", 1)]);
    chain.add_assets(BARON, [ready("b1", 1)]);
    chain.fail_template(CASTLE);
    let classes = vec![
        class("castle", CASTLE, KINGS, ResourceCost::none().with("seal", 1)),
        class("baron", BARON, KINGS, ResourceCost::none().with("seal", 1)),
    ];
    let h = harness(&chain, classes, vec![seal_pool()], 10);

    let result = h.orchestrator.run_pass(now_ms()).await;

    assert_eq!(result.produced_instances, 1);
    assert_eq!(result.plan.get("baron").unwrap().produced, vec![vec!["b1".to_string()]]);
    assert!(result.plan.get("castle").unwrap().produced.is_empty());
    assert!(!result.any_failure);
    let failed = h.audit.lock().events_for(result.pass_id, AuditAction::FetchFailed);
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].subject, "castle");
}

#[tokio::test]
async fn test_failed_balance_counts_as_zero() {
    let chain = InMemoryChain::new();
    chain.set_balance(GOODS, "50.0000 CLUMBER").unwrap();
    chain.fail_balance("CLUMBER");
    chain.add_assets(CARPENTER, [depleted("p1")]);
    let carpenter = class(
        "carpenter",
        CARPENTER,
        GOODS,
        ResourceCost::none().with("lumber", 60_000),
    );
    let h = harness(&chain, vec![carpenter], vec![lumber_pool()], 10);

    let result = h.orchestrator.run_pass(now_ms()).await;

    assert_eq!(result.ledger_start[&ResourceKind::new("lumber")], 0);
    assert_eq!(result.recharges, 0);
    assert!(matches!(
        result.plan.get("carpenter").unwrap().recharge_stop,
        Some(StopReason::Exhausted { available: 0, .. })
    ));
    assert!(h.chain.submissions().is_empty());
}

#[tokio::test]
async fn test_absent_balance_is_zero_not_failure() {
    let chain = InMemoryChain::new();
    chain.add_assets(CARPENTER, [depleted("p1")]);
    let carpenter = class(
        "carpenter",
        CARPENTER,
        GOODS,
        ResourceCost::none().with("lumber", 60_000),
    );
    let h = harness(&chain, vec![carpenter], vec![lumber_pool()], 10);

    let result = h.orchestrator.run_pass(now_ms()).await;

    assert_eq!(result.ledger_start[&ResourceKind::new("lumber")], 0);
    assert!(h.audit.lock().events_for(result.pass_id, AuditAction::FetchFailed).is_empty());
}

#[tokio::test]
async fn test_failed_unit_pool_is_empty() {
    let chain = InMemoryChain::new();
    chain.add_units(SEAL, ["s1"]);
    chain.fail_template(SEAL);
    chain.add_assets(CASTLE, [depleted("c1")]);
    let castle = class("castle", CASTLE, KINGS, ResourceCost::none().with("seal", 1));
    let h = harness(&chain, vec![castle], vec![seal_pool()], 10);

    let result = h.orchestrator.run_pass(now_ms()).await;

    assert_eq!(result.recharges, 0);
    assert_eq!(result.skipped_for_scarcity, 1);
}
