//! Throttled submissions stop the class and insert a backoff.

use recharge_scheduler::core::{classify_rejection, AuditAction, StopReason};
use recharge_scheduler::infra::InMemoryChain;
use recharge_scheduler::util::{now_ms, ResourceCost};

use crate::common::*;

#[tokio::test]
async fn test_throttled_recharge_backs_off_and_moves_on() {
    let chain = InMemoryChain::new();
    chain.add_units(SEAL, ids("s", 4));
    chain.add_assets(CASTLE, [depleted("c1"), depleted("c2")]);
    chain.add_assets(BARON, [depleted("b1")]);
    chain.script_outcomes([Err(classify_rejection(
        "tx_cpu_usage_exceeded: billed CPU time (2000 us) is greater than the maximum",
    ))]);
    let classes = vec![
        class("castle", CASTLE, KINGS, ResourceCost::none().with("seal", 1)),
        class("baron", BARON, KINGS, ResourceCost::none().with("seal", 1)),
    ];
    let h = harness(&chain, classes, vec![seal_pool()], 10);

    let result = h.orchestrator.run_pass(now_ms()).await;

    assert!(result.throttled);
    assert!(result.any_failure);
    let castle = result.plan.get("castle").unwrap();
    assert!(castle.recharged.is_empty());
    assert_eq!(castle.deferred_recharge.len(), 2);
    assert!(matches!(castle.recharge_stop, Some(StopReason::Throttled(_))));
    assert_eq!(result.plan.get("baron").unwrap().recharged, vec!["b1".to_string()]);

    // released seals went to the baron, starting from the first one
    let tx = &h.chain.submissions()[1];
    assert_eq!(tx[0].data["asset_ids"], serde_json::json!(["s1"]));

    // backoff, recharge confirmation, then b1 produces and is confirmed
    assert_eq!(h.delay.waits(), vec![BACKOFF, CONFIRM, CONFIRM]);
    assert_eq!(result.plan.get("baron").unwrap().produced, vec![vec!["b1".to_string()]]);
    assert_eq!(h.audit.lock().events_for(result.pass_id, AuditAction::Throttled).len(), 1);
}

#[tokio::test]
async fn test_throttled_claim_continues_pass() {
    let chain = InMemoryChain::new();
    chain.add_assets(CASTLE, [ready("c1", 1)]);
    chain.script_outcomes([Err(classify_rejection("429 Too Many Requests"))]);
    let castle = class("castle", CASTLE, KINGS, ResourceCost::none().with("seal", 1));
    let h = harness(&chain, vec![castle], vec![seal_pool()], 10);
    let orchestrator = h.orchestrator.with_claim(recharge_scheduler::core::ClaimSpec {
        contract: "msourcestake".into(),
        action: "claim".into(),
    });

    let result = orchestrator.run_pass(now_ms()).await;

    assert_eq!(result.claims, 0);
    assert!(result.throttled);
    assert_eq!(result.production_batches, 1);
    assert_eq!(h.delay.waits(), vec![BACKOFF, CONFIRM]);
}
