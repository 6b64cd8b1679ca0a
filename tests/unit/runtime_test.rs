//! Tests for the tokio delay and the pass loop

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use recharge_scheduler::core::{
    ActionBuilder, Allocator, AttributeNames, Delay, OperationExecutor, PassOrchestrator,
    PassSettings,
};
use recharge_scheduler::infra::InMemoryChain;
use recharge_scheduler::runtime::{run_loop, LoopOptions, TokioDelay};

#[derive(Clone, Default)]
struct CountingDelay {
    waits: Arc<Mutex<Vec<Duration>>>,
}

#[async_trait]
impl Delay for CountingDelay {
    async fn wait(&self, duration: Duration) {
        self.waits.lock().push(duration);
    }
}

#[tokio::test]
async fn test_tokio_delay_sleeps() {
    let start = tokio::time::Instant::now();
    TokioDelay.wait(Duration::from_millis(20)).await;
    assert!(start.elapsed() >= Duration::from_millis(20));
}

#[tokio::test]
async fn test_run_loop_waits_interval_in_halves() {
    let chain = InMemoryChain::new();
    let delay = CountingDelay::default();
    let settings = PassSettings {
        owner: "player.wam".into(),
        collection: "castlesnftgo".into(),
        page_size: 40,
        confirmation_wait: Duration::from_secs(20),
        throttle_backoff: Duration::from_secs(30),
        attributes: AttributeNames::default(),
        recharge_after_production: false,
    };
    let orchestrator = PassOrchestrator::new(
        settings,
        Vec::new(),
        Vec::new(),
        Allocator::new(10),
        chain.clone(),
        chain.clone(),
        OperationExecutor::new(ActionBuilder::new("player.wam", "atomicassets"), chain),
        delay.clone(),
    );

    let mut seen = Vec::new();
    let passes = run_loop(
        &orchestrator,
        LoopOptions {
            interval: Duration::from_secs(600),
            max_passes: Some(3),
        },
        |result| seen.push(result.pass_id),
    )
    .await;

    assert_eq!(passes, 3);
    assert_eq!(seen.len(), 3);
    // no wait after the final pass
    assert_eq!(*delay.waits.lock(), vec![Duration::from_secs(300); 4]);
}
