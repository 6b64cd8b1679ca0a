//! The outer loop: run a pass, wait out the interval, repeat.

use std::time::Duration;

use crate::core::{
    BalanceSource, Delay, InventorySource, PassOrchestrator, PassResult, TransactionSubmitter,
};
use crate::util::clock::now_ms;

/// Loop pacing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopOptions {
    /// Wait between the end of one pass and the start of the next.
    pub interval: Duration,
    /// Stop after this many passes; `None` runs forever.
    pub max_passes: Option<usize>,
}

impl LoopOptions {
    /// Run forever with the given interval.
    #[must_use]
    pub const fn forever(interval: Duration) -> Self {
        Self {
            interval,
            max_passes: None,
        }
    }
}

/// Run passes back to back, calling `on_pass` after each one. The interval
/// is waited in two halves with a progress line between them. Returns the
/// number of passes run (only when `max_passes` is set).
pub async fn run_loop<I, B, S, D, F>(
    orchestrator: &PassOrchestrator<I, B, S, D>,
    options: LoopOptions,
    mut on_pass: F,
) -> usize
where
    I: InventorySource,
    B: BalanceSource,
    S: TransactionSubmitter,
    D: Delay,
    F: FnMut(&PassResult),
{
    let mut passes = 0;
    loop {
        let result = orchestrator.run_pass(now_ms()).await;
        passes += 1;
        on_pass(&result);

        if options.max_passes.is_some_and(|max| passes >= max) {
            return passes;
        }

        let first = options.interval / 2;
        let second = options.interval - first;
        tracing::info!("{:?} remaining before next pass", options.interval);
        orchestrator.delay().wait(first).await;
        tracing::info!("{:?} remaining before next pass", second);
        orchestrator.delay().wait(second).await;
    }
}
