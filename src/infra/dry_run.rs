//! Submitter that logs transactions instead of signing them.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::core::{ChainAction, SubmitError, TransactionSubmitter};

/// Logs every action and reports success. Used by the binary when no
/// signing submitter is wired in.
#[derive(Debug, Default)]
pub struct DryRunSubmitter {
    submitted: AtomicUsize,
}

impl DryRunSubmitter {
    /// Create a dry-run submitter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Transactions seen so far.
    pub fn submitted(&self) -> usize {
        self.submitted.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl TransactionSubmitter for DryRunSubmitter {
    async fn submit(&self, actions: Vec<ChainAction>) -> Result<(), SubmitError> {
        let n = self.submitted.fetch_add(1, Ordering::Relaxed) + 1;
        for action in &actions {
            tracing::info!(
                tx = n,
                "dry run: {}::{} {}",
                action.account,
                action.name,
                action.data
            );
        }
        Ok(())
    }
}
