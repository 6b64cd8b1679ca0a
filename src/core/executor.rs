//! Operation execution against the external transaction collaborator.

use async_trait::async_trait;
use thiserror::Error;

use crate::core::operation::{ActionBuilder, ChainAction, Operation};

/// Why a submission did not go through.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SubmitError {
    /// The chain rejected the transaction.
    #[error("rejected: {0}")]
    Rejected(String),
    /// The account ran out of CPU/NET/RAM or hit a rate limit.
    #[error("throttled: {0}")]
    Throttled(String),
    /// The submission never got an answer (network failure, timeout).
    ///
    /// The transaction may still have been applied.
    #[error("transport: {0}")]
    Transport(String),
}

/// Markers in a rejection message that indicate billing or rate limits.
const THROTTLE_MARKERS: &[&str] = &[
    "billed cpu",
    "billed net",
    "cpu usage",
    "net usage",
    "ram usage",
    "resource exhausted",
    "insufficient ram",
    "too many requests",
    "rate limit",
    "tx_cpu_usage_exceeded",
    "tx_net_usage_exceeded",
];

/// Map a raw rejection message to [`SubmitError`], separating billing and
/// rate-limit failures from ordinary rejections.
#[must_use]
pub fn classify_rejection(message: impl Into<String>) -> SubmitError {
    let message = message.into();
    let lower = message.to_ascii_lowercase();
    if THROTTLE_MARKERS.iter().any(|m| lower.contains(m)) {
        SubmitError::Throttled(message)
    } else {
        SubmitError::Rejected(message)
    }
}

/// Opaque transaction signing and submission.
///
/// Implementations submit exactly one transaction per call and wait for
/// whatever confirmation they support before returning.
#[async_trait]
pub trait TransactionSubmitter: Send + Sync {
    /// Sign and submit the actions as one transaction.
    async fn submit(&self, actions: Vec<ChainAction>) -> Result<(), SubmitError>;
}

/// Result of executing one operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    /// The transaction was accepted.
    Success,
    /// The transaction failed; the reason is kept for logs.
    Failure(String),
    /// The transaction failed on billing or rate limits; the caller should
    /// back off before continuing.
    Throttled(String),
}

impl ExecutionOutcome {
    /// True for [`ExecutionOutcome::Success`].
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

/// Wraps a submitter: one operation, one submission, one typed outcome.
pub struct OperationExecutor<S> {
    builder: ActionBuilder,
    submitter: S,
}

impl<S: TransactionSubmitter> OperationExecutor<S> {
    /// Create an executor.
    pub const fn new(builder: ActionBuilder, submitter: S) -> Self {
        Self { builder, submitter }
    }

    /// Access the wrapped submitter.
    pub const fn submitter(&self) -> &S {
        &self.submitter
    }

    /// Action builder used to render operations.
    pub const fn builder(&self) -> &ActionBuilder {
        &self.builder
    }

    /// Execute one operation. Never retries.
    pub async fn execute(&self, operation: &Operation) -> ExecutionOutcome {
        let actions = self.builder.build(operation);
        if actions.is_empty() {
            tracing::warn!("{} rendered no actions; nothing submitted", operation.label());
            return ExecutionOutcome::Failure("operation rendered no actions".into());
        }

        match self.submitter.submit(actions).await {
            Ok(()) => {
                tracing::info!("{} successful", operation.label());
                ExecutionOutcome::Success
            }
            Err(SubmitError::Throttled(reason)) => {
                tracing::warn!("{} throttled: {}", operation.label(), reason);
                ExecutionOutcome::Throttled(reason)
            }
            Err(e) => {
                tracing::warn!("{} failed: {}", operation.label(), e);
                ExecutionOutcome::Failure(e.to_string())
            }
        }
    }
}
