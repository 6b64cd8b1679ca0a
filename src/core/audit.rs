//! Audit trail of what a pass did and why it skipped anything.
//!
//! Every operation and every skipped asset produces one [`AuditEvent`], so a
//! pass's counters can always be traced back to a cause.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use uuid::Uuid;

use crate::util::clock::now_ms;

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuditAction {
    /// Operation succeeded.
    Executed,
    /// Operation failed.
    Failed,
    /// Operation hit a billing or rate limit.
    Throttled,
    /// Asset left for a later pass because a resource ran out.
    SkippedScarcity,
    /// Asset left for a later pass because an earlier operation failed.
    SkippedAfterFailure,
    /// Asset left alone because the operation is disabled for its class.
    SkippedDisabled,
    /// A collaborator query failed and was treated as empty.
    FetchFailed,
}

/// Audit event structure.
#[derive(Debug, Clone)]
pub struct AuditEvent {
    /// Pass the event belongs to.
    pub pass_id: Uuid,
    /// Class, resource or collaborator the event concerns.
    pub subject: String,
    /// Operation label or phase name.
    pub operation: String,
    /// Action taken.
    pub action: AuditAction,
    /// Timestamp milliseconds.
    pub created_at_ms: u128,
    /// Additional context (asset ids, reasons).
    pub detail: Option<String>,
}

/// Audit sink abstraction.
pub trait AuditSink: Send {
    /// Record an audit event.
    fn record(&mut self, event: AuditEvent);
}

/// Bounded in-memory sink, used by default and in tests.
pub struct InMemoryAuditSink {
    events: VecDeque<AuditEvent>,
    max_events: usize,
}

impl InMemoryAuditSink {
    /// Create a new in-memory sink with a bounded buffer.
    #[must_use]
    pub fn new(max_events: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(max_events.min(1024)),
            max_events,
        }
    }

    /// Retrieve a snapshot of stored events.
    #[must_use]
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.iter().cloned().collect()
    }

    /// Events of one pass with the given action.
    #[must_use]
    pub fn events_for(&self, pass_id: Uuid, action: AuditAction) -> Vec<AuditEvent> {
        self.events
            .iter()
            .filter(|e| e.pass_id == pass_id && e.action == action)
            .cloned()
            .collect()
    }
}

impl AuditSink for InMemoryAuditSink {
    fn record(&mut self, event: AuditEvent) {
        if self.max_events == 0 {
            return;
        }
        if self.events.len() >= self.max_events {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }
}

impl<T: AuditSink> AuditSink for Arc<Mutex<T>> {
    fn record(&mut self, event: AuditEvent) {
        self.lock().record(event);
    }
}

/// Sink that only forwards events to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&mut self, event: AuditEvent) {
        tracing::debug!(
            pass = %event.pass_id,
            subject = %event.subject,
            operation = %event.operation,
            action = ?event.action,
            detail = event.detail.as_deref().unwrap_or(""),
            "audit"
        );
    }
}

/// Helper to build an audit event from context.
pub fn build_audit_event(
    pass_id: Uuid,
    subject: impl Into<String>,
    operation: impl Into<String>,
    action: AuditAction,
    detail: Option<String>,
) -> AuditEvent {
    AuditEvent {
        pass_id,
        subject: subject.into(),
        operation: operation.into(),
        action,
        created_at_ms: now_ms(),
        detail,
    }
}
