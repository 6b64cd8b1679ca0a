//! Tests for audit sinks

use std::sync::Arc;

use parking_lot::Mutex;
use recharge_scheduler::core::{build_audit_event, AuditAction, AuditSink, InMemoryAuditSink};
use uuid::Uuid;

#[test]
fn test_in_memory_audit_sink() {
    let mut sink = InMemoryAuditSink::new(10);
    let pass = Uuid::new_v4();

    sink.record(build_audit_event(pass, "castle", "recharge", AuditAction::Executed, Some("c1".into())));
    assert_eq!(sink.events().len(), 1);

    let events = sink.events();
    assert_eq!(events[0].pass_id, pass);
    assert_eq!(events[0].subject, "castle");
    assert_eq!(events[0].operation, "recharge");
    assert_eq!(events[0].detail.as_deref(), Some("c1"));
    assert!(events[0].created_at_ms > 0);
}

#[test]
fn test_audit_sink_overflow() {
    let mut sink = InMemoryAuditSink::new(2);
    let pass = Uuid::new_v4();

    for subject in ["a", "b", "c"] {
        sink.record(build_audit_event(pass, subject, "produce", AuditAction::Executed, None));
    }

    let events = sink.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].subject, "b"); // First one popped
    assert_eq!(events[1].subject, "c");
}

#[test]
fn test_events_filtered_by_pass_and_action() {
    let mut sink = InMemoryAuditSink::new(10);
    let first = Uuid::new_v4();
    let second = Uuid::new_v4();

    sink.record(build_audit_event(first, "castle", "recharge", AuditAction::SkippedScarcity, None));
    sink.record(build_audit_event(first, "baron", "recharge", AuditAction::Executed, None));
    sink.record(build_audit_event(second, "castle", "recharge", AuditAction::SkippedScarcity, None));

    let skipped = sink.events_for(first, AuditAction::SkippedScarcity);
    assert_eq!(skipped.len(), 1);
    assert_eq!(skipped[0].subject, "castle");
}

#[test]
fn test_shared_sink_records_through_clone() {
    let shared = Arc::new(Mutex::new(InMemoryAuditSink::new(10)));
    let mut handle: Box<dyn AuditSink> = Box::new(shared.clone());

    handle.record(build_audit_event(Uuid::new_v4(), "claim", "claim", AuditAction::Failed, None));

    assert_eq!(shared.lock().events().len(), 1);
}
