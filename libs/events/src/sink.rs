//! Audit sinks.

use std::sync::Arc;

use tracing::{info, warn};

use crate::envelope::AuditEvent;
use crate::types::Outcome;

/// Destination for audit events.
pub trait AuditSink: Send + Sync {
    fn emit(&self, event: AuditEvent);
}

/// Shared handle to an audit sink.
pub type SharedAuditSink = Arc<dyn AuditSink>;

/// Writes audit events as structured tracing events on target `audit`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn emit(&self, event: AuditEvent) {
        let record = match serde_json::to_string(&event) {
            Ok(record) => record,
            Err(e) => {
                warn!(error = %e, kind = %event.kind, "Failed to serialize audit event");
                return;
            }
        };

        match event.outcome {
            Outcome::Ok => info!(
                target: "audit",
                kind = %event.kind,
                transport = %event.transport,
                raddr = %event.remote_addr,
                record = %record,
                "audit"
            ),
            Outcome::Warning => warn!(
                target: "audit",
                kind = %event.kind,
                transport = %event.transport,
                raddr = %event.remote_addr,
                record = %record,
                "audit"
            ),
        }
    }
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn emit(&self, _event: AuditEvent) {}
}
