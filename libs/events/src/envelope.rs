//! Audit event record.

use std::net::SocketAddr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{AuditKind, Outcome, TransportKind};

/// A single audit record describing a client connection transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// What happened.
    pub kind: AuditKind,

    /// Transport the client used.
    pub transport: TransportKind,

    /// Client address.
    pub remote_addr: SocketAddr,

    /// Proxy-side address, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_addr: Option<SocketAddr>,

    /// Outcome of the transition.
    pub outcome: Outcome,

    /// When the transition completed.
    pub occurred_at: DateTime<Utc>,
}

impl AuditEvent {
    /// Record a completed handshake.
    pub fn accept(
        transport: TransportKind,
        remote_addr: SocketAddr,
        local_addr: SocketAddr,
    ) -> Self {
        Self {
            kind: AuditKind::Accept,
            transport,
            remote_addr,
            local_addr: Some(local_addr),
            outcome: Outcome::Ok,
            occurred_at: Utc::now(),
        }
    }

    /// Record a forced disconnect.
    pub fn bounce(transport: TransportKind, remote_addr: SocketAddr) -> Self {
        Self {
            kind: AuditKind::Bounce,
            transport,
            remote_addr,
            local_addr: None,
            outcome: Outcome::Warning,
            occurred_at: Utc::now(),
        }
    }
}
