//! Audit event vocabulary.

use serde::{Deserialize, Serialize};

/// All audit event type names as constants.
pub mod event_types {
    pub const ACCEPT: &str = "accept";
    pub const BOUNCE: &str = "bounce";
}

/// Transport a client used to reach the proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransportKind {
    #[serde(rename = "plain")]
    Plain,
    #[serde(rename = "tls")]
    Tls,
    #[serde(rename = "quic-on-tls")]
    QuicOnTls,
}

impl TransportKind {
    /// Tag used in audit records.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportKind::Plain => "plain",
            TransportKind::Tls => "tls",
            TransportKind::QuicOnTls => "quic-on-tls",
        }
    }
}

impl std::fmt::Display for TransportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of audit record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditKind {
    /// Client completed its handshake.
    Accept,
    /// Client was disconnected administratively.
    Bounce,
}

impl AuditKind {
    pub fn event_type(&self) -> &'static str {
        match self {
            AuditKind::Accept => event_types::ACCEPT,
            AuditKind::Bounce => event_types::BOUNCE,
        }
    }
}

impl std::fmt::Display for AuditKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.event_type())
    }
}

/// Outcome recorded with an audit event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    #[default]
    Ok,
    Warning,
}
