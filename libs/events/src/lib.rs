//! # mux-events
//!
//! Audit event definitions for the mux front-end transport layer.
//!
//! ## Design Principles
//!
//! - Events are emitted after a state transition has completed, never before
//! - Emission is decoupled from control flow: the transport returns its
//!   result regardless of what the sink does with the event
//! - Events carry the transport kind so operators can tell plain, TLS and
//!   QUIC clients apart
//!
//! ## Event Types
//!
//! - `accept` - a client connection finished its handshake
//! - `bounce` - the proxy forcibly disconnected a client

mod envelope;
mod sink;
mod types;

pub use envelope::*;
pub use sink::{AuditSink, NoopAuditSink, SharedAuditSink, TracingAuditSink};
pub use types::*;
