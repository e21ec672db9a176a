//! Client-facing transports.
//!
//! This module provides:
//! - Plain TCP, TLS-over-TCP and QUIC listeners behind one [`Listener`] type
//! - A [`ClientConn`] that hides stream-vs-session differences
//! - TLS material loading shared by the TLS and QUIC variants
//!
//! ## Architecture
//!
//! ```text
//! Config -> Listener::bind -> accept() -> ClientConn -> handshake() -> upstream
//!              |                                           |
//!         TLS material                              accept audit event
//! ```

mod conn;
mod listener;
pub mod tls;

pub use conn::{ClientConn, QUIC_CLOSE_CODE, QUIC_CLOSE_REASON};
pub use listener::{
    Listener, ListenerConfig, PlainListener, QuicListener, TlsListener, TransportMode,
};
pub use tls::TlsFiles;
