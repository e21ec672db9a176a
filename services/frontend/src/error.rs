//! Transport error types.

use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by listeners and client connections.
///
/// Material, bind and endpoint errors are configuration-fatal; the rest are
/// scoped to a single connection or to a closed listener.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Key or certificate file could not be read.
    #[error("cannot read {what} {path}: {source}")]
    MaterialRead {
        what: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// File contents are not a usable PEM block.
    #[error("cannot decode PEM in {path}: {detail}")]
    PemDecode { path: PathBuf, detail: String },

    /// Private key decryption failed.
    #[error("cannot decrypt private key: {0}")]
    KeyDecrypt(String),

    /// Certificate chain or key rejected.
    #[error("invalid certificate material: {0}")]
    Certificate(String),

    /// Service address could not be bound.
    #[error("cannot bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    /// QUIC endpoint could not be configured.
    #[error("cannot create QUIC endpoint on {addr}: {detail}")]
    QuicEndpoint { addr: SocketAddr, detail: String },

    /// Client failed the TLS handshake; the stream has been closed.
    #[error("handshake refused: {0}")]
    HandshakeRefused(String),

    /// QUIC connection has no live session.
    #[error("no live QUIC session")]
    NoSession,

    /// I/O attempted on a TLS connection before its handshake.
    #[error("TLS handshake required before I/O")]
    HandshakeRequired,

    /// Connection already closed.
    #[error("connection closed")]
    Closed,

    /// Listener closed; no further connections will be accepted.
    #[error("listener closed")]
    ListenerClosed,

    /// Per-call QUIC stream failure.
    #[error("QUIC stream error: {0}")]
    QuicStream(String),

    /// QUIC session failure.
    #[error("QUIC connection error: {0}")]
    QuicConnection(#[from] quinn::ConnectionError),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

impl TransportError {
    /// Standardized reason code for this error.
    pub fn reason_code(&self) -> &'static str {
        match self {
            TransportError::MaterialRead { .. } => "material_read_failed",
            TransportError::PemDecode { .. } => "pem_decode_failed",
            TransportError::KeyDecrypt(_) => "key_decrypt_failed",
            TransportError::Certificate(_) => "certificate_invalid",
            TransportError::Bind { .. } => "bind_failed",
            TransportError::QuicEndpoint { .. } => "quic_endpoint_failed",
            TransportError::HandshakeRefused(_) => "handshake_refused",
            TransportError::NoSession => "no_session",
            TransportError::HandshakeRequired => "handshake_required",
            TransportError::Closed => "closed",
            TransportError::ListenerClosed => "listener_closed",
            TransportError::QuicStream(_) => "quic_stream_error",
            TransportError::QuicConnection(_) => "quic_connection_error",
            TransportError::Io(_) => "io_error",
        }
    }

    /// Whether the process cannot continue after this error.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            TransportError::MaterialRead { .. }
                | TransportError::PemDecode { .. }
                | TransportError::KeyDecrypt(_)
                | TransportError::Certificate(_)
                | TransportError::Bind { .. }
                | TransportError::QuicEndpoint { .. }
        )
    }
}

impl From<TransportError> for io::Error {
    fn from(err: TransportError) -> Self {
        let kind = match &err {
            TransportError::Io(e) => e.kind(),
            TransportError::HandshakeRefused(_) => io::ErrorKind::ConnectionRefused,
            TransportError::NoSession
            | TransportError::HandshakeRequired
            | TransportError::Closed => io::ErrorKind::NotConnected,
            TransportError::Bind { source, .. } => source.kind(),
            _ => io::ErrorKind::Other,
        };
        io::Error::new(kind, err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handshake_refused_is_connection_refused() {
        let err: io::Error = TransportError::HandshakeRefused("bad record".into()).into();
        assert_eq!(err.kind(), io::ErrorKind::ConnectionRefused);
    }

    #[test]
    fn test_fatal_classification() {
        assert!(TransportError::KeyDecrypt("x".into()).is_fatal());
        assert!(TransportError::Bind {
            addr: "127.0.0.1:1".parse().unwrap(),
            source: io::Error::from(io::ErrorKind::AddrInUse),
        }
        .is_fatal());
        assert!(!TransportError::HandshakeRefused("x".into()).is_fatal());
        assert!(!TransportError::ListenerClosed.is_fatal());
        assert_eq!(TransportError::NoSession.reason_code(), "no_session");
    }
}
