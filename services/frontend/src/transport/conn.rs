//! Client connection abstraction.
//!
//! A `ClientConn` is either a byte stream (plain TCP, or TCP awaiting or
//! carrying TLS) or a QUIC session. The variant is fixed when the listener
//! accepts the connection.
//!
//! QUIC reads and writes are single-shot: every call opens its own
//! bidirectional stream and closes it before returning. Nothing is carried
//! from one call to the next.

use std::net::SocketAddr;

use mux_events::{AuditEvent, SharedAuditSink, TransportKind};
use quinn::{RecvStream, SendStream, VarInt};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_rustls::server::TlsStream;
use tokio_rustls::TlsAcceptor;
use tracing::{debug, info, warn};

use crate::error::TransportError;

/// Application close code sent when the proxy closes a QUIC session.
pub const QUIC_CLOSE_CODE: u32 = 0;

/// Reason sent when the proxy closes a QUIC session.
pub const QUIC_CLOSE_REASON: &[u8] = b"server closed the connection";

/// A client connection accepted by a [`Listener`](crate::Listener).
pub struct ClientConn {
    transport: TransportKind,
    remote_addr: SocketAddr,
    local_addr: SocketAddr,
    handshaken: bool,
    inner: ConnInner,
    audit: SharedAuditSink,
}

enum ConnInner {
    Stream(StreamState),
    Quic(QuicSession),
}

enum StreamState {
    Plain(TcpStream),
    TlsPending {
        stream: TcpStream,
        acceptor: TlsAcceptor,
    },
    Tls(Box<TlsStream<TcpStream>>),
    Closed,
}

struct QuicSession {
    connection: quinn::Connection,
    streams_opened: u64,
    closed: bool,
}

impl ClientConn {
    pub(crate) fn plain(
        stream: TcpStream,
        remote_addr: SocketAddr,
        local_addr: SocketAddr,
        audit: SharedAuditSink,
    ) -> Self {
        Self::new(
            TransportKind::Plain,
            remote_addr,
            local_addr,
            ConnInner::Stream(StreamState::Plain(stream)),
            audit,
        )
    }

    pub(crate) fn tls(
        stream: TcpStream,
        acceptor: TlsAcceptor,
        remote_addr: SocketAddr,
        local_addr: SocketAddr,
        audit: SharedAuditSink,
    ) -> Self {
        Self::new(
            TransportKind::Tls,
            remote_addr,
            local_addr,
            ConnInner::Stream(StreamState::TlsPending { stream, acceptor }),
            audit,
        )
    }

    pub(crate) fn quic(
        connection: quinn::Connection,
        local_addr: SocketAddr,
        audit: SharedAuditSink,
    ) -> Self {
        Self::new(
            TransportKind::QuicOnTls,
            connection.remote_address(),
            local_addr,
            ConnInner::Quic(QuicSession {
                connection,
                streams_opened: 0,
                closed: false,
            }),
            audit,
        )
    }

    fn new(
        transport: TransportKind,
        remote_addr: SocketAddr,
        local_addr: SocketAddr,
        inner: ConnInner,
        audit: SharedAuditSink,
    ) -> Self {
        Self {
            transport,
            remote_addr,
            local_addr,
            handshaken: false,
            inner,
            audit,
        }
    }

    /// Transport this client used.
    pub fn transport(&self) -> TransportKind {
        self.transport
    }

    /// Client address, captured at accept time.
    pub fn remote_addr(&self) -> SocketAddr {
        self.remote_addr
    }

    /// Proxy-side address, captured at accept time.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Whether `handshake` has completed.
    pub fn is_handshaken(&self) -> bool {
        self.handshaken
    }

    /// Number of QUIC streams opened so far; `None` for stream transports.
    pub fn quic_streams_opened(&self) -> Option<u64> {
        match &self.inner {
            ConnInner::Quic(session) => Some(session.streams_opened),
            ConnInner::Stream(_) => None,
        }
    }

    /// Complete the transport handshake and emit the `accept` audit event.
    ///
    /// TLS: drives the rustls handshake; on failure the stream is closed and
    /// `HandshakeRefused` is returned. QUIC: the listener already completed
    /// the handshake, so this only checks the session is still alive.
    /// Calling it again after success is a no-op.
    pub async fn handshake(&mut self) -> Result<(), TransportError> {
        if self.handshaken {
            return Ok(());
        }

        match &mut self.inner {
            ConnInner::Stream(state) => match std::mem::replace(state, StreamState::Closed) {
                StreamState::Plain(stream) => *state = StreamState::Plain(stream),
                StreamState::TlsPending { stream, acceptor } => {
                    debug!("Processing connection. Start handshake");
                    match acceptor.accept(stream).await {
                        Ok(tls) => {
                            debug!(
                                protocol = ?tls.get_ref().1.protocol_version(),
                                "TLS handshake OK"
                            );
                            *state = StreamState::Tls(Box::new(tls));
                        }
                        Err(e) => {
                            info!(error = %e, "Handshake error");
                            return Err(TransportError::HandshakeRefused(e.to_string()));
                        }
                    }
                }
                StreamState::Tls(tls) => *state = StreamState::Tls(tls),
                StreamState::Closed => return Err(TransportError::Closed),
            },
            ConnInner::Quic(session) => {
                if session.closed {
                    return Err(TransportError::NoSession);
                }
                if let Some(reason) = session.connection.close_reason() {
                    debug!(reason = %reason, "QUIC session already closed");
                    return Err(TransportError::NoSession);
                }
                debug!(rtt = ?session.connection.rtt(), "QUIC handshake OK");
            }
        }

        self.handshaken = true;
        self.audit.emit(AuditEvent::accept(
            self.transport,
            self.remote_addr,
            self.local_addr,
        ));
        Ok(())
    }

    /// Read once into `buf`. Returns 0 at end of stream.
    ///
    /// A transport failure closes the connection before the error is
    /// returned; later calls fail with `Closed`.
    pub async fn read(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        let result: Result<usize, TransportError> = match &mut self.inner {
            ConnInner::Stream(StreamState::Plain(stream)) => {
                stream.read(buf).await.map_err(Into::into)
            }
            ConnInner::Stream(StreamState::Tls(stream)) => {
                stream.read(buf).await.map_err(Into::into)
            }
            ConnInner::Stream(StreamState::TlsPending { .. }) => {
                return Err(TransportError::HandshakeRequired)
            }
            ConnInner::Stream(StreamState::Closed) => return Err(TransportError::Closed),
            ConnInner::Quic(session) => session.read(buf).await,
        };
        self.close_on_failure(result)
    }

    /// Write all of `buf`. Returns the number of bytes written.
    ///
    /// Failures close the connection, as for [`read`](Self::read).
    pub async fn write(&mut self, buf: &[u8]) -> Result<usize, TransportError> {
        let result: Result<usize, TransportError> = match &mut self.inner {
            ConnInner::Stream(StreamState::Plain(stream)) => {
                stream.write_all(buf).await.map(|()| buf.len()).map_err(Into::into)
            }
            ConnInner::Stream(StreamState::Tls(stream)) => async {
                stream.write_all(buf).await?;
                stream.flush().await?;
                Ok::<_, TransportError>(buf.len())
            }
            .await,
            ConnInner::Stream(StreamState::TlsPending { .. }) => {
                return Err(TransportError::HandshakeRequired)
            }
            ConnInner::Stream(StreamState::Closed) => return Err(TransportError::Closed),
            ConnInner::Quic(session) => session.write(buf).await,
        };
        self.close_on_failure(result)
    }

    fn close_on_failure(
        &mut self,
        result: Result<usize, TransportError>,
    ) -> Result<usize, TransportError> {
        if let Err(e) = &result {
            if matches!(e, TransportError::Closed) {
                return result;
            }
            debug!(error = %e, reason = e.reason_code(), "Connection I/O failed, closing");
            match &mut self.inner {
                // Dropping the stream releases the socket.
                ConnInner::Stream(state) => *state = StreamState::Closed,
                ConnInner::Quic(session) => session.close(),
            }
        }
        result
    }

    /// Release the stream or session. Closing twice is a no-op.
    pub async fn close(&mut self) -> Result<(), TransportError> {
        match &mut self.inner {
            ConnInner::Stream(state) => match std::mem::replace(state, StreamState::Closed) {
                StreamState::Plain(mut stream) => stream.shutdown().await?,
                StreamState::Tls(mut stream) => stream.shutdown().await?,
                StreamState::TlsPending { stream, .. } => drop(stream),
                StreamState::Closed => {}
            },
            ConnInner::Quic(session) => session.close(),
        }
        Ok(())
    }

    /// Forcibly disconnect the client and emit a `bounce` audit event.
    pub async fn bounce(mut self) {
        warn!(
            raddr = %self.remote_addr,
            transport = %self.transport,
            "Bouncing client connection"
        );
        if let Err(e) = self.close().await {
            debug!(error = %e, "Close during bounce failed");
        }
        self.audit
            .emit(AuditEvent::bounce(self.transport, self.remote_addr));
    }
}

impl std::fmt::Debug for ClientConn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConn")
            .field("transport", &self.transport)
            .field("remote_addr", &self.remote_addr)
            .field("local_addr", &self.local_addr)
            .field("handshaken", &self.handshaken)
            .finish_non_exhaustive()
    }
}

impl QuicSession {
    async fn open_stream(&mut self) -> Result<(SendStream, RecvStream), TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        let streams = self.connection.open_bi().await?;
        self.streams_opened += 1;
        Ok(streams)
    }

    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        let (mut send, mut recv) = self.open_stream().await?;
        // Finishing our half announces the stream to the peer.
        send.finish()
            .map_err(|e| TransportError::QuicStream(e.to_string()))?;

        let result = recv.read(buf).await;
        let _ = recv.stop(VarInt::from_u32(QUIC_CLOSE_CODE));
        match result {
            Ok(Some(n)) => Ok(n),
            Ok(None) => Ok(0),
            Err(e) => Err(TransportError::QuicStream(e.to_string())),
        }
    }

    async fn write(&mut self, buf: &[u8]) -> Result<usize, TransportError> {
        let (mut send, mut recv) = self.open_stream().await?;
        let result = send.write_all(buf).await;
        let _ = send.finish();
        let _ = recv.stop(VarInt::from_u32(QUIC_CLOSE_CODE));
        result.map_err(|e| TransportError::QuicStream(e.to_string()))?;
        Ok(buf.len())
    }

    fn close(&mut self) {
        if !self.closed {
            self.connection
                .close(VarInt::from_u32(QUIC_CLOSE_CODE), QUIC_CLOSE_REASON);
            self.closed = true;
        }
    }
}
