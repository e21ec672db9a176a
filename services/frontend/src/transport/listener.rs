//! Listeners for the three client transports.
//!
//! Each variant binds the service address at construction, hands out one
//! [`ClientConn`] per `accept()` call, and stops accepting on `close()`.
//! The variant is chosen once from [`TransportMode`].

use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;

use mux_events::SharedAuditSink;
use quinn::crypto::rustls::QuicServerConfig;
use quinn::VarInt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch, Mutex, RwLock};
use tokio_rustls::TlsAcceptor;
use tracing::{debug, error, info};

use super::conn::{ClientConn, QUIC_CLOSE_CODE, QUIC_CLOSE_REASON};
use super::tls::{self, TlsFiles};
use crate::error::TransportError;
use crate::shutdown::ShutdownTrigger;

/// How clients reach the proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportMode {
    /// Plain TCP.
    #[default]
    Plain,
    /// TLS over TCP.
    Tls,
    /// QUIC (TLS 1.3 over UDP).
    Quic,
}

impl FromStr for TransportMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "plain" | "tcp" => Ok(TransportMode::Plain),
            "tls" => Ok(TransportMode::Tls),
            "quic" => Ok(TransportMode::Quic),
            other => Err(format!(
                "unknown transport mode {:?} (expected plain, tls or quic)",
                other
            )),
        }
    }
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportMode::Plain => write!(f, "plain"),
            TransportMode::Tls => write!(f, "tls"),
            TransportMode::Quic => write!(f, "quic"),
        }
    }
}

/// Configuration for a listener.
#[derive(Debug, Clone)]
pub struct ListenerConfig {
    /// Address to bind to.
    pub bind_addr: SocketAddr,
    /// Transport variant.
    pub mode: TransportMode,
    /// Key material for the TLS and QUIC variants.
    pub tls: TlsFiles,
}

impl ListenerConfig {
    /// Create a new listener configuration.
    pub fn new(bind_addr: SocketAddr, mode: TransportMode) -> Self {
        Self {
            bind_addr,
            mode,
            tls: TlsFiles::default(),
        }
    }

    pub fn with_tls(mut self, tls: TlsFiles) -> Self {
        self.tls = tls;
        self
    }
}

/// A bound listener of one of the three transport variants.
pub enum Listener {
    Plain(PlainListener),
    Tls(TlsListener),
    Quic(QuicListener),
}

impl Listener {
    /// Bind the variant selected by `config.mode`.
    pub async fn bind(
        config: &ListenerConfig,
        audit: SharedAuditSink,
    ) -> Result<Self, TransportError> {
        let listener = match config.mode {
            TransportMode::Plain => {
                Listener::Plain(PlainListener::bind(config.bind_addr, audit).await?)
            }
            TransportMode::Tls => {
                let server_config = tls::load_server_config(&config.tls)?;
                Listener::Tls(TlsListener::bind(config.bind_addr, server_config, audit).await?)
            }
            TransportMode::Quic => {
                let server_config = tls::load_server_config(&config.tls)?;
                Listener::Quic(QuicListener::bind(config.bind_addr, server_config, audit)?)
            }
        };

        info!(
            bind_addr = %listener.local_addr(),
            mode = %config.mode,
            "Listener bound"
        );
        Ok(listener)
    }

    /// Bind, escalating configuration-fatal failures to a full process
    /// shutdown.
    ///
    /// The error is still returned so callers (and tests with a non-exiting
    /// trigger) see it.
    pub async fn bind_or_shutdown(
        config: &ListenerConfig,
        audit: SharedAuditSink,
        shutdown: &dyn ShutdownTrigger,
    ) -> Result<Self, TransportError> {
        let err = match Self::bind(config, audit).await {
            Ok(listener) => return Ok(listener),
            Err(e) => e,
        };

        error!(
            bind_addr = %config.bind_addr,
            mode = %config.mode,
            step = err.reason_code(),
            error = %err,
            "Cannot create listener"
        );
        if err.is_fatal() {
            shutdown.full_shutdown(&format!("{} caused failure in {}", err, err.reason_code()));
        }
        Err(err)
    }

    /// Wait for the next client. The connection is not yet handshaken.
    pub async fn accept(&self) -> Result<ClientConn, TransportError> {
        match self {
            Listener::Plain(listener) => listener.accept().await,
            Listener::Tls(listener) => listener.accept().await,
            Listener::Quic(listener) => listener.accept().await,
        }
    }

    /// Stop accepting. In-flight and later `accept()` calls fail with
    /// `ListenerClosed`.
    pub async fn close(&self) {
        match self {
            Listener::Plain(listener) => listener.close().await,
            Listener::Tls(listener) => listener.close().await,
            Listener::Quic(listener) => listener.close(),
        }
    }

    /// Address the listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        match self {
            Listener::Plain(listener) => listener.local_addr,
            Listener::Tls(listener) => listener.tcp.local_addr,
            Listener::Quic(listener) => listener.local_addr,
        }
    }

    pub fn mode(&self) -> TransportMode {
        match self {
            Listener::Plain(_) => TransportMode::Plain,
            Listener::Tls(_) => TransportMode::Tls,
            Listener::Quic(_) => TransportMode::Quic,
        }
    }
}

/// Wakes every pending `accept()` once the listener is closed.
struct CloseSignal(watch::Sender<bool>);

impl CloseSignal {
    fn new() -> Self {
        Self(watch::channel(false).0)
    }

    fn close(&self) {
        self.0.send_replace(true);
    }

    fn is_closed(&self) -> bool {
        *self.0.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.0.subscribe()
    }

    async fn closed(&self) {
        wait_closed(&mut self.subscribe()).await;
    }
}

/// Plain TCP listener.
pub struct PlainListener {
    socket: RwLock<Option<TcpListener>>,
    local_addr: SocketAddr,
    closed: CloseSignal,
    audit: SharedAuditSink,
}

impl PlainListener {
    async fn bind(addr: SocketAddr, audit: SharedAuditSink) -> Result<Self, TransportError> {
        let socket = TcpListener::bind(addr)
            .await
            .map_err(|source| TransportError::Bind { addr, source })?;
        let local_addr = socket
            .local_addr()
            .map_err(|source| TransportError::Bind { addr, source })?;

        Ok(Self {
            socket: RwLock::new(Some(socket)),
            local_addr,
            closed: CloseSignal::new(),
            audit,
        })
    }

    async fn accept(&self) -> Result<ClientConn, TransportError> {
        let (stream, remote_addr, local_addr) = self.accept_stream().await?;
        Ok(ClientConn::plain(
            stream,
            remote_addr,
            local_addr,
            Arc::clone(&self.audit),
        ))
    }

    async fn accept_stream(&self) -> Result<(TcpStream, SocketAddr, SocketAddr), TransportError> {
        let guard = self.socket.read().await;
        let socket = guard.as_ref().ok_or(TransportError::ListenerClosed)?;
        if self.closed.is_closed() {
            return Err(TransportError::ListenerClosed);
        }

        tokio::select! {
            result = socket.accept() => {
                let (stream, remote_addr) = result?;
                let local_addr = stream.local_addr()?;
                Ok((stream, remote_addr, local_addr))
            }
            _ = self.closed.closed() => Err(TransportError::ListenerClosed),
        }
    }

    async fn close(&self) {
        self.closed.close();
        // Pending accepts hold read guards until the signal wakes them.
        if self.socket.write().await.take().is_some() {
            info!(bind_addr = %self.local_addr, "Listener closed");
        }
    }
}

/// TLS-over-TCP listener. Accepted connections handshake lazily in
/// [`ClientConn::handshake`].
pub struct TlsListener {
    tcp: PlainListener,
    acceptor: TlsAcceptor,
}

impl TlsListener {
    async fn bind(
        addr: SocketAddr,
        server_config: Arc<rustls::ServerConfig>,
        audit: SharedAuditSink,
    ) -> Result<Self, TransportError> {
        Ok(Self {
            tcp: PlainListener::bind(addr, audit).await?,
            acceptor: TlsAcceptor::from(server_config),
        })
    }

    async fn accept(&self) -> Result<ClientConn, TransportError> {
        let (stream, remote_addr, local_addr) = self.tcp.accept_stream().await?;
        Ok(ClientConn::tls(
            stream,
            self.acceptor.clone(),
            remote_addr,
            local_addr,
            Arc::clone(&self.tcp.audit),
        ))
    }

    async fn close(&self) {
        self.tcp.close().await;
    }
}

/// Established QUIC sessions waiting for `accept()`.
const QUIC_ACCEPT_QUEUE: usize = 256;

/// QUIC listener. Sessions are fully established before `accept()` returns.
///
/// A background task takes every incoming session off the endpoint and
/// completes its handshake in a task of its own, so a client that stalls
/// mid-handshake never holds up the others.
pub struct QuicListener {
    endpoint: quinn::Endpoint,
    local_addr: SocketAddr,
    ready: Mutex<mpsc::Receiver<quinn::Connection>>,
    closed: CloseSignal,
    audit: SharedAuditSink,
}

impl QuicListener {
    fn bind(
        addr: SocketAddr,
        server_config: Arc<rustls::ServerConfig>,
        audit: SharedAuditSink,
    ) -> Result<Self, TransportError> {
        let crypto = QuicServerConfig::try_from(server_config).map_err(|e| {
            TransportError::QuicEndpoint {
                addr,
                detail: e.to_string(),
            }
        })?;
        let server_config = quinn::ServerConfig::with_crypto(Arc::new(crypto));
        let endpoint = quinn::Endpoint::server(server_config, addr)
            .map_err(|source| TransportError::Bind { addr, source })?;
        let local_addr = endpoint
            .local_addr()
            .map_err(|source| TransportError::Bind { addr, source })?;

        let closed = CloseSignal::new();
        let (ready_tx, ready_rx) = mpsc::channel(QUIC_ACCEPT_QUEUE);
        tokio::spawn(drive_incoming(endpoint.clone(), closed.subscribe(), ready_tx));

        Ok(Self {
            endpoint,
            local_addr,
            ready: Mutex::new(ready_rx),
            closed,
            audit,
        })
    }

    async fn accept(&self) -> Result<ClientConn, TransportError> {
        if self.closed.is_closed() {
            return Err(TransportError::ListenerClosed);
        }

        let mut ready = tokio::select! {
            ready = self.ready.lock() => ready,
            _ = self.closed.closed() => return Err(TransportError::ListenerClosed),
        };
        tokio::select! {
            connection = ready.recv() => {
                let connection = connection.ok_or(TransportError::ListenerClosed)?;
                Ok(ClientConn::quic(
                    connection,
                    self.local_addr,
                    Arc::clone(&self.audit),
                ))
            }
            _ = self.closed.closed() => Err(TransportError::ListenerClosed),
        }
    }

    /// Stop accepting new sessions. The UDP socket stays open while sessions
    /// it carries are alive.
    fn close(&self) {
        self.closed.close();
        self.endpoint.set_server_config(None);
        // Skipped while an accept holds the queue; those sessions close when
        // the listener is dropped.
        if let Ok(mut ready) = self.ready.try_lock() {
            ready.close();
            while let Ok(connection) = ready.try_recv() {
                connection.close(VarInt::from_u32(QUIC_CLOSE_CODE), QUIC_CLOSE_REASON);
            }
        }
        info!(bind_addr = %self.local_addr, "QUIC listener closed");
    }
}

/// Take incoming sessions off the endpoint until the listener closes.
async fn drive_incoming(
    endpoint: quinn::Endpoint,
    mut closed: watch::Receiver<bool>,
    ready: mpsc::Sender<quinn::Connection>,
) {
    loop {
        let incoming = tokio::select! {
            incoming = endpoint.accept() => match incoming {
                Some(incoming) => incoming,
                None => break,
            },
            _ = wait_closed(&mut closed) => break,
        };
        tokio::spawn(complete_handshake(incoming, ready.clone()));
    }
    debug!("QUIC incoming driver stopped");
}

async fn complete_handshake(
    incoming: quinn::Incoming,
    ready: mpsc::Sender<quinn::Connection>,
) {
    let remote_addr = incoming.remote_address();
    match incoming.await {
        Ok(connection) => {
            if ready.send(connection).await.is_err() {
                debug!(raddr = %remote_addr, "Listener closed, QUIC session dropped");
            }
        }
        Err(e) => info!(raddr = %remote_addr, error = %e, "QUIC handshake failed"),
    }
}

async fn wait_closed(closed: &mut watch::Receiver<bool>) {
    // A dropped sender also counts as closed.
    let _ = closed.wait_for(|closed| *closed).await;
}
