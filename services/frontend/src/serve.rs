//! Accept loop and per-connection dispatch.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, trace, warn, Instrument};

use crate::error::TransportError;
use crate::transport::{ClientConn, Listener};

/// Default maximum concurrent client connections.
pub const DEFAULT_MAX_CONNECTIONS: usize = 10000;

/// Pause after an accept error before trying again.
const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Upstream consumer of handshaken client connections.
#[async_trait]
pub trait ConnectionHandler: Send + Sync + 'static {
    async fn handle(&self, conn: ClientConn);
}

/// Limits applied by [`serve`].
#[derive(Debug, Clone, Copy)]
pub struct ServeLimits {
    /// Connections beyond this many are bounced.
    pub max_connections: usize,
}

impl Default for ServeLimits {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }
}

/// Counters for the accept loop.
#[derive(Debug, Default)]
pub struct ServeStats {
    /// Total connections accepted.
    pub connections_accepted: AtomicU64,
    /// Connections currently being handled.
    pub connections_active: AtomicU64,
    /// Connections finished.
    pub connections_closed: AtomicU64,
    /// Connections bounced because the limit was reached.
    pub connections_rejected: AtomicU64,
    /// Connections that failed their handshake.
    pub handshakes_failed: AtomicU64,
}

/// Accept clients until the listener is closed.
///
/// Each connection gets its own task: handshake, then `handler`. A failed
/// handshake only drops that client.
pub async fn serve(
    listener: Arc<Listener>,
    handler: Arc<dyn ConnectionHandler>,
    limits: ServeLimits,
    stats: Arc<ServeStats>,
) -> Result<(), TransportError> {
    let conn_semaphore = Arc::new(Semaphore::new(limits.max_connections));
    info!(
        bind_addr = %listener.local_addr(),
        mode = %listener.mode(),
        max_connections = limits.max_connections,
        "Accept loop started"
    );

    loop {
        let conn = match listener.accept().await {
            Ok(conn) => conn,
            Err(TransportError::ListenerClosed) => {
                info!("Listener closed, accept loop stopped");
                return Ok(());
            }
            Err(e) => {
                error!(error = %e, "Accept error");
                tokio::time::sleep(ACCEPT_RETRY_DELAY).await;
                continue;
            }
        };

        let peer_addr = conn.remote_addr();
        let permit = match Arc::clone(&conn_semaphore).try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                stats.connections_rejected.fetch_add(1, Ordering::Relaxed);
                warn!(peer_addr = %peer_addr, "Connection rejected: max connections reached");
                tokio::spawn(conn.bounce());
                continue;
            }
        };

        stats.connections_accepted.fetch_add(1, Ordering::Relaxed);
        stats.connections_active.fetch_add(1, Ordering::Relaxed);

        let handler = Arc::clone(&handler);
        let stats = Arc::clone(&stats);
        tokio::spawn(
            async move {
                let mut conn = conn;
                match conn.handshake().await {
                    Ok(()) => handler.handle(conn).await,
                    Err(e) => {
                        stats.handshakes_failed.fetch_add(1, Ordering::Relaxed);
                        debug!(error = %e, reason = e.reason_code(), "Handshake failed");
                        let _ = conn.close().await;
                    }
                }

                stats.connections_active.fetch_sub(1, Ordering::Relaxed);
                stats.connections_closed.fetch_add(1, Ordering::Relaxed);
                drop(permit);
            }
            .instrument(tracing::info_span!("connection", peer = %peer_addr)),
        );
    }
}

/// Reads and discards client bytes until end of stream, then closes.
#[derive(Debug, Default, Clone, Copy)]
pub struct DrainHandler;

#[async_trait]
impl ConnectionHandler for DrainHandler {
    async fn handle(&self, mut conn: ClientConn) {
        let mut buf = vec![0u8; 8192];
        let mut total = 0u64;
        loop {
            match conn.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => {
                    total += n as u64;
                    trace!(bytes = n, "Client data drained");
                }
                Err(e) => {
                    debug!(error = %e, "Client read failed");
                    break;
                }
            }
        }
        let _ = conn.close().await;
        debug!(bytes = total, "Connection closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serve_limits_default() {
        assert_eq!(ServeLimits::default().max_connections, DEFAULT_MAX_CONNECTIONS);
    }

    #[test]
    fn test_serve_stats() {
        let stats = ServeStats::default();
        stats.connections_accepted.fetch_add(1, Ordering::Relaxed);
        assert_eq!(stats.connections_accepted.load(Ordering::Relaxed), 1);
        assert_eq!(stats.handshakes_failed.load(Ordering::Relaxed), 0);
    }
}
