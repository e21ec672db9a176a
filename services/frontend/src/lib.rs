//! mux front-end transport layer.
//!
//! Accepts client connections over plain TCP, TLS or QUIC and presents them
//! to upstream request routing as one connection type. Startup also derives
//! the data topology (shards, standby failover, read split) through
//! `mux-topology`.

pub mod config;
pub mod error;
pub mod serve;
pub mod shutdown;
pub mod startup;
pub mod transport;

pub use config::Config;
pub use error::TransportError;
pub use serve::{serve, ConnectionHandler, DrainHandler, ServeLimits, ServeStats};
pub use shutdown::{ProcessShutdown, ShutdownTrigger};
pub use startup::{prepare_topology, LoggingFailoverInit};
pub use transport::{ClientConn, Listener, ListenerConfig, TlsFiles, TransportMode};
