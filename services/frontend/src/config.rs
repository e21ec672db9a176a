//! Front-end configuration (env-driven).

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use mux_topology::{TopologyOverrides, TopologySettings, OVERRIDE_UNSET};

use crate::serve::{ServeLimits, DEFAULT_MAX_CONNECTIONS};
use crate::transport::tls::KEY_PASSPHRASE_ENV;
use crate::transport::{ListenerConfig, TlsFiles, TransportMode};

/// Default service address.
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:10101";

/// Front-end configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Service address.
    pub bind_addr: SocketAddr,

    /// Client transport.
    pub transport: TransportMode,

    /// Private key PEM file.
    pub key_file: PathBuf,

    /// Certificate chain PEM file.
    pub cert_chain_file: PathBuf,

    /// Passphrase for an encrypted private key.
    pub key_passphrase: Option<String>,

    /// Service instance name fed to topology inference.
    pub service_name: String,

    /// Topology inference settings.
    pub topology: TopologySettings,

    /// Max concurrent client connections.
    pub max_connections: usize,

    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind_addr: SocketAddr = lookup("MUX_BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse()
            .context("MUX_BIND_ADDR must be a socket address (example: 0.0.0.0:10101).")?;

        let transport: TransportMode = lookup("MUX_TRANSPORT")
            .map(|v| v.parse())
            .transpose()
            .map_err(anyhow::Error::msg)
            .context("MUX_TRANSPORT must be one of plain, tls, quic.")?
            .unwrap_or(TransportMode::Plain);

        let key_file = lookup("MUX_KEY_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("srv.key"));
        let cert_chain_file = lookup("MUX_CERT_CHAIN_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("srv.crt"));
        let key_passphrase = lookup(KEY_PASSPHRASE_ENV).filter(|v| !v.is_empty());

        let service_name = lookup("MUX_SERVICE_NAME").unwrap_or_else(|| "mux".to_string());
        let log_prefix = lookup("MUX_STATE_LOG_PREFIX").unwrap_or_else(|| "mux".to_string());

        let enabled = lookup("MUX_CFG_FROM_TNS")
            .map(|v| v == "1" || v.to_lowercase() == "true")
            .unwrap_or(false);

        let num_shards = parse_override(&lookup, "MUX_CFG_FROM_TNS_OVERRIDE_NUM_SHARDS")?;
        let failover = parse_override(&lookup, "MUX_CFG_FROM_TNS_OVERRIDE_TAF")?;
        let read_split = parse_override(&lookup, "MUX_CFG_FROM_TNS_OVERRIDE_RW_SPLIT")?;

        let max_connections: usize = lookup("MUX_MAX_CONNECTIONS")
            .map(|v| v.parse())
            .transpose()
            .context("MUX_MAX_CONNECTIONS must be an integer.")?
            .unwrap_or(DEFAULT_MAX_CONNECTIONS)
            .max(1);

        let log_level = lookup("MUX_LOG_LEVEL").unwrap_or_else(|| "info".to_string());

        Ok(Self {
            bind_addr,
            transport,
            key_file,
            cert_chain_file,
            key_passphrase,
            service_name,
            topology: TopologySettings {
                enabled,
                log_prefix,
                overrides: TopologyOverrides::from_sentinels(num_shards, failover, read_split),
            },
            max_connections,
            log_level,
        })
    }

    /// Listener construction parameters.
    pub fn listener_config(&self) -> ListenerConfig {
        let mut tls = TlsFiles::new(&self.key_file, &self.cert_chain_file);
        tls.key_passphrase = self.key_passphrase.clone();
        ListenerConfig::new(self.bind_addr, self.transport).with_tls(tls)
    }

    pub fn serve_limits(&self) -> ServeLimits {
        ServeLimits {
            max_connections: self.max_connections,
        }
    }
}

fn parse_override<F>(lookup: &F, key: &str) -> Result<i64>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|v| v.trim().parse::<i64>())
        .transpose()
        .with_context(|| format!("{key} must be an integer (-1 means unset)."))
        .map(|v| v.unwrap_or(OVERRIDE_UNSET))
}
