//! mux front-end
//!
//! Client-facing side of the mux connection proxy.
//!
//! This service:
//! - Derives the data topology from the tnsnames descriptor (optional)
//! - Exports routing variables for the worker side
//! - Accepts clients over plain TCP, TLS or QUIC
//! - Bounces clients beyond the connection limit

use std::sync::Arc;

use anyhow::{Context, Result};
use mux_events::{SharedAuditSink, TracingAuditSink};
use mux_frontend::{
    prepare_topology, serve, Config, ConnectionHandler, DrainHandler, Listener, ProcessShutdown,
    ServeStats,
};
use mux_topology::DescriptorLocations;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize tracing (prefer RUST_LOG, fallback to MUX_LOG_LEVEL)
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| config.log_level.clone().into()))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("Starting mux front-end");
    info!(
        bind_addr = %config.bind_addr,
        transport = %config.transport,
        service_name = %config.service_name,
        topology_from_descriptor = config.topology.enabled,
        max_connections = config.max_connections,
        "Configuration loaded"
    );

    // Routing variables go into the environment before any worker thread starts.
    prepare_topology(&config, DescriptorLocations::from_env(), &ProcessShutdown)?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to build the async runtime")?
        .block_on(run(config))
}

async fn run(config: Config) -> Result<()> {
    let audit: SharedAuditSink = Arc::new(TracingAuditSink);
    let listener = Arc::new(
        Listener::bind_or_shutdown(&config.listener_config(), audit, &ProcessShutdown).await?,
    );

    let handler: Arc<dyn ConnectionHandler> = Arc::new(DrainHandler);
    let stats = Arc::new(ServeStats::default());
    let serve_task = tokio::spawn(serve(
        Arc::clone(&listener),
        handler,
        config.serve_limits(),
        Arc::clone(&stats),
    ));

    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Interrupt received, closing listener"),
        Err(e) => error!(error = %e, "Cannot listen for interrupt, closing listener"),
    }
    listener.close().await;

    match serve_task.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!(error = %e, "Accept loop failed"),
        Err(e) => error!(error = %e, "Accept loop panicked"),
    }
    info!("mux front-end stopped");
    Ok(())
}
