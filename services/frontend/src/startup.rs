//! Startup steps that run before the async runtime exists.

use mux_topology::{
    DescriptorLocations, FailoverInit, TopologyDeriver, TopologyError, TopologyOutcome,
};
use tracing::info;

use crate::config::Config;
use crate::shutdown::ShutdownTrigger;

/// Logs the shard count failover was initialized for.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingFailoverInit;

impl FailoverInit for LoggingFailoverInit {
    fn init_failover(&self, num_shards: usize) {
        info!(num_shards, "Failover initialized");
    }
}

/// Derive the topology and export its routing variables.
///
/// Writes the process environment, so call it while the process is still
/// single-threaded. Name precondition errors are configuration-fatal: the
/// shutdown trigger fires before the error is returned.
pub fn prepare_topology(
    config: &Config,
    locations: DescriptorLocations,
    shutdown: &dyn ShutdownTrigger,
) -> Result<TopologyOutcome, TopologyError> {
    let deriver = TopologyDeriver::new(config.topology.clone(), locations);
    let outcome = match deriver.derive(&config.service_name, &LoggingFailoverInit) {
        Ok(outcome) => outcome,
        Err(e) => {
            shutdown.full_shutdown(&format!("topology inference failed: {e}"));
            return Err(e);
        }
    };

    outcome.routing.export();
    info!(
        sharding_enabled = outcome.config.sharding_enabled,
        num_shards = outcome.config.num_shards,
        failover_enabled = outcome.config.failover_enabled,
        readonly_split_pct = outcome.config.readonly_split_pct,
        routing_vars = outcome.routing.len(),
        "Topology ready"
    );
    Ok(outcome)
}
