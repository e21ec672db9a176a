//! Topology inference from the descriptor naming convention.

use std::path::PathBuf;

use tracing::{debug, info, warn};

use crate::descriptor::{self, DescriptorIndex};
use crate::error::TopologyError;
use crate::naming;
use crate::routing::{RoutingRole, RoutingVars};
use crate::settings::{TopologyConfig, TopologySettings};

/// File name of the descriptor inside either search directory.
pub const DESCRIPTOR_FILE_NAME: &str = "tnsnames.ora";

/// Read split applied when every shard has a read-only companion.
pub const INFERRED_READ_SPLIT_PCT: u32 = 50;

/// Initializes the failover (TAF) subsystem once topology is final.
pub trait FailoverInit: Send + Sync {
    fn init_failover(&self, num_shards: usize);
}

/// Candidate descriptor paths, tried in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DescriptorLocations {
    pub primary: Option<PathBuf>,
    pub fallback: Option<PathBuf>,
}

impl DescriptorLocations {
    pub fn new(primary: Option<PathBuf>, fallback: Option<PathBuf>) -> Self {
        Self { primary, fallback }
    }

    /// `$TNS_ADMIN/tnsnames.ora`, then `$ORACLE_HOME/network/admin/tnsnames.ora`.
    pub fn from_env() -> Self {
        let primary = std::env::var_os("TNS_ADMIN")
            .map(|dir| PathBuf::from(dir).join(DESCRIPTOR_FILE_NAME));
        let fallback = std::env::var_os("ORACLE_HOME").map(|dir| {
            PathBuf::from(dir)
                .join("network")
                .join("admin")
                .join(DESCRIPTOR_FILE_NAME)
        });
        Self { primary, fallback }
    }

    /// Load the first candidate that parses. Failures are logged, not returned.
    fn load(&self) -> Option<(PathBuf, DescriptorIndex)> {
        for path in [&self.primary, &self.fallback].into_iter().flatten() {
            match descriptor::load(path) {
                Ok(index) => return Some((path.clone(), index)),
                Err(e) => warn!(error = %e, "Descriptor unavailable"),
            }
        }
        None
    }
}

/// Result of topology inference.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopologyOutcome {
    /// Final topology, overrides included.
    pub config: TopologyConfig,
    /// Routing variables for every role that was found.
    pub routing: RoutingVars,
    /// Descriptor file that was used, if any.
    pub descriptor: Option<PathBuf>,
}

/// Derives sharding, failover and read-split configuration at startup.
#[derive(Debug, Clone)]
pub struct TopologyDeriver {
    settings: TopologySettings,
    locations: DescriptorLocations,
}

/// Names derived from the service root, computed once per run.
struct RootNames {
    base: String,
    standby: String,
    readonly: String,
    failover_root: bool,
}

impl TopologyDeriver {
    pub fn new(settings: TopologySettings, locations: DescriptorLocations) -> Self {
        Self {
            settings,
            locations,
        }
    }

    /// Infer topology for `service`, apply overrides, and initialize failover
    /// when it ends up enabled.
    ///
    /// A missing descriptor is not an error: inference is skipped and only
    /// the overrides shape the result. A service name too short for the
    /// naming convention is.
    pub fn derive(
        &self,
        service: &str,
        failover: &dyn FailoverInit,
    ) -> Result<TopologyOutcome, TopologyError> {
        let mut outcome = TopologyOutcome::default();
        if !self.settings.enabled {
            debug!("Topology inference disabled");
            return Ok(outcome);
        }

        let prefix = &self.settings.log_prefix;
        let base = naming::base_name(service, prefix)?;
        let names = RootNames {
            standby: naming::standby_name(&base)?,
            failover_root: naming::is_failover_root(&base)?,
            readonly: naming::readonly_name(&base, prefix),
            base,
        };

        match self.locations.load() {
            Some((path, index)) => {
                info!(
                    descriptor = %path.display(),
                    base_name = %names.base,
                    "Inferring topology from descriptor"
                );
                infer(&index, &names, &mut outcome);
                outcome.descriptor = Some(path);
            }
            None => {
                info!(base_name = %names.base, "No descriptor found, topology inference skipped");
            }
        }

        if !self.settings.overrides.is_empty() {
            debug!(overrides = ?self.settings.overrides, "Applying topology overrides");
        }
        self.settings.overrides.apply(&mut outcome.config);

        if outcome.config.failover_enabled {
            failover.init_failover(outcome.config.num_shards);
        }

        info!(
            sharding_enabled = outcome.config.sharding_enabled,
            num_shards = outcome.config.num_shards,
            failover_enabled = outcome.config.failover_enabled,
            readonly_split_pct = outcome.config.readonly_split_pct,
            routing_vars = outcome.routing.len(),
            "Topology derived"
        );
        Ok(outcome)
    }
}

fn infer(index: &DescriptorIndex, names: &RootNames, outcome: &mut TopologyOutcome) {
    let config = &mut outcome.config;
    let routing = &mut outcome.routing;

    // Shards must be numbered contiguously from zero; the first gap ends the scan.
    let mut shards = 0usize;
    let mut standby_shards = 0usize;
    let mut readonly_shards = 0usize;
    loop {
        let primary = naming::shard_name(&names.base, shards);
        if !index.contains(&primary) {
            break;
        }
        routing.set(RoutingRole::Primary, Some(shards), primary);

        let standby = naming::shard_name(&names.standby, shards);
        if names.failover_root && index.contains(&standby) {
            standby_shards += 1;
            routing.set(RoutingRole::Standby, Some(shards), standby);
        }

        let readonly = naming::shard_name(&names.readonly, shards);
        if index.contains(&readonly) {
            readonly_shards += 1;
            routing.set(RoutingRole::ReadOnly, Some(shards), readonly);
        }

        shards += 1;
    }

    if shards > 0 {
        config.sharding_enabled = true;
        config.num_shards = shards;
        info!(
            num_shards = shards,
            standby_shards, readonly_shards, "Sharded descriptor entries found"
        );

        if standby_shards == shards {
            config.failover_enabled = true;
            info!("Standby found for every shard, failover enabled");
        }
        if readonly_shards == shards {
            config.readonly_split_pct = INFERRED_READ_SPLIT_PCT;
            info!("Read-only replica found for every shard, read split enabled");
        }
        return;
    }

    if names.failover_root && index.contains(&names.standby) {
        config.failover_enabled = true;
        routing.set(RoutingRole::Standby, None, names.standby.clone());
        info!(standby = %names.standby, "Standby found, failover enabled");
    }

    if index.contains(&names.readonly) {
        config.readonly_split_pct = INFERRED_READ_SPLIT_PCT;
        routing.set(RoutingRole::ReadOnly, None, names.readonly.clone());
        info!(readonly = %names.readonly, "Read-only replica found, read split enabled");
    }
}
