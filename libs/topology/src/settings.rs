//! Topology inputs and derived state.

/// Value used by configuration sources to mean "override not set".
pub const OVERRIDE_UNSET: i64 = -1;

/// Manual overrides applied after inference.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TopologyOverrides {
    /// Force the shard count.
    pub num_shards: Option<usize>,
    /// Force failover on or off.
    pub failover: Option<bool>,
    /// Force the read/write split percentage.
    pub read_split_pct: Option<u32>,
}

impl TopologyOverrides {
    /// Build overrides from the sentinel-encoded integers used in configuration.
    ///
    /// Negative values mean unset. For `failover`, `1` means on and any other
    /// non-negative value means off.
    pub fn from_sentinels(num_shards: i64, failover: i64, read_split_pct: i64) -> Self {
        Self {
            num_shards: (num_shards > OVERRIDE_UNSET).then_some(num_shards as usize),
            failover: (failover > OVERRIDE_UNSET).then_some(failover == 1),
            read_split_pct: (read_split_pct > OVERRIDE_UNSET).then_some(read_split_pct as u32),
        }
    }

    /// Apply shard count, failover and read split, in that order.
    pub fn apply(&self, config: &mut TopologyConfig) {
        if let Some(num_shards) = self.num_shards {
            config.num_shards = num_shards;
        }
        if let Some(failover) = self.failover {
            config.failover_enabled = failover;
        }
        if let Some(pct) = self.read_split_pct {
            config.readonly_split_pct = pct;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.num_shards.is_none() && self.failover.is_none() && self.read_split_pct.is_none()
    }
}

/// Settings that drive topology inference.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopologySettings {
    /// Run inference at all.
    pub enabled: bool,
    /// Log prefix: stripped from the service name, and the source of the
    /// read-only suffix.
    pub log_prefix: String,
    /// Manual overrides.
    pub overrides: TopologyOverrides,
}

/// Sharding, failover and read-split state consumed by routing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TopologyConfig {
    pub sharding_enabled: bool,
    /// Zero means unsharded.
    pub num_shards: usize,
    /// A standby exists for every shard (or for the single database).
    pub failover_enabled: bool,
    /// Percentage of reads sent to the read-only replica; zero disables it.
    pub readonly_split_pct: u32,
}
