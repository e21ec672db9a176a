//! # mux-topology
//!
//! Derives the proxy's data topology (shard count, standby failover,
//! read/write split) from the naming convention used in a tnsnames-style
//! descriptor file.
//!
//! ## Naming convention
//!
//! Given a base service root such as `PAYDBR1`:
//!
//! - `PAYDBR1_SH{i}` - primary database for shard `i`
//! - `PAYDBR2_SH{i}` - standby for shard `i` (only when the root's
//!   second-to-last character is `R`)
//! - `PAYDBR1_{PREFIX}_SH{i}` - read-only replica for shard `i`
//!
//! Unsharded deployments use the same names without the `_SH{i}` suffix.
//!
//! ## Flow
//!
//! ```text
//! service name -> naming::base_name -> descriptor::load -> TopologyDeriver
//!                                                            |
//!                                        TopologyConfig + RoutingVars
//! ```

pub mod descriptor;
mod deriver;
mod error;
pub mod naming;
mod routing;
mod settings;

pub use descriptor::DescriptorIndex;
pub use deriver::{
    DescriptorLocations, FailoverInit, TopologyDeriver, TopologyOutcome, DESCRIPTOR_FILE_NAME,
};
pub use error::{DescriptorError, TopologyError};
pub use routing::{RoutingRole, RoutingVars, ROUTING_VAR_PREFIX};
pub use settings::{TopologyConfig, TopologyOverrides, TopologySettings, OVERRIDE_UNSET};
