//! Name surgery for the descriptor naming convention.
//!
//! Every helper works on characters, not byte offsets, and checks its
//! minimum-length precondition before touching the name.

use crate::error::TopologyError;

/// Minimum base-name length for the trailing-character convention.
pub const MIN_BASE_NAME_LEN: usize = 2;

/// Character that must sit second-to-last in a root that supports standby
/// failover.
pub const FAILOVER_ROOT_MARKER: char = 'R';

/// Derive the canonical service root from a service instance name.
///
/// Drops `prefix` plus one separator character, uppercases the rest and cuts
/// it at the first `-` past the start: `hera-paydbr1-batch` with prefix
/// `hera` becomes `PAYDBR1`.
pub fn base_name(service: &str, prefix: &str) -> Result<String, TopologyError> {
    let skip = prefix.chars().count() + 1;
    let rest: String = service.chars().skip(skip).collect();
    if rest.is_empty() {
        return Err(TopologyError::ServiceNameTooShort {
            name: service.to_string(),
            prefix: prefix.to_string(),
        });
    }

    let mut base = rest.to_uppercase();
    if let Some(idx) = base.find('-') {
        if idx > 0 {
            base.truncate(idx);
        }
    }

    check_len(&base)?;
    Ok(base)
}

/// Standby companion of `base`: trailing character replaced by `2`.
pub fn standby_name(base: &str) -> Result<String, TopologyError> {
    check_len(base)?;
    let mut chars = base.chars();
    chars.next_back();
    Ok(format!("{}2", chars.as_str()))
}

/// Whether `base` follows the failover-root convention (second-to-last
/// character is `R`).
pub fn is_failover_root(base: &str) -> Result<bool, TopologyError> {
    check_len(base)?;
    Ok(base.chars().rev().nth(1) == Some(FAILOVER_ROOT_MARKER))
}

/// Read-only companion of `base`: `{base}_{PREFIX}`.
pub fn readonly_name(base: &str, prefix: &str) -> String {
    format!("{}_{}", base, prefix.to_uppercase())
}

/// Shard-qualified entry name: `{name}_SH{index}`.
pub fn shard_name(name: &str, index: usize) -> String {
    format!("{}_SH{}", name, index)
}

fn check_len(base: &str) -> Result<(), TopologyError> {
    if base.chars().count() < MIN_BASE_NAME_LEN {
        return Err(TopologyError::BaseNameTooShort {
            name: base.to_string(),
            min: MIN_BASE_NAME_LEN,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_name_strips_prefix_and_suffix() {
        assert_eq!(base_name("hera-paydbr1-batch", "hera").unwrap(), "PAYDBR1");
        assert_eq!(base_name("hera-winky", "hera").unwrap(), "WINKY");
        assert_eq!(base_name("state_paydbr1", "state").unwrap(), "PAYDBR1");
    }

    #[test]
    fn test_base_name_keeps_leading_dash() {
        // A dash at position 0 is not a cut point, and no later dash is used.
        assert_eq!(base_name("hera--ab-c", "hera").unwrap(), "-AB-C");
    }

    #[test]
    fn test_base_name_too_short() {
        assert_eq!(
            base_name("hera", "hera"),
            Err(TopologyError::ServiceNameTooShort {
                name: "hera".to_string(),
                prefix: "hera".to_string(),
            })
        );
        assert!(matches!(
            base_name("hera-x", "hera"),
            Err(TopologyError::BaseNameTooShort { .. })
        ));
        assert!(matches!(
            base_name("hera-x-batch", "hera"),
            Err(TopologyError::BaseNameTooShort { .. })
        ));
    }

    #[test]
    fn test_standby_name() {
        assert_eq!(standby_name("PAYDBR1").unwrap(), "PAYDBR2");
        assert_eq!(standby_name("AB").unwrap(), "A2");
        assert!(standby_name("A").is_err());
        assert!(standby_name("").is_err());
    }

    #[test]
    fn test_is_failover_root() {
        assert!(is_failover_root("PAYDBR1").unwrap());
        assert!(is_failover_root("R1").unwrap());
        assert!(!is_failover_root("PAYDBR").unwrap());
        assert!(!is_failover_root("rr").unwrap());
        assert!(is_failover_root("R").is_err());
    }

    #[test]
    fn test_readonly_and_shard_names() {
        assert_eq!(readonly_name("PAYDBR1", "state"), "PAYDBR1_STATE");
        assert_eq!(shard_name("PAYDBR1", 0), "PAYDBR1_SH0");
        assert_eq!(
            shard_name(&readonly_name("PAYDBR1", "state"), 12),
            "PAYDBR1_STATE_SH12"
        );
    }
}
