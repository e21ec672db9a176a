//! End-to-end topology inference against descriptor files on disk.

use std::path::PathBuf;

use mux_testing::{write_descriptor, RecordingFailover};
use mux_topology::{
    DescriptorLocations, RoutingRole, TopologyConfig, TopologyDeriver, TopologyOverrides,
    TopologySettings,
};
use rstest::rstest;
use tempfile::TempDir;

fn settings(prefix: &str, overrides: TopologyOverrides) -> TopologySettings {
    TopologySettings {
        enabled: true,
        log_prefix: prefix.to_string(),
        overrides,
    }
}

fn deriver_for(dir: &TempDir, prefix: &str, overrides: TopologyOverrides) -> TopologyDeriver {
    TopologyDeriver::new(
        settings(prefix, overrides),
        DescriptorLocations::new(Some(dir.path().join("tnsnames.ora")), None),
    )
}

#[test]
fn test_single_shard_with_standby_and_readonly() {
    let dir = TempDir::new().unwrap();
    write_descriptor(
        dir.path(),
        &["PAYDBR1_SH0", "PAYDBR2_SH0", "PAYDBR1_STATE_SH0", "UNRELATED"],
    );

    let failover = RecordingFailover::new();
    let outcome = deriver_for(&dir, "state", TopologyOverrides::default())
        .derive("state-paydbr1-batch", &failover)
        .unwrap();

    assert_eq!(
        outcome.config,
        TopologyConfig {
            sharding_enabled: true,
            num_shards: 1,
            failover_enabled: true,
            readonly_split_pct: 50,
        }
    );
    assert_eq!(outcome.routing.len(), 3);
    assert_eq!(
        outcome.routing.get(RoutingRole::Primary, Some(0)),
        Some("PAYDBR1_SH0")
    );
    assert_eq!(
        outcome.routing.get(RoutingRole::Standby, Some(0)),
        Some("PAYDBR2_SH0")
    );
    assert_eq!(
        outcome.routing.get(RoutingRole::ReadOnly, Some(0)),
        Some("PAYDBR1_STATE_SH0")
    );
    assert_eq!(failover.calls(), vec![1]);
    assert_eq!(outcome.descriptor, Some(dir.path().join("tnsnames.ora")));
}

#[test]
fn test_gap_truncates_shard_enumeration() {
    let dir = TempDir::new().unwrap();
    write_descriptor(dir.path(), &["FOO_SH0", "FOO_SH1", "FOO_SH2", "FOO_SH4"]);

    let outcome = deriver_for(&dir, "hera", TopologyOverrides::default())
        .derive("hera-foo", &RecordingFailover::new())
        .unwrap();

    assert!(outcome.config.sharding_enabled);
    assert_eq!(outcome.config.num_shards, 3);
    assert_eq!(outcome.routing.len(), 3);
}

#[test]
fn test_partial_standby_keeps_failover_off() {
    let dir = TempDir::new().unwrap();
    write_descriptor(
        dir.path(),
        &["PAYDBR1_SH0", "PAYDBR1_SH1", "PAYDBR2_SH0"],
    );

    let failover = RecordingFailover::new();
    let outcome = deriver_for(&dir, "hera", TopologyOverrides::default())
        .derive("hera-paydbr1", &failover)
        .unwrap();

    assert_eq!(outcome.config.num_shards, 2);
    assert!(!outcome.config.failover_enabled);
    assert_eq!(
        outcome.routing.get(RoutingRole::Standby, Some(0)),
        Some("PAYDBR2_SH0")
    );
    assert!(failover.calls().is_empty());
}

#[test]
fn test_partial_readonly_keeps_split_off() {
    let dir = TempDir::new().unwrap();
    write_descriptor(
        dir.path(),
        &["PAYDBR1_SH0", "PAYDBR1_SH1", "PAYDBR1_HERA_SH1"],
    );

    let outcome = deriver_for(&dir, "hera", TopologyOverrides::default())
        .derive("hera-paydbr1", &RecordingFailover::new())
        .unwrap();

    assert_eq!(outcome.config.readonly_split_pct, 0);
    assert_eq!(
        outcome.routing.get(RoutingRole::ReadOnly, Some(1)),
        Some("PAYDBR1_HERA_SH1")
    );
}

#[test]
fn test_standby_ignored_without_failover_root() {
    let dir = TempDir::new().unwrap();
    write_descriptor(dir.path(), &["PAYDB_SH0", "PAYD2_SH0"]);

    let outcome = deriver_for(&dir, "hera", TopologyOverrides::default())
        .derive("hera-paydb", &RecordingFailover::new())
        .unwrap();

    assert_eq!(outcome.config.num_shards, 1);
    assert!(!outcome.config.failover_enabled);
}

#[test]
fn test_unsharded_standby_initializes_failover_with_zero_shards() {
    let dir = TempDir::new().unwrap();
    write_descriptor(dir.path(), &["WINKYR1", "WINKYR2"]);

    let failover = RecordingFailover::new();
    let outcome = deriver_for(&dir, "hera", TopologyOverrides::default())
        .derive("hera-winkyr1-batch", &failover)
        .unwrap();

    assert!(!outcome.config.sharding_enabled);
    assert!(outcome.config.failover_enabled);
    assert_eq!(outcome.routing.get(RoutingRole::Standby, None), Some("WINKYR2"));
    assert_eq!(failover.calls(), vec![0]);
}

#[test]
fn test_fallback_location_is_used() {
    let dir = TempDir::new().unwrap();
    let fallback = write_descriptor(dir.path(), &["ABC_SH0"]);

    let deriver = TopologyDeriver::new(
        settings("hera", TopologyOverrides::default()),
        DescriptorLocations::new(Some(PathBuf::from("/nonexistent/tnsnames.ora")), Some(fallback.clone())),
    );
    let outcome = deriver.derive("hera-abc", &RecordingFailover::new()).unwrap();

    assert_eq!(outcome.config.num_shards, 1);
    assert_eq!(outcome.descriptor, Some(fallback));
}

#[test]
fn test_missing_descriptor_leaves_defaults() {
    let deriver = TopologyDeriver::new(
        settings("hera", TopologyOverrides::default()),
        DescriptorLocations::new(
            Some(PathBuf::from("/nonexistent/a/tnsnames.ora")),
            Some(PathBuf::from("/nonexistent/b/tnsnames.ora")),
        ),
    );
    let failover = RecordingFailover::new();
    let outcome = deriver.derive("hera-paydbr1", &failover).unwrap();

    assert_eq!(outcome.config, TopologyConfig::default());
    assert!(outcome.routing.is_empty());
    assert!(outcome.descriptor.is_none());
    assert!(failover.calls().is_empty());
}

#[test]
fn test_missing_descriptor_still_applies_overrides() {
    let deriver = TopologyDeriver::new(
        settings("hera", TopologyOverrides::from_sentinels(4, 1, 20)),
        DescriptorLocations::default(),
    );
    let failover = RecordingFailover::new();
    let outcome = deriver.derive("hera-paydbr1", &failover).unwrap();

    assert_eq!(outcome.config.num_shards, 4);
    assert!(outcome.config.failover_enabled);
    assert_eq!(outcome.config.readonly_split_pct, 20);
    assert!(!outcome.config.sharding_enabled);
    assert_eq!(failover.calls(), vec![4]);
}

#[rstest]
#[case::inferred_on_override_on(true, 1, true)]
#[case::inferred_on_override_off(true, 0, false)]
#[case::inferred_off_override_on(false, 1, true)]
#[case::inferred_off_override_off(false, 0, false)]
#[case::inferred_on_unset(true, -1, true)]
#[case::inferred_off_unset(false, -1, false)]
fn test_failover_override_precedence(
    #[case] standby_present: bool,
    #[case] override_taf: i64,
    #[case] expected: bool,
) {
    let dir = TempDir::new().unwrap();
    let mut names = vec!["PAYDBR1_SH0"];
    if standby_present {
        names.push("PAYDBR2_SH0");
    }
    write_descriptor(dir.path(), &names);

    let failover = RecordingFailover::new();
    let outcome = deriver_for(&dir, "hera", TopologyOverrides::from_sentinels(-1, override_taf, -1))
        .derive("hera-paydbr1", &failover)
        .unwrap();

    assert_eq!(outcome.config.failover_enabled, expected);
    assert_eq!(failover.calls().len(), usize::from(expected));
}

#[rstest]
#[case::inferred_split_override_zero(true, 0, 0)]
#[case::inferred_split_override_value(true, 75, 75)]
#[case::no_split_override_value(false, 10, 10)]
#[case::no_split_unset(false, -1, 0)]
#[case::inferred_split_unset(true, -1, 50)]
fn test_read_split_override_precedence(
    #[case] readonly_present: bool,
    #[case] override_split: i64,
    #[case] expected: u32,
) {
    let dir = TempDir::new().unwrap();
    let mut names = vec!["PAYDBR1_SH0"];
    if readonly_present {
        names.push("PAYDBR1_HERA_SH0");
    }
    write_descriptor(dir.path(), &names);

    let outcome = deriver_for(&dir, "hera", TopologyOverrides::from_sentinels(-1, -1, override_split))
        .derive("hera-paydbr1", &RecordingFailover::new())
        .unwrap();

    assert_eq!(outcome.config.readonly_split_pct, expected);
}

#[rstest]
#[case::override_down(1, 1)]
#[case::override_up(8, 8)]
#[case::override_zero(0, 0)]
#[case::unset(-1, 2)]
fn test_shard_count_override_precedence(#[case] override_shards: i64, #[case] expected: usize) {
    let dir = TempDir::new().unwrap();
    write_descriptor(dir.path(), &["PAYDBR1_SH0", "PAYDBR1_SH1"]);

    let outcome = deriver_for(&dir, "hera", TopologyOverrides::from_sentinels(override_shards, -1, -1))
        .derive("hera-paydbr1", &RecordingFailover::new())
        .unwrap();

    assert_eq!(outcome.config.num_shards, expected);
    assert!(outcome.config.sharding_enabled);
}
