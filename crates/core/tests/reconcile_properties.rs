//! Reconciliation engine properties and reference scenarios.
//!
//! Covers dedup idempotence, partition completeness, registry coverage,
//! the strict threshold boundary, and the upload / log-size scenarios the
//! monitoring screens are built around.

use std::collections::HashSet;

use branchwatch_core::{
    reconcile, BranchId, BranchRecord, BranchRegistry, BranchRegistryEntry, Deviation,
    ObservedValue, SizeBytes, ThresholdPolicy,
};
use chrono::{DateTime, TimeDelta, TimeZone, Utc};

// ──────────────────────────────────────────────
// Fixtures
// ──────────────────────────────────────────────

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 12, 9, 30, 0).unwrap()
}

fn minutes_ago(m: i64) -> DateTime<Utc> {
    now() - TimeDelta::minutes(m)
}

fn registry(ids: &[&str]) -> BranchRegistry {
    BranchRegistry::new(ids.iter().map(|id| BranchRegistryEntry {
        branch_id: BranchId::new(id),
        english_name: format!("Branch {}", id),
        arabic_name: format!("فرع {}", id),
    }))
}

fn ids<'a>(items: impl Iterator<Item = &'a BranchId>) -> Vec<String> {
    items.map(|id| id.to_string()).collect()
}

fn upload_policy() -> ThresholdPolicy {
    ThresholdPolicy::staleness_minutes(60).unwrap()
}

// ──────────────────────────────────────────────
// Scenarios
// ──────────────────────────────────────────────

#[test]
fn scenario_a_fresh_late_and_missing() {
    let records = vec![
        BranchRecord::timestamp("1", minutes_ago(10)),
        BranchRecord::timestamp("2", minutes_ago(90)),
    ];
    let result = reconcile(records, &registry(&["1", "2", "3"]), &upload_policy(), now()).unwrap();

    assert_eq!(ids(result.healthy.iter().map(|a| a.branch_id())), vec!["1"]);
    assert_eq!(ids(result.unhealthy.iter().map(|a| a.branch_id())), vec!["2"]);
    assert_eq!(ids(result.missing.iter().map(|e| &e.branch_id)), vec!["3"]);
    assert_eq!(
        result.unhealthy[0].deviation,
        Deviation::Elapsed(TimeDelta::minutes(90))
    );
}

#[test]
fn scenario_b_duplicate_keeps_latest_upload() {
    let t = minutes_ago(30);
    let records = vec![
        BranchRecord::timestamp("5", t + TimeDelta::minutes(5)),
        BranchRecord::timestamp("5", t),
    ];
    let result = reconcile(records, &registry(&["5"]), &upload_policy(), now()).unwrap();

    assert_eq!(result.healthy.len(), 1);
    assert!(result.unhealthy.is_empty());
    assert_eq!(
        result.healthy[0].record.observed,
        ObservedValue::Timestamp(t + TimeDelta::minutes(5))
    );
}

#[test]
fn scenario_d_empty_registry_reports_nothing_missing() {
    let records = vec![
        BranchRecord::timestamp("8", minutes_ago(5)),
        BranchRecord::timestamp("9", minutes_ago(500)),
    ];
    let result = reconcile(records, &BranchRegistry::empty(), &upload_policy(), now()).unwrap();

    assert!(result.missing.is_empty());
    assert_eq!(ids(result.healthy.iter().map(|a| a.branch_id())), vec!["8"]);
    assert_eq!(ids(result.unhealthy.iter().map(|a| a.branch_id())), vec!["9"]);
}

#[test]
fn scenario_e_log_sizes_below_limit_sorted() {
    let policy = ThresholdPolicy::max_size(SizeBytes::from_gib(20)).unwrap();
    let records = vec![
        BranchRecord::size("30", SizeBytes::from_gib(3)),
        BranchRecord::size("4", SizeBytes::from_gib(19)),
        BranchRecord::size("12", SizeBytes::from_gib(1)),
    ];
    let result = reconcile(records, &BranchRegistry::empty(), &policy, now()).unwrap();

    assert!(result.unhealthy.is_empty());
    assert_eq!(
        ids(result.healthy.iter().map(|a| a.branch_id())),
        vec!["4", "12", "30"]
    );
}

#[test]
fn empty_input_is_no_data_with_full_registry_missing() {
    let result = reconcile(Vec::new(), &registry(&["2", "1"]), &upload_policy(), now()).unwrap();

    assert!(result.is_no_data());
    assert_eq!(ids(result.missing.iter().map(|e| &e.branch_id)), vec!["1", "2"]);
}

// ──────────────────────────────────────────────
// Properties
// ──────────────────────────────────────────────

fn mixed_records() -> Vec<BranchRecord> {
    vec![
        BranchRecord::timestamp("3", minutes_ago(61)),
        BranchRecord::timestamp("1", minutes_ago(59)),
        BranchRecord::timestamp("3", minutes_ago(20)),
        BranchRecord::timestamp("7", minutes_ago(240)),
        BranchRecord::timestamp("007", minutes_ago(250)),
        BranchRecord::timestamp("2", minutes_ago(60)),
        BranchRecord::timestamp("11", minutes_ago(61)),
    ]
}

#[test]
fn reconciling_twice_is_identical() {
    let reg = registry(&["1", "2", "3", "4", "7", "11"]);
    let first = reconcile(mixed_records(), &reg, &upload_policy(), now()).unwrap();
    let second = reconcile(mixed_records(), &reg, &upload_policy(), now()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn every_observed_branch_lands_in_exactly_one_partition() {
    let result = reconcile(mixed_records(), &BranchRegistry::empty(), &upload_policy(), now())
        .unwrap();

    let healthy: HashSet<&BranchId> = result.healthy.iter().map(|a| a.branch_id()).collect();
    let unhealthy: HashSet<&BranchId> = result.unhealthy.iter().map(|a| a.branch_id()).collect();
    assert!(healthy.is_disjoint(&unhealthy));

    let observed: HashSet<BranchId> = mixed_records().into_iter().map(|r| r.branch_id).collect();
    let partitioned: HashSet<BranchId> = healthy.union(&unhealthy).map(|id| (*id).clone()).collect();
    assert_eq!(observed, partitioned);
    assert_eq!(result.observed_count(), observed.len());
}

#[test]
fn registry_is_fully_covered() {
    let reg = registry(&["1", "2", "3", "4", "7", "11", "15"]);
    let result = reconcile(mixed_records(), &reg, &upload_policy(), now()).unwrap();

    let mut covered: HashSet<&BranchId> = HashSet::new();
    covered.extend(result.healthy.iter().map(|a| a.branch_id()));
    covered.extend(result.unhealthy.iter().map(|a| a.branch_id()));
    covered.extend(result.missing.iter().map(|e| &e.branch_id));
    assert!(reg.ids().all(|id| covered.contains(id)));

    let missing: HashSet<&BranchId> = result.missing.iter().map(|e| &e.branch_id).collect();
    assert!(result.healthy.iter().all(|a| !missing.contains(a.branch_id())));
    assert!(result.unhealthy.iter().all(|a| !missing.contains(a.branch_id())));
    assert_eq!(ids(result.missing.iter().map(|e| &e.branch_id)), vec!["4", "15"]);
}

#[test]
fn deviation_equal_to_limit_is_healthy() {
    let result = reconcile(mixed_records(), &BranchRegistry::empty(), &upload_policy(), now())
        .unwrap();
    assert!(result.healthy.iter().any(|a| a.branch_id().as_str() == "2"));
    assert_eq!(
        ids(result.unhealthy.iter().map(|a| a.branch_id())),
        vec!["7", "11"]
    );
    assert_eq!(
        ids(result.healthy.iter().map(|a| a.branch_id())),
        vec!["1", "2", "3"]
    );
}
