//! The reconciliation engine.
//!
//! [`reconcile`] turns a batch of per-branch observations into a
//! [`ClassificationResult`]:
//!
//! 1. deduplicate by branch id, keeping the most recent observation
//! 2. compute each record's deviation (`now - observed` or the size itself)
//! 3. classify against the threshold policy (strict `>`)
//! 4. diff the observed ids against the registry to find missing branches
//! 5. sort both partitions by branch id
//!
//! The engine does no I/O and keeps no state between calls.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::branch::{BranchId, BranchRecord, ObservationKind, ObservedValue};
use crate::policy::{Deviation, ThresholdPolicy};
use crate::registry::{BranchRegistry, BranchRegistryEntry};

/// Contract violations detected by the engine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReconcileError {
    #[error("branch {branch_id}: {found} observation cannot be checked against a {expected} policy")]
    KindMismatch {
        branch_id: BranchId,
        expected: ObservationKind,
        found: ObservationKind,
    },
}

/// A deduplicated record together with its deviation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssessedRecord {
    pub record: BranchRecord,
    pub deviation: Deviation,
}

impl AssessedRecord {
    pub fn branch_id(&self) -> &BranchId {
        &self.record.branch_id
    }
}

/// One row of the "late or never seen" view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Overdue<'a> {
    Late(&'a AssessedRecord),
    Missing(&'a BranchRegistryEntry),
}

impl Overdue<'_> {
    pub fn branch_id(&self) -> &BranchId {
        match self {
            Overdue::Late(assessed) => assessed.branch_id(),
            Overdue::Missing(entry) => &entry.branch_id,
        }
    }
}

/// Outcome of one reconciliation. Owned by the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationResult {
    pub healthy: Vec<AssessedRecord>,
    pub unhealthy: Vec<AssessedRecord>,
    pub missing: Vec<BranchRegistryEntry>,
}

impl ClassificationResult {
    /// True when no record survived ingestion. This is a normal outcome,
    /// reported as "no data" rather than raised.
    pub fn is_no_data(&self) -> bool {
        self.healthy.is_empty() && self.unhealthy.is_empty()
    }

    pub fn observed_count(&self) -> usize {
        self.healthy.len() + self.unhealthy.len()
    }

    /// Unhealthy and missing branches merged in branch-id order, for
    /// reports that list "late or never observed" together.
    pub fn overdue(&self) -> Vec<Overdue<'_>> {
        let mut rows: Vec<Overdue<'_>> = self
            .unhealthy
            .iter()
            .map(Overdue::Late)
            .chain(self.missing.iter().map(Overdue::Missing))
            .collect();
        rows.sort_by(|a, b| a.branch_id().cmp(b.branch_id()));
        rows
    }
}

/// Classify `records` against `policy` and reconcile them with `registry`.
///
/// Fails only when a record's observation kind differs from the policy's.
pub fn reconcile(
    records: Vec<BranchRecord>,
    registry: &BranchRegistry,
    policy: &ThresholdPolicy,
    now: DateTime<Utc>,
) -> Result<ClassificationResult, ReconcileError> {
    let expected = policy.kind();
    if let Some(bad) = records.iter().find(|r| r.observed.kind() != expected) {
        return Err(ReconcileError::KindMismatch {
            branch_id: bad.branch_id.clone(),
            expected,
            found: bad.observed.kind(),
        });
    }

    let latest = deduplicate(records);
    let observed: HashSet<&BranchId> = latest.iter().map(|r| &r.branch_id).collect();

    let mut missing: Vec<BranchRegistryEntry> = registry
        .entries()
        .filter(|entry| !observed.contains(&entry.branch_id))
        .cloned()
        .collect();
    missing.sort_by(|a, b| a.branch_id.cmp(&b.branch_id));

    let mut healthy = Vec::new();
    let mut unhealthy = Vec::new();
    for record in latest {
        let deviation = deviation_of(&record.observed, now);
        let exceeded = policy
            .is_exceeded_by(&deviation)
            .ok_or_else(|| ReconcileError::KindMismatch {
                branch_id: record.branch_id.clone(),
                expected,
                found: record.observed.kind(),
            })?;
        let assessed = AssessedRecord { record, deviation };
        if exceeded {
            unhealthy.push(assessed);
        } else {
            healthy.push(assessed);
        }
    }
    healthy.sort_by(|a, b| a.branch_id().cmp(b.branch_id()));
    unhealthy.sort_by(|a, b| a.branch_id().cmp(b.branch_id()));

    Ok(ClassificationResult {
        healthy,
        unhealthy,
        missing,
    })
}

/// Keep one record per branch: the latest observation, with later input
/// positions winning ties (and winning outright for size observations).
fn deduplicate(records: Vec<BranchRecord>) -> Vec<BranchRecord> {
    let mut latest: HashMap<BranchId, BranchRecord> = HashMap::with_capacity(records.len());
    for record in records {
        match latest.get(&record.branch_id) {
            Some(kept) if kept.observed.observed_at() > record.observed.observed_at() => {}
            _ => {
                latest.insert(record.branch_id.clone(), record);
            }
        }
    }
    latest.into_values().collect()
}

fn deviation_of(observed: &ObservedValue, now: DateTime<Utc>) -> Deviation {
    match observed {
        ObservedValue::Timestamp(at) => Deviation::Elapsed(now - *at),
        ObservedValue::Size(size) => Deviation::Size(*size),
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::branch::SizeBytes;
    use chrono::{TimeDelta, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    fn minutes_ago(m: i64) -> DateTime<Utc> {
        now() - TimeDelta::minutes(m)
    }

    #[test]
    fn dedup_keeps_latest_timestamp_regardless_of_order() {
        let records = vec![
            BranchRecord::timestamp("5", minutes_ago(10)).with_extra("row", "newer"),
            BranchRecord::timestamp("5", minutes_ago(15)).with_extra("row", "older"),
        ];
        let kept = deduplicate(records);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].extra["row"], "newer");
    }

    #[test]
    fn dedup_tie_goes_to_last_seen() {
        let records = vec![
            BranchRecord::timestamp("5", minutes_ago(10)).with_extra("row", "first"),
            BranchRecord::timestamp("5", minutes_ago(10)).with_extra("row", "second"),
        ];
        let kept = deduplicate(records);
        assert_eq!(kept[0].extra["row"], "second");
    }

    #[test]
    fn dedup_sizes_last_seen_wins() {
        let records = vec![
            BranchRecord::size("7", SizeBytes(100)),
            BranchRecord::size("7", SizeBytes(50)),
        ];
        let kept = deduplicate(records);
        assert_eq!(kept[0].observed, ObservedValue::Size(SizeBytes(50)));
    }

    #[test]
    fn future_timestamps_are_healthy() {
        let policy = ThresholdPolicy::staleness_minutes(60).unwrap();
        let records = vec![BranchRecord::timestamp("1", now() + TimeDelta::minutes(5))];
        let result = reconcile(records, &BranchRegistry::empty(), &policy, now()).unwrap();
        assert_eq!(result.healthy.len(), 1);
        assert_eq!(
            result.healthy[0].deviation,
            Deviation::Elapsed(TimeDelta::minutes(-5))
        );
    }

    #[test]
    fn kind_mismatch_is_rejected() {
        let policy = ThresholdPolicy::staleness_minutes(60).unwrap();
        let records = vec![BranchRecord::size("1", SizeBytes(10))];
        let err = reconcile(records, &BranchRegistry::empty(), &policy, now()).unwrap_err();
        assert_eq!(
            err,
            ReconcileError::KindMismatch {
                branch_id: BranchId::new("1"),
                expected: ObservationKind::Timestamp,
                found: ObservationKind::Size,
            }
        );
    }

    #[test]
    fn overdue_merges_late_and_missing_in_id_order() {
        let registry = BranchRegistry::new(["1", "2", "3"].iter().map(|id| BranchRegistryEntry {
            branch_id: BranchId::new(id),
            english_name: format!("Branch {id}"),
            arabic_name: String::new(),
        }));
        let policy = ThresholdPolicy::staleness_minutes(60).unwrap();
        let records = vec![BranchRecord::timestamp("3", minutes_ago(120))];
        let result = reconcile(records, &registry, &policy, now()).unwrap();

        let overdue = result.overdue();
        let ids: Vec<&str> = overdue.iter().map(|o| o.branch_id().as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
        assert!(matches!(overdue[2], Overdue::Late(_)));
        assert!(matches!(overdue[0], Overdue::Missing(_)));
    }
}
