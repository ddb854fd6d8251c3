//! Backup, log-size and checklist checks against in-memory staging results.

use std::sync::Arc;

use async_trait::async_trait;
use branchwatch_core::{
    BranchId, BranchRegistry, BranchRegistryEntry, BusinessClock, SharedRegistry,
};
use branchwatch_ingest::{QueryKind, RawCell, RawTable, SnapshotQuerySource, StaticQuerySource};
use branchwatch_monitor::{
    CheckError, CheckKind, Monitor, NoProgress, RecordedProgress, ReportStatus, Thresholds,
};
use branchwatch_probe::{ConnectivityBackend, ConnectivityError, ConnectivityProbe};
use chrono::{DateTime, TimeZone, Utc};

fn registry(ids: &[&str]) -> SharedRegistry {
    SharedRegistry::new(BranchRegistry::new(ids.iter().map(|id| {
        BranchRegistryEntry {
            branch_id: BranchId::new(id),
            english_name: format!("Branch {}", id),
            arabic_name: String::new(),
        }
    })))
}

fn monitor(ids: &[&str]) -> Monitor {
    Monitor::new(
        registry(ids),
        BusinessClock::default(),
        Thresholds::new(60, 1, 20).unwrap(),
    )
}

/// 2025-01-20 12:00 in Cairo (UTC+2).
fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 20, 10, 0, 0).unwrap()
}

fn backups() -> RawTable {
    RawTable::new(QueryKind::AllBackups.columns().iter().copied())
        .with_row(["BR5001-Cairo", "2025-01-20 11:30:00"])
        .with_row(["BR5002-Giza", "2025-01-20 08:00:00"])
        .with_row(["BR5004-Tanta", "2025-01-19 23:00:00"])
        .with_row(["REPORTING", "2025-01-20 11:00:00"])
}

/// Only the server of branch 2 answers.
struct OnlyBranchTwo;

#[async_trait]
impl ConnectivityBackend for OnlyBranchTwo {
    async fn dial(&self, endpoint: &str) -> Result<(), ConnectivityError> {
        if endpoint == "10.20.2.10:1433" {
            Ok(())
        } else {
            Err(ConnectivityError::Io {
                endpoint: endpoint.to_string(),
                message: "connection refused".to_string(),
            })
        }
    }
}

#[tokio::test]
async fn backups_classify_and_probe_late_branches() {
    let source = StaticQuerySource::new().with_table(QueryKind::AllBackups, backups());
    let probe = ConnectivityProbe::new(Arc::new(OnlyBranchTwo));
    let mut progress = RecordedProgress::default();

    let report = monitor(&["1", "2", "3", "4"])
        .check_backups(&source, Some(&probe), now(), &mut progress)
        .await
        .unwrap();

    assert_eq!(report.check, CheckKind::Backups);
    assert_eq!(report.status, ReportStatus::Complete);
    let unhealthy: Vec<&str> = report
        .classification
        .unhealthy
        .iter()
        .map(|a| a.branch_id().as_str())
        .collect();
    assert_eq!(unhealthy, vec!["2", "4"]);
    assert_eq!(report.classification.healthy.len(), 1);
    assert_eq!(report.classification.missing[0].branch_id.as_str(), "3");
    assert_eq!(report.diagnostics.len(), 1);

    assert_eq!(report.connectivity.len(), 2);
    assert!(report.connectivity_for(&BranchId::new("2")).unwrap().reachable);
    assert!(!report.connectivity_for(&BranchId::new("4")).unwrap().reachable);
    assert!(report.connectivity_for(&BranchId::new("1")).is_none());

    let percents: Vec<u8> = progress.updates.iter().map(|(p, _)| *p).collect();
    assert!(percents.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(percents.last(), Some(&100));
    assert!(progress
        .updates
        .iter()
        .any(|(_, label)| label == "Pinging branch 4"));
}

#[tokio::test]
async fn backups_without_probe_leave_connectivity_empty() {
    let source = StaticQuerySource::new().with_table(QueryKind::AllBackups, backups());
    let report = monitor(&[])
        .check_backups(&source, None, now(), &mut NoProgress)
        .await
        .unwrap();
    assert!(report.connectivity.is_empty());
    assert!(report.classification.missing.is_empty());
}

#[tokio::test]
async fn log_sizes_over_limit_are_unhealthy() {
    let mut table = RawTable::new(QueryKind::AllLogSizes.columns().iter().copied());
    table.push_row(vec!["BR5030".into(), RawCell::Float(3.0), "L:\\a.ldf".into()]);
    table.push_row(vec!["BR5004".into(), RawCell::Float(19.99), "L:\\b.ldf".into()]);
    table.push_row(vec!["BR5012".into(), RawCell::Float(45.2), "L:\\c.ldf".into()]);
    table.push_row(vec!["BR5020".into(), RawCell::Int(20), "L:\\d.ldf".into()]);
    let source = StaticQuerySource::new().with_table(QueryKind::AllLogSizes, table);

    let report = monitor(&[])
        .check_log_sizes(&source, now(), &mut NoProgress)
        .await
        .unwrap();

    let healthy: Vec<&str> = report
        .classification
        .healthy
        .iter()
        .map(|a| a.branch_id().as_str())
        .collect();
    assert_eq!(healthy, vec!["4", "20", "30"]);
    assert_eq!(report.classification.unhealthy.len(), 1);
    assert_eq!(
        report.classification.unhealthy[0].record.extra["file_path"],
        "L:\\c.ldf"
    );
}

#[tokio::test]
async fn unreachable_staging_server_is_reported() {
    let source = SnapshotQuerySource::new("/nonexistent/staging-export");
    let err = monitor(&["1"])
        .check_backups(&source, None, now(), &mut NoProgress)
        .await
        .unwrap_err();
    assert!(err.is_unavailable());
    assert!(err.user_message().contains("connectivity"));
}

#[tokio::test]
async fn wrong_columns_fail_the_check() {
    let source = StaticQuerySource::new().with_table(
        QueryKind::AllLogSizes,
        RawTable::new(["Server", "SizeMB"]).with_row(["BR5001", "12"]),
    );
    let err = monitor(&[])
        .check_log_sizes(&source, now(), &mut NoProgress)
        .await
        .unwrap_err();
    assert!(matches!(err, CheckError::Schema(_)));
}

#[tokio::test]
async fn checklist_groups_steps() {
    let mut table = RawTable::new(QueryKind::ChecklistSteps.columns().iter().copied());
    table.push_row(vec!["Network".into(), RawCell::Int(1), "Install router".into(), RawCell::Bool(true)]);
    table.push_row(vec!["Hardware".into(), RawCell::Int(2), "Mount POS".into(), RawCell::Bool(false)]);
    let source = StaticQuerySource::new().with_table(QueryKind::ChecklistSteps, table);

    let report = monitor(&[]).load_checklist(&source).await.unwrap();
    assert_eq!(report.checklist.categories.len(), 2);
    assert_eq!(report.checklist.completion().percent(), 50);
    assert!(report.diagnostics.is_empty());
}
