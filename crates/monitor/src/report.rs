//! The result of one health check.

use std::fmt;

use branchwatch_core::{BranchId, ClassificationResult, ConnectivityOutcome, ThresholdPolicy};
use branchwatch_ingest::{Checklist, RowDiagnostic};
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckKind {
    Uploads,
    Backups,
    LogSizes,
}

impl CheckKind {
    pub fn title(&self) -> &'static str {
        match self {
            CheckKind::Uploads => "Sales uploads",
            CheckKind::Backups => "Database backups",
            CheckKind::LogSizes => "Transaction log sizes",
        }
    }
}

impl fmt::Display for CheckKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CheckKind::Uploads => "uploads",
            CheckKind::Backups => "backups",
            CheckKind::LogSizes => "log_sizes",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Complete,
    /// No record survived ingestion. Rendered as "no data submitted".
    NoData,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthReport {
    pub check: CheckKind,
    pub generated_at: DateTime<Utc>,
    pub status: ReportStatus,
    pub policy: ThresholdPolicy,
    pub classification: ClassificationResult,
    /// Probe results for unhealthy branches, in branch order. Empty when
    /// probing was not requested.
    pub connectivity: Vec<ConnectivityOutcome>,
    pub diagnostics: Vec<RowDiagnostic>,
    pub rows_read: usize,
    pub rows_retained: usize,
}

impl HealthReport {
    pub fn is_no_data(&self) -> bool {
        self.status == ReportStatus::NoData
    }

    pub fn connectivity_for(&self, branch_id: &BranchId) -> Option<&ConnectivityOutcome> {
        self.connectivity
            .binary_search_by(|o| o.branch_id.cmp(branch_id))
            .ok()
            .map(|i| &self.connectivity[i])
    }
}

/// The opening checklist with the rows that could not be read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChecklistReport {
    pub checklist: Checklist,
    pub diagnostics: Vec<RowDiagnostic>,
}
