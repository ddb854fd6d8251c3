//! Staging-server query results.
//!
//! The staging server aggregates per-branch backup and log-file figures. A
//! [`QuerySource`] hands back the result of one of a fixed set of queries as
//! a [`RawTable`] whose columns carry the names the adapters expect.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::SourceError;
use crate::table::RawTable;

// ──────────────────────────────────────────────
// QueryKind
// ──────────────────────────────────────────────

/// The queries the monitor issues against the staging server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryKind {
    AllBackups,
    StaleBackups,
    AllLogSizes,
    LargeLogSizes,
    ChecklistSteps,
}

impl QueryKind {
    pub const ALL: [QueryKind; 5] = [
        QueryKind::AllBackups,
        QueryKind::StaleBackups,
        QueryKind::AllLogSizes,
        QueryKind::LargeLogSizes,
        QueryKind::ChecklistSteps,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            QueryKind::AllBackups => "all_backups",
            QueryKind::StaleBackups => "stale_backups",
            QueryKind::AllLogSizes => "all_log_sizes",
            QueryKind::LargeLogSizes => "large_log_sizes",
            QueryKind::ChecklistSteps => "checklist_steps",
        }
    }

    /// Column names the result is delivered under. Driver-backed sources
    /// label positional result columns with these.
    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            QueryKind::AllBackups | QueryKind::StaleBackups => &["Server ID", "Last Backup Date"],
            QueryKind::AllLogSizes | QueryKind::LargeLogSizes => {
                &["Server ID", "Size (GB)", "File Path"]
            }
            QueryKind::ChecklistSteps => &["Category", "StepID", "Description", "Completed"],
        }
    }

    /// Reference T-SQL for the staging server. `@limit_gb` is bound by the
    /// caller for [`QueryKind::LargeLogSizes`].
    pub fn statement(&self) -> &'static str {
        match self {
            QueryKind::AllBackups => "SELECT server, last_db_backup_date FROM Backup_DB ORDER BY server",
            QueryKind::StaleBackups => {
                "SELECT server, last_db_backup_date FROM Backup_DB \
                 WHERE DATEDIFF(HOUR, last_db_backup_date, GETDATE()) > 1"
            }
            QueryKind::AllLogSizes => {
                "SELECT Server, SizeMB / 1024.0, physical_name FROM logfile_size ORDER BY Server"
            }
            QueryKind::LargeLogSizes => {
                "SELECT Server, SizeMB / 1024.0, physical_name FROM logfile_size \
                 WHERE SizeMB > @limit_gb * 1024"
            }
            QueryKind::ChecklistSteps => {
                "SELECT Category, StepID, Description, Completed FROM OpenBranchSteps"
            }
        }
    }
}

impl fmt::Display for QueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for QueryKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        QueryKind::ALL
            .into_iter()
            .find(|k| k.name() == s)
            .ok_or_else(|| format!("unknown query '{}'", s))
    }
}

// ──────────────────────────────────────────────
// QuerySource trait
// ──────────────────────────────────────────────

/// Runs one of the fixed staging queries.
#[async_trait]
pub trait QuerySource: Send + Sync {
    async fn fetch(&self, kind: QueryKind) -> Result<RawTable, SourceError>;

    /// Human-readable description for logs (`snapshot:/var/staging`).
    fn describe(&self) -> String;
}

// ──────────────────────────────────────────────
// StaticQuerySource
// ──────────────────────────────────────────────

/// In-memory query results. A query with no stored result is unavailable.
#[derive(Debug, Clone, Default)]
pub struct StaticQuerySource {
    tables: HashMap<QueryKind, RawTable>,
}

impl StaticQuerySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, kind: QueryKind, table: RawTable) -> Self {
        self.tables.insert(kind, table);
        self
    }
}

#[async_trait]
impl QuerySource for StaticQuerySource {
    async fn fetch(&self, kind: QueryKind) -> Result<RawTable, SourceError> {
        self.tables
            .get(&kind)
            .cloned()
            .ok_or_else(|| SourceError::Unavailable {
                message: format!("no result stored for query '{}'", kind),
            })
    }

    fn describe(&self) -> String {
        "static".to_string()
    }
}

// ──────────────────────────────────────────────
// SnapshotQuerySource
// ──────────────────────────────────────────────

/// Exported snapshots of the staging server: one `<kind>.json` file per
/// query in a directory.
///
/// A file holds either `{"columns": [...], "rows": [[...], ...]}` or an
/// array of row objects.
#[derive(Debug, Clone)]
pub struct SnapshotQuerySource {
    dir: PathBuf,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SnapshotFile {
    Table(RawTable),
    Records(Vec<serde_json::Map<String, serde_json::Value>>),
}

impl SnapshotQuerySource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        SnapshotQuerySource { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, kind: QueryKind) -> PathBuf {
        self.dir.join(format!("{}.json", kind.name()))
    }
}

#[async_trait]
impl QuerySource for SnapshotQuerySource {
    async fn fetch(&self, kind: QueryKind) -> Result<RawTable, SourceError> {
        let path = self.path_for(kind);
        let content = tokio::fs::read_to_string(&path).await.map_err(|e| {
            SourceError::Unavailable {
                message: format!("cannot read {}: {}", path.display(), e),
            }
        })?;
        let file: SnapshotFile =
            serde_json::from_str(&content).map_err(|e| SourceError::Malformed {
                message: format!("{}: {}", path.display(), e),
            })?;
        let table = match file {
            SnapshotFile::Table(table) => table,
            SnapshotFile::Records(records) => RawTable::from_records(records),
        };
        tracing::debug!(query = %kind, rows = table.len(), path = %path.display(), "loaded snapshot");
        Ok(table)
    }

    fn describe(&self) -> String {
        format!("snapshot:{}", self.dir.display())
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
