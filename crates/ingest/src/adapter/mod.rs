//! Source adapters: turn a [`RawTable`] into per-branch [`BranchRecord`]s.
//!
//! Each adapter validates its required columns up front, filters rows,
//! coerces cell types and extracts the branch id. Rows that fail coercion or
//! extraction are dropped with a [`RowDiagnostic`]; the load as a whole only
//! fails when columns are missing.

pub mod backups;
pub mod logsize;
pub mod uploads;

pub use backups::BackupAdapter;
pub use logsize::LogSizeAdapter;
pub use uploads::UploadSessionAdapter;

use branchwatch_core::BranchRecord;
use serde::Serialize;

use crate::error::{DiagnosticKind, MalformedValue, RowDiagnostic, SchemaError};
use crate::table::RawTable;
use crate::timestamp::TimestampError;

/// Records extracted from one table, plus what was dropped along the way.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LoadOutcome {
    pub records: Vec<BranchRecord>,
    pub diagnostics: Vec<RowDiagnostic>,
    /// Data rows in the source table.
    pub rows_read: usize,
}

impl LoadOutcome {
    fn new(rows_read: usize) -> Self {
        LoadOutcome {
            records: Vec::with_capacity(rows_read),
            diagnostics: Vec::new(),
            rows_read,
        }
    }

    /// Rows that became records.
    pub fn rows_retained(&self) -> usize {
        self.records.len()
    }

    fn drop_row(&mut self, diagnostic: RowDiagnostic, source: &'static str) {
        tracing::warn!(
            source,
            row = diagnostic.row,
            "dropping row: {}",
            diagnostic.message
        );
        self.diagnostics.push(diagnostic);
    }
}

/// Converts a source table into branch records.
pub trait RecordAdapter: Send + Sync {
    /// Short name used in logs (`uploads`, `backups`, `log_sizes`).
    fn source_name(&self) -> &'static str;

    fn required_columns(&self) -> &'static [&'static str];

    fn load(&self, table: &RawTable) -> Result<LoadOutcome, SchemaError>;
}

/// A table with neither header nor rows carries no data rather than a
/// broken schema.
fn is_blank(table: &RawTable) -> bool {
    table.columns.is_empty() && table.is_empty()
}

fn timestamp_diagnostic(
    row: usize,
    column: &str,
    raw: &str,
    err: TimestampError,
) -> RowDiagnostic {
    match err {
        TimestampError::Ambiguous(inner) => {
            RowDiagnostic::new(row, DiagnosticKind::AmbiguousTime, inner.to_string())
        }
        other => RowDiagnostic::from((
            row,
            MalformedValue {
                column: column.to_string(),
                value: raw.to_string(),
                reason: other.to_string(),
            },
        )),
    }
}
