//! Transaction-log file sizes per branch server.

use branchwatch_core::{BranchRecord, SizeBytes};

use super::{is_blank, LoadOutcome, RecordAdapter};
use crate::error::{MalformedValue, RowDiagnostic, SchemaError};
use crate::identity::{IdPattern, DEFAULT_SERVER_PREFIX};
use crate::table::RawTable;

pub const SERVER_ID: &str = "Server ID";
pub const SIZE_GB: &str = "Size (GB)";
pub const FILE_PATH: &str = "File Path";

#[derive(Debug, Clone)]
pub struct LogSizeAdapter {
    id_pattern: IdPattern,
}

impl Default for LogSizeAdapter {
    fn default() -> Self {
        LogSizeAdapter {
            id_pattern: IdPattern::server_name(DEFAULT_SERVER_PREFIX),
        }
    }
}

impl LogSizeAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id_pattern(mut self, pattern: IdPattern) -> Self {
        self.id_pattern = pattern;
        self
    }
}

impl RecordAdapter for LogSizeAdapter {
    fn source_name(&self) -> &'static str {
        "log_sizes"
    }

    fn required_columns(&self) -> &'static [&'static str] {
        &[SERVER_ID, SIZE_GB, FILE_PATH]
    }

    fn load(&self, table: &RawTable) -> Result<LoadOutcome, SchemaError> {
        let mut outcome = LoadOutcome::new(table.len());
        if is_blank(table) {
            return Ok(outcome);
        }
        let [server_col, size_col, path_col] = table.require([SERVER_ID, SIZE_GB, FILE_PATH])?;

        for idx in 0..table.len() {
            let row = idx + 1;
            let server = table.cell(idx, server_col).to_string();
            let branch_id = match self.id_pattern.extract(&server) {
                Ok(id) => id,
                Err(err) => {
                    outcome.drop_row(RowDiagnostic::from((row, err)), self.source_name());
                    continue;
                }
            };

            let size_cell = table.cell(idx, size_col);
            let Some(size) = size_cell.as_f64().and_then(SizeBytes::from_gib_f64) else {
                let malformed = MalformedValue {
                    column: SIZE_GB.to_string(),
                    value: size_cell.to_string(),
                    reason: "not a non-negative number of gigabytes".to_string(),
                };
                outcome.drop_row(RowDiagnostic::from((row, malformed)), self.source_name());
                continue;
            };

            let mut record = BranchRecord::size(branch_id, size).with_extra("server", server.trim());
            if let Some(path) = table.cell(idx, path_col).as_text() {
                record = record.with_extra("file_path", path);
            }
            outcome.records.push(record);
        }

        tracing::info!(
            rows_read = outcome.rows_read,
            retained = outcome.rows_retained(),
            dropped = outcome.diagnostics.len(),
            "loaded log file sizes"
        );
        Ok(outcome)
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
