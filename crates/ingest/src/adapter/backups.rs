//! Last database backup per branch server, from the staging server.

use branchwatch_core::{BranchRecord, BusinessClock};

use super::{is_blank, timestamp_diagnostic, LoadOutcome, RecordAdapter};
use crate::error::{RowDiagnostic, SchemaError};
use crate::identity::{IdPattern, DEFAULT_SERVER_PREFIX};
use crate::table::RawTable;
use crate::timestamp::parse_timestamp;

pub const SERVER_ID: &str = "Server ID";
pub const LAST_BACKUP_DATE: &str = "Last Backup Date";

#[derive(Debug, Clone)]
pub struct BackupAdapter {
    clock: BusinessClock,
    id_pattern: IdPattern,
}

impl BackupAdapter {
    pub fn new(clock: BusinessClock) -> Self {
        BackupAdapter {
            clock,
            id_pattern: IdPattern::server_name(DEFAULT_SERVER_PREFIX),
        }
    }

    pub fn with_id_pattern(mut self, pattern: IdPattern) -> Self {
        self.id_pattern = pattern;
        self
    }
}

impl RecordAdapter for BackupAdapter {
    fn source_name(&self) -> &'static str {
        "backups"
    }

    fn required_columns(&self) -> &'static [&'static str] {
        &[SERVER_ID, LAST_BACKUP_DATE]
    }

    fn load(&self, table: &RawTable) -> Result<LoadOutcome, SchemaError> {
        let mut outcome = LoadOutcome::new(table.len());
        if is_blank(table) {
            return Ok(outcome);
        }
        let [server_col, date_col] = table.require([SERVER_ID, LAST_BACKUP_DATE])?;

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
            let date_cell = table.cell(idx, date_col);
            match parse_timestamp(date_cell, &self.clock) {
                Ok(at) => outcome
                    .records
                    .push(BranchRecord::timestamp(branch_id, at).with_extra("server", server.trim())),
                Err(err) => {
                    let diagnostic =
                        timestamp_diagnostic(row, LAST_BACKUP_DATE, &date_cell.to_string(), err);
                    outcome.drop_row(diagnostic, self.source_name());
                }
            }
        }

        tracing::info!(
            rows_read = outcome.rows_read,
            retained = outcome.rows_retained(),
            dropped = outcome.diagnostics.len(),
            "loaded backup dates"
        );
        Ok(outcome)
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
