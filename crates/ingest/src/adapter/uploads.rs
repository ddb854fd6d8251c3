//! Sales upload sessions, from the "Upload Sessions" spreadsheet export.

use branchwatch_core::{BranchRecord, BusinessClock};

use super::{is_blank, timestamp_diagnostic, LoadOutcome, RecordAdapter};
use crate::error::{RowDiagnostic, SchemaError};
use crate::identity::IdPattern;
use crate::table::RawTable;
use crate::timestamp::parse_timestamp;

pub const CHANNEL_DATABASE: &str = "Channel database";
pub const DATE_UPLOADED: &str = "Date uploaded";
pub const STATUS: &str = "Status";

/// Only sessions with this status count as an upload.
pub const STATUS_APPLIED: &str = "Applied";

/// Reads one upload session per row, keeping `Applied` sessions only.
#[derive(Debug, Clone)]
pub struct UploadSessionAdapter {
    clock: BusinessClock,
    id_pattern: IdPattern,
}

impl UploadSessionAdapter {
    pub fn new(clock: BusinessClock) -> Self {
        UploadSessionAdapter {
            clock,
            id_pattern: IdPattern::Digits,
        }
    }

    pub fn with_id_pattern(mut self, pattern: IdPattern) -> Self {
        self.id_pattern = pattern;
        self
    }
}

impl RecordAdapter for UploadSessionAdapter {
    fn source_name(&self) -> &'static str {
        "uploads"
    }

    fn required_columns(&self) -> &'static [&'static str] {
        &[CHANNEL_DATABASE, DATE_UPLOADED, STATUS]
    }

    fn load(&self, table: &RawTable) -> Result<LoadOutcome, SchemaError> {
        let mut outcome = LoadOutcome::new(table.len());
        if is_blank(table) {
            return Ok(outcome);
        }
        let [channel_col, date_col, status_col] =
            table.require([CHANNEL_DATABASE, DATE_UPLOADED, STATUS])?;

        for idx in 0..table.len() {
            let row = idx + 1;
            let applied = table
                .cell(idx, status_col)
                .as_text()
                .is_some_and(|s| s == STATUS_APPLIED);
            if !applied {
                continue;
            }

            let channel = table.cell(idx, channel_col).to_string();
            let branch_id = match self.id_pattern.extract(&channel) {
                Ok(id) => id,
                Err(err) => {
                    outcome.drop_row(RowDiagnostic::from((row, err)), self.source_name());
                    continue;
                }
            };

            let date_cell = table.cell(idx, date_col);
            match parse_timestamp(date_cell, &self.clock) {
                Ok(at) => outcome.records.push(
                    BranchRecord::timestamp(branch_id, at)
                        .with_extra("channel_database", channel.trim()),
                ),
                Err(err) => {
                    let diagnostic =
                        timestamp_diagnostic(row, DATE_UPLOADED, &date_cell.to_string(), err);
                    outcome.drop_row(diagnostic, self.source_name());
                }
            }
        }

        tracing::info!(
            rows_read = outcome.rows_read,
            retained = outcome.rows_retained(),
            dropped = outcome.diagnostics.len(),
            "loaded upload sessions"
        );
        Ok(outcome)
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DiagnosticKind;
    use branchwatch_core::{AmbiguityPolicy, BranchId, ObservedValue};
    use chrono::{TimeZone, Utc};

    fn sessions() -> RawTable {
        RawTable::new([CHANNEL_DATABASE, DATE_UPLOADED, STATUS])
            .with_row(["Channel_012", "2025-01-20 09:15:00", "Applied"])
            .with_row(["Channel_013", "2025-01-20 09:20:00", "Failed"])
            .with_row(["Channel", "2025-01-20 09:25:00", "Applied"])
            .with_row(["Channel_014", "not a date", "Applied"])
            .with_row(["Channel_015", "2025-01-20 08:00:00", "Applied"])
    }

    #[test]
    fn keeps_applied_rows_and_diagnoses_bad_ones() {
        let outcome = UploadSessionAdapter::new(BusinessClock::default())
            .load(&sessions())
            .unwrap();

        assert_eq!(outcome.rows_read, 5);
        assert_eq!(outcome.rows_retained(), 2);
        let ids: Vec<&BranchId> = outcome.records.iter().map(|r| &r.branch_id).collect();
        assert_eq!(ids, vec![&BranchId::new("12"), &BranchId::new("15")]);
        assert_eq!(
            outcome.records[0].observed,
            ObservedValue::Timestamp(Utc.with_ymd_and_hms(2025, 1, 20, 7, 15, 0).unwrap())
        );
        assert_eq!(outcome.records[0].extra["channel_database"], "Channel_012");

        let kinds: Vec<(usize, DiagnosticKind)> =
            outcome.diagnostics.iter().map(|d| (d.row, d.kind)).collect();
        assert_eq!(
            kinds,
            vec![(3, DiagnosticKind::Extraction), (4, DiagnosticKind::Malformed)]
        );
    }

    #[test]
    fn status_match_is_case_sensitive() {
        let table = RawTable::new([CHANNEL_DATABASE, DATE_UPLOADED, STATUS])
            .with_row(["Ch_1", "2025-01-20 09:15:00", "applied"])
            .with_row(["Ch_2", "2025-01-20 09:15:00", " Applied "]);
        let outcome = UploadSessionAdapter::new(BusinessClock::default())
            .load(&table)
            .unwrap();
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.records[0].branch_id.as_str(), "2");
    }

    #[test]
    fn missing_status_column_is_schema_error() {
        let table = RawTable::new([CHANNEL_DATABASE, DATE_UPLOADED])
            .with_row(["Ch_1", "2025-01-20 09:15:00"]);
        let err = UploadSessionAdapter::new(BusinessClock::default())
            .load(&table)
            .unwrap_err();
        assert_eq!(err, SchemaError::missing(vec![STATUS.to_string()]));
    }

    #[test]
    fn blank_table_is_empty_outcome() {
        let outcome = UploadSessionAdapter::new(BusinessClock::default())
            .load(&RawTable::default())
            .unwrap();
        assert!(outcome.records.is_empty());
        assert_eq!(outcome.rows_read, 0);
    }

    #[test]
    fn ambiguous_upload_time_rejected_under_reject_policy() {
        let clock = BusinessClock::new(chrono_tz::America::New_York, AmbiguityPolicy::Reject);
        let table = RawTable::new([CHANNEL_DATABASE, DATE_UPLOADED, STATUS])
            .with_row(["Ch_1", "2024-11-03 01:30:00", "Applied"]);
        let outcome = UploadSessionAdapter::new(clock).load(&table).unwrap();
        assert!(outcome.records.is_empty());
        assert_eq!(outcome.diagnostics[0].kind, DiagnosticKind::AmbiguousTime);
    }
}
