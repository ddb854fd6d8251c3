//! Upload-session spreadsheets read end to end: CSV bytes through the
//! spreadsheet source and the upload adapter.

use branchwatch_core::{BranchId, BusinessClock, ObservedValue};
use branchwatch_ingest::{
    CsvSpreadsheet, DiagnosticKind, RecordAdapter, SchemaError, SpreadsheetSource,
    UploadSessionAdapter,
};
use chrono::{TimeZone, Utc};

fn load(csv: &[u8]) -> Result<branchwatch_ingest::LoadOutcome, SchemaError> {
    let table = CsvSpreadsheet::default().parse(csv).expect("csv parses");
    UploadSessionAdapter::new(BusinessClock::default()).load(&table)
}

#[test]
fn export_with_bom_and_mixed_statuses() {
    let mut csv = vec![0xEF, 0xBB, 0xBF];
    csv.extend_from_slice(
        b"Session,Channel database,Date uploaded,Status,Rows\n\
          1,Othaim_Channel_001,2025-06-12 10:05:00,Applied,120\n\
          2,Othaim_Channel_002,2025-06-12 10:10:00,Pending,95\n\
          3,Othaim_Channel_001,2025-06-12 11:40:00,Applied,130\n\
          4,Othaim_Channel_017,6/12/2025 8:00:00 AM,Applied,88\n\
          5,Othaim_Channel_023,,Applied,0\n",
    );
    let outcome = load(&csv).unwrap();

    assert_eq!(outcome.rows_read, 5);
    assert_eq!(outcome.rows_retained(), 3);
    assert_eq!(outcome.diagnostics.len(), 1);
    assert_eq!(outcome.diagnostics[0].row, 5);
    assert_eq!(outcome.diagnostics[0].kind, DiagnosticKind::Malformed);

    // Cairo is UTC+3 in June 2025 (daylight saving).
    let latest_for_one = outcome
        .records
        .iter()
        .filter(|r| r.branch_id == BranchId::new("1"))
        .filter_map(|r| r.observed.observed_at())
        .max()
        .unwrap();
    assert_eq!(
        latest_for_one,
        Utc.with_ymd_and_hms(2025, 6, 12, 8, 40, 0).unwrap()
    );
    assert!(outcome.records.iter().any(|r| r.branch_id.as_str() == "17"
        && r.observed
            == ObservedValue::Timestamp(Utc.with_ymd_and_hms(2025, 6, 12, 5, 0, 0).unwrap())));
}

#[test]
fn missing_status_column_fails_the_load() {
    let csv = b"Channel database,Date uploaded\nOthaim_Channel_001,2025-06-12 10:05:00\n";
    let err = load(csv).unwrap_err();
    assert_eq!(
        err,
        SchemaError::MissingColumns {
            missing: vec!["Status".to_string()]
        }
    );
}

#[test]
fn empty_file_yields_no_records() {
    let outcome = load(b"").unwrap();
    assert!(outcome.records.is_empty());
    assert!(outcome.diagnostics.is_empty());
}

#[test]
fn header_only_file_yields_no_records() {
    let outcome = load(b"Channel database,Date uploaded,Status\n").unwrap();
    assert_eq!(outcome.rows_read, 0);
    assert!(outcome.records.is_empty());
}
