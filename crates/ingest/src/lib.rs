//! branchwatch-ingest: reads the monitored sources into branch records.
//!
//! Sources deliver a [`RawTable`]: a spreadsheet upload (CSV or `.xlsx`)
//! through a [`SpreadsheetSource`], or a staging-server query result
//! through a [`QuerySource`]. A [`RecordAdapter`] then validates the columns and
//! normalizes each row into a [`branchwatch_core::BranchRecord`].

pub mod adapter;
pub mod checklist;
pub mod error;
pub mod identity;
pub mod query;
pub mod spreadsheet;
pub mod table;
pub mod timestamp;

pub use adapter::{
    BackupAdapter, LoadOutcome, LogSizeAdapter, RecordAdapter, UploadSessionAdapter,
};
pub use checklist::{Checklist, ChecklistCategory, ChecklistStep, Completion};
pub use error::{
    DiagnosticKind, ExtractionError, MalformedValue, RowDiagnostic, SchemaError, SourceError,
};
pub use identity::{IdPattern, DEFAULT_SERVER_PREFIX};
pub use query::{QueryKind, QuerySource, SnapshotQuerySource, StaticQuerySource};
pub use spreadsheet::{spreadsheet_for, CsvSpreadsheet, SpreadsheetSource, XlsxSpreadsheet};
pub use table::{RawCell, RawTable};
pub use timestamp::{from_excel_serial, parse_timestamp, TimestampError};
