//! Error types for source loading and row normalization.

use std::fmt;

use serde::Serialize;

/// The table lacks columns the adapter relies on. Fatal to that load.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    #[error("missing required columns: {}", .missing.join(", "))]
    MissingColumns { missing: Vec<String> },
}

impl SchemaError {
    /// Build a `MissingColumns` error with the names sorted.
    pub fn missing(mut missing: Vec<String>) -> Self {
        missing.sort();
        SchemaError::MissingColumns { missing }
    }
}

/// No branch id could be derived from a row's identifier cell.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractionError {
    #[error("identifier is empty")]
    Empty,

    #[error("no branch number in '{value}'")]
    NoDigits { value: String },

    #[error("'{value}' does not name a branch server (expected '{prefix}<number>-...')")]
    NotServerName { value: String, prefix: String },
}

/// A cell that could not be coerced to the type its column requires.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("column '{column}': {reason} ('{value}')")]
pub struct MalformedValue {
    pub column: String,
    pub value: String,
    pub reason: String,
}

/// The data source itself could not be read.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    #[error("source unavailable: {message}")]
    Unavailable { message: String },

    #[error("source returned unreadable data: {message}")]
    Malformed { message: String },
}

// ──────────────────────────────────────────────
// Row diagnostics
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    Extraction,
    Malformed,
    AmbiguousTime,
}

/// Why one row was dropped. `row` is the 1-based data row number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowDiagnostic {
    pub row: usize,
    pub kind: DiagnosticKind,
    pub message: String,
}

impl RowDiagnostic {
    pub fn new(row: usize, kind: DiagnosticKind, message: impl Into<String>) -> Self {
        RowDiagnostic {
            row,
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for RowDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "row {}: {}", self.row, self.message)
    }
}

impl From<(usize, ExtractionError)> for RowDiagnostic {
    fn from((row, err): (usize, ExtractionError)) -> Self {
        RowDiagnostic::new(row, DiagnosticKind::Extraction, err.to_string())
    }
}

impl From<(usize, MalformedValue)> for RowDiagnostic {
    fn from((row, err): (usize, MalformedValue)) -> Self {
        RowDiagnostic::new(row, DiagnosticKind::Malformed, err.to_string())
    }
}
