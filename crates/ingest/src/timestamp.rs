//! Timestamp coercion for source cells.
//!
//! Values carrying an explicit offset (RFC 3339) are taken as-is; naive
//! wall-clock values, including Excel serial dates from workbook cells, are
//! localized through the [`BusinessClock`].

use branchwatch_core::{BusinessClock, LocalizeError};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta, Utc};

use crate::table::RawCell;

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %I:%M %p",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y"];

/// Serial of 10000-01-01, the first day Excel cannot represent.
const EXCEL_SERIAL_LIMIT: f64 = 2_958_466.0;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimestampError {
    #[error("empty timestamp")]
    Empty,

    #[error("unrecognized timestamp")]
    Unrecognized,

    #[error(transparent)]
    Ambiguous(#[from] LocalizeError),
}

/// Parse a naive wall-clock value in any of the accepted layouts.
pub fn parse_naive(text: &str) -> Option<NaiveDateTime> {
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Excel serial date: whole days since 1899-12-30, time of day as the
/// fraction. Rounded to the second.
pub fn from_excel_serial(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 1.0 || serial >= EXCEL_SERIAL_LIMIT {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let seconds = (serial * 86_400.0).round() as i64;
    epoch.checked_add_signed(TimeDelta::try_seconds(seconds)?)
}

/// Coerce a cell to a UTC instant.
pub fn parse_timestamp(
    cell: &RawCell,
    clock: &BusinessClock,
) -> Result<DateTime<Utc>, TimestampError> {
    let text = match cell {
        RawCell::Text(_) => cell.as_text().ok_or(TimestampError::Empty)?,
        RawCell::Null => return Err(TimestampError::Empty),
        RawCell::Int(n) => return localize_serial(*n as f64, clock),
        RawCell::Float(f) => return localize_serial(*f, clock),
        RawCell::Bool(_) => return Err(TimestampError::Unrecognized),
    };
    if let Ok(at) = DateTime::parse_from_rfc3339(&text) {
        return Ok(at.with_timezone(&Utc));
    }
    let naive = parse_naive(&text).ok_or(TimestampError::Unrecognized)?;
    Ok(clock.localize(naive)?)
}

fn localize_serial(serial: f64, clock: &BusinessClock) -> Result<DateTime<Utc>, TimestampError> {
    let naive = from_excel_serial(serial).ok_or(TimestampError::Unrecognized)?;
    Ok(clock.localize(naive)?)
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
