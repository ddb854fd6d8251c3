//! Uploaded spreadsheets: the `.xlsx` workbook saved from the "Upload
//! Sessions" screen, or its CSV export.

use std::io::Cursor;
use std::path::Path;

use calamine::{open_workbook_from_rs, Data, Reader, Xlsx};

use crate::error::SourceError;
use crate::table::{RawCell, RawTable};

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Turns the bytes of an uploaded file into a [`RawTable`].
pub trait SpreadsheetSource: Send + Sync {
    fn parse(&self, bytes: &[u8]) -> Result<RawTable, SourceError>;
}

/// CSV export of the "Upload Sessions" screen.
///
/// Every cell is read as text. A UTF-8 byte-order mark is skipped, and rows
/// may be ragged.
#[derive(Debug, Clone, Copy)]
pub struct CsvSpreadsheet {
    delimiter: u8,
}

impl Default for CsvSpreadsheet {
    fn default() -> Self {
        CsvSpreadsheet { delimiter: b',' }
    }
}

impl CsvSpreadsheet {
    pub fn with_delimiter(delimiter: u8) -> Self {
        CsvSpreadsheet { delimiter }
    }
}

fn strip_utf8_bom(data: &[u8]) -> &[u8] {
    data.strip_prefix(UTF8_BOM).unwrap_or(data)
}

impl SpreadsheetSource for CsvSpreadsheet {
    fn parse(&self, bytes: &[u8]) -> Result<RawTable, SourceError> {
        let data = strip_utf8_bom(bytes);
        if data.iter().all(u8::is_ascii_whitespace) {
            return Ok(RawTable::default());
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .delimiter(self.delimiter)
            .from_reader(data);

        let columns: Vec<String> = reader
            .headers()
            .map_err(|e| SourceError::Malformed {
                message: format!("failed to read CSV headers: {}", e),
            })?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut table = RawTable::new(columns);
        for (idx, record) in reader.records().enumerate() {
            let record = record.map_err(|e| SourceError::Malformed {
                message: format!("CSV line {}: {}", idx + 2, e),
            })?;
            if record.iter().all(|f| f.trim().is_empty()) {
                continue;
            }
            table.push_row(record.iter().map(RawCell::from).collect());
        }
        Ok(table)
    }
}

/// `.xlsx` workbook. The first worksheet is read and its first row is the
/// header. Date cells arrive as Excel serials (`RawCell::Float`).
#[derive(Debug, Clone, Copy, Default)]
pub struct XlsxSpreadsheet;

impl SpreadsheetSource for XlsxSpreadsheet {
    fn parse(&self, bytes: &[u8]) -> Result<RawTable, SourceError> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(RawTable::default());
        }

        let mut workbook: Xlsx<_> =
            open_workbook_from_rs(Cursor::new(bytes)).map_err(|e| SourceError::Malformed {
                message: format!("failed to open workbook: {}", e),
            })?;
        let range = match workbook.worksheet_range_at(0) {
            Some(range) => range.map_err(|e| SourceError::Malformed {
                message: format!("failed to read first worksheet: {}", e),
            })?,
            None => return Ok(RawTable::default()),
        };

        let mut rows = range.rows();
        let Some(header) = rows.next() else {
            return Ok(RawTable::default());
        };
        let mut table = RawTable::new(header.iter().map(|h| h.to_string().trim().to_string()));
        for row in rows {
            let cells: Vec<RawCell> = row.iter().map(workbook_cell).collect();
            if cells.iter().all(RawCell::is_null) {
                continue;
            }
            table.push_row(cells);
        }
        Ok(table)
    }
}

fn workbook_cell(data: &Data) -> RawCell {
    match data {
        Data::Empty | Data::Error(_) => RawCell::Null,
        Data::String(s) if s.trim().is_empty() => RawCell::Null,
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => RawCell::Text(s.clone()),
        Data::Int(i) => RawCell::Int(*i),
        Data::Float(f) => RawCell::Float(*f),
        Data::Bool(b) => RawCell::Bool(*b),
        Data::DateTime(dt) => RawCell::Float(dt.as_f64()),
    }
}

/// The reader for an uploaded file, by extension. Anything that is not a
/// workbook is read as CSV.
pub fn spreadsheet_for(path: &Path) -> Box<dyn SpreadsheetSource> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("xlsx") | Some("xlsm") => Box::new(XlsxSpreadsheet),
        _ => Box::new(CsvSpreadsheet::default()),
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
