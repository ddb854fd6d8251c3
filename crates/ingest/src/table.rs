//! In-memory tabular data as delivered by a source: a header row plus rows
//! of loosely typed cells.

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::SchemaError;

/// One cell of a source table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawCell {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

static NULL_CELL: RawCell = RawCell::Null;

impl RawCell {
    pub fn is_null(&self) -> bool {
        match self {
            RawCell::Null => true,
            RawCell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// The cell as trimmed text. `None` for nulls and blank text.
    pub fn as_text(&self) -> Option<Cow<'_, str>> {
        match self {
            RawCell::Null => None,
            RawCell::Bool(b) => Some(Cow::Owned(b.to_string())),
            RawCell::Int(i) => Some(Cow::Owned(i.to_string())),
            RawCell::Float(f) => Some(Cow::Owned(f.to_string())),
            RawCell::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(Cow::Borrowed(trimmed))
                }
            }
        }
    }

    /// The cell as a number. Numeric text is accepted.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            RawCell::Int(i) => Some(*i as f64),
            RawCell::Float(f) => Some(*f),
            RawCell::Text(s) => s.trim().parse().ok(),
            RawCell::Null | RawCell::Bool(_) => None,
        }
    }
}

impl fmt::Display for RawCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawCell::Null => Ok(()),
            RawCell::Bool(b) => write!(f, "{}", b),
            RawCell::Int(i) => write!(f, "{}", i),
            RawCell::Float(x) => write!(f, "{}", x),
            RawCell::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for RawCell {
    fn from(s: &str) -> Self {
        RawCell::Text(s.to_string())
    }
}

impl From<String> for RawCell {
    fn from(s: String) -> Self {
        RawCell::Text(s)
    }
}

impl From<i64> for RawCell {
    fn from(i: i64) -> Self {
        RawCell::Int(i)
    }
}

impl From<f64> for RawCell {
    fn from(x: f64) -> Self {
        RawCell::Float(x)
    }
}

impl From<bool> for RawCell {
    fn from(b: bool) -> Self {
        RawCell::Bool(b)
    }
}

/// A header row and data rows. Rows shorter than the header read as null
/// in their missing positions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTable {
    pub columns: Vec<String>,
    #[serde(default)]
    pub rows: Vec<Vec<RawCell>>,
}

impl RawTable {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        RawTable {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn with_row<I, C>(mut self, cells: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<RawCell>,
    {
        self.push_row(cells.into_iter().map(Into::into).collect());
        self
    }

    pub fn push_row(&mut self, row: Vec<RawCell>) {
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column. Header names are matched exactly.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Resolve every required column, or report all of the absent ones.
    pub fn require<const N: usize>(&self, names: [&str; N]) -> Result<[usize; N], SchemaError> {
        let mut indices = [0usize; N];
        let mut missing = Vec::new();
        for (slot, name) in indices.iter_mut().zip(names) {
            match self.column_index(name) {
                Some(index) => *slot = index,
                None => missing.push(name.to_string()),
            }
        }
        if missing.is_empty() {
            Ok(indices)
        } else {
            Err(SchemaError::missing(missing))
        }
    }

    pub fn cell(&self, row: usize, column: usize) -> &RawCell {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .unwrap_or(&NULL_CELL)
    }

    /// Build a table from a JSON array of row objects, the "records"
    /// layout most exporters produce. Columns are taken in first-seen order.
    pub fn from_records(records: Vec<serde_json::Map<String, serde_json::Value>>) -> Self {
        let mut table = RawTable::default();
        for record in &records {
            for key in record.keys() {
                if table.column_index(key).is_none() {
                    table.columns.push(key.clone());
                }
            }
        }
        for record in records {
            let row = table
                .columns
                .iter()
                .map(|c| record.get(c).map(cell_from_json).unwrap_or(RawCell::Null))
                .collect();
            table.rows.push(row);
        }
        table
    }
}

fn cell_from_json(value: &serde_json::Value) -> RawCell {
    match value {
        serde_json::Value::Null => RawCell::Null,
        serde_json::Value::Bool(b) => RawCell::Bool(*b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => RawCell::Int(i),
            None => n.as_f64().map(RawCell::Float).unwrap_or(RawCell::Null),
        },
        serde_json::Value::String(s) => RawCell::Text(s.clone()),
        other => RawCell::Text(other.to_string()),
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
