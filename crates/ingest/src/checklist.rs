//! The new-branch opening checklist kept on the staging server.

use serde::Serialize;

use crate::error::{MalformedValue, RowDiagnostic, SchemaError};
use crate::table::{RawCell, RawTable};

pub const CATEGORY: &str = "Category";
pub const STEP_ID: &str = "StepID";
pub const DESCRIPTION: &str = "Description";
pub const COMPLETED: &str = "Completed";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChecklistStep {
    pub step_id: i64,
    pub description: String,
    pub completed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChecklistCategory {
    pub name: String,
    pub steps: Vec<ChecklistStep>,
}

impl ChecklistCategory {
    pub fn completion(&self) -> Completion {
        Completion::of(self.steps.iter())
    }
}

/// Done / total counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Completion {
    pub done: usize,
    pub total: usize,
}

impl Completion {
    fn of<'a>(steps: impl Iterator<Item = &'a ChecklistStep>) -> Self {
        steps.fold(Completion::default(), |acc, step| Completion {
            done: acc.done + usize::from(step.completed),
            total: acc.total + 1,
        })
    }

    /// Whole percent done, rounded down. An empty checklist is 0%.
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 0;
        }
        ((self.done * 100) / self.total) as u8
    }

    pub fn is_complete(&self) -> bool {
        self.total > 0 && self.done == self.total
    }
}

/// Steps grouped by category, categories in first-seen order and steps in
/// ascending step id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Checklist {
    pub categories: Vec<ChecklistCategory>,
}

impl Checklist {
    pub fn completion(&self) -> Completion {
        Completion::of(self.categories.iter().flat_map(|c| c.steps.iter()))
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Build the checklist from a `checklist_steps` result. Rows with an
    /// unusable step id or completion flag are skipped and reported.
    pub fn from_table(table: &RawTable) -> Result<(Checklist, Vec<RowDiagnostic>), SchemaError> {
        let mut checklist = Checklist::default();
        let mut diagnostics = Vec::new();
        if table.columns.is_empty() && table.is_empty() {
            return Ok((checklist, diagnostics));
        }
        let [category_col, id_col, description_col, completed_col] =
            table.require([CATEGORY, STEP_ID, DESCRIPTION, COMPLETED])?;

        for idx in 0..table.len() {
            let row = idx + 1;
            let id_cell = table.cell(idx, id_col);
            let Some(step_id) = parse_step_id(id_cell) else {
                diagnostics.push(malformed(row, STEP_ID, id_cell, "not an integer step id"));
                continue;
            };
            let completed_cell = table.cell(idx, completed_col);
            let Some(completed) = parse_flag(completed_cell) else {
                diagnostics.push(malformed(row, COMPLETED, completed_cell, "not a yes/no flag"));
                continue;
            };
            let category = table
                .cell(idx, category_col)
                .as_text()
                .map(|c| c.into_owned())
                .unwrap_or_else(|| "Uncategorized".to_string());
            let step = ChecklistStep {
                step_id,
                description: table.cell(idx, description_col).to_string().trim().to_string(),
                completed,
            };
            match checklist.categories.iter_mut().find(|c| c.name == category) {
                Some(existing) => existing.steps.push(step),
                None => checklist.categories.push(ChecklistCategory {
                    name: category,
                    steps: vec![step],
                }),
            }
        }

        for category in &mut checklist.categories {
            category.steps.sort_by_key(|s| s.step_id);
        }
        for diagnostic in &diagnostics {
            tracing::warn!(
                row = diagnostic.row,
                "dropping checklist row: {}",
                diagnostic.message
            );
        }
        Ok((checklist, diagnostics))
    }
}

fn malformed(row: usize, column: &str, cell: &RawCell, reason: &str) -> RowDiagnostic {
    RowDiagnostic::from((
        row,
        MalformedValue {
            column: column.to_string(),
            value: cell.to_string(),
            reason: reason.to_string(),
        },
    ))
}

fn parse_step_id(cell: &RawCell) -> Option<i64> {
    match cell {
        RawCell::Int(i) => Some(*i),
        RawCell::Float(f) if f.fract() == 0.0 => Some(*f as i64),
        RawCell::Text(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn parse_flag(cell: &RawCell) -> Option<bool> {
    match cell {
        RawCell::Bool(b) => Some(*b),
        RawCell::Int(0) => Some(false),
        RawCell::Int(1) => Some(true),
        RawCell::Null => Some(false),
        RawCell::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "y" => Some(true),
            "0" | "false" | "no" | "n" | "" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
