//! Branch-id extraction from identifier cells.

use branchwatch_core::BranchId;
use serde::{Deserialize, Serialize};

use crate::error::ExtractionError;

/// Default prefix of branch server names (`BR5012-Giza`).
pub const DEFAULT_SERVER_PREFIX: &str = "BR5";

/// How a branch id is recovered from an identifier cell.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "pattern", rename_all = "snake_case")]
pub enum IdPattern {
    /// First run of ASCII digits: `ChannelDB_012` → `12`.
    #[default]
    Digits,
    /// Segment before the first `-`, with the server prefix stripped:
    /// `BR5012-Cairo` → `12`.
    ServerName { prefix: String },
}

impl IdPattern {
    pub fn server_name(prefix: impl Into<String>) -> Self {
        IdPattern::ServerName {
            prefix: prefix.into(),
        }
    }

    pub fn extract(&self, raw: &str) -> Result<BranchId, ExtractionError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(ExtractionError::Empty);
        }
        match self {
            IdPattern::Digits => first_digit_run(raw)
                .map(BranchId::new)
                .ok_or_else(|| ExtractionError::NoDigits {
                    value: raw.to_string(),
                }),
            IdPattern::ServerName { prefix } => {
                let head = raw.split('-').next().unwrap_or(raw).trim();
                let number = if prefix.is_empty() {
                    head
                } else {
                    head.rsplit(prefix.as_str()).next().unwrap_or(head)
                };
                if !number.is_empty() && number.bytes().all(|b| b.is_ascii_digit()) {
                    Ok(BranchId::new(number))
                } else {
                    Err(ExtractionError::NotServerName {
                        value: raw.to_string(),
                        prefix: prefix.clone(),
                    })
                }
            }
        }
    }
}

fn first_digit_run(s: &str) -> Option<&str> {
    let start = s.find(|c: char| c.is_ascii_digit())?;
    let rest = &s[start..];
    let len = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    Some(&rest[..len])
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
