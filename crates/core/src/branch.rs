//! Branch identity and per-branch observations.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ──────────────────────────────────────────────
// BranchId
// ──────────────────────────────────────────────

/// Canonical branch identifier.
///
/// Purely numeric identifiers lose their leading zeros, so `"012"` from a
/// channel database name and `"12"` from the registry are the same branch.
/// Ordering is natural: numeric ids compare by value and sort before any
/// non-numeric id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct BranchId(String);

impl BranchId {
    pub fn new(raw: &str) -> Self {
        let trimmed = raw.trim();
        if is_numeric(trimmed) {
            let stripped = trimmed.trim_start_matches('0');
            if stripped.is_empty() {
                BranchId("0".to_string())
            } else {
                BranchId(stripped.to_string())
            }
        } else {
            BranchId(trimmed.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The branch number, when the identifier is numeric.
    pub fn number(&self) -> Option<u64> {
        if is_numeric(&self.0) {
            self.0.parse().ok()
        } else {
            None
        }
    }
}

fn is_numeric(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

impl Ord for BranchId {
    fn cmp(&self, other: &Self) -> Ordering {
        match (is_numeric(&self.0), is_numeric(&other.0)) {
            // Canonical numeric ids carry no leading zeros, so length first
            // then lexicographic order is numeric order at any width.
            (true, true) => self
                .0
                .len()
                .cmp(&other.0.len())
                .then_with(|| self.0.cmp(&other.0)),
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => self.0.cmp(&other.0),
        }
    }
}

impl PartialOrd for BranchId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for BranchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for BranchId {
    fn from(raw: String) -> Self {
        BranchId::new(&raw)
    }
}

impl From<&str> for BranchId {
    fn from(raw: &str) -> Self {
        BranchId::new(raw)
    }
}

impl From<BranchId> for String {
    fn from(id: BranchId) -> Self {
        id.0
    }
}

// ──────────────────────────────────────────────
// SizeBytes
// ──────────────────────────────────────────────

const BYTES_PER_GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// A size in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SizeBytes(pub u64);

impl SizeBytes {
    /// Panics on overflow; see [`SizeBytes::try_from_gib`] for figures read
    /// from configuration.
    pub const fn from_gib(gib: u64) -> Self {
        SizeBytes(gib * 1024 * 1024 * 1024)
    }

    /// Whole gigabytes to bytes, `None` past `u64::MAX` bytes.
    pub fn try_from_gib(gib: u64) -> Option<Self> {
        gib.checked_mul(1024 * 1024 * 1024).map(SizeBytes)
    }

    /// Convert a (possibly fractional) gigabyte figure, as reported by the
    /// staging server, into bytes. Negative and non-finite figures are
    /// rejected.
    pub fn from_gib_f64(gib: f64) -> Option<Self> {
        if !gib.is_finite() || gib < 0.0 {
            return None;
        }
        let bytes = (gib * BYTES_PER_GIB).round();
        if bytes > u64::MAX as f64 {
            return None;
        }
        Some(SizeBytes(bytes as u64))
    }

    pub fn as_gib(&self) -> f64 {
        self.0 as f64 / BYTES_PER_GIB
    }
}

impl fmt::Display for SizeBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2} GB", self.as_gib())
    }
}

// ──────────────────────────────────────────────
// Observations
// ──────────────────────────────────────────────

/// The dimension an observation (and a threshold) is measured in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObservationKind {
    Timestamp,
    Size,
}

impl fmt::Display for ObservationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObservationKind::Timestamp => f.write_str("timestamp"),
            ObservationKind::Size => f.write_str("size"),
        }
    }
}

/// The value observed for a branch: when something last happened, or how
/// large something is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObservedValue {
    Timestamp(DateTime<Utc>),
    Size(SizeBytes),
}

impl ObservedValue {
    pub fn kind(&self) -> ObservationKind {
        match self {
            ObservedValue::Timestamp(_) => ObservationKind::Timestamp,
            ObservedValue::Size(_) => ObservationKind::Size,
        }
    }

    /// Observation time, used to pick the most recent of duplicate records.
    pub fn observed_at(&self) -> Option<DateTime<Utc>> {
        match self {
            ObservedValue::Timestamp(at) => Some(*at),
            ObservedValue::Size(_) => None,
        }
    }
}

/// One per-branch observation produced by a source adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchRecord {
    pub branch_id: BranchId,
    pub observed: ObservedValue,
    /// Source columns kept for display (server name, file path, ...).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

impl BranchRecord {
    pub fn new(branch_id: impl Into<BranchId>, observed: ObservedValue) -> Self {
        BranchRecord {
            branch_id: branch_id.into(),
            observed,
            extra: BTreeMap::new(),
        }
    }

    pub fn timestamp(branch_id: impl Into<BranchId>, at: DateTime<Utc>) -> Self {
        Self::new(branch_id, ObservedValue::Timestamp(at))
    }

    pub fn size(branch_id: impl Into<BranchId>, size: SizeBytes) -> Self {
        Self::new(branch_id, ObservedValue::Size(size))
    }

    pub fn with_extra(mut self, key: &str, value: impl Into<String>) -> Self {
        self.extra.insert(key.to_string(), value.into());
        self
    }
}

/// Outcome of a liveness check against one branch's own database endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectivityOutcome {
    pub branch_id: BranchId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    pub reachable: bool,
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
