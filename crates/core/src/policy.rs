//! Threshold policies and the deviations they are compared against.

use std::fmt;

use chrono::TimeDelta;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::branch::{ObservationKind, SizeBytes};

/// Raised when a policy is built with a limit that can never be meaningful.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PolicyError {
    #[error("staleness limit must be positive, got {seconds}s")]
    NonPositiveDuration { seconds: i64 },

    #[error("size limit must be positive")]
    ZeroSize,

    #[error("limit of {value} {unit} is out of range")]
    OutOfRange { value: i128, unit: &'static str },
}

/// How a deviation is compared with the limit. Only strict "greater than"
/// exists: a deviation equal to the limit is healthy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparator {
    #[default]
    GreaterThan,
}

/// The limit of a threshold policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Limit {
    Duration(TimeDelta),
    Size(SizeBytes),
}

impl Limit {
    pub fn kind(&self) -> ObservationKind {
        match self {
            Limit::Duration(_) => ObservationKind::Timestamp,
            Limit::Size(_) => ObservationKind::Size,
        }
    }
}

impl fmt::Display for Limit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Limit::Duration(d) => f.write_str(&format_elapsed(*d)),
            Limit::Size(s) => write!(f, "{}", s),
        }
    }
}

/// A validated threshold for one monitored dimension.
///
/// Constructors reject non-positive limits, so every `ThresholdPolicy` in
/// existence is usable by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThresholdPolicy {
    limit: Limit,
    comparator: Comparator,
}

impl ThresholdPolicy {
    /// Unhealthy once more than `limit` has elapsed since the observation.
    pub fn staleness(limit: TimeDelta) -> Result<Self, PolicyError> {
        if limit <= TimeDelta::zero() {
            return Err(PolicyError::NonPositiveDuration {
                seconds: limit.num_seconds(),
            });
        }
        Ok(ThresholdPolicy {
            limit: Limit::Duration(limit),
            comparator: Comparator::GreaterThan,
        })
    }

    pub fn staleness_minutes(minutes: i64) -> Result<Self, PolicyError> {
        let limit = TimeDelta::try_minutes(minutes).ok_or(PolicyError::OutOfRange {
            value: minutes.into(),
            unit: "minutes",
        })?;
        Self::staleness(limit)
    }

    pub fn staleness_hours(hours: i64) -> Result<Self, PolicyError> {
        let limit = TimeDelta::try_hours(hours).ok_or(PolicyError::OutOfRange {
            value: hours.into(),
            unit: "hours",
        })?;
        Self::staleness(limit)
    }

    /// Unhealthy once the observed size is larger than `limit`.
    pub fn max_size(limit: SizeBytes) -> Result<Self, PolicyError> {
        if limit.0 == 0 {
            return Err(PolicyError::ZeroSize);
        }
        Ok(ThresholdPolicy {
            limit: Limit::Size(limit),
            comparator: Comparator::GreaterThan,
        })
    }

    pub fn max_size_gib(gib: u64) -> Result<Self, PolicyError> {
        let limit = SizeBytes::try_from_gib(gib).ok_or(PolicyError::OutOfRange {
            value: gib.into(),
            unit: "gigabytes",
        })?;
        Self::max_size(limit)
    }

    pub fn kind(&self) -> ObservationKind {
        self.limit.kind()
    }

    pub fn limit(&self) -> Limit {
        self.limit
    }

    pub fn comparator(&self) -> Comparator {
        self.comparator
    }

    /// Whether `deviation` breaches this policy. `None` when the deviation
    /// is measured in a different dimension than the limit.
    pub fn is_exceeded_by(&self, deviation: &Deviation) -> Option<bool> {
        let ordering = match (self.limit, deviation) {
            (Limit::Duration(limit), Deviation::Elapsed(elapsed)) => elapsed.cmp(&limit),
            (Limit::Size(limit), Deviation::Size(size)) => size.cmp(&limit),
            _ => return None,
        };
        match self.comparator {
            Comparator::GreaterThan => Some(ordering.is_gt()),
        }
    }
}

impl Serialize for ThresholdPolicy {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry("kind", &self.kind())?;
        match self.limit {
            Limit::Duration(d) => map.serialize_entry("limit_seconds", &d.num_seconds())?,
            Limit::Size(s) => map.serialize_entry("limit_bytes", &s.0)?,
        }
        map.serialize_entry("comparator", &self.comparator)?;
        map.end()
    }
}

// ──────────────────────────────────────────────
// Deviation
// ──────────────────────────────────────────────

/// How far an observation is from "perfectly fresh": elapsed time since a
/// timestamp (negative for timestamps in the future), or the size itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deviation {
    Elapsed(TimeDelta),
    Size(SizeBytes),
}

impl fmt::Display for Deviation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Deviation::Elapsed(d) => f.write_str(&format_elapsed(*d)),
            Deviation::Size(s) => write!(f, "{}", s),
        }
    }
}

impl Serialize for Deviation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        match self {
            Deviation::Elapsed(d) => map.serialize_entry("elapsed_seconds", &d.num_seconds())?,
            Deviation::Size(s) => map.serialize_entry("size_bytes", &s.0)?,
        }
        map.end()
    }
}

/// Render a duration as `1d 02h 05m`, `3h 07m` or `12m`.
pub fn format_elapsed(delta: TimeDelta) -> String {
    let sign = if delta < TimeDelta::zero() { "-" } else { "" };
    let total_minutes = delta.num_minutes().unsigned_abs();
    let days = total_minutes / (24 * 60);
    let hours = (total_minutes / 60) % 24;
    let minutes = total_minutes % 60;
    if days > 0 {
        format!("{sign}{days}d {hours:02}h {minutes:02}m")
    } else if hours > 0 {
        format!("{sign}{hours}h {minutes:02}m")
    } else {
        format!("{sign}{minutes}m")
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
