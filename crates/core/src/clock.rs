//! Business-local time.
//!
//! Source systems record wall-clock times in the business timezone without
//! an offset. Every such value passes through [`BusinessClock::localize`]
//! once, on ingestion; from then on all arithmetic is done on UTC instants.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, LocalResult, NaiveDateTime, Offset, TimeDelta, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Which instant to use for a wall-clock time that occurs twice (the hour
/// repeated when clocks fall back).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmbiguityPolicy {
    /// First occurrence: the offset in force before the transition.
    #[default]
    Earliest,
    /// Second occurrence: the offset in force after the transition.
    Latest,
    /// Refuse to guess; the row is dropped with a diagnostic.
    Reject,
}

impl FromStr for AmbiguityPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "earliest" => Ok(AmbiguityPolicy::Earliest),
            "latest" => Ok(AmbiguityPolicy::Latest),
            "reject" => Ok(AmbiguityPolicy::Reject),
            other => Err(format!(
                "unknown ambiguity policy '{}' (expected earliest, latest or reject)",
                other
            )),
        }
    }
}

/// A wall-clock time that could not be mapped to an instant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LocalizeError {
    #[error("local time {local} is ambiguous in {timezone}")]
    Ambiguous { local: NaiveDateTime, timezone: Tz },
}

/// The business timezone plus the policy for daylight-saving edge cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusinessClock {
    timezone: Tz,
    ambiguity: AmbiguityPolicy,
}

impl Default for BusinessClock {
    fn default() -> Self {
        BusinessClock::new(chrono_tz::Africa::Cairo, AmbiguityPolicy::Earliest)
    }
}

impl BusinessClock {
    pub fn new(timezone: Tz, ambiguity: AmbiguityPolicy) -> Self {
        BusinessClock {
            timezone,
            ambiguity,
        }
    }

    /// Build a clock from an IANA zone name such as `"Africa/Cairo"`.
    pub fn from_zone_name(name: &str, ambiguity: AmbiguityPolicy) -> Result<Self, String> {
        let timezone: Tz = name
            .parse()
            .map_err(|_| format!("unknown timezone '{}'", name))?;
        Ok(Self::new(timezone, ambiguity))
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    pub fn ambiguity(&self) -> AmbiguityPolicy {
        self.ambiguity
    }

    /// Map a business-local wall-clock time to a UTC instant.
    ///
    /// Ambiguous times follow the clock's [`AmbiguityPolicy`]. Times that
    /// fall in a spring-forward gap are read with the offset in force just
    /// before the gap, which moves them forward by the gap length
    /// (02:30 in a 02:00→03:00 gap becomes 03:30).
    pub fn localize(&self, local: NaiveDateTime) -> Result<DateTime<Utc>, LocalizeError> {
        match self.timezone.from_local_datetime(&local) {
            LocalResult::Single(at) => Ok(at.with_timezone(&Utc)),
            LocalResult::Ambiguous(earliest, latest) => match self.ambiguity {
                AmbiguityPolicy::Earliest => Ok(earliest.with_timezone(&Utc)),
                AmbiguityPolicy::Latest => Ok(latest.with_timezone(&Utc)),
                AmbiguityPolicy::Reject => Err(LocalizeError::Ambiguous {
                    local,
                    timezone: self.timezone,
                }),
            },
            LocalResult::None => {
                // Transitions are never less than a day apart.
                let before = local - TimeDelta::days(1);
                let offset = self.timezone.offset_from_utc_datetime(&before).fix();
                let utc = local - TimeDelta::seconds(i64::from(offset.local_minus_utc()));
                Ok(Utc.from_utc_datetime(&utc))
            }
        }
    }

    /// Express an instant in business-local time, for display.
    pub fn to_local(&self, at: DateTime<Utc>) -> DateTime<Tz> {
        at.with_timezone(&self.timezone)
    }
}

impl fmt::Display for BusinessClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.timezone.name())
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
