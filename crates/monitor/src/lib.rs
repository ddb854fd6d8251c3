//! branchwatch-monitor: the three branch health checks.
//!
//! A [`Monitor`] owns the branch registry, the business clock and the
//! thresholds. Each check reads its source, reconciles the records against
//! the registry and returns a [`HealthReport`]; progress goes to a
//! caller-supplied [`ProgressSink`].

pub mod error;
pub mod monitor;
pub mod progress;
pub mod report;

pub use error::CheckError;
pub use monitor::{Monitor, Thresholds};
pub use progress::{NoProgress, ProgressReporter, ProgressSink, RecordedProgress, TracingProgress};
pub use report::{CheckKind, ChecklistReport, HealthReport, ReportStatus};
