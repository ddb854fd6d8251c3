use branchwatch_core::ReconcileError;
use branchwatch_ingest::{SchemaError, SourceError};

/// Why a check could not produce a report.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CheckError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),
}

impl CheckError {
    /// Short operator-facing explanation.
    pub fn user_message(&self) -> String {
        match self {
            CheckError::Schema(e) => format!("Data malformed: {}", e),
            CheckError::Source(SourceError::Malformed { message }) => {
                format!("Data malformed: {}", message)
            }
            CheckError::Source(SourceError::Unavailable { message }) => format!(
                "Source unreachable, check connectivity to the staging server (VPN): {}",
                message
            ),
            CheckError::Reconcile(e) => format!("Internal error: {}", e),
        }
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, CheckError::Source(SourceError::Unavailable { .. }))
    }
}
