//! Branch server addressing.

use branchwatch_core::BranchId;
use serde::{Deserialize, Serialize};

pub const DEFAULT_NETWORK_PREFIX: &str = "10.20.";
pub const DEFAULT_HOST_SUFFIX: &str = ".10";
pub const DEFAULT_PORT: u16 = 1433;

/// Derives a branch's database endpoint from its number:
/// `network_prefix + number + host_suffix : port`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointTemplate {
    pub network_prefix: String,
    pub host_suffix: String,
    pub port: u16,
}

impl Default for EndpointTemplate {
    fn default() -> Self {
        EndpointTemplate {
            network_prefix: DEFAULT_NETWORK_PREFIX.to_string(),
            host_suffix: DEFAULT_HOST_SUFFIX.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl EndpointTemplate {
    pub fn host_for(&self, branch_id: &BranchId) -> Option<String> {
        let number = branch_id.number()?;
        Some(format!("{}{}{}", self.network_prefix, number, self.host_suffix))
    }

    /// `host:port` for a numeric branch id; `None` otherwise.
    pub fn endpoint_for(&self, branch_id: &BranchId) -> Option<String> {
        self.host_for(branch_id)
            .map(|host| format!("{}:{}", host, self.port))
    }
}
