//! Transport used by the probe to reach a branch server.

use std::time::Duration;

use async_trait::async_trait;

/// Why a branch server could not be reached.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConnectivityError {
    #[error("branch {branch_id} has no derivable endpoint")]
    NoEndpoint { branch_id: String },

    #[error("{endpoint} did not answer within {}ms", .timeout.as_millis())]
    Timeout { endpoint: String, timeout: Duration },

    #[error("{endpoint}: {message}")]
    Io { endpoint: String, message: String },
}

/// Opens (and immediately drops) a connection to an endpoint.
#[async_trait]
pub trait ConnectivityBackend: Send + Sync {
    async fn dial(&self, endpoint: &str) -> Result<(), ConnectivityError>;
}

/// Plain TCP connect to the database port.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpDialBackend;

#[async_trait]
impl ConnectivityBackend for TcpDialBackend {
    async fn dial(&self, endpoint: &str) -> Result<(), ConnectivityError> {
        tokio::net::TcpStream::connect(endpoint)
            .await
            .map(drop)
            .map_err(|e| ConnectivityError::Io {
                endpoint: endpoint.to_string(),
                message: e.to_string(),
            })
    }
}
