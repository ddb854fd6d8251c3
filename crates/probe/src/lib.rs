//! branchwatch-probe: is a branch's own database server reachable?
//!
//! Used to annotate branches with missed backups: a branch whose server is
//! down needs a different response from one whose backup job failed.

pub mod backend;
pub mod endpoint;
pub mod probe;

pub use backend::{ConnectivityBackend, ConnectivityError, TcpDialBackend};
pub use endpoint::{EndpointTemplate, DEFAULT_HOST_SUFFIX, DEFAULT_NETWORK_PREFIX, DEFAULT_PORT};
pub use probe::{ConnectivityProbe, DEFAULT_CONCURRENCY, DEFAULT_TIMEOUT};
