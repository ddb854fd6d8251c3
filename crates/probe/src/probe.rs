//! Liveness checks against branch database servers.
//!
//! A probe is one dial bounded by a timeout, never retried. Every failure
//! (timeout, refusal, unresolvable host, non-numeric branch id) reads as
//! "unreachable"; nothing propagates to the caller.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use branchwatch_core::{BranchId, ConnectivityOutcome};
use tokio::sync::Semaphore;

use crate::backend::{ConnectivityBackend, ConnectivityError, TcpDialBackend};
use crate::endpoint::EndpointTemplate;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_CONCURRENCY: usize = 8;

#[derive(Clone)]
pub struct ConnectivityProbe {
    backend: Arc<dyn ConnectivityBackend>,
    template: EndpointTemplate,
    timeout: Duration,
    concurrency: usize,
}

impl std::fmt::Debug for ConnectivityProbe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectivityProbe")
            .field("template", &self.template)
            .field("timeout", &self.timeout)
            .field("concurrency", &self.concurrency)
            .finish_non_exhaustive()
    }
}

impl Default for ConnectivityProbe {
    fn default() -> Self {
        ConnectivityProbe::new(Arc::new(TcpDialBackend))
    }
}

impl ConnectivityProbe {
    pub fn new(backend: Arc<dyn ConnectivityBackend>) -> Self {
        ConnectivityProbe {
            backend,
            template: EndpointTemplate::default(),
            timeout: DEFAULT_TIMEOUT,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    pub fn with_template(mut self, template: EndpointTemplate) -> Self {
        self.template = template;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Maximum probes in flight during [`probe_all`](Self::probe_all).
    /// Zero is treated as one.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn template(&self) -> &EndpointTemplate {
        &self.template
    }

    /// Whether the branch's server accepts a connection.
    pub async fn probe(&self, branch_id: &BranchId) -> bool {
        self.check(branch_id).await.reachable
    }

    /// Probe one branch and describe the result.
    pub async fn check(&self, branch_id: &BranchId) -> ConnectivityOutcome {
        let endpoint = self.template.endpoint_for(branch_id);
        let result = match &endpoint {
            Some(endpoint) => self.dial(endpoint).await,
            None => Err(ConnectivityError::NoEndpoint {
                branch_id: branch_id.to_string(),
            }),
        };
        match &result {
            Ok(()) => tracing::debug!(branch = %branch_id, "branch server reachable"),
            Err(e) => tracing::info!(branch = %branch_id, error = %e, "branch server is down"),
        }
        ConnectivityOutcome {
            branch_id: branch_id.clone(),
            endpoint,
            reachable: result.is_ok(),
        }
    }

    async fn dial(&self, endpoint: &str) -> Result<(), ConnectivityError> {
        match tokio::time::timeout(self.timeout, self.backend.dial(endpoint)).await {
            Ok(result) => result,
            Err(_) => Err(ConnectivityError::Timeout {
                endpoint: endpoint.to_string(),
                timeout: self.timeout,
            }),
        }
    }

    /// Probe many branches in parallel, at most `concurrency` at a time.
    pub async fn probe_all<I>(&self, ids: I) -> BTreeMap<BranchId, ConnectivityOutcome>
    where
        I: IntoIterator<Item = BranchId>,
    {
        self.probe_all_with(ids, |_, _, _| {}).await
    }

    /// Like [`probe_all`](Self::probe_all), calling `on_result(done, total,
    /// outcome)` as each probe finishes.
    pub async fn probe_all_with<I, F>(
        &self,
        ids: I,
        mut on_result: F,
    ) -> BTreeMap<BranchId, ConnectivityOutcome>
    where
        I: IntoIterator<Item = BranchId>,
        F: FnMut(usize, usize, &ConnectivityOutcome),
    {
        let mut results: BTreeMap<BranchId, ConnectivityOutcome> = BTreeMap::new();
        for id in ids {
            let endpoint = self.template.endpoint_for(&id);
            results.insert(
                id.clone(),
                ConnectivityOutcome {
                    branch_id: id,
                    endpoint,
                    reachable: false,
                },
            );
        }
        let total = results.len();
        if total == 0 {
            return results;
        }

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut join_set = tokio::task::JoinSet::new();
        for id in results.keys().cloned() {
            let probe = self.clone();
            let semaphore = Arc::clone(&semaphore);
            join_set.spawn(async move {
                // The semaphore is never closed.
                let _permit = semaphore.acquire_owned().await.ok();
                probe.check(&id).await
            });
        }

        let mut done = 0;
        while let Some(joined) = join_set.join_next().await {
            done += 1;
            match joined {
                Ok(outcome) => {
                    on_result(done, total, &outcome);
                    results.insert(outcome.branch_id.clone(), outcome);
                }
                Err(e) => tracing::error!(error = %e, "probe task failed"),
            }
        }

        let reachable = results.values().filter(|o| o.reachable).count();
        tracing::info!(total, reachable, "connectivity probes finished");
        results
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct UpWhen(fn(&str) -> bool);

    #[async_trait]
    impl ConnectivityBackend for UpWhen {
        async fn dial(&self, endpoint: &str) -> Result<(), ConnectivityError> {
            if (self.0)(endpoint) {
                Ok(())
            } else {
                Err(ConnectivityError::Io {
                    endpoint: endpoint.to_string(),
                    message: "connection refused".to_string(),
                })
            }
        }
    }

    #[tokio::test]
    async fn probe_uses_templated_endpoint() {
        let probe = ConnectivityProbe::new(Arc::new(UpWhen(|e| e == "10.20.12.10:1433")));
        assert!(probe.probe(&BranchId::new("12")).await);
        assert!(!probe.probe(&BranchId::new("13")).await);
    }

    #[tokio::test]
    async fn non_numeric_branch_is_unreachable_without_dialing() {
        let probe = ConnectivityProbe::new(Arc::new(UpWhen(|_| true)));
        let outcome = probe.check(&BranchId::new("HQ")).await;
        assert!(!outcome.reachable);
        assert_eq!(outcome.endpoint, None);
    }

    #[tokio::test]
    async fn zero_concurrency_is_clamped() {
        let probe = ConnectivityProbe::new(Arc::new(UpWhen(|_| true))).with_concurrency(0);
        let results = probe.probe_all([BranchId::new("1"), BranchId::new("2")]).await;
        assert!(results.values().all(|o| o.reachable));
    }
}
