//! Readiness probing for a backend that may not be reachable yet.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, instrument};

use crate::config::RetryPolicy;
use crate::errors::SearchError;
use crate::interfaces::{ConnectionObserver, SearchBackend};

/// Blocks initialization until the backend answers a health probe.
///
/// Each probe is bounded by the policy's probe timeout. Failed probes are
/// followed by a fixed wait. The loop ends when a probe succeeds, when the
/// policy's attempt limit is reached, or when the shutdown signal fires.
pub struct ConnectionGate {
    backend: Arc<dyn SearchBackend>,
    policy: RetryPolicy,
    observer: Arc<dyn ConnectionObserver>,
}

impl ConnectionGate {
    pub fn new(
        backend: Arc<dyn SearchBackend>,
        policy: RetryPolicy,
        observer: Arc<dyn ConnectionObserver>,
    ) -> Self {
        Self {
            backend,
            policy,
            observer,
        }
    }

    /// Run a single health probe.
    pub async fn probe(&self) -> Result<(), SearchError> {
        let timeout = self.policy.probe_timeout;
        match tokio::time::timeout(timeout, self.backend.ping(timeout)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(SearchError::connection(e.to_string())),
            Err(_) => Err(SearchError::connection(format!(
                "health probe timed out after {}ms",
                timeout.as_millis()
            ))),
        }
    }

    /// Probe until the backend answers.
    ///
    /// # Arguments
    ///
    /// * `shutdown` - Cancels the wait once it holds `true`
    ///
    /// # Returns
    ///
    /// * `Ok(attempts)` - The number of probes it took
    /// * `Err(SearchError::Cancelled)` - If shutdown was signalled
    /// * `Err(SearchError::ConnectionUnavailable)` - If the attempt limit was reached
    #[instrument(skip(self, shutdown))]
    pub async fn wait_for_connection(
        &self,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<u32, SearchError> {
        let mut attempt: u32 = 0;

        loop {
            if *shutdown.borrow() {
                return Err(SearchError::Cancelled);
            }
            attempt += 1;

            let probe = tokio::select! {
                result = self.probe() => result,
                _ = cancelled(shutdown) => return Err(SearchError::Cancelled),
            };

            let error = match probe {
                Ok(()) => {
                    self.observer.on_connected(attempt);
                    return Ok(attempt);
                }
                Err(e) => e,
            };

            if !self.policy.allows_retry(attempt) {
                self.observer.on_attempt_failed(attempt, &error, None);
                return Err(SearchError::connection(format!(
                    "backend not reachable after {} attempts: {}",
                    attempt, error
                )));
            }

            let interval = self.policy.retry_interval;
            self.observer
                .on_attempt_failed(attempt, &error, Some(interval));

            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = cancelled(shutdown) => {
                    debug!(attempt = attempt, "Connection wait cancelled");
                    return Err(SearchError::Cancelled);
                }
            }
        }
    }
}

/// Resolves once the shutdown signal holds `true`. Never resolves if the
/// sending side is gone, since nobody can cancel anymore.
async fn cancelled(shutdown: &mut watch::Receiver<bool>) {
    let signalled = shutdown.wait_for(|stop| *stop).await.is_ok();
    if !signalled {
        std::future::pending::<()>().await;
    }
}
