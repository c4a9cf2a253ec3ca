//! Configuration types for the SearchEngineClient.

use std::time::Duration;

/// Default timeout of a single readiness probe.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_millis(250);

/// Default pause between two readiness probes.
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_millis(2000);

/// Default timeout applied to every backend call other than the probe.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// How the connection gate probes a backend that is not reachable yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Timeout of one health probe.
    pub probe_timeout: Duration,
    /// Fixed wait between two failed probes.
    pub retry_interval: Duration,
    /// Give up after this many failed probes. `None` keeps probing until
    /// the backend answers or the client is shut down.
    pub max_attempts: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            retry_interval: DEFAULT_RETRY_INTERVAL,
            max_attempts: None,
        }
    }
}

impl RetryPolicy {
    /// Probe until the backend answers or the client is shut down.
    pub fn unbounded(probe_timeout: Duration, retry_interval: Duration) -> Self {
        Self {
            probe_timeout,
            retry_interval,
            max_attempts: None,
        }
    }

    /// Stop after `max_attempts` failed probes.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    /// Whether another probe is allowed after `failed_attempts` failures.
    pub fn allows_retry(&self, failed_attempts: u32) -> bool {
        self.max_attempts.map_or(true, |max| failed_attempts < max)
    }
}

/// Configuration for the SearchEngineClient.
#[derive(Debug, Clone)]
pub struct SearchEngineConfig {
    /// Timeout for bulk writes, queries and index lifecycle calls.
    pub request_timeout: Duration,
    /// Maximum number of documents allowed in a single bulk write.
    /// Set to None to disable the limit (not recommended for production).
    pub max_batch_size: Option<usize>,
    /// Readiness probing during initialization.
    pub retry: RetryPolicy,
}

impl Default for SearchEngineConfig {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            max_batch_size: Some(1000),
            retry: RetryPolicy::default(),
        }
    }
}

impl SearchEngineConfig {
    /// Set the batch size limit.
    pub fn with_max_batch_size(mut self, max_batch_size: usize) -> Self {
        self.max_batch_size = Some(max_batch_size);
        self
    }

    /// Set the timeout for regular backend calls.
    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    /// Set the readiness retry policy.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}
