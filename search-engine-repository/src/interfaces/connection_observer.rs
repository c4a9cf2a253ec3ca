//! Observer for connection gate events.

use std::time::Duration;

use tracing::{info, warn};

use crate::errors::SearchError;

/// Receives readiness events from the connection gate.
pub trait ConnectionObserver: Send + Sync {
    /// A probe failed. `retry_in` is `None` when no further probe follows.
    fn on_attempt_failed(&self, attempt: u32, error: &SearchError, retry_in: Option<Duration>);

    /// The backend answered after `attempts` probes.
    fn on_connected(&self, attempts: u32);
}

/// Reports connection events through `tracing`.
#[derive(Debug, Clone, Default)]
pub struct TracingObserver;

impl ConnectionObserver for TracingObserver {
    fn on_attempt_failed(&self, attempt: u32, error: &SearchError, retry_in: Option<Duration>) {
        match retry_in {
            Some(delay) => warn!(
                attempt = attempt,
                retry_in_ms = delay.as_millis() as u64,
                error = %error,
                "Search backend not reachable, retrying"
            ),
            None => warn!(
                attempt = attempt,
                error = %error,
                "Search backend not reachable, giving up"
            ),
        }
    }

    fn on_connected(&self, attempts: u32) {
        info!(attempts = attempts, "Search backend reachable");
    }
}
