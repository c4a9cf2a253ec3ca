//! Bringing an index to a ready state.
//!
//! [`ConnectionGate`] waits for the backend to answer, [`IndexLifecycleManager`]
//! creates the index and applies its configuration.

mod connection_gate;
mod index_manager;

pub use connection_gate::ConnectionGate;
pub use index_manager::IndexLifecycleManager;

use std::future::Future;
use std::time::Duration;

use crate::errors::SearchError;

/// Run a backend call under `timeout`. Running out of time counts as the
/// backend being unavailable.
pub(crate) async fn bounded<F, T>(timeout: Duration, call: F) -> Result<T, SearchError>
where
    F: Future<Output = Result<T, SearchError>>,
{
    tokio::time::timeout(timeout, call).await.unwrap_or_else(|_| {
        Err(SearchError::backend(format!(
            "request timed out after {}ms",
            timeout.as_millis()
        )))
    })
}
