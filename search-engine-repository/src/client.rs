//! Search engine client implementation.
//!
//! This module provides the facade application code uses to bring an index
//! up, write documents into it and query it back as typed results.

use std::marker::PhantomData;
use std::sync::{Arc, Mutex};

use search_engine_shared::{SearchEngineItem, SearchQuery, SearchResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, error, info, instrument, warn};

use crate::config::SearchEngineConfig;
use crate::errors::SearchError;
use crate::interfaces::{ConnectionObserver, QueryConverter, SearchBackend, TracingObserver};
use crate::lifecycle::{bounded, ConnectionGate, IndexLifecycleManager};
use crate::opensearch::OpenSearchQueryConverter;
use crate::types::{BulkOperation, ClientState, IndexConfiguration, IndexIdentity, QueryHit};

/// Typed client over a single index of a search backend.
///
/// The client must be initialized before it accepts writes or queries.
/// Initialization waits for the backend, creates the index if needed and
/// applies the configured settings and mapping. Calls made in the wrong
/// lifecycle state fail with [`SearchError::InvalidState`].
///
/// `T` is the document type: it is serialized when indexing and
/// deserialized from each hit's source when searching.
pub struct SearchEngineClient<T> {
    backend: Arc<dyn SearchBackend>,
    converter: Arc<dyn QueryConverter>,
    gate: ConnectionGate,
    lifecycle: IndexLifecycleManager,
    config: SearchEngineConfig,
    state: Mutex<ClientState>,
    shutdown: watch::Sender<bool>,
    _document: PhantomData<fn() -> T>,
}

/// Builder for [`SearchEngineClient`].
pub struct SearchEngineClientBuilder<T> {
    backend: Arc<dyn SearchBackend>,
    identity: IndexIdentity,
    configuration: IndexConfiguration,
    config: SearchEngineConfig,
    converter: Option<Arc<dyn QueryConverter>>,
    observer: Option<Arc<dyn ConnectionObserver>>,
    _document: PhantomData<fn() -> T>,
}

impl<T> SearchEngineClientBuilder<T> {
    /// Settings and mapping applied to the index during initialization.
    pub fn with_configuration(mut self, configuration: IndexConfiguration) -> Self {
        self.configuration = configuration;
        self
    }

    pub fn with_config(mut self, config: SearchEngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the OpenSearch query converter.
    pub fn with_converter(mut self, converter: Arc<dyn QueryConverter>) -> Self {
        self.converter = Some(converter);
        self
    }

    /// Receive connection attempts instead of logging them.
    pub fn with_observer(mut self, observer: Arc<dyn ConnectionObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn build(self) -> SearchEngineClient<T> {
        let converter = self
            .converter
            .unwrap_or_else(|| Arc::new(OpenSearchQueryConverter::default()));
        let observer = self
            .observer
            .unwrap_or_else(|| Arc::new(TracingObserver));

        let gate = ConnectionGate::new(self.backend.clone(), self.config.retry.clone(), observer);
        let lifecycle = IndexLifecycleManager::new(
            self.backend.clone(),
            self.identity,
            self.configuration,
            self.config.request_timeout,
        );
        let (shutdown, _) = watch::channel(false);

        SearchEngineClient {
            backend: self.backend,
            converter,
            gate,
            lifecycle,
            config: self.config,
            state: Mutex::new(ClientState::Uninitialized),
            shutdown,
            _document: PhantomData,
        }
    }
}

impl<T> SearchEngineClient<T> {
    /// Start building a client for `identity` on `backend`.
    pub fn builder(
        backend: Arc<dyn SearchBackend>,
        identity: IndexIdentity,
    ) -> SearchEngineClientBuilder<T> {
        SearchEngineClientBuilder {
            backend,
            identity,
            configuration: IndexConfiguration::default(),
            config: SearchEngineConfig::default(),
            converter: None,
            observer: None,
            _document: PhantomData,
        }
    }

    pub fn identity(&self) -> &IndexIdentity {
        self.lifecycle.identity()
    }

    pub fn config(&self) -> &SearchEngineConfig {
        &self.config
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ClientState {
        *self.lock_state()
    }

    /// Wait for the backend and set up the index.
    ///
    /// Allowed from `Uninitialized` and `Failed`. Probing continues until the
    /// backend answers, the retry policy gives up, or [`shutdown`](Self::shutdown)
    /// is called. Any failure leaves the client `Failed`.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The index exists and carries its configuration
    /// * `Err(SearchError::Cancelled)` - If the client was shut down while waiting
    /// * `Err(SearchError)` - If probing, creation or configuration failed
    #[instrument(skip(self), fields(index = %self.identity().index_name))]
    pub async fn initialize(&self) -> Result<(), SearchError> {
        self.begin(
            "initialize",
            &[ClientState::Uninitialized, ClientState::Failed],
            ClientState::Initializing,
        )?;

        let result = self.run_initialization().await;
        self.finish("initialize", &result);
        result
    }

    async fn run_initialization(&self) -> Result<(), SearchError> {
        let mut shutdown = self.shutdown.subscribe();
        let attempts = self.gate.wait_for_connection(&mut shutdown).await?;
        debug!(attempts = attempts, "Backend reachable");

        self.set_state(ClientState::ConfiguringIndex);
        self.lifecycle.ensure_index().await?;
        self.lifecycle.apply_configuration().await
    }

    /// Delete every document by dropping and recreating the index.
    ///
    /// Settings and mapping are applied again, so the index keeps its schema.
    #[instrument(skip(self), fields(index = %self.identity().index_name))]
    pub async fn drop_index(&self) -> Result<(), SearchError> {
        self.begin("drop_index", &[ClientState::Ready], ClientState::Reinitializing)?;

        let result = self.lifecycle.drop_and_recreate().await;
        self.finish("drop_index", &result);
        result
    }

    /// Delete documents by id in a single bulk request.
    ///
    /// Ids that are not stored are reported with status 404 but do not fail
    /// the call.
    #[instrument(skip(self, ids), fields(index = %self.identity().index_name, count = ids.len()))]
    pub async fn remove(&self, ids: Vec<String>) -> Result<(), SearchError> {
        self.require_ready("remove")?;
        if ids.is_empty() {
            return Ok(());
        }
        self.validate_batch_size(ids.len())?;

        let operations: Vec<BulkOperation> = ids
            .into_iter()
            .map(|id| BulkOperation::Delete { id })
            .collect();
        self.write(&operations).await
    }

    /// Run a single health probe against the backend.
    pub async fn health_check(&self) -> bool {
        match self.gate.probe().await {
            Ok(()) => true,
            Err(e) => {
                debug!(error = %e, "Health check failed");
                false
            }
        }
    }

    /// Cancel a pending initialization. The client cannot be initialized
    /// again afterwards.
    pub fn shutdown(&self) {
        if !self.shutdown.send_replace(true) {
            info!(index = %self.identity().index_name, "Search engine client shut down");
        }
    }

    async fn write(&self, operations: &[BulkOperation]) -> Result<(), SearchError> {
        let identity = self.identity();
        let outcome = bounded(
            self.config.request_timeout,
            self.backend
                .bulk_write(&identity.index_name, &identity.schema_name, operations),
        )
        .await?;

        if outcome.errors {
            warn!(
                failed = outcome.failed_count(),
                total = outcome.items.len(),
                "Bulk write had failures"
            );
            return Err(SearchError::BulkIndexError(outcome));
        }

        debug!(took = outcome.took, count = outcome.items.len(), "Bulk write completed");
        Ok(())
    }

    fn validate_batch_size(&self, size: usize) -> Result<(), SearchError> {
        if let Some(max) = self.config.max_batch_size {
            if size > max {
                return Err(SearchError::batch_size_exceeded(size, max));
            }
        }
        Ok(())
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, ClientState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn set_state(&self, state: ClientState) {
        *self.lock_state() = state;
    }

    /// Move to `next` if the current state is one of `allowed`.
    fn begin(
        &self,
        operation: &'static str,
        allowed: &[ClientState],
        next: ClientState,
    ) -> Result<(), SearchError> {
        let mut state = self.lock_state();
        if !allowed.contains(&*state) {
            return Err(SearchError::invalid_state(operation, *state));
        }
        *state = next;
        Ok(())
    }

    fn finish(&self, operation: &'static str, result: &Result<(), SearchError>) {
        match result {
            Ok(()) => {
                self.set_state(ClientState::Ready);
                info!(operation = operation, "Search engine client ready");
            }
            Err(e) => {
                self.set_state(ClientState::Failed);
                error!(operation = operation, error = %e, "Search engine client failed");
            }
        }
    }

    fn require_ready(&self, operation: &'static str) -> Result<(), SearchError> {
        let state = self.state();
        if state != ClientState::Ready {
            return Err(SearchError::invalid_state(operation, state));
        }
        Ok(())
    }
}

impl<T: Serialize> SearchEngineClient<T> {
    /// Upsert documents in a single bulk request.
    ///
    /// An empty batch sends nothing. If any item fails, the whole call fails
    /// with [`SearchError::BulkIndexError`] carrying the outcome of every
    /// item, so callers can tell which documents were stored.
    ///
    /// # Arguments
    ///
    /// * `items` - Documents keyed by their id
    ///
    /// # Returns
    ///
    /// * `Ok(())` - Every item was stored
    /// * `Err(SearchError::BatchSizeExceeded)` - If the batch is over the configured limit
    /// * `Err(SearchError::BulkIndexError)` - If at least one item was rejected
    #[instrument(skip(self, items), fields(index = %self.identity().index_name, count = items.len()))]
    pub async fn index(&self, items: Vec<SearchEngineItem<T>>) -> Result<(), SearchError> {
        self.require_ready("index")?;
        if items.is_empty() {
            return Ok(());
        }
        self.validate_batch_size(items.len())?;

        let operations = items
            .into_iter()
            .map(|item| {
                let document = serde_json::to_value(&item.document).map_err(|e| {
                    SearchError::serialization(format!("document {}: {}", item.id, e))
                })?;
                Ok(BulkOperation::Index {
                    id: item.id,
                    document,
                })
            })
            .collect::<Result<Vec<_>, SearchError>>()?;

        self.write(&operations).await
    }
}

impl<T: DeserializeOwned> SearchEngineClient<T> {
    /// Run a query and decode each hit's source as `T`.
    ///
    /// Items keep the backend's order. `total` counts every match, which can
    /// exceed the number of returned items when the query is paginated.
    #[instrument(skip(self, query), fields(index = %self.identity().index_name))]
    pub async fn search(&self, query: &SearchQuery) -> Result<SearchResult<T>, SearchError> {
        self.require_ready("search")?;

        let identity = self.identity();
        let body = self
            .converter
            .convert(query, &identity.index_name, &identity.schema_name)?;

        let response = bounded(
            self.config.request_timeout,
            self.backend
                .query(&identity.index_name, &identity.schema_name, &body),
        )
        .await?;

        let items = response
            .hits
            .into_iter()
            .map(|QueryHit { id, source, .. }| {
                serde_json::from_value(source)
                    .map_err(|e| SearchError::parse(format!("hit {}: {}", id, e)))
            })
            .collect::<Result<Vec<T>, SearchError>>()?;

        debug!(total = response.total, took = response.took, returned = items.len(), "Search completed");

        Ok(SearchResult {
            total: response.total,
            milliseconds: response.took,
            items,
        })
    }
}
