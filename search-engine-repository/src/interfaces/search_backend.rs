//! Search backend trait definition.
//!
//! This module defines the narrow capability interface the core needs from a
//! search engine, allowing for different backend implementations (OpenSearch,
//! Elasticsearch, in-memory test doubles, etc.).

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::SearchError;
use crate::types::{BulkOperation, BulkWriteOutcome, QueryResponse};

/// Abstracts the underlying search engine (OpenSearch, Elasticsearch, etc.).
///
/// Implementations are injected into `SearchEngineClient` and shared by all of
/// its operations, so they must be safe for concurrent use. Connection pooling
/// is the implementation's concern.
///
/// Connectivity failures must be reported as
/// [`SearchError::BackendUnavailable`] so callers can tell them apart from
/// rejected requests.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Lightweight health probe.
    ///
    /// # Arguments
    ///
    /// * `timeout` - How long the probe may take before it counts as failed
    ///
    /// # Returns
    ///
    /// * `Ok(())` - If the backend answered in time
    /// * `Err(SearchError)` - If it did not
    async fn ping(&self, timeout: Duration) -> Result<(), SearchError>;

    /// Check whether an index exists.
    async fn index_exists(&self, name: &str) -> Result<bool, SearchError>;

    /// Create an index with default settings.
    async fn create_index(&self, name: &str) -> Result<(), SearchError>;

    /// Close an index. Reads and writes are rejected until it is reopened.
    async fn close_index(&self, name: &str) -> Result<(), SearchError>;

    /// Reopen a closed index.
    async fn open_index(&self, name: &str) -> Result<(), SearchError>;

    /// Make recent writes and schema changes visible to queries.
    async fn refresh_index(&self, name: &str) -> Result<(), SearchError>;

    /// Apply index-level settings. Most backends require the index to be closed.
    async fn put_index_settings(&self, name: &str, settings: &Value) -> Result<(), SearchError>;

    /// Apply the field mapping of `schema` to the index.
    async fn put_index_mapping(
        &self,
        name: &str,
        schema: &str,
        mapping: &Value,
    ) -> Result<(), SearchError>;

    /// Send a batch of operations in a single request.
    ///
    /// # Arguments
    ///
    /// * `index` - Target index
    /// * `schema` - Schema the documents conform to
    /// * `operations` - Operations in request order
    ///
    /// # Returns
    ///
    /// * `Ok(BulkWriteOutcome)` - The per-item outcomes, including failed items
    /// * `Err(SearchError)` - If the request as a whole failed
    async fn bulk_write(
        &self,
        index: &str,
        schema: &str,
        operations: &[BulkOperation],
    ) -> Result<BulkWriteOutcome, SearchError>;

    /// Execute a native query produced by the matching `QueryConverter`.
    async fn query(
        &self,
        index: &str,
        schema: &str,
        query: &Value,
    ) -> Result<QueryResponse, SearchError>;

    /// Delete an index and every document in it. A missing index is not an error.
    async fn delete_index(&self, name: &str) -> Result<(), SearchError>;
}
