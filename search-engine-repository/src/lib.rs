//! # Search Engine Repository
//!
//! This crate provides a typed client over one index of a search backend.
//! It includes the backend capability traits, the connection gate that waits
//! for a backend to come up, index lifecycle management, and a concrete
//! implementation for OpenSearch.

pub mod config;
pub mod errors;
pub mod interfaces;
pub mod lifecycle;
pub mod opensearch;
pub mod types;

mod client;

#[cfg(test)]
pub(crate) mod test_support;

pub use client::{SearchEngineClient, SearchEngineClientBuilder};
pub use config::{RetryPolicy, SearchEngineConfig};
pub use errors::{ConfigurationStep, SearchError};
pub use interfaces::{ConnectionObserver, QueryConverter, SearchBackend, TracingObserver};
pub use opensearch::{OpenSearchBackend, OpenSearchQueryConverter};
pub use types::{
    BulkItemOutcome, BulkOperation, BulkWriteOutcome, ClientState, IndexConfiguration,
    IndexIdentity, QueryHit, QueryResponse,
};

pub use search_engine_shared::{
    Filter, RangeBounds, SearchEngineItem, SearchQuery, SearchResult, SortField, SortOrder,
    TextOperator, TextQuery,
};
