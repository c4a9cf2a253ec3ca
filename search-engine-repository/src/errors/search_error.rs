//! Search error types.
//!
//! This module defines the error types that can occur while bringing an index
//! up and while indexing into or querying it.

use std::fmt;

use thiserror::Error;

use crate::types::{BulkWriteOutcome, ClientState};

/// Step of the close → settings → mapping → open → refresh sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigurationStep {
    Close,
    PutSettings,
    PutMapping,
    Open,
    Refresh,
}

impl fmt::Display for ConfigurationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConfigurationStep::Close => "close",
            ConfigurationStep::PutSettings => "put_settings",
            ConfigurationStep::PutMapping => "put_mapping",
            ConfigurationStep::Open => "open",
            ConfigurationStep::Refresh => "refresh",
        };
        f.write_str(name)
    }
}

/// Errors that can occur during search engine operations.
#[derive(Error, Debug)]
pub enum SearchError {
    /// The backend could not be reached while waiting for it to come up.
    #[error("Connection unavailable: {0}")]
    ConnectionUnavailable(String),

    /// The backend could not be reached, or did not answer in time, during a regular call.
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    /// The query uses a feature the backend cannot express.
    #[error("Unsupported query: {0}")]
    UnsupportedQueryError(String),

    /// The backend rejected or failed to execute a query.
    #[error("Query error: {0}")]
    QueryError(String),

    /// At least one item of a bulk write failed. Carries every item outcome.
    #[error(
        "Bulk index error: {} of {} items failed",
        .0.failed_count(),
        .0.items.len()
    )]
    BulkIndexError(BulkWriteOutcome),

    /// The backend rejected a bulk request as a whole.
    #[error("Bulk operation error: {0}")]
    BulkOperationError(String),

    /// A step of the index configuration sequence failed. The index may be left closed.
    #[error("Index configuration error at {step}: {message}")]
    IndexConfigurationError {
        step: ConfigurationStep,
        message: String,
    },

    /// Checking, creating or deleting the index failed.
    #[error("Index lifecycle error: {0}")]
    IndexLifecycleError(String),

    /// Failed to serialize a document for the backend.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Failed to parse a response from the backend.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Batch size exceeds configured maximum.
    #[error("Batch size {provided} exceeds maximum {max}")]
    BatchSizeExceeded { provided: usize, max: usize },

    /// The operation is not allowed in the client's current state.
    #[error("Cannot {operation} while client is {state}")]
    InvalidState {
        operation: &'static str,
        state: ClientState,
    },

    /// Waiting for the backend was cancelled by a shutdown.
    #[error("Operation cancelled")]
    Cancelled,

    /// Invalid client or backend configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl SearchError {
    /// Create a connection unavailable error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::ConnectionUnavailable(msg.into())
    }

    /// Create a backend unavailable error.
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::BackendUnavailable(msg.into())
    }

    /// Create an unsupported query error.
    pub fn unsupported_query(msg: impl Into<String>) -> Self {
        Self::UnsupportedQueryError(msg.into())
    }

    /// Create a query error.
    pub fn query(msg: impl Into<String>) -> Self {
        Self::QueryError(msg.into())
    }

    /// Create a bulk operation error.
    pub fn bulk_operation(msg: impl Into<String>) -> Self {
        Self::BulkOperationError(msg.into())
    }

    /// Create an index configuration error for the given step.
    pub fn configuration(step: ConfigurationStep, msg: impl Into<String>) -> Self {
        Self::IndexConfigurationError {
            step,
            message: msg.into(),
        }
    }

    /// Create an index lifecycle error.
    pub fn lifecycle(msg: impl Into<String>) -> Self {
        Self::IndexLifecycleError(msg.into())
    }

    /// Create a serialization error.
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::SerializationError(msg.into())
    }

    /// Create a parse error.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::ParseError(msg.into())
    }

    /// Create a batch size exceeded error.
    pub fn batch_size_exceeded(provided: usize, max: usize) -> Self {
        Self::BatchSizeExceeded { provided, max }
    }

    /// Create an invalid state error.
    pub fn invalid_state(operation: &'static str, state: ClientState) -> Self {
        Self::InvalidState { operation, state }
    }

    /// Create an invalid configuration error.
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// The per-item outcome of a failed bulk write, if this is one.
    pub fn bulk_outcome(&self) -> Option<&BulkWriteOutcome> {
        match self {
            Self::BulkIndexError(outcome) => Some(outcome),
            _ => None,
        }
    }

    /// Whether the failure came from not reaching the backend.
    pub fn is_connectivity(&self) -> bool {
        matches!(
            self,
            Self::ConnectionUnavailable(_) | Self::BackendUnavailable(_)
        )
    }
}
