//! Request and response types exchanged with a search backend.

use std::fmt;

use serde_json::Value;

/// The index a client is bound to for its whole lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexIdentity {
    /// Name of the index in the backend.
    pub index_name: String,
    /// Name of the schema (document type) the mapping is scoped to.
    pub schema_name: String,
}

impl IndexIdentity {
    pub fn new(index_name: impl Into<String>, schema_name: impl Into<String>) -> Self {
        Self {
            index_name: index_name.into(),
            schema_name: schema_name.into(),
        }
    }
}

/// Custom settings and mapping applied to the index during initialization.
///
/// Supplied once when the client is built and never changed afterwards; a
/// different configuration needs a new client and usually a new index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexConfiguration {
    /// Index-level settings (analyzers, replicas, ...).
    pub settings: Option<Value>,
    /// Field mapping for the schema.
    pub mapping: Option<Value>,
}

impl IndexConfiguration {
    pub fn new(settings: Option<Value>, mapping: Option<Value>) -> Self {
        Self { settings, mapping }
    }

    pub fn with_settings(mut self, settings: Value) -> Self {
        self.settings = Some(settings);
        self
    }

    pub fn with_mapping(mut self, mapping: Value) -> Self {
        self.mapping = Some(mapping);
        self
    }

    /// The settings, when they carry any content.
    pub fn effective_settings(&self) -> Option<&Value> {
        self.settings.as_ref().filter(|v| has_content(v))
    }

    /// The mapping, when it carries any content.
    pub fn effective_mapping(&self) -> Option<&Value> {
        self.mapping.as_ref().filter(|v| has_content(v))
    }

    /// True when there is nothing to apply.
    pub fn is_empty(&self) -> bool {
        self.effective_settings().is_none() && self.effective_mapping().is_none()
    }
}

fn has_content(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Object(map) => !map.is_empty(),
        _ => true,
    }
}

/// A single operation inside a bulk write.
#[derive(Debug, Clone, PartialEq)]
pub enum BulkOperation {
    /// Create or replace the document stored under `id`.
    Index { id: String, document: Value },
    /// Remove the document stored under `id`.
    Delete { id: String },
}

impl BulkOperation {
    pub fn id(&self) -> &str {
        match self {
            BulkOperation::Index { id, .. } | BulkOperation::Delete { id } => id,
        }
    }
}

/// Outcome of one operation of a bulk write.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkItemOutcome {
    /// Zero-based position of the operation in the request.
    pub position: usize,
    /// Document identifier.
    pub id: String,
    /// Status code the backend reported for this item.
    pub status: u16,
    /// Failure reason, when the item failed.
    pub error: Option<String>,
}

impl BulkItemOutcome {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Aggregate result of a bulk write.
///
/// `errors` is the backend's own flag that at least one item failed; the
/// per-item outcomes are kept in request order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BulkWriteOutcome {
    pub errors: bool,
    /// Backend-reported duration in milliseconds.
    pub took: u64,
    pub items: Vec<BulkItemOutcome>,
}

impl BulkWriteOutcome {
    /// The items that failed.
    pub fn failed(&self) -> impl Iterator<Item = &BulkItemOutcome> {
        self.items.iter().filter(|item| !item.is_success())
    }

    pub fn failed_count(&self) -> usize {
        self.failed().count()
    }

    pub fn succeeded_count(&self) -> usize {
        self.items.len() - self.failed_count()
    }
}

/// One document returned by a backend query.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryHit {
    pub id: String,
    pub score: Option<f64>,
    /// The stored document.
    pub source: Value,
}

/// Raw response of a backend query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResponse {
    /// Total number of matches.
    pub total: u64,
    /// Backend-reported duration in milliseconds.
    pub took: u64,
    /// Returned hits in backend order.
    pub hits: Vec<QueryHit>,
}

/// Lifecycle state of a [`SearchEngineClient`](crate::SearchEngineClient).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    Uninitialized,
    /// Waiting for the backend to become reachable.
    Initializing,
    /// Creating the index and applying settings and mapping.
    ConfiguringIndex,
    Ready,
    /// Dropping and recreating the index.
    Reinitializing,
    /// The last initialization failed or was cancelled.
    Failed,
}

impl fmt::Display for ClientState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ClientState::Uninitialized => "uninitialized",
            ClientState::Initializing => "initializing",
            ClientState::ConfiguringIndex => "configuring_index",
            ClientState::Ready => "ready",
            ClientState::Reinitializing => "reinitializing",
            ClientState::Failed => "failed",
        };
        f.write_str(name)
    }
}
