//! Query converter trait definition.

use serde_json::Value;

use crate::errors::SearchError;
use search_engine_shared::SearchQuery;

/// Translates a backend-neutral [`SearchQuery`] into the backend's native query.
///
/// Implementations are pure: the same input always yields the same output and
/// nothing is sent anywhere. A query feature without a backend equivalent must
/// fail with [`SearchError::UnsupportedQueryError`] instead of being dropped.
pub trait QueryConverter: Send + Sync {
    /// Convert `query` for execution against `index_name` / `schema_name`.
    fn convert(
        &self,
        query: &SearchQuery,
        index_name: &str,
        schema_name: &str,
    ) -> Result<Value, SearchError>;
}
