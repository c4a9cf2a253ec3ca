//! OpenSearch client implementation.
//!
//! This module provides the concrete implementation of `SearchBackend`
//! using the OpenSearch Rust client.

use std::time::Duration;

use async_trait::async_trait;
use opensearch::{
    http::{
        request::JsonBody,
        response::Response,
        transport::{SingleNodeConnectionPool, TransportBuilder},
        StatusCode,
    },
    indices::{
        IndicesCloseParts, IndicesCreateParts, IndicesDeleteParts, IndicesExistsParts,
        IndicesOpenParts, IndicesPutMappingParts, IndicesPutSettingsParts, IndicesRefreshParts,
    },
    BulkParts, OpenSearch, SearchParts,
};
use serde_json::{json, Value};
use tracing::{debug, error, info, instrument};
use url::Url;

use crate::errors::SearchError;
use crate::interfaces::SearchBackend;
use crate::types::{BulkItemOutcome, BulkOperation, BulkWriteOutcome, QueryHit, QueryResponse};

/// OpenSearch backend.
///
/// Talks to a single OpenSearch node through the official client. Every
/// request carries the configured timeout.
///
/// # Example
///
/// ```ignore
/// let backend = OpenSearchBackend::new("http://localhost:9200", Duration::from_secs(30))?;
/// let client: SearchEngineClient<Article> = SearchEngineClient::builder(
///     Arc::new(backend),
///     IndexIdentity::new("articles", "article"),
/// )
/// .build();
/// client.initialize().await?;
/// ```
pub struct OpenSearchBackend {
    client: OpenSearch,
}

impl OpenSearchBackend {
    /// Create a new OpenSearch backend for the specified URL.
    ///
    /// No request is sent; reachability is checked by the connection gate.
    ///
    /// # Arguments
    ///
    /// * `url` - The OpenSearch server URL (e.g., "http://localhost:9200")
    /// * `request_timeout` - Timeout applied to every request
    ///
    /// # Returns
    ///
    /// * `Ok(OpenSearchBackend)` - A new backend instance
    /// * `Err(SearchError)` - If the URL is invalid or transport setup fails
    pub fn new(url: &str, request_timeout: Duration) -> Result<Self, SearchError> {
        let parsed_url = Url::parse(url).map_err(|e| SearchError::invalid_config(e.to_string()))?;

        let conn_pool = SingleNodeConnectionPool::new(parsed_url);
        let transport = TransportBuilder::new(conn_pool)
            .disable_proxy()
            .timeout(request_timeout)
            .build()
            .map_err(|e| SearchError::invalid_config(e.to_string()))?;

        let client = OpenSearch::new(transport);

        info!(
            url = %url,
            request_timeout_ms = request_timeout.as_millis() as u64,
            "Created OpenSearch client"
        );

        Ok(Self { client })
    }

    /// Fail with the response body when the status is not a success.
    ///
    /// Failures that are not the backend's fault are reported through
    /// `rejected`.
    async fn check(
        response: Response,
        operation: &str,
        rejected: fn(String) -> SearchError,
    ) -> Result<Response, SearchError> {
        let status = response.status_code();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        error!(operation = operation, status = %status, body = %body, "OpenSearch request failed");
        let message = format!("{} failed with status {}: {}", operation, status, body);
        Err(failure_error(status, message, rejected))
    }
}

/// Overload and server errors count as the backend being unavailable.
fn failure_error(
    status: StatusCode,
    message: String,
    rejected: fn(String) -> SearchError,
) -> SearchError {
    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        SearchError::backend(message)
    } else {
        rejected(message)
    }
}

fn transport_error(error: opensearch::Error) -> SearchError {
    SearchError::backend(error.to_string())
}

#[async_trait]
impl SearchBackend for OpenSearchBackend {
    async fn ping(&self, timeout: Duration) -> Result<(), SearchError> {
        let response = self
            .client
            .ping()
            .request_timeout(timeout)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status_code();
        if !status.is_success() {
            return Err(SearchError::backend(format!(
                "ping returned status {}",
                status
            )));
        }
        Ok(())
    }

    async fn index_exists(&self, name: &str) -> Result<bool, SearchError> {
        let response = self
            .client
            .indices()
            .exists(IndicesExistsParts::Index(&[name]))
            .send()
            .await
            .map_err(transport_error)?;

        match response.status_code() {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            _ => Self::check(response, "index exists", SearchError::IndexLifecycleError)
                .await
                .map(|_| true),
        }
    }

    #[instrument(skip(self))]
    async fn create_index(&self, name: &str) -> Result<(), SearchError> {
        let response = self
            .client
            .indices()
            .create(IndicesCreateParts::Index(name))
            .send()
            .await
            .map_err(transport_error)?;

        if response.status_code() == StatusCode::BAD_REQUEST {
            let body = response.text().await.unwrap_or_default();
            // Lost a creation race against another client
            if body.contains("resource_already_exists_exception") {
                debug!("Index created concurrently");
                return Ok(());
            }
            return Err(SearchError::lifecycle(format!(
                "create index failed with status 400: {}",
                body
            )));
        }

        Self::check(response, "create index", SearchError::IndexLifecycleError).await?;
        Ok(())
    }

    async fn close_index(&self, name: &str) -> Result<(), SearchError> {
        let response = self
            .client
            .indices()
            .close(IndicesCloseParts::Index(&[name]))
            .send()
            .await
            .map_err(transport_error)?;
        Self::check(response, "close index", SearchError::IndexLifecycleError).await?;
        Ok(())
    }

    async fn open_index(&self, name: &str) -> Result<(), SearchError> {
        let response = self
            .client
            .indices()
            .open(IndicesOpenParts::Index(&[name]))
            .send()
            .await
            .map_err(transport_error)?;
        Self::check(response, "open index", SearchError::IndexLifecycleError).await?;
        Ok(())
    }

    async fn refresh_index(&self, name: &str) -> Result<(), SearchError> {
        let response = self
            .client
            .indices()
            .refresh(IndicesRefreshParts::Index(&[name]))
            .send()
            .await
            .map_err(transport_error)?;
        Self::check(response, "refresh index", SearchError::IndexLifecycleError).await?;
        Ok(())
    }

    async fn put_index_settings(&self, name: &str, settings: &Value) -> Result<(), SearchError> {
        let response = self
            .client
            .indices()
            .put_settings(IndicesPutSettingsParts::Index(&[name]))
            .body(settings.clone())
            .send()
            .await
            .map_err(transport_error)?;
        Self::check(response, "put settings", SearchError::IndexLifecycleError).await?;
        Ok(())
    }

    /// OpenSearch indices hold a single mapping, so `schema` only labels the call.
    async fn put_index_mapping(
        &self,
        name: &str,
        schema: &str,
        mapping: &Value,
    ) -> Result<(), SearchError> {
        debug!(index = %name, schema = %schema, "Putting mapping");
        let response = self
            .client
            .indices()
            .put_mapping(IndicesPutMappingParts::Index(&[name]))
            .body(mapping.clone())
            .send()
            .await
            .map_err(transport_error)?;
        Self::check(response, "put mapping", SearchError::IndexLifecycleError).await?;
        Ok(())
    }

    #[instrument(skip(self, operations), fields(count = operations.len()))]
    async fn bulk_write(
        &self,
        index: &str,
        schema: &str,
        operations: &[BulkOperation],
    ) -> Result<BulkWriteOutcome, SearchError> {
        let body = build_bulk_body(operations);

        let response = self
            .client
            .bulk(BulkParts::Index(index))
            .body(body)
            .send()
            .await
            .map_err(transport_error)?;
        let response = Self::check(response, "bulk", SearchError::BulkOperationError).await?;

        let body: Value = response
            .json()
            .await
            .map_err(|e| SearchError::parse(e.to_string()))?;

        let outcome = parse_bulk_response(&body, operations)?;
        debug!(
            schema = %schema,
            took_ms = outcome.took,
            failed = outcome.failed_count(),
            "Bulk write completed"
        );
        Ok(outcome)
    }

    #[instrument(skip(self, query))]
    async fn query(
        &self,
        index: &str,
        schema: &str,
        query: &Value,
    ) -> Result<QueryResponse, SearchError> {
        let response = self
            .client
            .search(SearchParts::Index(&[index]))
            .body(query.clone())
            .send()
            .await
            .map_err(transport_error)?;
        let response = Self::check(response, "search", SearchError::QueryError).await?;

        let body: Value = response
            .json()
            .await
            .map_err(|e| SearchError::parse(e.to_string()))?;

        parse_search_response(&body)
    }

    #[instrument(skip(self))]
    async fn delete_index(&self, name: &str) -> Result<(), SearchError> {
        let response = self
            .client
            .indices()
            .delete(IndicesDeleteParts::Index(&[name]))
            .send()
            .await
            .map_err(transport_error)?;

        // 404 is acceptable - index may not exist
        if response.status_code() == StatusCode::NOT_FOUND {
            debug!("Index did not exist");
            return Ok(());
        }
        Self::check(response, "delete index", SearchError::IndexLifecycleError).await?;
        Ok(())
    }
}

/// Build the NDJSON lines of a bulk request: an action line per operation,
/// followed by the document for index operations.
fn build_bulk_body(operations: &[BulkOperation]) -> Vec<JsonBody<Value>> {
    let mut body: Vec<JsonBody<Value>> = Vec::with_capacity(operations.len() * 2);
    for operation in operations {
        match operation {
            BulkOperation::Index { id, document } => {
                body.push(json!({ "index": { "_id": id } }).into());
                body.push(document.clone().into());
            }
            BulkOperation::Delete { id } => {
                body.push(json!({ "delete": { "_id": id } }).into());
            }
        }
    }
    body
}

/// Parse a bulk response body into per-item outcomes.
///
/// Items are matched to operations by position; the `_id` reported by the
/// backend wins when present.
pub fn parse_bulk_response(
    body: &Value,
    operations: &[BulkOperation],
) -> Result<BulkWriteOutcome, SearchError> {
    let items = body
        .get("items")
        .and_then(|i| i.as_array())
        .ok_or_else(|| SearchError::parse("bulk response has no items"))?;

    if items.len() != operations.len() {
        return Err(SearchError::parse(format!(
            "bulk response has {} items for {} operations",
            items.len(),
            operations.len()
        )));
    }

    let outcomes = items
        .iter()
        .enumerate()
        .map(|(position, item)| {
            // Each item is keyed by its action: index, create, update or delete
            let result = item
                .as_object()
                .and_then(|o| o.values().next())
                .cloned()
                .unwrap_or(Value::Null);

            let id = result
                .get("_id")
                .and_then(|v| v.as_str())
                .map(str::to_string)
                .or_else(|| operations.get(position).map(|op| op.id().to_string()))
                .unwrap_or_default();

            let status = result
                .get("status")
                .and_then(|v| v.as_u64())
                .unwrap_or(0) as u16;

            let error = result.get("error").map(describe_item_error);

            BulkItemOutcome {
                position,
                id,
                status,
                error,
            }
        })
        .collect::<Vec<_>>();

    let errors = body
        .get("errors")
        .and_then(|e| e.as_bool())
        .unwrap_or_else(|| outcomes.iter().any(|o| !o.is_success()));

    Ok(BulkWriteOutcome {
        errors,
        took: body.get("took").and_then(|t| t.as_u64()).unwrap_or(0),
        items: outcomes,
    })
}

fn describe_item_error(error: &Value) -> String {
    let kind = error.get("type").and_then(|t| t.as_str());
    let reason = error.get("reason").and_then(|r| r.as_str());
    match (kind, reason) {
        (Some(kind), Some(reason)) => format!("{}: {}", kind, reason),
        (Some(kind), None) => kind.to_string(),
        (None, Some(reason)) => reason.to_string(),
        (None, None) => error.to_string(),
    }
}

/// Parse a search response body.
pub fn parse_search_response(body: &Value) -> Result<QueryResponse, SearchError> {
    let hits = body
        .get("hits")
        .ok_or_else(|| SearchError::parse("search response has no hits"))?;

    // `hits.total` is an object since OpenSearch 1.0, a plain number before
    let total = match hits.get("total") {
        Some(Value::Object(total)) => total.get("value").and_then(|v| v.as_u64()),
        Some(total) => total.as_u64(),
        None => None,
    }
    .ok_or_else(|| SearchError::parse("search response has no hits.total"))?;

    let hits = hits
        .get("hits")
        .and_then(|h| h.as_array())
        .ok_or_else(|| SearchError::parse("search response has no hits.hits"))?
        .iter()
        .map(parse_hit)
        .collect::<Result<Vec<_>, SearchError>>()?;

    Ok(QueryResponse {
        total,
        took: body.get("took").and_then(|t| t.as_u64()).unwrap_or(0),
        hits,
    })
}

/// Parse a single hit. A hit without `_source` (for example when the mapping
/// disables it) cannot be turned into a document and fails the response.
pub fn parse_hit(hit: &Value) -> Result<QueryHit, SearchError> {
    let id = hit
        .get("_id")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();
    let source = hit
        .get("_source")
        .cloned()
        .ok_or_else(|| SearchError::parse(format!("hit {} has no _source", id)))?;
    let score = hit.get("_score").and_then(|s| s.as_f64());

    Ok(QueryHit { id, score, source })
}
