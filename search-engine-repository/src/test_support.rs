//! In-memory backend and observer used by the unit tests.
//!
//! The backend records every capability call, keeps documents per index,
//! checks numeric mapping types on write, and evaluates the subset of the
//! OpenSearch DSL produced by `OpenSearchQueryConverter`.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::SearchError;
use crate::interfaces::{ConnectionObserver, SearchBackend};
use crate::types::{BulkItemOutcome, BulkOperation, BulkWriteOutcome, QueryHit, QueryResponse};

#[derive(Default)]
struct StoredIndex {
    open: bool,
    settings: Option<Value>,
    mapping: Option<Value>,
    documents: BTreeMap<String, Value>,
}

#[derive(Default)]
struct Inner {
    indices: HashMap<String, StoredIndex>,
    calls: Vec<&'static str>,
    failing_pings: u32,
    unreachable: bool,
    delays: HashMap<&'static str, Duration>,
    fail_on: HashSet<&'static str>,
}

#[derive(Default)]
pub struct InMemoryBackend {
    inner: Mutex<Inner>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap()
    }

    /// Fail the next `count` pings.
    pub fn fail_pings(&self, count: u32) {
        self.lock().failing_pings = count;
    }

    /// Refuse every call with a connectivity error.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.lock().unreachable = unreachable;
    }

    /// Make every call of `operation` take `delay` before it runs.
    pub fn set_delay(&self, operation: &'static str, delay: Duration) {
        self.lock().delays.insert(operation, delay);
    }

    /// Reject every call of `operation`.
    pub fn fail_on(&self, operation: &'static str) {
        self.lock().fail_on.insert(operation);
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.lock().calls.clone()
    }

    pub fn call_count(&self, operation: &str) -> usize {
        self.lock().calls.iter().filter(|c| **c == operation).count()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    pub fn has_index(&self, name: &str) -> bool {
        self.lock().indices.contains_key(name)
    }

    pub fn is_open(&self, name: &str) -> bool {
        self.lock().indices.get(name).map_or(false, |i| i.open)
    }

    pub fn mapping(&self, name: &str) -> Option<Value> {
        self.lock().indices.get(name).and_then(|i| i.mapping.clone())
    }

    pub fn insert_document(&self, index: &str, id: &str, document: Value) {
        self.lock()
            .indices
            .entry(index.to_string())
            .or_insert_with(|| StoredIndex {
                open: true,
                ..Default::default()
            })
            .documents
            .insert(id.to_string(), document);
    }

    pub fn document(&self, index: &str, id: &str) -> Option<Value> {
        self.lock()
            .indices
            .get(index)
            .and_then(|i| i.documents.get(id).cloned())
    }

    pub fn document_count(&self, index: &str) -> usize {
        self.lock()
            .indices
            .get(index)
            .map_or(0, |i| i.documents.len())
    }

    /// Record the call, wait out its delay and apply the configured failures.
    async fn enter(
        &self,
        operation: &'static str,
    ) -> Result<std::sync::MutexGuard<'_, Inner>, SearchError> {
        let delay = {
            let mut inner = self.lock();
            inner.calls.push(operation);
            inner.delays.get(operation).copied()
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let inner = self.lock();
        if inner.unreachable {
            return Err(SearchError::backend("connection refused"));
        }
        if inner.fail_on.contains(operation) {
            return Err(SearchError::lifecycle(format!("{} rejected", operation)));
        }
        Ok(inner)
    }
}

fn with_index<'a>(inner: &'a mut Inner, name: &str) -> Result<&'a mut StoredIndex, SearchError> {
    inner
        .indices
        .get_mut(name)
        .ok_or_else(|| SearchError::lifecycle(format!("index_not_found_exception: {}", name)))
}

#[async_trait]
impl SearchBackend for InMemoryBackend {
    async fn ping(&self, _timeout: Duration) -> Result<(), SearchError> {
        let mut inner = self.enter("ping").await?;
        if inner.failing_pings > 0 {
            inner.failing_pings -= 1;
            return Err(SearchError::backend("connection refused"));
        }
        Ok(())
    }

    async fn index_exists(&self, name: &str) -> Result<bool, SearchError> {
        let inner = self.enter("index_exists").await?;
        Ok(inner.indices.contains_key(name))
    }

    async fn create_index(&self, name: &str) -> Result<(), SearchError> {
        let mut inner = self.enter("create_index").await?;
        inner.indices.entry(name.to_string()).or_insert_with(|| StoredIndex {
            open: true,
            ..Default::default()
        });
        Ok(())
    }

    async fn close_index(&self, name: &str) -> Result<(), SearchError> {
        let mut inner = self.enter("close_index").await?;
        with_index(&mut inner, name)?.open = false;
        Ok(())
    }

    async fn open_index(&self, name: &str) -> Result<(), SearchError> {
        let mut inner = self.enter("open_index").await?;
        with_index(&mut inner, name)?.open = true;
        Ok(())
    }

    async fn refresh_index(&self, name: &str) -> Result<(), SearchError> {
        let mut inner = self.enter("refresh_index").await?;
        with_index(&mut inner, name)?;
        Ok(())
    }

    async fn put_index_settings(&self, name: &str, settings: &Value) -> Result<(), SearchError> {
        let mut inner = self.enter("put_index_settings").await?;
        let index = with_index(&mut inner, name)?;
        if index.open {
            return Err(SearchError::lifecycle("settings change on open index"));
        }
        index.settings = Some(settings.clone());
        Ok(())
    }

    async fn put_index_mapping(
        &self,
        name: &str,
        _schema: &str,
        mapping: &Value,
    ) -> Result<(), SearchError> {
        let mut inner = self.enter("put_index_mapping").await?;
        with_index(&mut inner, name)?.mapping = Some(mapping.clone());
        Ok(())
    }

    async fn bulk_write(
        &self,
        index: &str,
        _schema: &str,
        operations: &[BulkOperation],
    ) -> Result<BulkWriteOutcome, SearchError> {
        let mut inner = self.enter("bulk_write").await?;
        let stored = inner.indices.get_mut(index).ok_or_else(|| {
            SearchError::bulk_operation(format!("index_not_found_exception: {}", index))
        })?;
        if !stored.open {
            return Err(SearchError::bulk_operation(format!(
                "index_closed_exception: {}",
                index
            )));
        }

        let mut items = Vec::with_capacity(operations.len());
        for (position, operation) in operations.iter().enumerate() {
            let (status, error) = match operation {
                BulkOperation::Index { id, document } => {
                    match validate(stored.mapping.as_ref(), document) {
                        Some(reason) => (400, Some(reason)),
                        None => {
                            let replaced = stored.documents.insert(id.clone(), document.clone());
                            (if replaced.is_some() { 200 } else { 201 }, None)
                        }
                    }
                }
                BulkOperation::Delete { id } => match stored.documents.remove(id) {
                    Some(_) => (200, None),
                    None => (404, None),
                },
            };
            items.push(BulkItemOutcome {
                position,
                id: operation.id().to_string(),
                status,
                error,
            });
        }

        Ok(BulkWriteOutcome {
            errors: items.iter().any(|i| !i.is_success()),
            took: 1,
            items,
        })
    }

    async fn query(
        &self,
        index: &str,
        _schema: &str,
        query: &Value,
    ) -> Result<QueryResponse, SearchError> {
        let mut inner = self.enter("query").await?;
        let stored = with_index(&mut inner, index)?;
        if !stored.open {
            return Err(SearchError::query(format!("index_closed_exception: {}", index)));
        }

        let mut matched: Vec<(&String, &Value)> = stored
            .documents
            .iter()
            .filter(|(_, doc)| matches_clause(doc, &query["query"]))
            .collect();

        if let Some(sort) = query["sort"].as_array() {
            matched.sort_by(|(_, a), (_, b)| compare_by(a, b, sort));
        }

        let from = query["from"].as_u64().unwrap_or(0) as usize;
        let size = query["size"].as_u64().unwrap_or(10) as usize;
        let hits = matched
            .iter()
            .skip(from)
            .take(size)
            .map(|(id, doc)| QueryHit {
                id: id.to_string(),
                score: Some(1.0),
                source: (*doc).clone(),
            })
            .collect();

        Ok(QueryResponse {
            total: matched.len() as u64,
            took: 2,
            hits,
        })
    }

    async fn delete_index(&self, name: &str) -> Result<(), SearchError> {
        let mut inner = self.enter("delete_index").await?;
        inner.indices.remove(name);
        Ok(())
    }
}

/// Reject documents whose numeric fields do not hold numbers.
fn validate(mapping: Option<&Value>, document: &Value) -> Option<String> {
    let properties = mapping?.get("properties")?.as_object()?;
    for (field, definition) in properties {
        let numeric = matches!(
            definition["type"].as_str(),
            Some("integer" | "long" | "float" | "double")
        );
        if let Some(value) = document.get(field) {
            if numeric && !value.is_number() && !value.is_null() {
                return Some(format!(
                    "mapper_parsing_exception: failed to parse field [{}]",
                    field
                ));
            }
        }
    }
    None
}

fn matches_clause(doc: &Value, clause: &Value) -> bool {
    let Some((kind, body)) = clause.as_object().and_then(|o| o.iter().next()) else {
        return true;
    };

    match kind.as_str() {
        "match_all" => true,
        "bool" => {
            let all = |key: &str| {
                body[key]
                    .as_array()
                    .map_or(true, |cs| cs.iter().all(|c| matches_clause(doc, c)))
            };
            let none = body["must_not"]
                .as_array()
                .map_or(true, |cs| !cs.iter().any(|c| matches_clause(doc, c)));
            all("must") && all("filter") && none
        }
        "multi_match" => {
            let text = body["query"].as_str().unwrap_or_default().to_lowercase();
            let fields: Vec<String> = body["fields"]
                .as_array()
                .map(|fs| {
                    fs.iter()
                        .filter_map(|f| f.as_str())
                        .map(|f| f.split('^').next().unwrap_or(f).to_string())
                        .collect()
                })
                .unwrap_or_default();
            let haystack: String = match doc.as_object() {
                Some(object) => object
                    .iter()
                    .filter(|(k, _)| fields.is_empty() || fields.contains(k))
                    .filter_map(|(_, v)| v.as_str())
                    .collect::<Vec<_>>()
                    .join(" ")
                    .to_lowercase(),
                None => String::new(),
            };
            let mut terms = text.split_whitespace();
            if body["operator"] == "and" {
                terms.all(|t| haystack.contains(t))
            } else {
                terms.any(|t| haystack.contains(t))
            }
        }
        "term" => field_entry(body).map_or(false, |(field, value)| {
            field_values(doc, field).any(|v| v == value)
        }),
        "terms" => field_entry(body).map_or(false, |(field, values)| {
            let values = values.as_array().cloned().unwrap_or_default();
            field_values(doc, field).any(|v| values.contains(v))
        }),
        "range" => field_entry(body).map_or(false, |(field, bounds)| {
            let Some(value) = doc.get(field) else {
                return false;
            };
            bounds.as_object().map_or(false, |bounds| {
                bounds.iter().all(|(op, bound)| match (op.as_str(), compare(value, bound)) {
                    ("gt", Ordering::Greater) => true,
                    ("gte", Ordering::Greater | Ordering::Equal) => true,
                    ("lt", Ordering::Less) => true,
                    ("lte", Ordering::Less | Ordering::Equal) => true,
                    _ => false,
                })
            })
        }),
        "exists" => body["field"]
            .as_str()
            .map_or(false, |field| doc.get(field).map_or(false, |v| !v.is_null())),
        "prefix" => field_entry(body).map_or(false, |(field, prefix)| {
            match (doc.get(field).and_then(|v| v.as_str()), prefix.as_str()) {
                (Some(value), Some(prefix)) => value.starts_with(prefix),
                _ => false,
            }
        }),
        _ => false,
    }
}

fn field_entry(body: &Value) -> Option<(&str, &Value)> {
    body.as_object()
        .and_then(|o| o.iter().next())
        .map(|(k, v)| (k.as_str(), v))
}

/// A field's values, flattening arrays the way term queries do.
fn field_values<'a>(doc: &'a Value, field: &str) -> Box<dyn Iterator<Item = &'a Value> + 'a> {
    match doc.get(field) {
        Some(Value::Array(values)) => Box::new(values.iter()),
        Some(value) => Box::new(std::iter::once(value)),
        None => Box::new(std::iter::empty()),
    }
}

fn compare(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => Ordering::Equal,
    }
}

fn compare_by(a: &Value, b: &Value, sort: &[Value]) -> Ordering {
    for entry in sort {
        let Some((field, spec)) = field_entry(entry) else {
            continue;
        };
        if field == "_score" {
            continue;
        }
        let ordering = compare(&a[field], &b[field]);
        let ordering = if spec["order"] == "desc" {
            ordering.reverse()
        } else {
            ordering
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

/// Counts connection events.
#[derive(Default)]
pub struct RecordingObserver {
    failures: Mutex<u32>,
    connected: Mutex<Option<u32>>,
}

impl RecordingObserver {
    pub fn failures(&self) -> u32 {
        *self.failures.lock().unwrap()
    }

    pub fn connected_after(&self) -> Option<u32> {
        *self.connected.lock().unwrap()
    }
}

impl ConnectionObserver for RecordingObserver {
    fn on_attempt_failed(&self, _attempt: u32, _error: &SearchError, _retry_in: Option<Duration>) {
        *self.failures.lock().unwrap() += 1;
    }

    fn on_connected(&self, attempts: u32) {
        *self.connected.lock().unwrap() = Some(attempts);
    }
}
