//! OpenSearch query builders.
//!
//! This module translates backend-neutral [`SearchQuery`] values into the
//! OpenSearch query DSL.

use serde_json::{json, Map, Value};

use crate::errors::SearchError;
use crate::interfaces::QueryConverter;
use search_engine_shared::{Filter, SearchQuery, SortField, TextOperator, TextQuery};

/// Default `index.max_result_window` of an OpenSearch index.
pub const MAX_RESULT_WINDOW: usize = 10_000;

/// Default page size when a query sets no limit.
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Converts [`SearchQuery`] values into OpenSearch search bodies.
///
/// The body has the shape:
///
/// ```json
/// {
///   "query": { "bool": { "must": [...], "filter": [...], "must_not": [...] } },
///   "from": 0,
///   "size": 10,
///   "sort": [ { "year": { "order": "desc" } } ],
///   "track_total_hits": true
/// }
/// ```
#[derive(Debug, Clone)]
pub struct OpenSearchQueryConverter {
    max_result_window: usize,
}

impl Default for OpenSearchQueryConverter {
    fn default() -> Self {
        Self {
            max_result_window: MAX_RESULT_WINDOW,
        }
    }
}

impl OpenSearchQueryConverter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a custom result window, for indices that raise `index.max_result_window`.
    pub fn with_max_result_window(max_result_window: usize) -> Self {
        Self { max_result_window }
    }
}

impl QueryConverter for OpenSearchQueryConverter {
    fn convert(
        &self,
        query: &SearchQuery,
        _index_name: &str,
        _schema_name: &str,
    ) -> Result<Value, SearchError> {
        build_search_query(query, self.max_result_window)
    }
}

/// Build an OpenSearch search body from a SearchQuery.
pub fn build_search_query(query: &SearchQuery, max_result_window: usize) -> Result<Value, SearchError> {
    let from = query.offset.unwrap_or(0);
    let size = query.limit.unwrap_or(DEFAULT_PAGE_SIZE);
    if from.saturating_add(size) > max_result_window {
        return Err(SearchError::unsupported_query(format!(
            "offset {} + limit {} exceeds the result window of {}",
            from, size, max_result_window
        )));
    }

    let must = match &query.text {
        Some(text) => build_text_query(text)?,
        None => json!({ "match_all": {} }),
    };

    let mut filter = Vec::new();
    let mut must_not = Vec::new();
    for condition in &query.filters {
        match condition {
            Filter::Not { filter: inner } => must_not.push(build_filter(inner)?),
            other => filter.push(build_filter(other)?),
        }
    }

    let mut bool_query = Map::new();
    bool_query.insert("must".to_string(), json!([must]));
    if !filter.is_empty() {
        bool_query.insert("filter".to_string(), Value::Array(filter));
    }
    if !must_not.is_empty() {
        bool_query.insert("must_not".to_string(), Value::Array(must_not));
    }

    let mut body = json!({
        "query": { "bool": bool_query },
        "from": from,
        "size": size,
        "track_total_hits": true
    });

    if !query.sort.is_empty() {
        body["sort"] = build_sort(&query.sort)?;
    }

    Ok(body)
}

/// Build the full-text clause.
///
/// Uses `multi_match` over the requested fields, or over the index's default
/// fields when none are given.
fn build_text_query(text: &TextQuery) -> Result<Value, SearchError> {
    if text.text.trim().is_empty() {
        return Err(SearchError::unsupported_query("text query is blank"));
    }
    for field in &text.fields {
        check_field(field)?;
    }

    let mut multi_match = Map::new();
    multi_match.insert("query".to_string(), json!(text.text));
    if !text.fields.is_empty() {
        multi_match.insert("fields".to_string(), json!(text.fields));
    }
    let operator = match text.operator {
        TextOperator::Or => "or",
        TextOperator::And => "and",
    };
    multi_match.insert("operator".to_string(), json!(operator));
    if text.fuzzy {
        // AUTO allows 0 edits for 1-2 chars, 1 for 3-5, 2 beyond
        multi_match.insert("fuzziness".to_string(), json!("AUTO"));
    }

    Ok(json!({ "multi_match": multi_match }))
}

/// Build one filter clause. Negations nest through `bool.must_not`.
fn build_filter(filter: &Filter) -> Result<Value, SearchError> {
    match filter {
        Filter::Term { field, value } => {
            check_field(field)?;
            check_scalar(field, value)?;
            Ok(json!({ "term": { field.as_str(): value } }))
        }
        Filter::Terms { field, values } => {
            check_field(field)?;
            for value in values {
                check_scalar(field, value)?;
            }
            Ok(json!({ "terms": { field.as_str(): values } }))
        }
        Filter::Range { field, bounds } => {
            check_field(field)?;
            if bounds.is_unbounded() {
                return Err(SearchError::unsupported_query(format!(
                    "range filter on `{}` has no bounds",
                    field
                )));
            }
            let mut range = Map::new();
            for (op, value) in bounds.bounds() {
                check_scalar(field, value)?;
                range.insert(op.to_string(), value.clone());
            }
            Ok(json!({ "range": { field.as_str(): range } }))
        }
        Filter::Exists { field } => {
            check_field(field)?;
            Ok(json!({ "exists": { "field": field } }))
        }
        Filter::Prefix { field, prefix } => {
            check_field(field)?;
            Ok(json!({ "prefix": { field.as_str(): prefix } }))
        }
        Filter::Not { filter: inner } => Ok(json!({
            "bool": { "must_not": [build_filter(inner)?] }
        })),
    }
}

fn build_sort(sort: &[SortField]) -> Result<Value, SearchError> {
    let clauses = sort
        .iter()
        .map(|entry| {
            check_field(&entry.field)?;
            Ok(json!({ entry.field.as_str(): { "order": entry.order.as_str() } }))
        })
        .collect::<Result<Vec<Value>, SearchError>>()?;
    Ok(Value::Array(clauses))
}

fn check_field(field: &str) -> Result<(), SearchError> {
    if field.trim().is_empty() {
        return Err(SearchError::unsupported_query("field name is empty"));
    }
    Ok(())
}

/// Term-level clauses compare against single values only.
fn check_scalar(field: &str, value: &Value) -> Result<(), SearchError> {
    match value {
        Value::Object(_) | Value::Array(_) => Err(SearchError::unsupported_query(format!(
            "filter on `{}` compares against a structured value",
            field
        ))),
        Value::Null => Err(SearchError::unsupported_query(format!(
            "filter on `{}` compares against null, use an exists filter instead",
            field
        ))),
        _ => Ok(()),
    }
}
