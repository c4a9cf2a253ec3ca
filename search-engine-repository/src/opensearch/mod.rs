//! OpenSearch implementation of the search backend.
//!
//! This module provides a concrete implementation of `SearchBackend`
//! and of `QueryConverter` using OpenSearch as the backend.

mod client;
mod queries;

pub use client::{parse_bulk_response, parse_hit, parse_search_response, OpenSearchBackend};
pub use queries::{OpenSearchQueryConverter, DEFAULT_PAGE_SIZE, MAX_RESULT_WINDOW};
