//! # Search Engine Shared
//!
//! Backend-neutral data types shared between the search engine repository
//! and application code: the documents that get indexed, the structured
//! query language, and the typed results that come back.

mod item;
mod query;
mod result;

pub use item::SearchEngineItem;
pub use query::{Filter, RangeBounds, SearchQuery, SortField, SortOrder, TextOperator, TextQuery};
pub use result::SearchResult;
