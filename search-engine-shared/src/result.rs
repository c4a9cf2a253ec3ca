//! Typed search results.

use serde::{Deserialize, Serialize};

/// The outcome of a search.
///
/// `total` is the match count reported by the backend and may exceed
/// `items.len()` when the query is paginated. `items` keep the order the
/// backend returned them in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult<T> {
    /// Number of documents matching the query.
    pub total: u64,
    /// Query latency reported by the backend, in milliseconds.
    pub milliseconds: u64,
    /// The returned page of documents.
    pub items: Vec<T>,
}

impl<T> SearchResult<T> {
    /// An empty result.
    pub fn empty() -> Self {
        Self {
            total: 0,
            milliseconds: 0,
            items: Vec::new(),
        }
    }

    /// Whether more matches exist than were returned.
    pub fn has_more(&self) -> bool {
        self.total > self.items.len() as u64
    }
}

impl<T> Default for SearchResult<T> {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_more() {
        let result = SearchResult {
            total: 15,
            milliseconds: 3,
            items: vec![1; 10],
        };
        assert!(result.has_more());

        let result: SearchResult<u8> = SearchResult::empty();
        assert!(!result.has_more());
    }
}
