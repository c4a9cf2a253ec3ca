//! Documents as they are handed to the search engine.

use serde::{Deserialize, Serialize};

/// A domain document paired with the identifier it is stored under.
///
/// The `id` is unique within one index. Indexing an item whose `id` already
/// exists replaces the stored document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchEngineItem<T> {
    /// Document identifier inside the index.
    pub id: String,
    /// The document body.
    pub document: T,
}

impl<T> SearchEngineItem<T> {
    /// Pair a document with its identifier.
    pub fn new(id: impl Into<String>, document: T) -> Self {
        Self {
            id: id.into(),
            document,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_item() {
        let item = SearchEngineItem::new("doc-1", 42u32);
        assert_eq!(item.id, "doc-1");
        assert_eq!(item.document, 42);
    }
}
