//! Backend-neutral structured query language.
//!
//! A [`SearchQuery`] combines an optional full-text clause, a list of filters
//! that must all hold, a sort specification and pagination. Backends translate
//! it into their own query DSL; features a backend cannot express are reported
//! as errors by the backend's converter rather than dropped.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How the terms of a full-text query are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextOperator {
    /// Any term may match.
    #[default]
    Or,
    /// Every term must match.
    And,
}

/// A full-text match clause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextQuery {
    /// The user-entered text.
    pub text: String,
    /// Fields to match against. Empty means the backend's default fields.
    #[serde(default)]
    pub fields: Vec<String>,
    /// Tolerate small typos.
    #[serde(default)]
    pub fuzzy: bool,
    /// How the terms are combined.
    #[serde(default)]
    pub operator: TextOperator,
}

impl TextQuery {
    /// Match `text` against the backend's default fields.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            fields: Vec::new(),
            fuzzy: false,
            operator: TextOperator::Or,
        }
    }

    /// Restrict matching to the given fields.
    pub fn in_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Enable typo tolerance.
    pub fn fuzzy(mut self) -> Self {
        self.fuzzy = true;
        self
    }

    /// Require every term to match.
    pub fn match_all_terms(mut self) -> Self {
        self.operator = TextOperator::And;
        self
    }
}

/// Bounds of a range filter. At least one bound must be set.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RangeBounds {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gt: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gte: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lt: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lte: Option<Value>,
}

impl RangeBounds {
    /// Whether no bound is set.
    pub fn is_unbounded(&self) -> bool {
        self.gt.is_none() && self.gte.is_none() && self.lt.is_none() && self.lte.is_none()
    }

    /// The set bounds as `(operator, value)` pairs.
    pub fn bounds(&self) -> impl Iterator<Item = (&'static str, &Value)> {
        [
            ("gt", self.gt.as_ref()),
            ("gte", self.gte.as_ref()),
            ("lt", self.lt.as_ref()),
            ("lte", self.lte.as_ref()),
        ]
        .into_iter()
        .filter_map(|(op, value)| value.map(|v| (op, v)))
    }
}

/// A condition every matching document must satisfy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Filter {
    /// Field equals the value exactly.
    Term { field: String, value: Value },
    /// Field equals any of the values.
    Terms { field: String, values: Vec<Value> },
    /// Field lies within the bounds.
    Range { field: String, bounds: RangeBounds },
    /// Field is present and non-null.
    Exists { field: String },
    /// Field starts with the prefix.
    Prefix { field: String, prefix: String },
    /// The inner filter must not hold.
    Not { filter: Box<Filter> },
}

impl Filter {
    /// Equality filter.
    pub fn term(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Term {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Membership filter.
    pub fn terms<I, V>(field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::Terms {
            field: field.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Range filter.
    pub fn range(field: impl Into<String>, bounds: RangeBounds) -> Self {
        Self::Range {
            field: field.into(),
            bounds,
        }
    }

    /// Inclusive range `[from, to]`.
    pub fn between(
        field: impl Into<String>,
        from: impl Into<Value>,
        to: impl Into<Value>,
    ) -> Self {
        Self::range(
            field,
            RangeBounds {
                gte: Some(from.into()),
                lte: Some(to.into()),
                ..Default::default()
            },
        )
    }

    /// Existence filter.
    pub fn exists(field: impl Into<String>) -> Self {
        Self::Exists {
            field: field.into(),
        }
    }

    /// Prefix filter.
    pub fn prefix(field: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self::Prefix {
            field: field.into(),
            prefix: prefix.into(),
        }
    }

    /// Negate a filter.
    pub fn not(filter: Filter) -> Self {
        Self::Not {
            filter: Box::new(filter),
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

/// One entry of a sort specification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortField {
    pub field: String,
    #[serde(default)]
    pub order: SortOrder,
}

impl SortField {
    /// Name of the pseudo-field holding the relevance score.
    pub const SCORE: &'static str = "_score";

    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            order: SortOrder::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            order: SortOrder::Desc,
        }
    }

    /// Most relevant first.
    pub fn relevance() -> Self {
        Self::desc(Self::SCORE)
    }
}

/// A backend-neutral search request.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SearchQuery {
    /// Full-text clause. `None` matches every document.
    #[serde(default)]
    pub text: Option<TextQuery>,
    /// Filters that must all hold.
    #[serde(default)]
    pub filters: Vec<Filter>,
    /// Sort specification, applied in order.
    #[serde(default)]
    pub sort: Vec<SortField>,
    /// Number of matches to skip.
    #[serde(default)]
    pub offset: Option<usize>,
    /// Maximum number of matches to return.
    #[serde(default)]
    pub limit: Option<usize>,
}

impl SearchQuery {
    /// A query matching every document.
    pub fn match_all() -> Self {
        Self::default()
    }

    /// A full-text query over the default fields.
    pub fn text(text: impl Into<String>) -> Self {
        Self::with_text(TextQuery::new(text))
    }

    /// A query built around a full-text clause.
    pub fn with_text(text: TextQuery) -> Self {
        Self {
            text: Some(text),
            ..Default::default()
        }
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn with_sort(mut self, sort: SortField) -> Self {
        self.sort.push(sort);
        self
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}
