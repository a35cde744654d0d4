//! Find options and sort key parsing.
//!
//! Filters are plain documents in the store's query language (`{"dataset": "/a/b/c"}`,
//! `{"size": {"$gt": 10}}`) and are passed through to the session untouched. This module
//! covers everything else a find carries: skip, limit and sort order.
//!
//! Sort keys follow the `"field"` / `"-field"` convention, where a leading `-` reverses the
//! order of that key.

use bson::{Bson, Document};

use crate::error::{RecordStoreError, RecordStoreResult};

/// Sort direction for query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    /// Ascending order (A to Z, 0 to 9, earliest to latest).
    Asc,
    /// Descending order (Z to A, 9 to 0, latest to earliest).
    Desc,
}

/// A single sort key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    /// The field name to sort by. May be a dotted path.
    pub field: String,
    /// The sort direction.
    pub direction: SortDirection,
}

impl Sort {
    /// Parses a sort key, where a leading `-` selects descending order.
    ///
    /// # Errors
    ///
    /// Returns [`RecordStoreError::InvalidQuery`] for an empty field name or a field name
    /// starting with `$`.
    pub fn parse(key: &str) -> RecordStoreResult<Self> {
        let (field, direction) = match key.strip_prefix('-') {
            Some(field) => (field, SortDirection::Desc),
            None => (key, SortDirection::Asc),
        };

        if field.is_empty() {
            return Err(RecordStoreError::InvalidQuery(format!(
                "empty field name in sort key '{}'",
                key
            )));
        }
        if field.starts_with('$') {
            return Err(RecordStoreError::InvalidQuery(format!(
                "invalid field name in sort key '{}'",
                key
            )));
        }

        Ok(Sort { field: field.to_string(), direction })
    }

    /// Parses an ordered list of sort keys.
    pub fn parse_all<S: AsRef<str>>(keys: &[S]) -> RecordStoreResult<Vec<Sort>> {
        keys.iter()
            .map(|key| Sort::parse(key.as_ref()))
            .collect()
    }

    /// Renders sort keys as a store sort document (`1` ascending, `-1` descending).
    pub fn to_document(sorts: &[Sort]) -> Document {
        sorts
            .iter()
            .map(|sort| {
                (
                    sort.field.clone(),
                    Bson::Int32(match sort.direction {
                        SortDirection::Asc => 1,
                        SortDirection::Desc => -1,
                    }),
                )
            })
            .collect()
    }
}

/// Options of a single find round trip.
///
/// # Example
///
/// ```ignore
/// use recordlayer::query::FindOptions;
///
/// let options = FindOptions::builder()
///     .skip(20)
///     .limit(10)
///     .sort(&["-size"])?
///     .build();
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    /// Number of matching documents to skip.
    pub skip: usize,
    /// Maximum number of documents to return. `None` is unbounded.
    pub limit: Option<usize>,
    /// Sort keys, applied in order.
    pub sort: Vec<Sort>,
}

impl FindOptions {
    /// Creates options for an unsorted, unbounded find.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new builder for fluent construction.
    pub fn builder() -> FindOptionsBuilder {
        FindOptionsBuilder::default()
    }
}

#[derive(Debug, Clone, Default)]
pub struct FindOptionsBuilder {
    options: FindOptions,
}

impl FindOptionsBuilder {
    /// Sets the number of documents to skip.
    pub fn skip(mut self, skip: usize) -> Self {
        self.options.skip = skip;
        self
    }

    /// Bounds the result to `limit` documents. Zero means unbounded.
    pub fn limit(mut self, limit: usize) -> Self {
        self.options.limit = (limit > 0).then_some(limit);
        self
    }

    /// Sets already parsed sort keys.
    pub fn sorts(mut self, sorts: Vec<Sort>) -> Self {
        self.options.sort = sorts;
        self
    }

    /// Parses and sets sort keys.
    ///
    /// # Errors
    ///
    /// Returns an error if any key is invalid. See [`Sort::parse`].
    pub fn sort<S: AsRef<str>>(self, keys: &[S]) -> RecordStoreResult<Self> {
        Ok(self.sorts(Sort::parse_all(keys)?))
    }

    /// Builds and returns the final options.
    pub fn build(self) -> FindOptions {
        self.options
    }
}
