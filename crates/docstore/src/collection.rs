use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

/// Sort direction for a single sort key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// A query against a collection: a filter document plus sort and paging.
///
/// The filter is a JSON document in the conventional operator form:
/// `$and`, `$gte`, `$lte`, `$elemMatch`, `$near`, `$regex`, `$exists`,
/// plain values for equality, dotted keys for nested paths.
#[derive(Debug, Clone)]
pub struct Query {
    pub filter: Value,
    pub sort: Vec<(String, SortOrder)>,
    pub skip: usize,
    pub limit: Option<usize>,
}

impl Query {
    pub fn filter(filter: Value) -> Self {
        Self {
            filter,
            sort: Vec::new(),
            skip: 0,
            limit: None,
        }
    }

    pub fn sort_desc(mut self, path: impl Into<String>) -> Self {
        self.sort.push((path.into(), SortOrder::Descending));
        self
    }

    pub fn sort_asc(mut self, path: impl Into<String>) -> Self {
        self.sort.push((path.into(), SortOrder::Ascending));
        self
    }

    pub fn skip(mut self, skip: usize) -> Self {
        self.skip = skip;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// A typed collection of JSON documents keyed by one of their fields.
///
/// This is the storage contract the repositories are written against. The
/// in-memory backend in this crate implements it fully; a server-backed
/// document database would plug in behind the same trait.
#[async_trait]
pub trait Collection: Send + Sync {
    /// Insert a document, replacing any existing document with the same id.
    async fn insert(&self, document: Value) -> Result<()>;

    /// Fetch a single document by its id field.
    async fn find_by_id(&self, id: &str) -> Result<Option<Value>>;

    /// Run a filtered, sorted, paged query.
    ///
    /// When the filter contains a `$near` condition the results are ordered
    /// nearest-first and the explicit sort keys are ignored.
    async fn find(&self, query: &Query) -> Result<Vec<Value>>;

    /// Count all documents matching a filter, ignoring paging.
    async fn count(&self, filter: &Value) -> Result<u64>;

    /// Apply an update document (`$set` / `$unset`) to every matching
    /// document, up to `limit` when given. Returns the number of documents
    /// updated.
    ///
    /// The filter is re-evaluated under the write lock, so a
    /// filter-conditioned update acts as a compare-and-swap over the
    /// matching set.
    async fn update_many(&self, filter: &Value, update: &Value, limit: Option<usize>)
        -> Result<u64>;
}
