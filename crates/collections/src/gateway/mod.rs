//! Thin façade over the search engine client.
//!
//! [`SearchGateway`] is the seam between collection logic and the wire. Each
//! method is a single attempt: no retry, no backoff. Failures are returned to
//! the caller, which decides how to report them.

mod elasticsearch;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::GatewayResult;

pub use self::elasticsearch::ElasticsearchGateway;

/// A search (or count / delete-by-query) against one index.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    /// Target index.
    pub index: String,
    /// Page size, if set.
    pub size: Option<i64>,
    /// Page offset, if set.
    pub from: Option<i64>,
    /// Request body (`query`, `sort`).
    pub body: Value,
}

impl SearchRequest {
    /// Creates a request without pagination.
    pub fn new(index: impl Into<String>, body: Value) -> Self {
        Self {
            index: index.into(),
            size: None,
            from: None,
            body,
        }
    }
}

/// A single document write.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexRequest {
    /// Target index.
    pub index: String,
    /// Document type declared by the collection.
    pub doc_type: String,
    /// Document identifier.
    pub id: String,
    /// Write timeout (e.g. `"1s"`).
    pub timeout: String,
    /// Refresh policy; `None` leaves the parameter out of the request.
    pub refresh: Option<bool>,
    /// The document.
    pub body: Value,
}

/// Index creation with mappings and optional settings.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateIndexRequest {
    /// Index to create.
    pub index: String,
    /// `{mappings, settings?}` body.
    pub body: Value,
}

/// Operations the collection client needs from the engine.
#[async_trait]
pub trait SearchGateway: Send + Sync {
    /// Returns whether the engine answers.
    async fn ping(&self) -> GatewayResult<bool>;

    /// Returns whether `index` exists.
    async fn index_exists(&self, index: &str) -> GatewayResult<bool>;

    /// Runs a search and returns the raw response.
    async fn search(&self, request: SearchRequest) -> GatewayResult<Value>;

    /// Runs a count and returns the raw response.
    async fn count(&self, request: SearchRequest) -> GatewayResult<Value>;

    /// Runs a delete-by-query and returns the raw response.
    async fn delete_by_query(&self, request: SearchRequest) -> GatewayResult<Value>;

    /// Writes one document and returns the raw response.
    async fn index(&self, request: IndexRequest) -> GatewayResult<Value>;

    /// Creates an index and returns the raw response.
    async fn create_index(&self, request: CreateIndexRequest) -> GatewayResult<Value>;
}
