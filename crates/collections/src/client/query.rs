//! Detached queries over a collection.

use serde_json::Value;

use super::CollectionClient;
use crate::error::CollectionResult;
use crate::gateway::SearchGateway;
use crate::query::{Condition, OrderSpec, QueryBuilder};
use crate::result::SearchEnvelope;
use crate::schema::Collection;

/// A query that owns its own state and borrows the client only to execute.
///
/// Created by [`CollectionClient::query`], already targeting the collection's
/// index. Any number of these can be alive at once; none of them touch the
/// client's own in-progress query. Executing consumes the query.
#[must_use = "a query does nothing until executed"]
pub struct Query<'a, C: Collection, G: SearchGateway> {
    client: &'a CollectionClient<C, G>,
    builder: QueryBuilder,
}

impl<'a, C: Collection, G: SearchGateway> Query<'a, C, G> {
    pub(super) fn new(client: &'a CollectionClient<C, G>) -> Self {
        let mut builder = QueryBuilder::new();
        builder.find(client.collection.index());
        Self { client, builder }
    }

    /// Adds a condition, starting a fresh boolean query.
    pub fn filter(mut self, condition: impl Into<Condition>) -> Self {
        self.builder.filter(condition);
        self
    }

    /// Adds a condition to the boolean query built so far.
    pub fn and_filter(mut self, condition: impl Into<Condition>) -> Self {
        self.builder.and_filter(condition);
        self
    }

    /// Sets the page size.
    pub fn limit(mut self, limit: i64) -> Self {
        self.builder.limit(limit);
        self
    }

    /// Sets the page offset.
    pub fn offset(mut self, offset: i64) -> Self {
        self.builder.offset(offset);
        self
    }

    /// Adds a sort key; free-text fields sort on their keyword sub-field.
    pub fn order_by(mut self, order: impl Into<OrderSpec>) -> Self {
        self.builder.order_by(order, &self.client.fields);
        self
    }

    /// Adds a sort key from a textual direction (`asc` / `desc`).
    pub fn order_by_str(mut self, field: &str, direction: &str) -> Self {
        self.builder
            .order_by_str(field, direction, &self.client.fields);
        self
    }

    /// Returns the request this query would send.
    pub fn build_query(&self) -> CollectionResult<Value> {
        self.builder.build_query()
    }

    /// Runs the query and returns the normalized result.
    pub async fn try_search(self) -> CollectionResult<SearchEnvelope> {
        let state = self.builder.checked_state()?;
        self.client.execute_search(state).await
    }

    /// Runs the query; an empty envelope on failure.
    pub async fn search(self) -> SearchEnvelope {
        let client = self.client;
        let outcome = self.try_search().await;
        client.settle("search", outcome, SearchEnvelope::default())
    }

    /// Runs the query and returns the first document.
    pub async fn try_one(self) -> CollectionResult<Option<Value>> {
        self.try_search().await.map(SearchEnvelope::into_first)
    }

    /// Runs the query and returns the first document; `None` on failure.
    pub async fn one(self) -> Option<Value> {
        let client = self.client;
        let outcome = self.try_one().await;
        client.settle("one", outcome, None)
    }

    /// Counts matches, ignoring pagination and sort.
    pub async fn try_count(self) -> CollectionResult<u64> {
        let state = self.builder.checked_state()?;
        self.client.execute_count(state).await
    }

    /// Counts matches; `0` on failure.
    pub async fn count(self) -> u64 {
        let client = self.client;
        let outcome = self.try_count().await;
        client.settle("count", outcome, 0)
    }

    /// Deletes the matching documents; true if any were deleted.
    pub async fn try_delete(self) -> CollectionResult<bool> {
        let state = self.builder.checked_state()?;
        self.client.execute_delete(state).await
    }

    /// Deletes the matching documents; `false` on failure.
    pub async fn delete(self) -> bool {
        let client = self.client;
        let outcome = self.try_delete().await;
        client.settle("delete", outcome, false)
    }
}
