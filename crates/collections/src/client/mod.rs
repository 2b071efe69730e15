//! The collection client: request lifecycle and CRUD entry points.
//!
//! A [`CollectionClient`] owns one collection declaration, one connection
//! handle and one in-progress query. Builder calls mutate the query; a
//! terminal call (search / count / delete) checks prerequisites, executes
//! through the gateway, normalizes the response and, with
//! [`AfterExecute::Reset`], clears the query for the next use.
//!
//! Every terminal operation comes in two flavours:
//!
//! - `try_*` returns `Result<_, CollectionError>`;
//! - the plain name reports any error to the [`DiagnosticsSink`] and
//!   returns a safe default (empty envelope, `None`, `0`, `false`).
//!
//! For several logical queries over one collection, use [`CollectionClient::query`],
//! which hands out a detached [`Query`] that does not touch the client's own state.
//!
//! # Example
//!
//! ```no_run
//! use helios_collections::client::{AfterExecute, ClientBuilder};
//! use helios_collections::schema::{DynamicCollection, FieldMapping};
//! use helios_collections::ConnectionConfig;
//! use serde_json::json;
//!
//! # async fn run() {
//! let users = DynamicCollection::new("users")
//!     .with_field("name", FieldMapping::new("text"))
//!     .with_field("age", FieldMapping::new("integer"));
//!
//! let mut client = ClientBuilder::new(users)
//!     .connect(&ConnectionConfig::with_node("http://localhost:9200"))
//!     .await;
//!
//! let page = client
//!     .find()
//!     .filter(("age", "between", json!([18, 30])))
//!     .order_by("name")
//!     .limit(10)
//!     .search(AfterExecute::Reset)
//!     .await;
//! println!("{} of {}", page.data.len(), page.total);
//! # }
//! ```

mod query;


use std::fmt::Debug;
use std::sync::Arc;

use rand::Rng;
use rand::distr::Alphanumeric;
use serde::Serialize;
use serde_json::Value;

use crate::config::{ConnectionConfig, DEFAULT_WRITE_TIMEOUT};
use crate::diagnostics::{Diagnostic, DiagnosticsSink, DynSink, Severity, TracingSink};
use crate::error::{CollectionError, CollectionResult};
use crate::gateway::{
    CreateIndexRequest, ElasticsearchGateway, IndexRequest, SearchGateway, SearchRequest,
};
use crate::query::{Condition, OrderSpec, QueryBuilder, QueryState};
use crate::result::{self, SearchEnvelope};
use crate::schema::{self, Collection, FieldMap};

pub use self::query::Query;

/// Length of generated document identifiers.
pub const DOCUMENT_ID_LENGTH: usize = 50;

/// Generates a random document identifier from the 62 ASCII letters and digits.
///
/// Identifiers are not checked for collisions.
pub fn generate_document_id() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(DOCUMENT_ID_LENGTH)
        .map(char::from)
        .collect()
}

/// What a terminal operation does with the query state once it has run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AfterExecute {
    /// Clear the query state (the default).
    #[default]
    Reset,
    /// Keep the query state so further calls can build on it.
    Retain,
}

/// Configures and constructs a [`CollectionClient`].
pub struct ClientBuilder<C: Collection> {
    collection: C,
    sink: DynSink,
    timeout: Option<String>,
}

impl<C: Collection> ClientBuilder<C> {
    /// Starts building a client for `collection`.
    pub fn new(collection: C) -> Self {
        Self {
            collection,
            sink: Arc::new(TracingSink),
            timeout: None,
        }
    }

    /// Sets the diagnostics sink (default: [`TracingSink`]).
    pub fn sink(mut self, sink: Arc<dyn DiagnosticsSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Overrides the document write timeout.
    pub fn timeout(mut self, timeout: impl Into<String>) -> Self {
        self.timeout = Some(timeout.into());
        self
    }

    /// Connects to Elasticsearch, reporting any setup failure to the sink.
    ///
    /// Always returns a client; when setup failed, its operations degrade to
    /// their defaults.
    pub async fn connect(self, config: &ConnectionConfig) -> CollectionClient<C> {
        let (client, outcome) = self.establish(config).await;
        if let Err(e) = outcome {
            client.report("connect", &e);
        }
        client
    }

    /// Connects to Elasticsearch, returning the first setup failure.
    pub async fn try_connect(self, config: &ConnectionConfig) -> CollectionResult<CollectionClient<C>> {
        let (client, outcome) = self.establish(config).await;
        outcome.map(|()| client)
    }

    /// Builds a client over an existing gateway, reporting setup failures to the sink.
    pub async fn with_gateway<G: SearchGateway>(self, gateway: G) -> CollectionClient<C, G> {
        let (client, outcome) = self.establish_with(gateway).await;
        if let Err(e) = outcome {
            client.report("connect", &e);
        }
        client
    }

    /// Builds a client over an existing gateway, returning the first setup failure.
    pub async fn try_with_gateway<G: SearchGateway>(
        self,
        gateway: G,
    ) -> CollectionResult<CollectionClient<C, G>> {
        let (client, outcome) = self.establish_with(gateway).await;
        outcome.map(|()| client)
    }

    async fn establish(
        self,
        config: &ConnectionConfig,
    ) -> (CollectionClient<C>, CollectionResult<()>) {
        let timeout = self.timeout.clone().unwrap_or_else(|| config.timeout.clone());
        let mut client = self.into_client(timeout);

        let outcome: CollectionResult<()> = async {
            config.validate()?;
            schema::validate(&client.collection)?;
            client.gateway = Some(ElasticsearchGateway::new(config)?);
            client.bootstrap().await
        }
        .await;

        (client, outcome)
    }

    async fn establish_with<G: SearchGateway>(
        self,
        gateway: G,
    ) -> (CollectionClient<C, G>, CollectionResult<()>) {
        let timeout = self
            .timeout
            .clone()
            .unwrap_or_else(|| DEFAULT_WRITE_TIMEOUT.to_string());
        let mut client = self.into_client(timeout);

        let outcome = match schema::validate(&client.collection) {
            Ok(()) => {
                client.gateway = Some(gateway);
                client.bootstrap().await
            }
            Err(e) => Err(e),
        };

        (client, outcome)
    }

    fn into_client<G: SearchGateway>(self, timeout: String) -> CollectionClient<C, G> {
        let fields = self.collection.map();
        CollectionClient {
            collection: self.collection,
            fields,
            gateway: None,
            timeout,
            builder: QueryBuilder::new(),
            sink: self.sink,
        }
    }
}

/// Typed access to one collection.
///
/// Not meant for concurrent use: the in-progress query lives in the client,
/// and every builder or terminal call takes `&mut self`. Use separate
/// clients, or detached [`Query`] values, for independent queries.
pub struct CollectionClient<C: Collection, G: SearchGateway = ElasticsearchGateway> {
    collection: C,
    fields: FieldMap,
    gateway: Option<G>,
    timeout: String,
    builder: QueryBuilder,
    sink: DynSink,
}

impl<C: Collection, G: SearchGateway> Debug for CollectionClient<C, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectionClient")
            .field("collection", &std::any::type_name::<C>())
            .field("index", &self.collection.index())
            .field("connected", &self.gateway.is_some())
            .field("timeout", &self.timeout)
            .field("query", self.builder.state())
            .finish_non_exhaustive()
    }
}

impl<C: Collection, G: SearchGateway> CollectionClient<C, G> {
    /// Returns the collection declaration.
    pub fn collection(&self) -> &C {
        &self.collection
    }

    /// Returns the connection handle, if one was established.
    pub fn gateway(&self) -> Option<&G> {
        self.gateway.as_ref()
    }

    /// Returns the document write timeout.
    pub fn timeout(&self) -> &str {
        &self.timeout
    }

    // ========================================================================
    // Builder
    // ========================================================================

    /// Targets the collection's index.
    pub fn find(&mut self) -> &mut Self {
        self.builder.find(self.collection.index());
        self
    }

    /// Adds a condition, starting a fresh boolean query.
    pub fn filter(&mut self, condition: impl Into<Condition>) -> &mut Self {
        self.builder.filter(condition);
        self
    }

    /// Adds a condition to the boolean query built so far.
    pub fn and_filter(&mut self, condition: impl Into<Condition>) -> &mut Self {
        self.builder.and_filter(condition);
        self
    }

    /// Sets the page size.
    pub fn limit(&mut self, limit: i64) -> &mut Self {
        self.builder.limit(limit);
        self
    }

    /// Sets the page offset.
    pub fn offset(&mut self, offset: i64) -> &mut Self {
        self.builder.offset(offset);
        self
    }

    /// Adds a sort key; free-text fields sort on their keyword sub-field.
    pub fn order_by(&mut self, order: impl Into<OrderSpec>) -> &mut Self {
        self.builder.order_by(order, &self.fields);
        self
    }

    /// Adds a sort key from a textual direction (`asc` / `desc`).
    pub fn order_by_str(&mut self, field: &str, direction: &str) -> &mut Self {
        self.builder.order_by_str(field, direction, &self.fields);
        self
    }

    /// Returns the query built so far without executing or clearing it.
    pub fn build_query(&self) -> CollectionResult<Value> {
        self.builder.build_query()
    }

    /// Starts a detached query over this collection.
    pub fn query(&self) -> Query<'_, C, G> {
        Query::new(self)
    }

    // ========================================================================
    // Probes
    // ========================================================================

    /// Returns whether a connection exists and the engine answers a ping.
    pub async fn is_connected(&self) -> bool {
        self.connected().await.is_ok()
    }

    /// Returns whether the collection's index exists.
    pub async fn try_exists(&self) -> CollectionResult<bool> {
        let gateway = self.connected().await?;
        gateway
            .index_exists(self.collection.index())
            .await
            .map_err(|e| CollectionError::request_failed("exists", e))
    }

    /// Returns whether the collection's index exists; `false` on failure.
    pub async fn exists(&self) -> bool {
        let outcome = self.try_exists().await;
        self.settle("exists", outcome, false)
    }

    // ========================================================================
    // Terminal operations on the client's own query
    // ========================================================================

    /// Runs the query and returns the normalized result.
    pub async fn try_search(&mut self, after: AfterExecute) -> CollectionResult<SearchEnvelope> {
        let outcome = match self.builder.checked_state() {
            Ok(state) => self.execute_search(state).await,
            Err(e) => Err(e),
        };
        self.finish(after);
        outcome
    }

    /// Runs the query; an empty envelope on failure.
    pub async fn search(&mut self, after: AfterExecute) -> SearchEnvelope {
        let outcome = self.try_search(after).await;
        self.settle("search", outcome, SearchEnvelope::default())
    }

    /// Runs the query and returns the first document.
    pub async fn try_one(&mut self, after: AfterExecute) -> CollectionResult<Option<Value>> {
        self.try_search(after).await.map(SearchEnvelope::into_first)
    }

    /// Runs the query and returns the first document; `None` on failure.
    pub async fn one(&mut self, after: AfterExecute) -> Option<Value> {
        let outcome = self.try_one(after).await;
        self.settle("one", outcome, None)
    }

    /// Looks up the document whose `id` field matches `id`.
    pub async fn try_find_one(&mut self, id: impl Into<Value>) -> CollectionResult<Option<Value>> {
        self.find().filter(("id", "=", id));
        self.try_one(AfterExecute::Reset).await
    }

    /// Looks up the document whose `id` field matches `id`; `None` on failure.
    pub async fn find_one(&mut self, id: impl Into<Value>) -> Option<Value> {
        let outcome = self.try_find_one(id).await;
        self.settle("find_one", outcome, None)
    }

    /// Counts the documents matching the query, ignoring pagination and sort.
    pub async fn try_count(&mut self, after: AfterExecute) -> CollectionResult<u64> {
        let outcome = match self.builder.checked_state() {
            Ok(state) => self.execute_count(state).await,
            Err(e) => Err(e),
        };
        self.finish(after);
        outcome
    }

    /// Counts the documents matching the query; `0` on failure.
    pub async fn count(&mut self, after: AfterExecute) -> u64 {
        let outcome = self.try_count(after).await;
        self.settle("count", outcome, 0)
    }

    /// Deletes the documents matching the query.
    ///
    /// Returns true only if the engine reports at least one deletion.
    pub async fn try_delete(&mut self, after: AfterExecute) -> CollectionResult<bool> {
        let outcome = match self.builder.checked_state() {
            Ok(state) => self.execute_delete(state).await,
            Err(e) => Err(e),
        };
        self.finish(after);
        outcome
    }

    /// Deletes the documents matching the query; `false` on failure.
    pub async fn delete(&mut self, after: AfterExecute) -> bool {
        let outcome = self.try_delete(after).await;
        self.settle("delete", outcome, false)
    }

    // ========================================================================
    // Writes and schema
    // ========================================================================

    /// Writes one document under a generated identifier.
    ///
    /// With `refresh`, the write is made visible to search immediately.
    /// Returns true only if exactly one shard acknowledged the write.
    pub async fn try_insert<T: Serialize>(&self, data: &T, refresh: bool) -> CollectionResult<bool> {
        let gateway = self.connected().await?;
        let body = serde_json::to_value(data)
            .map_err(|e| CollectionError::invalid_input("document", e.to_string()))?;

        let request = IndexRequest {
            index: self.collection.index().to_string(),
            doc_type: self.collection.doc_type().to_string(),
            id: generate_document_id(),
            timeout: self.timeout.clone(),
            refresh: refresh.then_some(true),
            body,
        };
        let id = request.id.clone();

        let response = gateway
            .index(request)
            .await
            .map_err(|e| CollectionError::request_failed("insert", e))?;

        let written = result::written_once(&response);
        if written {
            tracing::debug!(index = %self.collection.index(), id = %id, "Inserted document");
        } else {
            self.notify(
                Severity::Error,
                format!("insert of {id} was not acknowledged by exactly one shard"),
            );
        }
        Ok(written)
    }

    /// Writes one document; `false` on failure.
    pub async fn insert<T: Serialize>(&self, data: &T, refresh: bool) -> bool {
        let outcome = self.try_insert(data, refresh).await;
        self.settle("insert", outcome, false)
    }

    /// Creates the index with the declared mapping and settings.
    pub async fn try_mapping(&self) -> CollectionResult<bool> {
        let gateway = self.connected().await?;
        let request = CreateIndexRequest {
            index: self.collection.index().to_string(),
            body: schema::create_index_body(&self.collection),
        };

        gateway
            .create_index(request)
            .await
            .map_err(|e| CollectionError::request_failed("mapping", e))?;

        self.notify(
            Severity::Info,
            format!("created index {}", self.collection.index()),
        );
        Ok(true)
    }

    /// Creates the index; `false` on failure.
    pub async fn mapping(&self) -> bool {
        let outcome = self.try_mapping().await;
        self.settle("mapping", outcome, false)
    }

    // ========================================================================
    // Execution core
    // ========================================================================

    /// Creates the index when the engine is up, the index is missing and
    /// fields are declared.
    async fn bootstrap(&self) -> CollectionResult<()> {
        if self.fields.is_empty() {
            return Ok(());
        }
        if !self.is_connected().await {
            tracing::debug!(
                index = %self.collection.index(),
                "Engine not reachable, skipping index bootstrap"
            );
            return Ok(());
        }
        if self.try_exists().await? {
            return Ok(());
        }
        self.try_mapping().await.map(|_| ())
    }

    /// Returns the gateway once it has answered a ping.
    async fn connected(&self) -> CollectionResult<&G> {
        let gateway = self
            .gateway
            .as_ref()
            .ok_or_else(|| CollectionError::EngineUnavailable {
                message: "no connection has been established".to_string(),
            })?;

        match gateway.ping().await {
            Ok(true) => Ok(gateway),
            Ok(false) => Err(CollectionError::EngineUnavailable {
                message: "ping was not answered".to_string(),
            }),
            Err(e) => Err(CollectionError::EngineUnavailable {
                message: e.to_string(),
            }),
        }
    }

    /// Checks the prerequisite gate for reads.
    ///
    /// `Ok(None)` means the gate is closed for a benign reason (empty query,
    /// missing index) and the caller should return its empty value without
    /// contacting the engine further.
    async fn gate(&self, state: &QueryState) -> CollectionResult<Option<&G>> {
        if state.is_empty() {
            tracing::debug!(index = %self.collection.index(), "Query is empty, nothing to execute");
            return Ok(None);
        }
        if schema::validate(&self.collection).is_err() {
            return Ok(None);
        }

        let gateway = self.connected().await?;
        let exists = gateway
            .index_exists(self.collection.index())
            .await
            .map_err(|e| CollectionError::request_failed("exists", e))?;
        if !exists {
            tracing::debug!(index = %self.collection.index(), "Index does not exist");
            return Ok(None);
        }

        Ok(Some(gateway))
    }

    pub(crate) async fn execute_search(&self, state: &QueryState) -> CollectionResult<SearchEnvelope> {
        let Some(gateway) = self.gate(state).await? else {
            return Ok(SearchEnvelope::default());
        };

        let request = SearchRequest {
            index: self.target_index(state),
            size: state.size,
            from: state.from,
            body: state.body.to_value(),
        };

        let response = gateway
            .search(request)
            .await
            .map_err(|e| CollectionError::request_failed("search", e))?;

        let envelope = result::transform_search(Some(&response));
        tracing::debug!(
            index = %self.collection.index(),
            returned = envelope.data.len(),
            total = envelope.total,
            "Search executed"
        );
        Ok(envelope)
    }

    pub(crate) async fn execute_count(&self, state: &QueryState) -> CollectionResult<u64> {
        let Some(gateway) = self.gate(state).await? else {
            return Ok(0);
        };

        // the count endpoint rejects size, from and sort
        let request = SearchRequest::new(self.collection.index(), state.body.without_sort());

        let response = gateway
            .count(request)
            .await
            .map_err(|e| CollectionError::request_failed("count", e))?;
        Ok(result::transform_count(&response))
    }

    pub(crate) async fn execute_delete(&self, state: &QueryState) -> CollectionResult<bool> {
        let gateway = self.connected().await?;

        let request = SearchRequest::new(self.target_index(state), state.body.without_sort());

        let response = gateway
            .delete_by_query(request)
            .await
            .map_err(|e| CollectionError::request_failed("delete", e))?;

        let deleted = result::deleted_any(&response);
        tracing::debug!(index = %self.collection.index(), deleted, "Delete by query executed");
        Ok(deleted)
    }

    fn target_index(&self, state: &QueryState) -> String {
        state
            .index
            .clone()
            .unwrap_or_else(|| self.collection.index().to_string())
    }

    fn finish(&mut self, after: AfterExecute) {
        if after == AfterExecute::Reset {
            self.builder.reset();
        }
    }

    // ========================================================================
    // Diagnostics
    // ========================================================================

    /// Converts a strict outcome into the legacy default-value contract.
    pub(crate) fn settle<T>(&self, operation: &str, outcome: CollectionResult<T>, default: T) -> T {
        match outcome {
            Ok(value) => value,
            Err(e) => {
                self.report(operation, &e);
                default
            }
        }
    }

    fn report(&self, operation: &str, error: &CollectionError) {
        self.sink.record(Diagnostic::exception(
            std::any::type_name::<C>(),
            operation,
            error,
        ));
    }

    fn notify(&self, severity: Severity, message: String) {
        self.sink
            .record(Diagnostic::new(severity, std::any::type_name::<C>(), message));
    }
}
