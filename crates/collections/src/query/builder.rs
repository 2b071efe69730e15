//! Stateful construction of a search request.

use serde_json::Value;

use super::condition::{self, Condition};
use super::state::{QueryState, SortDirection};
use crate::error::{CollectionError, CollectionResult};
use crate::schema::{self, FieldMap};

/// A sort request: a field and a direction.
///
/// A bare field name sorts ascending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderSpec {
    /// The field to sort on, before free-text resolution.
    pub field: String,
    /// The direction.
    pub direction: SortDirection,
}

impl From<&str> for OrderSpec {
    fn from(field: &str) -> Self {
        Self {
            field: field.to_string(),
            direction: SortDirection::Asc,
        }
    }
}

impl From<String> for OrderSpec {
    fn from(field: String) -> Self {
        Self {
            field,
            direction: SortDirection::Asc,
        }
    }
}

impl<F: Into<String>> From<(F, SortDirection)> for OrderSpec {
    fn from((field, direction): (F, SortDirection)) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }
}

/// Accumulates conditions, sort and pagination into one [`QueryState`].
///
/// A plain [`filter`](Self::filter) starts a fresh boolean query;
/// [`and_filter`](Self::and_filter) appends to the one being built.
/// Malformed input is remembered and reported by [`build_query`](Self::build_query)
/// and by the next terminal operation that consumes the builder.
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    state: QueryState,
    and_mode: bool,
    error: Option<CollectionError>,
}

impl QueryBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Targets `index`.
    pub fn find(&mut self, index: &str) -> &mut Self {
        self.state.index = Some(index.to_string());
        self
    }

    /// Resolves a condition into a fresh boolean query.
    pub fn filter(&mut self, condition: impl Into<Condition>) -> &mut Self {
        let condition = condition.into();
        let query = if self.and_mode {
            self.state.bool_query_mut()
        } else {
            self.state.fresh_bool_query()
        };
        if let Err(e) = condition::resolve(query, &condition) {
            self.record(e);
        }
        self
    }

    /// Resolves a condition into the boolean query built so far.
    pub fn and_filter(&mut self, condition: impl Into<Condition>) -> &mut Self {
        self.and_mode = true;
        self.filter(condition);
        self.and_mode = false;
        self
    }

    /// Sets the page size. Negative values are forwarded as given.
    pub fn limit(&mut self, limit: i64) -> &mut Self {
        self.state.size = Some(limit);
        self
    }

    /// Sets the page offset. Negative values are forwarded as given.
    pub fn offset(&mut self, offset: i64) -> &mut Self {
        self.state.from = Some(offset);
        self
    }

    /// Adds a sort key, targeting the keyword sub-field of free-text fields.
    pub fn order_by(&mut self, order: impl Into<OrderSpec>, fields: &FieldMap) -> &mut Self {
        let order = order.into();
        let key = schema::sort_key(fields, &order.field);
        self.state.body.sort.set(key, order.direction);
        self
    }

    /// Adds a sort key from a textual direction (`asc` / `desc`).
    pub fn order_by_str(&mut self, field: &str, direction: &str, fields: &FieldMap) -> &mut Self {
        match direction.parse::<SortDirection>() {
            Ok(direction) => self.order_by((field, direction), fields),
            Err(e) => {
                self.record(e);
                self
            }
        }
    }

    /// Returns the request built so far without executing or clearing it.
    pub fn build_query(&self) -> CollectionResult<Value> {
        match &self.error {
            Some(e) => Err(e.clone()),
            None => Ok(self.state.to_value()),
        }
    }

    /// Returns the accumulated state.
    pub fn state(&self) -> &QueryState {
        &self.state
    }

    /// Returns true when nothing has been set.
    pub fn is_empty(&self) -> bool {
        self.state.is_empty()
    }

    /// Clears the builder, including any recorded error.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Returns the accumulated state, or the first recorded error.
    pub(crate) fn checked_state(&self) -> CollectionResult<&QueryState> {
        match &self.error {
            Some(e) => Err(e.clone()),
            None => Ok(&self.state),
        }
    }

    fn record(&mut self, error: CollectionError) {
        tracing::debug!(error = %error, "Rejected query builder input");
        self.error.get_or_insert(error);
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::schema::FieldMapping;

    fn users() -> FieldMap {
        FieldMap::from([
            ("name".to_string(), FieldMapping::new("text")),
            ("age".to_string(), FieldMapping::new("integer")),
        ])
    }

    #[test]
    fn test_find_sets_index() {
        let mut builder = QueryBuilder::new();
        builder.find("users").find("users");
        assert_eq!(builder.build_query().unwrap(), json!({ "index": "users" }));
    }

    #[test]
    fn test_and_filter_accumulates() {
        let mut builder = QueryBuilder::new();
        builder.filter(("a", "=", "1")).and_filter(("b", "=", "2"));
        assert_eq!(
            builder.build_query().unwrap(),
            json!({
                "body": {
                    "query": {
                        "bool": {
                            "must": [
                                { "match": { "a": "1" } },
                                { "match": { "b": "2" } }
                            ]
                        }
                    }
                }
            })
        );
    }

    #[test]
    fn test_plain_filter_starts_fresh() {
        let mut builder = QueryBuilder::new();
        builder
            .find("users")
            .limit(5)
            .filter(("a", "=", "1"))
            .filter(("b", "=", "2"));
        assert_eq!(
            builder.build_query().unwrap(),
            json!({
                "index": "users",
                "size": 5,
                "body": { "query": { "bool": { "must": [{ "match": { "b": "2" } }] } } }
            })
        );
    }

    #[test]
    fn test_in_replaces_previous_in() {
        let mut builder = QueryBuilder::new();
        builder
            .filter(("tag", "IN", json!(["a"])))
            .and_filter(("tag", "IN", json!(["b"])));
        let query = builder.build_query().unwrap();
        assert_eq!(
            query["body"]["query"]["bool"]["filter"],
            json!([{ "terms": { "tag": ["b"] } }])
        );
    }

    #[test]
    fn test_plain_filter_replaces_in() {
        let mut builder = QueryBuilder::new();
        builder
            .filter(("tag", "in", json!(["a"])))
            .filter(("tag", "in", json!(["b"])));
        assert_eq!(
            builder.build_query().unwrap(),
            json!({ "body": { "query": { "bool": { "filter": [{ "terms": { "tag": ["b"] } }] } } } })
        );
    }

    #[test]
    fn test_plain_filter_drops_not_in() {
        let mut builder = QueryBuilder::new();
        builder
            .filter(("role", "not_in", json!(["admin"])))
            .filter(("name", "=", "ann"));
        assert_eq!(
            builder.build_query().unwrap(),
            json!({ "body": { "query": { "bool": { "must": [{ "match": { "name": "ann" } }] } } } })
        );
    }

    #[test]
    fn test_and_mode_does_not_leak() {
        let mut builder = QueryBuilder::new();
        builder.and_filter(("a", "=", "1"));
        assert!(!builder.and_mode);
        builder.filter(("b", "=", "2"));
        let must = &builder.build_query().unwrap()["body"]["query"]["bool"]["must"];
        assert_eq!(must, &json!([{ "match": { "b": "2" } }]));
    }

    #[test]
    fn test_pagination_is_forwarded_unvalidated() {
        let mut builder = QueryBuilder::new();
        builder.limit(-1).offset(-20);
        assert_eq!(
            builder.build_query().unwrap(),
            json!({ "size": -1, "from": -20 })
        );
    }

    #[test]
    fn test_order_by_free_text_uses_keyword() {
        let fields = users();
        let mut builder = QueryBuilder::new();
        builder
            .order_by("name", &fields)
            .order_by(("age", SortDirection::Desc), &fields);
        assert_eq!(
            builder.build_query().unwrap(),
            json!({ "body": { "sort": { "name.keyword": "asc", "age": "desc" } } })
        );
    }

    #[test]
    fn test_order_by_str_rejects_bad_direction() {
        let mut builder = QueryBuilder::new();
        builder.order_by_str("age", "up", &users());
        assert!(builder.build_query().is_err());
    }

    #[test]
    fn test_error_is_sticky_until_reset() {
        let mut builder = QueryBuilder::new();
        builder
            .filter(("age", "between", json!([18])))
            .and_filter(("name", "=", "ann"));
        let err = builder.build_query().unwrap_err();
        assert_eq!(err.kind(), "InvalidInput");

        builder.reset();
        assert!(builder.is_empty());
        assert_eq!(builder.build_query().unwrap(), json!({}));
    }
}
