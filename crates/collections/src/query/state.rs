//! The request document accumulated by the query builder.
//!
//! Serializes to the shape the engine expects:
//!
//! ```json
//! {
//!   "index": "users",
//!   "size": 10,
//!   "from": 0,
//!   "body": {
//!     "query": { "bool": { "must": [], "must_not": [], "filter": [] } },
//!     "sort": { "name.keyword": "asc" }
//!   }
//! }
//! ```
//!
//! Empty parts are omitted, so an untouched state serializes to `{}`.

use std::fmt;
use std::str::FromStr;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::{Value, json};

use crate::error::CollectionError;

/// Clauses of a boolean query.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BoolQuery {
    /// Clauses every hit must match (scored).
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub must: Vec<Value>,
    /// Clauses no hit may match.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub must_not: Vec<Value>,
    /// Clauses every hit must match (unscored).
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub filter: Vec<Value>,
}

impl BoolQuery {
    /// Returns true when no clause is set.
    pub fn is_empty(&self) -> bool {
        self.must.is_empty() && self.must_not.is_empty() && self.filter.is_empty()
    }

    /// Returns the `{"bool": {...}}` query clause.
    pub fn to_query(&self) -> Value {
        json!({ "bool": self })
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Ascending (the default).
    #[default]
    Asc,
    /// Descending.
    Desc,
}

impl SortDirection {
    /// Returns the engine keyword for this direction.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortDirection {
    type Err = CollectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            other => Err(CollectionError::invalid_input(
                "sort",
                format!("unknown sort direction '{other}', expected asc or desc"),
            )),
        }
    }
}

/// Ordered sort keys, serialized as a `{field: direction}` object.
///
/// Insertion order is kept so the engine applies the keys in the order
/// they were requested. Re-sorting on a key replaces its direction in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortSpec(Vec<(String, SortDirection)>);

impl SortSpec {
    /// Sets the direction for `key`.
    pub fn set(&mut self, key: String, direction: SortDirection) {
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = direction,
            None => self.0.push((key, direction)),
        }
    }

    /// Returns true when no key is set.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over the keys in application order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, SortDirection)> {
        self.0.iter().map(|(k, d)| (k.as_str(), *d))
    }
}

impl Serialize for SortSpec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, direction) in &self.0 {
            map.serialize_entry(key, direction)?;
        }
        map.end()
    }
}

/// The `body` part of the request.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchBody {
    /// Boolean condition tree, absent until the first condition is resolved.
    #[serde(serialize_with = "serialize_query", skip_serializing_if = "query_is_empty")]
    pub query: Option<BoolQuery>,
    /// Sort keys.
    #[serde(skip_serializing_if = "SortSpec::is_empty")]
    pub sort: SortSpec,
}

fn query_is_empty(query: &Option<BoolQuery>) -> bool {
    query.as_ref().is_none_or(BoolQuery::is_empty)
}

fn serialize_query<S: Serializer>(
    query: &Option<BoolQuery>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(1))?;
    match query {
        Some(query) => map.serialize_entry("bool", query)?,
        None => map.serialize_entry("bool", &BoolQuery::default())?,
    }
    map.end()
}

impl SearchBody {
    /// Returns true when neither conditions nor sort keys are set.
    pub fn is_empty(&self) -> bool {
        query_is_empty(&self.query) && self.sort.is_empty()
    }

    /// Returns the body as a JSON document.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| json!({}))
    }

    /// Returns the body without its sort keys, as sent to the count and
    /// delete-by-query endpoints.
    pub fn without_sort(&self) -> Value {
        match &self.query {
            Some(query) if !query.is_empty() => json!({ "query": query.to_query() }),
            _ => json!({}),
        }
    }
}

/// Query state: target index, pagination and body.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryState {
    /// Target index.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<String>,
    /// Page size, forwarded as given.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<i64>,
    /// Page offset, forwarded as given.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<i64>,
    /// Conditions and sort.
    #[serde(skip_serializing_if = "SearchBody::is_empty")]
    pub body: SearchBody,
}

impl QueryState {
    /// Returns true when nothing has been set.
    pub fn is_empty(&self) -> bool {
        self.index.is_none() && self.size.is_none() && self.from.is_none() && self.body.is_empty()
    }

    /// Returns the state as a JSON document.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| json!({}))
    }

    /// Returns the boolean query, creating it when absent.
    pub(crate) fn bool_query_mut(&mut self) -> &mut BoolQuery {
        self.body.query.get_or_insert_with(BoolQuery::default)
    }

    /// Replaces the boolean query with an empty one and returns it.
    pub(crate) fn fresh_bool_query(&mut self) -> &mut BoolQuery {
        self.body.query.insert(BoolQuery::default())
    }
}
