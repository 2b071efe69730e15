//! Normalization of raw engine responses.

use serde::Serialize;
use serde_json::Value;

/// Uniform search result: the hit sources in engine order and the total hit count.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchEnvelope {
    /// `_source` of every hit that has one.
    pub data: Vec<Value>,
    /// Total hit count reported by the engine.
    pub total: u64,
}

impl SearchEnvelope {
    /// Returns true when no document was returned.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns the first document, if any.
    pub fn first(&self) -> Option<&Value> {
        self.data.first()
    }

    /// Consumes the envelope and returns the first document, if any.
    pub fn into_first(self) -> Option<Value> {
        self.data.into_iter().next()
    }
}

/// Normalizes a search response.
///
/// Missing or malformed parts yield an empty envelope. Hits without a
/// `_source` (or with an empty one) are skipped.
pub fn transform_search(response: Option<&Value>) -> SearchEnvelope {
    let Some(hits) = response.and_then(|r| r.get("hits")) else {
        return SearchEnvelope::default();
    };

    // ES 7+ reports `{"value": n, "relation": ...}`, older versions a bare number
    let total = match hits.get("total") {
        Some(Value::Object(total)) => total.get("value").and_then(Value::as_u64),
        Some(total) => total.as_u64(),
        None => None,
    }
    .unwrap_or(0);

    let data = hits
        .get("hits")
        .and_then(Value::as_array)
        .map(|hits| {
            hits.iter()
                .filter_map(|hit| hit.get("_source"))
                .filter(|source| !is_empty_source(source))
                .cloned()
                .collect()
        })
        .unwrap_or_default();

    SearchEnvelope { data, total }
}

/// Normalizes a count response to its `count`, or 0.
pub fn transform_count(response: &Value) -> u64 {
    response.get("count").and_then(Value::as_u64).unwrap_or(0)
}

/// Returns true when a delete-by-query response reports deleted documents.
pub fn deleted_any(response: &Value) -> bool {
    response
        .get("deleted")
        .and_then(Value::as_u64)
        .is_some_and(|deleted| deleted != 0)
}

/// Returns true when an index response reports exactly one successful shard write.
pub fn written_once(response: &Value) -> bool {
    response
        .get("_shards")
        .and_then(|shards| shards.get("successful"))
        .and_then(Value::as_u64)
        == Some(1)
}

fn is_empty_source(source: &Value) -> bool {
    match source {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_transform_search() {
        let response = json!({
            "took": 3,
            "hits": {
                "total": { "value": 3, "relation": "eq" },
                "hits": [
                    { "_id": "1", "_source": { "name": "ann" } },
                    { "_id": "2" },
                    { "_id": "3", "_source": { "name": "bob" } }
                ]
            }
        });

        let envelope = transform_search(Some(&response));
        assert_eq!(envelope.total, 3);
        assert_eq!(
            envelope.data,
            vec![json!({ "name": "ann" }), json!({ "name": "bob" })]
        );
        assert_eq!(envelope.first(), Some(&json!({ "name": "ann" })));
    }

    #[test]
    fn test_transform_search_missing_response() {
        assert_eq!(transform_search(None), SearchEnvelope::default());
        assert_eq!(
            transform_search(Some(&json!({ "error": "boom" }))),
            SearchEnvelope::default()
        );
    }

    #[test]
    fn test_transform_search_malformed_parts() {
        let response = json!({ "hits": { "total": "many", "hits": { "not": "an array" } } });
        let envelope = transform_search(Some(&response));
        assert_eq!(envelope.total, 0);
        assert!(envelope.is_empty());
    }

    #[test]
    fn test_transform_search_legacy_total() {
        let response = json!({ "hits": { "total": 7, "hits": [] } });
        assert_eq!(transform_search(Some(&response)).total, 7);
    }

    #[test]
    fn test_empty_sources_are_skipped() {
        let response = json!({
            "hits": { "hits": [{ "_source": {} }, { "_source": null }, { "_source": { "a": 1 } }] }
        });
        assert_eq!(transform_search(Some(&response)).data, vec![json!({ "a": 1 })]);
    }

    #[test]
    fn test_transform_count() {
        assert_eq!(transform_count(&json!({ "count": 42 })), 42);
        assert_eq!(transform_count(&json!({})), 0);
    }

    #[test]
    fn test_deleted_any() {
        assert!(deleted_any(&json!({ "deleted": 2 })));
        assert!(!deleted_any(&json!({ "deleted": 0 })));
        assert!(!deleted_any(&json!({})));
    }

    #[test]
    fn test_written_once() {
        assert!(written_once(&json!({ "_shards": { "total": 2, "successful": 1 } })));
        assert!(!written_once(&json!({ "_shards": { "successful": 2 } })));
        assert!(!written_once(&json!({ "result": "created" })));
    }
}
