//! Condition DSL and its translation into boolean query clauses.
//!
//! A condition is a `(field, operator, value)` triple. Operators are matched
//! case-insensitively:
//!
//! | Operator | Clause | Placement |
//! |----------|--------|-----------|
//! | `=` | `match` | appended to `must` |
//! | `<>` | `term` | appended to `must_not` |
//! | `>` `>=` `<` `<=` | `range` with `gt`/`gte`/`lt`/`lte` | appended to `must` |
//! | `IN` | `terms` | assigned to `filter` |
//! | `NOT_IN` | `terms` | assigned to `must_not` |
//! | `BETWEEN` | `range` with `gte` and `lte` | appended to `must` |
//! | `LIKE` | fuzzy `match` (65% minimum should match) | appended to `must` |
//!
//! Unknown operators fall back to the `=` path.

use std::fmt;

use serde_json::{Value, json};

use super::state::BoolQuery;
use crate::error::{CollectionError, CollectionResult};

/// Minimum share of terms a `LIKE` phrase must match.
pub const LIKE_MINIMUM_SHOULD_MATCH: &str = "65%";

/// Comparison operator of a condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// `=`, and any operator that is not recognized.
    Eq,
    /// `<>`
    NotEq,
    /// `>`
    Gt,
    /// `>=`
    Gte,
    /// `<`
    Lt,
    /// `<=`
    Lte,
    /// `IN`
    In,
    /// `NOT_IN`
    NotIn,
    /// `BETWEEN`
    Between,
    /// `LIKE`
    Like,
}

impl Operator {
    /// Parses an operator, ignoring case.
    ///
    /// Unrecognized operators resolve to [`Operator::Eq`].
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_uppercase().as_str() {
            "=" => Self::Eq,
            "<>" => Self::NotEq,
            ">" => Self::Gt,
            ">=" => Self::Gte,
            "<" => Self::Lt,
            "<=" => Self::Lte,
            "IN" => Self::In,
            "NOT_IN" => Self::NotIn,
            "BETWEEN" => Self::Between,
            "LIKE" => Self::Like,
            other => {
                tracing::debug!(operator = %other, "Unknown operator, falling back to match");
                Self::Eq
            }
        }
    }

    /// Returns the canonical spelling of the operator.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::NotEq => "<>",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::In => "IN",
            Self::NotIn => "NOT_IN",
            Self::Between => "BETWEEN",
            Self::Like => "LIKE",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One `(field, operator, value)` condition.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    /// The field the condition applies to.
    pub field: String,
    /// The comparison.
    pub operator: Operator,
    /// The operand. `IN`/`NOT_IN` expect an array, `BETWEEN` a two-element
    /// array, `LIKE` a phrase or `{"value": ..., "analyzer": ...}`.
    pub value: Value,
}

impl Condition {
    /// Creates a condition from its textual operator.
    pub fn new(field: impl Into<String>, operator: &str, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            operator: Operator::parse(operator),
            value: value.into(),
        }
    }

    /// Creates a `LIKE` condition that analyzes the phrase with `analyzer`.
    pub fn like_with_analyzer(
        field: impl Into<String>,
        phrase: impl Into<Value>,
        analyzer: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            operator: Operator::Like,
            value: json!({ "value": phrase.into(), "analyzer": analyzer.into() }),
        }
    }
}

impl<F, V> From<(F, &str, V)> for Condition
where
    F: Into<String>,
    V: Into<Value>,
{
    fn from((field, operator, value): (F, &str, V)) -> Self {
        Self::new(field, operator, value)
    }
}

/// Resolves a condition into exactly one clause of `query`.
///
/// `IN` and `NOT_IN` assign their clause, replacing whatever `filter` or
/// `must_not` held; every other operator appends. A blank `LIKE` value adds
/// nothing.
pub fn resolve(query: &mut BoolQuery, condition: &Condition) -> CollectionResult<()> {
    let field = condition.field.as_str();
    let value = &condition.value;

    match condition.operator {
        Operator::NotEq => query.must_not.push(json!({ "term": { field: value } })),
        Operator::Gt => query.must.push(range(field, "gt", value)),
        Operator::Gte => query.must.push(range(field, "gte", value)),
        Operator::Lt => query.must.push(range(field, "lt", value)),
        Operator::Lte => query.must.push(range(field, "lte", value)),
        Operator::Eq => query.must.push(json!({ "match": { field: value } })),
        Operator::In => query.filter = vec![terms(field, value, Operator::In)?],
        Operator::NotIn => query.must_not = vec![terms(field, value, Operator::NotIn)?],
        Operator::Between => {
            let (lower, upper) = bounds(field, value)?;
            query
                .must
                .push(json!({ "range": { field: { "gte": lower, "lte": upper } } }));
        }
        Operator::Like => {
            if let Some(clause) = like(field, value)? {
                query.must.push(clause);
            }
        }
    }

    Ok(())
}

fn range(field: &str, bound: &str, value: &Value) -> Value {
    json!({ "range": { field: { bound: value } } })
}

fn terms(field: &str, value: &Value, operator: Operator) -> CollectionResult<Value> {
    if !value.is_array() {
        return Err(CollectionError::invalid_input(
            field,
            format!("{operator} expects an array of values"),
        ));
    }
    Ok(json!({ "terms": { field: value } }))
}

fn bounds<'a>(field: &str, value: &'a Value) -> CollectionResult<(&'a Value, &'a Value)> {
    match value.as_array().map(Vec::as_slice) {
        Some([lower, upper]) => Ok((lower, upper)),
        _ => Err(CollectionError::invalid_input(
            field,
            format!("BETWEEN expects exactly two bounds, got {value}"),
        )),
    }
}

fn like(field: &str, value: &Value) -> CollectionResult<Option<Value>> {
    if is_blank(value) {
        return Ok(None);
    }

    let mut params = json!({
        "operator": "and",
        "minimum_should_match": LIKE_MINIMUM_SHOULD_MATCH,
    });

    match value {
        Value::Object(structured) => {
            let phrase = structured.get("value").ok_or_else(|| {
                CollectionError::invalid_input(field, "LIKE with an analyzer needs a 'value'")
            })?;
            params["query"] = phrase.clone();
            if let Some(analyzer) = structured.get("analyzer") {
                params["analyzer"] = analyzer.clone();
            }
        }
        phrase => params["query"] = phrase.clone(),
    }

    Ok(Some(json!({ "match": { field: params } })))
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Number(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolved(condition: Condition) -> BoolQuery {
        let mut query = BoolQuery::default();
        resolve(&mut query, &condition).unwrap();
        query
    }

    #[test]
    fn test_operator_parse_is_case_insensitive() {
        assert_eq!(Operator::parse("in"), Operator::In);
        assert_eq!(Operator::parse("Not_In"), Operator::NotIn);
        assert_eq!(Operator::parse("between"), Operator::Between);
        assert_eq!(Operator::parse("like"), Operator::Like);
        assert_eq!(Operator::parse(">="), Operator::Gte);
    }

    #[test]
    fn test_unknown_operator_falls_back_to_match() {
        assert_eq!(Operator::parse("~="), Operator::Eq);
        let query = resolved(Condition::new("name", "~=", "ann"));
        assert_eq!(query.must, vec![json!({ "match": { "name": "ann" } })]);
    }

    #[test]
    fn test_default_path_clauses() {
        assert_eq!(
            resolved(Condition::new("status", "<>", "gone")).must_not,
            vec![json!({ "term": { "status": "gone" } })]
        );
        assert_eq!(
            resolved(Condition::new("age", ">", 18)).must,
            vec![json!({ "range": { "age": { "gt": 18 } } })]
        );
        assert_eq!(
            resolved(Condition::new("age", ">=", 18)).must,
            vec![json!({ "range": { "age": { "gte": 18 } } })]
        );
        assert_eq!(
            resolved(Condition::new("age", "<", 65)).must,
            vec![json!({ "range": { "age": { "lt": 65 } } })]
        );
        assert_eq!(
            resolved(Condition::new("age", "<=", 65)).must,
            vec![json!({ "range": { "age": { "lte": 65 } } })]
        );
        assert_eq!(
            resolved(Condition::new("id", "=", "abc")).must,
            vec![json!({ "match": { "id": "abc" } })]
        );
    }

    #[test]
    fn test_in_and_not_in_assign() {
        let mut query = BoolQuery::default();
        resolve(&mut query, &Condition::new("status", "<>", "gone")).unwrap();
        resolve(&mut query, &Condition::new("tag", "in", json!(["a", "b"]))).unwrap();
        resolve(&mut query, &Condition::new("tag", "in", json!(["c"]))).unwrap();
        assert_eq!(query.filter, vec![json!({ "terms": { "tag": ["c"] } })]);

        resolve(&mut query, &Condition::new("role", "not_in", json!(["admin"]))).unwrap();
        assert_eq!(
            query.must_not,
            vec![json!({ "terms": { "role": ["admin"] } })]
        );
    }

    #[test]
    fn test_in_requires_array() {
        let mut query = BoolQuery::default();
        let err = resolve(&mut query, &Condition::new("tag", "IN", "a")).unwrap_err();
        assert!(matches!(err, CollectionError::InvalidInput { ref field, .. } if field == "tag"));
        assert!(query.is_empty());
    }

    #[test]
    fn test_between() {
        let query = resolved(Condition::new("age", "BETWEEN", json!([18, 30])));
        assert_eq!(
            query.must,
            vec![json!({ "range": { "age": { "gte": 18, "lte": 30 } } })]
        );
    }

    #[test]
    fn test_between_rejects_wrong_arity() {
        for value in [json!([18]), json!([]), json!([1, 2, 3]), json!(18)] {
            let mut query = BoolQuery::default();
            let err = resolve(&mut query, &Condition::new("age", "between", value)).unwrap_err();
            assert_eq!(err.kind(), "InvalidInput");
        }
    }

    #[test]
    fn test_like_plain_phrase() {
        let query = resolved(Condition::new("title", "LIKE", "rust book"));
        assert_eq!(
            query.must,
            vec![json!({
                "match": {
                    "title": {
                        "query": "rust book",
                        "operator": "and",
                        "minimum_should_match": "65%"
                    }
                }
            })]
        );
    }

    #[test]
    fn test_like_with_analyzer() {
        let query = resolved(Condition::like_with_analyzer("title", "rust", "folding"));
        assert_eq!(
            query.must,
            vec![json!({
                "match": {
                    "title": {
                        "query": "rust",
                        "operator": "and",
                        "analyzer": "folding",
                        "minimum_should_match": "65%"
                    }
                }
            })]
        );
    }

    #[test]
    fn test_like_blank_value_is_skipped() {
        assert!(resolved(Condition::new("title", "LIKE", "")).is_empty());
        assert!(resolved(Condition::new("title", "LIKE", Value::Null)).is_empty());
    }

    #[test]
    fn test_like_structured_without_value_fails() {
        let mut query = BoolQuery::default();
        let condition = Condition::new("title", "LIKE", json!({ "analyzer": "folding" }));
        assert!(resolve(&mut query, &condition).is_err());
    }

    #[test]
    fn test_condition_from_triple() {
        let condition: Condition = ("age", ">=", 18).into();
        assert_eq!(condition.field, "age");
        assert_eq!(condition.operator, Operator::Gte);
        assert_eq!(condition.value, json!(18));
    }
}
