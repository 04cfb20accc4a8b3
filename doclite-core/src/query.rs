// src/query.rs
use serde_json::Value as Json;

use crate::document::Document;
use crate::error::{DocLiteError, Result};
use crate::value::Value;

/// Field-level comparison operators
#[derive(Debug, Clone)]
pub enum QueryOperator {
    Eq(Value),           // $eq
    Ne(Value),           // $ne
    Gt(Value),           // $gt
    Gte(Value),          // $gte
    Lt(Value),           // $lt
    Lte(Value),          // $lte
    In(Vec<Value>),      // $in
    Nin(Vec<Value>),     // $nin
    Exists(bool),        // $exists
    Not(Vec<QueryOperator>), // $not
}

#[derive(Debug, Clone)]
enum Clause {
    /// Every operator must hold for the value at `path`
    Field { path: String, operators: Vec<QueryOperator> },
    And(Vec<Query>),
    Or(Vec<Query>),
    Nor(Vec<Query>),
}

/// Parsed filter. An empty query matches every document.
#[derive(Debug, Clone, Default)]
pub struct Query {
    clauses: Vec<Clause>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a filter; JSON `null` is treated as the empty filter
    pub fn from_json(json: &Json) -> Result<Self> {
        let map = match json {
            Json::Null => return Ok(Query::new()),
            Json::Object(map) => map,
            other => {
                return Err(DocLiteError::invalid(format!(
                    "filter must be an object, got {}",
                    other
                )))
            }
        };

        let mut clauses = Vec::with_capacity(map.len());
        for (field, condition) in map {
            if field.starts_with('$') {
                clauses.push(Self::parse_logical_operator(field, condition)?);
            } else {
                clauses.push(Clause::Field {
                    path: field.clone(),
                    operators: Self::parse_condition(condition)?,
                });
            }
        }

        Ok(Query { clauses })
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    fn parse_logical_operator(op: &str, value: &Json) -> Result<Clause> {
        let items = match value {
            Json::Array(items) if !items.is_empty() => items,
            _ => {
                return Err(DocLiteError::invalid(format!(
                    "{} requires a non-empty array",
                    op
                )))
            }
        };
        let queries = items.iter().map(Self::from_json).collect::<Result<Vec<_>>>()?;

        match op {
            "$and" => Ok(Clause::And(queries)),
            "$or" => Ok(Clause::Or(queries)),
            "$nor" => Ok(Clause::Nor(queries)),
            _ => Err(DocLiteError::invalid(format!("unknown top-level operator: {}", op))),
        }
    }

    /// A literal means equality; an operator sub-mapping may hold several
    /// operators which are all required to hold.
    fn parse_condition(condition: &Json) -> Result<Vec<QueryOperator>> {
        match condition {
            Json::Object(map) if is_operator_map(map) => {
                map.iter().map(|(op, val)| Self::parse_operator(op, val)).collect()
            }
            Json::Object(map) if map.keys().any(|k| k.starts_with('$')) => {
                match Value::from_extended_json(map) {
                    Some(literal) => Ok(vec![QueryOperator::Eq(literal)]),
                    None => Err(DocLiteError::invalid(
                        "cannot mix operators and plain fields in a field condition",
                    )),
                }
            }
            literal => Ok(vec![QueryOperator::Eq(Value::from(literal))]),
        }
    }

    fn parse_operator(op: &str, val: &Json) -> Result<QueryOperator> {
        match op {
            "$eq" => Ok(QueryOperator::Eq(Value::from(val))),
            "$ne" => Ok(QueryOperator::Ne(Value::from(val))),
            "$gt" => Ok(QueryOperator::Gt(Value::from(val))),
            "$gte" => Ok(QueryOperator::Gte(Value::from(val))),
            "$lt" => Ok(QueryOperator::Lt(Value::from(val))),
            "$lte" => Ok(QueryOperator::Lte(Value::from(val))),
            "$in" | "$nin" => {
                let Json::Array(items) = val else {
                    return Err(DocLiteError::invalid(format!("{} requires an array", op)));
                };
                let values = items.iter().map(Value::from).collect();
                if op == "$in" {
                    Ok(QueryOperator::In(values))
                } else {
                    Ok(QueryOperator::Nin(values))
                }
            }
            "$exists" => match val {
                Json::Bool(b) => Ok(QueryOperator::Exists(*b)),
                Json::Number(n) => Ok(QueryOperator::Exists(n.as_f64() != Some(0.0))),
                _ => Err(DocLiteError::invalid("$exists requires a bool")),
            },
            "$not" => match val {
                Json::Object(map) if is_operator_map(map) => Ok(QueryOperator::Not(
                    map.iter()
                        .map(|(op, val)| Self::parse_operator(op, val))
                        .collect::<Result<Vec<_>>>()?,
                )),
                _ => Err(DocLiteError::invalid("$not requires an operator document")),
            },
            _ => Err(DocLiteError::invalid(format!("unknown operator: {}", op))),
        }
    }

    /// Whether a document satisfies every clause
    pub fn matches(&self, document: &Document) -> bool {
        self.clauses.iter().all(|clause| match clause {
            Clause::Field { path, operators } => {
                let value = document.get(path);
                operators.iter().all(|op| Self::matches_operator(value, op))
            }
            Clause::And(queries) => queries.iter().all(|q| q.matches(document)),
            Clause::Or(queries) => queries.iter().any(|q| q.matches(document)),
            Clause::Nor(queries) => !queries.iter().any(|q| q.matches(document)),
        })
    }

    fn matches_operator(value: Option<&Value>, operator: &QueryOperator) -> bool {
        use std::cmp::Ordering::{Equal, Greater, Less};

        match operator {
            QueryOperator::Eq(target) => value.map_or(false, |v| equals_or_contains(v, target)),
            QueryOperator::Ne(target) => !value.map_or(false, |v| equals_or_contains(v, target)),
            QueryOperator::Gt(target) => {
                value.map_or(false, |v| any_element(v, |x| x.compare(target) == Some(Greater)))
            }
            QueryOperator::Gte(target) => value.map_or(false, |v| {
                any_element(v, |x| matches!(x.compare(target), Some(Greater | Equal)))
            }),
            QueryOperator::Lt(target) => {
                value.map_or(false, |v| any_element(v, |x| x.compare(target) == Some(Less)))
            }
            QueryOperator::Lte(target) => value.map_or(false, |v| {
                any_element(v, |x| matches!(x.compare(target), Some(Less | Equal)))
            }),
            QueryOperator::In(targets) => {
                value.map_or(false, |v| targets.iter().any(|t| equals_or_contains(v, t)))
            }
            QueryOperator::Nin(targets) => {
                !value.map_or(false, |v| targets.iter().any(|t| equals_or_contains(v, t)))
            }
            QueryOperator::Exists(should_exist) => value.is_some() == *should_exist,
            QueryOperator::Not(inner) => !inner.iter().all(|op| Self::matches_operator(value, op)),
        }
    }

    /// Equality clauses (`{field: literal}` or `$eq`), used to seed upserts
    pub fn equality_fields(&self) -> Vec<(String, Value)> {
        let mut fields = Vec::new();
        for clause in &self.clauses {
            match clause {
                Clause::Field { path, operators } => {
                    for op in operators {
                        if let QueryOperator::Eq(value) = op {
                            fields.push((path.clone(), value.clone()));
                        }
                    }
                }
                Clause::And(queries) => {
                    for q in queries {
                        fields.extend(q.equality_fields());
                    }
                }
                Clause::Or(_) | Clause::Nor(_) => {}
            }
        }
        fields
    }
}

/// Non-empty mapping whose keys are all query/update operators
pub(crate) fn is_operator_map(map: &serde_json::Map<String, Json>) -> bool {
    !map.is_empty()
        && map.keys().all(|k| k.starts_with('$'))
        && Value::from_extended_json(map).is_none()
}

fn equals_or_contains(value: &Value, target: &Value) -> bool {
    if value.loosely_equals(target) {
        return true;
    }
    match value {
        Value::Array(items) => items.iter().any(|item| item.loosely_equals(target)),
        _ => false,
    }
}

fn any_element(value: &Value, pred: impl Fn(&Value) -> bool) -> bool {
    match value {
        Value::Array(items) => items.iter().any(&pred),
        other => pred(other),
    }
}

/// Incremental filter construction.
///
/// Appending a field twice merges the two operator sub-mappings instead of
/// overwriting the first, so `age <= 50` and `age >= 10` become one range.
/// A literal (or a mix of literal and operators) replaces the earlier entry.
#[derive(Debug, Clone, Default)]
pub struct FilterBuilder {
    map: serde_json::Map<String, Json>,
}

impl FilterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(mut self, field: impl Into<String>, condition: Json) -> Self {
        let field = field.into();
        let merged = match (self.map.get_mut(&field), &condition) {
            (Some(Json::Object(existing)), Json::Object(incoming))
                if is_operator_map(existing) && is_operator_map(incoming) =>
            {
                for (op, val) in incoming {
                    existing.insert(op.clone(), val.clone());
                }
                true
            }
            _ => false,
        };
        if !merged {
            self.map.insert(field, condition);
        }
        self
    }

    pub fn build(self) -> Json {
        Json::Object(self.map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(json: Json) -> Document {
        Document::from_json(&json).unwrap()
    }

    fn query(json: Json) -> Query {
        Query::from_json(&json).unwrap()
    }

    #[test]
    fn test_query_eq_operator() {
        let q = query(json!({"name": "Alice"}));
        assert!(q.matches(&doc(json!({"name": "Alice"}))));
        assert!(!q.matches(&doc(json!({"name": "Bob"}))));
        assert!(!q.matches(&doc(json!({"age": 3}))));
    }

    #[test]
    fn test_empty_and_null_filters_match_everything() {
        assert!(query(json!({})).matches(&doc(json!({"a": 1}))));
        assert!(query(Json::Null).matches(&Document::new()));
        assert!(query(Json::Null).is_empty());
    }

    #[test]
    fn test_non_object_filter_is_rejected() {
        assert!(Query::from_json(&json!("name")).is_err());
        assert!(Query::from_json(&json!([1])).is_err());
    }

    #[test]
    fn test_range_in_one_sub_mapping() {
        let q = query(json!({"age": {"$gte": 10, "$lte": 50}}));
        assert!(q.matches(&doc(json!({"age": 20}))));
        assert!(q.matches(&doc(json!({"age": 50}))));
        assert!(q.matches(&doc(json!({"age": 10.0}))));
        assert!(!q.matches(&doc(json!({"age": 60}))));
        assert!(!q.matches(&doc(json!({"age": 5}))));
    }

    #[test]
    fn test_missing_field_fails_closed() {
        let doc = doc(json!({"name": "x"}));
        for filter in [
            json!({"age": {"$gte": 0}}),
            json!({"age": {"$lte": 0}}),
            json!({"age": {"$gt": 0}}),
            json!({"age": {"$lt": 0}}),
            json!({"age": 0}),
            json!({"age": null}),
            json!({"age": {"$in": [0, null]}}),
        ] {
            assert!(!query(filter.clone()).matches(&doc), "{} should not match", filter);
        }
    }

    #[test]
    fn test_negations_match_missing_field() {
        let doc = doc(json!({"name": "x"}));
        assert!(query(json!({"age": {"$ne": 3}})).matches(&doc));
        assert!(query(json!({"age": {"$nin": [3]}})).matches(&doc));
        assert!(query(json!({"age": {"$exists": false}})).matches(&doc));
        assert!(!query(json!({"age": {"$exists": true}})).matches(&doc));
    }

    #[test]
    fn test_incomparable_types_do_not_match_ranges() {
        let q = query(json!({"age": {"$gte": 10}}));
        assert!(!q.matches(&doc(json!({"age": "20"}))));
        assert!(!q.matches(&doc(json!({"age": true}))));
    }

    #[test]
    fn test_in_and_nin() {
        let q = query(json!({"city": {"$in": ["NYC", "LA"]}}));
        assert!(q.matches(&doc(json!({"city": "LA"}))));
        assert!(!q.matches(&doc(json!({"city": "SF"}))));

        let q = query(json!({"city": {"$nin": ["NYC", "LA"]}}));
        assert!(q.matches(&doc(json!({"city": "SF"}))));
        assert!(!q.matches(&doc(json!({"city": "NYC"}))));
    }

    #[test]
    fn test_array_field_equality_matches_any_element() {
        let d = doc(json!({"books": ["JS", "JAVA", "C#"]}));
        assert!(query(json!({"books": "JAVA"})).matches(&d));
        assert!(query(json!({"books": ["JS", "JAVA", "C#"]})).matches(&d));
        assert!(!query(json!({"books": "RUST"})).matches(&d));
        assert!(!query(json!({"books": {"$ne": "JS"}})).matches(&d));
    }

    #[test]
    fn test_dotted_path() {
        let d = doc(json!({"location": {"x": 10, "y": 5}}));
        assert!(query(json!({"location.x": {"$gte": 10}})).matches(&d));
        assert!(!query(json!({"location.y": {"$gt": 5}})).matches(&d));
    }

    #[test]
    fn test_nested_document_equality() {
        let d = doc(json!({"location": {"x": 10, "y": 5}}));
        assert!(query(json!({"location": {"x": 10, "y": 5}})).matches(&d));
        assert!(!query(json!({"location": {"x": 10}})).matches(&d));
        // exact match: same field order, numbers widen like top-level values
        assert!(!query(json!({"location": {"y": 5, "x": 10}})).matches(&d));
        assert!(query(json!({"location": {"x": 10.0, "y": 5}})).matches(&d));
    }

    #[test]
    fn test_logical_operators() {
        let d = doc(json!({"age": 30, "city": "NYC"}));
        assert!(query(json!({"$or": [{"age": 1}, {"city": "NYC"}]})).matches(&d));
        assert!(query(json!({"$and": [{"age": 30}, {"city": "NYC"}]})).matches(&d));
        assert!(!query(json!({"$nor": [{"age": 30}]})).matches(&d));
        assert!(query(json!({"age": {"$not": {"$gt": 40}}})).matches(&d));
    }

    #[test]
    fn test_invalid_operators_are_rejected() {
        assert!(Query::from_json(&json!({"age": {"$between": [1, 2]}})).is_err());
        assert!(Query::from_json(&json!({"age": {"$in": 3}})).is_err());
        assert!(Query::from_json(&json!({"$or": {}})).is_err());
        assert!(Query::from_json(&json!({"$xor": [{}]})).is_err());
        assert!(Query::from_json(&json!({"age": {"$gt": 1, "plain": 2}})).is_err());
    }

    #[test]
    fn test_extended_json_literal_is_equality() {
        let d = doc(json!({"addTime": {"$date": "2014-08-04T21:01:00Z"}}));
        assert!(query(json!({"addTime": {"$date": "2014-08-04T21:01:00.000Z"}})).matches(&d));
        assert!(query(json!({"addTime": {"$lt": {"$date": "2015-01-01T00:00:00Z"}}})).matches(&d));
    }

    #[test]
    fn test_equality_fields() {
        let q = query(json!({
            "name": "a",
            "age": {"$gte": 3},
            "kind": {"$eq": "b"},
            "$and": [{"team": "c"}],
            "$or": [{"x": 1}]
        }));
        let fields = q.equality_fields();
        let names: Vec<&str> = fields.iter().map(|(f, _)| f.as_str()).collect();
        assert_eq!(names, vec!["name", "kind", "team"]);
    }

    #[test]
    fn test_filter_builder_merges_operator_fragments() {
        let filter = FilterBuilder::new()
            .append("age", json!({"$lte": 50}))
            .append("age", json!({"$gte": 10}))
            .build();
        assert_eq!(filter, json!({"age": {"$lte": 50, "$gte": 10}}));
    }

    #[test]
    fn test_filter_builder_literal_overwrites() {
        let filter = FilterBuilder::new()
            .append("age", json!({"$lte": 50}))
            .append("age", json!(20))
            .append("name", json!("x"))
            .build();
        assert_eq!(filter, json!({"age": 20, "name": "x"}));
    }
}
