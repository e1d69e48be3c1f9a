//! Metadata filters in the Pinecone filter dialect.
//!
//! A [`MetadataFilter`] is a JSON object such as
//! `{"doc_id": {"$ne": "abc"}, "page": {"$gte": 2}}`. Remote backends receive
//! it verbatim; [`MetadataFilter::matches`] evaluates it locally for the
//! in-memory backend.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::document::Metadata;

/// A metadata predicate over stored chunks.
///
/// An empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetadataFilter(Map<String, Value>);

impl MetadataFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an already-built filter object.
    pub fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// `key == value`
    pub fn eq(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new().and(key, json!({ "$eq": value.into() }))
    }

    /// `key != value` (also true when `key` is absent).
    pub fn ne(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new().and(key, json!({ "$ne": value.into() }))
    }

    /// Add a condition on `key`, replacing any existing one.
    pub fn and(mut self, key: impl Into<String>, condition: Value) -> Self {
        self.0.insert(key.into(), condition);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }

    /// Evaluate the filter against chunk metadata.
    pub fn matches(&self, metadata: &Metadata) -> bool {
        matches_object(&self.0, metadata)
    }
}

fn matches_object(filter: &Map<String, Value>, metadata: &Metadata) -> bool {
    filter.iter().all(|(key, condition)| match key.as_str() {
        "$and" => clauses(condition).all(|clause| matches_object(clause, metadata)),
        "$or" => clauses(condition).any(|clause| matches_object(clause, metadata)),
        field => matches_field(metadata.get(field), condition),
    })
}

fn clauses(value: &Value) -> impl Iterator<Item = &Map<String, Value>> {
    value.as_array().into_iter().flatten().filter_map(Value::as_object)
}

fn matches_field(actual: Option<&Value>, condition: &Value) -> bool {
    match condition {
        Value::Object(ops) if ops.keys().all(|k| k.starts_with('$')) => {
            ops.iter().all(|(op, operand)| apply_operator(op, actual, operand))
        }
        expected => actual.is_some_and(|a| values_equal(a, expected)),
    }
}

fn apply_operator(op: &str, actual: Option<&Value>, operand: &Value) -> bool {
    match op {
        "$eq" => actual.is_some_and(|a| values_equal(a, operand)),
        "$ne" => !actual.is_some_and(|a| values_equal(a, operand)),
        "$in" => actual.is_some_and(|a| contains(operand, a)),
        "$nin" => !actual.is_some_and(|a| contains(operand, a)),
        "$gt" => compare(actual, operand).is_some_and(|o| o.is_gt()),
        "$gte" => compare(actual, operand).is_some_and(|o| o.is_ge()),
        "$lt" => compare(actual, operand).is_some_and(|o| o.is_lt()),
        "$lte" => compare(actual, operand).is_some_and(|o| o.is_le()),
        "$exists" => operand.as_bool().is_some_and(|wanted| wanted == actual.is_some()),
        _ => false,
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

fn contains(list: &Value, needle: &Value) -> bool {
    list.as_array().is_some_and(|items| items.iter().any(|item| values_equal(item, needle)))
}

fn compare(actual: Option<&Value>, operand: &Value) -> Option<std::cmp::Ordering> {
    actual?.as_f64()?.partial_cmp(&operand.as_f64()?)
}
