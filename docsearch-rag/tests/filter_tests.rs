//! Tests for local evaluation of metadata filters.

use docsearch_rag::document::Metadata;
use docsearch_rag::filter::MetadataFilter;
use serde_json::{Value, json};

fn metadata(value: Value) -> Metadata {
    match value {
        Value::Object(map) => map,
        _ => panic!("metadata must be an object"),
    }
}

fn filter(value: Value) -> MetadataFilter {
    MetadataFilter::from_map(metadata(value))
}

#[test]
fn empty_filter_matches_everything() {
    assert!(MetadataFilter::new().matches(&Metadata::new()));
    assert!(MetadataFilter::new().matches(&metadata(json!({"doc_id": "a"}))));
}

#[test]
fn builders_produce_provider_dialect() {
    assert_eq!(MetadataFilter::eq("doc_id", "a").to_value(), json!({"doc_id": {"$eq": "a"}}));
    assert_eq!(MetadataFilter::ne("doc_id", "a").to_value(), json!({"doc_id": {"$ne": "a"}}));
    assert_eq!(
        serde_json::to_value(MetadataFilter::eq("page", 2)).unwrap(),
        json!({"page": {"$eq": 2}})
    );
}

#[test]
fn equality_and_inequality() {
    let chunk = metadata(json!({"doc_id": "a", "page": 2}));
    assert!(MetadataFilter::eq("doc_id", "a").matches(&chunk));
    assert!(!MetadataFilter::eq("doc_id", "b").matches(&chunk));
    assert!(filter(json!({"doc_id": "a"})).matches(&chunk));
    assert!(MetadataFilter::ne("doc_id", "b").matches(&chunk));
    assert!(!MetadataFilter::ne("doc_id", "a").matches(&chunk));
    // integer and float spellings compare equal
    assert!(MetadataFilter::eq("page", 2.0).matches(&chunk));
}

#[test]
fn ne_matches_missing_field() {
    assert!(MetadataFilter::ne("doc_id", "a").matches(&Metadata::new()));
    assert!(!MetadataFilter::eq("doc_id", "a").matches(&Metadata::new()));
}

#[test]
fn set_membership() {
    let chunk = metadata(json!({"sheet": "Q1"}));
    assert!(filter(json!({"sheet": {"$in": ["Q1", "Q2"]}})).matches(&chunk));
    assert!(!filter(json!({"sheet": {"$nin": ["Q1", "Q2"]}})).matches(&chunk));
    assert!(filter(json!({"sheet": {"$nin": ["Q3"]}})).matches(&chunk));
}

#[test]
fn numeric_ranges() {
    let chunk = metadata(json!({"page": 4}));
    assert!(filter(json!({"page": {"$gt": 3, "$lte": 4}})).matches(&chunk));
    assert!(!filter(json!({"page": {"$lt": 4}})).matches(&chunk));
    assert!(filter(json!({"page": {"$gte": 4}})).matches(&chunk));
    // ranges never match non-numeric values
    assert!(!filter(json!({"page": {"$gt": 1}})).matches(&metadata(json!({"page": "4"}))));
}

#[test]
fn exists_operator() {
    let chunk = metadata(json!({"page": 0}));
    assert!(filter(json!({"page": {"$exists": true}})).matches(&chunk));
    assert!(filter(json!({"sheet": {"$exists": false}})).matches(&chunk));
    assert!(!filter(json!({"sheet": {"$exists": true}})).matches(&chunk));
}

#[test]
fn logical_combinators() {
    let chunk = metadata(json!({"doc_id": "a", "page": 1}));
    assert!(filter(json!({"$or": [{"doc_id": "x"}, {"page": {"$eq": 1}}]})).matches(&chunk));
    assert!(!filter(json!({"$and": [{"doc_id": "a"}, {"page": {"$gt": 1}}]})).matches(&chunk));
    assert!(filter(json!({"$and": [{"doc_id": "a"}, {"page": {"$lt": 2}}]})).matches(&chunk));
}

#[test]
fn unknown_operator_never_matches() {
    let chunk = metadata(json!({"doc_id": "a"}));
    assert!(!filter(json!({"doc_id": {"$regex": "a"}})).matches(&chunk));
}
