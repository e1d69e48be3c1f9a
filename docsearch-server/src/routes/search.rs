//! Semantic search, similar-document lookup and index statistics.

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use docsearch_rag::{MetadataFilter, RagError};
use serde_json::{Map, Value, json};
use tracing::debug;

use crate::error::ApiError;
use crate::state::AppState;

/// Largest `k` a search request may ask for.
pub const MAX_RESULTS: usize = 10_000;

/// Parse a request body as a JSON object; anything else yields `None`.
fn json_object(body: &[u8]) -> Option<Map<String, Value>> {
    match serde_json::from_slice(body) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// Read `k` from a request object, falling back to `default` when absent.
/// Values above [`MAX_RESULTS`] are rejected.
fn result_count(body: &Map<String, Value>, default: usize) -> Result<usize, ApiError> {
    let k = match body.get("k") {
        None | Some(Value::Null) => return Ok(default),
        Some(value) => value
            .as_u64()
            .filter(|k| *k > 0)
            .ok_or_else(|| ApiError::bad_request("k must be a positive integer"))?,
    };
    match usize::try_from(k) {
        Ok(k) if k <= MAX_RESULTS => Ok(k),
        _ => Err(ApiError::bad_request(format!("k must not exceed {MAX_RESULTS}"))),
    }
}

/// Non-empty string field, or `None`.
fn required_str<'a>(body: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    body.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
}

/// `POST /api/search` with `{query, k?, filter?}`.
pub async fn search_documents(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let body = json_object(&body).ok_or_else(|| ApiError::bad_request("Query is required"))?;
    let query = required_str(&body, "query").ok_or_else(|| ApiError::bad_request("Query is required"))?;
    let k = result_count(&body, state.settings.default_search_results)?;

    let filter = match body.get("filter") {
        None | Some(Value::Null) => None,
        Some(Value::Object(map)) => Some(MetadataFilter::from_map(map.clone())),
        Some(_) => return Err(ApiError::bad_request("filter must be an object")),
    };

    debug!(query, k, filtered = filter.is_some(), "search request");
    let results = state
        .manager
        .similarity_search(query, k, filter.as_ref())
        .await
        .map_err(|e| ApiError::internal("Search failed", e))?;

    Ok(Json(json!({
        "success": true,
        "query": query,
        "total_results": results.len(),
        "results": results,
    })))
}

/// `POST /api/search/similar` with `{doc_id, k?}`.
pub async fn find_similar_documents(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let body =
        json_object(&body).ok_or_else(|| ApiError::bad_request("Document ID is required"))?;
    let doc_id =
        required_str(&body, "doc_id").ok_or_else(|| ApiError::bad_request("Document ID is required"))?;
    let k = result_count(&body, state.settings.default_search_results)?;

    let results = match state.manager.find_similar_documents(doc_id, k).await {
        Ok(results) => results,
        Err(RagError::DocumentNotFound(_)) => {
            return Err(ApiError::not_found(format!("Document with ID {doc_id} not found")));
        }
        Err(e) => return Err(ApiError::internal("Failed to find similar documents", e)),
    };

    Ok(Json(json!({
        "success": true,
        "reference_doc_id": doc_id,
        "total_results": results.len(),
        "similar_documents": results,
    })))
}

/// `GET /api/search/stats`
pub async fn get_search_stats(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let stats = state
        .manager
        .get_stats()
        .await
        .map_err(|e| ApiError::internal("Failed to get stats", e))?;

    Ok(Json(json!({ "success": true, "stats": stats })))
}
