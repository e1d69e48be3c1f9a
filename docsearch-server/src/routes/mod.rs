//! HTTP handlers.

pub mod documents;
pub mod search;

use axum::Json;
use serde_json::{Value, json};

pub const SERVICE_NAME: &str = "docsearch-server";

/// `GET /health`
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy", "service": SERVICE_NAME }))
}
