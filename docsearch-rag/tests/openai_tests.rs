//! OpenAI embedding provider tests against a local mock endpoint.
#![cfg(feature = "openai")]

use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use docsearch_rag::embedding::EmbeddingProvider;
use docsearch_rag::error::RagError;
use docsearch_rag::openai::OpenAIEmbeddingProvider;
use serde_json::{Value, json};

#[derive(Clone, Default)]
struct Mock {
    requests: Arc<Mutex<Vec<(String, Value)>>>,
}

async fn embeddings(
    State(mock): State<Mock>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    mock.requests.lock().unwrap().push((auth, body.clone()));

    if body["model"] == "broken-model" {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": { "message": "model not found", "type": "invalid_request_error" } })),
        );
    }

    // Answer out of order so the client has to sort by index.
    let inputs = body["input"].as_array().cloned().unwrap_or_default();
    let data: Vec<Value> = inputs
        .iter()
        .enumerate()
        .rev()
        .map(|(i, text)| {
            let len = text.as_str().map_or(0, str::len) as f32;
            json!({ "object": "embedding", "index": i, "embedding": [len, i as f32] })
        })
        .collect();
    (StatusCode::OK, Json(json!({ "object": "list", "data": data, "model": body["model"] })))
}

async fn spawn_mock() -> (String, Mock, tokio::task::JoinHandle<()>) {
    let mock = Mock::default();
    let app = Router::new().route("/v1/embeddings", post(embeddings)).with_state(mock.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind test listener");
    let addr = listener.local_addr().expect("listener addr");
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server run");
    });

    (format!("http://{addr}/v1"), mock, handle)
}

#[test]
fn defaults_and_overrides() {
    let provider = OpenAIEmbeddingProvider::new("sk-test").unwrap();
    assert_eq!(provider.model(), "text-embedding-3-small");
    assert_eq!(provider.dimensions(), 1536);

    let provider = provider.with_model("text-embedding-3-large").with_dimensions(256);
    assert_eq!(provider.model(), "text-embedding-3-large");
    assert_eq!(provider.dimensions(), 256);

    assert!(matches!(OpenAIEmbeddingProvider::new(""), Err(RagError::EmbeddingError { .. })));
}

#[tokio::test]
async fn batch_embeddings_are_returned_in_input_order() {
    let (base, mock, handle) = spawn_mock().await;
    let provider = OpenAIEmbeddingProvider::new("sk-test").unwrap().with_base_url(base);

    let vectors = provider.embed_batch(&["a", "bbb", "cc"]).await.unwrap();
    assert_eq!(vectors, vec![vec![1.0, 0.0], vec![3.0, 1.0], vec![2.0, 2.0]]);

    let requests = mock.requests.lock().unwrap();
    assert_eq!(requests[0].0, "Bearer sk-test");
    assert_eq!(requests[0].1["model"], "text-embedding-3-small");
    assert_eq!(requests[0].1["input"], json!(["a", "bbb", "cc"]));
    assert!(requests[0].1.get("dimensions").is_none());
    drop(requests);

    handle.abort();
}

#[tokio::test]
async fn single_embed_and_dimension_override_are_sent() {
    let (base, mock, handle) = spawn_mock().await;
    let provider =
        OpenAIEmbeddingProvider::new("sk-test").unwrap().with_base_url(base).with_dimensions(2);

    assert_eq!(provider.embed("hello").await.unwrap(), vec![5.0, 0.0]);
    assert_eq!(mock.requests.lock().unwrap()[0].1["dimensions"], 2);
    assert!(provider.embed_batch(&[]).await.unwrap().is_empty());
    assert_eq!(mock.requests.lock().unwrap().len(), 1);

    handle.abort();
}

#[tokio::test]
async fn api_errors_surface_the_provider_message() {
    let (base, _mock, handle) = spawn_mock().await;
    let provider = OpenAIEmbeddingProvider::new("sk-test")
        .unwrap()
        .with_base_url(base)
        .with_model("broken-model");

    let err = provider.embed("hello").await.unwrap_err();
    assert!(matches!(err, RagError::EmbeddingError { ref provider, .. } if provider == "OpenAI"));
    assert!(err.to_string().contains("model not found"));

    handle.abort();
}
