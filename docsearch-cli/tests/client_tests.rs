//! Client behaviour against a local mock of the docsearch API.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use docsearch_cli::DocsearchClient;
use serde_json::{Value, json};

#[derive(Clone, Default)]
struct Mock {
    uploads: Arc<AtomicUsize>,
}

async fn upload(State(mock): State<Mock>, mut multipart: Multipart) -> (StatusCode, Json<Value>) {
    mock.uploads.fetch_add(1, Ordering::SeqCst);
    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() == Some("file") {
            let filename = field.file_name().unwrap_or_default().to_string();
            let size = field.bytes().await.map(|b| b.len()).unwrap_or_default();
            return (
                StatusCode::CREATED,
                Json(json!({
                    "success": true,
                    "doc_id": "doc-1",
                    "filename": filename,
                    "chunks_created": size,
                    "message": "Document processed and stored successfully"
                })),
            );
        }
    }
    (StatusCode::BAD_REQUEST, Json(json!({"error": "No file provided"})))
}

async fn search(Json(body): Json<Value>) -> Json<Value> {
    Json(json!({"success": true, "query": body["query"], "results": [], "total_results": 0, "echo": body}))
}

async fn similar(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    let doc_id = body["doc_id"].as_str().unwrap_or_default().to_string();
    (StatusCode::NOT_FOUND, Json(json!({"error": format!("Document with ID {doc_id} not found")})))
}

async fn remove(Path(doc_id): Path<String>) -> Json<Value> {
    Json(json!({"success": true, "message": format!("Document {doc_id} deleted successfully")}))
}

async fn spawn_mock() -> (String, Mock, tokio::task::JoinHandle<()>) {
    let mock = Mock::default();
    let app = Router::new()
        .route("/health", get(|| async { Json(json!({"status": "healthy", "service": "docsearch-server"})) }))
        .route(
            "/api/documents",
            post(upload).get(|| async {
                (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": "Failed to list documents: boom"})))
            }),
        )
        .route("/api/documents/{doc_id}", delete(remove))
        .route("/api/search", post(search))
        .route("/api/search/similar", post(similar))
        .route("/api/search/stats", get(|| async { (StatusCode::BAD_GATEWAY, "upstream down") }))
        .with_state(mock.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("listener addr");

    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server run");
    });

    (format!("http://{}", addr), mock, handle)
}

fn client(base: &str) -> DocsearchClient {
    DocsearchClient::new(base, Duration::from_secs(5)).expect("client")
}

#[tokio::test]
async fn health_check_passes_through_json() {
    let (base, _mock, handle) = spawn_mock().await;

    let health = client(&base).health_check().await;
    assert_eq!(health["status"], json!("healthy"));

    handle.abort();
}

#[tokio::test]
async fn unreachable_server_becomes_error_payload() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let health = client(&format!("http://{}", addr)).health_check().await;
    let error = health["error"].as_str().expect("error field");
    assert!(error.starts_with("Health check failed: "), "{error}");
}

#[tokio::test]
async fn upload_sends_multipart_file() {
    let (base, mock, handle) = spawn_mock().await;
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("notes.txt");
    std::fs::write(&path, "hello world").expect("write");

    let resp = client(&base).upload_document(&path).await;
    assert_eq!(resp["filename"], json!("notes.txt"));
    assert_eq!(resp["chunks_created"], json!(11));
    assert_eq!(mock.uploads.load(Ordering::SeqCst), 1);

    handle.abort();
}

#[tokio::test]
async fn upload_rejects_locally_before_any_request() {
    let (base, mock, handle) = spawn_mock().await;
    let dir = tempfile::tempdir().expect("tempdir");
    let client = client(&base);

    let missing = client.upload_document(dir.path().join("missing.pdf")).await;
    assert_eq!(missing, json!({"error": "File not found"}));

    let exe = dir.path().join("tool.exe");
    std::fs::write(&exe, "MZ").expect("write");
    let unsupported = client.upload_document(&exe).await;
    assert_eq!(unsupported, json!({"error": "File type not supported"}));

    assert_eq!(mock.uploads.load(Ordering::SeqCst), 0);
    handle.abort();
}

#[tokio::test]
async fn search_sends_query_k_and_non_empty_filter() {
    let (base, _mock, handle) = spawn_mock().await;
    let client = client(&base);

    let plain = client.search_documents("rockets", 3, None).await;
    assert_eq!(plain["echo"], json!({"query": "rockets", "k": 3}));

    let empty_filter = client.search_documents("rockets", 3, Some(json!({}))).await;
    assert!(empty_filter["echo"].get("filter").is_none());

    let filtered = client.search_documents("rockets", 2, Some(json!({"doc_id": "d1"}))).await;
    assert_eq!(filtered["echo"]["filter"], json!({"doc_id": "d1"}));

    handle.abort();
}

#[tokio::test]
async fn http_errors_carry_context_and_server_message() {
    let (base, _mock, handle) = spawn_mock().await;
    let client = client(&base);

    let similar = client.find_similar_documents("ghost", 5).await;
    assert_eq!(
        similar,
        json!({"error": "Similar search failed: HTTP 404 Not Found: Document with ID ghost not found"})
    );

    let listing = client.list_documents().await;
    assert_eq!(
        listing,
        json!({"error": "Failed to list documents: HTTP 500 Internal Server Error: Failed to list documents: boom"})
    );

    let stats = client.get_search_stats().await;
    assert_eq!(stats, json!({"error": "Failed to get stats: HTTP 502 Bad Gateway: upstream down"}));

    handle.abort();
}

#[tokio::test]
async fn delete_targets_document_path() {
    let (base, _mock, handle) = spawn_mock().await;

    let resp = client(&format!("{base}/")).delete_document("doc-9").await;
    assert_eq!(resp["message"], json!("Document doc-9 deleted successfully"));

    handle.abort();
}

#[tokio::test]
async fn delete_encodes_reserved_characters_in_id() {
    let (base, _mock, handle) = spawn_mock().await;

    let resp = client(&base).delete_document("a/b?c#d %").await;
    assert_eq!(resp["message"], json!("Document a/b?c#d % deleted successfully"));

    handle.abort();
}

#[tokio::test]
async fn delete_with_unparseable_server_url_is_an_error_value() {
    let resp = client("not a url").delete_document("doc-9").await;
    assert_eq!(resp["error"], json!("Delete failed: invalid server URL not a url"));
}
