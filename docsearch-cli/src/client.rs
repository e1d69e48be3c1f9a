//! HTTP client for the docsearch API.
//!
//! Every method resolves to a JSON value. Failures never surface as `Err`:
//! they come back as `{"error": "<context>: <message>"}` so the caller can
//! render success and failure the same way.

use std::path::Path;
use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde_json::{Value, json};
use thiserror::Error;
use tracing::debug;

/// File types the server accepts.
pub const SUPPORTED_EXTENSIONS: [&str; 4] = ["pdf", "txt", "docx", "xlsx"];

pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:5000";

#[derive(Debug, Error)]
enum CallError {
    #[error(transparent)]
    Transport(#[from] reqwest::Error),

    #[error("HTTP {status}: {message}")]
    Status { status: StatusCode, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("invalid server URL {0}")]
    BaseUrl(String),
}

/// Whether `path` has an extension the server accepts.
pub fn is_supported_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
}

pub struct DocsearchClient {
    http: Client,
    base_url: String,
}

impl DocsearchClient {
    /// Create a client for `base_url` with a per-request timeout.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> reqwest::Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self { http, base_url: base_url.into().trim_end_matches('/').to_string() })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// `{base_url}/api/documents/{doc_id}` with `doc_id` as one
    /// percent-encoded path segment.
    fn document_url(&self, doc_id: &str) -> Result<Url, CallError> {
        let invalid = || CallError::BaseUrl(self.base_url.clone());
        let mut url = Url::parse(&self.base_url).map_err(|_| invalid())?;
        url.path_segments_mut()
            .map_err(|()| invalid())?
            .pop_if_empty()
            .extend(["api", "documents", doc_id]);
        Ok(url)
    }

    pub async fn health_check(&self) -> Value {
        self.call(self.http.get(self.url("/health")), "Health check failed").await
    }

    /// Upload a local file. Missing and unsupported files are rejected
    /// before any request is made.
    pub async fn upload_document(&self, path: impl AsRef<Path>) -> Value {
        let path = path.as_ref();
        if !path.exists() {
            return json!({ "error": "File not found" });
        }
        if !is_supported_file(path) {
            return json!({ "error": "File type not supported" });
        }

        let data = match tokio::fs::read(path).await {
            Ok(data) => data,
            Err(e) => return failure("Upload failed", CallError::Io(e)),
        };
        let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        let form = Form::new().part("file", Part::bytes(data).file_name(name));

        self.call(self.http.post(self.url("/api/documents")).multipart(form), "Upload failed").await
    }

    pub async fn list_documents(&self) -> Value {
        self.call(self.http.get(self.url("/api/documents")), "Failed to list documents").await
    }

    pub async fn search_documents(&self, query: &str, k: usize, filter: Option<Value>) -> Value {
        let mut body = json!({ "query": query, "k": k });
        if let Some(filter) = filter.filter(|f| f.as_object().is_some_and(|m| !m.is_empty())) {
            body["filter"] = filter;
        }
        self.call(self.http.post(self.url("/api/search")).json(&body), "Search failed").await
    }

    pub async fn find_similar_documents(&self, doc_id: &str, k: usize) -> Value {
        let body = json!({ "doc_id": doc_id, "k": k });
        self.call(self.http.post(self.url("/api/search/similar")).json(&body), "Similar search failed")
            .await
    }

    pub async fn delete_document(&self, doc_id: &str) -> Value {
        match self.document_url(doc_id) {
            Ok(url) => self.call(self.http.delete(url), "Delete failed").await,
            Err(e) => failure("Delete failed", e),
        }
    }

    pub async fn get_search_stats(&self) -> Value {
        self.call(self.http.get(self.url("/api/search/stats")), "Failed to get stats").await
    }

    async fn call(&self, request: RequestBuilder, context: &str) -> Value {
        match send(request).await {
            Ok(body) => body,
            Err(e) => failure(context, e),
        }
    }
}

async fn send(request: RequestBuilder) -> Result<Value, CallError> {
    let response = request.send().await?;
    let status = response.status();
    debug!(url = %response.url(), %status, "docsearch response");

    if status.is_success() {
        return Ok(response.json().await?);
    }

    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<Value>(&text)
        .ok()
        .and_then(|body| body.get("error").and_then(Value::as_str).map(str::to_string))
        .unwrap_or(text);
    Err(CallError::Status { status, message })
}

fn failure(context: &str, err: CallError) -> Value {
    debug!(context, error = %err, "request failed");
    json!({ "error": format!("{context}: {err}") })
}
