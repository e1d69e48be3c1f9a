//! Embeddings over the OpenAI REST API (`openai` feature).

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error};

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};

const PROVIDER: &str = "OpenAI";
const API_KEY_VAR: &str = "OPENAI_API_KEY";

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
/// Native output size of [`DEFAULT_EMBEDDING_MODEL`].
pub const DEFAULT_EMBEDDING_DIMENSION: usize = 1536;

/// Calls `POST {base_url}/embeddings` with bearer auth.
///
/// Holds one pooled `reqwest::Client`; build a single provider and share it.
///
/// ```rust,ignore
/// let provider = OpenAIEmbeddingProvider::new(api_key)?
///     .with_model("text-embedding-3-small")
///     .with_timeout(Duration::from_secs(30))?;
/// let vector = provider.embed("quarterly revenue").await?;
/// ```
pub struct OpenAIEmbeddingProvider {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    dimension: usize,
    /// Sent as `dimensions` when the output should be shortened.
    shortened_to: Option<usize>,
}

impl OpenAIEmbeddingProvider {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(RagError::embedding(PROVIDER, "API key must not be empty"));
        }
        Ok(Self {
            http: reqwest::Client::new(),
            api_key,
            base_url: OPENAI_BASE_URL.to_string(),
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
            dimension: DEFAULT_EMBEDDING_DIMENSION,
            shortened_to: None,
        })
    }

    /// Read the key from `OPENAI_API_KEY`.
    pub fn from_env() -> Result<Self> {
        match std::env::var(API_KEY_VAR) {
            Ok(key) => Self::new(key),
            Err(_) => Err(RagError::embedding(PROVIDER, format!("{API_KEY_VAR} is not set"))),
        }
    }

    pub fn with_model(self, model: impl Into<String>) -> Self {
        Self { model: model.into(), ..self }
    }

    /// Ask the API for shortened vectors of `dimension` entries.
    pub fn with_dimensions(self, dimension: usize) -> Self {
        Self { dimension, shortened_to: Some(dimension), ..self }
    }

    pub fn with_base_url(self, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url, ..self }
    }

    /// Rebuild the HTTP client with a per-request timeout.
    pub fn with_timeout(self, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RagError::embedding(PROVIDER, format!("cannot build HTTP client: {e}")))?;
        Ok(Self { http, ..self })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn request(&self, input: &[&str]) -> Result<Vec<Vec<f32>>> {
        let url = format!("{}/embeddings", self.base_url);
        let body = EmbeddingsRequest { model: &self.model, input, dimensions: self.shortened_to };
        debug!(provider = PROVIDER, model = %self.model, inputs = input.len(), "requesting embeddings");

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| fail(format!("request to {url} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(fail(format!("API returned {status}: {}", api_message(&text))));
        }

        let mut parsed: EmbeddingsResponse =
            response.json().await.map_err(|e| fail(format!("unreadable response: {e}")))?;
        if parsed.data.len() != input.len() {
            return Err(fail(format!(
                "sent {} inputs but received {} embeddings",
                input.len(),
                parsed.data.len()
            )));
        }

        parsed.data.sort_by_key(|item| item.index);
        Ok(parsed.data.into_iter().map(|item| item.embedding).collect())
    }
}

fn fail(message: String) -> RagError {
    error!(provider = PROVIDER, %message, "embedding call failed");
    RagError::embedding(PROVIDER, message)
}

/// `error.message` from an OpenAI error body, or the raw body.
fn api_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.pointer("/error/message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}

#[derive(Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Deserialize)]
struct EmbeddingItem {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

#[async_trait]
impl EmbeddingProvider for OpenAIEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.request(&[text])
            .await?
            .pop()
            .ok_or_else(|| fail("no embedding returned".to_string()))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.request(texts).await
    }

    fn dimensions(&self) -> usize {
        self.dimension
    }
}
