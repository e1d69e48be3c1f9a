//! Pinecone vector index backend.
//!
//! Provides [`PineconeClient`] (control plane) and [`PineconeIndex`] (data
//! plane) over the Pinecone REST API using `reqwest`.
//!
//! This module is only available when the `pinecone` feature is enabled.
//!
//! # Example
//!
//! ```rust,ignore
//! use docsearch_rag::pinecone::PineconeClient;
//!
//! let control = PineconeClient::new("pc-...")?.with_serverless_spec("aws", "us-east-1");
//! control.create_index("docs", 1536, Metric::Cosine).await?;
//! let index = control.connect("docs").await?;
//! index.upsert(&records).await?;
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, error, info};

use crate::document::Metadata;
use crate::error::{RagError, Result};
use crate::index::{
    IndexControl, IndexQuery, IndexStats, Metric, NamespaceStats, ScoredRecord, VectorIndex,
    VectorRecord,
};

/// The Pinecone control-plane endpoint.
pub const PINECONE_CONTROL_URL: &str = "https://api.pinecone.io";

/// The REST API version this client speaks.
const API_VERSION: &str = "2024-07";

const BACKEND: &str = "pinecone";

const DEFAULT_CLOUD: &str = "aws";
const DEFAULT_REGION: &str = "us-east-1";

fn map_err(e: reqwest::Error) -> RagError {
    RagError::vector_store(BACKEND, e.to_string())
}

/// Shared HTTP plumbing for both planes.
#[derive(Clone)]
struct Transport {
    http: reqwest::Client,
    api_key: String,
}

impl Transport {
    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.http
            .request(method, url)
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        let response = builder.send().await.map_err(|e| {
            error!(backend = BACKEND, error = %e, "request failed");
            map_err(e)
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(backend = BACKEND, %status, "API error");
            return Err(RagError::vector_store(BACKEND, format!("API returned {status}: {body}")));
        }

        // Some endpoints (delete) answer with an empty body.
        let bytes = response.bytes().await.map_err(map_err)?;
        let body = if bytes.is_empty() { b"{}".as_slice() } else { bytes.as_ref() };
        serde_json::from_slice(body).map_err(|e| {
            error!(backend = BACKEND, error = %e, "failed to parse response");
            RagError::vector_store(BACKEND, format!("failed to parse response: {e}"))
        })
    }
}

/// Control-plane client: lists, creates and connects to indexes.
///
/// New indexes are created serverless in the configured cloud/region.
pub struct PineconeClient {
    transport: Transport,
    control_url: String,
    cloud: String,
    region: String,
    ready_poll_interval: Duration,
    ready_poll_attempts: u32,
}

impl PineconeClient {
    /// Create a client with the given API key.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(RagError::vector_store(BACKEND, "API key must not be empty"));
        }
        Ok(Self {
            transport: Transport { http: reqwest::Client::new(), api_key },
            control_url: PINECONE_CONTROL_URL.to_string(),
            cloud: DEFAULT_CLOUD.to_string(),
            region: DEFAULT_REGION.to_string(),
            ready_poll_interval: Duration::from_secs(2),
            ready_poll_attempts: 60,
        })
    }

    /// Override the control-plane URL.
    pub fn with_control_url(mut self, url: impl Into<String>) -> Self {
        self.control_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Cloud and region used for new serverless indexes.
    pub fn with_serverless_spec(mut self, cloud: impl Into<String>, region: impl Into<String>) -> Self {
        self.cloud = cloud.into();
        self.region = region.into();
        self
    }

    /// Apply a per-request timeout to both planes.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.transport.http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RagError::vector_store(BACKEND, format!("failed to build client: {e}")))?;
        Ok(self)
    }

    /// How often and how many times to poll a new index for readiness.
    pub fn with_ready_polling(mut self, interval: Duration, attempts: u32) -> Self {
        self.ready_poll_interval = interval;
        self.ready_poll_attempts = attempts.max(1);
        self
    }

    async fn describe_index(&self, name: &str) -> Result<IndexDescription> {
        let url = format!("{}/indexes/{name}", self.control_url);
        self.transport.send(self.transport.request(Method::GET, &url)).await
    }

    async fn wait_until_ready(&self, name: &str) -> Result<()> {
        for attempt in 1..=self.ready_poll_attempts {
            let description = self.describe_index(name).await?;
            if description.status.ready {
                return Ok(());
            }
            debug!(index = name, attempt, state = %description.status.state, "waiting for index");
            tokio::time::sleep(self.ready_poll_interval).await;
        }
        Err(RagError::vector_store(BACKEND, format!("index '{name}' did not become ready")))
    }
}

// ── Control-plane wire types ──────────────────────────────────────

#[derive(Deserialize)]
struct IndexList {
    #[serde(default)]
    indexes: Vec<IndexListEntry>,
}

#[derive(Deserialize)]
struct IndexListEntry {
    name: String,
}

#[derive(Deserialize)]
struct IndexDescription {
    host: String,
    #[serde(default)]
    status: IndexStatus,
}

#[derive(Deserialize, Default)]
struct IndexStatus {
    #[serde(default)]
    ready: bool,
    #[serde(default)]
    state: String,
}

#[async_trait]
impl IndexControl for PineconeClient {
    async fn list_indexes(&self) -> Result<Vec<String>> {
        let url = format!("{}/indexes", self.control_url);
        let list: IndexList = self.transport.send(self.transport.request(Method::GET, &url)).await?;
        Ok(list.indexes.into_iter().map(|entry| entry.name).collect())
    }

    async fn create_index(&self, name: &str, dimension: usize, metric: Metric) -> Result<()> {
        let url = format!("{}/indexes", self.control_url);
        let body = json!({
            "name": name,
            "dimension": dimension,
            "metric": metric,
            "spec": { "serverless": { "cloud": self.cloud, "region": self.region } },
        });

        let response = self
            .transport
            .request(Method::POST, &url)
            .json(&body)
            .send()
            .await
            .map_err(map_err)?;

        match response.status() {
            status if status.is_success() => {
                info!(index = name, dimension, "created pinecone index");
            }
            StatusCode::CONFLICT => {
                debug!(index = name, "pinecone index already exists, skipping creation");
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                error!(backend = BACKEND, %status, index = name, "index creation failed");
                return Err(RagError::vector_store(
                    BACKEND,
                    format!("API returned {status}: {body}"),
                ));
            }
        }

        self.wait_until_ready(name).await
    }

    async fn connect(&self, name: &str) -> Result<Arc<dyn VectorIndex>> {
        let description = self.describe_index(name).await?;
        let host = if description.host.starts_with("http://")
            || description.host.starts_with("https://")
        {
            description.host
        } else {
            format!("https://{}", description.host)
        };
        debug!(index = name, %host, "connected to pinecone index");
        Ok(Arc::new(PineconeIndex { transport: self.transport.clone(), host }))
    }
}

/// Data-plane handle to one Pinecone index.
pub struct PineconeIndex {
    transport: Transport,
    host: String,
}

impl PineconeIndex {
    pub fn host(&self) -> &str {
        &self.host
    }

    async fn post<T: DeserializeOwned>(&self, path: &str, body: &impl Serialize) -> Result<T> {
        let url = format!("{}{path}", self.host);
        self.transport.send(self.transport.request(Method::POST, &url).json(body)).await
    }
}

// ── Data-plane wire types ─────────────────────────────────────────

#[derive(Serialize)]
struct UpsertRequest<'a> {
    vectors: &'a [VectorRecord],
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertResponse {
    #[serde(default)]
    upserted_count: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<Value>,
    include_metadata: bool,
    include_values: bool,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Deserialize)]
struct QueryMatch {
    id: String,
    #[serde(default)]
    score: f32,
    #[serde(default)]
    metadata: Option<Metadata>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatsResponse {
    #[serde(default)]
    namespaces: BTreeMap<String, NamespaceSummary>,
    #[serde(default)]
    dimension: usize,
    #[serde(default)]
    index_fullness: f64,
    #[serde(default)]
    total_vector_count: u64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NamespaceSummary {
    #[serde(default)]
    vector_count: u64,
}

#[async_trait]
impl VectorIndex for PineconeIndex {
    async fn upsert(&self, records: &[VectorRecord]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }
        let response: UpsertResponse =
            self.post("/vectors/upsert", &UpsertRequest { vectors: records }).await?;
        debug!(count = response.upserted_count, "upserted vectors to pinecone");
        Ok(response.upserted_count)
    }

    async fn query(&self, query: &IndexQuery) -> Result<Vec<ScoredRecord>> {
        let request = QueryRequest {
            vector: &query.vector,
            top_k: query.top_k,
            filter: query.filter.as_ref().map(|f| f.to_value()),
            include_metadata: query.include_metadata,
            include_values: false,
        };
        let response: QueryResponse = self.post("/query", &request).await?;
        debug!(top_k = query.top_k, matches = response.matches.len(), "queried pinecone");

        Ok(response
            .matches
            .into_iter()
            .map(|m| ScoredRecord { id: m.id, score: m.score, metadata: m.metadata.unwrap_or_default() })
            .collect())
    }

    async fn delete(&self, ids: &[String]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let _: Value = self.post("/vectors/delete", &json!({ "ids": ids })).await?;
        debug!(count = ids.len(), "deleted vectors from pinecone");
        Ok(())
    }

    async fn describe_stats(&self) -> Result<IndexStats> {
        let stats: StatsResponse = self.post("/describe_index_stats", &json!({})).await?;
        Ok(IndexStats {
            total_vectors: stats.total_vector_count,
            dimension: stats.dimension,
            index_fullness: stats.index_fullness,
            namespaces: stats
                .namespaces
                .into_iter()
                .map(|(name, ns)| (name, NamespaceStats { vector_count: ns.vector_count }))
                .collect(),
        })
    }
}
