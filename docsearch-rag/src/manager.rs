//! Vector store manager.
//!
//! The [`VectorStoreManager`] owns the process-wide connection to one vector
//! index and implements the document-level operations on top of it: storing
//! chunks, similarity search, finding documents similar to a stored one,
//! deleting and listing documents, and reporting index statistics.
//!
//! # Example
//!
//! ```rust,ignore
//! use docsearch_rag::{VectorStoreManager, InMemoryIndexControl, RagConfig};
//!
//! let manager = VectorStoreManager::builder()
//!     .config(RagConfig::default())
//!     .embedding_provider(Arc::new(my_embedder))
//!     .index_control(Arc::new(InMemoryIndexControl::new()))
//!     .index_name("docsearch-documents")
//!     .build()?;
//!
//! manager.init_index(1536).await?;
//! let ids = manager.add_segments(&chunks).await?;
//! let results = manager.similarity_search("search query", 5, None).await?;
//! ```

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::RagConfig;
use crate::document::{
    DOC_ID_KEY, DocumentListing, DocumentSummary, FILENAME_KEY, Metadata, SearchResult, Segment,
    TEXT_KEY, UPLOAD_TIME_KEY,
};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::filter::MetadataFilter;
use crate::index::{IndexControl, IndexQuery, IndexStats, Metric, VectorIndex, VectorRecord};

/// Texts sent to the embedding provider per request.
const EMBED_BATCH_SIZE: usize = 64;
/// Records sent to the index per upsert request.
const UPSERT_BATCH_SIZE: usize = 100;
/// Upper bound on chunks removed by a single [`VectorStoreManager::delete_document`].
const DELETE_QUERY_LIMIT: usize = 10_000;
/// Ids sent to the index per delete request.
const DELETE_BATCH_SIZE: usize = 1_000;
/// Vectors sampled by [`VectorStoreManager::list_documents`].
pub const LIST_SAMPLE_LIMIT: usize = 100;

const UNKNOWN: &str = "Unknown";

/// Document-level operations over a single vector index.
///
/// The index handle is established by [`connect`](Self::connect) or
/// [`init_index`](Self::init_index) and held until [`shutdown`](Self::shutdown).
/// Every operation on an unconnected manager fails with
/// [`RagError::NotInitialized`].
pub struct VectorStoreManager {
    config: RagConfig,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    control: Arc<dyn IndexControl>,
    index_name: String,
    metric: Metric,
    index: RwLock<Option<Arc<dyn VectorIndex>>>,
}

impl VectorStoreManager {
    /// Create a new [`VectorStoreManagerBuilder`].
    pub fn builder() -> VectorStoreManagerBuilder {
        VectorStoreManagerBuilder::default()
    }

    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    /// Whether an index handle is currently held.
    pub async fn is_initialized(&self) -> bool {
        self.index.read().await.is_some()
    }

    async fn index(&self) -> Result<Arc<dyn VectorIndex>> {
        self.index.read().await.clone().ok_or(RagError::NotInitialized)
    }

    /// Probe vector for queries that only care about the metadata filter.
    fn zero_vector(&self) -> Vec<f32> {
        vec![0.0; self.config.dimension]
    }

    /// Connect to the index if it already exists.
    ///
    /// Returns `false` (and stays uninitialized) when the index is missing.
    pub async fn connect(&self) -> Result<bool> {
        let existing = self.control.list_indexes().await.map_err(|e| {
            error!(index = %self.index_name, error = %e, "failed to list indexes");
            e
        })?;

        if !existing.iter().any(|name| name == &self.index_name) {
            warn!(index = %self.index_name, "index does not exist; run init-index to create it");
            return Ok(false);
        }

        self.attach().await?;
        Ok(true)
    }

    /// Create the index if absent (cosine metric unless configured otherwise),
    /// wait for it to become ready, then connect. Safe to call repeatedly.
    pub async fn init_index(&self, dimension: usize) -> Result<()> {
        let existing = self.control.list_indexes().await.map_err(|e| {
            error!(index = %self.index_name, error = %e, "failed to list indexes");
            e
        })?;

        if existing.iter().any(|name| name == &self.index_name) {
            info!(index = %self.index_name, "index already exists");
        } else {
            self.control.create_index(&self.index_name, dimension, self.metric).await.map_err(
                |e| {
                    error!(index = %self.index_name, dimension, error = %e, "failed to create index");
                    e
                },
            )?;
            info!(index = %self.index_name, dimension, "created index");
        }

        self.attach().await
    }

    async fn attach(&self) -> Result<()> {
        let handle = self.control.connect(&self.index_name).await.map_err(|e| {
            error!(index = %self.index_name, error = %e, "failed to connect to index");
            e
        })?;
        *self.index.write().await = Some(handle);
        info!(index = %self.index_name, "connected to index");
        Ok(())
    }

    /// Release the index handle. Later operations fail with
    /// [`RagError::NotInitialized`].
    pub async fn shutdown(&self) {
        if self.index.write().await.take().is_some() {
            info!(index = %self.index_name, "released index handle");
        }
    }

    /// Embed and store chunks. Returns the generated vector ids in chunk order.
    ///
    /// The chunk text is stored under the reserved `text` metadata key.
    pub async fn add_segments(&self, chunks: &[Segment]) -> Result<Vec<String>> {
        let index = self.index().await?;
        if chunks.is_empty() {
            return Ok(Vec::new());
        }

        let mut records = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(EMBED_BATCH_SIZE) {
            let texts: Vec<&str> = batch.iter().map(|c| c.content.as_str()).collect();
            let embeddings = self.embedding_provider.embed_batch(&texts).await.map_err(|e| {
                error!(chunk_count = batch.len(), error = %e, "embedding failed while adding chunks");
                e
            })?;

            for (chunk, values) in batch.iter().zip(embeddings) {
                let mut metadata = chunk.metadata.clone();
                metadata.insert(TEXT_KEY.to_string(), Value::String(chunk.content.clone()));
                records.push(VectorRecord { id: Uuid::new_v4().to_string(), values, metadata });
            }
        }

        for batch in records.chunks(UPSERT_BATCH_SIZE) {
            index.upsert(batch).await.map_err(|e| {
                error!(record_count = batch.len(), error = %e, "upsert failed while adding chunks");
                e
            })?;
        }

        info!(chunk_count = records.len(), "added chunks to vector store");
        Ok(records.into_iter().map(|r| r.id).collect())
    }

    /// Return up to `k` chunks ranked by similarity to `query`.
    pub async fn similarity_search(
        &self,
        query: &str,
        k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<SearchResult>> {
        let index = self.index().await?;

        let vector = self.embedding_provider.embed(query).await.map_err(|e| {
            error!(error = %e, "embedding failed during search");
            e
        })?;

        let request = IndexQuery::new(vector, k).with_filter(filter.cloned());
        let matches = index.query(&request).await.map_err(|e| {
            error!(top_k = k, error = %e, "similarity search failed");
            e
        })?;

        let results: Vec<SearchResult> = matches
            .into_iter()
            .map(|m| to_search_result(m.metadata, m.score))
            .collect();
        info!(result_count = results.len(), "similarity search completed");
        Ok(results)
    }

    /// Find up to `k` chunks from *other* documents that resemble `doc_id`.
    ///
    /// One chunk of the reference document is used as the query text.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::DocumentNotFound`] when no chunk carries `doc_id`.
    pub async fn find_similar_documents(&self, doc_id: &str, k: usize) -> Result<Vec<SearchResult>> {
        let index = self.index().await?;

        let probe = IndexQuery::new(self.zero_vector(), 1)
            .with_filter(Some(MetadataFilter::eq(DOC_ID_KEY, doc_id)));
        let reference = index.query(&probe).await.map_err(|e| {
            error!(doc_id, error = %e, "failed to fetch reference chunk");
            e
        })?;

        let Some(reference) = reference.into_iter().next() else {
            error!(doc_id, "reference document not found");
            return Err(RagError::DocumentNotFound(doc_id.to_string()));
        };
        let reference_text =
            reference.metadata.get(TEXT_KEY).and_then(Value::as_str).unwrap_or_default();

        let exclude = MetadataFilter::ne(DOC_ID_KEY, doc_id);
        let mut results = self.similarity_search(reference_text, k.saturating_add(1), Some(&exclude)).await?;
        results.retain(|r| r.doc_id() != Some(doc_id));
        results.truncate(k);
        Ok(results)
    }

    /// Delete every chunk of `doc_id`. Returns `false` if none matched.
    pub async fn delete_document(&self, doc_id: &str) -> Result<bool> {
        let index = self.index().await?;

        let request = IndexQuery::new(self.zero_vector(), DELETE_QUERY_LIMIT)
            .with_filter(Some(MetadataFilter::eq(DOC_ID_KEY, doc_id)))
            .include_metadata(false);
        let matches = index.query(&request).await.map_err(|e| {
            error!(doc_id, error = %e, "failed to look up document chunks");
            e
        })?;

        if matches.is_empty() {
            return Ok(false);
        }

        let ids: Vec<String> = matches.into_iter().map(|m| m.id).collect();
        for batch in ids.chunks(DELETE_BATCH_SIZE) {
            index.delete(batch).await.map_err(|e| {
                error!(doc_id, error = %e, "failed to delete document chunks");
                e
            })?;
        }

        info!(doc_id, deleted = ids.len(), "deleted document");
        Ok(true)
    }

    /// Best-effort listing of stored documents.
    ///
    /// At most [`LIST_SAMPLE_LIMIT`] vectors are sampled and grouped by
    /// `doc_id` in first-seen order, so large stores are under-reported;
    /// [`DocumentListing::truncated`] flags that case.
    pub async fn list_documents(&self) -> Result<DocumentListing> {
        let index = self.index().await?;

        let request = IndexQuery::new(self.zero_vector(), LIST_SAMPLE_LIMIT);
        let sample = index.query(&request).await.map_err(|e| {
            error!(error = %e, "failed to sample vectors for listing");
            e
        })?;
        let truncated = sample.len() >= LIST_SAMPLE_LIMIT;

        let mut documents: Vec<DocumentSummary> = Vec::new();
        for record in &sample {
            let Some(doc_id) = record.metadata.get(DOC_ID_KEY).and_then(Value::as_str) else {
                continue;
            };
            match documents.iter_mut().find(|d| d.doc_id == doc_id) {
                Some(summary) => summary.chunk_count += 1,
                None => documents.push(DocumentSummary {
                    doc_id: doc_id.to_string(),
                    filename: metadata_or_unknown(&record.metadata, FILENAME_KEY),
                    chunk_count: 1,
                    upload_time: metadata_or_unknown(&record.metadata, UPLOAD_TIME_KEY),
                }),
            }
        }

        Ok(DocumentListing { documents, sample_limit: LIST_SAMPLE_LIMIT, truncated })
    }

    /// Provider-reported statistics for the index.
    pub async fn get_stats(&self) -> Result<IndexStats> {
        let index = self.index().await?;
        index.describe_stats().await.map_err(|e| {
            error!(error = %e, "failed to get index stats");
            e
        })
    }
}

fn to_search_result(mut metadata: Metadata, score: f32) -> SearchResult {
    let content = match metadata.remove(TEXT_KEY) {
        Some(Value::String(text)) => text,
        _ => String::new(),
    };
    SearchResult { content, metadata, similarity_score: score }
}

fn metadata_or_unknown(metadata: &Metadata, key: &str) -> String {
    metadata.get(key).and_then(Value::as_str).unwrap_or(UNKNOWN).to_string()
}

/// Builder for constructing a [`VectorStoreManager`].
///
/// The embedding provider, index control and index name are required; the
/// config defaults to [`RagConfig::default`] and the metric to cosine.
#[derive(Default)]
pub struct VectorStoreManagerBuilder {
    config: Option<RagConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    control: Option<Arc<dyn IndexControl>>,
    index_name: Option<String>,
    metric: Metric,
}

impl VectorStoreManagerBuilder {
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the control plane used to create and connect to the index.
    pub fn index_control(mut self, control: Arc<dyn IndexControl>) -> Self {
        self.control = Some(control);
        self
    }

    pub fn index_name(mut self, name: impl Into<String>) -> Self {
        self.index_name = Some(name.into());
        self
    }

    /// Metric used when [`VectorStoreManager::init_index`] creates the index.
    pub fn metric(mut self, metric: Metric) -> Self {
        self.metric = metric;
        self
    }

    /// Build the manager, validating that all required fields are set.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if a required field is missing, the
    /// index name is empty, or the provider's dimensionality differs from
    /// the configured one.
    pub fn build(self) -> Result<VectorStoreManager> {
        let config = self.config.unwrap_or_default();
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| RagError::ConfigError("embedding_provider is required".to_string()))?;
        let control = self
            .control
            .ok_or_else(|| RagError::ConfigError("index_control is required".to_string()))?;
        let index_name = self
            .index_name
            .filter(|name| !name.is_empty())
            .ok_or_else(|| RagError::ConfigError("index_name is required".to_string()))?;

        if embedding_provider.dimensions() != config.dimension {
            return Err(RagError::ConfigError(format!(
                "embedding provider produces {} dimensions but the index expects {}",
                embedding_provider.dimensions(),
                config.dimension
            )));
        }

        Ok(VectorStoreManager {
            config,
            embedding_provider,
            control,
            index_name,
            metric: self.metric,
            index: RwLock::new(None),
        })
    }
}
