//! Vector index traits and the records exchanged with index backends.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::document::Metadata;
use crate::error::Result;
use crate::filter::MetadataFilter;

/// Distance metric used when creating an index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    #[default]
    Cosine,
    Euclidean,
    Dotproduct,
}

/// A vector with its id and metadata, ready to be upserted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    pub id: String,
    pub values: Vec<f32>,
    pub metadata: Metadata,
}

/// A query match returned by an index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredRecord {
    pub id: String,
    pub score: f32,
    /// Empty unless the query asked for metadata.
    pub metadata: Metadata,
}

/// A nearest-neighbour query.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexQuery {
    pub vector: Vec<f32>,
    pub top_k: usize,
    pub filter: Option<MetadataFilter>,
    pub include_metadata: bool,
}

impl IndexQuery {
    pub fn new(vector: Vec<f32>, top_k: usize) -> Self {
        Self { vector, top_k, filter: None, include_metadata: true }
    }

    /// Attach a filter; empty filters are dropped.
    pub fn with_filter(mut self, filter: Option<MetadataFilter>) -> Self {
        self.filter = filter.filter(|f| !f.is_empty());
        self
    }

    pub fn include_metadata(mut self, include: bool) -> Self {
        self.include_metadata = include;
        self
    }
}

/// Per-namespace statistics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct NamespaceStats {
    pub vector_count: u64,
}

/// Statistics reported by the index provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct IndexStats {
    pub total_vectors: u64,
    pub dimension: usize,
    pub index_fullness: f64,
    pub namespaces: BTreeMap<String, NamespaceStats>,
}

/// Control-plane operations: discovering, creating and connecting to indexes.
#[async_trait]
pub trait IndexControl: Send + Sync {
    /// Names of all existing indexes.
    async fn list_indexes(&self) -> Result<Vec<String>>;

    /// Create an index and return once it is ready to serve requests.
    async fn create_index(&self, name: &str, dimension: usize, metric: Metric) -> Result<()>;

    /// Open a data-plane handle to an existing index.
    async fn connect(&self, name: &str) -> Result<Arc<dyn VectorIndex>>;
}

/// Data-plane operations on a single index.
///
/// # Example
///
/// ```rust,ignore
/// let index = control.connect("docs").await?;
/// index.upsert(&records).await?;
/// let matches = index.query(&IndexQuery::new(embedding, 5)).await?;
/// ```
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Insert or replace records. Returns the number of records written.
    async fn upsert(&self, records: &[VectorRecord]) -> Result<usize>;

    /// Return the `top_k` matches ordered by descending score.
    async fn query(&self, query: &IndexQuery) -> Result<Vec<ScoredRecord>>;

    /// Delete records by id. Unknown ids are ignored.
    async fn delete(&self, ids: &[String]) -> Result<()>;

    async fn describe_stats(&self) -> Result<IndexStats>;
}
