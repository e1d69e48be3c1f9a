//! In-memory vector index using cosine similarity.
//!
//! This module provides [`InMemoryIndexControl`] and [`InMemoryIndex`], a
//! zero-dependency stand-in for the managed index backed by `HashMap`s
//! protected by `tokio::sync::RwLock`. It evaluates
//! [`MetadataFilter`](crate::filter::MetadataFilter)s
//! locally with the same operators the managed index supports, which makes
//! it suitable for development and testing.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{RagError, Result};
use crate::index::{
    IndexControl, IndexQuery, IndexStats, Metric, NamespaceStats, ScoredRecord, VectorIndex,
    VectorRecord,
};

const BACKEND: &str = "InMemory";

/// Control plane for in-memory indexes.
///
/// # Example
///
/// ```rust,ignore
/// use docsearch_rag::{InMemoryIndexControl, IndexControl, Metric};
///
/// let control = InMemoryIndexControl::new();
/// control.create_index("docs", 384, Metric::Cosine).await?;
/// let index = control.connect("docs").await?;
/// ```
#[derive(Debug, Default)]
pub struct InMemoryIndexControl {
    indexes: RwLock<HashMap<String, Arc<InMemoryIndex>>>,
}

impl InMemoryIndexControl {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IndexControl for InMemoryIndexControl {
    async fn list_indexes(&self) -> Result<Vec<String>> {
        let indexes = self.indexes.read().await;
        Ok(indexes.keys().cloned().collect())
    }

    async fn create_index(&self, name: &str, dimension: usize, _metric: Metric) -> Result<()> {
        let mut indexes = self.indexes.write().await;
        indexes.entry(name.to_string()).or_insert_with(|| Arc::new(InMemoryIndex::new(dimension)));
        debug!(index = name, dimension, "created in-memory index");
        Ok(())
    }

    async fn connect(&self, name: &str) -> Result<Arc<dyn VectorIndex>> {
        let indexes = self.indexes.read().await;
        let index = indexes.get(name).cloned().ok_or_else(|| {
            RagError::vector_store(BACKEND, format!("index '{name}' does not exist"))
        })?;
        Ok(index as Arc<dyn VectorIndex>)
    }
}

/// A single in-memory index: record id → record.
#[derive(Debug)]
pub struct InMemoryIndex {
    dimension: usize,
    records: RwLock<HashMap<String, VectorRecord>>,
}

impl InMemoryIndex {
    pub fn new(dimension: usize) -> Self {
        Self { dimension, records: RwLock::new(HashMap::new()) }
    }

    fn check_dimension(&self, len: usize) -> Result<()> {
        if len != self.dimension {
            return Err(RagError::vector_store(
                BACKEND,
                format!("vector dimension {len} does not match index dimension {}", self.dimension),
            ));
        }
        Ok(())
    }
}

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[async_trait]
impl VectorIndex for InMemoryIndex {
    async fn upsert(&self, records: &[VectorRecord]) -> Result<usize> {
        for record in records {
            self.check_dimension(record.values.len())?;
        }
        let mut store = self.records.write().await;
        for record in records {
            store.insert(record.id.clone(), record.clone());
        }
        Ok(records.len())
    }

    async fn query(&self, query: &IndexQuery) -> Result<Vec<ScoredRecord>> {
        self.check_dimension(query.vector.len())?;
        let store = self.records.read().await;
        let mut scored: Vec<ScoredRecord> = store
            .values()
            .filter(|record| query.filter.as_ref().is_none_or(|f| f.matches(&record.metadata)))
            .map(|record| ScoredRecord {
                id: record.id.clone(),
                score: cosine_similarity(&record.values, &query.vector),
                metadata: if query.include_metadata {
                    record.metadata.clone()
                } else {
                    Default::default()
                },
            })
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(query.top_k);
        Ok(scored)
    }

    async fn delete(&self, ids: &[String]) -> Result<()> {
        let mut store = self.records.write().await;
        for id in ids {
            store.remove(id);
        }
        Ok(())
    }

    async fn describe_stats(&self) -> Result<IndexStats> {
        let store = self.records.read().await;
        let total = store.len() as u64;
        let mut namespaces = BTreeMap::new();
        if total > 0 {
            namespaces.insert(String::new(), NamespaceStats { vector_count: total });
        }
        Ok(IndexStats {
            total_vectors: total,
            dimension: self.dimension,
            index_fullness: 0.0,
            namespaces,
        })
    }
}
