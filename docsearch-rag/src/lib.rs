//! # docsearch-rag
//!
//! Document ingestion and semantic search for docsearch.
//!
//! ## Overview
//!
//! - [`loader`] turns `.txt`, `.pdf`, `.docx` and `.xlsx` files into text segments.
//! - [`RecursiveCharacterSplitter`] cuts segments into overlapping chunks.
//! - [`EmbeddingProvider`] turns chunk text into vectors ([`openai`] ships one).
//! - [`IndexControl`] / [`VectorIndex`] abstract the vector index
//!   ([`pinecone`] for production, [`InMemoryIndexControl`] for tests).
//! - [`VectorStoreManager`] ties these together into document-level
//!   operations: add, search, find similar, delete, list, stats.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use docsearch_rag::{
//!     Chunker, InMemoryIndexControl, RecursiveCharacterSplitter, VectorStoreManager,
//!     loader::load_document, tag_chunks,
//! };
//!
//! let manager = VectorStoreManager::builder()
//!     .embedding_provider(Arc::new(my_embedder))
//!     .index_control(Arc::new(InMemoryIndexControl::new()))
//!     .index_name("docs")
//!     .build()?;
//! manager.init_index(1536).await?;
//!
//! let segments = load_document(path, "pdf")?;
//! let mut chunks = RecursiveCharacterSplitter::new(1000, 200)?.split_segments(&segments);
//! tag_chunks(&mut chunks, &doc_id, "report.pdf", &upload_time);
//! manager.add_segments(&chunks).await?;
//!
//! let hits = manager.similarity_search("quarterly revenue", 5, None).await?;
//! ```
//!
//! ## Features
//!
//! - `openai` (default) - OpenAI embeddings over `reqwest`
//! - `pinecone` (default) - Pinecone serverless index over `reqwest`

pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod filter;
pub mod index;
pub mod inmemory;
pub mod loader;
pub mod manager;
pub mod ooxml;
#[cfg(feature = "openai")]
pub mod openai;
#[cfg(feature = "pinecone")]
pub mod pinecone;

pub use chunking::{Chunker, RecursiveCharacterSplitter, tag_chunks};
pub use config::{RagConfig, RagConfigBuilder};
pub use document::{DocumentListing, DocumentSummary, Metadata, SearchResult, Segment};
pub use embedding::EmbeddingProvider;
pub use error::{RagError, Result};
pub use filter::MetadataFilter;
pub use index::{
    IndexControl, IndexQuery, IndexStats, Metric, NamespaceStats, ScoredRecord, VectorIndex,
    VectorRecord,
};
pub use inmemory::{InMemoryIndex, InMemoryIndexControl};
pub use loader::{SUPPORTED_EXTENSIONS, load_document};
pub use manager::{VectorStoreManager, VectorStoreManagerBuilder};
#[cfg(feature = "openai")]
pub use openai::OpenAIEmbeddingProvider;
#[cfg(feature = "pinecone")]
pub use pinecone::{PineconeClient, PineconeIndex};
