//! Data types for loaded segments, search results and document summaries.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Key-value metadata attached to segments and stored alongside vectors.
pub type Metadata = Map<String, Value>;

/// Metadata key holding the chunk's doc id.
pub const DOC_ID_KEY: &str = "doc_id";
/// Metadata key holding the sanitized upload filename.
pub const FILENAME_KEY: &str = "filename";
/// Metadata key holding the upload timestamp.
pub const UPLOAD_TIME_KEY: &str = "upload_time";
/// Reserved metadata key under which the chunk text is stored in the index.
pub const TEXT_KEY: &str = "text";

/// A piece of plain text with its source metadata.
///
/// The loader produces one segment per file, page or sheet; the splitter
/// turns those into chunk-sized segments that inherit the same metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Segment {
    pub content: String,
    pub metadata: Metadata,
}

impl Segment {
    pub fn new(content: impl Into<String>, metadata: Metadata) -> Self {
        Self { content: content.into(), metadata }
    }

    /// Look up a string metadata value.
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(Value::as_str)
    }
}

/// A retrieved chunk paired with the provider's similarity score.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    /// The chunk text.
    pub content: String,
    /// Chunk metadata, without the reserved `text` key.
    pub metadata: Metadata,
    /// Provider-reported similarity (higher is closer).
    pub similarity_score: f32,
}

impl SearchResult {
    /// The doc id of the chunk, if it was tagged with one.
    pub fn doc_id(&self) -> Option<&str> {
        self.metadata.get(DOC_ID_KEY).and_then(Value::as_str)
    }
}

/// A logical document reconstructed from the metadata of its chunks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentSummary {
    pub doc_id: String,
    pub filename: String,
    pub chunk_count: usize,
    pub upload_time: String,
}

/// The result of a best-effort document listing.
///
/// Documents are grouped from a bounded sample of vectors, so when
/// `truncated` is set some documents (or chunks) may be missing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentListing {
    pub documents: Vec<DocumentSummary>,
    /// Maximum number of vectors sampled.
    pub sample_limit: usize,
    /// Whether the sample filled the limit.
    pub truncated: bool,
}
