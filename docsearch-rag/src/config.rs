//! Chunking, search and index parameters shared by the manager and splitter.

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

pub const DEFAULT_CHUNK_SIZE: usize = 1000;
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;
pub const DEFAULT_TOP_K: usize = 5;
/// Output size of `text-embedding-3-small`.
pub const DEFAULT_DIMENSION: usize = 1536;

/// Ingestion and search parameters.
///
/// Sizes are measured in characters. `dimension` is the width of the vector
/// index and must equal the embedding provider's output width.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RagConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub top_k: usize,
    pub dimension: usize,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            top_k: DEFAULT_TOP_K,
            dimension: DEFAULT_DIMENSION,
        }
    }
}

impl RagConfig {
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }

    /// Reject configurations the splitter or index could not honour.
    pub fn validate(&self) -> Result<()> {
        check_chunking(self.chunk_size, self.chunk_overlap)?;
        for (name, value) in [("top_k", self.top_k), ("dimension", self.dimension)] {
            if value == 0 {
                return Err(RagError::ConfigError(format!("{name} must be greater than zero")));
            }
        }
        Ok(())
    }
}

/// A chunk must hold at least one character and be longer than its overlap.
pub(crate) fn check_chunking(chunk_size: usize, chunk_overlap: usize) -> Result<()> {
    if chunk_size == 0 {
        return Err(RagError::ConfigError("chunk_size must be greater than zero".to_string()));
    }
    if chunk_overlap >= chunk_size {
        return Err(RagError::ConfigError(format!(
            "chunk_overlap ({chunk_overlap}) must be less than chunk_size ({chunk_size})"
        )));
    }
    Ok(())
}

/// Starts from [`RagConfig::default`]; [`build`](Self::build) validates.
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    pub fn chunk_size(self, chunk_size: usize) -> Self {
        Self { config: RagConfig { chunk_size, ..self.config } }
    }

    pub fn chunk_overlap(self, chunk_overlap: usize) -> Self {
        Self { config: RagConfig { chunk_overlap, ..self.config } }
    }

    pub fn top_k(self, top_k: usize) -> Self {
        Self { config: RagConfig { top_k, ..self.config } }
    }

    pub fn dimension(self, dimension: usize) -> Self {
        Self { config: RagConfig { dimension, ..self.config } }
    }

    /// # Errors
    ///
    /// [`RagError::ConfigError`] when any size is zero or the overlap is not
    /// smaller than the chunk size.
    pub fn build(self) -> Result<RagConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
