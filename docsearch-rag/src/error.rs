use thiserror::Error;

/// Failures while loading, embedding, storing or searching documents.
#[derive(Debug, Error)]
pub enum RagError {
    #[error("Embedding error ({provider}): {message}")]
    EmbeddingError { provider: String, message: String },

    /// The index backend rejected a request or could not be reached.
    #[error("Vector store error ({backend}): {message}")]
    VectorStoreError { backend: String, message: String },

    /// No index handle is held: `init_index`/`connect` has not succeeded,
    /// or `shutdown` was called.
    #[error("Vector store not initialized")]
    NotInitialized,

    /// No chunk carries this doc id.
    #[error("Document with ID {0} not found")]
    DocumentNotFound(String),

    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    /// A file of a supported type could not be read; `message` is the
    /// underlying reader's error.
    #[error("Error loading {extension} file: {message}")]
    LoadError { extension: String, message: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl RagError {
    pub(crate) fn vector_store(backend: &str, message: impl Into<String>) -> Self {
        Self::VectorStoreError { backend: backend.to_string(), message: message.into() }
    }

    pub(crate) fn embedding(provider: &str, message: impl Into<String>) -> Self {
        Self::EmbeddingError { provider: provider.to_string(), message: message.into() }
    }
}

pub type Result<T> = std::result::Result<T, RagError>;
