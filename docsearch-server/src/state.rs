use std::sync::Arc;

use docsearch_rag::{RecursiveCharacterSplitter, Result as RagResult, VectorStoreManager};

use crate::settings::Settings;

/// Shared by every request: one vector store manager for the process
/// lifetime, the configured splitter and the settings.
#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<VectorStoreManager>,
    pub splitter: Arc<RecursiveCharacterSplitter>,
    pub settings: Arc<Settings>,
}

impl AppState {
    /// Build the state, validating the chunking settings.
    pub fn new(manager: Arc<VectorStoreManager>, settings: Settings) -> RagResult<Self> {
        let splitter = RecursiveCharacterSplitter::new(settings.chunk_size, settings.chunk_overlap)?;
        Ok(Self { manager, splitter: Arc::new(splitter), settings: Arc::new(settings) })
    }
}
