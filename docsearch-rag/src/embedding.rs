use async_trait::async_trait;

use crate::error::Result;

/// Turns text into fixed-width vectors for the index.
///
/// Every vector a provider returns has [`dimensions`](Self::dimensions)
/// entries. Providers with a native batch endpoint should override
/// [`embed_batch`](Self::embed_batch); the default embeds one text at a time.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// One vector per input, in input order.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed(text).await?);
        }
        Ok(vectors)
    }

    fn dimensions(&self) -> usize;
}
