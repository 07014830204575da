//! azsearch-embed
//!
//! Query-side embeddings for raw vector queries. `AzureOpenAiEmbedder` calls a
//! deployed embedding model; `FakeEmbedder` produces deterministic vectors for
//! tests and offline runs (`AZSEARCH_USE_FAKE_EMBEDDINGS=1`).

mod azure_openai;
mod fake;

pub use azure_openai::AzureOpenAiEmbedder;
pub use fake::FakeEmbedder;

use async_trait::async_trait;

use azsearch_core::config::EmbeddingSettings;
use azsearch_core::error::{Error, Result};

/// Dimensionality of `text-embedding-3-small` and `text-embedding-ada-002`.
pub const DEFAULT_DIMENSIONS: usize = 1536;

#[async_trait]
pub trait Embedder: Send + Sync {
    /// Stable identifier for the provider/model (e.g. `azure-openai:embed-small:d1536`).
    fn embedder_id(&self) -> &str;
    /// Embedding dimensionality (D).
    fn dim(&self) -> usize;
    /// Embeddings for a batch of texts, in input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    async fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])
            .await?
            .pop()
            .ok_or_else(|| Error::Embedding("no embedding returned".into()))
    }
}

/// Picks the fake embedder when requested, the HTTP embedder otherwise.
pub fn embedder_from_settings(settings: &EmbeddingSettings) -> Result<Box<dyn Embedder>> {
    settings.validate()?;
    let dim = settings.dimensions.unwrap_or(DEFAULT_DIMENSIONS);
    if settings.use_fake {
        tracing::info!(dim, "using fake embeddings");
        return Ok(Box::new(FakeEmbedder::new(dim)));
    }
    Ok(Box::new(AzureOpenAiEmbedder::new(settings)?))
}
