//! Embedding module
//!
//! Turns chunk text into fixed-dimension vectors behind the
//! [`EmbeddingProvider`] trait. The production implementation calls an
//! OpenAI-compatible embeddings endpoint; [`MockEmbedder`] produces
//! deterministic vectors for tests and offline runs.

mod error;
mod mock;
mod openai;

pub use error::EmbedError;
pub use mock::MockEmbedder;
pub use openai::{OpenAiEmbedder, OpenAiEmbedderBuilder};

use async_trait::async_trait;

/// Embedding backend the indexer and search path share
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a batch of texts, one vector per input, in input order
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError>;

    /// Dimensionality of the vectors this provider produces
    fn dimensions(&self) -> usize;
}
