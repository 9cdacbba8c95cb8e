//! Search module
//!
//! The read path over the index: embed a query, run a similarity search,
//! and return scored chunks with their source URLs. Kept thin; ranking
//! and filtering live in the store.

mod error;

pub use error::SearchError;

use std::sync::Arc;

use tracing::{debug, instrument};

use crate::embedder::EmbeddingProvider;
use crate::store::{SearchParams, VectorStore};

/// Options for a query against the index
#[derive(Debug, Clone)]
pub struct SearchOptions {
    /// Maximum number of hits
    pub limit: usize,

    /// Minimum similarity score, if any
    pub score_threshold: Option<f32>,

    /// Restrict hits to chunks from one source URL
    pub url_filter: Option<String>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            limit: 5,
            score_threshold: None,
            url_filter: None,
        }
    }
}

/// One hit: chunk text, where it came from, and how well it matched
#[derive(Debug, Clone)]
pub struct SearchResult {
    /// Chunk text
    pub text: String,

    /// Source page URL
    pub url: String,

    /// Position of the chunk within its page
    pub chunk_index: usize,

    /// Similarity score
    pub score: f32,

    /// When the chunk's generation was indexed (RFC 3339)
    pub updated_at: String,
}

/// Embed `query` and return the best-matching chunks, highest score first
#[instrument(skip(store, embedder), fields(limit = options.limit))]
pub async fn search_index(
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    query: &str,
    options: &SearchOptions,
) -> Result<Vec<SearchResult>, SearchError> {
    if query.trim().is_empty() {
        return Err(SearchError::EmptyQuery);
    }

    let mut vectors = embedder.embed(&[query.to_string()]).await?;
    let vector = vectors
        .pop()
        .ok_or_else(|| SearchError::Other("embedder returned no vector".to_string()))?;

    let params = SearchParams {
        limit: options.limit,
        score_threshold: options.score_threshold,
        url_filter: options.url_filter.clone(),
    };
    let hits = store.search(vector, &params).await?;
    debug!(hits = hits.len(), "Query complete");

    Ok(hits
        .into_iter()
        .map(|hit| SearchResult {
            text: hit.payload.text,
            url: hit.payload.url,
            chunk_index: hit.payload.chunk_index,
            score: hit.score,
            updated_at: hit.payload.updated_at,
        })
        .collect())
}
