//! Vector store module
//!
//! The persisted index lives behind the [`VectorStore`] trait: collection
//! bootstrap, point upsert, per-URL stale deletion, hash lookup, and
//! similarity search. The production implementation talks to Qdrant over
//! HTTP; [`MemoryStore`] is an in-process implementation used by tests and
//! offline runs. Consistency discipline is last-write-wins per URL with full
//! replacement; no reader ever observes a mix of chunk generations after a
//! replace completes.

mod error;
mod memory;
mod qdrant;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use qdrant::QdrantStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Payload stored alongside every chunk vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkPayload {
    /// Chunk text
    pub text: String,

    /// Source page URL
    pub url: String,

    /// Position of the chunk within its page
    pub chunk_index: usize,

    /// Number of chunks the page produced
    pub total_chunks: usize,

    /// Hash of the normalized page text this generation was built from
    pub content_hash: String,

    /// RFC 3339 timestamp of the replace that wrote this chunk
    pub updated_at: String,
}

/// A point ready for upsert: opaque id, embedding vector, payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkPoint {
    /// Opaque unique id (UUIDv4)
    pub id: String,

    /// Embedding vector; length must match the collection dimensionality
    pub vector: Vec<f32>,

    /// Chunk payload
    pub payload: ChunkPayload,
}

/// A search hit with its similarity score
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    /// Similarity score (cosine)
    pub score: f32,

    /// Payload of the matched chunk
    pub payload: ChunkPayload,
}

/// Parameters for a similarity search
#[derive(Debug, Clone)]
pub struct SearchParams {
    /// Maximum number of hits
    pub limit: usize,

    /// Minimum similarity score, if any
    pub score_threshold: Option<f32>,

    /// Restrict hits to one source URL
    pub url_filter: Option<String>,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            limit: 5,
            score_threshold: None,
            url_filter: None,
        }
    }
}

/// Persisted vector index the pipeline reads and replaces chunks through
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Create the backing collection if it does not exist, with the given
    /// vector dimensionality and cosine distance
    async fn ensure_collection(&self, dimensions: usize) -> Result<(), StoreError>;

    /// Insert or overwrite points by id
    async fn upsert(&self, points: Vec<ChunkPoint>) -> Result<(), StoreError>;

    /// Delete every point for `url` whose content_hash differs from
    /// `keep_hash`; removes the previous generation after a replace
    async fn delete_stale(&self, url: &str, keep_hash: &str) -> Result<(), StoreError>;

    /// Content hash of the most recent stored generation for `url`, if any
    async fn stored_hash(&self, url: &str) -> Result<Option<String>, StoreError>;

    /// Number of points stored for `url`
    async fn count_by_url(&self, url: &str) -> Result<usize, StoreError>;

    /// Similarity search over the collection
    async fn search(
        &self,
        vector: Vec<f32>,
        params: &SearchParams,
    ) -> Result<Vec<ScoredChunk>, StoreError>;
}
