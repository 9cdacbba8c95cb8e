//! Per-URL generation replacement
//!
//! `replace` writes a page's chunks as one generation tagged with the
//! page's content hash: ensure the collection, embed, upsert the new
//! points, then delete every point for the URL carrying a different hash.
//! Embedding or upsert failures leave the old generation intact; a failure
//! after upsert leaves both generations until the next visit sweeps them
//! (the pipeline issues the stale deletion even for unchanged pages).

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::embedder::EmbeddingProvider;
use crate::index::{IndexConfig, IndexError};
use crate::store::{ChunkPayload, ChunkPoint, VectorStore};

/// Writes chunk generations into the vector store
pub struct Indexer {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    config: IndexConfig,
}

impl Indexer {
    /// Create an indexer over a store and an embedding provider
    pub fn new(
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        config: IndexConfig,
    ) -> Self {
        Self {
            store,
            embedder,
            config,
        }
    }

    /// Replace the stored chunks for `url` with `chunks`, tagged with
    /// `content_hash`. Returns the number of chunks written.
    #[instrument(skip(self, chunks), fields(chunks = chunks.len()))]
    pub async fn replace(
        &self,
        url: &str,
        chunks: Vec<String>,
        content_hash: &str,
    ) -> Result<usize, IndexError> {
        if chunks.is_empty() {
            return Ok(0);
        }

        self.store
            .ensure_collection(self.config.dimensions)
            .await?;

        let vectors = self.embedder.embed(&chunks).await?;
        if vectors.len() != chunks.len() {
            return Err(IndexError::VectorCountMismatch {
                expected: chunks.len(),
                actual: vectors.len(),
            });
        }

        let total_chunks = chunks.len();
        let updated_at = Utc::now().to_rfc3339();
        let points: Vec<ChunkPoint> = chunks
            .into_iter()
            .zip(vectors)
            .enumerate()
            .map(|(chunk_index, (text, vector))| ChunkPoint {
                id: Uuid::new_v4().to_string(),
                vector,
                payload: ChunkPayload {
                    text,
                    url: url.to_string(),
                    chunk_index,
                    total_chunks,
                    content_hash: content_hash.to_string(),
                    updated_at: updated_at.clone(),
                },
            })
            .collect();

        // New generation first, stale deletion second. A reader in between
        // sees both generations, never neither.
        self.store.upsert(points).await?;
        self.store.delete_stale(url, content_hash).await?;

        info!(url, chunks = total_chunks, "Replaced chunk generation");
        Ok(total_chunks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedder::MockEmbedder;
    use crate::index::content_hash;
    use crate::store::MemoryStore;

    fn indexer(store: Arc<MemoryStore>) -> Indexer {
        Indexer::new(
            store,
            Arc::new(MockEmbedder::new(4)),
            IndexConfig::builder().dimensions(4).build(),
        )
    }

    #[tokio::test]
    async fn test_replace_writes_indexed_payloads() {
        let store = Arc::new(MemoryStore::new());
        let idx = indexer(store.clone());

        let hash = content_hash("page text");
        let written = idx
            .replace(
                "https://s.edu/a",
                vec!["chunk one".to_string(), "chunk two".to_string()],
                &hash,
            )
            .await
            .unwrap();
        assert_eq!(written, 2);

        let points = store.points();
        assert_eq!(points.len(), 2);
        for (i, p) in points.iter().enumerate() {
            assert_eq!(p.payload.url, "https://s.edu/a");
            assert_eq!(p.payload.chunk_index, i);
            assert_eq!(p.payload.total_chunks, 2);
            assert_eq!(p.payload.content_hash, hash);
            assert_eq!(p.vector.len(), 4);
        }
        // Distinct ids per point
        assert_ne!(points[0].id, points[1].id);
    }

    #[tokio::test]
    async fn test_replace_removes_previous_generation() {
        let store = Arc::new(MemoryStore::new());
        let idx = indexer(store.clone());

        let old_hash = content_hash("version one");
        idx.replace(
            "https://s.edu/a",
            vec!["old chunk a".to_string(), "old chunk b".to_string(), "old chunk c".to_string()],
            &old_hash,
        )
        .await
        .unwrap();
        assert_eq!(store.count_by_url("https://s.edu/a").await.unwrap(), 3);

        let new_hash = content_hash("version two");
        idx.replace("https://s.edu/a", vec!["new chunk".to_string()], &new_hash)
            .await
            .unwrap();

        // Only the new generation remains, in full
        assert_eq!(store.count_by_url("https://s.edu/a").await.unwrap(), 1);
        for p in store.points() {
            assert_eq!(p.payload.content_hash, new_hash);
        }
    }

    #[tokio::test]
    async fn test_replace_leaves_other_urls_alone() {
        let store = Arc::new(MemoryStore::new());
        let idx = indexer(store.clone());

        idx.replace("https://s.edu/a", vec!["a text".to_string()], &content_hash("a"))
            .await
            .unwrap();
        idx.replace("https://s.edu/b", vec!["b text".to_string()], &content_hash("b"))
            .await
            .unwrap();

        assert_eq!(store.count_by_url("https://s.edu/a").await.unwrap(), 1);
        assert_eq!(store.count_by_url("https://s.edu/b").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_empty_chunks_no_write() {
        let store = Arc::new(MemoryStore::new());
        let idx = indexer(store.clone());
        let written = idx
            .replace("https://s.edu/a", Vec::new(), &content_hash(""))
            .await
            .unwrap();
        assert_eq!(written, 0);
        assert!(store.is_empty());
    }
}
