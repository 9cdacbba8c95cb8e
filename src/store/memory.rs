//! In-memory vector store
//!
//! Backs tests and offline runs with the same [`VectorStore`] surface as
//! the Qdrant client, including brute-force cosine search. Useful for
//! exercising the pipeline end to end without a running store.

use std::sync::Mutex;

use async_trait::async_trait;
use tracing::debug;

use crate::store::{ChunkPoint, ScoredChunk, SearchParams, StoreError, VectorStore};

/// In-process [`VectorStore`] implementation
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    dimensions: Option<usize>,
    points: Vec<ChunkPoint>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of stored points
    pub fn len(&self) -> usize {
        self.inner.lock().expect("memory store lock").points.len()
    }

    /// Whether the store holds no points
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of every stored point, in insertion order
    pub fn points(&self) -> Vec<ChunkPoint> {
        self.inner.lock().expect("memory store lock").points.clone()
    }
}

#[async_trait]
impl VectorStore for MemoryStore {
    async fn ensure_collection(&self, dimensions: usize) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().expect("memory store lock");
        match inner.dimensions {
            Some(existing) if existing != dimensions => Err(StoreError::DimensionMismatch {
                expected: existing,
                actual: dimensions,
            }),
            Some(_) => Ok(()),
            None => {
                inner.dimensions = Some(dimensions);
                Ok(())
            }
        }
    }

    async fn upsert(&self, points: Vec<ChunkPoint>) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().expect("memory store lock");
        if let Some(dims) = inner.dimensions {
            if let Some(bad) = points.iter().find(|p| p.vector.len() != dims) {
                return Err(StoreError::DimensionMismatch {
                    expected: dims,
                    actual: bad.vector.len(),
                });
            }
        }
        for point in points {
            if let Some(existing) = inner.points.iter_mut().find(|p| p.id == point.id) {
                *existing = point;
            } else {
                inner.points.push(point);
            }
        }
        Ok(())
    }

    async fn delete_stale(&self, url: &str, keep_hash: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().expect("memory store lock");
        let before = inner.points.len();
        inner
            .points
            .retain(|p| p.payload.url != url || p.payload.content_hash == keep_hash);
        debug!(url, removed = before - inner.points.len(), "Deleted stale points");
        Ok(())
    }

    async fn stored_hash(&self, url: &str) -> Result<Option<String>, StoreError> {
        let inner = self.inner.lock().expect("memory store lock");
        Ok(inner
            .points
            .iter()
            .find(|p| p.payload.url == url)
            .map(|p| p.payload.content_hash.clone()))
    }

    async fn count_by_url(&self, url: &str) -> Result<usize, StoreError> {
        let inner = self.inner.lock().expect("memory store lock");
        Ok(inner.points.iter().filter(|p| p.payload.url == url).count())
    }

    async fn search(
        &self,
        vector: Vec<f32>,
        params: &SearchParams,
    ) -> Result<Vec<ScoredChunk>, StoreError> {
        let inner = self.inner.lock().expect("memory store lock");
        let mut hits: Vec<ScoredChunk> = inner
            .points
            .iter()
            .filter(|p| match &params.url_filter {
                Some(url) => &p.payload.url == url,
                None => true,
            })
            .map(|p| ScoredChunk {
                score: cosine_similarity(&vector, &p.vector),
                payload: p.payload.clone(),
            })
            .filter(|hit| match params.score_threshold {
                Some(threshold) => hit.score >= threshold,
                None => true,
            })
            .collect();
        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(params.limit);
        Ok(hits)
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
