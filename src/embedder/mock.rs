//! Deterministic embedder for tests and offline runs

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::embedder::{EmbedError, EmbeddingProvider};

/// [`EmbeddingProvider`] that derives vectors from the text itself.
///
/// The same text always maps to the same vector, and different texts
/// almost always map to different vectors, which is enough for
/// exercising the indexer and the search path without a network.
#[derive(Debug)]
pub struct MockEmbedder {
    dimensions: usize,
    calls: AtomicUsize,
}

impl MockEmbedder {
    /// Create a mock producing vectors of `dimensions` length
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of embed calls made so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn vector_for(&self, text: &str) -> Vec<f32> {
        // FNV-1a over the bytes, re-seeded per component
        let mut vector = Vec::with_capacity(self.dimensions);
        for i in 0..self.dimensions {
            let mut hash = 0xcbf29ce484222325u64 ^ (i as u64).wrapping_mul(0x100000001b3);
            for byte in text.bytes() {
                hash ^= byte as u64;
                hash = hash.wrapping_mul(0x100000001b3);
            }
            vector.push((hash % 2000) as f32 / 1000.0 - 1.0);
        }
        vector
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|t| self.vector_for(t)).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
