//! Error types for the index module

use crate::embedder::EmbedError;
use crate::error::Error as CrateError;
use crate::store::StoreError;
use thiserror::Error;

/// Error type for indexing operations
#[derive(Debug, Error)]
pub enum IndexError {
    /// Vector store failure
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Embedding failure
    #[error("Embedding error: {0}")]
    Embed(#[from] EmbedError),

    /// Embedder returned fewer or more vectors than chunks
    #[error("Expected {expected} vectors, got {actual}")]
    VectorCountMismatch {
        /// Number of chunks submitted
        expected: usize,
        /// Number of vectors returned
        actual: usize,
    },

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl From<IndexError> for CrateError {
    fn from(err: IndexError) -> Self {
        CrateError::Index(err.to_string())
    }
}
