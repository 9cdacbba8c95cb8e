//! Error types for the embedding module

use crate::error::Error as CrateError;
use thiserror::Error;

/// Error type for embedding operations
#[derive(Debug, Error)]
pub enum EmbedError {
    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The embeddings API returned an error response
    #[error("Embeddings API error ({status}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Response body
        message: String,
    },

    /// Response could not be decoded
    #[error("Response decode error: {0}")]
    Decode(String),

    /// The API returned the wrong number of vectors
    #[error("Expected {expected} embeddings, got {actual}")]
    CountMismatch {
        /// Number of input texts
        expected: usize,
        /// Number of vectors returned
        actual: usize,
    },

    /// Invalid configuration
    #[error("Invalid embedder configuration: {0}")]
    Config(String),
}

impl From<EmbedError> for CrateError {
    fn from(err: EmbedError) -> Self {
        match err {
            EmbedError::Http(e) => CrateError::Http(e),
            _ => CrateError::Embedding(err.to_string()),
        }
    }
}
