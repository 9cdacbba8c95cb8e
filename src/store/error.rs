//! Error types for the vector store module

use crate::error::Error as CrateError;
use thiserror::Error;

/// Error type for vector store operations
#[derive(Debug, Error)]
pub enum StoreError {
    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The store returned an error response
    #[error("Store API error ({status}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Response body
        message: String,
    },

    /// Response could not be decoded
    #[error("Response decode error: {0}")]
    Decode(String),

    /// Invalid configuration
    #[error("Invalid store configuration: {0}")]
    Config(String),

    /// Vector dimensionality does not match the collection
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Collection dimensionality
        expected: usize,
        /// Offered vector length
        actual: usize,
    },

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl From<StoreError> for CrateError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Http(e) => CrateError::Http(e),
            _ => CrateError::Store(err.to_string()),
        }
    }
}
