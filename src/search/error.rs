//! Error types for the search module

use crate::embedder::EmbedError;
use crate::error::Error as CrateError;
use crate::store::StoreError;
use thiserror::Error;

/// Error type for search operations
#[derive(Debug, Error)]
pub enum SearchError {
    /// The query was empty or whitespace
    #[error("Query must not be empty")]
    EmptyQuery,

    /// Embedding failure
    #[error("Embedding error: {0}")]
    Embed(#[from] EmbedError),

    /// Vector store failure
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl From<SearchError> for CrateError {
    fn from(err: SearchError) -> Self {
        CrateError::Search(err.to_string())
    }
}
