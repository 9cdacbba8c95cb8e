//! Error types for the pipeline module

use crate::crawler::CrawlError;
use crate::error::Error as CrateError;
use crate::index::IndexError;
use crate::processor::ProcessError;
use thiserror::Error;

/// Error type for pipeline operations
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Crawl failure
    #[error("Crawl error: {0}")]
    Crawl(#[from] CrawlError),

    /// Normalization or chunking failure
    #[error("Process error: {0}")]
    Process(#[from] ProcessError),

    /// Indexing failure
    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    /// A spawned task panicked or was cancelled
    #[error("Task join error: {0}")]
    Join(String),
}

impl From<PipelineError> for CrateError {
    fn from(err: PipelineError) -> Self {
        CrateError::Pipeline(err.to_string())
    }
}
