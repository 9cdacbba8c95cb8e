//! Error types for the crawler module

use crate::error::Error as CrateError;
use thiserror::Error;

/// Error type for crawler operations
#[derive(Debug, Error)]
pub enum CrawlError {
    /// The rendering engine could not be launched
    #[error("Browser launch error: {0}")]
    Launch(String),

    /// Page rendering error
    #[error("Render error for {url}: {message}")]
    Render {
        /// URL that failed to render
        url: String,
        /// Underlying engine message
        message: String,
    },

    /// A page did not reach DOM-ready within the attempt timeout
    #[error("Timed out after {secs}s waiting for {url}")]
    Timeout {
        /// URL that timed out
        url: String,
        /// Configured attempt timeout
        secs: u64,
    },

    /// URL parsing error
    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// The root URL has no host to scope the crawl to
    #[error("Root URL has no host: {0}")]
    InvalidRoot(String),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl From<CrawlError> for CrateError {
    fn from(err: CrawlError) -> Self {
        match err {
            CrawlError::UrlParse(e) => CrateError::Url(e),
            _ => CrateError::Crawl(err.to_string()),
        }
    }
}
