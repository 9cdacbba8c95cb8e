//! # Ivy - Crawl-and-Freshness Pipeline for School-Site RAG
//!
//! This crate crawls school websites, extracts and chunks their text, computes
//! embeddings, and keeps a vector index fresh for retrieval-augmented question
//! answering. The heart of the crate is the crawl-and-freshness pipeline: a
//! breadth-first, same-domain crawler with per-domain serialization, polite
//! rate limiting, file-download filtering, and content-change detection
//! feeding an idempotent embedding/indexing step.
//!
//! ## Features
//!
//! - Breadth-first same-domain crawling over a headless rendering engine
//! - Per-domain locks so a site is never crawled concurrently with itself
//! - Deterministic HTML-to-text normalization and content hashing
//! - Recursive character chunking with overlap
//! - Hash-gated, per-URL atomic replacement of indexed chunks
//! - Vector store and embedding provider behind injectable traits
//! - Async API with Tokio
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use ivy::crawler::{CrawlerConfig, DomainLocks};
//! use ivy::embedder::MockEmbedder;
//! use ivy::pipeline::{CrawlJob, PipelineDeps, run_crawl_job};
//! use ivy::store::MemoryStore;
//!
//! # async fn run(renderer: Arc<dyn ivy::crawler::PageRenderer>) -> anyhow::Result<()> {
//! let deps = PipelineDeps::new(
//!     renderer,
//!     Arc::new(MemoryStore::new()),
//!     Arc::new(MockEmbedder::new(1536)),
//! );
//! let job = CrawlJob::new("https://example.edu/".parse()?, 2);
//! let report =
//!     run_crawl_job(&deps, &DomainLocks::default(), &CrawlerConfig::default(), job).await?;
//! println!("indexed {} of {} pages", report.indexed, report.urls_found);
//! # Ok(())
//! # }
//! ```

mod error;

pub mod crawler;
pub mod embedder;
pub mod index;
pub mod pipeline;
pub mod processor;
pub mod search;
pub mod store;

pub use error::Error;

/// Re-export of commonly used types for public use
pub mod prelude {
    pub use crate::crawler::{CrawlerConfig, DomainLocks, PageRenderer, RenderedPage};
    pub use crate::embedder::EmbeddingProvider;
    pub use crate::error::{Error, Result};
    pub use crate::index::{ContentStatus, Indexer, content_hash};
    pub use crate::pipeline::{CrawlJob, PipelineDeps, ProcessOutcome};
    pub use crate::store::VectorStore;
}
