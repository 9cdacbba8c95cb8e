//! Index module
//!
//! The write path of the vector index: content-hash change detection and
//! per-URL replacement of chunk generations. Replacement inserts the new
//! generation first and deletes the stale one second, so a concurrent
//! reader sees the old chunks or the new chunks but never nothing.

mod change;
mod config;
mod error;
mod indexer;

pub use change::{ContentStatus, content_hash, decide};
pub use config::{DEFAULT_COLLECTION, IndexConfig, IndexConfigBuilder};
pub use error::IndexError;
pub use indexer::Indexer;
