//! Content processor module
//!
//! This module turns rendered HTML into index-ready material: a deterministic
//! HTML-to-text normalizer and a recursive character chunker. Both are pure
//! functions of their inputs, which is what makes the content-hash based
//! change detection meaningful.

mod chunking;
mod config;
mod error;
mod normalize;

pub use chunking::split_text;
pub use config::{ChunkOptions, ProcessorConfig, ProcessorConfigBuilder};
pub use error::ProcessError;
pub use normalize::normalize;
