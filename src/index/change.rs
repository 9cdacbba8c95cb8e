//! Content-hash change detection
//!
//! Decides whether a page's normalized text needs re-indexing by comparing
//! its SHA-256 digest to the hash stored with the page's current chunk
//! generation. Read-only over the store; callers gate on minimum content
//! length before asking.

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::index::IndexError;
use crate::store::VectorStore;

/// Outcome of comparing fresh content against the stored generation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentStatus {
    /// No chunks stored for this URL yet
    New,
    /// Stored hash differs from the fresh content's hash
    Changed,
    /// Stored hash matches; re-indexing would be a no-op
    Unchanged,
}

/// SHA-256 of the text's UTF-8 bytes, as lowercase hex.
///
/// Stable across restarts and platforms; equal text always hashes equal,
/// which is what the Unchanged short-circuit relies on.
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

/// Compare fresh normalized text against the stored generation for `url`.
///
/// Returns the status and the fresh content's hash so callers never hash
/// the same text twice.
pub async fn decide(
    store: &dyn VectorStore,
    url: &str,
    text: &str,
) -> Result<(ContentStatus, String), IndexError> {
    let fresh = content_hash(text);
    let status = match store.stored_hash(url).await? {
        None => ContentStatus::New,
        Some(stored) if stored == fresh => ContentStatus::Unchanged,
        Some(_) => ContentStatus::Changed,
    };
    debug!(url, ?status, "Change decision");
    Ok((status, fresh))
}
