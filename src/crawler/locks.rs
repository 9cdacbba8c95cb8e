//! Per-domain crawl serialization
//!
//! At most one crawl may be in flight for a given domain at any time across
//! the whole process. The registry hands out one long-lived async mutex per
//! domain; creating the entry for an unseen domain happens inside a short
//! synchronous critical section so two concurrent crawls can never end up
//! with two different lock objects for the same domain. The registry guard is
//! never held while waiting on a domain lock.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Process-wide registry of per-domain crawl locks
#[derive(Debug, Clone, Default)]
pub struct DomainLocks {
    registry: Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>,
}

impl DomainLocks {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for `domain`, blocking until it is free.
    ///
    /// Concurrent callers for the same domain string always contend on the
    /// same underlying mutex. There is deliberately no acquisition timeout: a
    /// second crawl of the same domain waits rather than risking interleaved
    /// indexing.
    pub async fn acquire(&self, domain: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut registry = self
                .registry
                .lock()
                .expect("domain lock registry poisoned");
            Arc::clone(registry.entry(domain.to_string()).or_default())
        };
        lock.lock_owned().await
    }

    /// Number of domains seen so far
    pub fn len(&self) -> usize {
        self.registry
            .lock()
            .expect("domain lock registry poisoned")
            .len()
    }

    /// Whether any domain has been registered yet
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
