//! Pipeline module
//!
//! Ties the stages together: crawl a site, normalize each page, gate on
//! content length, skip unchanged pages by hash, chunk and re-index the
//! rest. `run_crawl_job` is the unit of scheduled work for one site;
//! `run_site_batch` fans a list of sites out over a bounded number of
//! concurrent jobs, with per-domain locks keeping same-domain jobs
//! serialized. The whole pipeline is idempotent under at-least-once
//! delivery: re-running a job against unchanged content writes nothing.

mod error;

pub use error::PipelineError;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::time::sleep;
use tracing::{info, instrument, warn};
use url::Url;

use crate::crawler::{CrawlerConfig, DomainLocks, PageRenderer, crawl};
use crate::embedder::EmbeddingProvider;
use crate::index::{ContentStatus, IndexConfig, IndexError, Indexer, decide};
use crate::processor::{ProcessorConfig, split_text};
use crate::store::VectorStore;

/// Pages from one crawl processed concurrently, per job
const PAGE_CONCURRENCY: usize = 4;

/// One site to crawl: root URL and link depth
#[derive(Debug, Clone)]
pub struct CrawlJob {
    /// Crawl entry point
    pub root_url: Url,

    /// How many link hops to follow from the root
    pub max_depth: usize,
}

impl CrawlJob {
    /// Create a job for `root_url` crawled to `max_depth` hops
    pub fn new(root_url: Url, max_depth: usize) -> Self {
        Self {
            root_url,
            max_depth,
        }
    }
}

/// Shared dependencies every pipeline run needs
#[derive(Clone)]
pub struct PipelineDeps {
    /// Headless rendering engine
    pub renderer: Arc<dyn PageRenderer>,

    /// Vector store being kept fresh
    pub store: Arc<dyn VectorStore>,

    /// Embedding backend
    pub embedder: Arc<dyn EmbeddingProvider>,

    /// Normalization and chunking settings
    pub processor: ProcessorConfig,

    /// Retry policy applied per page at the task boundary
    pub retry: RetryPolicy,
}

impl PipelineDeps {
    /// Bundle the three backends with default processing and retry settings
    pub fn new(
        renderer: Arc<dyn PageRenderer>,
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Self {
        Self {
            renderer,
            store,
            embedder,
            processor: ProcessorConfig::default(),
            retry: RetryPolicy::default(),
        }
    }

    /// Override the processor configuration
    pub fn with_processor_config(mut self, processor: ProcessorConfig) -> Self {
        self.processor = processor;
        self
    }

    /// Override the retry policy
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

/// Bounded retries with linear backoff, applied around per-page processing
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first (at least 1)
    pub max_attempts: usize,

    /// Backoff grows linearly: attempt n sleeps n times this
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Run `op` until it succeeds or attempts run out, sleeping
    /// `attempt * base_delay` between tries
    pub async fn run<T, E, F, Fut>(&self, mut op: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1usize;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if attempt < max_attempts => {
                    warn!(%err, attempt, max_attempts, "Attempt failed, retrying");
                    sleep(self.base_delay * attempt as u32).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

/// What processing one page amounted to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// Page was (re-)indexed as a fresh chunk generation
    Indexed {
        /// Chunks written
        chunks: usize,
        /// Hash the generation is tagged with
        content_hash: String,
    },
    /// Stored hash matched; nothing written
    SkippedUnchanged,
    /// Normalized text below the minimum length; nothing written
    SkippedInsufficient,
}

/// Run one page through the freshness gate and, when needed, the indexer.
///
/// Length gate first, then the hash comparison, then chunk-and-replace.
/// Safe to re-run: a second pass over the same text is `SkippedUnchanged`.
#[instrument(skip_all, fields(url = %url))]
pub async fn process_page(
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    config: &ProcessorConfig,
    url: &str,
    text: &str,
) -> Result<ProcessOutcome, PipelineError> {
    if text.chars().count() < config.min_content_chars {
        return Ok(ProcessOutcome::SkippedInsufficient);
    }

    let (status, content_hash) = decide(store.as_ref(), url, text).await?;
    if status == ContentStatus::Unchanged {
        // A replace interrupted between upsert and stale deletion leaves
        // the previous generation behind; deletion is idempotent, so sweep
        // on every visit rather than only when content changes.
        store
            .delete_stale(url, &content_hash)
            .await
            .map_err(IndexError::from)?;
        return Ok(ProcessOutcome::SkippedUnchanged);
    }

    let chunks = split_text(text, &config.chunk_options)?;
    let index_config = IndexConfig::builder()
        .dimensions(embedder.dimensions())
        .build();
    let written = Indexer::new(store, embedder, index_config)
        .replace(url, chunks, &content_hash)
        .await?;
    Ok(ProcessOutcome::Indexed {
        chunks: written,
        content_hash,
    })
}

/// Summary of one completed crawl job
#[derive(Debug, Clone)]
pub struct CrawlReport {
    /// Root the crawl started from
    pub root_url: Url,

    /// Pages the crawler fetched and normalized
    pub urls_found: usize,

    /// Pages written as fresh chunk generations
    pub indexed: usize,

    /// Pages skipped because their hash matched the store
    pub skipped_unchanged: usize,

    /// Pages skipped for insufficient content
    pub skipped_insufficient: usize,

    /// Pages whose processing failed after retries
    pub failed: usize,
}

/// Crawl one site and bring its pages up to date in the index.
///
/// The crawl itself holds the site's domain lock; page processing then
/// proceeds over a bounded pool, each page retried per the deps' policy.
/// Per-page failures are counted, not fatal.
#[instrument(skip(deps, locks, config), fields(root = %job.root_url, max_depth = job.max_depth))]
pub async fn run_crawl_job(
    deps: &PipelineDeps,
    locks: &DomainLocks,
    config: &CrawlerConfig,
    job: CrawlJob,
) -> Result<CrawlReport, PipelineError> {
    let pages = crawl(
        deps.renderer.as_ref(),
        locks,
        config,
        &job.root_url,
        job.max_depth,
    )
    .await?;

    let mut report = CrawlReport {
        root_url: job.root_url.clone(),
        urls_found: pages.len(),
        indexed: 0,
        skipped_unchanged: 0,
        skipped_insufficient: 0,
        failed: 0,
    };

    let semaphore = Arc::new(Semaphore::new(PAGE_CONCURRENCY));
    let mut handles = Vec::with_capacity(pages.len());
    for (url, text) in pages {
        let semaphore = semaphore.clone();
        let store = deps.store.clone();
        let embedder = deps.embedder.clone();
        let processor = deps.processor.clone();
        let retry = deps.retry.clone();
        handles.push(tokio::spawn(async move {
            let _permit = semaphore.acquire().await.expect("semaphore never closed");
            let outcome = retry
                .run(|| {
                    process_page(
                        store.clone(),
                        embedder.clone(),
                        &processor,
                        url.as_str(),
                        &text,
                    )
                })
                .await;
            (url, outcome)
        }));
    }

    for handle in handles {
        let (url, outcome) = handle
            .await
            .map_err(|e| PipelineError::Join(e.to_string()))?;
        match outcome {
            Ok(ProcessOutcome::Indexed { chunks, .. }) => {
                info!(%url, chunks, "Indexed page");
                report.indexed += 1;
            }
            Ok(ProcessOutcome::SkippedUnchanged) => report.skipped_unchanged += 1,
            Ok(ProcessOutcome::SkippedInsufficient) => report.skipped_insufficient += 1,
            Err(err) => {
                warn!(%url, %err, "Page processing failed");
                report.failed += 1;
            }
        }
    }

    info!(
        urls_found = report.urls_found,
        indexed = report.indexed,
        skipped_unchanged = report.skipped_unchanged,
        skipped_insufficient = report.skipped_insufficient,
        failed = report.failed,
        "Crawl job finished"
    );
    Ok(report)
}

/// Result of one site within a batch
#[derive(Debug)]
pub struct SiteOutcome {
    /// Root the site's crawl started from
    pub root_url: Url,

    /// The site's report, or the error that stopped its job
    pub result: Result<CrawlReport, PipelineError>,
}

/// Run a batch of crawl jobs, at most `concurrency` sites at a time.
///
/// Different domains crawl in parallel; jobs sharing a domain serialize on
/// the domain lock. One site failing does not stop the others. Outcomes
/// come back in input order.
pub async fn run_site_batch(
    deps: &PipelineDeps,
    locks: &DomainLocks,
    config: &CrawlerConfig,
    jobs: Vec<CrawlJob>,
    concurrency: usize,
) -> Vec<SiteOutcome> {
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut handles = Vec::with_capacity(jobs.len());
    for job in jobs {
        let semaphore = semaphore.clone();
        let deps = deps.clone();
        let locks = locks.clone();
        let config = config.clone();
        handles.push(tokio::spawn(async move {
            let _permit = semaphore.acquire().await.expect("semaphore never closed");
            let root_url = job.root_url.clone();
            let result = run_crawl_job(&deps, &locks, &config, job).await;
            SiteOutcome { root_url, result }
        }));
    }

    let mut outcomes = Vec::with_capacity(handles.len());
    for handle in handles {
        match handle.await {
            Ok(outcome) => outcomes.push(outcome),
            Err(e) => warn!(error = %e, "Site job panicked"),
        }
    }
    outcomes
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use crate::crawler::{CrawlError, RenderedPage};
    use crate::embedder::MockEmbedder;
    use crate::index::content_hash;
    use crate::store::{ChunkPayload, ChunkPoint, MemoryStore, ScoredChunk, SearchParams, StoreError};

    /// Renderer serving pages from a mutable map
    struct FakeSite {
        pages: Mutex<HashMap<String, String>>,
    }

    impl FakeSite {
        fn new(pages: &[(&str, &str)]) -> Self {
            Self {
                pages: Mutex::new(
                    pages
                        .iter()
                        .map(|(u, h)| (u.to_string(), h.to_string()))
                        .collect(),
                ),
            }
        }

        fn set_page(&self, url: &str, html: &str) {
            self.pages
                .lock()
                .unwrap()
                .insert(url.to_string(), html.to_string());
        }
    }

    #[async_trait]
    impl PageRenderer for FakeSite {
        async fn render(&self, url: &Url, _user_agent: &str) -> Result<RenderedPage, CrawlError> {
            let pages = self.pages.lock().unwrap();
            match pages.get(url.as_str()) {
                Some(html) => Ok(RenderedPage {
                    url: url.clone(),
                    html: html.clone(),
                }),
                None => Err(CrawlError::Render {
                    url: url.to_string(),
                    message: "page not found".to_string(),
                }),
            }
        }
    }

    fn body(text: &str) -> String {
        format!("<html><body><main><p>{text}</p></main></body></html>")
    }

    fn long_text(label: &str) -> String {
        format!(
            "{label}: the admissions office announced that the application window \
             for the coming school year opens on the first Monday of March and \
             closes at the end of the month."
        )
    }

    fn fast_config() -> CrawlerConfig {
        CrawlerConfig::builder()
            .page_delay_ms(0)
            .initial_delay_secs(0, 0)
            .build()
    }

    fn fast_deps(renderer: Arc<dyn PageRenderer>, store: Arc<MemoryStore>) -> PipelineDeps {
        PipelineDeps::new(renderer, store, Arc::new(MockEmbedder::new(8))).with_retry_policy(
            RetryPolicy {
                max_attempts: 1,
                base_delay: Duration::from_millis(0),
            },
        )
    }

    #[tokio::test]
    async fn test_process_page_gates_short_content() {
        let store = Arc::new(MemoryStore::new());
        let outcome = process_page(
            store.clone(),
            Arc::new(MockEmbedder::new(8)),
            &ProcessorConfig::default(),
            "https://s.edu/a",
            "too short",
        )
        .await
        .unwrap();
        assert_eq!(outcome, ProcessOutcome::SkippedInsufficient);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_process_page_indexes_then_skips_unchanged() {
        let store = Arc::new(MemoryStore::new());
        let embedder = Arc::new(MockEmbedder::new(8));
        let config = ProcessorConfig::default();
        let text = long_text("notices");

        let first = process_page(
            store.clone(),
            embedder.clone(),
            &config,
            "https://s.edu/a",
            &text,
        )
        .await
        .unwrap();
        let ProcessOutcome::Indexed { chunks, content_hash: hash } = first else {
            panic!("expected Indexed, got {first:?}");
        };
        assert!(chunks > 0);
        assert_eq!(hash, content_hash(&text));

        let second = process_page(store.clone(), embedder, &config, "https://s.edu/a", &text)
            .await
            .unwrap();
        assert_eq!(second, ProcessOutcome::SkippedUnchanged);
        assert_eq!(
            store.count_by_url("https://s.edu/a").await.unwrap(),
            chunks
        );
    }

    #[tokio::test]
    async fn test_unchanged_page_sweeps_leftover_stale_generation() {
        // A crash between upsert and stale deletion leaves two generations
        // for one URL. The next visit decides Unchanged against the fresh
        // hash but must still purge the old generation.
        let store = Arc::new(MemoryStore::new());
        let text = long_text("notices");
        let fresh = content_hash(&text);

        let leftover = |id: &str, hash: &str| ChunkPoint {
            id: id.to_string(),
            vector: vec![0.0; 8],
            payload: ChunkPayload {
                text: "stored chunk".to_string(),
                url: "https://s.edu/a".to_string(),
                chunk_index: 0,
                total_chunks: 1,
                content_hash: hash.to_string(),
                updated_at: "2024-01-01T00:00:00Z".to_string(),
            },
        };
        store
            .upsert(vec![leftover("new-gen", &fresh), leftover("old-gen", "stale-hash")])
            .await
            .unwrap();

        let outcome = process_page(
            store.clone(),
            Arc::new(MockEmbedder::new(8)),
            &ProcessorConfig::default(),
            "https://s.edu/a",
            &text,
        )
        .await
        .unwrap();
        assert_eq!(outcome, ProcessOutcome::SkippedUnchanged);

        let points = store.points();
        assert_eq!(points.len(), 1);
        assert!(points.iter().all(|p| p.payload.content_hash == fresh));
    }

    #[tokio::test]
    async fn test_process_page_replaces_changed_content() {
        let store = Arc::new(MemoryStore::new());
        let embedder = Arc::new(MockEmbedder::new(8));
        let config = ProcessorConfig::default();

        let old = long_text("old version");
        process_page(store.clone(), embedder.clone(), &config, "https://s.edu/a", &old)
            .await
            .unwrap();

        let new = long_text("new version");
        let outcome =
            process_page(store.clone(), embedder, &config, "https://s.edu/a", &new)
                .await
                .unwrap();
        let ProcessOutcome::Indexed { content_hash: new_hash, .. } = outcome else {
            panic!("expected Indexed, got {outcome:?}");
        };

        // No old-generation point survives
        for p in store.points() {
            assert_eq!(p.payload.content_hash, new_hash);
        }
    }

    #[tokio::test]
    async fn test_run_crawl_job_end_to_end() {
        let site = Arc::new(FakeSite::new(&[
            (
                "https://school.example.edu/",
                &format!(
                    r#"<html><body><main><p>{}</p>
                    <a href="/news">News</a></main></body></html>"#,
                    long_text("home")
                ),
            ),
            ("https://school.example.edu/news", &body(&long_text("news"))),
        ]));
        let store = Arc::new(MemoryStore::new());
        let deps = fast_deps(site, store.clone());
        let job = CrawlJob::new("https://school.example.edu/".parse().unwrap(), 2);

        let report = run_crawl_job(&deps, &DomainLocks::default(), &fast_config(), job)
            .await
            .unwrap();
        assert_eq!(report.urls_found, 2);
        assert_eq!(report.indexed, 2);
        assert_eq!(report.failed, 0);
        assert!(store.count_by_url("https://school.example.edu/news").await.unwrap() > 0);
    }

    #[tokio::test]
    async fn test_rerun_is_idempotent() {
        let site = Arc::new(FakeSite::new(&[(
            "https://school.example.edu/",
            &body(&long_text("home")),
        )]));
        let store = Arc::new(MemoryStore::new());
        let deps = fast_deps(site, store.clone());
        let locks = DomainLocks::default();
        let config = fast_config();
        let job = CrawlJob::new("https://school.example.edu/".parse().unwrap(), 0);

        let first = run_crawl_job(&deps, &locks, &config, job.clone()).await.unwrap();
        assert_eq!(first.indexed, 1);
        let count_after_first = store.len();

        let second = run_crawl_job(&deps, &locks, &config, job).await.unwrap();
        assert_eq!(second.indexed, 0);
        assert_eq!(second.skipped_unchanged, 1);
        assert_eq!(store.len(), count_after_first);
    }

    #[tokio::test]
    async fn test_changed_page_reindexed_on_next_run() {
        let site = Arc::new(FakeSite::new(&[(
            "https://school.example.edu/",
            &body(&long_text("first edition")),
        )]));
        let store = Arc::new(MemoryStore::new());
        let deps = fast_deps(site.clone(), store.clone());
        let locks = DomainLocks::default();
        let config = fast_config();
        let job = CrawlJob::new("https://school.example.edu/".parse().unwrap(), 0);

        run_crawl_job(&deps, &locks, &config, job.clone()).await.unwrap();
        site.set_page(
            "https://school.example.edu/",
            &body(&long_text("second edition")),
        );
        let report = run_crawl_job(&deps, &locks, &config, job).await.unwrap();
        assert_eq!(report.indexed, 1);

        let hashes: Vec<String> = store
            .points()
            .iter()
            .map(|p| p.payload.content_hash.clone())
            .collect();
        assert!(!hashes.is_empty());
        assert!(hashes.iter().all(|h| h == &hashes[0]));
    }

    #[tokio::test]
    async fn test_thin_pages_counted_as_insufficient() {
        let site = Arc::new(FakeSite::new(&[(
            "https://school.example.edu/",
            &body("Under construction"),
        )]));
        let store = Arc::new(MemoryStore::new());
        let deps = fast_deps(site, store.clone());
        let job = CrawlJob::new("https://school.example.edu/".parse().unwrap(), 0);

        let report = run_crawl_job(&deps, &DomainLocks::default(), &fast_config(), job)
            .await
            .unwrap();
        assert_eq!(report.urls_found, 1);
        assert_eq!(report.skipped_insufficient, 1);
        assert!(store.is_empty());
    }

    /// Store whose first `failures` upserts fail with a transient error
    struct FlakyStore {
        inner: MemoryStore,
        failures: AtomicUsize,
    }

    #[async_trait]
    impl crate::store::VectorStore for FlakyStore {
        async fn ensure_collection(&self, dimensions: usize) -> Result<(), StoreError> {
            self.inner.ensure_collection(dimensions).await
        }

        async fn upsert(&self, points: Vec<ChunkPoint>) -> Result<(), StoreError> {
            if self.failures.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                n.checked_sub(1)
            })
            .is_ok()
            {
                return Err(StoreError::Api {
                    status: 503,
                    message: "overloaded".to_string(),
                });
            }
            self.inner.upsert(points).await
        }

        async fn delete_stale(&self, url: &str, keep_hash: &str) -> Result<(), StoreError> {
            self.inner.delete_stale(url, keep_hash).await
        }

        async fn stored_hash(&self, url: &str) -> Result<Option<String>, StoreError> {
            self.inner.stored_hash(url).await
        }

        async fn count_by_url(&self, url: &str) -> Result<usize, StoreError> {
            self.inner.count_by_url(url).await
        }

        async fn search(
            &self,
            vector: Vec<f32>,
            params: &SearchParams,
        ) -> Result<Vec<ScoredChunk>, StoreError> {
            self.inner.search(vector, params).await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_policy_recovers_transient_failures() {
        let store = Arc::new(FlakyStore {
            inner: MemoryStore::new(),
            failures: AtomicUsize::new(2),
        });
        let embedder = Arc::new(MockEmbedder::new(8));
        let config = ProcessorConfig::default();
        let policy = RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        };
        let text = long_text("retry me");

        let outcome = policy
            .run(|| {
                process_page(
                    store.clone(),
                    embedder.clone(),
                    &config,
                    "https://s.edu/a",
                    &text,
                )
            })
            .await
            .unwrap();
        assert!(matches!(outcome, ProcessOutcome::Indexed { .. }));
        assert!(store.inner.len() > 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_policy_gives_up() {
        let policy = RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        };
        let attempts = AtomicUsize::new(0);
        let result: Result<(), String> = policy
            .run(|| {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err("always fails".to_string()) }
            })
            .await;
        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_site_batch_isolates_failures() {
        let site = Arc::new(FakeSite::new(&[(
            "https://a.example.edu/",
            &body(&long_text("site a")),
        )]));
        let store = Arc::new(MemoryStore::new());
        let deps = fast_deps(site, store.clone());
        let jobs = vec![
            CrawlJob::new("https://a.example.edu/".parse().unwrap(), 0),
            // data: URLs have no host; this job fails outright
            CrawlJob::new("data:text/plain,nope".parse().unwrap(), 0),
        ];

        let outcomes =
            run_site_batch(&deps, &DomainLocks::default(), &fast_config(), jobs, 2).await;
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes[0].result.is_ok());
        assert!(outcomes[1].result.is_err());
        assert!(store.count_by_url("https://a.example.edu/").await.unwrap() > 0);
    }
}
