//! Breadth-first crawl engine
//!
//! Classic BFS over a FIFO frontier seeded with the root URL at depth 0.
//! Holds the domain lock for the entire traversal, visits pages strictly
//! sequentially, and yields a map of URL to normalized text. A single failing page never fails the
//! crawl; only engine-level errors do.

use std::collections::{BTreeMap, HashSet, VecDeque};
use std::time::Duration;

use rand::Rng;
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::crawler::config::CrawlerConfig;
use crate::crawler::error::CrawlError;
use crate::crawler::fetcher::Fetcher;
use crate::crawler::links::{UrlFilters, extract_links};
use crate::crawler::locks::DomainLocks;
use crate::crawler::render::PageRenderer;
use crate::processor::normalize;

/// Crawl the same-domain link graph under `root_url` up to `max_depth`.
///
/// Returns url -> normalized text for every page fetched exactly once.
/// The crawl acquires the domain lock before the first fetch and releases it
/// on every exit path; same-domain crawls serialize while different domains
/// proceed fully in parallel.
#[instrument(skip(renderer, locks, config), fields(root = %root_url))]
pub async fn crawl(
    renderer: &dyn PageRenderer,
    locks: &DomainLocks,
    config: &CrawlerConfig,
    root_url: &Url,
    max_depth: usize,
) -> Result<BTreeMap<Url, String>, CrawlError> {
    let root_host = root_url
        .host_str()
        .ok_or_else(|| CrawlError::InvalidRoot(root_url.to_string()))?
        .to_string();

    let _domain_guard = locks.acquire(&root_host).await;
    info!(domain = %root_host, "Acquired domain lock, starting crawl");

    // Scheduled crawls tend to fire in bursts; a randomized startup delay
    // spreads the first requests out.
    let (lo, hi) = config.initial_delay_secs;
    if hi > 0 {
        let jitter = rand::rng().random_range(lo..=hi);
        sleep(Duration::from_secs(jitter)).await;
    }

    let filters = UrlFilters::from_config(config);
    let fetcher = Fetcher::new(renderer, config);

    let mut visited: HashSet<Url> = HashSet::new();
    let mut queued: HashSet<Url> = HashSet::new();
    let mut frontier: VecDeque<(Url, usize)> = VecDeque::new();

    let mut root = root_url.clone();
    root.set_fragment(None);
    queued.insert(root.clone());
    frontier.push_back((root, 0));

    let mut pages: BTreeMap<Url, String> = BTreeMap::new();

    while let Some((url, depth)) = frontier.pop_front() {
        if visited.contains(&url) || depth > max_depth {
            continue;
        }

        // Download endpoints are marked visited but never fetched
        if filters.is_download(&url) || filters.has_skipped_extension(&url) {
            debug!(%url, "Skipping download-like URL");
            visited.insert(url);
            continue;
        }

        match fetcher.fetch(&url).await {
            Ok(page) => {
                visited.insert(url.clone());
                let text = normalize(&page.html);
                debug!(%url, depth, chars = text.len(), "Crawled page");
                pages.insert(url.clone(), text);

                if depth < max_depth {
                    for link in extract_links(&page.html, &url, &root_host, &filters) {
                        if !visited.contains(&link) && queued.insert(link.clone()) {
                            frontier.push_back((link, depth + 1));
                        }
                    }
                }

                // Polite pacing against the target server
                sleep(config.page_delay()).await;
            }
            Err(e) => {
                // The URL is simply absent from the result map; the crawl
                // continues with the rest of the frontier.
                warn!(%url, error = %e, "Giving up on page");
                visited.insert(url);
            }
        }
    }

    info!(
        domain = %root_host,
        pages = pages.len(),
        "Crawl finished"
    );
    Ok(pages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory site: url -> html, with a record of every fetch
    struct FakeSite {
        pages: HashMap<String, String>,
        fetched: Mutex<Vec<String>>,
    }

    impl FakeSite {
        fn new(pages: &[(&str, &str)]) -> Self {
            Self {
                pages: pages
                    .iter()
                    .map(|(u, h)| (u.to_string(), h.to_string()))
                    .collect(),
                fetched: Mutex::new(Vec::new()),
            }
        }

        fn fetch_count(&self, url: &str) -> usize {
            self.fetched
                .lock()
                .unwrap()
                .iter()
                .filter(|u| u.as_str() == url)
                .count()
        }
    }

    #[async_trait]
    impl PageRenderer for FakeSite {
        async fn render(
            &self,
            url: &Url,
            _user_agent: &str,
        ) -> Result<crate::crawler::RenderedPage, CrawlError> {
            self.fetched.lock().unwrap().push(url.to_string());
            match self.pages.get(url.as_str()) {
                Some(html) => Ok(crate::crawler::RenderedPage {
                    url: url.clone(),
                    html: html.clone(),
                }),
                None => Err(CrawlError::Render {
                    url: url.to_string(),
                    message: "not found".to_string(),
                }),
            }
        }
    }

    fn fast_config() -> CrawlerConfig {
        CrawlerConfig::builder()
            .page_delay_ms(0)
            .initial_delay_secs(0, 0)
            .retry_base_secs(0)
            .fetch_attempts(1)
            .build()
    }

    fn page(body_links: &str) -> String {
        format!(
            "<html><body><main><p>Welcome to the school site, this page has enough text to index.</p>{}</main></body></html>",
            body_links
        )
    }

    #[tokio::test]
    async fn test_depth_one_keeps_same_domain_pages_only() {
        // Root links to /a (same domain), other.org/x, and /b.pdf.
        let site = FakeSite::new(&[
            (
                "https://example.edu/",
                &page(
                    r#"<a href="/a">a</a>
                       <a href="https://other.org/x">x</a>
                       <a href="/b.pdf">pdf</a>"#,
                ),
            ),
            ("https://example.edu/a", &page("")),
        ]);
        let root = Url::parse("https://example.edu/").unwrap();
        let pages = crawl(&site, &DomainLocks::new(), &fast_config(), &root, 1)
            .await
            .unwrap();

        let urls: Vec<_> = pages.keys().map(|u| u.as_str()).collect();
        assert_eq!(urls, vec!["https://example.edu/", "https://example.edu/a"]);
    }

    #[tokio::test]
    async fn test_depth_bound_and_no_duplicate_fetches() {
        let site = FakeSite::new(&[
            ("https://example.edu/", &page(r#"<a href="/a">a</a>"#)),
            (
                "https://example.edu/a",
                &page(r#"<a href="/b">b</a><a href="/">home</a>"#),
            ),
            ("https://example.edu/b", &page(r#"<a href="/c">c</a>"#)),
            ("https://example.edu/c", &page("")),
        ]);
        let root = Url::parse("https://example.edu/").unwrap();
        let pages = crawl(&site, &DomainLocks::new(), &fast_config(), &root, 2)
            .await
            .unwrap();

        // /c is at BFS distance 3, beyond max_depth 2
        assert!(
            !pages
                .keys()
                .any(|u| u.as_str() == "https://example.edu/c")
        );
        assert_eq!(pages.len(), 3);
        // Each page fetched exactly once despite the back-link to the root
        assert_eq!(site.fetch_count("https://example.edu/"), 1);
        assert_eq!(site.fetch_count("https://example.edu/a"), 1);
    }

    #[tokio::test]
    async fn test_same_domain_closure() {
        let site = FakeSite::new(&[
            (
                "https://example.edu/",
                &page(r#"<a href="https://evil.example.org/">out</a><a href="/in">in</a>"#),
            ),
            ("https://example.edu/in", &page("")),
        ]);
        let root = Url::parse("https://example.edu/").unwrap();
        let pages = crawl(&site, &DomainLocks::new(), &fast_config(), &root, 3)
            .await
            .unwrap();

        for url in pages.keys() {
            assert_eq!(url.host_str(), Some("example.edu"));
        }
    }

    #[tokio::test]
    async fn test_download_urls_never_in_result() {
        let site = FakeSite::new(&[
            (
                "https://example.edu/",
                &page(r#"<a href="/board/notice.do">board</a>"#),
            ),
            (
                "https://example.edu/board/notice.do",
                &page(r#"<a href="/board/fileDown.do?id=1">file</a>"#),
            ),
        ]);
        let root = Url::parse("https://example.edu/").unwrap();
        let pages = crawl(&site, &DomainLocks::new(), &fast_config(), &root, 3)
            .await
            .unwrap();

        assert!(
            !pages
                .keys()
                .any(|u| u.path().to_lowercase().contains("download")
                    || u.path().to_lowercase().contains("filedown"))
        );
        assert_eq!(site.fetch_count("https://example.edu/board/fileDown.do?id=1"), 0);
    }

    #[tokio::test]
    async fn test_fetch_failure_does_not_abort_crawl() {
        // /missing has no entry in the fake site and fails to render
        let site = FakeSite::new(&[
            (
                "https://example.edu/",
                &page(r#"<a href="/missing">gone</a><a href="/a">a</a>"#),
            ),
            ("https://example.edu/a", &page("")),
        ]);
        let root = Url::parse("https://example.edu/").unwrap();
        let pages = crawl(&site, &DomainLocks::new(), &fast_config(), &root, 1)
            .await
            .unwrap();

        let urls: Vec<_> = pages.keys().map(|u| u.as_str()).collect();
        assert_eq!(urls, vec!["https://example.edu/", "https://example.edu/a"]);
    }

    #[tokio::test]
    async fn test_root_without_host_is_engine_error() {
        let site = FakeSite::new(&[]);
        let root = Url::parse("data:text/plain,hello").unwrap();
        let err = crawl(&site, &DomainLocks::new(), &fast_config(), &root, 1)
            .await
            .unwrap_err();
        assert!(matches!(err, CrawlError::InvalidRoot(_)));
    }
}
