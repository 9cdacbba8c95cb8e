//! Single-page fetch with bounded retries
//!
//! Wraps the rendering engine with the attempt budget: up to three attempts
//! with linear backoff (attempt x 5s by default) and a per-attempt
//! DOM-ready timeout. The user-agent is chosen once per fetcher (one per
//! crawl session) from the configured pool. Download-pattern URLs never
//! reach the fetcher; the engine filters them out of the frontier.

use rand::Rng;
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};
use url::Url;

use crate::crawler::config::CrawlerConfig;
use crate::crawler::error::CrawlError;
use crate::crawler::render::{PageRenderer, RenderedPage};

/// Fetches single pages through a renderer with retry and timeout handling
pub struct Fetcher<'a> {
    renderer: &'a dyn PageRenderer,
    config: &'a CrawlerConfig,
    user_agent: String,
}

impl<'a> Fetcher<'a> {
    /// Create a fetcher for one crawl session.
    ///
    /// Picks a user-agent from the pool once, so every request in this crawl
    /// presents the same signature.
    pub fn new(renderer: &'a dyn PageRenderer, config: &'a CrawlerConfig) -> Self {
        let user_agent = if config.user_agents.is_empty() {
            format!("ivy-crawler/{}", env!("CARGO_PKG_VERSION"))
        } else {
            let idx = rand::rng().random_range(0..config.user_agents.len());
            config.user_agents[idx].clone()
        };
        Self {
            renderer,
            config,
            user_agent,
        }
    }

    /// User-agent chosen for this session
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Fetch a page, retrying transient failures.
    ///
    /// After the budget is exhausted the last error propagates to the BFS
    /// loop, which drops the URL from the crawl.
    pub async fn fetch(&self, url: &Url) -> Result<RenderedPage, CrawlError> {
        let attempts = self.config.fetch_attempts.max(1);

        let mut last_err = None;
        for attempt in 1..=attempts {
            debug!(%url, attempt, "Fetching page");
            match timeout(
                self.config.fetch_timeout(),
                self.renderer.render(url, &self.user_agent),
            )
            .await
            {
                Ok(Ok(page)) => return Ok(page),
                Ok(Err(e)) => {
                    warn!(%url, attempt, error = %e, "Fetch attempt failed");
                    last_err = Some(e);
                }
                Err(_) => {
                    warn!(%url, attempt, "Fetch attempt timed out");
                    last_err = Some(CrawlError::Timeout {
                        url: url.to_string(),
                        secs: self.config.fetch_timeout_secs,
                    });
                }
            }

            if attempt < attempts {
                // Linear backoff: attempt x base
                sleep(std::time::Duration::from_secs(
                    attempt as u64 * self.config.retry_base_secs,
                ))
                .await;
            }
        }

        Err(last_err.unwrap_or_else(|| CrawlError::Other("no fetch attempts made".to_string())))
    }
}
