//! # Crawler Configuration Module
//!
//! Configuration options for the crawler: depth, politeness delays, retry
//! budget, and the URL filtering heuristics (file-download patterns and
//! skipped extensions). Uses a builder pattern for flexible configuration.
//!
//! The download patterns and extension list are an empirically tuned
//! denylist for school-site boards and attachment endpoints; they are
//! configurable data, not an exhaustive rule set.

use std::time::Duration;

/// Desktop browser signatures the fetcher picks from, one per crawl session.
pub const DEFAULT_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:122.0) Gecko/20100101 Firefox/122.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36 Edg/120.0.0.0",
];

/// Configuration for the crawler
#[derive(Debug, Clone)]
pub struct CrawlerConfig {
    /// Maximum depth to crawl
    pub max_depth: usize,

    /// Fixed delay between successful page fetches, in milliseconds
    pub page_delay_ms: u64,

    /// Bounds (inclusive) of the randomized delay inserted after lock
    /// acquisition, in seconds
    pub initial_delay_secs: (u64, u64),

    /// Per-attempt timeout waiting for DOM-ready, in seconds
    pub fetch_timeout_secs: u64,

    /// Fetch attempts per URL
    pub fetch_attempts: usize,

    /// Linear backoff base between attempts, in seconds (attempt x base)
    pub retry_base_secs: u64,

    /// Case-insensitive substrings marking a URL as a file-download endpoint
    pub download_patterns: Vec<String>,

    /// Path extensions that are never crawled as HTML pages
    pub skip_extensions: Vec<String>,

    /// User-agent pool; one entry is chosen per crawl session
    pub user_agents: Vec<String>,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_depth: 2,
            page_delay_ms: 1_000,
            initial_delay_secs: (2, 6),
            fetch_timeout_secs: 30,
            fetch_attempts: 3,
            retry_base_secs: 5,
            download_patterns: vec![
                "download".to_string(),
                "filedown".to_string(),
                "etcresourcedown".to_string(),
                "attach".to_string(),
                "attachment".to_string(),
                "file.do".to_string(),
            ],
            skip_extensions: vec![
                "pdf".to_string(),
                "jpg".to_string(),
                "jpeg".to_string(),
                "png".to_string(),
                "gif".to_string(),
                "zip".to_string(),
                "doc".to_string(),
                "docx".to_string(),
                "xls".to_string(),
                "xlsx".to_string(),
                "ppt".to_string(),
                "pptx".to_string(),
            ],
            user_agents: DEFAULT_USER_AGENTS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl CrawlerConfig {
    /// Create a new builder
    pub fn builder() -> CrawlerConfigBuilder {
        CrawlerConfigBuilder::new()
    }

    /// Get the between-page delay as a Duration
    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }

    /// Get the per-attempt fetch timeout as a Duration
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

/// Builder for CrawlerConfig
#[derive(Debug, Default)]
pub struct CrawlerConfigBuilder {
    config: CrawlerConfig,
}

impl CrawlerConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: CrawlerConfig::default(),
        }
    }

    /// Set the maximum depth to crawl
    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.config.max_depth = max_depth;
        self
    }

    /// Set the fixed delay between page fetches in milliseconds
    pub fn page_delay_ms(mut self, page_delay_ms: u64) -> Self {
        self.config.page_delay_ms = page_delay_ms;
        self
    }

    /// Set the bounds of the randomized startup delay in seconds
    pub fn initial_delay_secs(mut self, lo: u64, hi: u64) -> Self {
        self.config.initial_delay_secs = (lo, hi.max(lo));
        self
    }

    /// Set the per-attempt fetch timeout in seconds
    pub fn fetch_timeout_secs(mut self, secs: u64) -> Self {
        self.config.fetch_timeout_secs = secs;
        self
    }

    /// Set the number of fetch attempts per URL
    pub fn fetch_attempts(mut self, attempts: usize) -> Self {
        self.config.fetch_attempts = attempts.max(1);
        self
    }

    /// Set the linear backoff base in seconds
    pub fn retry_base_secs(mut self, secs: u64) -> Self {
        self.config.retry_base_secs = secs;
        self
    }

    /// Replace the file-download substring patterns
    pub fn download_patterns(mut self, patterns: Vec<String>) -> Self {
        self.config.download_patterns = patterns;
        self
    }

    /// Replace the skipped extension list
    pub fn skip_extensions(mut self, extensions: Vec<String>) -> Self {
        self.config.skip_extensions = extensions;
        self
    }

    /// Replace the user-agent pool
    pub fn user_agents(mut self, user_agents: Vec<String>) -> Self {
        self.config.user_agents = user_agents;
        self
    }

    /// Build the configuration
    pub fn build(self) -> CrawlerConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CrawlerConfig::default();
        assert_eq!(config.max_depth, 2);
        assert_eq!(config.fetch_attempts, 3);
        assert!(config.download_patterns.contains(&"filedown".to_string()));
        assert!(config.skip_extensions.contains(&"pdf".to_string()));
        assert!(!config.user_agents.is_empty());
    }

    #[test]
    fn test_builder() {
        let config = CrawlerConfig::builder()
            .max_depth(4)
            .page_delay_ms(250)
            .initial_delay_secs(0, 0)
            .fetch_attempts(0)
            .build();

        assert_eq!(config.max_depth, 4);
        assert_eq!(config.page_delay(), Duration::from_millis(250));
        assert_eq!(config.initial_delay_secs, (0, 0));
        // attempts are clamped to at least one
        assert_eq!(config.fetch_attempts, 1);
    }
}
