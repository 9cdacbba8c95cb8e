//! Link extraction and URL filtering
//!
//! Pulls anchor hrefs out of rendered HTML, resolves them against the page
//! URL, and filters them down to same-host, crawlable candidates. The
//! download-pattern and extension heuristics live in [`UrlFilters`] so the
//! engine and the extractor apply exactly the same rules.

use scraper::{Html, Selector};
use tracing::debug;
use url::Url;

use crate::crawler::config::CrawlerConfig;

/// URL filtering rules shared by the engine and the link extractor
#[derive(Debug, Clone)]
pub struct UrlFilters {
    download_patterns: Vec<String>,
    skip_extensions: Vec<String>,
}

impl UrlFilters {
    /// Build filters from a crawler configuration
    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self {
            download_patterns: config
                .download_patterns
                .iter()
                .map(|p| p.to_lowercase())
                .collect(),
            skip_extensions: config
                .skip_extensions
                .iter()
                .map(|e| e.to_lowercase())
                .collect(),
        }
    }

    /// Whether the URL looks like a file-download endpoint.
    ///
    /// Matches case-insensitive substrings over path and query, plus the
    /// board-download combination common on school bulletin boards.
    pub fn is_download(&self, url: &Url) -> bool {
        let mut haystack = url.path().to_lowercase();
        if let Some(query) = url.query() {
            haystack.push('?');
            haystack.push_str(&query.to_lowercase());
        }
        if self.download_patterns.iter().any(|p| haystack.contains(p)) {
            return true;
        }
        haystack.contains("board") && haystack.contains("down")
    }

    /// Whether the URL path ends in an extension that is never an HTML page
    pub fn has_skipped_extension(&self, url: &Url) -> bool {
        let path = url.path().to_lowercase();
        match path.rsplit_once('.') {
            Some((_, ext)) => self.skip_extensions.iter().any(|s| s == ext),
            None => false,
        }
    }
}

/// Extract absolute, deduplicated candidate URLs from a rendered page.
///
/// Rules, in order: collect anchor hrefs; drop empty, fragment-only, and
/// `javascript:` pseudo-links; drop binary/document extensions; resolve
/// relative hrefs against `base`; keep only exact host matches against
/// `root_host`; drop file-download patterns. Frontier/visited dedup is the
/// engine's job.
pub fn extract_links(html: &str, base: &Url, root_host: &str, filters: &UrlFilters) -> Vec<Url> {
    let document = Html::parse_document(html);
    // "a[href]" is a valid static selector
    let selector = Selector::parse("a[href]").expect("anchor selector is valid");

    let mut seen = std::collections::HashSet::new();
    let mut links = Vec::new();

    for element in document.select(&selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let href = href.trim();
        if href.is_empty() || href.starts_with('#') || href.to_lowercase().starts_with("javascript:")
        {
            continue;
        }

        let Ok(mut resolved) = base.join(href) else {
            debug!("Dropping unresolvable href: {}", href);
            continue;
        };
        // Fragments never distinguish pages
        resolved.set_fragment(None);

        if resolved.host_str() != Some(root_host) {
            continue;
        }
        if filters.has_skipped_extension(&resolved) || filters.is_download(&resolved) {
            debug!("Filtered candidate: {}", resolved);
            continue;
        }
        if seen.insert(resolved.clone()) {
            links.push(resolved);
        }
    }

    links
}
