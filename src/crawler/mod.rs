//! Website crawler module
//!
//! This module provides the breadth-first, same-domain crawler that discovers
//! the reachable set of pages under a root URL, renders each page through a
//! headless browser, and yields normalized text per page. Crawls of the same
//! domain are serialized through [`DomainLocks`].

mod config;
mod engine;
mod error;
mod fetcher;
mod links;
mod locks;
mod render;

pub use config::{CrawlerConfig, CrawlerConfigBuilder};
pub use engine::crawl;
pub use error::CrawlError;
pub use fetcher::Fetcher;
pub use links::{UrlFilters, extract_links};
pub use locks::DomainLocks;
pub use render::{ChromiumRenderer, PageRenderer, RenderedPage};
