//! Rendering engine boundary
//!
//! The crawler never talks HTTP directly: pages are loaded through a
//! [`PageRenderer`], a headless browser that navigates to a URL, waits for
//! DOM-ready, and hands back the fully rendered HTML. The production
//! implementation drives Chromium over CDP; tests substitute in-memory fakes.

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use url::Url;

use crate::crawler::error::CrawlError;

/// A page as returned by the rendering engine
#[derive(Debug, Clone)]
pub struct RenderedPage {
    /// URL the page was loaded from
    pub url: Url,

    /// Full rendered HTML after DOM-ready
    pub html: String,
}

/// A headless rendering engine the crawler loads pages through.
///
/// Implementations are expected to use a fresh page/tab per call so no state
/// leaks between fetches, while reusing one underlying browser session for
/// the lifetime of the renderer.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    /// Navigate to `url` with the given user-agent, wait for DOM-ready, and
    /// return the rendered HTML. The caller bounds the overall latency.
    async fn render(&self, url: &Url, user_agent: &str) -> Result<RenderedPage, CrawlError>;
}

/// Chromium-backed renderer sharing one browser session across a crawl
pub struct ChromiumRenderer {
    browser: Browser,
    handler: JoinHandle<()>,
}

impl ChromiumRenderer {
    /// Launch a headless Chromium instance.
    ///
    /// The CDP event handler runs on a background task that is aborted when
    /// the renderer is dropped; otherwise it would outlive the browser.
    pub async fn launch() -> Result<Self, CrawlError> {
        info!("Launching headless browser");

        let config = BrowserConfig::builder()
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-extensions")
            .arg("--disable-background-networking")
            .arg("--mute-audio")
            .arg("--hide-scrollbars")
            .build()
            .map_err(CrawlError::Launch)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| CrawlError::Launch(e.to_string()))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    warn!("Browser handler error: {:?}", e);
                }
            }
            debug!("Browser event handler finished");
        });

        Ok(Self {
            browser,
            handler: handler_task,
        })
    }

    /// Close the browser session and stop the event handler
    pub async fn close(mut self) -> Result<(), CrawlError> {
        self.browser
            .close()
            .await
            .map_err(|e| CrawlError::Other(format!("Failed to close browser: {}", e)))?;
        let _ = self.browser.wait().await;
        self.handler.abort();
        Ok(())
    }
}

impl Drop for ChromiumRenderer {
    fn drop(&mut self) {
        // Browser::drop kills the Chromium process; the handler task has to
        // be stopped explicitly or it runs forever.
        self.handler.abort();
    }
}

#[async_trait]
impl PageRenderer for ChromiumRenderer {
    async fn render(&self, url: &Url, user_agent: &str) -> Result<RenderedPage, CrawlError> {
        let render_err = |e: chromiumoxide::error::CdpError| CrawlError::Render {
            url: url.to_string(),
            message: e.to_string(),
        };

        // Fresh tab per URL so cookies/scripts from one page cannot affect
        // the next fetch.
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(render_err)?;

        let result = async {
            page.set_user_agent(user_agent).await.map_err(render_err)?;
            page.goto(url.as_str()).await.map_err(render_err)?;
            // DOM-ready, not network idle: long-polling beacons must not pin
            // the fetch open.
            page.wait_for_navigation().await.map_err(render_err)?;
            let html = page.content().await.map_err(render_err)?;
            Ok(RenderedPage {
                url: url.clone(),
                html,
            })
        }
        .await;

        if let Err(e) = page.close().await {
            debug!("Failed to close page for {}: {}", url, e);
        }

        result
    }
}
