//! Chromium-backed renderer using chromiumoxide.

use super::PageRenderer;
use crate::config::BrowserSettings;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use futures::StreamExt;
use std::time::Instant;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

// Scroll both the container and the window; the site has used either for
// its infinite list.
const SCROLL_TO_END_JS: &str = "function() {
    this.scrollTop = this.scrollHeight;
    window.scrollTo(0, document.documentElement.scrollHeight);
}";

/// A launched browser process plus the task driving its CDP connection.
///
/// Call [`ChromiumSession::close`] when done. Dropping the session without
/// closing it only stops the handler task.
pub struct ChromiumSession {
    browser: Browser,
    handler: JoinHandle<()>,
    settings: BrowserSettings,
}

impl ChromiumSession {
    pub async fn launch(settings: &BrowserSettings) -> Result<Self> {
        let mut builder = BrowserConfig::builder()
            .window_size(settings.window_width, settings.window_height)
            .viewport(None)
            .arg("--start-maximized")
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions");

        if !settings.headless {
            builder = builder.with_head();
        }
        if let Some(path) = &settings.chrome_path {
            builder = builder.chrome_executable(path);
        }

        let config = builder
            .build()
            .map_err(|e| anyhow!("failed to build browser config: {e}"))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .context("failed to launch Chromium")?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(err) = event {
                    debug!(%err, "browser handler event error");
                }
            }
        });

        info!(headless = settings.headless, "browser session started");

        Ok(Self {
            browser,
            handler,
            settings: settings.clone(),
        })
    }

    /// Shut the browser down and wait for the process to exit.
    pub async fn close(mut self) -> Result<()> {
        let closed = self.browser.close().await.context("failed to close browser");
        let waited = self
            .browser
            .wait()
            .await
            .context("failed waiting for browser exit");
        self.handler.abort();
        info!("browser session closed");

        closed?;
        waited?;
        Ok(())
    }
}

impl Drop for ChromiumSession {
    fn drop(&mut self) {
        self.handler.abort();
    }
}

#[async_trait]
impl PageRenderer for ChromiumSession {
    async fn render(&self, url: &str) -> Result<String> {
        info!(url, "opening page");
        let page = self
            .browser
            .new_page(url)
            .await
            .with_context(|| format!("failed to open {url}"))?;

        tokio::time::sleep(self.settings.page_load_wait).await;

        let selector = self.settings.container_selector.as_str();
        let container = page
            .find_element(selector)
            .await
            .with_context(|| format!("scroll container {selector:?} not found"))?;

        // Focus helps some lazy-load triggers, but scrolling works without it
        if let Err(err) = container.click().await {
            debug!(%err, "scroll container not clickable, scrolling without focus");
        }

        let deadline = Instant::now() + self.settings.scroll_duration;
        let mut signals = 0u64;
        loop {
            container
                .call_js_fn(SCROLL_TO_END_JS, false)
                .await
                .context("failed to scroll container")?;
            signals += 1;
            if Instant::now() > deadline {
                break;
            }
        }
        debug!(signals, "scroll loop finished");

        let html = page.content().await.context("failed to read rendered HTML")?;

        if let Err(err) = page.close().await {
            warn!(%err, "failed to close page");
        }

        Ok(html)
    }
}
