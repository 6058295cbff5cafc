//! Page rendering.
//!
//! The listing page only fills in as it is scrolled, so the markup has to come
//! from a real browser. `PageRenderer` keeps that behind a seam so the parsing
//! side can also run against a saved snapshot.

pub mod chromium;

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::Path;

/// Something that can turn a URL into fully rendered HTML
#[async_trait]
pub trait PageRenderer: Send + Sync {
    async fn render(&self, url: &str) -> Result<String>;
}

/// Serves the same pre-rendered markup for any URL.
pub struct StaticPage {
    html: String,
}

impl StaticPage {
    pub fn new(html: impl Into<String>) -> Self {
        Self { html: html.into() }
    }

    /// Load a page snapshot saved from an earlier browser session
    pub fn from_file(path: &Path) -> Result<Self> {
        let html = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read HTML snapshot {}", path.display()))?;
        Ok(Self { html })
    }
}

#[async_trait]
impl PageRenderer for StaticPage {
    async fn render(&self, _url: &str) -> Result<String> {
        Ok(self.html.clone())
    }
}
