use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use onehash_scraper::data::{open_sink, OutputFormat};
use onehash_scraper::event_time::TimeNormalizer;
use onehash_scraper::{run_scrape, scrape_with, ScrapeConfig, StaticPage};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Scrape upcoming esports matchups and odds from onehash.com
#[derive(Parser)]
#[command(name = "onehash", version)]
struct Cli {
    /// Listing page to scrape
    #[arg(long)]
    url: Option<String>,

    /// Minutes the site's displayed clock runs ahead of UTC
    #[arg(long, allow_hyphen_values = true)]
    utc_offset_minutes: Option<i64>,

    /// Seconds to wait after navigation before scrolling
    #[arg(long)]
    page_load_wait: Option<u64>,

    /// Seconds to keep scrolling the event list
    #[arg(long)]
    scroll_secs: Option<u64>,

    /// CSS selector of the scrollable event container
    #[arg(long)]
    container: Option<String>,

    /// Path to the Chrome/Chromium binary
    #[arg(long)]
    chrome_path: Option<PathBuf>,

    /// Show the browser window instead of running headless
    #[arg(long)]
    headed: bool,

    /// Parse a saved HTML snapshot instead of launching a browser
    #[arg(long)]
    html: Option<PathBuf>,

    /// Write records to this file instead of stdout
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Record format written to the output
    #[arg(long, value_enum, default_value = "jsonl")]
    format: Format,

    /// Enable debug logging
    #[arg(long, short)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    /// One JSON object per line
    Jsonl,
    /// Comma separated, with a header row
    Csv,
    /// Human readable, one event per line
    Text,
}

impl From<Format> for OutputFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Jsonl => OutputFormat::Jsonl,
            Format::Csv => OutputFormat::Csv,
            Format::Text => OutputFormat::Text,
        }
    }
}

impl Cli {
    /// Whether a flag replaces the environment variable `key`
    fn overrides(&self, key: &str) -> bool {
        match key {
            "ONEHASH_URL" => self.url.is_some(),
            "ONEHASH_UTC_OFFSET_MINUTES" => self.utc_offset_minutes.is_some(),
            "ONEHASH_PAGE_LOAD_WAIT_SECS" => self.page_load_wait.is_some(),
            "ONEHASH_SCROLL_SECS" => self.scroll_secs.is_some(),
            "ONEHASH_CONTAINER_SELECTOR" => self.container.is_some(),
            "ONEHASH_CHROME_PATH" => self.chrome_path.is_some(),
            "ONEHASH_HEADLESS" => self.headed,
            _ => false,
        }
    }

    fn apply(&self, config: &mut ScrapeConfig) {
        if let Some(url) = &self.url {
            config.url = url.clone();
        }
        if let Some(offset) = self.utc_offset_minutes {
            config.utc_offset_minutes = offset;
        }
        if let Some(secs) = self.page_load_wait {
            config.browser.page_load_wait = Duration::from_secs(secs);
        }
        if let Some(secs) = self.scroll_secs {
            config.browser.scroll_duration = Duration::from_secs(secs);
        }
        if let Some(container) = &self.container {
            config.browser.container_selector = container.clone();
        }
        if let Some(path) = &self.chrome_path {
            config.browser.chrome_path = Some(path.clone());
        }
        if self.headed {
            config.browser.headless = false;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout only carries records
    let default_filter = if cli.verbose {
        "onehash_scraper=debug,info"
    } else {
        "onehash_scraper=info,warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut config =
        ScrapeConfig::from_env_except(|key| cli.overrides(key)).context("Invalid configuration")?;
    cli.apply(&mut config);

    let mut sink = open_sink(cli.format.into(), cli.output.as_deref())?;

    let report = match &cli.html {
        Some(path) => {
            let page = StaticPage::from_file(path)?;
            let normalizer = TimeNormalizer::new(config.utc_offset_minutes);
            scrape_with(&page, &config.url, &normalizer, sink.as_mut()).await?
        }
        None => run_scrape(&config, sink.as_mut()).await?,
    };

    eprintln!("\n{}", report.format());
    for skipped in &report.skipped {
        eprintln!("  block {}: {}", skipped.index, skipped.reason);
    }

    if let Some(path) = &cli.output {
        eprintln!("Saved {} events to {}", report.emitted, path.display());
    }

    Ok(())
}
