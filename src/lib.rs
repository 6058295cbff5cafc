pub mod browser;
pub mod config;
pub mod error;
pub mod models;
pub mod scrapers;
pub mod utils;

pub use browser::*;
pub use config::*;
pub use error::*;
pub use models::*;
pub use scrapers::*;
pub use utils::*;

use anyhow::{Context, Result};
use browser::chromium::ChromiumSession;
use chrono::{DateTime, Utc};
use scraper::Html;
use scrapers::onehash::OneHashParser;
use tracing::{debug, info, warn};
use utils::data::RecordSink;
use utils::event_time::TimeNormalizer;

/// Run one full pass: launch the browser, render the listing, emit upcoming events.
///
/// The browser is closed before this returns, whether rendering succeeded or not.
pub async fn run_scrape<S>(config: &ScrapeConfig, sink: &mut S) -> Result<ScrapeReport>
where
    S: RecordSink + ?Sized,
{
    let session = ChromiumSession::launch(&config.browser)
        .await
        .context("Failed to start browser session")?;

    let rendered = session.render(&config.url).await;

    if let Err(err) = session.close().await {
        warn!("Failed to shut down browser cleanly: {:#}", err);
    }

    let html = rendered.with_context(|| format!("Failed to render {}", config.url))?;
    let normalizer = TimeNormalizer::new(config.utc_offset_minutes);
    scrape_document(&html, &normalizer, sink, Utc::now)
}

/// Render `url` with any renderer and emit its upcoming events
pub async fn scrape_with<R, S>(
    renderer: &R,
    url: &str,
    normalizer: &TimeNormalizer,
    sink: &mut S,
) -> Result<ScrapeReport>
where
    R: PageRenderer + ?Sized,
    S: RecordSink + ?Sized,
{
    let html = renderer
        .render(url)
        .await
        .with_context(|| format!("Failed to render {}", url))?;
    scrape_document(&html, normalizer, sink, Utc::now)
}

/// Parse rendered markup and stream every upcoming event into `sink`.
///
/// `clock` is read once per block and is both the base for countdown labels
/// and the cut-off for dropping events that already started.
pub fn scrape_document<S, C>(
    html: &str,
    normalizer: &TimeNormalizer,
    sink: &mut S,
    clock: C,
) -> Result<ScrapeReport>
where
    S: RecordSink + ?Sized,
    C: Fn() -> DateTime<Utc>,
{
    let parser = OneHashParser::new()?;
    let document = Html::parse_document(html);
    let mut report = ScrapeReport::default();

    let blocks = parser.event_blocks(&document);
    info!("Found {} event blocks", blocks.len());

    for (index, block) in blocks.into_iter().enumerate() {
        report.blocks += 1;
        let now = clock();

        let start = match parser
            .time_mode(block)
            .and_then(|mode| normalizer.normalize(&mode, now))
        {
            Ok(start) => start,
            Err(reason) => {
                skip(&mut report, index, reason);
                continue;
            }
        };

        // Started or finished events are not worth betting on
        if start <= now {
            debug!(index, %start, "event already started");
            report.expired += 1;
            continue;
        }

        match parser.extract_record(block, start) {
            Ok(record) => {
                debug!(index, "{}", record.format());
                sink.consume(&record)
                    .context("Failed to write event record")?;
                report.emitted += 1;
            }
            Err(reason) => skip(&mut report, index, reason),
        }
    }

    sink.finish()?;
    info!("{}", report.format());

    Ok(report)
}

fn skip(report: &mut ScrapeReport, index: usize, reason: EventError) {
    warn!(index, %reason, "skipping event block");
    report.skipped.push(SkippedEvent { index, reason });
}
