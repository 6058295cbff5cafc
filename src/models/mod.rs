use crate::error::EventError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A scheduled esports matchup scraped from the listing page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub game: String, // e.g. "csgo", "dota2", "overwatch"
    pub player1: String,
    pub player2: String,
    pub odds1: f64, // decimal odds, always > 0
    pub odds2: f64,
    pub date: DateTime<Utc>, // scheduled start
}

impl EventRecord {
    /// One-line human readable summary
    pub fn format(&self) -> String {
        format!(
            "[{}] {} ({:.3}) vs {} ({:.3}) - {}",
            self.game,
            self.player1,
            self.odds1,
            self.player2,
            self.odds2,
            self.date.format("%Y-%m-%d %H:%M UTC")
        )
    }
}

/// An event block that was dropped because it could not be parsed
#[derive(Debug, Clone, Serialize)]
pub struct SkippedEvent {
    pub index: usize, // position of the block on the page
    pub reason: EventError,
}

/// Outcome of one scrape pass
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScrapeReport {
    pub blocks: usize,
    pub emitted: usize,
    pub expired: usize, // already started or finished
    pub skipped: Vec<SkippedEvent>,
}

impl ScrapeReport {
    pub fn format(&self) -> String {
        format!(
            "{} event blocks: {} emitted, {} already started, {} skipped",
            self.blocks,
            self.emitted,
            self.expired,
            self.skipped.len()
        )
    }
}
