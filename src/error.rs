use serde::Serialize;
use thiserror::Error;

/// Reasons a single event block is skipped instead of emitted.
///
/// None of these abort the run: the block is counted in the report and the
/// loop moves on to the next one.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventError {
    #[error("missing element: {what}")]
    MissingElement { what: &'static str },

    #[error("unknown time mode marker {marker:?}")]
    UnknownTimeMode { marker: String },

    #[error("unparseable countdown label {label:?}")]
    InvalidCountdown { label: String },

    #[error("unparseable date/time {date:?} {time:?}")]
    InvalidDateTime { date: String, time: String },

    #[error("invalid odds {raw:?}: {reason}")]
    InvalidOdds { raw: String, reason: &'static str },

    #[error("invalid game class {raw:?}")]
    InvalidGameClass { raw: String },
}

impl EventError {
    pub fn missing(what: &'static str) -> Self {
        EventError::MissingElement { what }
    }
}
