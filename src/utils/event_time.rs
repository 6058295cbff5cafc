use crate::error::EventError;
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};

/// The two ways the site presents an event's start time
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimeMode {
    /// Relative duration until start, e.g. "2h 43m" or "34m 39s"
    Countdown { label: String },
    /// Calendar date ("DD/MM/YYYY") and clock time ("HH:MM") in site time
    Absolute { date: String, time: String },
}

/// Turns the site's time presentation into a UTC start time.
///
/// `utc_offset_minutes` is how far the site's display clock runs ahead of
/// UTC. It has to be observed by hand (e.g. by comparing against a bookmaker
/// that shows GMT) and supplied per deployment.
#[derive(Debug, Clone, Copy)]
pub struct TimeNormalizer {
    utc_offset_minutes: i64,
}

impl TimeNormalizer {
    pub fn new(utc_offset_minutes: i64) -> Self {
        Self { utc_offset_minutes }
    }

    /// Compute the UTC start time for an event, relative to `now` for countdowns
    pub fn normalize(
        &self,
        mode: &TimeMode,
        now: DateTime<Utc>,
    ) -> Result<DateTime<Utc>, EventError> {
        match mode {
            TimeMode::Countdown { label } => self.countdown(label, now),
            TimeMode::Absolute { date, time } => self.absolute(date, time),
        }
    }

    pub fn countdown(&self, label: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>, EventError> {
        now.checked_add_signed(parse_countdown(label)?)
            .ok_or_else(|| EventError::InvalidCountdown {
                label: label.to_string(),
            })
    }

    pub fn absolute(&self, date: &str, time: &str) -> Result<DateTime<Utc>, EventError> {
        let site_time = parse_site_datetime(date, time)?;
        Duration::try_minutes(self.utc_offset_minutes)
            .and_then(|offset| site_time.and_utc().checked_sub_signed(offset))
            .ok_or_else(|| EventError::InvalidDateTime {
                date: date.to_string(),
                time: time.to_string(),
            })
    }
}

/// Parse a countdown label into the time left until the event starts.
///
/// Accepted forms are "<H>h <M>m", "<M>m <S>s", and the lone "<S>s" the site
/// shows during the final minute. Anything else is an error so the block gets
/// reported instead of silently disappearing.
pub fn parse_countdown(label: &str) -> Result<Duration, EventError> {
    let invalid = || EventError::InvalidCountdown {
        label: label.to_string(),
    };
    let tokens: Vec<&str> = label.split_whitespace().collect();

    match tokens.as_slice() {
        [first, second] => {
            if let Some(hours) = first.strip_suffix('h') {
                let hours = parse_unit(hours).ok_or_else(invalid)?;
                let minutes = second
                    .strip_suffix('m')
                    .and_then(parse_unit)
                    .ok_or_else(invalid)?;
                clock_duration(hours, minutes, 0).ok_or_else(invalid)
            } else if let Some(minutes) = first.strip_suffix('m') {
                let minutes = parse_unit(minutes).ok_or_else(invalid)?;
                let seconds = second
                    .strip_suffix('s')
                    .and_then(parse_unit)
                    .ok_or_else(invalid)?;
                clock_duration(0, minutes, seconds).ok_or_else(invalid)
            } else {
                Err(invalid())
            }
        }
        [only] => {
            let seconds = only
                .strip_suffix('s')
                .and_then(parse_unit)
                .ok_or_else(invalid)?;
            clock_duration(0, 0, seconds).ok_or_else(invalid)
        }
        _ => Err(invalid()),
    }
}

fn parse_unit(digits: &str) -> Option<i64> {
    digits.parse::<u32>().ok().map(i64::from)
}

fn clock_duration(hours: i64, minutes: i64, seconds: i64) -> Option<Duration> {
    Duration::try_hours(hours)?
        .checked_add(&Duration::try_minutes(minutes)?)?
        .checked_add(&Duration::try_seconds(seconds)?)
}

/// Parse "DD/MM/YYYY" + "HH:MM" as a naive timestamp in the site's display time
pub fn parse_site_datetime(date: &str, time: &str) -> Result<NaiveDateTime, EventError> {
    let invalid = || EventError::InvalidDateTime {
        date: date.to_string(),
        time: time.to_string(),
    };

    let day = NaiveDate::parse_from_str(date.trim(), "%d/%m/%Y").map_err(|_| invalid())?;
    let clock = NaiveTime::parse_from_str(time.trim(), "%H:%M").map_err(|_| invalid())?;

    Ok(NaiveDateTime::new(day, clock))
}
