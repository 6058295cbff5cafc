use crate::error::EventError;
use crate::models::EventRecord;
use crate::utils::event_time::TimeMode;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use scraper::{ElementRef, Html, Selector};

/// Pre-parsed selectors for the onehash listing markup.
///
/// Every selector here is tied to the site's current class names; a markup
/// change on their side shows up as `MissingElement` skips in the report.
pub struct OneHashParser {
    event_block: Selector,
    time_marker: Selector,
    countdown_label: Selector,
    date_label: Selector,
    time_label: Selector,
    game_icon: Selector,
    team_section: Selector,
    team_name: Selector,
    odds_digit: Selector,
}

impl OneHashParser {
    pub fn new() -> Result<Self> {
        Ok(Self {
            event_block: sel(r#"div[class="eventbox-container"]"#)?,
            time_marker: sel(r#"div[class="time-wrapper"] > div"#)?,
            countdown_label: sel(
                r#"div[class="time-wrapper"] > div[class="time-left"] > span:nth-of-type(2)"#,
            )?,
            date_label: sel(r#"div[class="time-wrapper"] > div[class="datetime"] > span[class="date"]"#)?,
            time_label: sel(r#"div[class="time-wrapper"] > div[class="datetime"] > span[class="time"]"#)?,
            game_icon: sel(r#"div[class="item"] > i"#)?,
            team_section: sel(r#"section[class="team"]"#)?,
            team_name: sel(r#"div[class="eventbox-title text-ellipsis"]"#)?,
            odds_digit: sel(r#"div[class="multi-number-roller"] span"#)?,
        })
    }

    /// Split the rendered page into event blocks, in page order
    pub fn event_blocks<'a>(&self, document: &'a Html) -> Vec<ElementRef<'a>> {
        document.select(&self.event_block).collect()
    }

    /// Work out which time presentation a block uses and read its labels
    pub fn time_mode(&self, block: ElementRef) -> Result<TimeMode, EventError> {
        // The first div inside the time wrapper carries the mode as its class
        let marker = block
            .select(&self.time_marker)
            .next()
            .ok_or(EventError::missing("time-wrapper"))?;

        match marker.value().attr("class").unwrap_or_default() {
            "time-left" => {
                let label = first_text(block, &self.countdown_label)
                    .ok_or(EventError::missing("countdown label"))?;
                Ok(TimeMode::Countdown { label })
            }
            "datetime" => {
                let date =
                    first_text(block, &self.date_label).ok_or(EventError::missing("date label"))?;
                let time =
                    first_text(block, &self.time_label).ok_or(EventError::missing("time label"))?;
                Ok(TimeMode::Absolute { date, time })
            }
            other => Err(EventError::UnknownTimeMode {
                marker: other.to_string(),
            }),
        }
    }

    /// Pull game, participants and odds out of a block whose start time is known
    pub fn extract_record(
        &self,
        block: ElementRef,
        date: DateTime<Utc>,
    ) -> Result<EventRecord, EventError> {
        let icon_class = block
            .select(&self.game_icon)
            .next()
            .and_then(|icon| icon.value().attr("class"))
            .ok_or(EventError::missing("game icon"))?;
        let game = parse_game_class(icon_class)?;

        // Document order is the only thing telling the two sides apart
        let mut teams = block.select(&self.team_section);
        let first = teams.next().ok_or(EventError::missing("first team section"))?;
        let second = teams
            .next()
            .ok_or(EventError::missing("second team section"))?;

        let player1 =
            first_text(first, &self.team_name).ok_or(EventError::missing("player1 name"))?;
        let player2 =
            first_text(second, &self.team_name).ok_or(EventError::missing("player2 name"))?;

        let odds1 = self.team_odds(first).ok_or(EventError::missing("odds1"))?;
        let odds2 = self.team_odds(second).ok_or(EventError::missing("odds2"))?;

        Ok(EventRecord {
            game,
            player1,
            player2,
            odds1: parse_odds(&odds1)?,
            odds2: parse_odds(&odds2)?,
            date,
        })
    }

    fn team_odds(&self, team: ElementRef) -> Option<String> {
        let digits: Vec<ElementRef> = team.select(&self.odds_digit).collect();
        if digits.is_empty() {
            return None;
        }
        Some(join_roller_digits(&digits))
    }
}

fn sel(selector: &str) -> Result<Selector> {
    Selector::parse(selector)
        .ok()
        .with_context(|| format!("Invalid selector {selector}"))
}

/// Trimmed text of the first match, if it has any
fn first_text(scope: ElementRef, selector: &Selector) -> Option<String> {
    let text = scope
        .select(selector)
        .next()?
        .text()
        .collect::<String>()
        .trim()
        .to_string();

    (!text.is_empty()).then_some(text)
}

/// Concatenate the odds roller, which renders one character per span.
///
/// Only each span's own text nodes are taken so nested spans are not counted twice.
pub fn join_roller_digits(spans: &[ElementRef]) -> String {
    spans
        .iter()
        .flat_map(|span| span.children())
        .filter_map(|node| node.value().as_text())
        .map(|text| text.trim())
        .collect()
}

/// "icon-oh cat-overwatch" -> "overwatch"
pub fn parse_game_class(class_attr: &str) -> Result<String, EventError> {
    let invalid = || EventError::InvalidGameClass {
        raw: class_attr.to_string(),
    };

    let category = class_attr.split_whitespace().nth(1).ok_or_else(invalid)?;
    let (_, game) = category.split_once('-').ok_or_else(invalid)?;

    if game.is_empty() {
        return Err(invalid());
    }
    Ok(game.to_string())
}

/// "x1.345" -> 1.345. The first character is the site's multiplier marker.
pub fn parse_odds(raw: &str) -> Result<f64, EventError> {
    let invalid = |reason| EventError::InvalidOdds {
        raw: raw.to_string(),
        reason,
    };

    let mut chars = raw.trim().chars();
    match chars.next() {
        None => Err(invalid("empty")),
        Some(c) if c.is_ascii_digit() => Err(invalid("missing leading marker")),
        Some(_) => {
            let value: f64 = chars
                .as_str()
                .parse()
                .map_err(|_| invalid("not a number"))?;
            if !value.is_finite() || value <= 0.0 {
                return Err(invalid("not a positive number"));
            }
            Ok(value)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn countdown_block(label: &str) -> String {
        format!(
            r#"<div class="eventbox-container">
                <div class="item"><i class="icon-oh cat-csgo"></i></div>
                <div class="time-wrapper">
                    <div class="time-left"><span>Starts in</span><span>{label}</span></div>
                </div>
                <section class="team">
                    <div class="eventbox-title text-ellipsis"> Natus Vincere </div>
                    <div class="multi-number-roller"><span>x</span><span>1</span><span>.</span><span>3</span><span>4</span><span>5</span></div>
                </section>
                <section class="team">
                    <div class="eventbox-title text-ellipsis">SK Gaming</div>
                    <div class="multi-number-roller"><span>x</span><span>2</span><span>.</span><span>9</span></div>
                </section>
            </div>"#
        )
    }

    fn page(blocks: &[String]) -> Html {
        Html::parse_document(&format!(
            "<html><body><main>{}</main></body></html>",
            blocks.concat()
        ))
    }

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 18, 9, 0, 0).unwrap()
    }

    #[test]
    fn test_parse_game_class() {
        assert_eq!(parse_game_class("icon-oh cat-overwatch").unwrap(), "overwatch");
        assert_eq!(parse_game_class("icon-oh  cat-dota2 ").unwrap(), "dota2");
        assert_eq!(
            parse_game_class("icon-oh cat-league-of-legends").unwrap(),
            "league-of-legends"
        );
        assert!(parse_game_class("icon-oh").is_err());
        assert!(parse_game_class("icon-oh overwatch").is_err());
        assert!(parse_game_class("icon-oh cat-").is_err());
    }

    #[test]
    fn test_parse_odds() {
        assert!((parse_odds("x1.345").unwrap() - 1.345).abs() < 1e-9);
        assert!((parse_odds(" x2.10 ").unwrap() - 2.10).abs() < 1e-9);
        assert!((parse_odds("@3").unwrap() - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_parse_odds_failures() {
        let reason = |raw: &str| match parse_odds(raw) {
            Err(EventError::InvalidOdds { reason, .. }) => reason,
            other => panic!("expected InvalidOdds for {raw:?}, got {other:?}"),
        };

        assert_eq!(reason(""), "empty");
        assert_eq!(reason("1.345"), "missing leading marker");
        assert_eq!(reason("x"), "not a number");
        assert_eq!(reason("xabc"), "not a number");
        assert_eq!(reason("x-1.5"), "not a positive number");
        assert_eq!(reason("x0"), "not a positive number");
        assert_eq!(reason("xinf"), "not a positive number");
    }

    #[test]
    fn test_event_blocks_in_page_order() {
        let parser = OneHashParser::new().unwrap();
        let doc = page(&[
            countdown_block("1h 0m"),
            r#"<div class="eventbox-container extra"></div>"#.to_string(),
            countdown_block("2h 0m"),
        ]);

        let blocks = parser.event_blocks(&doc);
        // Exact class match, like the site's own container
        assert_eq!(blocks.len(), 2);
        assert_eq!(
            parser.time_mode(blocks[1]).unwrap(),
            TimeMode::Countdown {
                label: "2h 0m".to_string()
            }
        );
    }

    #[test]
    fn test_time_mode_countdown() {
        let parser = OneHashParser::new().unwrap();
        let doc = page(&[countdown_block("2h 43m")]);
        let block = parser.event_blocks(&doc)[0];

        assert_eq!(
            parser.time_mode(block).unwrap(),
            TimeMode::Countdown {
                label: "2h 43m".to_string()
            }
        );
    }

    #[test]
    fn test_time_mode_absolute() {
        let parser = OneHashParser::new().unwrap();
        let doc = page(&[r#"<div class="eventbox-container">
                <div class="time-wrapper">
                    <div class="datetime"><span class="date">21/10/2026</span><span class="time">18:00</span></div>
                </div>
            </div>"#
            .to_string()]);
        let block = parser.event_blocks(&doc)[0];

        assert_eq!(
            parser.time_mode(block).unwrap(),
            TimeMode::Absolute {
                date: "21/10/2026".to_string(),
                time: "18:00".to_string()
            }
        );
    }

    #[test]
    fn test_time_mode_unknown_marker() {
        let parser = OneHashParser::new().unwrap();
        let doc = page(&[r#"<div class="eventbox-container">
                <div class="time-wrapper"><div class="live-now"><span>LIVE</span></div></div>
            </div>"#
            .to_string()]);
        let block = parser.event_blocks(&doc)[0];

        assert_eq!(
            parser.time_mode(block).unwrap_err(),
            EventError::UnknownTimeMode {
                marker: "live-now".to_string()
            }
        );
    }

    #[test]
    fn test_time_mode_missing_wrapper() {
        let parser = OneHashParser::new().unwrap();
        let doc = page(&[r#"<div class="eventbox-container"><p>nothing</p></div>"#.to_string()]);
        let block = parser.event_blocks(&doc)[0];

        assert_eq!(
            parser.time_mode(block).unwrap_err(),
            EventError::missing("time-wrapper")
        );
    }

    #[test]
    fn test_extract_record() {
        let parser = OneHashParser::new().unwrap();
        let doc = page(&[countdown_block("10m 5s")]);
        let block = parser.event_blocks(&doc)[0];

        let record = parser.extract_record(block, start()).unwrap();
        assert_eq!(record.game, "csgo");
        assert_eq!(record.player1, "Natus Vincere");
        assert_eq!(record.player2, "SK Gaming");
        assert!((record.odds1 - 1.345).abs() < 1e-9);
        assert!((record.odds2 - 2.9).abs() < 1e-9);
        assert_eq!(record.date, start());
    }

    #[test]
    fn test_extract_record_nested_roller_spans() {
        let parser = OneHashParser::new().unwrap();
        let html = countdown_block("10m 5s").replace(
            "<span>x</span><span>2</span><span>.</span><span>9</span>",
            "<span>x<span>2</span></span><span>.</span><span>9</span>",
        );
        let doc = page(&[html]);
        let block = parser.event_blocks(&doc)[0];

        let record = parser.extract_record(block, start()).unwrap();
        assert!((record.odds2 - 2.9).abs() < 1e-9);
    }

    #[test]
    fn test_extract_record_missing_second_team() {
        let parser = OneHashParser::new().unwrap();
        let doc = page(&[r#"<div class="eventbox-container">
                <div class="item"><i class="icon-oh cat-dota2"></i></div>
                <section class="team">
                    <div class="eventbox-title text-ellipsis">OG</div>
                    <div class="multi-number-roller"><span>x</span><span>1</span></div>
                </section>
            </div>"#
            .to_string()]);
        let block = parser.event_blocks(&doc)[0];

        assert_eq!(
            parser.extract_record(block, start()).unwrap_err(),
            EventError::missing("second team section")
        );
    }

    #[test]
    fn test_extract_record_bad_odds() {
        let parser = OneHashParser::new().unwrap();
        let html = countdown_block("10m 5s").replace(
            "<span>x</span><span>2</span><span>.</span><span>9</span>",
            "<span>-</span><span>-</span>",
        );
        let doc = page(&[html]);
        let block = parser.event_blocks(&doc)[0];

        assert!(matches!(
            parser.extract_record(block, start()),
            Err(EventError::InvalidOdds { .. })
        ));
    }

    #[test]
    fn test_extract_record_missing_odds() {
        let parser = OneHashParser::new().unwrap();
        let html = countdown_block("10m 5s").replace(
            r#"<div class="multi-number-roller"><span>x</span><span>2</span><span>.</span><span>9</span></div>"#,
            "",
        );
        let doc = page(&[html]);
        let block = parser.event_blocks(&doc)[0];

        assert_eq!(
            parser.extract_record(block, start()).unwrap_err(),
            EventError::missing("odds2")
        );
    }
}
