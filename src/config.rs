use anyhow::{Context, Result};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Category listing page with the upcoming esports events
pub const ONEHASH_URL: &str = "https://www.onehash.com/category/e_sport/";

/// Observed difference between the site's displayed times and UTC (site is UTC+2)
pub const DEFAULT_UTC_OFFSET_MINUTES: i64 = 120;

/// How the browser is driven while rendering the listing
#[derive(Debug, Clone)]
pub struct BrowserSettings {
    /// Fixed wait after navigation for the initial scripts to run
    pub page_load_wait: Duration,
    /// Wall-clock budget for the scroll loop
    pub scroll_duration: Duration,
    /// CSS selector of the element that holds the lazily loaded list
    pub container_selector: String,
    pub headless: bool,
    /// Browser binary; auto-detected when unset
    pub chrome_path: Option<PathBuf>,
    pub window_width: u32,
    pub window_height: u32,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            page_load_wait: Duration::from_secs(3),
            scroll_duration: Duration::from_secs(10),
            container_selector: "body main".to_string(),
            headless: true,
            chrome_path: None,
            window_width: 1920,
            window_height: 1080,
        }
    }
}

/// Everything one scrape pass needs
#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    pub url: String,
    /// Minutes to subtract from site-displayed clock times to get UTC
    pub utc_offset_minutes: i64,
    pub browser: BrowserSettings,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            url: ONEHASH_URL.to_string(),
            utc_offset_minutes: DEFAULT_UTC_OFFSET_MINUTES,
            browser: BrowserSettings::default(),
        }
    }
}

impl ScrapeConfig {
    /// Load configuration from environment variables (and a .env file if present).
    ///
    /// Keys for which `overridden` returns true are treated as unset and never
    /// validated, since the caller replaces them anyway.
    pub fn from_env_except<P>(overridden: P) -> Result<Self>
    where
        P: Fn(&str) -> bool,
    {
        dotenv::dotenv().ok();
        Self::from_lookup(without_keys(|key| std::env::var(key).ok(), overridden))
    }

    /// Build a config from any key lookup, falling back to defaults for unset keys
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = ScrapeConfig::default();
        let browser_defaults = defaults.browser;

        let page_load_secs: u64 = parse_var(&lookup, "ONEHASH_PAGE_LOAD_WAIT_SECS")?
            .unwrap_or(browser_defaults.page_load_wait.as_secs());
        let scroll_secs: u64 = parse_var(&lookup, "ONEHASH_SCROLL_SECS")?
            .unwrap_or(browser_defaults.scroll_duration.as_secs());

        let headless = match lookup("ONEHASH_HEADLESS") {
            Some(value) => parse_flag(&value)
                .with_context(|| format!("ONEHASH_HEADLESS must be true or false, got {value:?}"))?,
            None => browser_defaults.headless,
        };

        Ok(ScrapeConfig {
            url: lookup("ONEHASH_URL").unwrap_or(defaults.url),

            utc_offset_minutes: parse_var(&lookup, "ONEHASH_UTC_OFFSET_MINUTES")?
                .unwrap_or(defaults.utc_offset_minutes),

            browser: BrowserSettings {
                page_load_wait: Duration::from_secs(page_load_secs),
                scroll_duration: Duration::from_secs(scroll_secs),
                container_selector: lookup("ONEHASH_CONTAINER_SELECTOR")
                    .unwrap_or(browser_defaults.container_selector),
                headless,
                chrome_path: lookup("ONEHASH_CHROME_PATH").map(PathBuf::from),
                ..browser_defaults
            },
        })
    }
}

/// Hide the keys matched by `overridden` from `lookup`
pub fn without_keys<F, P>(lookup: F, overridden: P) -> impl Fn(&str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
    P: Fn(&str) -> bool,
{
    move |key| {
        if overridden(key) {
            None
        } else {
            lookup(key)
        }
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|value| {
            value
                .trim()
                .parse::<T>()
                .with_context(|| format!("{key} must be a valid number, got {value:?}"))
        })
        .transpose()
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = ScrapeConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.url, ONEHASH_URL);
        assert_eq!(config.utc_offset_minutes, 120);
        assert_eq!(config.browser.page_load_wait, Duration::from_secs(3));
        assert_eq!(config.browser.scroll_duration, Duration::from_secs(10));
        assert_eq!(config.browser.container_selector, "body main");
        assert!(config.browser.headless);
        assert!(config.browser.chrome_path.is_none());
    }

    #[test]
    fn test_overrides_from_lookup() {
        let config = ScrapeConfig::from_lookup(lookup_from(&[
            ("ONEHASH_URL", "http://localhost:8000/"),
            ("ONEHASH_UTC_OFFSET_MINUTES", "-90"),
            ("ONEHASH_PAGE_LOAD_WAIT_SECS", "5"),
            ("ONEHASH_SCROLL_SECS", " 30 "),
            ("ONEHASH_CONTAINER_SELECTOR", "div.events"),
            ("ONEHASH_HEADLESS", "false"),
            ("ONEHASH_CHROME_PATH", "/usr/bin/chromium"),
        ]))
        .unwrap();

        assert_eq!(config.url, "http://localhost:8000/");
        assert_eq!(config.utc_offset_minutes, -90);
        assert_eq!(config.browser.page_load_wait, Duration::from_secs(5));
        assert_eq!(config.browser.scroll_duration, Duration::from_secs(30));
        assert_eq!(config.browser.container_selector, "div.events");
        assert!(!config.browser.headless);
        assert_eq!(
            config.browser.chrome_path,
            Some(PathBuf::from("/usr/bin/chromium"))
        );
    }

    #[test]
    fn test_invalid_number_is_an_error() {
        let err = ScrapeConfig::from_lookup(lookup_from(&[("ONEHASH_SCROLL_SECS", "ten")]))
            .unwrap_err();
        assert!(err.to_string().contains("ONEHASH_SCROLL_SECS"));
    }

    #[test]
    fn test_overridden_keys_are_not_validated() {
        let lookup = without_keys(
            lookup_from(&[("ONEHASH_SCROLL_SECS", "ten"), ("ONEHASH_PAGE_LOAD_WAIT_SECS", "7")]),
            |key| key == "ONEHASH_SCROLL_SECS",
        );
        let config = ScrapeConfig::from_lookup(lookup).unwrap();

        assert_eq!(config.browser.scroll_duration, Duration::from_secs(10));
        assert_eq!(config.browser.page_load_wait, Duration::from_secs(7));
    }

    #[test]
    fn test_invalid_flag_is_an_error() {
        let err = ScrapeConfig::from_lookup(lookup_from(&[("ONEHASH_HEADLESS", "maybe")]))
            .unwrap_err();
        assert!(err.to_string().contains("ONEHASH_HEADLESS"));
    }
}
