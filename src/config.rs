//! Configuration management for corpscrape using the prefer crate.
//!
//! Settings are layered: built-in defaults, then an optional `corpscrape`
//! config file discovered by prefer, then environment variables.

use std::fs;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::scrapers::filings::DEFAULT_MAX_FILINGS;
use crate::scrapers::news::DEFAULT_DAYS_BACK;
use crate::scrapers::Rate;

/// Default EDGAR user agent. The SEC asks for a contact in it.
pub const DEFAULT_SEC_USER_AGENT: &str = "corpscrape/0.1 (company research)";

/// Request budgets for each external service.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ServiceRates {
    pub filings: Rate,
    pub news: Rate,
    pub reviews: Rate,
}

impl Default for ServiceRates {
    fn default() -> Self {
        Self {
            filings: Rate::PerSecond(10.0),
            news: Rate::PerDay(100.0),
            reviews: Rate::PerSecond(0.2),
        }
    }
}

/// Application settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Base data directory.
    pub data_dir: PathBuf,
    /// Database filename, or an absolute path.
    pub database_filename: String,
    /// User agent sent to EDGAR.
    pub sec_user_agent: String,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Per-adapter-call timeout in seconds.
    pub fetch_timeout_secs: u64,
    /// Carried for callers that retry batches; the pipeline never retries.
    pub max_retries: u32,
    /// Maximum entity jobs in flight.
    pub max_concurrent: usize,
    pub news_days_back: u32,
    pub max_filings_per_entity: usize,
    pub news_api_key: Option<String>,
    pub rates: ServiceRates,
}

impl Default for Settings {
    fn default() -> Self {
        // Default to ~/Documents/corpscrape/ for user data
        let data_dir = dirs::document_dir()
            .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
            .join("corpscrape");

        Self {
            data_dir,
            database_filename: "corpscrape.db".to_string(),
            sec_user_agent: DEFAULT_SEC_USER_AGENT.to_string(),
            request_timeout_secs: 30,
            fetch_timeout_secs: 300,
            max_retries: 3,
            max_concurrent: 3,
            news_days_back: DEFAULT_DAYS_BACK,
            max_filings_per_entity: DEFAULT_MAX_FILINGS,
            news_api_key: None,
            rates: ServiceRates::default(),
        }
    }
}

impl Settings {
    /// Create settings with a custom data directory.
    pub fn with_data_dir(data_dir: PathBuf) -> Self {
        Self {
            data_dir,
            ..Default::default()
        }
    }

    /// Get the full path to the database.
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.database_filename)
    }

    /// Ensure the data directory exists.
    pub fn ensure_directories(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.data_dir)?;
        if let Some(parent) = self.database_path().parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_with(|name| std::env::var(name).ok());
    }

    /// Apply overrides from `lookup`. Unparseable values are ignored.
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        if let Some(rate) = parse_env::<f64>(&lookup, "SEC_EDGAR_RATE_LIMIT") {
            self.rates.filings = Rate::PerSecond(rate);
        }
        if let Some(rate) = parse_env::<f64>(&lookup, "GOOGLE_NEWS_RATE_LIMIT") {
            self.rates.news = Rate::PerDay(rate);
        }
        if let Some(rate) = parse_env::<f64>(&lookup, "GLASSDOOR_RATE_LIMIT") {
            self.rates.reviews = Rate::PerSecond(rate);
        }
        if let Some(n) = parse_env(&lookup, "MAX_CONCURRENT_REQUESTS") {
            self.max_concurrent = n;
        }
        if let Some(secs) = parse_env(&lookup, "REQUEST_TIMEOUT") {
            self.request_timeout_secs = secs;
        }
        if let Some(secs) = parse_env(&lookup, "FETCH_TIMEOUT") {
            self.fetch_timeout_secs = secs;
        }
        if let Some(n) = parse_env(&lookup, "MAX_RETRIES") {
            self.max_retries = n;
        }
        if let Some(days) = parse_env(&lookup, "NEWS_DAYS_BACK") {
            self.news_days_back = days;
        }
        if let Some(n) = parse_env(&lookup, "MAX_FILINGS_PER_COMPANY") {
            self.max_filings_per_entity = n;
        }
        if let Some(key) = lookup("GOOGLE_NEWS_API_KEY") {
            self.news_api_key = Some(key);
        }
        if let Some(agent) = lookup("SEC_EDGAR_USER_AGENT") {
            self.sec_user_agent = agent;
        }
        if let Some(dir) = lookup("CORPSCRAPE_DATA_DIR") {
            self.data_dir = PathBuf::from(shellexpand::tilde(&dir).as_ref());
        }
        if let Some(database) = lookup("CORPSCRAPE_DATABASE") {
            self.database_filename = shellexpand::tilde(&database).into_owned();
        }
    }
}

fn parse_env<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<T> {
    let raw = lookup(name)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(variable = name, value = %raw, "Ignoring unparseable setting");
            None
        }
    }
}

/// Configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Target directory for data.
    #[serde(default)]
    pub target: Option<String>,
    /// Database filename.
    #[serde(default)]
    pub database: Option<String>,
    /// EDGAR user agent string.
    #[serde(default)]
    pub user_agent: Option<String>,
    /// Request timeout in seconds.
    #[serde(default)]
    pub request_timeout: Option<u64>,
    /// Adapter call timeout in seconds.
    #[serde(default)]
    pub fetch_timeout: Option<u64>,
    #[serde(default)]
    pub max_retries: Option<u32>,
    #[serde(default)]
    pub max_concurrent: Option<usize>,
    #[serde(default)]
    pub news_days_back: Option<u32>,
    #[serde(default)]
    pub max_filings: Option<usize>,
    #[serde(default)]
    pub news_api_key: Option<String>,
    /// EDGAR calls per second.
    #[serde(default)]
    pub sec_edgar_rate_limit: Option<f64>,
    /// News calls per day.
    #[serde(default)]
    pub news_rate_limit: Option<f64>,
    /// Review page calls per second.
    #[serde(default)]
    pub glassdoor_rate_limit: Option<f64>,
}

impl Config {
    /// Load configuration using prefer crate.
    /// Automatically discovers corpscrape config files in standard locations.
    pub async fn load() -> Self {
        match prefer::load("corpscrape").await {
            Ok(pref_config) => Config {
                target: pref_config.get("target").ok(),
                database: pref_config.get("database").ok(),
                user_agent: pref_config.get("user_agent").ok(),
                request_timeout: pref_config.get("request_timeout").ok(),
                fetch_timeout: pref_config.get("fetch_timeout").ok(),
                max_retries: pref_config.get("max_retries").ok(),
                max_concurrent: pref_config.get("max_concurrent").ok(),
                news_days_back: pref_config.get("news_days_back").ok(),
                max_filings: pref_config.get("max_filings").ok(),
                news_api_key: pref_config.get("news_api_key").ok(),
                sec_edgar_rate_limit: pref_config.get("sec_edgar_rate_limit").ok(),
                news_rate_limit: pref_config.get("news_rate_limit").ok(),
                glassdoor_rate_limit: pref_config.get("glassdoor_rate_limit").ok(),
            },
            Err(_) => {
                // No config file found, use defaults
                Self::default()
            }
        }
    }

    /// Apply configuration to settings.
    pub fn apply_to_settings(&self, settings: &mut Settings) {
        if let Some(ref target) = self.target {
            let path = shellexpand::tilde(target);
            settings.data_dir = PathBuf::from(path.as_ref());
        }
        if let Some(ref database) = self.database {
            settings.database_filename = database.clone();
        }
        if let Some(ref user_agent) = self.user_agent {
            settings.sec_user_agent = user_agent.clone();
        }
        if let Some(timeout) = self.request_timeout {
            settings.request_timeout_secs = timeout;
        }
        if let Some(timeout) = self.fetch_timeout {
            settings.fetch_timeout_secs = timeout;
        }
        if let Some(retries) = self.max_retries {
            settings.max_retries = retries;
        }
        if let Some(concurrent) = self.max_concurrent {
            settings.max_concurrent = concurrent;
        }
        if let Some(days) = self.news_days_back {
            settings.news_days_back = days;
        }
        if let Some(max) = self.max_filings {
            settings.max_filings_per_entity = max;
        }
        if let Some(ref key) = self.news_api_key {
            settings.news_api_key = Some(key.clone());
        }
        if let Some(rate) = self.sec_edgar_rate_limit {
            settings.rates.filings = Rate::PerSecond(rate);
        }
        if let Some(rate) = self.news_rate_limit {
            settings.rates.news = Rate::PerDay(rate);
        }
        if let Some(rate) = self.glassdoor_rate_limit {
            settings.rates.reviews = Rate::PerSecond(rate);
        }
    }
}

/// Load settings from defaults, the config file and the environment.
pub async fn load_settings() -> Settings {
    let config = Config::load().await;
    let mut settings = Settings::default();
    config.apply_to_settings(&mut settings);
    settings.apply_env();
    settings
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.rates.filings, Rate::PerSecond(10.0));
        assert_eq!(settings.rates.news, Rate::PerDay(100.0));
        assert_eq!(settings.rates.reviews, Rate::PerSecond(0.2));
        assert_eq!(settings.max_concurrent, 3);
        assert_eq!(settings.request_timeout(), Duration::from_secs(30));
        assert_eq!(settings.fetch_timeout(), Duration::from_secs(300));
        assert_eq!(settings.news_days_back, 30);
        assert_eq!(settings.max_filings_per_entity, 5);
        assert!(settings.news_api_key.is_none());
    }

    #[test]
    fn test_env_overrides() {
        let mut settings = Settings::with_data_dir(PathBuf::from("/tmp/corpscrape-test"));
        settings.apply_env_with(env(&[
            ("SEC_EDGAR_RATE_LIMIT", "5"),
            ("GOOGLE_NEWS_RATE_LIMIT", "500"),
            ("MAX_CONCURRENT_REQUESTS", "8"),
            ("REQUEST_TIMEOUT", "10"),
            ("GOOGLE_NEWS_API_KEY", "secret"),
            ("CORPSCRAPE_DATABASE", "other.db"),
        ]));

        assert_eq!(settings.rates.filings, Rate::PerSecond(5.0));
        assert_eq!(settings.rates.news, Rate::PerDay(500.0));
        assert_eq!(settings.max_concurrent, 8);
        assert_eq!(settings.request_timeout_secs, 10);
        assert_eq!(settings.news_api_key.as_deref(), Some("secret"));
        assert_eq!(
            settings.database_path(),
            PathBuf::from("/tmp/corpscrape-test/other.db")
        );
    }

    #[test]
    fn test_unparseable_env_keeps_default() {
        let mut settings = Settings::default();
        settings.apply_env_with(env(&[
            ("MAX_CONCURRENT_REQUESTS", "lots"),
            ("GOOGLE_NEWS_API_KEY", "   "),
        ]));
        assert_eq!(settings.max_concurrent, 3);
        assert!(settings.news_api_key.is_none());
    }

    #[test]
    fn test_absolute_database_path_replaces_data_dir() {
        let mut settings = Settings::with_data_dir(PathBuf::from("/data"));
        settings.database_filename = "/var/lib/corpscrape/db.sqlite".to_string();
        assert_eq!(
            settings.database_path(),
            PathBuf::from("/var/lib/corpscrape/db.sqlite")
        );
    }

    #[test]
    fn test_config_file_applies() {
        let config: Config = toml::from_str(
            r#"
            target = "/srv/corpscrape"
            max_filings = 2
            glassdoor_rate_limit = 0.1
            "#,
        )
        .unwrap();

        let mut settings = Settings::default();
        config.apply_to_settings(&mut settings);
        assert_eq!(settings.data_dir, PathBuf::from("/srv/corpscrape"));
        assert_eq!(settings.max_filings_per_entity, 2);
        assert_eq!(settings.rates.reviews, Rate::PerSecond(0.1));
    }
}
