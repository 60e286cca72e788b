use crate::providers::TimeRange;
use crate::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const OPENWEATHER_KEY_ENV: &str = "OPENWEATHER_API_KEY";
pub const NEWS_KEY_ENV: &str = "NEWS_API_KEY";
pub const ALPHAVANTAGE_KEY_ENV: &str = "ALPHAVANTAGE_API_KEY";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherSettings {
    pub api_key: String,
    pub geocode_url: String,
    pub data_url: String,
    pub units: String,
    /// City fetched when the weather widget first mounts.
    pub default_city: String,
}

impl Default for WeatherSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            geocode_url: "https://api.openweathermap.org/geo/1.0/direct".into(),
            data_url: "https://api.openweathermap.org/data/3.0/onecall".into(),
            units: "metric".into(),
            default_city: "London".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewsSettings {
    pub api_key: String,
    pub base_url: String,
    pub country: String,
    pub page_size: u32,
    pub default_category: String,
}

impl Default for NewsSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://newsapi.org/v2".into(),
            country: "us".into(),
            page_size: 20,
            default_category: "general".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FinanceSettings {
    pub api_key: String,
    pub base_url: String,
    pub default_symbol: String,
    pub default_range: TimeRange,
}

impl Default for FinanceSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://www.alphavantage.co/query".into(),
            default_symbol: "AAPL".into(),
            default_range: TimeRange::Month,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: crate::retry::DEFAULT_MAX_ATTEMPTS,
            base_delay_ms: crate::retry::DEFAULT_BASE_DELAY.as_millis() as u64,
        }
    }
}

impl RetrySettings {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, Duration::from_millis(self.base_delay_ms))
    }
}

fn default_widgets() -> Vec<String> {
    ["weather", "news", "finance", "analytics", "performance", "real_time"]
        .into_iter()
        .map(String::from)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub weather: WeatherSettings,
    pub news: NewsSettings,
    pub finance: FinanceSettings,
    pub retry: RetrySettings,
    pub request_timeout_secs: u64,
    /// How long a toast stays visible.
    pub notification_duration_ms: u64,
    /// Initial render order of the dashboard widgets.
    pub widgets: Vec<String>,
    /// When enabled the application initialises the logger at debug level.
    pub debug_logging: bool,
    pub log_file: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            weather: WeatherSettings::default(),
            news: NewsSettings::default(),
            finance: FinanceSettings::default(),
            retry: RetrySettings::default(),
            request_timeout_secs: 30,
            notification_duration_ms: 3000,
            widgets: default_widgets(),
            debug_logging: false,
            log_file: None,
        }
    }
}

impl Settings {
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path).unwrap_or_default();
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Overrides API keys from the environment when the variables are set.
    pub fn apply_env(&mut self) {
        let read = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());
        if let Some(key) = read(OPENWEATHER_KEY_ENV) {
            self.weather.api_key = key;
        }
        if let Some(key) = read(NEWS_KEY_ENV) {
            self.news.api_key = key;
        }
        if let Some(key) = read(ALPHAVANTAGE_KEY_ENV) {
            self.finance.api_key = key;
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn notification_duration(&self) -> Duration {
        Duration::from_millis(self.notification_duration_ms)
    }

    pub fn missing_api_keys(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.weather.api_key.is_empty() {
            missing.push("weather");
        }
        if self.news.api_key.is_empty() {
            missing.push("news");
        }
        if self.finance.api_key.is_empty() {
            missing.push("finance");
        }
        missing
    }
}
