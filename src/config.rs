use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_WEATHER_URL: &str = "https://api.weatherapi.com/v1";
pub const DEFAULT_WEATHER_TIMEOUT_SECS: u64 = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct WeatherConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_weather_url")]
    pub base_url: String,
    #[serde(default = "default_weather_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_weather_url(),
            timeout_secs: default_weather_timeout_secs(),
        }
    }
}

impl WeatherConfig {
    /// Upper bound on how long task creation waits for a lookup.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AppConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Defaults to `<data_dir>/logs`.
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
    #[serde(default)]
    pub weather: WeatherConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            log_dir: None,
            weather: WeatherConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn log_dir(&self) -> PathBuf {
        self.log_dir
            .clone()
            .unwrap_or_else(|| self.data_dir.join("logs"))
    }

    pub fn from_env() -> Self {
        Self::default().with_overrides(|name| std::env::var(name).ok())
    }

    /// Applies `TASKBOARD_*` overrides read through `lookup`. Blank values are ignored.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        if let Some(dir) = var("TASKBOARD_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(dir) = var("TASKBOARD_LOG_DIR") {
            self.log_dir = Some(PathBuf::from(dir));
        }
        if let Some(key) = var("TASKBOARD_WEATHER_API_KEY").or_else(|| var("WEATHER_API_KEY")) {
            self.weather.api_key = Some(key);
        }
        if let Some(url) = var("TASKBOARD_WEATHER_URL") {
            self.weather.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(raw) = var("TASKBOARD_WEATHER_TIMEOUT_SECS") {
            match raw.parse::<u64>() {
                Ok(secs) => self.weather.timeout_secs = secs,
                Err(err) => log::warn!("ignoring TASKBOARD_WEATHER_TIMEOUT_SECS={raw}: {err}"),
            }
        }
        self
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("taskboard-data")
}

fn default_weather_url() -> String {
    DEFAULT_WEATHER_URL.to_string()
}

fn default_weather_timeout_secs() -> u64 {
    DEFAULT_WEATHER_TIMEOUT_SECS
}
