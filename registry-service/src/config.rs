use serde::Deserialize;
use std::{fs, path::PathBuf, time::Duration};

use crate::{store::DEFAULT_STORAGE_KEY, weather::openweather::DEFAULT_BASE_URL};

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub bind_addr: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    #[serde(default = "default_storage_key")]
    pub key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WeatherConfig {
    #[serde(default = "default_weather_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    pub timeout_ms: Option<u64>,
}

impl WeatherConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    pub bind_addr: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub http: HttpConfig,
    pub storage: StorageConfig,
    pub weather: WeatherConfig,
    pub metrics: Option<MetricsConfig>,
}

fn default_storage_key() -> String {
    DEFAULT_STORAGE_KEY.to_string()
}

fn default_weather_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

impl AppConfig {
    /// Reads `$REGISTRY_CONFIG` (default `registry-config.toml`).
    ///
    /// `OPENWEATHER_API_KEY`, when set, replaces `weather.api_key`.
    pub fn load() -> anyhow::Result<Self> {
        use std::env;

        let path = env::var("REGISTRY_CONFIG").unwrap_or_else(|_| "registry-config.toml".to_string());
        let contents = fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("failed to read config '{path}': {e}"))?;
        let mut cfg = Self::from_toml_str(&contents)?;

        if let Ok(key) = env::var("OPENWEATHER_API_KEY") {
            cfg.weather.api_key = key;
        }
        if cfg.weather.api_key.is_empty() {
            tracing::warn!("weather.api_key is empty; every weather lookup will fail");
        }

        Ok(cfg)
    }

    pub fn from_toml_str(contents: &str) -> anyhow::Result<Self> {
        let cfg: AppConfig = toml::from_str(contents)?;
        Ok(cfg)
    }
}
