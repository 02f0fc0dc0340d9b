use std::time::Duration;

use serde::Deserialize;

use super::{WeatherProvider, WeatherReading};

pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org/data/2.5/weather";

#[derive(thiserror::Error, Debug)]
enum FetchError {
    #[error("network error: {0}")]
    Network(String),
    #[error("weather service returned {0}")]
    Status(u16),
    #[error("malformed weather body: {0}")]
    Parse(String),
}

#[derive(Deserialize)]
struct CurrentWeather {
    weather: Vec<Condition>,
    main: MainBlock,
}

#[derive(Deserialize)]
struct Condition {
    description: String,
}

#[derive(Deserialize)]
struct MainBlock {
    temp: f64,
}

/// Current-weather lookups against an OpenWeatherMap-compatible endpoint.
pub struct OpenWeatherClient {
    http_client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl OpenWeatherClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, reqwest::Error> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            http_client: builder.build()?,
            base_url: base_url.into(),
            api_key: api_key.into(),
        })
    }

    async fn try_fetch(&self, location: &str) -> Result<WeatherReading, FetchError> {
        let response = self
            .http_client
            .get(&self.base_url)
            .query(&[("q", location), ("appid", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body: CurrentWeather = response
            .json()
            .await
            .map_err(|e| FetchError::Parse(e.to_string()))?;

        let condition = body
            .weather
            .into_iter()
            .next()
            .ok_or_else(|| FetchError::Parse("empty weather array".to_string()))?;

        Ok(WeatherReading {
            description: condition.description,
            temperature_kelvin: body.main.temp,
        })
    }
}

#[async_trait::async_trait]
impl WeatherProvider for OpenWeatherClient {
    async fn fetch(&self, location: &str) -> Option<WeatherReading> {
        tracing::debug!(location = %location, "fetching weather");

        match self.try_fetch(location).await {
            Ok(reading) => Some(reading),
            Err(e) => {
                tracing::error!(error = %e, location = %location, "error fetching weather data");
                metrics::counter!("weather_fetch_failures_total").increment(1);
                None
            }
        }
    }
}
