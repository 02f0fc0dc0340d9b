pub mod openweather;

use registry_client::WeatherSnapshot;

pub use openweather::OpenWeatherClient;

/// One best-effort weather observation for a location.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherReading {
    pub description: String,
    pub temperature_kelvin: f64,
}

impl WeatherReading {
    /// `"clear sky, 280.32K"`
    pub fn summary(&self) -> String {
        format!("{}, {}K", self.description, self.temperature_kelvin)
    }
}

/// Source of weather enrichment.
///
/// Implementations swallow their own failures: `None` means "unknown
/// weather", never an error the caller has to handle.
#[async_trait::async_trait]
pub trait WeatherProvider: Send + Sync {
    async fn fetch(&self, location: &str) -> Option<WeatherReading>;
}

pub fn snapshot_of(reading: Option<&WeatherReading>) -> WeatherSnapshot {
    match reading {
        Some(r) => WeatherSnapshot::Reported(r.summary()),
        None => WeatherSnapshot::Unavailable,
    }
}

/// Provider that never reports anything, for offline runs.
#[derive(Clone, Default)]
pub struct NoWeather;

#[async_trait::async_trait]
impl WeatherProvider for NoWeather {
    async fn fetch(&self, _location: &str) -> Option<WeatherReading> {
        None
    }
}
