use std::fmt;

use serde::{Deserialize, Serialize};

use super::WeatherSnapshot;

/// Session-unique identifier, a millisecond timestamp taken at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstallationId(pub i64);

impl fmt::Display for InstallationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A registered installation.
///
/// `capacity` is validated as a positive integer (kW) on form submission, but
/// imported rows are taken as-is: zero or negative values are kept and text
/// without a leading integer is `None` (serialized as `null`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Installation {
    pub id: InstallationId,
    #[serde(default)]
    pub location: String,
    pub capacity: Option<i64>,
    #[serde(default)]
    pub weather: WeatherSnapshot,
}

/// An installation that has not been assigned an id yet.
#[derive(Debug, Clone, PartialEq)]
pub struct InstallationDraft {
    pub location: String,
    pub capacity: Option<i64>,
    pub weather: WeatherSnapshot,
}

impl InstallationDraft {
    pub fn into_installation(self, id: InstallationId) -> Installation {
        Installation {
            id,
            location: self.location,
            capacity: self.capacity,
            weather: self.weather,
        }
    }
}

impl From<Installation> for InstallationDraft {
    fn from(i: Installation) -> Self {
        InstallationDraft {
            location: i.location,
            capacity: i.capacity,
            weather: i.weather,
        }
    }
}
