use std::fmt;

use serde::{Deserialize, Serialize};

/// Sentinel stored when no weather could be determined.
pub const UNAVAILABLE: &str = "N/A";

/// Weather summary captured once when an installation is created.
///
/// Stored and exported as plain text; the literal `"N/A"` maps to
/// [`WeatherSnapshot::Unavailable`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum WeatherSnapshot {
    Reported(String),
    #[default]
    Unavailable,
}

impl WeatherSnapshot {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Reported(s) => s,
            Self::Unavailable => UNAVAILABLE,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Self::Reported(_))
    }
}

impl From<String> for WeatherSnapshot {
    fn from(s: String) -> Self {
        if s == UNAVAILABLE {
            Self::Unavailable
        } else {
            Self::Reported(s)
        }
    }
}

impl From<&str> for WeatherSnapshot {
    fn from(s: &str) -> Self {
        Self::from(s.to_string())
    }
}

impl From<WeatherSnapshot> for String {
    fn from(w: WeatherSnapshot) -> Self {
        match w {
            WeatherSnapshot::Reported(s) => s,
            WeatherSnapshot::Unavailable => UNAVAILABLE.to_string(),
        }
    }
}

impl fmt::Display for WeatherSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
