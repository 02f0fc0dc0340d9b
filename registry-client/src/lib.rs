pub mod domain;

pub use domain::{Installation, InstallationDraft, InstallationId, WeatherSnapshot};
