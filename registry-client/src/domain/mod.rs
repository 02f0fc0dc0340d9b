pub mod installation;
pub mod weather;

pub use installation::{Installation, InstallationDraft, InstallationId};
pub use weather::WeatherSnapshot;
