pub mod chart;
pub mod list;

pub use chart::{spawn_chart_projector, BarChart, SharedChart};
pub use list::{render, ListAction, ListRow, RenderedList};
