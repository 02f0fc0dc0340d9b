use registry_client::{Installation, InstallationId};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ListAction {
    Edit,
    Remove,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListRow {
    pub id: InstallationId,
    pub location: String,
    pub capacity: Option<i64>,
    pub weather: String,
    pub title: String,
    pub weather_line: String,
    pub actions: [ListAction; 2],
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedList {
    pub filter: String,
    pub total: usize,
    pub rows: Vec<ListRow>,
}

/// Rebuilds the visible list from scratch.
///
/// Keeps records whose location contains `filter` ignoring case, in store
/// order. An empty filter keeps everything.
pub fn render(records: &[Installation], filter: &str) -> RenderedList {
    let needle = filter.to_lowercase();

    let rows = records
        .iter()
        .filter(|r| r.location.to_lowercase().contains(&needle))
        .map(row_for)
        .collect();

    RenderedList {
        filter: filter.to_string(),
        total: records.len(),
        rows,
    }
}

fn row_for(r: &Installation) -> ListRow {
    let capacity = match r.capacity {
        Some(kw) => kw.to_string(),
        None => "NaN".to_string(),
    };

    ListRow {
        id: r.id,
        location: r.location.clone(),
        capacity: r.capacity,
        weather: r.weather.to_string(),
        title: format!("{} - {} kW", r.location, capacity),
        weather_line: format!("Weather: {}", r.weather),
        actions: [ListAction::Edit, ListAction::Remove],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use registry_client::WeatherSnapshot;

    fn record(id: i64, location: &str, capacity: i64) -> Installation {
        Installation {
            id: InstallationId(id),
            location: location.to_string(),
            capacity: Some(capacity),
            weather: WeatherSnapshot::Reported("clear sky, 280K".to_string()),
        }
    }

    fn sample() -> Vec<Installation> {
        vec![
            record(1, "Berlin", 50),
            record(2, "Paris", 30),
            record(3, "berlingen", 10),
            record(4, "Rome", 20),
        ]
    }

    #[test]
    fn empty_filter_returns_all_in_order() {
        let list = render(&sample(), "");
        let ids: Vec<_> = list.rows.iter().map(|r| r.id.0).collect();
        assert_eq!(ids, [1, 2, 3, 4]);
        assert_eq!(list.total, 4);
    }

    #[test]
    fn filter_is_case_insensitive_subsequence() {
        let list = render(&sample(), "BERLIN");
        let ids: Vec<_> = list.rows.iter().map(|r| r.id.0).collect();
        assert_eq!(ids, [1, 3]);
    }

    #[test]
    fn no_match_renders_nothing() {
        assert!(render(&sample(), "Oslo").rows.is_empty());
    }

    #[test]
    fn row_shows_capacity_weather_and_actions() {
        let list = render(&sample()[..1], "");
        let row = &list.rows[0];

        assert_eq!(row.title, "Berlin - 50 kW");
        assert_eq!(row.weather_line, "Weather: clear sky, 280K");
        assert_eq!(row.actions, [ListAction::Edit, ListAction::Remove]);
    }

    #[test]
    fn unparsed_capacity_renders_as_nan() {
        let mut r = record(9, "Imported", 0);
        r.capacity = None;
        r.weather = WeatherSnapshot::Unavailable;

        let list = render(&[r], "");
        assert_eq!(list.rows[0].title, "Imported - NaN kW");
        assert_eq!(list.rows[0].weather_line, "Weather: N/A");
    }
}
