use std::sync::Arc;

use futures::StreamExt;
use registry_client::Installation;
use serde::Serialize;
use tokio::sync::{watch, RwLock};
use tokio_stream::wrappers::WatchStream;

use crate::store::Snapshot;

pub const DATASET_LABEL: &str = "Capacity (kW)";

pub type SharedChart = Arc<RwLock<BarChart>>;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    pub label: String,
    pub data: Vec<Option<i64>>,
    pub background_color: String,
    pub border_color: String,
    pub border_width: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartData {
    pub labels: Vec<String>,
    pub datasets: Vec<Dataset>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Axis {
    pub begin_at_zero: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Scales {
    pub y: Axis,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartOptions {
    pub scales: Scales,
}

/// Bar chart of capacity per location, serialized as a Chart.js config.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarChart {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub data: ChartData,
    pub options: ChartOptions,
    #[serde(skip)]
    redraws: u64,
}

impl Default for BarChart {
    fn default() -> Self {
        Self {
            kind: "bar",
            data: ChartData {
                labels: Vec::new(),
                datasets: vec![Dataset {
                    label: DATASET_LABEL.to_string(),
                    data: Vec::new(),
                    background_color: "rgba(75, 192, 192, 0.2)".to_string(),
                    border_color: "rgba(75, 192, 192, 1)".to_string(),
                    border_width: 1,
                }],
            },
            options: ChartOptions {
                scales: Scales {
                    y: Axis { begin_at_zero: true },
                },
            },
            redraws: 0,
        }
    }
}

impl BarChart {
    pub fn new(records: &[Installation]) -> Self {
        let mut chart = Self::default();
        chart.update(records);
        chart
    }

    /// Replaces labels and data wholesale, then redraws.
    pub fn update(&mut self, records: &[Installation]) {
        self.data.labels = records.iter().map(|r| r.location.clone()).collect();
        let values = records.iter().map(|r| r.capacity).collect();
        if let Some(series) = self.data.datasets.first_mut() {
            series.data = values;
        }
        self.redraw();
    }

    pub fn labels(&self) -> &[String] {
        &self.data.labels
    }

    pub fn values(&self) -> &[Option<i64>] {
        self.data
            .datasets
            .first()
            .map(|d| d.data.as_slice())
            .unwrap_or(&[])
    }

    pub fn redraws(&self) -> u64 {
        self.redraws
    }

    fn redraw(&mut self) {
        self.redraws += 1;
        tracing::debug!(bars = self.data.labels.len(), redraws = self.redraws, "chart redraw");
    }
}

/// Keeps `chart` in step with every snapshot the store publishes.
pub fn spawn_chart_projector(
    snapshots: watch::Receiver<Snapshot>,
    chart: SharedChart,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut updates = WatchStream::new(snapshots);
        while let Some(snapshot) = updates.next().await {
            chart.write().await.update(&snapshot);
        }
        tracing::debug!("record store closed, chart projector stopping");
    })
}
