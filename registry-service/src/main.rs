use anyhow::{Context, Result};
use registry_service::{
    api::{self, AppState},
    config::AppConfig,
    metrics_server, observability, open_store,
    projection::{spawn_chart_projector, BarChart, SharedChart},
    weather::{OpenWeatherClient, WeatherProvider},
    FormController,
};
use std::{net::SocketAddr, sync::Arc};
use tokio::sync::RwLock;

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    // Load configuration
    let cfg = AppConfig::load()?;

    // Start metrics server if configured
    if let Some(metrics_cfg) = &cfg.metrics {
        metrics_server::init(&metrics_cfg.bind_addr).await?;
    }

    let store = open_store(&cfg.storage).context("failed to open installation storage")?;
    tracing::info!(
        data_dir = %cfg.storage.data_dir.display(),
        installations = store.len(),
        "installation registry starting"
    );

    let weather: Arc<dyn WeatherProvider> = Arc::new(OpenWeatherClient::new(
        cfg.weather.base_url.clone(),
        cfg.weather.api_key.clone(),
        cfg.weather.timeout(),
    )?);

    let chart: SharedChart = Arc::new(RwLock::new(BarChart::new(store.records())));
    let controller = Arc::new(FormController::new(store, weather));
    spawn_chart_projector(controller.subscribe().await, chart.clone());

    let app = api::router(AppState { controller, chart });

    let addr: SocketAddr = cfg
        .http
        .bind_addr
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid http.bind_addr: {e}"))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %addr, "http surface listening");

    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}
