use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use registry_client::{Installation, InstallationId};
use serde::{Deserialize, Serialize};

use crate::{
    form::{FormController, FormInput, FormPrefill, ImportError, SubmitError, REJECTION_MESSAGE},
    projection::{BarChart, RenderedList, SharedChart},
    store::StoreError,
    transfer::{TransferError, EXPORT_FILE_NAME},
};

#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<FormController>,
    pub chart: SharedChart,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/installations", get(list_installations).post(create_installation))
        .route("/installations/:id", delete(remove_installation))
        .route("/installations/:id/edit", post(edit_installation))
        .route("/chart", get(chart))
        .route("/export", get(export_installations))
        .route("/import", post(import_installations))
        .with_state(state)
}

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Submit(#[from] SubmitError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Import(#[from] ImportError),
    #[error(transparent)]
    Export(#[from] TransferError),
    #[error("installation {0} not found")]
    NotFound(InstallationId),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Submit(SubmitError::Invalid(_)) => {
                (StatusCode::UNPROCESSABLE_ENTITY, REJECTION_MESSAGE.to_string())
            }
            ApiError::Submit(SubmitError::Superseded) => (StatusCode::CONFLICT, self.to_string()),
            ApiError::Import(ImportError::Transfer(_)) => (StatusCode::BAD_REQUEST, self.to_string()),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            ApiError::Submit(SubmitError::Store(_))
            | ApiError::Store(_)
            | ApiError::Import(ImportError::Store(_))
            | ApiError::Export(_) => {
                tracing::error!(error = %self, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}

#[derive(Deserialize)]
struct SearchParams {
    #[serde(default)]
    search: String,
}

/// Form fields arrive as text from HTML forms or as numbers from scripts.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawField {
    Text(String),
    Number(serde_json::Number),
}

#[derive(Deserialize)]
struct SubmitBody {
    #[serde(default)]
    location: String,
    capacity: Option<RawField>,
}

impl From<SubmitBody> for FormInput {
    fn from(body: SubmitBody) -> Self {
        let capacity = match body.capacity {
            Some(RawField::Text(s)) => s,
            Some(RawField::Number(n)) => n.to_string(),
            None => String::new(),
        };
        FormInput {
            location: body.location,
            capacity,
        }
    }
}

#[derive(Serialize)]
struct RemovedBody {
    removed: usize,
}

#[derive(Serialize)]
struct ImportedBody {
    imported: usize,
}

async fn health() -> &'static str {
    "ok"
}

async fn list_installations(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Json<RenderedList> {
    Json(state.controller.render(&params.search).await)
}

async fn create_installation(
    State(state): State<AppState>,
    Json(body): Json<SubmitBody>,
) -> Result<(StatusCode, Json<Installation>), ApiError> {
    metrics::counter!("http_submit_requests_total").increment(1);
    let installation = state.controller.submit(body.into()).await?;
    Ok((StatusCode::CREATED, Json(installation)))
}

async fn remove_installation(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<RemovedBody>, ApiError> {
    let removed = state.controller.remove(InstallationId(id)).await?;
    Ok(Json(RemovedBody { removed }))
}

async fn edit_installation(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<FormPrefill>, ApiError> {
    let id = InstallationId(id);
    state
        .controller
        .edit(id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound(id))
}

async fn chart(State(state): State<AppState>) -> Json<BarChart> {
    Json(state.chart.read().await.clone())
}

async fn export_installations(State(state): State<AppState>) -> Result<Response, ApiError> {
    let text = state.controller.export().await?;
    let disposition = format!("attachment; filename=\"{EXPORT_FILE_NAME}\"");

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        text,
    )
        .into_response())
}

async fn import_installations(
    State(state): State<AppState>,
    body: String,
) -> Result<Json<ImportedBody>, ApiError> {
    metrics::counter!("http_import_requests_total").increment(1);
    let imported = state.controller.import(&body).await?;
    Ok(Json(ImportedBody { imported }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        projection::spawn_chart_projector,
        store::{KeyValueStorage, MemoryStorage, RecordStore, StorageError, DEFAULT_STORAGE_KEY},
        weather::{NoWeather, WeatherProvider, WeatherReading},
    };
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tokio::sync::{Notify, RwLock};
    use tower::ServiceExt;

    /// Blocks every lookup until released.
    struct GatedWeather {
        entered: Notify,
        release: Notify,
    }

    #[async_trait::async_trait]
    impl WeatherProvider for GatedWeather {
        async fn fetch(&self, _location: &str) -> Option<WeatherReading> {
            self.entered.notify_one();
            self.release.notified().await;
            None
        }
    }

    struct FailingStorage;

    impl KeyValueStorage for FailingStorage {
        fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
            Ok(None)
        }

        fn set(&self, key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::Io {
                key: key.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
            })
        }
    }

    async fn app() -> (Router, AppState) {
        app_with(Arc::new(MemoryStorage::new()), Arc::new(NoWeather)).await
    }

    async fn app_with(
        storage: Arc<dyn KeyValueStorage>,
        weather: Arc<dyn WeatherProvider>,
    ) -> (Router, AppState) {
        let store = RecordStore::load(storage, DEFAULT_STORAGE_KEY);
        let controller = Arc::new(FormController::new(store, weather));
        let chart: SharedChart = Arc::new(RwLock::new(BarChart::default()));
        spawn_chart_projector(controller.subscribe().await, chart.clone());

        let state = AppState { controller, chart };
        (router(state.clone()), state)
    }

    fn post_json(uri: &str, json: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap()
    }

    async fn body_json(resp: Response) -> serde_json::Value {
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn create_accepts_text_or_number_capacity() {
        let (app, _) = app().await;

        let resp = app
            .clone()
            .oneshot(post_json("/installations", serde_json::json!({"location": "Berlin", "capacity": "50"})))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        let created = body_json(resp).await;
        assert_eq!(created["location"], "Berlin");
        assert_eq!(created["capacity"], 50);
        assert_eq!(created["weather"], "N/A");

        let resp = app
            .oneshot(post_json("/installations", serde_json::json!({"location": "Rome", "capacity": 20})))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
    }

    #[tokio::test]
    async fn invalid_submit_is_unprocessable() {
        let (app, state) = app().await;

        let resp = app
            .oneshot(post_json("/installations", serde_json::json!({"location": "Berlin", "capacity": 0})))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body_json(resp).await["error"], REJECTION_MESSAGE);
        assert!(state.controller.records().await.is_empty());
    }

    #[tokio::test]
    async fn list_filters_by_search() {
        let (app, _) = app().await;
        for (location, capacity) in [("Berlin", 50), ("Paris", 30)] {
            app.clone()
                .oneshot(post_json(
                    "/installations",
                    serde_json::json!({"location": location, "capacity": capacity}),
                ))
                .await
                .unwrap();
        }

        let resp = app
            .oneshot(Request::get("/installations?search=PAR").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let list = body_json(resp).await;
        assert_eq!(list["total"], 2);
        assert_eq!(list["rows"].as_array().unwrap().len(), 1);
        assert_eq!(list["rows"][0]["title"], "Paris - 30 kW");
    }

    #[tokio::test]
    async fn edit_and_remove_routes() {
        let (app, state) = app().await;
        state.controller.import("Berlin,50,N/A\nRome,20,Rain").await.unwrap();
        let ids: Vec<_> = state.controller.records().await.iter().map(|r| r.id.0).collect();

        let resp = app
            .clone()
            .oneshot(
                Request::post(format!("/installations/{}/edit", ids[0]))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let prefill = body_json(resp).await;
        assert_eq!(prefill["location"], "Berlin");
        assert_eq!(prefill["capacity"], 50);

        let resp = app
            .clone()
            .oneshot(
                Request::delete(format!("/installations/{}", ids[1]))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(body_json(resp).await["removed"], 1);

        let resp = app
            .oneshot(
                Request::post(format!("/installations/{}/edit", ids[1]))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert!(state.controller.records().await.is_empty());
    }

    #[tokio::test]
    async fn export_is_a_csv_download() {
        let (app, state) = app().await;
        state.controller.import("Paris,30,N/A").await.unwrap();

        let resp = app
            .oneshot(Request::get("/export").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"installations.csv\""
        );
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"Paris,30,N/A");
    }

    #[tokio::test]
    async fn import_replaces_list_and_chart_follows() {
        let (app, state) = app().await;
        let mut snapshots = state.controller.subscribe().await;

        let resp = app
            .clone()
            .oneshot(
                Request::post("/import")
                    .header(header::CONTENT_TYPE, "text/csv")
                    .body(Body::from("Paris,30,Clear\nRome,20,Rain"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(body_json(resp).await["imported"], 2);

        snapshots.changed().await.unwrap();
        // The projector task runs independently; give it a chance to apply the snapshot.
        for _ in 0..50 {
            if state.chart.read().await.labels().len() == 2 {
                break;
            }
            tokio::task::yield_now().await;
        }

        let resp = app
            .oneshot(Request::get("/chart").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let chart = body_json(resp).await;
        assert_eq!(chart["data"]["labels"], serde_json::json!(["Paris", "Rome"]));
        assert_eq!(chart["data"]["datasets"][0]["data"], serde_json::json!([30, 20]));
    }

    #[tokio::test]
    async fn submit_overtaken_by_import_is_conflict() {
        let gate = Arc::new(GatedWeather {
            entered: Notify::new(),
            release: Notify::new(),
        });
        let (app, state) = app_with(Arc::new(MemoryStorage::new()), gate.clone()).await;

        let pending = tokio::spawn(app.oneshot(post_json(
            "/installations",
            serde_json::json!({"location": "Berlin", "capacity": 50}),
        )));

        gate.entered.notified().await;
        state.controller.import("Paris,30,N/A").await.unwrap();
        gate.release.notify_one();

        let resp = pending.await.unwrap().unwrap();
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        assert!(body_json(resp).await["error"].is_string());

        let records = state.controller.records().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].location, "Paris");
    }

    #[tokio::test]
    async fn storage_failure_is_internal_error() {
        let (app, state) = app_with(Arc::new(FailingStorage), Arc::new(NoWeather)).await;

        let resp = app
            .clone()
            .oneshot(post_json("/installations", serde_json::json!({"location": "Berlin", "capacity": 50})))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(resp).await;
        assert!(body["error"].as_str().unwrap().contains("disk full"));

        let resp = app
            .oneshot(
                Request::post("/import")
                    .body(Body::from("Paris,30,N/A"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(state.controller.records().await.is_empty());
    }
}
