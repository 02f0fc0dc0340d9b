use std::sync::Arc;

use registry_client::{Installation, InstallationDraft, InstallationId};
use serde::{Deserialize, Serialize};
use tokio::sync::{watch, Mutex};

use crate::{
    projection::{self, RenderedList},
    store::{RecordStore, Snapshot, StoreError},
    transfer::{self, TransferError},
    weather::{self, WeatherProvider},
};

/// Shown to the user whenever a submission is rejected.
pub const REJECTION_MESSAGE: &str = "Please enter a valid location and a positive capacity.";

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("location must not be empty")]
    EmptyLocation,
    #[error("capacity must be a positive integer, got '{0}'")]
    InvalidCapacity(String),
}

#[derive(thiserror::Error, Debug)]
pub enum SubmitError {
    #[error("invalid submission: {0}")]
    Invalid(#[from] ValidationError),
    #[error("installation list was replaced while the submission was in flight")]
    Superseded,
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(thiserror::Error, Debug)]
pub enum ImportError {
    #[error(transparent)]
    Transfer(#[from] TransferError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Raw, unvalidated form fields.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FormInput {
    pub location: String,
    pub capacity: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidInput {
    pub location: String,
    pub capacity: u32,
}

/// Values copied back into the form when a row is edited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormPrefill {
    pub location: String,
    pub capacity: Option<i64>,
}

/// The only validation gate: location non-empty, capacity a positive integer.
pub fn validate(input: &FormInput) -> Result<ValidInput, ValidationError> {
    let location = input.location.trim();
    if location.is_empty() {
        return Err(ValidationError::EmptyLocation);
    }

    let raw = input.capacity.trim();
    let capacity = raw
        .parse::<u32>()
        .ok()
        .filter(|&kw| kw > 0)
        .ok_or_else(|| ValidationError::InvalidCapacity(raw.to_string()))?;

    Ok(ValidInput {
        location: location.to_string(),
        capacity,
    })
}

/// Drives the record store from user actions.
pub struct FormController {
    store: Arc<Mutex<RecordStore>>,
    weather: Arc<dyn WeatherProvider>,
}

impl FormController {
    pub fn new(store: RecordStore, weather: Arc<dyn WeatherProvider>) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
            weather,
        }
    }

    pub async fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.store.lock().await.subscribe()
    }

    pub async fn records(&self) -> Vec<Installation> {
        self.store.lock().await.records().to_vec()
    }

    /// Validates, enriches with weather, then appends.
    ///
    /// The store lock is not held across the weather lookup. If an import
    /// replaced the list in the meantime the submission is dropped with
    /// [`SubmitError::Superseded`].
    pub async fn submit(&self, input: FormInput) -> Result<Installation, SubmitError> {
        let valid = match validate(&input) {
            Ok(v) => v,
            Err(e) => {
                metrics::counter!("submit_rejected_total").increment(1);
                tracing::info!(error = %e, "submission rejected");
                return Err(e.into());
            }
        };

        tracing::info!(location = %valid.location, capacity = valid.capacity, "adding installation");
        let generation = self.store.lock().await.generation();

        let reading = self.weather.fetch(&valid.location).await;

        let mut store = self.store.lock().await;
        if store.generation() != generation {
            metrics::counter!("submit_superseded_total").increment(1);
            tracing::warn!(
                location = %valid.location,
                started_at = generation,
                current = store.generation(),
                "dropping submission made stale by an import"
            );
            return Err(SubmitError::Superseded);
        }

        let installation = store.add(InstallationDraft {
            location: valid.location,
            capacity: Some(i64::from(valid.capacity)),
            weather: weather::snapshot_of(reading.as_ref()),
        })?;

        tracing::info!(id = %installation.id, weather = %installation.weather, "installation added");
        Ok(installation)
    }

    pub async fn remove(&self, id: InstallationId) -> Result<usize, StoreError> {
        let removed = self.store.lock().await.remove_by_id(id)?;
        tracing::info!(id = %id, removed, "installation removed");
        Ok(removed)
    }

    /// Returns the record's form values and removes it; `None` if unknown.
    pub async fn edit(&self, id: InstallationId) -> Result<Option<FormPrefill>, StoreError> {
        let mut store = self.store.lock().await;

        let prefill = match store.records().iter().find(|r| r.id == id) {
            Some(r) => FormPrefill {
                location: r.location.clone(),
                capacity: r.capacity,
            },
            None => return Ok(None),
        };

        store.remove_by_id(id)?;
        tracing::info!(id = %id, "installation moved back into the form for editing");
        Ok(Some(prefill))
    }

    /// Replaces the whole list with the rows of `text`.
    pub async fn import(&self, text: &str) -> Result<usize, ImportError> {
        let drafts = transfer::import_csv(text)?;
        let count = self.store.lock().await.replace_all(drafts)?;
        tracing::info!(count, "installations imported");
        Ok(count)
    }

    pub async fn export(&self) -> Result<String, TransferError> {
        let store = self.store.lock().await;
        transfer::export_csv(store.records())
    }

    pub async fn render(&self, filter: &str) -> RenderedList {
        let store = self.store.lock().await;
        projection::render(store.records(), filter)
    }
}
