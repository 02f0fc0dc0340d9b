pub mod ids;
pub mod storage;

use std::sync::Arc;

use registry_client::{Installation, InstallationDraft, InstallationId};
use tokio::sync::watch;

pub use ids::IdGenerator;
pub use storage::{FileStorage, KeyValueStorage, MemoryStorage, StorageError};

/// Key of the persistent slot holding the snapshot.
pub const DEFAULT_STORAGE_KEY: &str = "installations";

/// Latest published contents of the store.
pub type Snapshot = Arc<Vec<Installation>>;

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("failed to serialize snapshot: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Ordered installation list mirrored to a key-value slot.
///
/// Every mutation saves the full sequence and publishes a fresh [`Snapshot`]
/// to subscribers. The generation counter only moves on [`replace_all`],
/// letting callers detect that the list they started from was discarded.
///
/// [`replace_all`]: RecordStore::replace_all
pub struct RecordStore {
    storage: Arc<dyn KeyValueStorage>,
    key: String,
    records: Vec<Installation>,
    ids: IdGenerator,
    generation: u64,
    snapshots: watch::Sender<Snapshot>,
}

impl RecordStore {
    /// Reads the persisted snapshot; a missing or unreadable one starts empty.
    pub fn load(storage: Arc<dyn KeyValueStorage>, key: impl Into<String>) -> Self {
        let key = key.into();

        let records: Vec<Installation> = match storage.get(&key) {
            Ok(Some(text)) => match serde_json::from_str(&text) {
                Ok(records) => records,
                Err(e) => {
                    tracing::warn!(error = %e, key = %key, "discarding unparsable installation snapshot");
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!(error = %e, key = %key, "failed to read installation snapshot");
                Vec::new()
            }
        };

        let last_id = records.iter().map(|r| r.id.0).max().unwrap_or(0);
        tracing::info!(count = records.len(), key = %key, "installation store loaded");
        metrics::gauge!("installations_stored").set(records.len() as f64);

        let (snapshots, _) = watch::channel(Arc::new(records.clone()));

        Self {
            storage,
            key,
            records,
            ids: IdGenerator::starting_after(last_id),
            generation: 0,
            snapshots,
        }
    }

    pub fn records(&self) -> &[Installation] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.snapshots.subscribe()
    }

    /// Appends `draft` with a fresh id. A failed write leaves the list as it was.
    pub fn add(&mut self, draft: InstallationDraft) -> Result<Installation, StoreError> {
        let installation = draft.into_installation(self.ids.next_id());
        self.records.push(installation.clone());
        if let Err(e) = self.save() {
            self.records.pop();
            return Err(e);
        }

        metrics::counter!("installations_added_total").increment(1);
        Ok(installation)
    }

    /// Removes every record carrying `id`; returns how many went.
    pub fn remove_by_id(&mut self, id: InstallationId) -> Result<usize, StoreError> {
        let previous = self.records.clone();
        self.records.retain(|r| r.id != id);
        let removed = previous.len() - self.records.len();
        if let Err(e) = self.save() {
            self.records = previous;
            return Err(e);
        }

        metrics::counter!("installations_removed_total").increment(removed as u64);
        Ok(removed)
    }

    /// Installs `drafts` in place of the current list and bumps the generation.
    ///
    /// On a failed write both the list and the generation are restored.
    pub fn replace_all(&mut self, drafts: Vec<InstallationDraft>) -> Result<usize, StoreError> {
        let fresh: Vec<Installation> = drafts
            .into_iter()
            .map(|d| d.into_installation(self.ids.next_id()))
            .collect();
        let previous = std::mem::replace(&mut self.records, fresh);
        self.generation += 1;
        if let Err(e) = self.save() {
            self.records = previous;
            self.generation -= 1;
            return Err(e);
        }

        metrics::counter!("installations_imported_total").increment(self.records.len() as u64);
        Ok(self.records.len())
    }

    /// Writes the whole sequence to the slot, then publishes it.
    ///
    /// Nothing is published when the write fails.
    pub fn save(&self) -> Result<(), StoreError> {
        let text = serde_json::to_string(&self.records)?;
        self.storage.set(&self.key, &text)?;

        metrics::gauge!("installations_stored").set(self.records.len() as f64);
        self.snapshots.send_replace(Arc::new(self.records.clone()));
        tracing::debug!(count = self.records.len(), "installation snapshot saved");
        Ok(())
    }
}
