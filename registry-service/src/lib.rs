pub mod api;
pub mod config;
pub mod form;
pub mod metrics_server;
pub mod observability;
pub mod projection;
pub mod store;
pub mod transfer;
pub mod weather;

pub use form::FormController;
pub use store::RecordStore;

use std::sync::Arc;

/// Opens the record store described by `cfg`.
pub fn open_store(cfg: &config::StorageConfig) -> Result<RecordStore, store::StoreError> {
    let storage = store::FileStorage::open(&cfg.data_dir)?;
    Ok(RecordStore::load(Arc::new(storage), cfg.key.clone()))
}
