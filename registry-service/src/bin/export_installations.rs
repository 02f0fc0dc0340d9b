use anyhow::{Context, Result};
use registry_service::{config::AppConfig, observability, open_store, transfer};
use std::{env, fs, io::Write};

/// Writes the stored list as CSV to the given path, or stdout when the path
/// is `-`. Defaults to `installations.csv`.
fn main() -> Result<()> {
    observability::init_tracing();

    let target = env::args()
        .nth(1)
        .unwrap_or_else(|| transfer::EXPORT_FILE_NAME.to_string());

    let cfg = AppConfig::load()?;
    let store = open_store(&cfg.storage)?;
    let text = transfer::export_csv(store.records())?;

    if target == "-" {
        let mut out = std::io::stdout().lock();
        out.write_all(text.as_bytes())?;
        out.flush()?;
    } else {
        fs::write(&target, &text).with_context(|| format!("failed to write '{target}'"))?;
    }

    tracing::info!(path = %target, count = store.len(), "installations exported");
    Ok(())
}
