use anyhow::{bail, Context, Result};
use registry_service::{config::AppConfig, observability, open_store, transfer};
use std::{env, fs};

fn main() -> Result<()> {
    observability::init_tracing();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        bail!("usage: import_installations <csv_file_path>");
    }
    let file_path = &args[1];

    // Load configuration (REGISTRY_CONFIG selects the storage to replace).
    let cfg = AppConfig::load()?;

    let text = fs::read_to_string(file_path).with_context(|| format!("failed to read '{file_path}'"))?;
    let drafts = transfer::import_csv(&text)?;

    let mut store = open_store(&cfg.storage)?;
    let previous = store.len();
    let imported = store.replace_all(drafts)?;

    tracing::info!(
        file = %file_path,
        previous,
        imported,
        "installation list replaced from csv"
    );

    Ok(())
}
