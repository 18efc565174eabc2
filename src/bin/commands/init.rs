use anyhow::Result;
use bookmarks_kit::config::BookmarksKitConfig;
use serde::Serialize;

use super::{format_value, OutputFormat};

#[derive(Debug, Serialize)]
struct InitResult {
    snapshot_path: String,
    storage_type: String,
    schema_status: String,
}

/// Initialize the store, creating or migrating the snapshot as needed
pub async fn run(config: &BookmarksKitConfig, format: OutputFormat) -> Result<()> {
    let manager = config.store_manager();
    manager.initialize().await?;

    let result = InitResult {
        snapshot_path: config.snapshot_path(),
        storage_type: manager.storage_type().to_string(),
        schema_status: manager.schema_status()?.to_string(),
    };

    let out = format_value(&result, format, || {
        format!(
            "Store ready at {} (schema: {})",
            result.snapshot_path, result.schema_status
        )
    })?;
    println!("{}", out);
    Ok(())
}
