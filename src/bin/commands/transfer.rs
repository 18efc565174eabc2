use anyhow::{anyhow, Result};
use bookmarks_kit::config::{format_size, BookmarksKitConfig};
use serde::Serialize;
use std::path::PathBuf;

use super::{format_value, OutputFormat};

#[derive(Debug, Serialize)]
struct TransferResult {
    file: String,
    size_bytes: u64,
}

/// Write the serialized database image to a file
pub async fn run_export(config: &BookmarksKitConfig, file: PathBuf, format: OutputFormat) -> Result<()> {
    let manager = config.store_manager();
    manager.initialize().await?;

    let image = manager.export()?;
    tokio::fs::write(&file, &image)
        .await
        .map_err(|e| anyhow!("Failed to write {}: {}", file.display(), e))?;

    let result = TransferResult {
        file: file.to_string_lossy().to_string(),
        size_bytes: image.len() as u64,
    };
    let out = format_value(&result, format, || {
        format!(
            "Exported {} to {}",
            format_size(result.size_bytes),
            result.file
        )
    })?;
    println!("{}", out);
    Ok(())
}

/// Replace the store contents with a database image read from a file
pub async fn run_import(config: &BookmarksKitConfig, file: PathBuf, format: OutputFormat) -> Result<()> {
    let image = tokio::fs::read(&file)
        .await
        .map_err(|e| anyhow!("Failed to read {}: {}", file.display(), e))?;

    let manager = config.store_manager();
    manager.import(&image).await?;

    let result = TransferResult {
        file: file.to_string_lossy().to_string(),
        size_bytes: image.len() as u64,
    };
    let out = format_value(&result, format, || {
        format!(
            "Imported {} from {}",
            format_size(result.size_bytes),
            result.file
        )
    })?;
    println!("{}", out);
    Ok(())
}
