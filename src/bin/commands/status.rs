use anyhow::Result;
use bookmarks_kit::config::{format_size, get_snapshot_info, BookmarksKitConfig, SnapshotInfo};
use serde::Serialize;

use super::{format_value, OutputFormat};

#[derive(Debug, Serialize)]
struct StatusInfo {
    config_file: String,
    data_dir: String,
    snapshot_key: String,
    snapshot: SnapshotInfo,
}

/// Show configuration and snapshot status without modifying anything
pub fn run(config: &BookmarksKitConfig, format: OutputFormat) -> Result<()> {
    let status = StatusInfo {
        config_file: BookmarksKitConfig::config_file_path(),
        data_dir: config.data_dir.clone(),
        snapshot_key: config.snapshot_key.clone(),
        snapshot: get_snapshot_info(config),
    };

    let out = format_value(&status, format, || render(config, &status))?;
    println!("{}", out);
    Ok(())
}

fn render(config: &BookmarksKitConfig, status: &StatusInfo) -> String {
    let snapshot = &status.snapshot;
    let mut lines = vec![
        format!("Config File:        {}", status.config_file),
        config.summary(),
        String::new(),
        "Snapshot:".to_string(),
    ];

    if !snapshot.exists {
        lines.push("  Status:       not created (run `bookmarks-kit init`)".to_string());
        return lines.join("\n");
    }

    if let Some(size) = snapshot.size_bytes {
        lines.push(format!("  Size:         {}", format_size(size)));
    }
    if !snapshot.readable {
        lines.push("  Status:       unreadable database image".to_string());
        return lines.join("\n");
    }
    if let Some(schema) = &snapshot.schema_status {
        lines.push(format!("  Schema:       {}", schema));
    }
    if let Some(version) = snapshot.schema_version {
        lines.push(format!("  Version:      {}", version));
    }
    if let Some(count) = snapshot.bookmark_count {
        lines.push(format!("  Bookmarks:    {}", count));
    }
    if let Some(count) = snapshot.tag_count {
        lines.push(format!("  Tags:         {}", count));
    }
    if let Some(count) = snapshot.bookmark_tag_count {
        lines.push(format!("  Tag links:    {}", count));
    }
    lines.join("\n")
}
