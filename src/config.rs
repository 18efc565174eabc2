use anyhow::{anyhow, Result};
use config::Config;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crate::database::{
    DatabaseConn, FileSnapshotStore, SchemaManager, SchemaStatus, StoreManager,
    DEFAULT_SNAPSHOT_KEY, DEFAULT_STORE_NAME,
};

pub struct BookmarksKitConfig {
    /// Path to the directory to hold bookmarks-kit's data
    pub data_dir: String,

    /// Key the database snapshot is stored under
    pub snapshot_key: String,
}

const EMPTY_CONFIG: &str = r#"### bookmarks-kit configuration file

### directory for the bookmark database snapshot
# data_dir = "~/.bookmarks-kit"

### key the database snapshot is stored under
# snapshot_key = "db"
"#;

impl Default for BookmarksKitConfig {
    fn default() -> Self {
        let home_dir = dirs::home_dir()
            .map(|h| h.to_string_lossy().to_string())
            .unwrap_or_else(|| ".".to_string());

        Self {
            data_dir: format!("{}/.bookmarks-kit", home_dir),
            snapshot_key: DEFAULT_SNAPSHOT_KEY.to_string(),
        }
    }
}

impl BookmarksKitConfig {
    /// Function to create and initialize a new configuration
    pub fn new(path: &Option<String>) -> Result<BookmarksKitConfig> {
        let mut builder = Config::builder();

        // By default use $HOME/.bookmarks-kit/bookmarks-kit.toml as the configuration file path
        let home_dir = dirs::home_dir()
            .ok_or_else(|| anyhow!("Could not find home directory"))?
            .to_str()
            .ok_or_else(|| anyhow!("Could not convert home directory path to string"))?
            .to_owned();

        let kit_dir = format!("{}/.bookmarks-kit", home_dir.as_str());

        match path {
            Some(p) => {
                let path = Path::new(p.as_str());
                if path.exists() {
                    let path_str = path
                        .to_str()
                        .ok_or_else(|| anyhow!("Could not convert path to string"))?;
                    builder = builder.add_source(config::File::with_name(path_str));
                } else {
                    std::fs::write(p.as_str(), EMPTY_CONFIG)
                        .map_err(|e| anyhow!("Unable to create config file: {}", e))?;
                }
            }
            None => {
                std::fs::create_dir_all(kit_dir.as_str())
                    .map_err(|e| anyhow!("Unable to create bookmarks-kit directory: {}", e))?;
                let p = format!("{}/bookmarks-kit.toml", kit_dir.as_str());
                if Path::new(p.as_str()).exists() {
                    builder = builder.add_source(config::File::with_name(p.as_str()));
                } else {
                    std::fs::write(p.as_str(), EMPTY_CONFIG).map_err(|e| {
                        anyhow!("Unable to create config file {}: {}", p.as_str(), e)
                    })?;
                }
            }
        }

        // Add in settings from the environment (with a prefix of BOOKMARKS_KIT)
        // E.g., `BOOKMARKS_KIT_DATA_DIR=/tmp/kit bookmarks-kit status` would set the data directory
        builder = builder.add_source(config::Environment::with_prefix("BOOKMARKS_KIT"));

        let settings = builder
            .build()
            .map_err(|e| anyhow!("Failed to build configuration: {}", e))?;

        let config = settings
            .try_deserialize::<HashMap<String, String>>()
            .map_err(|e| anyhow!("Failed to deserialize configuration: {}", e))?;

        Self::from_settings(&config, &kit_dir)
    }

    /// Build a configuration from already-merged key/value settings
    fn from_settings(settings: &HashMap<String, String>, default_dir: &str) -> Result<Self> {
        let data_dir = match settings.get("data_dir") {
            Some(p) => expand_home(p),
            None => default_dir.to_string(),
        };

        let snapshot_key = match settings.get("snapshot_key") {
            Some(key) if key.trim().is_empty() => {
                return Err(anyhow!("snapshot_key must not be empty"));
            }
            Some(key) => key.trim().to_string(),
            None => DEFAULT_SNAPSHOT_KEY.to_string(),
        };

        Ok(BookmarksKitConfig {
            data_dir,
            snapshot_key,
        })
    }

    /// Directory holding snapshot images
    pub fn snapshot_dir(&self) -> String {
        let data_dir = self.data_dir.trim_end_matches('/');
        format!("{}/{}", data_dir, DEFAULT_STORE_NAME)
    }

    /// Snapshot store rooted at the configured data directory
    pub fn snapshot_store(&self) -> FileSnapshotStore {
        FileSnapshotStore::new(self.snapshot_dir())
    }

    /// Path of the snapshot image file
    pub fn snapshot_path(&self) -> String {
        self.snapshot_store()
            .image_path(&self.snapshot_key)
            .to_string_lossy()
            .to_string()
    }

    /// Create a store manager for the configured snapshot (not yet initialized)
    pub fn store_manager(&self) -> StoreManager {
        StoreManager::with_key(Arc::new(self.snapshot_store()), self.snapshot_key.clone())
    }

    /// Display configuration summary
    pub fn summary(&self) -> String {
        [
            format!("Data Directory:     {}", self.data_dir),
            format!("Snapshot Key:       {}", self.snapshot_key),
            format!("Snapshot Path:      {}", self.snapshot_path()),
        ]
        .join("\n")
    }

    /// Get the config file path
    pub fn config_file_path() -> String {
        let home_dir = dirs::home_dir()
            .map(|h| h.to_string_lossy().to_string())
            .unwrap_or_else(|| "~".to_string());
        format!("{}/.bookmarks-kit/bookmarks-kit.toml", home_dir)
    }
}

fn expand_home(path: &str) -> String {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest).to_string_lossy().to_string(),
        _ => path.to_string(),
    }
}

// =============================================================================
// Snapshot Info (used by the status command)
// =============================================================================

/// Information about the persisted snapshot
#[derive(Debug, Serialize, Clone)]
pub struct SnapshotInfo {
    pub path: String,
    pub exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
    pub readable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_version: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bookmark_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bookmark_tag_count: Option<u64>,
}

/// Inspect the persisted snapshot without initializing a store manager
///
/// The image is only read, never migrated or written back.
pub fn get_snapshot_info(config: &BookmarksKitConfig) -> SnapshotInfo {
    let path = config.snapshot_path();
    let image = std::fs::read(&path).ok();

    let mut info = SnapshotInfo {
        path,
        exists: image.is_some(),
        size_bytes: image.as_ref().map(|i| i.len() as u64),
        readable: false,
        schema_status: None,
        schema_version: None,
        bookmark_count: None,
        tag_count: None,
        bookmark_tag_count: None,
    };

    let Some(db) = image.and_then(|i| DatabaseConn::from_image(&i).ok()) else {
        return info;
    };
    info.readable = true;

    let schema = SchemaManager::new(&db.conn);
    let status = schema.check_status().ok();
    info.schema_version = schema.schema_version().ok();
    info.schema_status = status.as_ref().map(|s| s.to_string());

    if !matches!(status, None | Some(SchemaStatus::NotInitialized)) {
        info.bookmark_count = db.table_count("bookmarks").ok();
        info.tag_count = db.table_count("tags").ok();
        info.bookmark_tag_count = db.table_count("bookmark_tags").ok();
    }

    info
}

/// Format bytes as human-readable size
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
