//! File-based snapshot store
//!
//! Each key maps to a single file: `{dir}/{key}.sqlite3`. Because the image
//! is a plain SQLite database file, it can also be opened with any SQLite
//! tool for inspection.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info};

use super::SnapshotStore;

/// Per-process sequence for temporary image names
static SAVE_SEQ: AtomicU64 = AtomicU64::new(0);

/// Snapshot store backed by files in one directory
#[derive(Debug, Clone)]
pub struct FileSnapshotStore {
    dir: PathBuf,
}

impl FileSnapshotStore {
    /// Create a store rooted at `dir`
    ///
    /// The directory is created lazily by the first `load` or `save`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the snapshot files
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the image file for a key
    pub fn image_path(&self, key: &str) -> PathBuf {
        let safe_key = key.replace(['/', '\\', ':', '.'], "_");
        self.dir.join(format!("{}.sqlite3", safe_key))
    }

    async fn provision(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| anyhow!("Failed to create snapshot directory {:?}: {}", self.dir, e))
    }
}

#[async_trait]
impl SnapshotStore for FileSnapshotStore {
    async fn load(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.provision().await?;

        let path = self.image_path(key);
        match tokio::fs::read(&path).await {
            Ok(image) => {
                debug!("Loaded {} byte snapshot from {:?}", image.len(), path);
                Ok(Some(image))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(anyhow!("Failed to read snapshot {:?}: {}", path, e)),
        }
    }

    async fn save(&self, key: &str, image: &[u8]) -> Result<()> {
        self.provision().await?;

        let path = self.image_path(key);
        // Overlapping saves each write their own temporary file
        let tmp_path = path.with_extension(format!(
            "sqlite3.{}.{}.tmp",
            std::process::id(),
            SAVE_SEQ.fetch_add(1, Ordering::Relaxed)
        ));

        if let Err(e) = tokio::fs::write(&tmp_path, image).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(anyhow!("Failed to write snapshot {:?}: {}", tmp_path, e));
        }
        if let Err(e) = tokio::fs::rename(&tmp_path, &path).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(anyhow!("Failed to replace snapshot {:?}: {}", path, e));
        }

        info!("Saved {} byte snapshot to {:?}", image.len(), path);
        Ok(())
    }

    fn storage_type(&self) -> &str {
        "file"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_load_provisions_directory() {
        let temp = tempfile::tempdir().unwrap();
        let dir = temp.path().join("nested").join("bookmarks_kit.db");
        let store = FileSnapshotStore::new(&dir);

        assert!(store.load("db").await.unwrap().is_none());
        assert!(dir.is_dir());
    }

    #[tokio::test]
    async fn test_save_replaces_image() {
        let temp = tempfile::tempdir().unwrap();
        let store = FileSnapshotStore::new(temp.path());

        store.save("db", b"first image").await.unwrap();
        store.save("db", b"second").await.unwrap();

        assert_eq!(store.load("db").await.unwrap(), Some(b"second".to_vec()));
        assert!(leftover_tmp_files(temp.path()).is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_overlapping_saves_never_tear_the_image() {
        let temp = tempfile::tempdir().unwrap();
        let store = FileSnapshotStore::new(temp.path());

        let first = vec![0xAAu8; 4 * 1024 * 1024];
        let second = vec![0x55u8; 4 * 1024 * 1024];
        for _ in 0..4 {
            let (a, b) = tokio::join!(store.save("db", &first), store.save("db", &second));
            a.unwrap();
            b.unwrap();

            let image = store.load("db").await.unwrap().unwrap();
            assert!(image == first || image == second);
        }
        assert!(leftover_tmp_files(temp.path()).is_empty());
    }

    fn leftover_tmp_files(dir: &Path) -> Vec<PathBuf> {
        std::fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "tmp"))
            .collect()
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let temp = tempfile::tempdir().unwrap();
        let store = FileSnapshotStore::new(temp.path());

        store.save("db", b"main").await.unwrap();

        assert!(store.load("other").await.unwrap().is_none());
        assert_eq!(store.image_path("a/b.c"), temp.path().join("a_b_c.sqlite3"));
    }

    #[tokio::test]
    async fn test_save_fails_when_directory_is_a_file() {
        let temp = tempfile::tempdir().unwrap();
        let blocker = temp.path().join("blocked");
        std::fs::write(&blocker, b"not a directory").unwrap();

        let store = FileSnapshotStore::new(&blocker);
        assert!(store.save("db", b"image").await.is_err());
        assert!(store.load("db").await.is_err());
    }
}
