//! In-memory snapshot store
//!
//! Keeps images in a shared map. Clones share the same storage, so a test
//! can hand one clone to a store manager and inspect the other. Load and save
//! failures can be switched on to exercise error paths.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::SnapshotStore;

#[derive(Default)]
struct MemoryInner {
    images: Mutex<HashMap<String, Vec<u8>>>,
    loads: AtomicUsize,
    saves: AtomicUsize,
    fail_loads: AtomicBool,
    fail_saves: AtomicBool,
    delay_ms: AtomicU64,
}

/// Snapshot store that keeps images in memory
#[derive(Clone, Default)]
pub struct MemorySnapshotStore {
    inner: Arc<MemoryInner>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read an image without going through the async interface or counters
    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.images().ok()?.get(key).cloned()
    }

    /// Store an image without going through the async interface or counters
    pub fn put(&self, key: &str, image: Vec<u8>) {
        if let Ok(mut images) = self.images() {
            images.insert(key.to_string(), image);
        }
    }

    /// Number of `load` calls so far
    pub fn load_count(&self) -> usize {
        self.inner.loads.load(Ordering::SeqCst)
    }

    /// Number of successful `save` calls so far
    pub fn save_count(&self) -> usize {
        self.inner.saves.load(Ordering::SeqCst)
    }

    /// Make every subsequent `load` fail (or succeed again)
    pub fn fail_loads(&self, fail: bool) {
        self.inner.fail_loads.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent `save` fail (or succeed again)
    pub fn fail_saves(&self, fail: bool) {
        self.inner.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Suspend every `load` and `save` for the given duration
    pub fn set_delay(&self, delay: Duration) {
        self.inner
            .delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    fn images(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Vec<u8>>>> {
        self.inner
            .images
            .lock()
            .map_err(|_| anyhow!("Memory snapshot store lock poisoned"))
    }

    async fn suspend(&self) {
        let delay_ms = self.inner.delay_ms.load(Ordering::SeqCst);
        if delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        } else {
            tokio::task::yield_now().await;
        }
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn load(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.inner.loads.fetch_add(1, Ordering::SeqCst);
        self.suspend().await;

        if self.inner.fail_loads.load(Ordering::SeqCst) {
            return Err(anyhow!("Snapshot storage unavailable"));
        }
        Ok(self.images()?.get(key).cloned())
    }

    async fn save(&self, key: &str, image: &[u8]) -> Result<()> {
        self.suspend().await;

        if self.inner.fail_saves.load(Ordering::SeqCst) {
            return Err(anyhow!("Snapshot storage quota exceeded"));
        }
        self.images()?.insert(key.to_string(), image.to_vec());
        self.inner.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn storage_type(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_clones_share_storage() {
        let store = MemorySnapshotStore::new();
        let other = store.clone();

        store.save("db", b"image").await.unwrap();

        assert_eq!(other.get("db"), Some(b"image".to_vec()));
        assert_eq!(other.save_count(), 1);
        assert_eq!(other.load("missing").await.unwrap(), None);
        assert_eq!(store.load_count(), 1);
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let store = MemorySnapshotStore::new();
        store.put("db", b"kept".to_vec());

        store.fail_saves(true);
        assert!(store.save("db", b"lost").await.is_err());
        assert_eq!(store.get("db"), Some(b"kept".to_vec()));
        assert_eq!(store.save_count(), 0);

        store.fail_loads(true);
        assert!(store.load("db").await.is_err());

        store.fail_loads(false);
        store.fail_saves(false);
        store.save("db", b"new").await.unwrap();
        assert_eq!(store.load("db").await.unwrap(), Some(b"new".to_vec()));
    }
}
