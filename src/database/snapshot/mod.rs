//! Snapshot persistence
//!
//! A snapshot store keeps exactly one serialized database image per key.
//! There is no history and no partial write: every `save` replaces the
//! previous image in full.
//!
//! Two implementations ship with the crate:
//! - [`FileSnapshotStore`]: one file per key inside a directory
//! - [`MemorySnapshotStore`]: in-process map, for tests and throwaway stores
//!
//! Hosts with their own storage implement [`SnapshotStore`] directly:
//!
//! ```rust,ignore
//! use async_trait::async_trait;
//! use bookmarks_kit::database::SnapshotStore;
//!
//! struct KvSnapshotStore { /* host handle */ }
//!
//! #[async_trait]
//! impl SnapshotStore for KvSnapshotStore {
//!     async fn load(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> { todo!() }
//!     async fn save(&self, key: &str, image: &[u8]) -> anyhow::Result<()> { todo!() }
//!     fn storage_type(&self) -> &str { "kv" }
//! }
//! ```

mod file;
mod memory;

pub use file::FileSnapshotStore;
pub use memory::MemorySnapshotStore;

use anyhow::Result;
use async_trait::async_trait;

/// Key under which the database image is stored
pub const DEFAULT_SNAPSHOT_KEY: &str = "db";

/// Name of the container (directory) that holds snapshot images
pub const DEFAULT_STORE_NAME: &str = "bookmarks_kit.db";

/// Asynchronous byte store for database snapshots
///
/// `load` must provision whatever container it needs when the store has
/// never been used, so that a later `save` succeeds, and return `None` in
/// that case rather than an error.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Load the image stored under `key`, if any
    async fn load(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Replace the image stored under `key`
    async fn save(&self, key: &str, image: &[u8]) -> Result<()>;

    /// Get the storage type identifier
    fn storage_type(&self) -> &str;
}
