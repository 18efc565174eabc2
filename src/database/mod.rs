//! Database module
//!
//! This module provides all database functionality for bookmarks-kit, organized into:
//!
//! - **core**: In-memory SQLite backend, result rows, schema management
//! - **snapshot**: Persistence of serialized database images
//! - **store**: The store manager that ties the two together
//! - **records**: Typed views over bookmark, tag and association rows
//!
//! # Architecture
//!
//! ```text
//! database/
//! ├── core/           # Foundation
//! │   ├── connection  # DatabaseConn: in-memory SQLite + image (de)serialization
//! │   ├── row         # Row and SqlValue
//! │   └── schema      # Baseline schema and additive migrations
//! │
//! ├── snapshot/       # Persistence
//! │   ├── file        # One image file per key
//! │   └── memory      # In-process images (tests, throwaway stores)
//! │
//! ├── store/          # StoreManager lifecycle and API
//! └── records         # BookmarkRecord, TagRecord, BookmarkTagRecord
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use bookmarks_kit::database::{FileSnapshotStore, SqlValue, StoreManager};
//!
//! let manager = StoreManager::new(Arc::new(FileSnapshotStore::new("~/.bookmarks-kit/bookmarks_kit.db")));
//! manager.initialize().await?;
//!
//! manager
//!     .execute(
//!         "INSERT INTO tags (id, name) VALUES (?1, ?2)",
//!         &[SqlValue::Text("t1".into()), SqlValue::Text("rust".into())],
//!     )
//!     .await?;
//!
//! let rows = manager.query("SELECT * FROM tags", &[])?;
//! ```

pub mod core;
pub mod records;
pub mod snapshot;
pub mod store;

// Backend and schema
pub use self::core::{
    value_to_json, DatabaseConn, MigrationReport, Row, SchemaDefinitions, SchemaManager,
    SchemaStatus, SqlValue, SCHEMA_VERSION,
};

// Snapshot persistence
pub use snapshot::{
    FileSnapshotStore, MemorySnapshotStore, SnapshotStore, DEFAULT_SNAPSHOT_KEY,
    DEFAULT_STORE_NAME,
};

// Store manager
pub use store::{Applied, BatchOp, CommitReceipt, StoreError, StoreManager, StoreStatus};

// Typed records
pub use records::{from_rows, BookmarkRecord, BookmarkTagRecord, TagRecord};
