#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

//! Bookmarks Kit - the embedded store behind a bookmark organizer
//!
//! Bookmarks Kit keeps a bookmark collection (bookmarks, tags, and the links
//! between them) in an in-memory SQLite database whose full image is
//! persisted to a snapshot store after every committed mutation. It can be
//! used as both a command-line application and a library.
//!
//! # Feature Flags
//!
//! | Feature | Description | Key Dependencies |
//! |---------|-------------|------------------|
//! | (none)  | Store manager, snapshot stores, schema, config | `rusqlite`, `tokio`, `config` |
//! | `cli`   | The `bookmarks-kit` binary | `clap`, `tabled`, `tracing-subscriber` |
//!
//! ```toml
//! # Library only
//! bookmarks-kit = { version = "0.3", default-features = false }
//!
//! # Default (CLI binary)
//! bookmarks-kit = "0.3"
//! ```
//!
//! # Architecture
//!
//! - **[`database`]**: all storage functionality
//!   - `core`: in-memory SQLite backend, result rows, schema and migrations
//!   - `snapshot`: the [`SnapshotStore`] trait with file and in-memory stores
//!   - `store`: the [`StoreManager`] lifecycle and query/mutation API
//!   - `records`: typed bookmark, tag, and link records
//!
//! - **[`config`]**: configuration file and environment handling
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use bookmarks_kit::{MemorySnapshotStore, SqlValue, StoreManager};
//!
//! let manager = StoreManager::new(Arc::new(MemorySnapshotStore::new()));
//! manager.initialize().await?;
//!
//! manager
//!     .execute(
//!         "INSERT INTO bookmarks (id, title, url) VALUES (?1, ?2, ?3)",
//!         &[
//!             SqlValue::Text("b1".into()),
//!             SqlValue::Text("Rust".into()),
//!             SqlValue::Text("https://www.rust-lang.org".into()),
//!         ],
//!     )
//!     .await?;
//!
//! let rows = manager.query("SELECT title FROM bookmarks", &[])?;
//! ```
//!
//! Several mutations can be applied and persisted together:
//!
//! ```rust,ignore
//! use bookmarks_kit::BatchOp;
//!
//! let applied = manager.apply_batch(&[
//!     BatchOp::new("INSERT INTO tags (id, name) VALUES ('t1', 'rust')"),
//!     BatchOp::new("INSERT INTO bookmark_tags (bookmark_id, tag_id) VALUES ('b1', 't1')"),
//! ])?;
//! manager.commit(applied).await?;
//! ```

pub mod config;
pub mod database;

// =============================================================================
// Configuration
// =============================================================================

pub use config::{format_size, get_snapshot_info, BookmarksKitConfig, SnapshotInfo};

// =============================================================================
// Database
// =============================================================================

pub use database::{
    // Backend and schema
    DatabaseConn,
    MigrationReport,
    Row,
    SchemaDefinitions,
    SchemaManager,
    SchemaStatus,
    SqlValue,
    SCHEMA_VERSION,
    // Snapshots
    FileSnapshotStore,
    MemorySnapshotStore,
    SnapshotStore,
    // Store manager
    Applied,
    BatchOp,
    CommitReceipt,
    StoreError,
    StoreManager,
    StoreStatus,
    // Records
    BookmarkRecord,
    BookmarkTagRecord,
    TagRecord,
};
