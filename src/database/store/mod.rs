//! Store manager
//!
//! [`StoreManager`] is the single access point to the bookmark database. It
//! owns the in-memory SQLite backend, loads it from a [`SnapshotStore`] on
//! first use, migrates it, and writes a fresh snapshot after every mutation.
//!
//! # Lifecycle
//!
//! ```text
//! Uninitialized ──initialize()──▶ Initializing ──ok──▶ Ready
//!       ▲                              │                 │
//!       │                              └──err──▶ Failed  │
//!       └───────────────────close()──────────────────────┘
//! ```
//!
//! Concurrent `initialize()` calls join the one in-flight attempt. A failed
//! attempt is not retried automatically; the next `initialize()` starts over.
//!
//! # Apply and commit
//!
//! Mutations happen in two steps. [`StoreManager::apply`] and
//! [`StoreManager::apply_batch`] change the in-memory backend only;
//! [`StoreManager::commit`] serializes the backend and saves the image.
//! [`StoreManager::execute`] and [`StoreManager::execute_batch`] do both.
//! When a commit fails the mutation stays applied in memory but is not
//! durable; the next successful commit persists it.
//!
//! Only `initialize()` is safe to call concurrently. Two mutating calls racing
//! on the same manager may interleave their commits, and the last image
//! written wins.

mod error;

pub use error::StoreError;

use futures::future::{BoxFuture, FutureExt, Shared};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, error, info, warn};

use crate::database::core::{DatabaseConn, Row, SchemaManager, SchemaStatus, SqlValue};
use crate::database::snapshot::{SnapshotStore, DEFAULT_SNAPSHOT_KEY};

type InitFuture = Shared<BoxFuture<'static, Result<(), StoreError>>>;

enum Lifecycle {
    Uninitialized,
    Initializing(InitFuture),
    Ready(DatabaseConn),
    Failed(StoreError),
}

struct State {
    lifecycle: Lifecycle,
    /// Bumped by every new initialization attempt and by `close()`, so an
    /// attempt that finishes after `close()` cannot install its backend.
    generation: u64,
}

fn lock(state: &Mutex<State>) -> MutexGuard<'_, State> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Observable lifecycle state of a [`StoreManager`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreStatus {
    Uninitialized,
    Initializing,
    Ready,
    Failed(StoreError),
}

/// One statement of a batch
///
/// The batch already runs inside a transaction, so an op must not be a
/// transaction-control statement (`BEGIN`, `COMMIT`, `END`, `ROLLBACK`);
/// such batches are rejected before anything runs.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchOp {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

impl BatchOp {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    pub fn with_params(sql: impl Into<String>, params: Vec<SqlValue>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }

    /// Whether the statement opens or closes a transaction
    fn is_transaction_control(&self) -> bool {
        let keyword = self
            .sql
            .trim_start()
            .split(|c: char| !c.is_ascii_alphabetic())
            .next()
            .unwrap_or_default();
        ["BEGIN", "COMMIT", "END", "ROLLBACK"]
            .iter()
            .any(|k| keyword.eq_ignore_ascii_case(k))
    }
}

/// Changes applied to the in-memory backend but not yet persisted
#[must_use = "applied changes are not durable until committed"]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Applied {
    pub rows_changed: usize,
    pub statements: usize,
}

/// Result of a successful commit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitReceipt {
    pub rows_changed: usize,
    pub statements: usize,
    /// Size of the image written to the snapshot store
    pub image_bytes: usize,
}

/// Owner of the bookmark database
///
/// Construct one per process and share it (e.g. in an `Arc`) with every
/// consumer.
pub struct StoreManager {
    snapshots: Arc<dyn SnapshotStore>,
    key: String,
    state: Arc<Mutex<State>>,
}

impl StoreManager {
    /// Create a manager persisting under [`DEFAULT_SNAPSHOT_KEY`]
    pub fn new(snapshots: Arc<dyn SnapshotStore>) -> Self {
        Self::with_key(snapshots, DEFAULT_SNAPSHOT_KEY)
    }

    /// Create a manager persisting under a custom key
    pub fn with_key(snapshots: Arc<dyn SnapshotStore>, key: impl Into<String>) -> Self {
        Self {
            snapshots,
            key: key.into(),
            state: Arc::new(Mutex::new(State {
                lifecycle: Lifecycle::Uninitialized,
                generation: 0,
            })),
        }
    }

    /// Key the snapshot is stored under
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Storage type of the underlying snapshot store
    pub fn storage_type(&self) -> &str {
        self.snapshots.storage_type()
    }

    pub fn status(&self) -> StoreStatus {
        match &lock(&self.state).lifecycle {
            Lifecycle::Uninitialized => StoreStatus::Uninitialized,
            Lifecycle::Initializing(_) => StoreStatus::Initializing,
            Lifecycle::Ready(_) => StoreStatus::Ready,
            Lifecycle::Failed(e) => StoreStatus::Failed(e.clone()),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(lock(&self.state).lifecycle, Lifecycle::Ready(_))
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Load or create the database
    ///
    /// Returns immediately when already initialized. When an initialization
    /// is in flight, waits for that same attempt instead of starting another.
    pub async fn initialize(&self) -> Result<(), StoreError> {
        let pending = {
            let mut state = lock(&self.state);
            let existing = match &state.lifecycle {
                Lifecycle::Ready(_) => return Ok(()),
                Lifecycle::Initializing(pending) => Some(pending.clone()),
                Lifecycle::Uninitialized | Lifecycle::Failed(_) => None,
            };

            match existing {
                Some(pending) => pending,
                None => {
                    state.generation += 1;
                    let pending = Self::bootstrap(
                        self.snapshots.clone(),
                        self.key.clone(),
                        self.state.clone(),
                        state.generation,
                    )
                    .boxed()
                    .shared();
                    state.lifecycle = Lifecycle::Initializing(pending.clone());
                    pending
                }
            }
        };

        pending.await
    }

    async fn bootstrap(
        snapshots: Arc<dyn SnapshotStore>,
        key: String,
        state: Arc<Mutex<State>>,
        generation: u64,
    ) -> Result<(), StoreError> {
        let result = Self::open_backend(snapshots.as_ref(), &key).await;

        let mut state = lock(&state);
        if state.generation != generation {
            debug!("Initialization finished after close, discarding backend");
            return Err(StoreError::Initialization(
                "store was closed while initializing".to_string(),
            ));
        }

        match result {
            Ok(db) => {
                state.lifecycle = Lifecycle::Ready(db);
                Ok(())
            }
            Err(e) => {
                error!("Failed to initialize database: {}", e);
                state.lifecycle = Lifecycle::Failed(e.clone());
                Err(e)
            }
        }
    }

    async fn open_backend(
        snapshots: &dyn SnapshotStore,
        key: &str,
    ) -> Result<DatabaseConn, StoreError> {
        let image = snapshots
            .load(key)
            .await
            .map_err(|e| StoreError::persistence(&e))?;

        let db = match image {
            Some(image) => {
                info!("Loading database from {} byte snapshot", image.len());
                let db = DatabaseConn::from_image(&image)
                    .map_err(|e| StoreError::initialization(&e))?;

                let report = SchemaManager::new(&db.conn).migrate();
                for e in &report.errors {
                    warn!("{}", StoreError::Migration(e.clone()));
                }
                db
            }
            None => {
                info!("No snapshot found, creating new database");
                let db = DatabaseConn::open_empty().map_err(|e| StoreError::initialization(&e))?;
                SchemaManager::new(&db.conn)
                    .initialize()
                    .map_err(|e| StoreError::initialization(&e))?;
                db
            }
        };

        let image = db.image().map_err(|e| StoreError::persistence(&e))?;
        snapshots
            .save(key, &image)
            .await
            .map_err(|e| StoreError::persistence(&e))?;

        Ok(db)
    }

    /// Drop the backend and return to the uninitialized state
    ///
    /// The persisted snapshot is left untouched; the next `initialize()`
    /// reloads it.
    pub fn close(&self) {
        let mut state = lock(&self.state);
        state.generation += 1;
        if matches!(state.lifecycle, Lifecycle::Ready(_)) {
            info!("Closing database");
        }
        state.lifecycle = Lifecycle::Uninitialized;
    }

    // =========================================================================
    // Reads
    // =========================================================================

    fn with_backend<T>(
        &self,
        f: impl FnOnce(&DatabaseConn) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let state = lock(&self.state);
        match &state.lifecycle {
            Lifecycle::Ready(db) => f(db),
            _ => Err(StoreError::NotInitialized),
        }
    }

    /// Run a read statement and return every row
    pub fn query(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>, StoreError> {
        self.with_backend(|db| {
            db.query_rows(sql, params)
                .map_err(|e| StoreError::statement(&e))
        })
    }

    /// Run a closure against the raw SQLite connection
    ///
    /// Changes made through the connection are not persisted until the next
    /// commit; call [`StoreManager::persist`] after mutating.
    pub fn with_database<T>(
        &self,
        f: impl FnOnce(&rusqlite::Connection) -> T,
    ) -> Result<T, StoreError> {
        self.with_backend(|db| Ok(f(&db.conn)))
    }

    /// Schema status of the live database
    pub fn schema_status(&self) -> Result<SchemaStatus, StoreError> {
        self.with_backend(|db| {
            SchemaManager::new(&db.conn)
                .check_status()
                .map_err(|e| StoreError::Statement {
                    message: format!("{:#}", e),
                    constraint_violation: false,
                })
        })
    }

    /// Serialize the current database
    pub fn export(&self) -> Result<Vec<u8>, StoreError> {
        self.with_backend(|db| db.image().map_err(|e| StoreError::persistence(&e)))
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Apply one statement to the in-memory database without persisting
    pub fn apply(&self, sql: &str, params: &[SqlValue]) -> Result<Applied, StoreError> {
        self.with_backend(|db| {
            let rows_changed = db
                .execute_statement(sql, params)
                .map_err(|e| StoreError::statement(&e))?;
            Ok(Applied {
                rows_changed,
                statements: 1,
            })
        })
    }

    /// Apply a sequence of statements to the in-memory database without
    /// persisting
    ///
    /// The statements run in one transaction: if any fails, the earlier
    /// ones are rolled back and the error is returned. Ops that control the
    /// transaction themselves are rejected up front.
    pub fn apply_batch(&self, ops: &[BatchOp]) -> Result<Applied, StoreError> {
        if let Some(idx) = ops.iter().position(BatchOp::is_transaction_control) {
            return Err(StoreError::Statement {
                message: format!(
                    "batch operation {} controls the transaction ({}); batches already run in one transaction",
                    idx + 1,
                    ops[idx].sql.trim()
                ),
                constraint_violation: false,
            });
        }

        self.with_backend(|db| {
            let tx = db.transaction().map_err(|e| StoreError::statement(&e))?;

            let mut rows_changed = 0;
            for (idx, op) in ops.iter().enumerate() {
                rows_changed += db.execute_statement(&op.sql, &op.params).map_err(|e| {
                    warn!("Batch aborted at operation {} of {}: {}", idx + 1, ops.len(), e);
                    StoreError::statement(&e)
                })?;
            }

            tx.commit().map_err(|e| StoreError::statement(&e))?;
            Ok(Applied {
                rows_changed,
                statements: ops.len(),
            })
        })
    }

    /// Persist the current database as the snapshot
    pub async fn commit(&self, applied: Applied) -> Result<CommitReceipt, StoreError> {
        let image = self.export()?;

        self.snapshots
            .save(&self.key, &image)
            .await
            .map_err(|e| {
                warn!("Snapshot save failed, changes are applied but not durable: {:#}", e);
                StoreError::persistence(&e)
            })?;

        Ok(CommitReceipt {
            rows_changed: applied.rows_changed,
            statements: applied.statements,
            image_bytes: image.len(),
        })
    }

    /// Persist the current database without any tracked changes
    pub async fn persist(&self) -> Result<CommitReceipt, StoreError> {
        self.commit(Applied::default()).await
    }

    /// Execute one mutating statement and persist the result
    ///
    /// Returns the number of rows changed.
    pub async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<usize, StoreError> {
        let applied = self.apply(sql, params)?;
        Ok(self.commit(applied).await?.rows_changed)
    }

    /// Execute a batch of statements and persist once at the end
    ///
    /// Returns the total number of rows changed. See [`BatchOp`] for the
    /// statements a batch may not contain.
    pub async fn execute_batch(&self, ops: &[BatchOp]) -> Result<usize, StoreError> {
        let applied = self.apply_batch(ops)?;
        Ok(self.commit(applied).await?.rows_changed)
    }

    /// Replace the database with an exported image and persist it
    ///
    /// Initializes first when the manager was never initialized. An image
    /// that cannot be read leaves the current database in place. Imported
    /// images from older versions are migrated like loaded snapshots.
    pub async fn import(&self, image: &[u8]) -> Result<(), StoreError> {
        if !self.is_ready() {
            self.initialize().await?;
        }

        let db = DatabaseConn::from_image(image).map_err(|e| StoreError::initialization(&e))?;
        let report = SchemaManager::new(&db.conn).migrate();
        for e in &report.errors {
            warn!("{}", StoreError::Migration(e.clone()));
        }

        {
            let mut state = lock(&self.state);
            if !matches!(state.lifecycle, Lifecycle::Ready(_)) {
                return Err(StoreError::NotInitialized);
            }
            state.lifecycle = Lifecycle::Ready(db);
        }

        let receipt = self.persist().await?;
        info!("Imported {} byte database image", receipt.image_bytes);
        Ok(())
    }
}
