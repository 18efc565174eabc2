//! Database schema management
//!
//! This module holds the bookmark schema definitions and the additive
//! migration that brings an older snapshot up to the current column set.

use anyhow::{anyhow, Result};
use rusqlite::Connection;
use tracing::{debug, info, warn};

/// Current schema version, recorded in `PRAGMA user_version`
///
/// Version 1 is the original bookmarks table, version 2 added the
/// `internal_url` and `icon_url` columns.
pub const SCHEMA_VERSION: u32 = 2;

/// Schema definitions for all tables in the bookmark store
pub struct SchemaDefinitions;

impl SchemaDefinitions {
    /// Primary entity table, the only table that is ever migrated
    pub const PRIMARY_TABLE: &'static str = "bookmarks";

    /// SQL for creating the bookmarks table
    pub const BOOKMARKS_TABLE: &'static str = r#"
        CREATE TABLE IF NOT EXISTS bookmarks (
            id TEXT PRIMARY KEY,
            chrome_id TEXT UNIQUE,
            title TEXT NOT NULL,
            url TEXT,
            internal_url TEXT,
            icon_url TEXT,
            parent_id TEXT,
            date_added INTEGER,
            date_modified INTEGER,
            created_at INTEGER DEFAULT (unixepoch()),
            updated_at INTEGER DEFAULT (unixepoch())
        );
    "#;

    /// SQL for creating the tags table
    pub const TAGS_TABLE: &'static str = r#"
        CREATE TABLE IF NOT EXISTS tags (
            id TEXT PRIMARY KEY,
            name TEXT UNIQUE NOT NULL,
            color TEXT,
            created_at INTEGER DEFAULT (unixepoch())
        );
    "#;

    /// SQL for creating the bookmark/tag association table
    pub const BOOKMARK_TAGS_TABLE: &'static str = r#"
        CREATE TABLE IF NOT EXISTS bookmark_tags (
            bookmark_id TEXT,
            tag_id TEXT,
            PRIMARY KEY (bookmark_id, tag_id),
            FOREIGN KEY (bookmark_id) REFERENCES bookmarks(id),
            FOREIGN KEY (tag_id) REFERENCES tags(id)
        );
    "#;

    /// SQL for creating bookmark indexes
    pub const BOOKMARK_INDEXES: &'static [&'static str] = &[
        "CREATE INDEX IF NOT EXISTS idx_bookmarks_url ON bookmarks(url)",
        "CREATE INDEX IF NOT EXISTS idx_bookmarks_chrome_id ON bookmarks(chrome_id)",
        "CREATE INDEX IF NOT EXISTS idx_bookmarks_parent_id ON bookmarks(parent_id)",
    ];

    /// Columns added to the bookmarks table after the first release, in the
    /// order they were introduced. All of them are nullable.
    pub const ADDITIVE_COLUMNS: &'static [(&'static str, &'static str)] =
        &[("internal_url", "TEXT"), ("icon_url", "TEXT")];

    /// Tables created by the baseline schema
    pub const TABLES: &'static [&'static str] = &["bookmarks", "tags", "bookmark_tags"];
}

/// Outcome of a best-effort migration pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    /// The primary table was missing and the baseline schema was created
    pub baseline_created: bool,

    /// Columns added to the primary table
    pub added_columns: Vec<String>,

    /// Whether column introspection failed and the blind strategy was used
    pub used_fallback: bool,

    /// Errors that were logged and swallowed
    pub errors: Vec<String>,
}

impl MigrationReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Schema manager for the bookmark store
///
/// Handles baseline creation, status checks, and additive migrations.
pub struct SchemaManager<'a> {
    conn: &'a Connection,
}

impl<'a> SchemaManager<'a> {
    /// Create a new schema manager for the given connection
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Create the baseline schema
    ///
    /// Creates all tables and indexes if they don't exist and records the
    /// schema version.
    pub fn initialize(&self) -> Result<()> {
        self.conn
            .execute(SchemaDefinitions::BOOKMARKS_TABLE, [])
            .map_err(|e| anyhow!("Failed to create bookmarks table: {}", e))?;

        self.conn
            .execute(SchemaDefinitions::TAGS_TABLE, [])
            .map_err(|e| anyhow!("Failed to create tags table: {}", e))?;

        self.conn
            .execute(SchemaDefinitions::BOOKMARK_TAGS_TABLE, [])
            .map_err(|e| anyhow!("Failed to create bookmark_tags table: {}", e))?;

        for index_sql in SchemaDefinitions::BOOKMARK_INDEXES {
            self.conn
                .execute(index_sql, [])
                .map_err(|e| anyhow!("Failed to create bookmark index: {}", e))?;
        }

        self.record_version()?;

        Ok(())
    }

    /// Check the current schema status
    pub fn check_status(&self) -> Result<SchemaStatus> {
        if !self.table_exists(SchemaDefinitions::PRIMARY_TABLE)? {
            return Ok(SchemaStatus::NotInitialized);
        }

        let database_version = self.schema_version()?;
        if database_version > SCHEMA_VERSION {
            return Ok(SchemaStatus::Newer {
                database_version,
                supported_version: SCHEMA_VERSION,
            });
        }

        let columns = self.column_names(SchemaDefinitions::PRIMARY_TABLE)?;
        let missing_columns: Vec<String> = SchemaDefinitions::ADDITIVE_COLUMNS
            .iter()
            .filter(|(name, _)| !columns.iter().any(|c| c == name))
            .map(|(name, _)| name.to_string())
            .collect();

        if missing_columns.is_empty() {
            Ok(SchemaStatus::Current)
        } else {
            Ok(SchemaStatus::NeedsMigration { missing_columns })
        }
    }

    /// Bring a loaded snapshot up to the current schema
    ///
    /// This never fails: errors are logged, recorded in the report, and the
    /// store keeps whatever schema it managed to reach.
    pub fn migrate(&self) -> MigrationReport {
        let mut report = MigrationReport::default();

        if let Err(e) = self.try_migrate(&mut report) {
            warn!("Database migration failed: {:#}", e);
            report.errors.push(e.to_string());
        }

        report
    }

    fn try_migrate(&self, report: &mut MigrationReport) -> Result<()> {
        if !self.table_exists(SchemaDefinitions::PRIMARY_TABLE)? {
            info!("Snapshot has no bookmarks table, creating baseline schema");
            self.initialize()?;
            report.baseline_created = true;
            return Ok(());
        }

        let introspected = self.column_names(SchemaDefinitions::PRIMARY_TABLE);
        self.migrate_columns(introspected, report);

        for name in &report.added_columns {
            info!("Added column bookmarks.{}", name);
        }

        if report.errors.is_empty() {
            self.record_version()?;
        }

        Ok(())
    }

    /// Add the missing additive columns to the primary table
    ///
    /// `introspected` is the result of reading the table's columns. When it
    /// failed, every additive column is attempted directly and "duplicate
    /// column" failures count as already present.
    fn migrate_columns(&self, introspected: Result<Vec<String>>, report: &mut MigrationReport) {
        match introspected {
            Ok(columns) => {
                for (name, sql_type) in SchemaDefinitions::ADDITIVE_COLUMNS {
                    if columns.iter().any(|c| c == name) {
                        continue;
                    }
                    match self.add_column(SchemaDefinitions::PRIMARY_TABLE, name, sql_type) {
                        Ok(()) => report.added_columns.push(name.to_string()),
                        Err(e) => {
                            warn!("Failed to add column {}: {}", name, e);
                            report.errors.push(e.to_string());
                        }
                    }
                }
            }
            Err(e) => {
                debug!("Column introspection failed ({}), adding columns directly", e);
                report.used_fallback = true;
                for (name, sql_type) in SchemaDefinitions::ADDITIVE_COLUMNS {
                    match self.add_column_if_absent(SchemaDefinitions::PRIMARY_TABLE, name, sql_type)
                    {
                        Ok(true) => report.added_columns.push(name.to_string()),
                        Ok(false) => {}
                        Err(e) => {
                            warn!("Failed to add column {}: {}", name, e);
                            report.errors.push(e.to_string());
                        }
                    }
                }
            }
        }
    }

    /// Add a nullable column, treating "already exists" as success
    ///
    /// Returns `true` if the column was added and `false` if it was already
    /// present. Any other failure is propagated.
    pub fn add_column_if_absent(&self, table: &str, column: &str, sql_type: &str) -> Result<bool> {
        let sql = format!("ALTER TABLE {} ADD COLUMN {} {}", table, column, sql_type);
        match self.conn.execute(&sql, []) {
            Ok(_) => Ok(true),
            Err(e) if is_duplicate_column(&e) => Ok(false),
            Err(e) => Err(anyhow!("Failed to add column {}.{}: {}", table, column, e)),
        }
    }

    fn add_column(&self, table: &str, column: &str, sql_type: &str) -> Result<()> {
        let sql = format!("ALTER TABLE {} ADD COLUMN {} {}", table, column, sql_type);
        self.conn
            .execute(&sql, [])
            .map_err(|e| anyhow!("Failed to add column {}.{}: {}", table, column, e))?;
        Ok(())
    }

    /// List the column names of a table via `PRAGMA table_info`
    pub fn column_names(&self, table: &str) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM pragma_table_info(?1)")
            .map_err(|e| anyhow!("Failed to prepare table_info query: {}", e))?;
        let names = stmt
            .query_map([table], |row| row.get::<_, String>(0))
            .map_err(|e| anyhow!("Failed to read table_info for {}: {}", table, e))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| anyhow!("Failed to read table_info for {}: {}", table, e))?;
        Ok(names)
    }

    /// Check if a table exists
    pub fn table_exists(&self, table: &str) -> Result<bool> {
        let count: i32 = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
                [table],
                |row| row.get(0),
            )
            .map_err(|e| anyhow!("Failed to check table existence: {}", e))?;
        Ok(count > 0)
    }

    /// Get the schema version stored in the database header
    pub fn schema_version(&self) -> Result<u32> {
        self.conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))
            .map_err(|e| anyhow!("Failed to read schema version: {}", e))
    }

    /// Record the current schema version, never lowering a newer one
    fn record_version(&self) -> Result<()> {
        let current = self.schema_version()?;
        if current > SCHEMA_VERSION {
            warn!(
                "Database schema version v{} is newer than supported v{}, leaving it unchanged",
                current, SCHEMA_VERSION
            );
            return Ok(());
        }
        if current < SCHEMA_VERSION {
            self.conn
                .execute_batch(&format!("PRAGMA user_version = {}", SCHEMA_VERSION))
                .map_err(|e| anyhow!("Failed to set schema version: {}", e))?;
        }
        Ok(())
    }
}

/// Whether an `ALTER TABLE ... ADD COLUMN` failed because the column exists
fn is_duplicate_column(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(_, Some(msg)) => msg.starts_with("duplicate column name"),
        _ => false,
    }
}

/// Status of the database schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaStatus {
    /// The primary table does not exist (fresh or pre-schema database)
    NotInitialized,

    /// Schema is current
    Current,

    /// The primary table lacks columns introduced by later revisions
    NeedsMigration { missing_columns: Vec<String> },

    /// Database was written by a newer version
    Newer {
        database_version: u32,
        supported_version: u32,
    },
}

impl std::fmt::Display for SchemaStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchemaStatus::NotInitialized => write!(f, "not initialized"),
            SchemaStatus::Current => write!(f, "current (v{})", SCHEMA_VERSION),
            SchemaStatus::NeedsMigration { missing_columns } => {
                write!(f, "needs migration (missing: {})", missing_columns.join(", "))
            }
            SchemaStatus::Newer {
                database_version,
                supported_version,
            } => write!(
                f,
                "newer than supported (db: v{}, supported: v{})",
                database_version, supported_version
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    /// The bookmarks table as it shipped before `internal_url` and `icon_url`
    const V1_BOOKMARKS_TABLE: &str = r#"
        CREATE TABLE bookmarks (
            id TEXT PRIMARY KEY,
            chrome_id TEXT UNIQUE,
            title TEXT NOT NULL,
            url TEXT,
            parent_id TEXT,
            date_added INTEGER,
            date_modified INTEGER,
            created_at INTEGER DEFAULT (unixepoch()),
            updated_at INTEGER DEFAULT (unixepoch())
        );
    "#;

    fn create_test_db() -> Connection {
        Connection::open_in_memory().unwrap()
    }

    #[test]
    fn test_schema_not_initialized() {
        let conn = create_test_db();
        let manager = SchemaManager::new(&conn);

        assert_eq!(
            manager.check_status().unwrap(),
            SchemaStatus::NotInitialized
        );
    }

    #[test]
    fn test_schema_initialize() {
        let conn = create_test_db();
        let manager = SchemaManager::new(&conn);

        manager.initialize().unwrap();

        assert_eq!(manager.check_status().unwrap(), SchemaStatus::Current);
        assert_eq!(manager.schema_version().unwrap(), SCHEMA_VERSION);
        for table in SchemaDefinitions::TABLES {
            assert!(manager.table_exists(table).unwrap());
        }
    }

    #[test]
    fn test_baseline_indexes() {
        let conn = create_test_db();
        SchemaManager::new(&conn).initialize().unwrap();

        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='index' AND name LIKE 'idx_bookmarks_%'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 3);
    }

    #[test]
    fn test_fallback_adds_only_absent_columns() {
        let conn = create_test_db();
        conn.execute(V1_BOOKMARKS_TABLE, []).unwrap();
        conn.execute("ALTER TABLE bookmarks ADD COLUMN internal_url TEXT", [])
            .unwrap();

        let manager = SchemaManager::new(&conn);
        let mut report = MigrationReport::default();
        manager.migrate_columns(Err(anyhow!("table_info unavailable")), &mut report);

        assert!(report.used_fallback);
        assert_eq!(report.added_columns, vec!["icon_url".to_string()]);
        assert!(report.is_clean());
        let columns = manager.column_names("bookmarks").unwrap();
        assert_eq!(columns.iter().filter(|c| c.as_str() == "internal_url").count(), 1);
        assert_eq!(manager.check_status().unwrap(), SchemaStatus::Current);
    }

    #[test]
    fn test_fallback_records_unexpected_errors() {
        let conn = create_test_db();
        let manager = SchemaManager::new(&conn);

        let mut report = MigrationReport::default();
        manager.migrate_columns(Err(anyhow!("table_info unavailable")), &mut report);

        assert!(report.used_fallback);
        assert!(report.added_columns.is_empty());
        assert_eq!(report.errors.len(), SchemaDefinitions::ADDITIVE_COLUMNS.len());
        assert!(report.errors[0].contains("no such table"));
    }

    #[test]
    fn test_migrate_absorbs_baseline_failure() {
        let conn = create_test_db();
        conn.execute("CREATE TABLE legacy (id TEXT PRIMARY KEY, title TEXT)", [])
            .unwrap();
        conn.execute("CREATE VIEW bookmarks AS SELECT id, title FROM legacy", [])
            .unwrap();

        let manager = SchemaManager::new(&conn);
        let report = manager.migrate();

        assert!(!report.baseline_created);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].contains("views may not be indexed"));
        assert!(manager.table_exists("tags").unwrap());
        assert_eq!(manager.schema_version().unwrap(), 0);
    }

    #[test]
    fn test_migrate_adds_missing_columns() {
        let conn = create_test_db();
        conn.execute(V1_BOOKMARKS_TABLE, []).unwrap();
        conn.execute(
            "INSERT INTO bookmarks (id, chrome_id, title, url) VALUES ('b1', 'c1', 'Old', 'https://old.example')",
            [],
        )
        .unwrap();

        let manager = SchemaManager::new(&conn);
        assert_eq!(
            manager.check_status().unwrap(),
            SchemaStatus::NeedsMigration {
                missing_columns: vec!["internal_url".to_string(), "icon_url".to_string()]
            }
        );

        let report = manager.migrate();
        assert!(report.is_clean());
        assert!(!report.baseline_created);
        assert_eq!(report.added_columns, vec!["internal_url", "icon_url"]);
        assert_eq!(manager.check_status().unwrap(), SchemaStatus::Current);
        assert_eq!(manager.schema_version().unwrap(), SCHEMA_VERSION);

        let (title, icon): (String, Option<String>) = conn
            .query_row(
                "SELECT title, icon_url FROM bookmarks WHERE id = 'b1'",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!(title, "Old");
        assert_eq!(icon, None);
    }

    #[test]
    fn test_migrate_creates_baseline_when_table_missing() {
        let conn = create_test_db();
        conn.execute("CREATE TABLE unrelated (x INTEGER)", []).unwrap();

        let manager = SchemaManager::new(&conn);
        let report = manager.migrate();

        assert!(report.baseline_created);
        assert!(report.added_columns.is_empty());
        assert_eq!(manager.check_status().unwrap(), SchemaStatus::Current);
        assert!(manager.table_exists("unrelated").unwrap());
    }

    #[test]
    fn test_migrate_is_noop_when_current() {
        let conn = create_test_db();
        let manager = SchemaManager::new(&conn);
        manager.initialize().unwrap();

        let report = manager.migrate();
        assert_eq!(report, MigrationReport::default());
    }

    #[test]
    fn test_add_column_if_absent_tolerates_existing_column() {
        let conn = create_test_db();
        let manager = SchemaManager::new(&conn);
        manager.initialize().unwrap();

        assert!(!manager
            .add_column_if_absent("bookmarks", "icon_url", "TEXT")
            .unwrap());
        assert!(manager
            .add_column_if_absent("bookmarks", "favicon_hash", "TEXT")
            .unwrap());
    }

    #[test]
    fn test_add_column_if_absent_propagates_other_errors() {
        let conn = create_test_db();
        let manager = SchemaManager::new(&conn);

        let result = manager.add_column_if_absent("no_such_table", "icon_url", "TEXT");
        assert!(result.is_err());
    }

    #[test]
    fn test_newer_version_is_not_lowered() {
        let conn = create_test_db();
        let manager = SchemaManager::new(&conn);
        manager.initialize().unwrap();
        conn.execute_batch("PRAGMA user_version = 9").unwrap();

        assert_eq!(
            manager.check_status().unwrap(),
            SchemaStatus::Newer {
                database_version: 9,
                supported_version: SCHEMA_VERSION
            }
        );

        let report = manager.migrate();
        assert!(report.is_clean());
        assert_eq!(manager.schema_version().unwrap(), 9);
    }
}
